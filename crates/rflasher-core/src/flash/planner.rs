//! Erase layout planning
//!
//! Builds a containment tree across all of a chip's erase functions (finest
//! block size first) and selects, for a target address range, the smallest
//! set of erase operations that covers every byte needing an erase.
//!
//! A coarser erase function is only chosen over its finer sub-blocks when
//! more than half of those sub-blocks need erasing and the coarser block
//! lies entirely within the target range - erasing it otherwise would touch
//! bytes outside the range that must be preserved.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::chip::{EraseBlock, FlashChip};
use crate::error::{Error, Result};

/// One physical block belonging to a single erase function
#[derive(Debug, Clone, Copy)]
pub(crate) struct LayoutBlock {
    pub start: u32,
    pub size: u32,
    /// Index range into the next-finer level's blocks this block contains
    pub sub_range: Option<(usize, usize)>,
}

/// Containment tree of erase blocks, one level per erase function, ordered
/// from the finest block size (level 0) to the coarsest
#[cfg(feature = "alloc")]
pub(crate) struct EraseLayout {
    pub levels: Vec<(EraseBlock, Vec<LayoutBlock>)>,
}

/// Expand an erase function's (size, count) regions into individual blocks
#[cfg(feature = "alloc")]
fn expand_blocks(erase_block: &EraseBlock) -> Vec<LayoutBlock> {
    let mut blocks = Vec::new();
    let mut addr = 0u32;
    for region in &erase_block.regions {
        for _ in 0..region.count {
            blocks.push(LayoutBlock {
                start: addr,
                size: region.block_size,
                sub_range: None,
            });
            addr += region.block_size;
        }
    }
    blocks
}

/// Find the index range in `subs` fully contained within `[start, start+size)`
#[cfg(feature = "alloc")]
fn sub_range(subs: &[LayoutBlock], start: u32, size: u32) -> Option<(usize, usize)> {
    let end = start + size;
    let first = subs.iter().position(|b| b.start >= start && b.start < end)?;
    let last = subs
        .iter()
        .rposition(|b| b.start >= start && b.start + b.size <= end)?;
    if first > last {
        return None;
    }
    Some((first, last))
}

#[cfg(feature = "alloc")]
impl EraseLayout {
    /// Build the containment tree for a chip's erase functions
    ///
    /// Erase functions with no regions, or whose total size doesn't evenly
    /// divide the chip, are skipped.
    pub fn build(chip: &FlashChip) -> Result<Self> {
        let mut eraser_blocks: Vec<(EraseBlock, Vec<LayoutBlock>)> = chip
            .erase_blocks()
            .iter()
            .filter(|eb| eb.total_size() == chip.total_size)
            .map(|eb| (eb.clone(), expand_blocks(eb)))
            .collect();

        if eraser_blocks.is_empty() {
            return Err(Error::InvalidAlignment);
        }

        // Finest block size first.
        eraser_blocks.sort_by_key(|(_, blocks)| blocks.first().map(|b| b.size).unwrap_or(u32::MAX));

        let mut levels: Vec<(EraseBlock, Vec<LayoutBlock>)> = Vec::with_capacity(eraser_blocks.len());
        for (eb, mut blocks) in eraser_blocks {
            if let Some((_, finer)) = levels.last() {
                for block in &mut blocks {
                    block.sub_range = sub_range(finer, block.start, block.size);
                }
            }
            levels.push((eb, blocks));
        }

        Ok(Self { levels })
    }
}

/// A single planned erase operation
#[derive(Debug, Clone)]
pub struct PlannedErase {
    /// Start address of the block to erase
    pub start: u32,
    /// Size of the block
    pub size: u32,
    /// Erase function to use
    pub erase_block: EraseBlock,
}

/// Select the coarsest combination of erase blocks covering every byte in
/// `[region_start, region_end)` that `needs_erase` reports as dirty
///
/// Blocks are evaluated bottom-up: a block at level 0 is selected directly
/// by `needs_erase`. A block at a coarser level is promoted (and its
/// selected sub-blocks dropped) only when more than half of its contained
/// sub-blocks are selected and the block fits entirely inside the region.
#[cfg(feature = "alloc")]
pub(crate) fn select_erase_functions(
    layout: &EraseLayout,
    region_start: u32,
    region_end: u32,
    mut needs_erase: impl FnMut(u32, u32) -> bool,
) -> Vec<PlannedErase> {
    let mut selected: Vec<Vec<bool>> = layout
        .levels
        .iter()
        .map(|(_, blocks)| alloc::vec![false; blocks.len()])
        .collect();

    if let Some((_, finest)) = layout.levels.first() {
        for (i, block) in finest.iter().enumerate() {
            let overlaps = block.start < region_end && block.start + block.size > region_start;
            if overlaps && needs_erase(block.start, block.size) {
                selected[0][i] = true;
            }
        }
    }

    for level in 1..layout.levels.len() {
        let (_, blocks) = &layout.levels[level];
        for (i, block) in blocks.iter().enumerate() {
            let Some((first, last)) = block.sub_range else {
                continue;
            };
            let total = last - first + 1;
            let chosen = selected[level - 1][first..=last].iter().filter(|&&s| s).count();
            let fits_in_region = block.start >= region_start && block.start + block.size <= region_end;

            if fits_in_region && chosen * 2 > total {
                selected[level][i] = true;
                for s in &mut selected[level - 1][first..=last] {
                    *s = false;
                }
            }
        }
    }

    let mut plan = Vec::new();
    for (level, (erase_block, blocks)) in layout.levels.iter().enumerate() {
        for (i, block) in blocks.iter().enumerate() {
            if selected[level][i] {
                plan.push(PlannedErase {
                    start: block.start,
                    size: block.size,
                    erase_block: erase_block.clone(),
                });
            }
        }
    }
    plan.sort_by_key(|p| p.start);
    plan
}

/// True if writing `new` over `old` requires an erase (any bit going 0 -> 1)
pub(crate) fn bytes_need_erase(old: &[u8], new: &[u8]) -> bool {
    old.iter()
        .zip(new.iter())
        .any(|(&o, &n)| (!o & n) != 0)
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::chip::{Features, FlashChip, WriteGranularity};
    use crate::spi::opcodes;
    use alloc::string::ToString;
    use alloc::vec;

    fn test_chip(size: u32) -> FlashChip {
        FlashChip {
            vendor: "Test".to_string(),
            name: "TestFlash".to_string(),
            jedec_manufacturer: 0xEF,
            jedec_device: 0x4018,
            total_size: size,
            page_size: 256,
            features: Features::empty(),
            voltage_min_mv: 2700,
            voltage_max_mv: 3600,
            write_granularity: WriteGranularity::Page,
            erase_blocks: vec![
                EraseBlock::uniform(opcodes::SE_20, 4096, size),
                EraseBlock::uniform(opcodes::BE_D8, 65536, size),
            ],
            erased_value: 0xFF,
            status_register: None,
            write_protect: None,
            wp_range_decoder: Default::default(),
            otp: None,
            tested: Default::default(),
        }
    }

    #[test]
    fn layout_links_levels_by_containment() {
        let chip = test_chip(128 * 1024);
        let layout = EraseLayout::build(&chip).unwrap();
        assert_eq!(layout.levels.len(), 2);
        let (_, coarse) = &layout.levels[1];
        assert_eq!(coarse[0].sub_range, Some((0, 15)));
    }

    #[test]
    fn promotes_to_coarse_block_when_majority_dirty() {
        let chip = test_chip(128 * 1024);
        let layout = EraseLayout::build(&chip).unwrap();

        // Mark 9 of the 16 4KB sectors in the first 64KB block dirty.
        let plan = select_erase_functions(&layout, 0, 65536, |start, _size| start < 9 * 4096);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].start, 0);
        assert_eq!(plan[0].size, 65536);
    }

    #[test]
    fn keeps_fine_blocks_when_minority_dirty() {
        let chip = test_chip(128 * 1024);
        let layout = EraseLayout::build(&chip).unwrap();

        let plan = select_erase_functions(&layout, 0, 65536, |start, _size| start < 2 * 4096);

        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|p| p.size == 4096));
    }

    #[test]
    fn does_not_promote_block_crossing_region_boundary() {
        let chip = test_chip(128 * 1024);
        let layout = EraseLayout::build(&chip).unwrap();

        // Region only covers the first 32KB, so the 64KB block never fits.
        let plan = select_erase_functions(&layout, 0, 32768, |start, _size| start < 32768);

        assert!(plan.iter().all(|p| p.size == 4096));
    }

    #[test]
    fn bytes_need_erase_detects_zero_to_one_transition() {
        assert!(bytes_need_erase(&[0x00], &[0x01]));
        assert!(!bytes_need_erase(&[0xFF], &[0x00]));
        assert!(!bytes_need_erase(&[0xAA], &[0xAA]));
    }
}
