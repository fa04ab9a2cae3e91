//! Region-aware erase/write orchestration
//!
//! `erase_write` is the counterpart to `operations::write_region` that uses
//! the containment-tree planner instead of a single fixed erase block size:
//! it aligns the target range to the finest erase granularity, decides which
//! blocks actually need erasing by diffing current against target contents,
//! erases only those, restores the padding bytes outside the original range,
//! and writes back the changed bytes.

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::programmer::SpiMaster;

use super::context::FlashContext;
use super::operations::{check_erased_range, erase_single_block, read, write};
use super::planner::{bytes_need_erase, select_erase_functions, EraseLayout};

/// Extend `[start, end]` outward to the nearest boundaries of `align`
#[cfg(feature = "alloc")]
fn align_region(start: u32, end: u32, align: u32) -> (u32, u32) {
    let aligned_start = (start / align) * align;
    let aligned_end = ((end / align) + 1) * align - 1;
    (aligned_start, aligned_end)
}

/// Erase and write a region of flash, minimizing the number and size of
/// erase operations
///
/// `curcontents` and `newcontents` must both cover the whole chip
/// (`ctx.total_size()` bytes); only `[region_start, region_end]` of
/// `newcontents` is applied, the rest is used solely to detect which
/// erase blocks are already clean and to restore padding bytes.
#[cfg(feature = "alloc")]
pub fn erase_write<M: SpiMaster + ?Sized>(
    master: &mut M,
    ctx: &FlashContext,
    region_start: u32,
    region_end: u32,
    curcontents: &[u8],
    newcontents: &[u8],
) -> Result<()> {
    let total = ctx.total_size();
    if curcontents.len() < total || newcontents.len() < total {
        return Err(Error::BufferTooSmall);
    }
    if region_end < region_start || !ctx.is_valid_range(region_start, (region_end - region_start + 1) as usize) {
        return Err(Error::AddressOutOfBounds);
    }

    let layout = EraseLayout::build(&ctx.chip)?;
    let min_block = layout
        .levels
        .first()
        .and_then(|(eb, _)| eb.uniform_block_size())
        .ok_or(Error::InvalidAlignment)?;

    let (aligned_start, aligned_end) = align_region(region_start, region_end, min_block);

    // Effective target: newcontents inside the original region, curcontents
    // (unchanged) in the padding introduced by alignment.
    let mut effective = vec![0u8; (aligned_end - aligned_start + 1) as usize];
    for (i, slot) in effective.iter_mut().enumerate() {
        let addr = aligned_start + i as u32;
        *slot = if addr >= region_start && addr <= region_end {
            newcontents[addr as usize]
        } else {
            curcontents[addr as usize]
        };
    }

    let plan = select_erase_functions(&layout, aligned_start, aligned_end + 1, |start, size| {
        let rel_start = (start - aligned_start) as usize;
        let rel_end = rel_start + size as usize;
        bytes_need_erase(
            &curcontents[start as usize..start as usize + size as usize],
            &effective[rel_start..rel_end],
        )
    });

    // Post-erase contents: curcontents everywhere, except the blocks we're
    // about to erase, which settle at the chip's erased value.
    let mut current = curcontents[aligned_start as usize..=aligned_end as usize].to_vec();
    for planned in &plan {
        let rel_start = (planned.start - aligned_start) as usize;
        let rel_end = rel_start + planned.size as usize;
        current[rel_start..rel_end].fill(ctx.chip.erased_value);
    }

    for planned in &plan {
        erase_single_block(master, ctx, planned.erase_block.clone(), planned.start)?;
        check_erased_range(master, ctx, planned.start, planned.size)?;
    }

    // Write back only the bytes that still differ from what's now on the
    // chip, in contiguous runs, across the whole aligned range. A byte
    // already equal to its target (whether never erased or erased to the
    // value it needed to be) is never written.
    let mut i = 0usize;
    while i < effective.len() {
        if current[i] == effective[i] {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < effective.len() && current[i] != effective[i] {
            i += 1;
        }
        let addr = aligned_start + run_start as u32;
        write(master, ctx, addr, &effective[run_start..i])?;
    }

    Ok(())
}

/// Verify that `[region_start, region_end]` now reads back as `expected`
#[cfg(feature = "alloc")]
pub fn verify_written<M: SpiMaster + ?Sized>(
    master: &mut M,
    ctx: &FlashContext,
    region_start: u32,
    expected: &[u8],
) -> Result<()> {
    let mut buf = vec![0u8; expected.len()];
    read(master, ctx, region_start, &mut buf)?;
    if buf != expected {
        return Err(Error::VerifyError);
    }
    Ok(())
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::chip::{EraseBlock, Features, FlashChip, WriteGranularity};
    use crate::programmer::SpiFeatures;
    use crate::spi::opcodes;
    use crate::spi::SpiCommand;
    use alloc::string::ToString;
    use std::cell::RefCell;

    struct MockFlash {
        memory: RefCell<Vec<u8>>,
        erases: RefCell<Vec<(u32, u32)>>,
        writes: RefCell<Vec<(u32, Vec<u8>)>>,
    }

    impl MockFlash {
        fn new(contents: Vec<u8>) -> Self {
            Self {
                memory: RefCell::new(contents),
                erases: RefCell::new(Vec::new()),
                writes: RefCell::new(Vec::new()),
            }
        }
    }

    impl SpiMaster for MockFlash {
        fn features(&self) -> SpiFeatures {
            SpiFeatures::empty()
        }

        fn max_read_len(&self) -> usize {
            4096
        }

        fn max_write_len(&self) -> usize {
            256
        }

        fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
            match cmd.opcode {
                opcodes::READ => {
                    if let Some(addr) = cmd.address {
                        let addr = addr as usize;
                        let len = cmd.read_buf.len();
                        let mem = self.memory.borrow();
                        cmd.read_buf.copy_from_slice(&mem[addr..addr + len]);
                    }
                    Ok(())
                }
                opcodes::WREN => Ok(()),
                opcodes::PP => {
                    if let Some(addr) = cmd.address {
                        let addr = addr as usize;
                        self.writes
                            .borrow_mut()
                            .push((addr as u32, cmd.write_data.to_vec()));
                        let mut mem = self.memory.borrow_mut();
                        for (i, byte) in cmd.write_data.iter().enumerate() {
                            mem[addr + i] &= byte;
                        }
                    }
                    Ok(())
                }
                opcodes::SE_20 => {
                    if let Some(addr) = cmd.address {
                        let addr = addr as usize;
                        self.erases.borrow_mut().push((addr as u32, 4096));
                        let mut mem = self.memory.borrow_mut();
                        mem[addr..addr + 4096].fill(0xFF);
                    }
                    Ok(())
                }
                opcodes::BE_D8 => {
                    if let Some(addr) = cmd.address {
                        let addr = addr as usize;
                        self.erases.borrow_mut().push((addr as u32, 65536));
                        let mut mem = self.memory.borrow_mut();
                        mem[addr..addr + 65536].fill(0xFF);
                    }
                    Ok(())
                }
                opcodes::RDSR => {
                    if !cmd.read_buf.is_empty() {
                        cmd.read_buf[0] = 0x00;
                    }
                    Ok(())
                }
                _ => Ok(()),
            }
        }

        fn delay_us(&mut self, _us: u32) {}
    }

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
    fn erase_write_only_touches_dirty_sectors() {
        let size = 128 * 1024;
        let cur = vec![0xFFu8; size];
        let mut new = cur.clone();
        new[0x1000..0x1010].copy_from_slice(&[0xAB; 16]);

        let mut mock = MockFlash::new(cur.clone());
        let chip = test_chip(size as u32);
        let ctx = FlashContext::new(chip);

        erase_write(&mut mock, &ctx, 0x1000, 0x100F, &cur, &new).unwrap();

        assert_eq!(
            mock.erases.borrow().as_slice(),
            &[(0x1000, 4096)],
            "only the dirty 4KB sector should be erased"
        );
        assert_eq!(&mock.memory.borrow()[0x1000..0x1010], &[0xAB; 16]);
    }

    #[test]
    fn erase_write_promotes_mostly_dirty_block() {
        let size = 128 * 1024;
        let cur = vec![0xFFu8; size];
        let mut new = cur.clone();
        for sector in 0..9 {
            let start = sector * 4096;
            new[start] = 0x00;
        }

        let mut mock = MockFlash::new(cur.clone());
        let chip = test_chip(size as u32);
        let ctx = FlashContext::new(chip);

        erase_write(&mut mock, &ctx, 0, 65535, &cur, &new).unwrap();

        assert_eq!(mock.erases.borrow().as_slice(), &[(0, 65536)]);
    }

    #[test]
    fn erase_write_round_trips_region_contents() {
        let size = 128 * 1024;
        let cur = vec![0xFFu8; size];
        let mut new = cur.clone();
        new[0x2000..0x2100].copy_from_slice(&[0x55; 256]);

        let mut mock = MockFlash::new(cur.clone());
        let chip = test_chip(size as u32);
        let ctx = FlashContext::new(chip);

        erase_write(&mut mock, &ctx, 0x2000, 0x20FF, &cur, &new).unwrap();
        verify_written(&mut mock, &ctx, 0x2000, &new[0x2000..0x2100]).unwrap();
    }

    #[test]
    fn erase_write_is_idempotent_on_second_call() {
        let size = 128 * 1024;
        let cur = vec![0xFFu8; size];
        let mut new = cur.clone();
        new[0x3000] = 0x01;

        let mut mock = MockFlash::new(cur.clone());
        let chip = test_chip(size as u32);
        let ctx = FlashContext::new(chip);

        erase_write(&mut mock, &ctx, 0x3000, 0x3000, &cur, &new).unwrap();
        let after_first = mock.memory.borrow().clone();
        mock.erases.borrow_mut().clear();
        mock.writes.borrow_mut().clear();

        // Second call with curcontents == newcontents: nothing left to erase or write.
        erase_write(&mut mock, &ctx, 0x3000, 0x3000, &after_first, &after_first).unwrap();

        assert!(mock.erases.borrow().is_empty());
        assert!(
            mock.writes.borrow().is_empty(),
            "writing an already-matching image must issue zero writes"
        );
        assert_eq!(*mock.memory.borrow(), after_first);
    }

    #[test]
    fn erase_write_preserves_padding_outside_region() {
        let size = 128 * 1024;
        let mut cur = vec![0xFFu8; size];
        cur[0x0500..0x0510].copy_from_slice(&[0x11; 16]);
        let mut new = cur.clone();
        new[0x1500] = 0xAA;

        let mut mock = MockFlash::new(cur.clone());
        let chip = test_chip(size as u32);
        let ctx = FlashContext::new(chip);

        erase_write(&mut mock, &ctx, 0x1500, 0x1500, &cur, &new).unwrap();

        assert_eq!(
            &mock.memory.borrow()[0x0500..0x0510],
            &[0x11; 16],
            "bytes outside the requested range must survive alignment padding"
        );
        assert_eq!(mock.memory.borrow()[0x1500], 0xAA);
    }
}
