//! Flash chip type definitions

#[cfg(feature = "alloc")]
use alloc::{string::String, vec::Vec};

use super::features::Features;
use crate::otp::OtpDescriptor;
use crate::wp::{RangeDecoder, WpRegBitMap};

/// Maximum number of distinct (size, count) regions a single erase function
/// can describe. Matches the largest non-uniform erase layout seen in the
/// wild (a handful of chips reserve a differently-sized top or bottom block).
pub const MAX_ERASE_REGIONS: usize = 5;

/// A single (block_size, count) run within an erase function
///
/// An erase opcode doesn't always divide a chip into uniformly-sized
/// blocks - some chips reserve a smaller block at the top or bottom of
/// the address space. `EraseBlock::regions` is an ordered list of these
/// runs, low address to high address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct EraseRegion {
    /// Size of each block in this run, in bytes
    pub block_size: u32,
    /// Number of blocks of this size
    pub count: u32,
}

impl EraseRegion {
    /// Create a new erase region
    pub const fn new(block_size: u32, count: u32) -> Self {
        Self { block_size, count }
    }

    /// Total bytes covered by this run
    pub const fn total_size(&self) -> u32 {
        self.block_size * self.count
    }
}

/// Erase block definition
///
/// Represents one erase function (a single opcode) and the layout of
/// blocks it erases across the chip.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct EraseBlock {
    /// SPI opcode for this erase function
    pub opcode: u8,
    /// Ordered (size, count) runs describing the blocks this opcode erases
    pub regions: heapless::Vec<EraseRegion, MAX_ERASE_REGIONS>,
}

impl EraseBlock {
    /// Create a uniform erase block: a single region of `count` blocks of `size`
    pub fn new(opcode: u8, size: u32) -> Self {
        let mut regions = heapless::Vec::new();
        let _ = regions.push(EraseRegion::new(size, 1));
        Self { opcode, regions }
    }

    /// Create an erase block covering `total_size` bytes uniformly with blocks of `size`
    pub fn uniform(opcode: u8, size: u32, total_size: u32) -> Self {
        let count = if size == 0 { 0 } else { total_size / size };
        let mut regions = heapless::Vec::new();
        let _ = regions.push(EraseRegion::new(size, count));
        Self { opcode, regions }
    }

    /// Create an erase block from an explicit region list
    ///
    /// Silently truncates to [`MAX_ERASE_REGIONS`] entries; callers that load
    /// from an external format should validate the length themselves first.
    pub fn with_regions(opcode: u8, regions: &[EraseRegion]) -> Self {
        let mut v = heapless::Vec::new();
        for r in regions.iter().take(MAX_ERASE_REGIONS) {
            let _ = v.push(*r);
        }
        Self { opcode, regions: v }
    }

    /// Total size in bytes covered by this erase function
    pub fn total_size(&self) -> u32 {
        self.regions.iter().map(EraseRegion::total_size).sum()
    }

    /// True if this erase function divides the chip into equally-sized blocks
    pub fn is_uniform(&self) -> bool {
        self.regions.len() <= 1
    }

    /// The block size, if this erase function is uniform
    pub fn uniform_block_size(&self) -> Option<u32> {
        if self.is_uniform() {
            self.regions.first().map(|r| r.block_size)
        } else {
            None
        }
    }

    /// The size of the block that contains byte `offset`, if any
    pub fn block_size_at(&self, offset: u32) -> Option<u32> {
        let mut base = 0u32;
        for region in &self.regions {
            let region_end = base + region.total_size();
            if offset >= base && offset < region_end {
                return Some(region.block_size);
            }
            base = region_end;
        }
        None
    }

    /// The start address of the block that contains byte `offset`, if any
    pub fn block_start_at(&self, offset: u32) -> Option<u32> {
        let mut base = 0u32;
        for region in &self.regions {
            let region_end = base + region.total_size();
            if offset >= base && offset < region_end {
                let into_region = offset - base;
                let block_index = into_region / region.block_size;
                return Some(base + block_index * region.block_size);
            }
            base = region_end;
        }
        None
    }
}

/// Write granularity
///
/// Describes the smallest unit of data a chip's program command can
/// commit, and whether bytes can be re-programmed without an erase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum WriteGranularity {
    /// Can write individual bits (1 -> 0 only), no erase needed for that transition
    Bit,
    /// Can write individual bytes, no erase needed for 1 -> 0 transitions
    Byte,
    /// Byte-writable, but the device implicitly erases the byte before programming it
    ByteImplicitErase,
    /// Must write full pages of the given size (e.g. 128, 256, 264, 512, 528, 1024, 1056 bytes)
    #[default]
    Page,
    /// Must write full 64 KiB blocks
    Block64k,
}

/// Test status for a chip operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum TestStatus {
    /// Not tested
    #[default]
    Untested,
    /// Tested and working
    Ok,
    /// Tested but has issues
    Bad,
    /// Not applicable for this chip
    Na,
    /// Depends on another chip's test status (e.g. a variant sharing the same die)
    Dep,
}

/// Test results for various chip operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ChipTestStatus {
    /// Probe/identification
    pub probe: TestStatus,
    /// Read operation
    pub read: TestStatus,
    /// Erase operation
    pub erase: TestStatus,
    /// Write/program operation
    pub write: TestStatus,
    /// Write protection
    pub wp: TestStatus,
}

/// Layout of the up-to-3 status registers a chip exposes
///
/// Bit ordering mirrors `spi25_statusreg.c`'s `status_register_bit` enum and
/// must not be reordered: write-protect bit indices in [`WpRegBitMap`] and
/// OTP lock bit indices in [`crate::otp::OtpDescriptor`] are positional into
/// these registers.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusRegisterLayout {
    /// Number of status registers this chip exposes (1-3)
    pub register_count: u8,
    /// Whether WRSR expects a single byte (SR1 only) even when SR2/SR3 exist
    pub wrsr_single_byte: bool,
}

/// Flash chip definition (owned version for runtime use)
///
/// This structure contains all the information needed to identify and
/// interact with a specific flash chip model. Uses owned types (String, Vec)
/// for runtime flexibility.
#[derive(Debug, Clone)]
#[cfg(feature = "alloc")]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct FlashChip {
    /// Vendor name (e.g., "Winbond")
    pub vendor: String,
    /// Chip model name (e.g., "W25Q128FV")
    pub name: String,
    /// JEDEC manufacturer ID (first byte of RDID response)
    pub jedec_manufacturer: u8,
    /// JEDEC device ID (second and third bytes of RDID response)
    pub jedec_device: u16,
    /// Total flash size in bytes
    pub total_size: u32,
    /// Page size in bytes (for programming)
    pub page_size: u16,
    /// Feature flags
    #[cfg_attr(feature = "std", serde(default))]
    pub features: Features,
    /// Minimum operating voltage in millivolts
    #[cfg_attr(feature = "std", serde(default = "default_voltage_min"))]
    pub voltage_min_mv: u16,
    /// Maximum operating voltage in millivolts
    #[cfg_attr(feature = "std", serde(default = "default_voltage_max"))]
    pub voltage_max_mv: u16,
    /// Write granularity
    #[cfg_attr(feature = "std", serde(default))]
    pub write_granularity: WriteGranularity,
    /// Available erase functions (up to 8 in practice; not type-bounded since
    /// the owned representation already uses an unbounded Vec)
    pub erase_blocks: Vec<EraseBlock>,
    /// Value a byte reads back as once erased (0xFF on nearly every chip)
    #[cfg_attr(feature = "std", serde(default = "default_erased_value"))]
    pub erased_value: u8,
    /// Status register layout, if known
    #[cfg_attr(feature = "std", serde(default))]
    pub status_register: Option<StatusRegisterLayout>,
    /// Write-protect bit map and range decoding strategy, if the chip supports it
    #[cfg_attr(feature = "std", serde(default))]
    pub write_protect: Option<WpRegBitMap>,
    /// Range decoding strategy to pair with `write_protect`
    #[cfg_attr(feature = "std", serde(default))]
    pub wp_range_decoder: RangeDecoder,
    /// OTP/security register descriptor, if the chip has one
    #[cfg_attr(feature = "std", serde(default))]
    pub otp: Option<OtpDescriptor>,
    /// Test status
    #[cfg_attr(feature = "std", serde(default))]
    pub tested: ChipTestStatus,
}

#[cfg(feature = "std")]
fn default_voltage_min() -> u16 {
    2700
}

#[cfg(feature = "std")]
fn default_voltage_max() -> u16 {
    3600
}

#[cfg(feature = "std")]
fn default_erased_value() -> u8 {
    0xFF
}

/// Flash chip definition (static/const version for no_std)
///
/// This structure uses static references for zero-cost embedded use.
#[derive(Debug, Clone, Copy)]
#[cfg(not(feature = "alloc"))]
pub struct FlashChip {
    /// Vendor name (e.g., "Winbond")
    pub vendor: &'static str,
    /// Chip model name (e.g., "W25Q128FV")
    pub name: &'static str,
    /// JEDEC manufacturer ID (first byte of RDID response)
    pub jedec_manufacturer: u8,
    /// JEDEC device ID (second and third bytes of RDID response)
    pub jedec_device: u16,
    /// Total flash size in bytes
    pub total_size: u32,
    /// Page size in bytes (for programming)
    pub page_size: u16,
    /// Feature flags
    pub features: Features,
    /// Minimum operating voltage in millivolts
    pub voltage_min_mv: u16,
    /// Maximum operating voltage in millivolts
    pub voltage_max_mv: u16,
    /// Write granularity
    pub write_granularity: WriteGranularity,
    /// Available erase functions
    pub erase_blocks: &'static [EraseBlock],
    /// Value a byte reads back as once erased
    pub erased_value: u8,
    /// Status register layout, if known
    pub status_register: Option<StatusRegisterLayout>,
    /// Write-protect bit map, if the chip supports it
    pub write_protect: Option<WpRegBitMap>,
    /// Range decoding strategy to pair with `write_protect`
    pub wp_range_decoder: RangeDecoder,
    /// OTP/security register descriptor, if the chip has one
    pub otp: Option<OtpDescriptor>,
    /// Test status
    pub tested: ChipTestStatus,
}

impl FlashChip {
    /// Get the JEDEC ID as a 24-bit value (manufacturer << 16 | device)
    pub fn jedec_id(&self) -> u32 {
        ((self.jedec_manufacturer as u32) << 16) | (self.jedec_device as u32)
    }

    /// Check if this chip matches the given JEDEC ID
    pub fn matches_jedec_id(&self, manufacturer: u8, device: u16) -> bool {
        self.jedec_manufacturer == manufacturer && self.jedec_device == device
    }

    /// Check if this chip requires 4-byte addressing
    pub fn requires_4byte_addr(&self) -> bool {
        self.total_size > 16 * 1024 * 1024
    }

    /// Get the smallest uniform erase block size
    pub fn min_erase_size(&self) -> Option<u32> {
        self.erase_blocks()
            .iter()
            .filter_map(EraseBlock::uniform_block_size)
            .min()
            .or_else(|| {
                self.erase_blocks()
                    .iter()
                    .flat_map(|eb| eb.regions.iter())
                    .map(|r| r.block_size)
                    .min()
            })
    }

    /// Get the largest erase block size (excluding whole-chip erase)
    pub fn max_erase_size(&self) -> Option<u32> {
        self.erase_blocks()
            .iter()
            .filter(|eb| eb.total_size() < self.total_size)
            .filter_map(EraseBlock::uniform_block_size)
            .max()
    }

    /// Find an erase function that uniformly divides the chip into blocks of `size`
    pub fn erase_block_for_size(&self, size: u32) -> Option<&EraseBlock> {
        self.erase_blocks()
            .iter()
            .find(|eb| eb.uniform_block_size() == Some(size))
    }

    /// Check if a given address and length are aligned to the smallest erase block
    pub fn is_erase_aligned(&self, addr: u32, len: u32) -> bool {
        if let Some(min_erase) = self.min_erase_size() {
            addr.is_multiple_of(min_erase) && len.is_multiple_of(min_erase)
        } else {
            false
        }
    }

    /// Get vendor name as a string slice
    #[cfg(feature = "alloc")]
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Get chip name as a string slice
    #[cfg(feature = "alloc")]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get erase blocks as a slice
    #[cfg(feature = "alloc")]
    pub fn erase_blocks(&self) -> &[EraseBlock] {
        &self.erase_blocks
    }

    /// Get vendor name as a string slice
    #[cfg(not(feature = "alloc"))]
    pub fn vendor(&self) -> &str {
        self.vendor
    }

    /// Get chip name as a string slice
    #[cfg(not(feature = "alloc"))]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Get erase blocks as a slice
    #[cfg(not(feature = "alloc"))]
    pub fn erase_blocks(&self) -> &[EraseBlock] {
        self.erase_blocks
    }
}

/// JEDEC manufacturer IDs
pub mod manufacturer {
    /// AMD/Spansion
    pub const AMD: u8 = 0x01;
    /// Atmel
    pub const ATMEL: u8 = 0x1F;
    /// EON
    pub const EON: u8 = 0x1C;
    /// Fujitsu
    pub const FUJITSU: u8 = 0x04;
    /// GigaDevice
    pub const GIGADEVICE: u8 = 0xC8;
    /// Intel
    pub const INTEL: u8 = 0x89;
    /// ISSI
    pub const ISSI: u8 = 0x9D;
    /// Macronix
    pub const MACRONIX: u8 = 0xC2;
    /// Micron
    pub const MICRON: u8 = 0x20;
    /// PMC
    pub const PMC: u8 = 0x9D;
    /// Sanyo
    pub const SANYO: u8 = 0x62;
    /// SST
    pub const SST: u8 = 0xBF;
    /// ST (now Micron)
    pub const ST: u8 = 0x20;
    /// Winbond
    pub const WINBOND: u8 = 0xEF;
    /// XMC
    pub const XMC: u8 = 0x20;
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;

    #[test]
    fn uniform_erase_block_reports_total_size() {
        let eb = EraseBlock::uniform(0x20, 4096, 65536);
        assert_eq!(eb.total_size(), 65536);
        assert!(eb.is_uniform());
        assert_eq!(eb.uniform_block_size(), Some(4096));
    }

    #[test]
    fn non_uniform_erase_block_locates_block_size() {
        let eb = EraseBlock::with_regions(
            0x20,
            &[EraseRegion::new(4096, 15), EraseRegion::new(32768, 1)],
        );
        assert_eq!(eb.total_size(), 15 * 4096 + 32768);
        assert!(!eb.is_uniform());
        assert_eq!(eb.block_size_at(0), Some(4096));
        assert_eq!(eb.block_size_at(15 * 4096), Some(32768));
        assert_eq!(eb.block_size_at(15 * 4096 + 1), Some(32768));
    }
}
