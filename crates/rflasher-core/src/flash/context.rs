//! Flash context - runtime state for flash operations

use crate::chip::FlashChip;
use crate::error::{Error, Result};
use crate::wp::StatusRegister;

/// Sentinel value marking a base address as not memory-mapped
///
/// Used for `physical_addr`/`virtual_addr`/`physical_reg_addr`/
/// `virtual_reg_addr` on transports (SPI, opaque) that have no memory
/// window for the chip.
pub const UNMAPPED: u64 = u64::MAX;

/// Maximum depth of the `chip_restore` stack
pub const MAX_CHIP_RESTORE: usize = 4;

/// Address mode currently in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    /// 3-byte addressing (up to 16 MiB)
    #[default]
    ThreeByte,
    /// 4-byte addressing (up to 4 GiB)
    FourByte,
}

/// A status-register byte saved before a transient modification, to be
/// written back (in LIFO order) when the session shuts down
#[derive(Debug, Clone, Copy)]
pub struct RestoreEntry {
    /// Register the saved byte belongs to
    pub register: StatusRegister,
    /// Value to restore
    pub value: u8,
}

/// Runtime context for flash operations
///
/// This structure holds the state needed to interact with a specific
/// flash chip through a programmer. The chip is identified once, at probe
/// time, and carried by value from then on (it was cloned out of the
/// database, so there is no database borrow to keep alive).
#[derive(Debug, Clone)]
pub struct FlashContext {
    /// The identified flash chip
    pub chip: FlashChip,
    /// Current address mode
    pub address_mode: AddressMode,
    /// Whether to use native 4-byte commands or mode switching
    pub use_native_4byte: bool,
    /// Physical base address of the memory-mapped chip, `UNMAPPED` if none
    pub physical_addr: u64,
    /// Virtual (process-mapped) base address, `UNMAPPED` if none
    pub virtual_addr: u64,
    /// Physical base address of the chip's register window, `UNMAPPED` if none
    pub physical_reg_addr: u64,
    /// Virtual base address of the chip's register window, `UNMAPPED` if none
    pub virtual_reg_addr: u64,
    /// Proceed even when probe results look inconsistent
    pub force: bool,
    /// Proceed even though the board doesn't match the chip's known-good list
    pub force_boardmismatch: bool,
    /// Verify each written chunk immediately after writing it
    pub verify_after_write: bool,
    /// Verify the whole chip after the operation completes, not just the written range
    pub verify_whole_chip: bool,
    /// Cached high byte of the address for chips using an extended-address register
    pub address_high_byte: Option<u8>,
    /// Whether the chip is currently switched into native 4-byte addressing mode
    pub in_4ba_mode: bool,
    /// LIFO stack of status-register bytes to restore on shutdown
    pub chip_restore: heapless::Vec<RestoreEntry, MAX_CHIP_RESTORE>,
}

impl FlashContext {
    /// Create a new flash context for the given chip
    pub fn new(chip: FlashChip) -> Self {
        let address_mode = if chip.requires_4byte_addr() {
            AddressMode::FourByte
        } else {
            AddressMode::ThreeByte
        };

        let use_native_4byte = chip
            .features
            .contains(crate::chip::Features::FOUR_BYTE_NATIVE);

        Self {
            chip,
            address_mode,
            use_native_4byte,
            physical_addr: UNMAPPED,
            virtual_addr: UNMAPPED,
            physical_reg_addr: UNMAPPED,
            virtual_reg_addr: UNMAPPED,
            force: false,
            force_boardmismatch: false,
            verify_after_write: false,
            verify_whole_chip: false,
            address_high_byte: None,
            in_4ba_mode: false,
            chip_restore: heapless::Vec::new(),
        }
    }

    /// Register a status-register byte to restore at shutdown
    ///
    /// Fails with `ResourceLimitExceeded` once `MAX_CHIP_RESTORE` entries are
    /// pending; callers should run the existing stack down before nesting
    /// deeper transient changes.
    pub fn push_restore(&mut self, register: StatusRegister, value: u8) -> Result<()> {
        self.chip_restore
            .push(RestoreEntry { register, value })
            .map_err(|_| Error::ResourceLimitExceeded)
    }

    /// Pop the most recently registered restore entry (LIFO)
    pub fn pop_restore(&mut self) -> Option<RestoreEntry> {
        self.chip_restore.pop()
    }

    /// Get the page size for this chip
    pub fn page_size(&self) -> usize {
        self.chip.page_size as usize
    }

    /// Get the total size of this chip
    pub fn total_size(&self) -> usize {
        self.chip.total_size as usize
    }

    /// Check if an address is valid for this chip
    pub fn is_valid_address(&self, addr: u32) -> bool {
        addr < self.chip.total_size
    }

    /// Check if an address range is valid for this chip
    pub fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        if addr >= self.chip.total_size {
            return false;
        }
        let end = addr as u64 + len as u64;
        end <= self.chip.total_size as u64
    }
}
