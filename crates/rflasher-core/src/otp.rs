//! One-Time Programmable area and security register support
//!
//! SPI flash OTP/security registers come in two families, distinguished by
//! how the lock state is controlled:
//!
//! - EON-style: the chip has a dedicated OTP mode entered and exited with a
//!   command pair. Block-protect bits are meaningless while in OTP mode, so
//!   entry saves them and clears them, and exit restores them. Locking a
//!   region sets SRP0 while still inside OTP mode.
//! - GigaDevice/Winbond-style: no mode switch exists. Each OTP region has
//!   its own dedicated lock-bit (LB1/LB2/LB3) in the status registers, set
//!   directly to lock that region. Reads/writes/erases use dedicated
//!   security-register opcodes at all times.

use maybe_async::maybe_async;

use crate::error::{Error, Result};
use crate::programmer::SpiMaster;
use crate::protocol;
use crate::spi::{opcodes, SpiCommand};
use crate::wp::{BitWritability, RegBitInfo, StatusRegister, WpBits, WpRegBitMap};

/// How a chip's OTP/security register lock state is controlled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum OtpLockConvention {
    /// Dedicated OTP mode entered/exited with the given opcodes; BP bits
    /// are saved/restored around the mode switch, lock is SRP0
    Eon {
        /// Opcode to enter OTP mode
        enter_opcode: u8,
        /// Opcode to leave OTP mode
        exit_opcode: u8,
    },
    /// No mode switch; each region has a dedicated lock bit in the status
    /// registers, addressed directly
    DedicatedLockBits,
}

/// A single OTP/security register region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct OtpRegion {
    /// Base address OR'd into read/write/erase addresses to select this region
    pub start_byte: u32,
    /// Size of the region in bytes
    pub size: u32,
    /// Absolute bit position (register*8 + bit) of this region's dedicated
    /// lock bit. Only meaningful for [`OtpLockConvention::DedicatedLockBits`].
    pub lock_bit_pos: Option<u8>,
}

impl OtpRegion {
    /// Register this region's lock bit lives in (`DedicatedLockBits` only)
    pub fn lock_reg_bit(&self) -> Option<RegBitInfo> {
        let pos = self.lock_bit_pos?;
        let reg = match pos / 8 {
            0 => StatusRegister::Status1,
            1 => StatusRegister::Status2,
            _ => StatusRegister::Status3,
        };
        Some(RegBitInfo::new(reg, pos % 8, BitWritability::Otp))
    }
}

/// Maximum number of OTP regions a chip descriptor can enumerate
pub const MAX_OTP_REGIONS: usize = 4;

/// Describes a chip's OTP/security register area
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct OtpDescriptor {
    /// Lock convention this chip uses
    pub convention: OtpLockConvention,
    /// Regions, in the order they appear in the address space
    pub regions: heapless::Vec<OtpRegion, MAX_OTP_REGIONS>,
    /// Opcode used to read OTP/security register contents
    pub read_opcode: u8,
    /// Opcode used to program OTP/security register contents
    pub write_opcode: u8,
    /// Opcode used to erase an OTP/security register region, if erasable
    pub erase_opcode: Option<u8>,
}

impl OtpDescriptor {
    /// GigaDevice/Winbond-style descriptor using the standard security
    /// register opcodes (RDSCUR/PRSCUR/ERSCUR family: 0x48/0x42/0x44)
    pub fn dedicated_lock_bits(regions: &[OtpRegion]) -> Self {
        let mut v = heapless::Vec::new();
        for r in regions.iter().take(MAX_OTP_REGIONS) {
            let _ = v.push(*r);
        }
        Self {
            convention: OtpLockConvention::DedicatedLockBits,
            regions: v,
            read_opcode: opcodes::RDSR_SEC,
            write_opcode: opcodes::PRSR,
            erase_opcode: Some(opcodes::ERSR),
        }
    }

    /// EON-style descriptor with a dedicated OTP-mode entry/exit pair
    pub fn eon(enter_opcode: u8, exit_opcode: u8, regions: &[OtpRegion]) -> Self {
        let mut v = heapless::Vec::new();
        for r in regions.iter().take(MAX_OTP_REGIONS) {
            let _ = v.push(*r);
        }
        Self {
            convention: OtpLockConvention::Eon {
                enter_opcode,
                exit_opcode,
            },
            regions: v,
            read_opcode: opcodes::READ,
            write_opcode: opcodes::PP,
            erase_opcode: None,
        }
    }

    /// The top non-zero-size region index (used for bounds checking)
    fn top_region_index(&self) -> Option<usize> {
        self.regions
            .iter()
            .enumerate()
            .rev()
            .find(|(_, r)| r.size > 0)
            .map(|(i, _)| i)
    }
}

/// Errors specific to OTP/security register operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpError {
    /// Chip has no OTP descriptor
    Unsupported,
    /// `region_index` is beyond the top non-empty region
    RegionOutOfRange,
    /// `start_byte + len` exceeds the region's size
    AccessOutOfRange,
    /// Region's lock bit is already set; can't write to it
    RegionLocked,
    /// Failed to enter or leave OTP mode
    ModeSwitchFailed,
    /// Underlying SPI error
    SpiError(Error),
}

impl From<Error> for OtpError {
    fn from(e: Error) -> Self {
        OtpError::SpiError(e)
    }
}

impl core::fmt::Display for OtpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OtpError::Unsupported => write!(f, "chip has no OTP/security register area"),
            OtpError::RegionOutOfRange => write!(f, "OTP region index out of range"),
            OtpError::AccessOutOfRange => write!(f, "access exceeds OTP region bounds"),
            OtpError::RegionLocked => write!(f, "OTP region is locked"),
            OtpError::ModeSwitchFailed => write!(f, "failed to switch OTP mode"),
            OtpError::SpiError(e) => write!(f, "SPI error: {}", e),
        }
    }
}

/// Result type for OTP operations
pub type OtpResult<T> = core::result::Result<T, OtpError>;

/// Validate a `(region_index, start_byte, len)` access against the descriptor
///
/// `region_index` must not exceed the top region with non-zero size, and
/// `start_byte + len` must fit within that region.
pub fn otp_error_check(otp: &OtpDescriptor, region_index: usize, start_byte: u32, len: u32) -> OtpResult<()> {
    let top = otp.top_region_index().ok_or(OtpError::RegionOutOfRange)?;
    if region_index > top {
        return Err(OtpError::RegionOutOfRange);
    }
    let region = otp
        .regions
        .get(region_index)
        .ok_or(OtpError::RegionOutOfRange)?;
    if start_byte + len > region.size {
        return Err(OtpError::AccessOutOfRange);
    }
    Ok(())
}

/// State to restore after leaving EON-style OTP mode
#[derive(Debug, Clone, Copy, Default)]
struct SavedBpBits {
    bp: [u8; crate::wp::MAX_BP_BITS],
    bp_count: usize,
}

/// Enter EON-style OTP mode, saving BP bits so they can be restored on exit
///
/// Saving and clearing BP bits before switching into OTP mode (and
/// restoring them afterwards) mirrors the enter/exit pairing in the
/// original EON driver; BP bits are not meaningful while in OTP mode.
#[maybe_async]
async fn enter_otp_mode<M: SpiMaster + ?Sized>(
    master: &mut M,
    enter_opcode: u8,
    wp_bits: &WpRegBitMap,
) -> OtpResult<SavedBpBits> {
    let bp_count = wp_bits.bp_count();
    let mut saved = SavedBpBits {
        bp: [0; crate::wp::MAX_BP_BITS],
        bp_count,
    };

    let mut current = WpBits::empty();
    current.bp_count = bp_count;
    for i in 0..bp_count {
        let bit_info = &wp_bits.bp[i];
        if let Some(reg) = bit_info.reg {
            let sr = match reg {
                StatusRegister::Status1 => protocol::read_status1(master).await?,
                StatusRegister::Status2 | StatusRegister::Config => {
                    protocol::read_status2(master).await?
                }
                StatusRegister::Status3 => protocol::read_status3(master).await?,
            };
            saved.bp[i] = (sr >> bit_info.bit_index) & 1;
        }
    }

    let mut cmd = SpiCommand::simple(enter_opcode);
    master.execute(&mut cmd).map_err(OtpError::from)?;

    crate::wp::disable_wp(master, wp_bits, crate::wp::WriteOptions::default())
        .await
        .map_err(|_| OtpError::ModeSwitchFailed)?;

    Ok(saved)
}

/// Leave EON-style OTP mode, restoring the BP bits saved by [`enter_otp_mode`]
#[maybe_async]
async fn exit_otp_mode<M: SpiMaster + ?Sized>(
    master: &mut M,
    exit_opcode: u8,
    wp_bits: &WpRegBitMap,
    saved: SavedBpBits,
) -> OtpResult<()> {
    let mut cmd = SpiCommand::simple(exit_opcode);
    master.execute(&mut cmd).map_err(OtpError::from)?;

    let mut bits = WpBits::empty();
    bits.bp_count = saved.bp_count;
    for i in 0..saved.bp_count {
        bits.bp[i] = saved.bp[i];
    }
    crate::wp::write_wp_bits(master, &bits, wp_bits, crate::wp::WriteOptions::default())
        .await
        .map_err(|_| OtpError::ModeSwitchFailed)?;

    Ok(())
}

/// Lock an OTP region, idempotently (already-locked is not an error)
#[maybe_async]
pub async fn lock_region<M: SpiMaster + ?Sized>(
    master: &mut M,
    otp: &OtpDescriptor,
    region_index: usize,
    wp_bits: Option<&WpRegBitMap>,
) -> OtpResult<()> {
    otp_error_check(otp, region_index, 0, 0)?;
    let region = otp.regions[region_index];

    match otp.convention {
        OtpLockConvention::Eon {
            enter_opcode,
            exit_opcode,
        } => {
            let wp_bits = wp_bits.ok_or(OtpError::Unsupported)?;
            let saved = enter_otp_mode(master, enter_opcode, wp_bits).await?;
            if wp_bits.srp.is_writable() {
                let mut bits = WpBits::empty();
                bits.srp = Some(1);
                let already_locked = {
                    let sr1 = protocol::read_status1(master).await?;
                    (sr1 >> wp_bits.srp.bit_index) & 1 == 1
                };
                if !already_locked {
                    crate::wp::write_wp_bits(master, &bits, wp_bits, crate::wp::WriteOptions::default())
                        .await
                        .map_err(|_| OtpError::ModeSwitchFailed)?;
                }
            }
            exit_otp_mode(master, exit_opcode, wp_bits, saved).await
        }
        OtpLockConvention::DedicatedLockBits => {
            let lock_bit = region.lock_reg_bit().ok_or(OtpError::Unsupported)?;
            let current = match lock_bit.reg {
                Some(StatusRegister::Status1) => protocol::read_status1(master).await?,
                Some(StatusRegister::Status2) | Some(StatusRegister::Config) => {
                    protocol::read_status2(master).await?
                }
                Some(StatusRegister::Status3) => protocol::read_status3(master).await?,
                None => return Err(OtpError::Unsupported),
            };
            if (current >> lock_bit.bit_index) & 1 == 1 {
                // Already locked: nothing to do.
                return Ok(());
            }
            let new_val = current | (1 << lock_bit.bit_index);
            match lock_bit.reg {
                Some(StatusRegister::Status1) => {
                    protocol::write_status1(master, new_val).await?;
                }
                Some(StatusRegister::Status2) | Some(StatusRegister::Config) => {
                    let sr1 = protocol::read_status1(master).await?;
                    protocol::write_status12(master, sr1, new_val).await?;
                }
                Some(StatusRegister::Status3) => {
                    let sr1 = protocol::read_status1(master).await?;
                    let sr2 = protocol::read_status2(master).await.unwrap_or(0);
                    protocol::write_status123(master, sr1, sr2, new_val).await?;
                }
                None => unreachable!(),
            }
            Ok(())
        }
    }
}

/// Read `len` bytes at `offset` within OTP `region_index`
#[maybe_async]
pub async fn read_otp<M: SpiMaster + ?Sized>(
    master: &mut M,
    otp: &OtpDescriptor,
    region_index: usize,
    offset: u32,
    buf: &mut [u8],
    wp_bits: Option<&WpRegBitMap>,
) -> OtpResult<()> {
    otp_error_check(otp, region_index, offset, buf.len() as u32)?;
    let region = otp.regions[region_index];
    let addr = region.start_byte + offset;

    match otp.convention {
        OtpLockConvention::Eon {
            enter_opcode,
            exit_opcode,
        } => {
            let wp_bits = wp_bits.ok_or(OtpError::Unsupported)?;
            let saved = enter_otp_mode(master, enter_opcode, wp_bits).await?;
            let mut cmd = SpiCommand::read_3b(otp.read_opcode, addr, buf);
            let result = master.execute(&mut cmd).map_err(OtpError::from);
            exit_otp_mode(master, exit_opcode, wp_bits, saved).await?;
            result
        }
        OtpLockConvention::DedicatedLockBits => {
            let mut cmd = SpiCommand::read_3b(otp.read_opcode, addr, buf);
            master.execute(&mut cmd).map_err(OtpError::from)
        }
    }
}

/// Program `data` at `offset` within OTP `region_index`
#[maybe_async]
pub async fn write_otp<M: SpiMaster + ?Sized>(
    master: &mut M,
    otp: &OtpDescriptor,
    region_index: usize,
    offset: u32,
    data: &[u8],
    wp_bits: Option<&WpRegBitMap>,
) -> OtpResult<()> {
    otp_error_check(otp, region_index, offset, data.len() as u32)?;
    let region = otp.regions[region_index];

    if let Some(lock_bit) = region.lock_reg_bit() {
        let current = match lock_bit.reg {
            Some(StatusRegister::Status1) => protocol::read_status1(master).await?,
            Some(StatusRegister::Status2) | Some(StatusRegister::Config) => {
                protocol::read_status2(master).await?
            }
            Some(StatusRegister::Status3) => protocol::read_status3(master).await?,
            None => 0,
        };
        if (current >> lock_bit.bit_index) & 1 == 1 {
            return Err(OtpError::RegionLocked);
        }
    }

    let addr = region.start_byte + offset;

    match otp.convention {
        OtpLockConvention::Eon {
            enter_opcode,
            exit_opcode,
        } => {
            let wp_bits = wp_bits.ok_or(OtpError::Unsupported)?;
            let saved = enter_otp_mode(master, enter_opcode, wp_bits).await?;
            protocol::write_enable(master).await.map_err(OtpError::from)?;
            let mut cmd = SpiCommand::write_3b(otp.write_opcode, addr, data);
            let result = master.execute(&mut cmd).map_err(OtpError::from);
            exit_otp_mode(master, exit_opcode, wp_bits, saved).await?;
            result
        }
        OtpLockConvention::DedicatedLockBits => {
            protocol::write_enable(master).await.map_err(OtpError::from)?;
            let mut cmd = SpiCommand::write_3b(otp.write_opcode, addr, data);
            master.execute(&mut cmd).map_err(OtpError::from)
        }
    }
}

/// Erase OTP `region_index`, if the chip supports erasing it
#[maybe_async]
pub async fn erase_otp<M: SpiMaster + ?Sized>(
    master: &mut M,
    otp: &OtpDescriptor,
    region_index: usize,
    wp_bits: Option<&WpRegBitMap>,
) -> OtpResult<()> {
    otp_error_check(otp, region_index, 0, 0)?;
    let region = otp.regions[region_index];
    let erase_opcode = otp.erase_opcode.ok_or(OtpError::Unsupported)?;
    let addr = region.start_byte;

    match otp.convention {
        OtpLockConvention::Eon {
            enter_opcode,
            exit_opcode,
        } => {
            let wp_bits = wp_bits.ok_or(OtpError::Unsupported)?;
            let saved = enter_otp_mode(master, enter_opcode, wp_bits).await?;
            protocol::write_enable(master).await.map_err(OtpError::from)?;
            let mut cmd = SpiCommand::erase_3b(erase_opcode, addr);
            let result = master.execute(&mut cmd).map_err(OtpError::from);
            exit_otp_mode(master, exit_opcode, wp_bits, saved).await?;
            result
        }
        OtpLockConvention::DedicatedLockBits => {
            protocol::write_enable(master).await.map_err(OtpError::from)?;
            let mut cmd = SpiCommand::erase_3b(erase_opcode, addr);
            master.execute(&mut cmd).map_err(OtpError::from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_check_rejects_out_of_range_region() {
        let otp = OtpDescriptor::dedicated_lock_bits(&[OtpRegion {
            start_byte: 0,
            size: 256,
            lock_bit_pos: Some(11),
        }]);
        assert_eq!(
            otp_error_check(&otp, 1, 0, 1),
            Err(OtpError::RegionOutOfRange)
        );
    }

    #[test]
    fn error_check_rejects_overflowing_access() {
        let otp = OtpDescriptor::dedicated_lock_bits(&[OtpRegion {
            start_byte: 0,
            size: 256,
            lock_bit_pos: Some(11),
        }]);
        assert_eq!(
            otp_error_check(&otp, 0, 200, 100),
            Err(OtpError::AccessOutOfRange)
        );
        assert_eq!(otp_error_check(&otp, 0, 0, 256), Ok(()));
    }

    #[test]
    fn lock_bit_position_decodes_register_and_bit() {
        let region = OtpRegion {
            start_byte: 0,
            size: 256,
            lock_bit_pos: Some(11), // register 1 (SR2), bit 3
        };
        let rb = region.lock_reg_bit().unwrap();
        assert_eq!(rb.reg, Some(StatusRegister::Status2));
        assert_eq!(rb.bit_index, 3);
    }
}
