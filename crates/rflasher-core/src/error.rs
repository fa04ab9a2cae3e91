//! Error types for rflasher-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // SPI errors
    /// SPI transfer failed
    SpiTransferFailed,
    /// SPI operation timed out
    SpiTimeout,
    /// Opcode is not supported by the programmer
    OpcodeNotSupported,

    // Chip errors
    /// Flash chip not found (JEDEC ID read failed or unknown)
    ChipNotFound,
    /// Flash chip detected but not supported
    ChipNotSupported,
    /// JEDEC ID does not match expected value
    JedecIdMismatch,

    // Operation errors
    /// Erase operation failed
    EraseError,
    /// Write/program operation failed
    WriteError,
    /// Verify operation failed (data mismatch)
    VerifyError,
    /// Operation timed out
    Timeout,

    // Address/size errors
    /// Address is beyond flash chip size
    AddressOutOfBounds,
    /// Operation requires aligned address or size
    InvalidAlignment,
    /// Provided buffer is too small for the operation
    BufferTooSmall,

    // Protection errors
    /// Flash chip is write protected
    WriteProtected,
    /// Specific region is protected
    RegionProtected,

    // Programmer errors
    /// Programmer is not ready (not initialized or busy)
    ProgrammerNotReady,
    /// General programmer error
    ProgrammerError,

    // I/O errors
    /// Read operation failed
    ReadError,
    /// I/O error occurred
    IoError,

    // FMAP errors
    /// No FMAP signature found in the searched image
    FmapNotFound,
    /// FMAP header or area table was truncated
    FmapTruncated,
    /// FMAP header failed validation (bad version, overflowing area count)
    FmapHeaderInvalid,

    // OTP errors
    /// OTP region index is beyond the chip's descriptor
    OtpRegionOutOfRange,
    /// OTP region is locked against further writes
    OtpRegionLocked,
    /// Entering or leaving OTP mode failed
    OtpModeChangeFailed,

    // Resource errors
    /// A bounded collection (e.g. the chip_restore stack) is full
    ResourceLimitExceeded,
    /// Allocation failed
    OutOfMemory,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpiTransferFailed => write!(f, "SPI transfer failed"),
            Self::SpiTimeout => write!(f, "SPI operation timed out"),
            Self::OpcodeNotSupported => write!(f, "SPI opcode not supported by programmer"),
            Self::ChipNotFound => write!(f, "flash chip not found"),
            Self::ChipNotSupported => write!(f, "flash chip not supported"),
            Self::JedecIdMismatch => write!(f, "JEDEC ID mismatch"),
            Self::EraseError => write!(f, "erase operation failed"),
            Self::WriteError => write!(f, "write operation failed"),
            Self::VerifyError => write!(f, "verify failed: data mismatch"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidAlignment => write!(f, "invalid alignment"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::WriteProtected => write!(f, "flash chip is write protected"),
            Self::RegionProtected => write!(f, "region is protected"),
            Self::ProgrammerNotReady => write!(f, "programmer not ready"),
            Self::ProgrammerError => write!(f, "programmer error"),
            Self::ReadError => write!(f, "read operation failed"),
            Self::IoError => write!(f, "I/O error"),
            Self::FmapNotFound => write!(f, "no FMAP signature found"),
            Self::FmapTruncated => write!(f, "FMAP header or area table truncated"),
            Self::FmapHeaderInvalid => write!(f, "FMAP header failed validation"),
            Self::OtpRegionOutOfRange => write!(f, "OTP region index out of range"),
            Self::OtpRegionLocked => write!(f, "OTP region is locked"),
            Self::OtpModeChangeFailed => write!(f, "failed to switch OTP mode"),
            Self::ResourceLimitExceeded => write!(f, "resource limit exceeded"),
            Self::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl Error {
    /// Numeric exit code for this error, for callers (the CLI) that need a
    /// stable process exit status rather than the `Display` text
    pub fn code(&self) -> i32 {
        match self {
            Self::OutOfMemory => -100,
            Self::ResourceLimitExceeded => -101,
            Self::AddressOutOfBounds | Self::InvalidAlignment | Self::BufferTooSmall => -10,
            Self::ChipNotFound | Self::ChipNotSupported | Self::JedecIdMismatch => -20,
            Self::WriteProtected | Self::RegionProtected => -30,
            Self::EraseError | Self::WriteError | Self::VerifyError => -40,
            Self::FmapNotFound | Self::FmapTruncated | Self::FmapHeaderInvalid => -50,
            Self::OtpRegionOutOfRange | Self::OtpRegionLocked | Self::OtpModeChangeFailed => -60,
            _ => -1,
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
