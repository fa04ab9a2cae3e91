//! High-level flash operations
//!
//! This module provides high-level operations for reading, writing,
//! and erasing flash chips.

mod context;
#[cfg(feature = "alloc")]
mod driver;
mod operations;
#[cfg(feature = "alloc")]
mod planner;

pub use context::{AddressMode, FlashContext, RestoreEntry, MAX_CHIP_RESTORE, UNMAPPED};
#[cfg(feature = "alloc")]
pub use driver::{erase_write, verify_written};
pub use operations::*;
