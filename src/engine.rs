//! Process-wide engine state
//!
//! The teacher's process-wide master registry and shutdown stack are
//! modeled here as an explicit value owned by the CLI binary rather than a
//! global singleton, so a future multi-session host (tests, a daemon mode)
//! can run more than one at once.

use rflasher_core::flash::{self, FlashContext};
use rflasher_core::programmer::SpiMaster;

/// A running session: one programmer paired with the chip it identified
pub struct Engine<M: SpiMaster> {
    master: M,
    ctx: FlashContext,
}

impl<M: SpiMaster> Engine<M> {
    /// Wrap an already-probed master/context pair
    pub fn new(master: M, ctx: FlashContext) -> Self {
        Self { master, ctx }
    }

    /// The identified chip's context
    pub fn ctx(&self) -> &FlashContext {
        &self.ctx
    }

    /// Mutable access to the chip context (address mode, restore stack, ...)
    pub fn ctx_mut(&mut self) -> &mut FlashContext {
        &mut self.ctx
    }

    /// Mutable access to the underlying transport
    pub fn master_mut(&mut self) -> &mut M {
        &mut self.master
    }

    /// Run the context's restore stack down and release the master
    ///
    /// Teardown failures are logged, not propagated: the caller's primary
    /// result should win regardless of whether restoring transient register
    /// state succeeded.
    pub fn shutdown(mut self) {
        if let Err(e) = flash::shutdown(&mut self.master, &mut self.ctx) {
            log::warn!("teardown failed to restore chip state: {e}");
        }
    }
}
