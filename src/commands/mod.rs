//! CLI command implementations

mod erase;
mod list;
mod read;
mod verify;
mod write;

pub use erase::run as run_erase;
pub use list::{run_list_supported, run_list_wiki};
pub use read::run as run_read;
pub use verify::run as run_verify;
pub use write::run as run_write;

use std::fs;
use std::path::Path;

use rflasher_core::chip::{ChipDatabase, FlashChip};
use rflasher_core::flash::{self, FlashContext};
use rflasher_core::programmer::SpiMaster;

use crate::cli::Cli;
use crate::error::CliError;

/// Load a file as a chip-sized image, padding shorter files with the
/// chip's erased value and rejecting files that don't fit
pub(crate) fn load_image(
    path: &Path,
    total_size: usize,
    erased_value: u8,
) -> Result<Vec<u8>, CliError> {
    let mut data = fs::read(path)?;
    if data.len() > total_size {
        return Err(format!(
            "{} is {} byte(s), larger than the chip ({total_size} byte(s))",
            path.display(),
            data.len()
        )
        .into());
    }
    data.resize(total_size, erased_value);
    Ok(data)
}

/// Identify the chip to operate on: `--chip <name>` forces a lookup by
/// name, skipping JEDEC autoprobe; otherwise the chip is autoprobed.
pub(crate) fn identify_chip<M: SpiMaster + ?Sized>(
    cli: &Cli,
    master: &mut M,
    db: &ChipDatabase,
) -> Result<FlashContext, CliError> {
    let ctx = if let Some(name) = &cli.chip {
        let chip: FlashChip = db
            .find_by_name(name)
            .into_iter()
            .next()
            .ok_or_else(|| format!("chip '{name}' not found in the chip database"))?
            .clone();
        let mut ctx = FlashContext::new(chip);
        ctx.force = cli.force;
        ctx
    } else {
        let mut ctx = flash::probe(master, db)?;
        ctx.force = cli.force;
        ctx
    };

    log::info!(
        "identified {} {} ({} bytes)",
        ctx.chip.vendor,
        ctx.chip.name,
        ctx.chip.total_size
    );

    Ok(ctx)
}
