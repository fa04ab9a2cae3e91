//! Resolves the active region layout from `--layout`/`--fmap`/`--ifd`/`--image`

use std::fs;

use rflasher_core::flash::FlashContext;
use rflasher_core::layout::{self, Layout, LayoutSource, Region};
use rflasher_core::programmer::SpiMaster;

use crate::cli::Cli;
use crate::error::CliError;

/// Build the `Layout` named by the CLI flags and apply `--image` filtering
///
/// With none of `--layout`/`--fmap`/`--fmap-file`/`--ifd` given, the whole
/// chip is treated as a single unnamed region.
pub fn resolve_layout<M: SpiMaster + ?Sized>(
    cli: &Cli,
    master: &mut M,
    ctx: &FlashContext,
) -> Result<Layout, CliError> {
    let mut resolved = if let Some(path) = &cli.layout {
        Layout::from_plaintext_file(path)?
    } else if let Some(path) = &cli.fmap_file {
        let data = fs::read(path)?;
        layout::parse_fmap(&data)?
    } else if cli.fmap {
        layout::read_fmap_from_flash(master, ctx)?
    } else if cli.ifd {
        layout::read_ifd_from_flash(master, ctx)?
    } else {
        whole_chip_layout(ctx)
    };

    resolved.validate(ctx.chip.total_size)?;

    if cli.images.is_empty() {
        resolved.include_all();
    } else {
        resolved.exclude_all();
        for name in &cli.images {
            resolved.include_region(name)?;
        }
    }

    Ok(resolved)
}

fn whole_chip_layout(ctx: &FlashContext) -> Layout {
    let mut layout = Layout::with_source(LayoutSource::Manual);
    layout.chip_size = Some(ctx.chip.total_size);
    layout.add_region(Region::new("chip", 0, ctx.chip.total_size - 1));
    layout
}
