//! Erase command implementation

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rflasher_core::flash;
use rflasher_core::programmer::SpiMaster;

use crate::cli::Cli;
use crate::engine::Engine;
use crate::error::CliError;
use crate::layout_resolve::resolve_layout;

/// Erase the included regions (the whole chip, with no layout flags given)
pub fn run<M: SpiMaster>(
    cli: &Cli,
    engine: &mut Engine<M>,
) -> Result<(), CliError> {
    let ctx = engine.ctx().clone();
    let layout = resolve_layout(cli, engine.master_mut(), &ctx)?;

    let included: Vec<_> = layout.included_regions().cloned().collect();
    if included.is_empty() {
        return Err("no regions selected for erasing".into());
    }

    let readonly = layout.readonly_included();
    if !readonly.is_empty() && !cli.force {
        let names: Vec<_> = readonly.iter().map(|r| r.name.as_str()).collect();
        return Err(format!(
            "refusing to erase readonly region(s): {} (use --force to override)",
            names.join(", ")
        )
        .into());
    }

    let total_bytes: usize = included.iter().map(|r| r.size() as usize).sum();
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!(
        "erasing {} region(s), {} byte(s)...",
        included.len(),
        total_bytes
    ));
    pb.enable_steady_tick(Duration::from_millis(100));

    flash::erase_by_layout(engine.master_mut(), &ctx, &layout)?;

    pb.finish_with_message("erase complete");
    println!(
        "erased {} region(s) ({} byte(s))",
        included.len(),
        total_bytes
    );

    Ok(())
}
