//! Verify command implementation

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use rflasher_core::flash;
use rflasher_core::programmer::SpiMaster;

use crate::cli::Cli;
use crate::commands::load_image;
use crate::engine::Engine;
use crate::error::CliError;
use crate::layout_resolve::resolve_layout;

/// Verify the included regions against `file`
pub fn run<M: SpiMaster>(
    cli: &Cli,
    engine: &mut Engine<M>,
    file: &Path,
) -> Result<(), CliError> {
    let ctx = engine.ctx().clone();
    let layout = resolve_layout(cli, engine.master_mut(), &ctx)?;

    let included: Vec<_> = layout.included_regions().cloned().collect();
    if included.is_empty() {
        return Err("no regions selected for verification".into());
    }

    let total_size = ctx.total_size();
    let expected = load_image(file, total_size, ctx.chip.erased_value)?;

    let total_bytes: usize = included.iter().map(|r| r.size() as usize).sum();
    let pb = ProgressBar::new(total_bytes as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut buf = vec![0u8; total_size];
    let mut bytes_checked = 0usize;
    for region in &included {
        let region_len = region.size() as usize;
        let expected_region = &expected[region.start as usize..=region.end as usize];
        flash::verify(
            engine.master_mut(),
            &ctx,
            region.start,
            expected_region,
            &mut buf,
        )?;
        bytes_checked += region_len;
        pb.set_position(bytes_checked as u64);
    }
    pb.finish_with_message("verification passed");

    println!(
        "{} region(s) ({} byte(s)) verified against {}",
        included.len(),
        bytes_checked,
        file.display()
    );

    Ok(())
}
