//! Read command implementation

use std::fs::File;
use std::io::Write;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use rflasher_core::flash;
use rflasher_core::programmer::SpiMaster;

use crate::cli::Cli;
use crate::engine::Engine;
use crate::error::CliError;
use crate::layout_resolve::resolve_layout;

/// Read the included regions to a file, leaving the rest of the image
/// filled with the chip's erased value
pub fn run<M: SpiMaster>(
    cli: &Cli,
    engine: &mut Engine<M>,
    file: &Path,
) -> Result<(), CliError> {
    let ctx = engine.ctx().clone();
    let layout = resolve_layout(cli, engine.master_mut(), &ctx)?;

    let included: Vec<_> = layout.included_regions().cloned().collect();
    if included.is_empty() {
        return Err("no regions selected for reading".into());
    }

    let total_size = ctx.total_size();
    let mut data = vec![ctx.chip.erased_value; total_size];

    let total_bytes: usize = included.iter().map(|r| r.size() as usize).sum();
    let pb = ProgressBar::new(total_bytes as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut bytes_read = 0usize;
    for region in &included {
        let buf = &mut data[region.start as usize..=region.end as usize];
        flash::read(engine.master_mut(), &ctx, region.start, buf)?;
        bytes_read += buf.len();
        pb.set_position(bytes_read as u64);
    }
    pb.finish_with_message("read complete");

    File::create(file)?.write_all(&data)?;
    println!(
        "wrote {} bytes to {} ({} region(s) read, rest filled with 0x{:02X})",
        data.len(),
        file.display(),
        included.len(),
        ctx.chip.erased_value,
    );

    Ok(())
}
