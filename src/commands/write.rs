//! Write command implementation

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rflasher_core::flash::{self, erase_write, verify_written};
use rflasher_core::programmer::SpiMaster;

use crate::cli::Cli;
use crate::commands::load_image;
use crate::engine::Engine;
use crate::error::CliError;
use crate::layout_resolve::resolve_layout;

/// Write `file`'s contents to the included regions
///
/// `file` is treated as a full chip-sized image: bytes at each included
/// region's offsets are applied, the rest of the file is ignored. Regions
/// not covered by `--image` keep the contents of `--flash-contents` (or
/// the chip's current contents, if that flag is absent).
pub fn run<M: SpiMaster>(
    cli: &Cli,
    engine: &mut Engine<M>,
    file: &Path,
) -> Result<(), CliError> {
    let ctx = engine.ctx().clone();
    let layout = resolve_layout(cli, engine.master_mut(), &ctx)?;

    let included: Vec<_> = layout.included_regions().cloned().collect();
    if included.is_empty() {
        return Err("no regions selected for writing".into());
    }

    let readonly = layout.readonly_included();
    if !readonly.is_empty() && !cli.force {
        let names: Vec<_> = readonly.iter().map(|r| r.name.as_str()).collect();
        return Err(format!(
            "refusing to write readonly region(s): {} (use --force to override)",
            names.join(", ")
        )
        .into());
    }

    let total_size = ctx.total_size();
    let incoming = load_image(file, total_size, ctx.chip.erased_value)?;

    let mut cur = vec![0u8; total_size];
    flash::read(engine.master_mut(), &ctx, 0, &mut cur)?;

    let mut new_image = match &cli.flash_contents {
        Some(path) => load_image(path, total_size, ctx.chip.erased_value)?,
        None => cur.clone(),
    };
    for region in &included {
        let range = region.start as usize..=region.end as usize;
        new_image[range.clone()].copy_from_slice(&incoming[range]);
    }

    let total_bytes: usize = included.iter().map(|r| r.size() as usize).sum();
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!(
        "writing {} region(s), {} byte(s)...",
        included.len(),
        total_bytes
    ));
    pb.enable_steady_tick(Duration::from_millis(100));

    for region in &included {
        erase_write(
            engine.master_mut(),
            &ctx,
            region.start,
            region.end,
            &cur,
            &new_image,
        )?;
    }
    pb.finish_with_message("write complete");

    if !cli.noverify {
        for region in &included {
            let expected = &new_image[region.start as usize..=region.end as usize];
            verify_written(engine.master_mut(), &ctx, region.start, expected)?;
        }
    }

    if !cli.noverify_all {
        let mut buf = vec![0u8; total_size];
        flash::verify(engine.master_mut(), &ctx, 0, &new_image, &mut buf)?;
    }

    println!(
        "wrote {} region(s) from {} ({} byte(s))",
        included.len(),
        file.display(),
        total_bytes
    );

    Ok(())
}
