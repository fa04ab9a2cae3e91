//! List commands implementation

use rflasher_core::chip::ChipDatabase;

use crate::error::CliError;

/// List chips known to this build, human-readable
pub fn run_list_supported(db: &ChipDatabase) -> Result<(), CliError> {
    println!("Supported flash chips ({} total):", db.len());
    println!();
    println!(
        "{:<12} {:<16} {:>10} {:>10}",
        "Vendor", "Name", "Size", "JEDEC ID"
    );
    println!("{}", "-".repeat(52));

    for chip in db.iter() {
        println!(
            "{:<12} {:<16} {:>10} {:>10}",
            chip.vendor,
            chip.name,
            format_size(chip.total_size),
            format!("{:02X} {:04X}", chip.jedec_manufacturer, chip.jedec_device),
        );
    }

    Ok(())
}

/// List chips known to this build, as a wiki table (`flashrom`'s convention)
pub fn run_list_wiki(db: &ChipDatabase) -> Result<(), CliError> {
    println!("{{| class=\"wikitable sortable\"");
    println!("! Vendor !! Name !! Size !! JEDEC ID");
    for chip in db.iter() {
        println!("|-");
        println!(
            "| {} || {} || {} || {:02X} {:04X}",
            chip.vendor,
            chip.name,
            format_size(chip.total_size),
            chip.jedec_manufacturer,
            chip.jedec_device,
        );
    }
    println!("|}}");

    Ok(())
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{bytes} B")
    }
}
