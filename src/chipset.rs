//! Built-in chip database
//!
//! No chip-definition files ship with this build (the teacher's build-time
//! codegen crate was dropped, see DESIGN.md), so the only chip this CLI can
//! identify out of the box is the one `rflasher-dummy` emulates. A real
//! deployment would point `ChipDatabase::load_dir` at a directory of RON
//! files instead.

use rflasher_core::chip::{ChipDatabase, EraseBlock, FlashChip, WriteGranularity};
use rflasher_core::spi::opcodes;
use rflasher_dummy::DummyConfig;

/// The chip database this build can probe against
pub fn builtin_chip_database() -> ChipDatabase {
    let mut db = ChipDatabase::empty();
    db.push(dummy_chip());
    db
}

fn dummy_chip() -> FlashChip {
    let cfg = DummyConfig::default();
    FlashChip {
        vendor: "Winbond".to_string(),
        name: "W25Q128FV".to_string(),
        jedec_manufacturer: cfg.manufacturer_id,
        jedec_device: cfg.device_id,
        total_size: cfg.size as u32,
        page_size: cfg.page_size as u16,
        features: Default::default(),
        voltage_min_mv: 2700,
        voltage_max_mv: 3600,
        write_granularity: WriteGranularity::Page,
        erase_blocks: vec![
            EraseBlock::uniform(opcodes::SE_20, cfg.sector_size as u32, cfg.size as u32),
            EraseBlock::uniform(opcodes::BE_52, 32 * 1024, cfg.size as u32),
            EraseBlock::uniform(opcodes::BE_D8, 64 * 1024, cfg.size as u32),
        ],
        erased_value: 0xFF,
        status_register: None,
        write_protect: None,
        wp_range_decoder: Default::default(),
        otp: None,
        tested: Default::default(),
    }
}
