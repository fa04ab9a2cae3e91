//! Write protection range decoding
//!
//! Chips encode the protected range as BP (block protect) bits plus a
//! handful of modifier bits (TB, SEC, CMP). The mapping from those bits to
//! an actual byte range varies by vendor family; [`RangeDecoder`] selects
//! which mapping applies and [`decode_range`]/[`find_bits_for_range`] convert
//! between the two directions.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use super::types::{RangeDecoder, WpBits, WpRange};

/// A protected range in the flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectedRange {
    /// Start address of protected region
    pub start: u32,
    /// End address of protected region (exclusive)
    pub end: u32,
}

impl ProtectedRange {
    /// Create a new protected range
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create a range representing no protection
    pub const fn none() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Create a range representing full chip protection
    pub const fn full(size: u32) -> Self {
        Self {
            start: 0,
            end: size,
        }
    }

    /// Check if this range protects any part of the chip
    pub const fn is_protected(&self) -> bool {
        self.end > self.start
    }

    /// Get the size of the protected region
    pub const fn size(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Check if an address is within the protected range
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Check if a range overlaps with the protected region
    pub const fn overlaps(&self, start: u32, len: u32) -> bool {
        let range_end = start + len;
        !(range_end <= self.start || start >= self.end)
    }
}

/// Highest BP value representable with `bp_count` bits
fn max_bp(bp_count: usize) -> u8 {
    if bp_count == 0 {
        0
    } else {
        (1u8 << bp_count) - 1
    }
}

/// Protected size for the standard doubling scheme: each BP increment doubles
/// the protected region, with SEC selecting a 4KiB/64KiB base unit.
/// Matches Winbond/GigaDevice/most SPI25 parts.
fn protected_size_spi25(bp: u8, bp_count: usize, sec: bool, total_size: u32) -> u32 {
    let top = max_bp(bp_count);
    if bp == 0 {
        0
    } else if bp >= top {
        total_size
    } else {
        let base: u32 = if sec { 4 * 1024 } else { 64 * 1024 };
        base << (bp - 1)
    }
}

/// Protected size for chips with an extra BP bit that doubles the base unit
/// relative to [`protected_size_spi25`] (some larger-density Winbond parts).
fn protected_size_2x_block(bp: u8, bp_count: usize, sec: bool, total_size: u32) -> u32 {
    let top = max_bp(bp_count);
    if bp == 0 {
        0
    } else if bp >= top {
        total_size
    } else {
        let base: u32 = if sec { 8 * 1024 } else { 128 * 1024 };
        base << (bp - 1)
    }
}

/// Protected size for chips that count linear 64KiB blocks rather than
/// doubling (seen on some Macronix parts without a SEC bit).
fn protected_size_64k_block(bp: u8, bp_count: usize, total_size: u32) -> u32 {
    let top = max_bp(bp_count);
    if bp >= top {
        total_size
    } else {
        (bp as u32) * 64 * 1024
    }
}

/// Invert a protected range around the chip (used when CMP flips which side
/// of the chip is protected rather than flipping the BP encoding itself)
fn invert_range(start: u32, len: u32, total_size: u32) -> (u32, u32) {
    if len == 0 {
        (0, total_size)
    } else if start == 0 {
        (len, total_size.saturating_sub(len))
    } else {
        (0, start)
    }
}

/// Decode BP/TB/SEC/CMP bits into a protected byte range
///
/// `bits.bp_count` selects how many BP bits are significant; bits beyond
/// that count are ignored.
pub fn decode_range(bits: &WpBits, total_size: u32, decoder: RangeDecoder) -> WpRange {
    let bp_count = bits.bp_count;
    let mut bp = bits.bp_value();
    let sec = bits.sec == Some(1);
    let tb = bits.tb == Some(1);
    let cmp = bits.cmp == Some(1);

    // On the BitCmp family, CMP flips the BP encoding itself before lookup
    // instead of inverting the resulting range (some Macronix parts).
    if decoder == RangeDecoder::Spi25BitCmp && cmp {
        bp = (!bp) & max_bp(bp_count);
    }

    let protected_size = match decoder {
        RangeDecoder::Spi25 | RangeDecoder::Spi25BitCmp => {
            protected_size_spi25(bp, bp_count, sec, total_size)
        }
        RangeDecoder::Spi25_64kBlock => protected_size_64k_block(bp, bp_count, total_size),
        RangeDecoder::Spi25_2xBlock => protected_size_2x_block(bp, bp_count, sec, total_size),
    };
    let protected_size = core::cmp::min(protected_size, total_size);

    let (start, len) = if protected_size == 0 {
        (0, 0)
    } else if tb {
        (0, protected_size)
    } else {
        (total_size.saturating_sub(protected_size), protected_size)
    };

    let (start, len) = if cmp && decoder != RangeDecoder::Spi25BitCmp {
        invert_range(start, len, total_size)
    } else {
        (start, len)
    };

    WpRange::new(start, len)
}

/// Find a `WpBits` combination that decodes to `range`
///
/// `template` supplies which of TB/SEC/CMP the chip has (as `Some(_)`) and
/// how many BP bits are available (`bp_count`); only combinations that keep
/// those same bits present are tried. Returns `None` if no combination of
/// the chip's bits produces exactly `range`.
pub fn find_bits_for_range(
    range: &WpRange,
    total_size: u32,
    template: &WpBits,
    decoder: RangeDecoder,
) -> Option<WpBits> {
    let bp_count = template.bp_count;
    let top = max_bp(bp_count);

    for cmp_raw in 0..=1u8 {
        if template.cmp.is_none() && cmp_raw != 0 {
            continue;
        }
        for sec_raw in 0..=1u8 {
            if template.sec.is_none() && sec_raw != 0 {
                continue;
            }
            for tb_raw in 0..=1u8 {
                if template.tb.is_none() && tb_raw != 0 {
                    continue;
                }
                for bp in 0..=top {
                    let mut candidate = *template;
                    candidate.set_bp_value(bp, bp_count);
                    if template.cmp.is_some() {
                        candidate.cmp = Some(cmp_raw);
                    }
                    if template.sec.is_some() {
                        candidate.sec = Some(sec_raw);
                    }
                    if template.tb.is_some() {
                        candidate.tb = Some(tb_raw);
                    }
                    if decode_range(&candidate, total_size, decoder) == *range {
                        return Some(candidate);
                    }
                    if bp_count == 0 {
                        break;
                    }
                }
            }
        }
    }

    None
}

/// Enumerate every distinct protected range the chip's bits can produce
#[cfg(feature = "alloc")]
pub fn get_all_ranges(template: &WpBits, total_size: u32, decoder: RangeDecoder) -> Vec<WpRange> {
    let bp_count = template.bp_count;
    let top = max_bp(bp_count);
    let mut ranges = Vec::new();

    for cmp_raw in 0..=1u8 {
        if template.cmp.is_none() && cmp_raw != 0 {
            continue;
        }
        for sec_raw in 0..=1u8 {
            if template.sec.is_none() && sec_raw != 0 {
                continue;
            }
            for tb_raw in 0..=1u8 {
                if template.tb.is_none() && tb_raw != 0 {
                    continue;
                }
                for bp in 0..=top {
                    let mut candidate = *template;
                    candidate.set_bp_value(bp, bp_count);
                    if template.cmp.is_some() {
                        candidate.cmp = Some(cmp_raw);
                    }
                    if template.sec.is_some() {
                        candidate.sec = Some(sec_raw);
                    }
                    if template.tb.is_some() {
                        candidate.tb = Some(tb_raw);
                    }
                    let range = decode_range(&candidate, total_size, decoder);
                    if !ranges.contains(&range) {
                        ranges.push(range);
                    }
                    if bp_count == 0 {
                        break;
                    }
                }
            }
        }
    }

    ranges.sort_by_key(|r| (r.start, r.len));
    ranges
}
