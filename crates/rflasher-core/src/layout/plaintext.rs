//! Plain-text layout file format
//!
//! One region per line: `startaddr:endaddr name`, both addresses hex
//! (with or without a `0x` prefix). Blank lines and lines starting with
//! `#` are ignored. This is the traditional flashrom `-l` layout format.

use std::format;
use std::path::Path;
use std::string::{String, ToString};
use std::vec::Vec;

use super::{Layout, LayoutError, LayoutSource, Region};

fn parse_hex(s: &str) -> Result<u32, LayoutError> {
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(s, 16).map_err(|_| LayoutError::ParseError)
}

/// Parse a plain-text layout from its textual content
pub fn parse_plaintext(content: &str) -> Result<Layout, LayoutError> {
    let mut layout = Layout::with_source(LayoutSource::Manual);

    for raw_line in content.lines() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let (range, name) = line.split_once(char::is_whitespace).ok_or(LayoutError::ParseError)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(LayoutError::ParseError);
        }

        let (start_str, end_str) = range.split_once(':').ok_or(LayoutError::ParseError)?;
        let start = parse_hex(start_str)?;
        let end = parse_hex(end_str)?;
        if start > end {
            return Err(LayoutError::InvalidRegion);
        }

        layout.add_region(Region::new(name, start, end));
    }

    layout.sort_by_address();
    Ok(layout)
}

/// Serialize a layout back into the plain-text format
pub fn write_plaintext(layout: &Layout) -> String {
    let mut lines: Vec<String> = layout
        .regions
        .iter()
        .map(|r| format!("{:08x}:{:08x} {}", r.start, r.end, r.name))
        .collect();
    lines.push(String::new());
    lines.join("\n")
}

impl Layout {
    /// Parse a layout from plain-text file content
    pub fn from_plaintext_str(content: &str) -> Result<Self, LayoutError> {
        parse_plaintext(content)
    }

    /// Parse a layout from a plain-text file on disk
    pub fn from_plaintext_file(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let data = std::fs::read_to_string(path).map_err(|_| LayoutError::IoError)?;
        parse_plaintext(&data)
    }

    /// Write this layout to a plain-text file on disk
    pub fn to_plaintext_file(&self, path: impl AsRef<Path>) -> Result<(), LayoutError> {
        std::fs::write(path, write_plaintext(self)).map_err(|_| LayoutError::IoError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_layout() {
        let text = "\
            00000000:00000fff bootblock\n\
            # comment line\n\
            \n\
            0x1000:0x1fff ro_vpd\n";
        let layout = parse_plaintext(text).unwrap();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.regions[0].name, "bootblock");
        assert_eq!(layout.regions[0].start, 0);
        assert_eq!(layout.regions[0].end, 0xfff);
        assert_eq!(layout.regions[1].name, "ro_vpd");
        assert_eq!(layout.regions[1].start, 0x1000);
        assert_eq!(layout.regions[1].end, 0x1fff);
    }

    #[test]
    fn rejects_inverted_range() {
        let text = "00001000:00000000 bad\n";
        assert_eq!(parse_plaintext(text), Err(LayoutError::InvalidRegion));
    }

    #[test]
    fn rejects_missing_name() {
        let text = "00000000:00000fff\n";
        assert_eq!(parse_plaintext(text), Err(LayoutError::ParseError));
    }

    #[test]
    fn round_trips_through_write() {
        let text = "00000000:00000fff bootblock\n00001000:00001fff ro_vpd\n";
        let layout = parse_plaintext(text).unwrap();
        let written = write_plaintext(&layout);
        let reparsed = parse_plaintext(&written).unwrap();
        assert_eq!(reparsed.regions, layout.regions);
    }
}
