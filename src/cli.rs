//! Command-line argument definitions

use clap::{Parser, Subcommand};

/// Flash chip programmer
#[derive(Debug, Parser)]
#[command(name = "rflasher", version, about = "Flash chip programmer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Programmer to use, as `name[:k=v[,k=v]...]` (only `dummy` is wired)
    #[arg(long, global = true, default_value = "dummy")]
    pub programmer: String,

    /// Force probing/operating on a specific chip by name, skipping autoprobe
    #[arg(long, global = true)]
    pub chip: Option<String>,

    /// Plain-text layout file (`hex_start:hex_end name` per line)
    #[arg(long, global = true)]
    pub layout: Option<std::path::PathBuf>,

    /// Search the flash image for an FMAP to use as the layout
    #[arg(long, global = true)]
    pub fmap: bool,

    /// Read the FMAP from this file instead of the flash image
    #[arg(long, global = true)]
    pub fmap_file: Option<std::path::PathBuf>,

    /// Use the Intel Flash Descriptor found on the chip as the layout
    #[arg(long, global = true)]
    pub ifd: bool,

    /// Region name to include (repeatable); with none given, all regions are included
    #[arg(long = "image", global = true)]
    pub images: Vec<String>,

    /// File holding the full expected flash contents, for regions not covered by --image
    #[arg(long, global = true)]
    pub flash_contents: Option<std::path::PathBuf>,

    /// Proceed even when probe or board-match checks look inconsistent
    #[arg(long, global = true)]
    pub force: bool,

    /// Skip verification of the operated-on regions
    #[arg(long, global = true)]
    pub noverify: bool,

    /// Skip verification of the whole chip after the operation
    #[arg(long, global = true)]
    pub noverify_all: bool,

    /// Verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Write log output to this file instead of stderr
    #[arg(long, global = true)]
    pub output: Option<std::path::PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read flash contents to a file
    Read {
        /// Destination file
        file: std::path::PathBuf,
    },
    /// Write a file's contents to flash
    Write {
        /// Source file
        file: std::path::PathBuf,
    },
    /// Verify flash contents against a file
    Verify {
        /// File to compare against
        file: std::path::PathBuf,
    },
    /// Erase the selected regions (or the whole chip)
    Erase,
    /// List chips known to this build
    ListSupported,
    /// List chips known to this build, in wiki table syntax
    ListWiki,
}

/// A parsed `--programmer name[:k=v,...]` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammerSpec {
    pub name: String,
    pub params: Vec<(String, String)>,
}

impl ProgrammerSpec {
    /// Parse the `name[:k=v[,k=v]...]` convention, with optionally quoted values
    pub fn parse(s: &str) -> Self {
        let Some((name, rest)) = s.split_once(':') else {
            return Self {
                name: s.to_string(),
                params: Vec::new(),
            };
        };

        let mut params = Vec::new();
        for pair in split_unquoted_commas(rest) {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            if !value.is_empty() {
                params.push((key.trim().to_string(), value.to_string()));
            }
        }

        Self {
            name: name.to_string(),
            params,
        }
    }

    /// Look up a parameter's value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Split on commas that aren't inside a double-quoted value
fn split_unquoted_commas(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_name() {
        let spec = ProgrammerSpec::parse("dummy");
        assert_eq!(spec.name, "dummy");
        assert!(spec.params.is_empty());
    }

    #[test]
    fn parses_key_value_params() {
        let spec = ProgrammerSpec::parse("dummy:size=16MiB,emulate=W25Q128FV");
        assert_eq!(spec.name, "dummy");
        assert_eq!(spec.get("size"), Some("16MiB"));
        assert_eq!(spec.get("emulate"), Some("W25Q128FV"));
    }

    #[test]
    fn parses_quoted_values_with_commas() {
        let spec = ProgrammerSpec::parse(r#"dummy:note="a, b",size=4096"#);
        assert_eq!(spec.get("note"), Some("a, b"));
        assert_eq!(spec.get("size"), Some("4096"));
    }

    #[test]
    fn empty_value_is_treated_as_unset() {
        let spec = ProgrammerSpec::parse("dummy:size=");
        assert_eq!(spec.get("size"), None);
    }
}
