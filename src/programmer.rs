//! Programmer construction from a parsed `--programmer` spec

use rflasher_dummy::{DummyConfig, DummyFlash};

use crate::cli::ProgrammerSpec;
use crate::error::CliError;

/// Build the transport named by a parsed `--programmer` spec
///
/// Only `dummy` is wired; everything else is a capability this build
/// doesn't carry a transport for.
pub fn build(spec: &ProgrammerSpec) -> Result<DummyFlash, CliError> {
    match spec.name.as_str() {
        "dummy" => Ok(DummyFlash::new(dummy_config(spec)?)),
        other => Err(format!(
            "unknown programmer '{other}' (only 'dummy' is wired in this build)"
        )
        .into()),
    }
}

fn dummy_config(spec: &ProgrammerSpec) -> Result<DummyConfig, CliError> {
    let mut config = DummyConfig::default();

    if let Some(size) = spec.get("size") {
        config.size = parse_size(size)?;
    }
    if let Some(emulate) = spec.get("emulate") {
        if emulate != "W25Q128FV" {
            return Err(format!("dummy programmer does not emulate '{emulate}'").into());
        }
    }

    Ok(config)
}

/// Parse a byte count with an optional `KiB`/`MiB`/`GiB` suffix
fn parse_size(s: &str) -> Result<usize, CliError> {
    let (digits, multiplier) = if let Some(n) = s.strip_suffix("GiB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("MiB") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("KiB") {
        (n, 1024)
    } else {
        (s, 1)
    };

    let value: usize = digits.trim().parse()?;
    Ok(value * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_bytes() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
    }

    #[test]
    fn parses_suffixed_sizes() {
        assert_eq!(parse_size("16MiB").unwrap(), 16 * 1024 * 1024);
        assert_eq!(parse_size("4KiB").unwrap(), 4096);
        assert_eq!(parse_size("1GiB").unwrap(), 1024 * 1024 * 1024);
    }

    #[test]
    fn rejects_unknown_emulation_target() {
        let spec = ProgrammerSpec::parse("dummy:emulate=MX25L1234");
        assert!(dummy_config(&spec).is_err());
    }
}
