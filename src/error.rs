//! CLI error type
//!
//! `rflasher_core::Error` is a flat `Copy` enum meant for no_std callers;
//! the CLI wraps it (plus layout parsing and I/O failures) in a `thiserror`
//! enum so `main` has one place to both print a message and, for the core
//! variant, recover the library's numeric diagnostic code.

use thiserror::Error as ThisError;

/// Errors surfaced by the `rflasher` binary
#[derive(Debug, ThisError)]
pub enum CliError {
    /// A core flash operation failed
    #[error(transparent)]
    Core(#[from] rflasher_core::Error),

    /// A layout file failed to parse or validate
    #[error(transparent)]
    Layout(#[from] rflasher_core::layout::LayoutError),

    /// Reading or writing a file failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A progress-bar template failed to compile
    #[error(transparent)]
    Template(#[from] indicatif::style::TemplateError),

    /// A `--programmer` size parameter wasn't a valid integer
    #[error("invalid size: {0}")]
    InvalidSize(#[from] std::num::ParseIntError),

    /// Any other CLI-local failure: bad arguments, an unknown chip or
    /// programmer name, a readonly-region guard, ...
    #[error("{0}")]
    Message(String),
}

impl From<String> for CliError {
    fn from(s: String) -> Self {
        CliError::Message(s)
    }
}

impl From<&str> for CliError {
    fn from(s: &str) -> Self {
        CliError::Message(s.to_string())
    }
}

/// Result type alias for CLI command functions
pub type Result<T> = std::result::Result<T, CliError>;
