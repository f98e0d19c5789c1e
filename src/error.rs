use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum NwpError {
    #[error("malformed index line {line}: {reason}")]
    MalformedIndexLine { line: usize, reason: String },

    #[error("index line {line} has fewer than 6 fields")]
    ShortIndexLine { line: usize },

    #[error("band not found in index: line {0}")]
    BandNotFound(u32),

    #[error("no bands selected")]
    EmptySelection,

    #[error("unparsable cache filename: {0}")]
    UnparsableCacheFilename(String),

    #[error("invalid value for field {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("server returned status {status} for {url}")]
    TransferStatus { status: u16, url: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
