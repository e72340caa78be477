//! Error types for extsnap

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for extsnap operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    /// A filesystem step of a single file copy failed
    #[error("{stage} failed for {}: {source}", path.display())]
    FileIo {
        stage: CopyStage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Checksum mismatch after copy: {} ({source_digest} != {dest_digest})", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        source_digest: String,
        dest_digest: String,
    },
}

impl Error {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Error::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn file_io(stage: CopyStage, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::FileIo {
            stage,
            path: path.into(),
            source,
        }
    }
}

/// Step of the copy sequence an I/O failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStage {
    Stat,
    CreateDir,
    Open,
    Write,
    Rename,
    Metadata,
    Verify,
}

impl std::fmt::Display for CopyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CopyStage::Stat => "stat",
            CopyStage::CreateDir => "create directory",
            CopyStage::Open => "open",
            CopyStage::Write => "write",
            CopyStage::Rename => "rename",
            CopyStage::Metadata => "copy metadata",
            CopyStage::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Result type alias for extsnap operations
pub type Result<T> = std::result::Result<T, Error>;
