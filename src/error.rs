use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown metadata field: {0}")]
pub struct UnknownField(pub String);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentParseError {
    #[error("metadata document is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("malformed metadata document at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("metadata document has no root element")]
    MissingRoot,

    #[error("metadata document ends inside an open element")]
    Unclosed,
}

/// Failures of the archive adapter. Messages leave the path out because
/// reports already prefix each line with the file name.
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("not a comic archive (expected .cbz or .cbr)")]
    InvalidHandle(PathBuf),

    #[error("bad archive: {reason}")]
    BadArchive { path: PathBuf, reason: String },

    #[error("entry not found: {name}")]
    EntryNotFound { path: PathBuf, name: String },

    #[error("{format} archives are not supported: {reason}")]
    UnsupportedFormat {
        format: &'static str,
        reason: String,
    },

    #[error("write failed: {reason}")]
    WriteFailure { path: PathBuf, reason: String },

    #[error("I/O error: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub(crate) fn bad(path: &Path, reason: impl std::fmt::Display) -> Self {
        ArchiveError::BadArchive {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write_failure(path: &Path, reason: impl std::fmt::Display) -> Self {
        ArchiveError::WriteFailure {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("workers must be at least 1")]
    ZeroWorkers,

    #[error("unknown read_only_support value: {0} (expected auto or off)")]
    UnknownReadOnlySupport(String),
}
