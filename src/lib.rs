#![warn(warnings)]
#![deny(clippy::all)]

pub mod archive;
pub mod batch;
pub mod codec;
pub mod error;
pub mod field;
pub mod form;
pub mod library;
pub mod logging;
pub mod merge;
pub mod record;
pub mod settings;

#[cfg(feature = "python")]
mod python;

pub use archive::{ArchiveEntry, ArchiveHandle, ArchiveKind, Archives, ReadOnlyBackend};
pub use batch::{BatchOptions, BatchResult, BatchRunner, FileOutcome, FileStatus};
pub use error::{ArchiveError, ConfigError, DocumentParseError, UnknownField};
pub use field::Field;
pub use merge::{merge, PerFileUpdate, Sequence};
pub use record::{FieldUpdate, MetadataRecord};
pub use settings::Settings;
