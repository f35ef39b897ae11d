use crate::codec::{self, METADATA_FILE_NAME};
use crate::error::ArchiveError;
use crate::record::MetadataRecord;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod read_only;
#[cfg(feature = "rar")]
pub mod rar;
pub(crate) mod writable;

pub use read_only::ReadOnlyBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    /// `.cbz`: entries can be replaced individually.
    Writable,
    /// `.cbr`: enumeration and extraction only; writes migrate to `.cbz`.
    ReadOnly,
}

impl ArchiveKind {
    pub fn from_path(path: &Path) -> Option<ArchiveKind> {
        let extension = path.extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("cbz") {
            Some(ArchiveKind::Writable)
        } else if extension.eq_ignore_ascii_case("cbr") {
            Some(ArchiveKind::ReadOnly)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArchiveKind::Writable => "cbz",
            ArchiveKind::ReadOnly => "cbr",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArchiveHandle {
    path: PathBuf,
    kind: ArchiveKind,
}

impl ArchiveHandle {
    /// Classifies `path` by extension without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let path = path.into();
        match ArchiveKind::from_path(&path) {
            Some(kind) => Ok(Self { path, kind }),
            None => Err(ArchiveError::InvalidHandle(path)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// True when the last path segment of `name` is the metadata file name,
/// compared without regard to ASCII case.
pub fn is_metadata_entry(name: &str) -> bool {
    if name.ends_with('/') {
        return false;
    }
    name.rsplit(['/', '\\'])
        .next()
        .is_some_and(|base| base.eq_ignore_ascii_case(METADATA_FILE_NAME))
}

fn entry_depth(name: &str) -> usize {
    name.trim_start_matches(['/', '\\'])
        .matches(['/', '\\'])
        .count()
}

/// Picks the authoritative metadata entry: the shallowest match, then the
/// lexically smallest name.
pub fn select_metadata_entry<'a, I>(names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter(|name| is_metadata_entry(name))
        .min_by(|a, b| entry_depth(a).cmp(&entry_depth(b)).then_with(|| a.cmp(b)))
}

/// Entries dropped when the metadata entry is replaced or removed: every
/// metadata entry at the depth of the authoritative one, and anything already
/// occupying the canonical name.
pub(crate) fn is_replaced(name: &str, selected: Option<&str>) -> bool {
    name == METADATA_FILE_NAME
        || selected.is_some_and(|selected| {
            is_metadata_entry(name) && entry_depth(name) == entry_depth(selected)
        })
}

/// Uniform access to both archive kinds. The read-only decoder is an optional
/// capability; without it `.cbr` operations fail with `UnsupportedFormat`.
#[derive(Clone, Default)]
pub struct Archives {
    read_only: Option<Arc<dyn ReadOnlyBackend>>,
}

impl fmt::Debug for Archives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archives")
            .field(
                "read_only",
                &self.read_only.as_ref().map(|backend| backend.format_name()),
            )
            .finish()
    }
}

impl Archives {
    pub fn new(read_only: Option<Arc<dyn ReadOnlyBackend>>) -> Self {
        Self { read_only }
    }

    pub fn writable_only() -> Self {
        Self { read_only: None }
    }

    /// Uses every decoder compiled into this build.
    pub fn with_default_backends() -> Self {
        #[cfg(feature = "rar")]
        {
            Self::new(Some(Arc::new(rar::UnrarBackend)))
        }
        #[cfg(not(feature = "rar"))]
        {
            Self::writable_only()
        }
    }

    pub fn read_only_available(&self) -> bool {
        self.read_only.is_some()
    }

    fn backend(&self) -> Result<&Arc<dyn ReadOnlyBackend>, ArchiveError> {
        self.read_only
            .as_ref()
            .ok_or_else(|| ArchiveError::UnsupportedFormat {
                format: "CBR",
                reason: "no RAR decoder is available in this build".to_string(),
            })
    }

    pub fn list_entries(&self, handle: &ArchiveHandle) -> Result<Vec<String>, ArchiveError> {
        match handle.kind() {
            ArchiveKind::Writable => writable::list_names(handle.path()),
            ArchiveKind::ReadOnly => self.backend()?.list_names(handle.path()),
        }
    }

    pub fn read_entry(&self, handle: &ArchiveHandle, name: &str) -> Result<Vec<u8>, ArchiveError> {
        match handle.kind() {
            ArchiveKind::Writable => writable::read_entry(handle.path(), name),
            ArchiveKind::ReadOnly => self.backend()?.read_entry(handle.path(), name),
        }
    }

    pub fn metadata_entry_name(
        &self,
        handle: &ArchiveHandle,
    ) -> Result<Option<String>, ArchiveError> {
        let names = self.list_entries(handle)?;
        Ok(select_metadata_entry(names.iter().map(String::as_str)).map(str::to_owned))
    }

    pub fn read_metadata_document(
        &self,
        handle: &ArchiveHandle,
    ) -> Result<Option<Vec<u8>>, ArchiveError> {
        match self.metadata_entry_name(handle)? {
            Some(name) => self.read_entry(handle, &name).map(Some),
            None => Ok(None),
        }
    }

    /// Reads the current record. A missing or malformed document yields an
    /// empty record; only an unreadable archive is an error.
    pub fn read_record(&self, handle: &ArchiveHandle) -> Result<MetadataRecord, ArchiveError> {
        let Some(document) = self.read_metadata_document(handle)? else {
            return Ok(MetadataRecord::new());
        };
        match codec::decode(&document) {
            Ok(record) => Ok(record),
            Err(err) => {
                tracing::warn!(
                    path = %handle.path().display(),
                    error = %err,
                    "ignoring malformed metadata document"
                );
                Ok(MetadataRecord::new())
            }
        }
    }

    /// SHA-256 of the metadata entry bytes, `None` when the archive has none.
    pub fn metadata_digest(&self, handle: &ArchiveHandle) -> Result<Option<String>, ArchiveError> {
        Ok(self.read_metadata_document(handle)?.map(|document| {
            let mut hasher = Sha256::new();
            hasher.update(&document);
            hex::encode(hasher.finalize())
        }))
    }

    /// Replaces (`Some`) or removes (`None`) the metadata entry. Every other
    /// entry is carried over unchanged. A read-only archive is rebuilt as a
    /// writable sibling; the returned handle is the one to use afterwards.
    pub fn rewrite(
        &self,
        handle: &ArchiveHandle,
        metadata: Option<&[u8]>,
    ) -> Result<ArchiveHandle, ArchiveError> {
        match handle.kind() {
            ArchiveKind::Writable => {
                writable::rewrite_in_place(handle.path(), metadata)?;
                Ok(handle.clone())
            }
            ArchiveKind::ReadOnly => {
                let backend = self.backend()?;
                read_only::migrate(backend.as_ref(), handle, metadata)
            }
        }
    }
}
