use super::{is_replaced, select_metadata_entry, writable, ArchiveEntry, ArchiveHandle, ArchiveKind};
use crate::error::ArchiveError;
use std::fs;
use std::path::Path;

/// Decoder for an archive format this crate can read but not modify.
/// Implementations report file entries only, with `/` as the separator.
pub trait ReadOnlyBackend: Send + Sync {
    fn format_name(&self) -> &'static str;

    fn list_names(&self, path: &Path) -> Result<Vec<String>, ArchiveError>;

    fn read_all(&self, path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError>;

    fn read_entry(&self, path: &Path, name: &str) -> Result<Vec<u8>, ArchiveError> {
        self.read_all(path)?
            .into_iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.data)
            .ok_or_else(|| ArchiveError::EntryNotFound {
                path: path.to_path_buf(),
                name: name.to_string(),
            })
    }
}

/// Rebuilds a read-only archive as a writable sibling with the metadata entry
/// replaced or removed. The original is deleted only once the new file is in
/// place.
pub(crate) fn migrate(
    backend: &dyn ReadOnlyBackend,
    handle: &ArchiveHandle,
    metadata: Option<&[u8]>,
) -> Result<ArchiveHandle, ArchiveError> {
    let source = handle.path();
    let entries = backend.read_all(source)?;
    let replaced = select_metadata_entry(entries.iter().map(|entry| entry.name.as_str()))
        .map(str::to_owned);
    let kept: Vec<ArchiveEntry> = entries
        .into_iter()
        .filter(|entry| !is_replaced(&entry.name, replaced.as_deref()))
        .collect();

    let target = source.with_extension(ArchiveKind::Writable.extension());
    writable::write_entries(&target, &kept, metadata, source)?;
    tracing::info!(
        from = %source.display(),
        to = %target.display(),
        entries = kept.len(),
        "migrated {} archive",
        backend.format_name()
    );

    if let Err(err) = fs::remove_file(source) {
        tracing::warn!(
            path = %source.display(),
            error = %err,
            "migrated archive written but the original could not be removed"
        );
    }

    ArchiveHandle::new(target)
}
