use super::{ArchiveEntry, ReadOnlyBackend};
use crate::error::ArchiveError;
use std::path::Path;

/// RAR decoding through libunrar.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnrarBackend;

fn entry_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl ReadOnlyBackend for UnrarBackend {
    fn format_name(&self) -> &'static str {
        "RAR"
    }

    fn list_names(&self, path: &Path) -> Result<Vec<String>, ArchiveError> {
        let archive = unrar::Archive::new(path)
            .open_for_listing()
            .map_err(|e| ArchiveError::bad(path, e))?;
        let mut names = Vec::new();
        for header in archive {
            let header = header.map_err(|e| ArchiveError::bad(path, e))?;
            if !header.is_directory() {
                names.push(entry_name(&header.filename));
            }
        }
        Ok(names)
    }

    fn read_all(&self, path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let mut archive = unrar::Archive::new(path)
            .open_for_processing()
            .map_err(|e| ArchiveError::bad(path, e))?;
        let mut entries = Vec::new();
        while let Some(header) = archive.read_header().map_err(|e| ArchiveError::bad(path, e))? {
            archive = if header.entry().is_directory() {
                header.skip().map_err(|e| ArchiveError::bad(path, e))?
            } else {
                let name = entry_name(&header.entry().filename);
                let (data, rest) = header.read().map_err(|e| ArchiveError::bad(path, e))?;
                entries.push(ArchiveEntry { name, data });
                rest
            };
        }
        Ok(entries)
    }

    fn read_entry(&self, path: &Path, name: &str) -> Result<Vec<u8>, ArchiveError> {
        let mut archive = unrar::Archive::new(path)
            .open_for_processing()
            .map_err(|e| ArchiveError::bad(path, e))?;
        while let Some(header) = archive.read_header().map_err(|e| ArchiveError::bad(path, e))? {
            if !header.entry().is_directory() && entry_name(&header.entry().filename) == name {
                let (data, _) = header.read().map_err(|e| ArchiveError::bad(path, e))?;
                return Ok(data);
            }
            archive = header.skip().map_err(|e| ArchiveError::bad(path, e))?;
        }
        Err(ArchiveError::EntryNotFound {
            path: path.to_path_buf(),
            name: name.to_string(),
        })
    }
}
