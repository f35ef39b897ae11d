use _cbmeta_core::{ArchiveEntry, ArchiveError, ReadOnlyBackend};
use anyhow::Result;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[allow(dead_code)]
pub const PAGE_ONE: &[u8] = b"\x89PNG page one";
#[allow(dead_code)]
pub const PAGE_TWO: &[u8] = b"\xFF\xD8\xFF page two";

#[allow(dead_code)]
pub fn comic_info(body: &str) -> Vec<u8> {
    format!("<?xml version=\"1.0\"?>\n<ComicInfo>\n{body}\n</ComicInfo>\n").into_bytes()
}

/// Writes a zip archive at `dir/name` with the given entries, in order.
#[allow(dead_code)]
pub fn make_archive(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut writer = ZipWriter::new(File::create(&path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (entry_name, data) in entries {
        writer.start_file(*entry_name, options)?;
        writer.write_all(data)?;
    }
    writer.finish()?;
    Ok(path)
}

/// A two-page archive, optionally carrying a metadata document.
#[allow(dead_code)]
pub fn make_comic(dir: &Path, name: &str, metadata: Option<&[u8]>) -> Result<PathBuf> {
    let mut entries: Vec<(&str, &[u8])> = vec![("page01.png", PAGE_ONE), ("page02.jpg", PAGE_TWO)];
    if let Some(metadata) = metadata {
        entries.push(("ComicInfo.xml", metadata));
    }
    make_archive(dir, name, &entries)
}

#[allow(dead_code)]
pub fn read_archive(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        entries.push((entry.name().to_string(), data));
    }
    Ok(entries)
}

#[allow(dead_code)]
pub fn entry_names(path: &Path) -> Result<Vec<String>> {
    Ok(read_archive(path)?.into_iter().map(|(name, _)| name).collect())
}

/// Stands in for the RAR decoder: reads `.cbr` files that are really zips.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct ZipAsReadOnly;

#[allow(dead_code)]
fn bad(path: &Path, reason: impl ToString) -> ArchiveError {
    ArchiveError::BadArchive {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

impl ReadOnlyBackend for ZipAsReadOnly {
    fn format_name(&self) -> &'static str {
        "fake RAR"
    }

    fn list_names(&self, path: &Path) -> Result<Vec<String>, ArchiveError> {
        Ok(self.read_all(path)?.into_iter().map(|entry| entry.name).collect())
    }

    fn read_all(&self, path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let file = File::open(path).map_err(|e| bad(path, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| bad(path, e))?;
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| bad(path, e))?;
            let mut data = Vec::new();
            entry.read_to_end(&mut data).map_err(|e| bad(path, e))?;
            entries.push(ArchiveEntry {
                name: entry.name().to_string(),
                data,
            });
        }
        Ok(entries)
    }
}
