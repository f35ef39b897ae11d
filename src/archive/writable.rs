use super::{is_replaced, select_metadata_entry, ArchiveEntry};
use crate::codec::METADATA_FILE_NAME;
use crate::error::ArchiveError;
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

type SourceArchive = ZipArchive<BufReader<File>>;

/// Name and uncompressed size of an entry the staged archive must contain.
struct ExpectedEntry {
    name: String,
    size: u64,
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn open(path: &Path) -> Result<SourceArchive, ArchiveError> {
    let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::bad(path, e))
}

fn names_of(archive: &mut SourceArchive, path: &Path) -> Result<Vec<String>, ArchiveError> {
    (0..archive.len())
        .map(|index| {
            archive
                .by_index_raw(index)
                .map(|entry| entry.name().to_string())
                .map_err(|e| ArchiveError::bad(path, e))
        })
        .collect()
}

pub(crate) fn list_names(path: &Path) -> Result<Vec<String>, ArchiveError> {
    let mut archive = open(path)?;
    names_of(&mut archive, path)
}

pub(crate) fn read_entry(path: &Path, name: &str) -> Result<Vec<u8>, ArchiveError> {
    let mut archive = open(path)?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(ArchiveError::EntryNotFound {
                path: path.to_path_buf(),
                name: name.to_string(),
            })
        }
        Err(err) => return Err(ArchiveError::bad(path, err)),
    };
    let mut data = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut data)
        .map_err(|e| ArchiveError::bad(path, e))?;
    Ok(data)
}

/// Creates the staging file next to `target` so the final rename stays on one
/// filesystem. Dropping the handle removes the file.
fn stage_next_to(target: &Path) -> Result<NamedTempFile, ArchiveError> {
    let dir = target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tempfile::Builder::new()
        .prefix(".cbmeta-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ArchiveError::write_failure(target, e))
}

fn add_metadata(
    writer: &mut ZipWriter<&mut File>,
    target: &Path,
    document: &[u8],
    expected: &mut Vec<ExpectedEntry>,
) -> Result<(), ArchiveError> {
    writer
        .start_file(METADATA_FILE_NAME, entry_options())
        .map_err(|e| ArchiveError::write_failure(target, e))?;
    writer
        .write_all(document)
        .map_err(|e| ArchiveError::write_failure(target, e))?;
    expected.push(ExpectedEntry {
        name: METADATA_FILE_NAME.to_string(),
        size: document.len() as u64,
    });
    Ok(())
}

/// Re-opens the staged archive and checks it lists exactly the expected
/// entries, in order and with the expected sizes.
fn verify_staged(
    staged: &Path,
    target: &Path,
    expected: &[ExpectedEntry],
) -> Result<(), ArchiveError> {
    let file = File::open(staged).map_err(|e| ArchiveError::write_failure(target, e))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| ArchiveError::write_failure(target, format!("staged archive unreadable: {e}")))?;
    if archive.len() != expected.len() {
        return Err(ArchiveError::write_failure(
            target,
            format!(
                "staged archive has {} entries, expected {}",
                archive.len(),
                expected.len()
            ),
        ));
    }
    for (index, want) in expected.iter().enumerate() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|e| ArchiveError::write_failure(target, e))?;
        if entry.name() != want.name || entry.size() != want.size {
            return Err(ArchiveError::write_failure(
                target,
                format!("staged entry {} does not match {}", entry.name(), want.name),
            ));
        }
    }
    Ok(())
}

/// Verifies the staged file, copies the permissions of `permissions_from` onto
/// it and renames it over `target`.
fn commit(
    staged: NamedTempFile,
    target: &Path,
    permissions_from: &Path,
    expected: &[ExpectedEntry],
) -> Result<(), ArchiveError> {
    verify_staged(staged.path(), target, expected)?;
    if let Ok(metadata) = fs::metadata(permissions_from) {
        fs::set_permissions(staged.path(), metadata.permissions())
            .map_err(|e| ArchiveError::write_failure(target, e))?;
    }
    staged
        .persist(target)
        .map_err(|e| ArchiveError::write_failure(target, e.error))?;
    Ok(())
}

/// Rebuilds `path` without its metadata entry, adding `metadata` under the
/// canonical name when given. Kept entries are copied without recompression.
pub(crate) fn rewrite_in_place(path: &Path, metadata: Option<&[u8]>) -> Result<(), ArchiveError> {
    let mut source = open(path)?;
    let names = names_of(&mut source, path)?;
    let replaced = select_metadata_entry(names.iter().map(String::as_str)).map(str::to_owned);

    let mut staged = stage_next_to(path)?;
    let mut expected = Vec::with_capacity(names.len() + 1);
    {
        let mut writer = ZipWriter::new(staged.as_file_mut());
        for index in 0..source.len() {
            let entry = source
                .by_index_raw(index)
                .map_err(|e| ArchiveError::bad(path, e))?;
            if is_replaced(entry.name(), replaced.as_deref()) {
                continue;
            }
            expected.push(ExpectedEntry {
                name: entry.name().to_string(),
                size: entry.size(),
            });
            writer
                .raw_copy_file(entry)
                .map_err(|e| ArchiveError::write_failure(path, e))?;
        }
        if let Some(document) = metadata {
            add_metadata(&mut writer, path, document, &mut expected)?;
        }
        writer
            .finish()
            .map_err(|e| ArchiveError::write_failure(path, e))?;
    }
    drop(source);

    commit(staged, path, path, &expected)
}

/// Writes `entries` (plus `metadata`) as a new archive at `target`, replacing
/// any file already there.
pub(crate) fn write_entries(
    target: &Path,
    entries: &[ArchiveEntry],
    metadata: Option<&[u8]>,
    permissions_from: &Path,
) -> Result<(), ArchiveError> {
    let mut staged = stage_next_to(target)?;
    let mut expected = Vec::with_capacity(entries.len() + 1);
    {
        let mut writer = ZipWriter::new(staged.as_file_mut());
        for entry in entries {
            writer
                .start_file(entry.name.as_str(), entry_options())
                .map_err(|e| ArchiveError::write_failure(target, e))?;
            writer
                .write_all(&entry.data)
                .map_err(|e| ArchiveError::write_failure(target, e))?;
            expected.push(ExpectedEntry {
                name: entry.name.clone(),
                size: entry.data.len() as u64,
            });
        }
        if let Some(document) = metadata {
            add_metadata(&mut writer, target, document, &mut expected)?;
        }
        writer
            .finish()
            .map_err(|e| ArchiveError::write_failure(target, e))?;
    }

    commit(staged, target, permissions_from, &expected)
}
