use crate::archive::{display_name, ArchiveKind};
use crate::batch::{BatchResult, FileStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Lists the comic archives directly inside `dir`, sorted by path. `.cbr`
/// files are included only when they can be read.
pub fn scan_folder(dir: &Path, read_only_available: bool) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read folder {}", dir.display()))?;
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read folder {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match ArchiveKind::from_path(&path) {
            Some(ArchiveKind::Writable) => found.push(path),
            Some(ArchiveKind::ReadOnly) if read_only_available => found.push(path),
            _ => {}
        }
    }
    found.sort();
    Ok(found)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAttributes {
    pub file_name: String,
    pub last_modified: String,
    pub changed: bool,
}

pub fn file_attributes(path: &Path, changed: bool) -> FileAttributes {
    let last_modified = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map(|modified| {
            DateTime::<Local>::from(modified)
                .format(MODIFIED_FORMAT)
                .to_string()
        })
        .unwrap_or_else(|_| "N/A".to_string());
    FileAttributes {
        file_name: display_name(path),
        last_modified,
        changed,
    }
}

/// The archives an editing session works on, in the order they were added,
/// with a flag for those written during the session.
#[derive(Debug, Clone, Default)]
pub struct FileLibrary {
    files: Vec<PathBuf>,
    changed: HashSet<PathBuf>,
}

impl FileLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the path is already tracked.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.files.contains(&path) {
            return false;
        }
        self.files.push(path);
        true
    }

    pub fn extend<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut added = 0;
        for path in paths {
            if self.add(path) {
                added += 1;
            }
        }
        added
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.changed.remove(path);
        let before = self.files.len();
        self.files.retain(|tracked| tracked != path);
        self.files.len() != before
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.changed.clear();
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|tracked| tracked == path)
    }

    pub fn is_changed(&self, path: &Path) -> bool {
        self.changed.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Records the outcome of a batch: written files are flagged as changed
    /// and migrated files are tracked under their new path, in place.
    pub fn apply(&mut self, result: &BatchResult) {
        for outcome in &result.outcomes {
            match &outcome.status {
                FileStatus::Updated => {
                    self.changed.insert(outcome.path.clone());
                }
                FileStatus::Migrated { to } => {
                    self.changed.remove(&outcome.path);
                    if self.contains(to) {
                        self.files.retain(|tracked| *tracked != outcome.path);
                    } else if let Some(slot) =
                        self.files.iter_mut().find(|tracked| **tracked == outcome.path)
                    {
                        *slot = to.clone();
                    }
                    self.changed.insert(to.clone());
                }
                FileStatus::Unchanged | FileStatus::Failed { .. } => {}
            }
        }
    }

    pub fn attributes(&self) -> Vec<FileAttributes> {
        self.files
            .iter()
            .map(|path| file_attributes(path, self.is_changed(path)))
            .collect()
    }
}
