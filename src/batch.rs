use crate::archive::{display_name, ArchiveHandle, Archives};
use crate::codec;
use crate::error::{ArchiveError, ConfigError};
use crate::merge::{self, PerFileUpdate};
use crate::record::FieldUpdate;
use crate::settings::Settings;
use futures::{future, stream, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Summary headings used by the editor dialogs.
pub const APPLY_VERB: &str = "Successfully updated";
pub const DELETE_VERB: &str = "Successfully deleted metadata from";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Updated,
    /// The read-only original was replaced by a writable archive at `to`.
    Migrated { to: PathBuf },
    /// Nothing to write; the archive was not touched.
    Unchanged,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub index: usize,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn succeeded(&self) -> bool {
        !matches!(self.status, FileStatus::Failed { .. })
    }

    /// Where the file lives after the batch.
    pub fn current_path(&self) -> &Path {
        match &self.status {
            FileStatus::Migrated { to } => to,
            _ => &self.path,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Files never started because the batch was cancelled.
    pub skipped: usize,
    pub outcomes: Vec<FileOutcome>,
    #[serde(skip)]
    error_report_limit: usize,
}

impl BatchResult {
    fn new(error_report_limit: usize) -> Self {
        Self {
            error_report_limit,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: FileOutcome) {
        self.attempted += 1;
        if outcome.succeeded() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.status {
            FileStatus::Failed { reason } => Some((outcome.path.as_path(), reason.as_str())),
            _ => None,
        })
    }

    /// Original path and new path of every migrated file.
    pub fn renamed(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.status {
            FileStatus::Migrated { to } => Some((outcome.path.as_path(), to.as_path())),
            _ => None,
        })
    }

    /// `"<file name>: <reason>"` lines, capped at the configured limit.
    pub fn report(&self) -> Vec<String> {
        self.failures()
            .take(self.error_report_limit)
            .map(|(path, reason)| format!("{}: {}", display_name(path), reason))
            .collect()
    }

    pub fn summary(&self, verb: &str) -> String {
        let mut text = format!("{verb}: {}\nFailed: {}", self.succeeded, self.failed);
        let lines = self.report();
        if !lines.is_empty() {
            text.push_str("\n\nErrors:\n");
            text.push_str(&lines.join("\n"));
            if self.failed > lines.len() {
                text.push_str(&format!("\n... and {} more", self.failed - lines.len()));
            }
        }
        text
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub workers: usize,
    pub error_report_limit: usize,
    /// Once set, no further files are started; running ones finish.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for BatchOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            workers: settings.workers,
            error_report_limit: settings.error_report_limit,
            cancel: None,
        }
    }
}

enum Job {
    Apply {
        base: FieldUpdate,
        per_file: Option<Arc<dyn PerFileUpdate>>,
    },
    Delete,
}

impl Job {
    fn label(&self) -> &'static str {
        match self {
            Job::Apply { .. } => "apply",
            Job::Delete => "delete",
        }
    }
}

fn process_file(
    archives: &Archives,
    path: &Path,
    job: &Job,
    index: usize,
    total: usize,
) -> Result<FileStatus, ArchiveError> {
    let handle = ArchiveHandle::new(path)?;
    let document = match job {
        Job::Apply { base, per_file } => {
            let existing = archives.read_record(&handle)?;
            let update = merge::effective_update(base, per_file.as_deref(), index, total);
            let merged = merge::merge(&existing, &update);
            if merged == existing {
                return Ok(FileStatus::Unchanged);
            }
            Some(codec::encode(&merged))
        }
        Job::Delete => {
            if archives.metadata_entry_name(&handle)?.is_none() {
                return Ok(FileStatus::Unchanged);
            }
            None
        }
    };

    let rewritten = archives.rewrite(&handle, document.as_deref())?;
    if rewritten.path() == handle.path() {
        Ok(FileStatus::Updated)
    } else {
        Ok(FileStatus::Migrated {
            to: rewritten.path().to_path_buf(),
        })
    }
}

fn is_cancelled(flag: Option<&AtomicBool>) -> bool {
    flag.is_some_and(|flag| flag.load(Ordering::SeqCst))
}

/// Runs metadata writes over a list of archives. Each file is handled on the
/// blocking pool; one file failing never stops the others.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    archives: Archives,
    options: BatchOptions,
}

impl BatchRunner {
    pub fn new(archives: Archives, options: BatchOptions) -> Self {
        Self { archives, options }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self::new(settings.archives(), BatchOptions::from(settings)))
    }

    pub fn archives(&self) -> &Archives {
        &self.archives
    }

    /// Merges `base` (plus the per-file fields, if any) into every archive.
    pub async fn apply_batch(
        &self,
        paths: &[PathBuf],
        base: FieldUpdate,
        per_file: Option<Arc<dyn PerFileUpdate>>,
    ) -> BatchResult {
        self.run(paths, Arc::new(Job::Apply { base, per_file })).await
    }

    /// Removes the metadata entry from every archive.
    pub async fn delete_batch(&self, paths: &[PathBuf]) -> BatchResult {
        self.run(paths, Arc::new(Job::Delete)).await
    }

    async fn run(&self, paths: &[PathBuf], job: Arc<Job>) -> BatchResult {
        let batch_id = Uuid::new_v4();
        let total = paths.len();
        let workers = self.options.workers.max(1);
        tracing::info!(%batch_id, operation = job.label(), files = total, workers, "batch started");

        let cancel = self.options.cancel.clone();
        let archives = self.archives.clone();
        let mut seen: HashSet<PathBuf> = HashSet::with_capacity(total);

        let mut outcomes = stream::iter(paths.iter().cloned().enumerate())
            .take_while(move |_| future::ready(!is_cancelled(cancel.as_deref())))
            .map(move |(index, path)| {
                let duplicate = !seen.insert(path.clone());
                let archives = archives.clone();
                let job = Arc::clone(&job);
                async move {
                    let status = if duplicate {
                        FileStatus::Failed {
                            reason: "listed more than once in this batch".to_string(),
                        }
                    } else {
                        let worker_path = path.clone();
                        let joined = tokio::task::spawn_blocking(move || {
                            process_file(&archives, &worker_path, &job, index, total)
                        })
                        .await;
                        match joined {
                            Ok(Ok(status)) => status,
                            Ok(Err(err)) => FileStatus::Failed {
                                reason: err.to_string(),
                            },
                            Err(err) => FileStatus::Failed {
                                reason: format!("worker stopped unexpectedly: {err}"),
                            },
                        }
                    };
                    FileOutcome {
                        index,
                        path,
                        status,
                    }
                }
            })
            .buffer_unordered(workers);

        let mut result = BatchResult::new(self.options.error_report_limit);
        while let Some(outcome) = outcomes.next().await {
            if let FileStatus::Failed { reason } = &outcome.status {
                tracing::warn!(%batch_id, path = %outcome.path.display(), %reason, "file failed");
            }
            result.record(outcome);
        }
        result.outcomes.sort_by_key(|outcome| outcome.index);
        result.skipped = total - result.attempted;

        tracing::info!(
            %batch_id,
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            "batch finished"
        );
        result
    }
}
