/// File organization: classify every file of a source directory and move it
/// into `<target>/<category>/`.
///
/// This module provides the [`Organizer`], which owns a [`Classifier`] and the
/// state of one run (succeeded and failed records plus the run log). A run is
/// sequential and synchronous; one bad file never stops the batch.
use crate::classifier::{Classifier, regular_files};
use crate::duplicate::{self, Resolution};
use crate::run_log::{self, RunLog};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// How a single file was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The file was moved to the record's target.
    Success,
    /// An identical file already sits at `identical_to`; the source was left in place.
    Skipped { identical_to: PathBuf },
    /// The file could not be organized.
    Failed { reason: String },
}

impl OperationOutcome {
    /// Skipped files count as successes.
    pub fn is_success(&self) -> bool {
        !matches!(self, OperationOutcome::Failed { .. })
    }

    /// Status column of the operation log.
    pub fn status(&self) -> String {
        match self {
            OperationOutcome::Success => "Success".to_string(),
            OperationOutcome::Skipped { identical_to } => {
                format!("Skipped: identical to {}", identical_to.display())
            }
            OperationOutcome::Failed { reason } => format!("Failed: {}", reason),
        }
    }
}

/// Record of one processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// RFC 3339 local time at which the operation finished.
    pub timestamp: String,
    /// The file's path in the source directory.
    pub source: PathBuf,
    /// Where the file now lives; `None` for failures.
    pub target: Option<PathBuf>,
    /// The category the file was classified as.
    pub category: String,
    pub outcome: OperationOutcome,
}

/// Counts returned by [`Organizer::organize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Files moved or skipped as identical duplicates.
    pub succeeded: usize,
    /// Files that could not be organized.
    pub failed: usize,
    /// Subset of `succeeded` that were identical duplicates.
    pub skipped: usize,
    /// Regular files found in the source directory. For a dry run this is the
    /// number of files that would be organized.
    pub examined: usize,
}

impl RunSummary {
    /// `(success count, failure count)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.succeeded, self.failed)
    }
}

/// Progress report passed to [`Organizer::organize_with_progress`] after each file.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// 1-based position of the file just processed.
    pub index: usize,
    pub total: usize,
    pub file_name: &'a str,
    pub category: &'a str,
}

/// Errors that fail a single file. The batch always continues.
#[derive(Debug, Error)]
pub enum MoveError {
    /// Failed to create a category directory.
    #[error("could not create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    /// Neither rename nor copy could place the file.
    #[error("could not move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    /// The file was copied but the original could not be deleted.
    #[error("copied {} to {} but could not remove the original: {source}", .from.display(), .to.display())]
    RemoveSource {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    /// Every candidate name is taken by a different file.
    #[error("too many duplicates for {} ({attempts} names tried)", .path.display())]
    DuplicateExhaustion { path: PathBuf, attempts: u32 },
    /// The path has no final component to move.
    #[error("{} has no file name", .0.display())]
    NoFileName(PathBuf),
}

/// Errors that stop a run before any file is processed.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The source directory does not exist.
    #[error("Source directory does not exist: {}", .0.display())]
    SourceMissing(PathBuf),
    /// The source exists but cannot be listed.
    #[error("Could not read source directory {}: {source}", .path.display())]
    SourceUnreadable { path: PathBuf, source: io::Error },
}

/// Result type for organizer runs.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves files from a source directory into category folders under a target root.
pub struct Organizer {
    source_dir: PathBuf,
    target_dir: PathBuf,
    classifier: Classifier,
    log_dir: Option<PathBuf>,
    succeeded: Vec<FileRecord>,
    failed: Vec<FileRecord>,
    log: RunLog,
}

impl Organizer {
    /// Creates an organizer whose classifier is loaded from `config_path`
    /// (or the default rule location).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use smartsort::Organizer;
    ///
    /// let mut organizer = Organizer::new("/home/me/Downloads", "/home/me/Sorted", None);
    /// match organizer.organize(false) {
    ///     Ok(summary) => println!("{} moved, {} failed", summary.succeeded, summary.failed),
    ///     Err(e) => eprintln!("Organization failed: {}", e),
    /// }
    /// ```
    pub fn new(
        source_dir: impl Into<PathBuf>,
        target_dir: impl Into<PathBuf>,
        config_path: Option<&Path>,
    ) -> Self {
        Self::with_classifier(source_dir, target_dir, Classifier::new(config_path))
    }

    /// Creates an organizer around an existing classifier.
    pub fn with_classifier(
        source_dir: impl Into<PathBuf>,
        target_dir: impl Into<PathBuf>,
        classifier: Classifier,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
            classifier,
            log_dir: None,
            succeeded: Vec::new(),
            failed: Vec::new(),
            log: RunLog::in_memory(),
        }
    }

    /// Writes each run's text log and CSV operation log into `dir`.
    ///
    /// Without a log directory the run log stays in memory.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Successful records of the last run, in processing order.
    pub fn succeeded(&self) -> &[FileRecord] {
        &self.succeeded
    }

    /// Failed records of the last run, in processing order.
    pub fn failed(&self) -> &[FileRecord] {
        &self.failed
    }

    /// All records of the last run: successes first, then failures.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.succeeded.iter().chain(self.failed.iter())
    }

    /// Log of the last run.
    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Organizes every regular file directly inside the source directory.
    ///
    /// With `dry_run` set, only the intended destinations are logged and the
    /// filesystem is not touched (apart from the run log, if a log directory
    /// was configured).
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::SourceMissing` if the source directory does not
    /// exist. Per-file problems are never returned; they are recorded as
    /// failed records and counted in the summary.
    pub fn organize(&mut self, dry_run: bool) -> OrganizeResult<RunSummary> {
        self.organize_with_progress(dry_run, |_| {})
    }

    /// Same as [`organize`](Self::organize), calling `on_progress` after each file.
    pub fn organize_with_progress<F>(
        &mut self,
        dry_run: bool,
        mut on_progress: F,
    ) -> OrganizeResult<RunSummary>
    where
        F: FnMut(Progress<'_>),
    {
        let stamp = run_log::run_stamp();
        self.reset(&stamp);

        if !self.source_dir.exists() {
            self.log.error(format!(
                "Source directory does not exist: {}",
                self.source_dir.display()
            ));
            self.log.flush();
            return Err(OrganizeError::SourceMissing(self.source_dir.clone()));
        }

        self.log.info(format!(
            "Starting file organization from {}",
            self.source_dir.display()
        ));
        if dry_run {
            self.log.info("DRY RUN MODE - No files will be moved");
        }

        let listing = match regular_files(&self.source_dir) {
            Ok(listing) => listing,
            Err(e) => {
                self.log.error(format!(
                    "Could not read source directory {}: {}",
                    self.source_dir.display(),
                    e
                ));
                self.log.flush();
                return Err(OrganizeError::SourceUnreadable {
                    path: self.source_dir.clone(),
                    source: e,
                });
            }
        };

        for e in &listing.unreadable {
            self.log.warn(format!(
                "Skipping unreadable entry in {}: {}",
                self.source_dir.display(),
                e
            ));
        }
        let files = listing.files;

        let total = files.len();
        self.log.info(format!("Found {} files to process", total));

        for (index, file_path) in files.iter().enumerate() {
            let file_name = file_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let category = self.classifier.classify(&file_name).to_string();
            self.log
                .info(format!("Classified {} as {}", file_name, category));

            if dry_run {
                let target_path = self.target_dir.join(&category).join(&file_name);
                self.log.info(format!(
                    "Would move: {} → {}",
                    file_path.display(),
                    target_path.display()
                ));
            } else {
                let record = self.move_file(file_path, &category);
                if record.outcome.is_success() {
                    self.succeeded.push(record);
                } else {
                    self.failed.push(record);
                }
            }

            on_progress(Progress {
                index: index + 1,
                total,
                file_name: &file_name,
                category: &category,
            });
        }

        let summary = RunSummary {
            succeeded: self.succeeded.len(),
            failed: self.failed.len(),
            skipped: self
                .succeeded
                .iter()
                .filter(|r| matches!(r.outcome, OperationOutcome::Skipped { .. }))
                .count(),
            examined: total,
        };

        if dry_run {
            self.log
                .info(format!("Dry run complete. {} files would be organized", total));
        } else {
            self.save_operation_log(&stamp);
        }

        self.log.info(format!(
            "Organization complete. Success: {}, Failed: {}",
            summary.succeeded, summary.failed
        ));
        self.log.flush();

        Ok(summary)
    }

    /// Clears the previous run's records and opens a fresh run log.
    fn reset(&mut self, stamp: &str) {
        self.succeeded.clear();
        self.failed.clear();
        self.log = match &self.log_dir {
            Some(dir) => RunLog::create(dir, stamp).unwrap_or_else(|e| {
                tracing::warn!(
                    dir = %dir.display(),
                    "Could not open run log file, logging to console only: {}",
                    e
                );
                RunLog::in_memory()
            }),
            None => RunLog::in_memory(),
        };
    }

    /// Moves one file into its category directory and records the outcome.
    fn move_file(&mut self, source: &Path, category: &str) -> FileRecord {
        let result = self.place_file(source, category);
        let timestamp = chrono::Local::now().to_rfc3339();

        let (target, outcome) = match result {
            Ok(Resolution::Unique(target)) => {
                self.log.info(format!(
                    "Moved: {} → {}",
                    source.display(),
                    target.display()
                ));
                (Some(target), OperationOutcome::Success)
            }
            Ok(Resolution::Identical(existing)) => {
                // The source stays where it is: the target tree already has it.
                self.log.info(format!(
                    "Identical file found, skipping: {} (same as {})",
                    source.display(),
                    existing.display()
                ));
                (
                    Some(existing.clone()),
                    OperationOutcome::Skipped {
                        identical_to: existing,
                    },
                )
            }
            Err(e) => {
                self.log
                    .error(format!("Failed to move {}: {}", source.display(), e));
                (
                    None,
                    OperationOutcome::Failed {
                        reason: e.to_string(),
                    },
                )
            }
        };

        FileRecord {
            timestamp,
            source: source.to_path_buf(),
            target,
            category: category.to_string(),
            outcome,
        }
    }

    fn place_file(&mut self, source: &Path, category: &str) -> Result<Resolution, MoveError> {
        let category_dir = self.target_dir.join(category);
        fs::create_dir_all(&category_dir).map_err(|e| MoveError::CreateDir {
            path: category_dir.clone(),
            source: e,
        })?;

        let file_name = source
            .file_name()
            .ok_or_else(|| MoveError::NoFileName(source.to_path_buf()))?;
        let target_path = category_dir.join(file_name);

        let resolution = duplicate::resolve(source, &target_path, &mut self.log)?;
        if let Resolution::Unique(destination) = &resolution {
            move_path(source, destination)?;
        }
        Ok(resolution)
    }

    /// Writes the CSV operation log of a live run, if there is anything to record.
    fn save_operation_log(&mut self, stamp: &str) {
        let Some(dir) = self.log_dir.as_deref() else {
            return;
        };
        if self.succeeded.is_empty() && self.failed.is_empty() {
            return;
        }

        let records = self.succeeded.iter().chain(self.failed.iter());
        match run_log::write_operation_csv(dir, stamp, records) {
            Ok(path) => self
                .log
                .info(format!("Operation log saved to: {}", path.display())),
            Err(e) => self
                .log
                .warn(format!("Could not save operation log: {}", e)),
        }
    }
}

/// Moves `source` to `destination`.
///
/// Tries an atomic rename first and falls back to copy + delete, which is
/// what crossing filesystems requires. A failed fallback leaves the
/// filesystem as it was: the source in place and nothing at `destination`.
pub fn move_path(source: &Path, destination: &Path) -> Result<(), MoveError> {
    let Err(rename_err) = fs::rename(source, destination) else {
        return Ok(());
    };
    tracing::debug!(
        src = %source.display(),
        dest = %destination.display(),
        error = %rename_err,
        "Rename failed, falling back to copy and remove"
    );

    // Only clean up a destination this move created.
    let created = !destination.exists();

    if let Err(e) = fs::copy(source, destination) {
        if created {
            discard_partial(destination);
        }
        return Err(MoveError::Move {
            from: source.to_path_buf(),
            to: destination.to_path_buf(),
            source: e,
        });
    }

    if let Err(e) = fs::remove_file(source) {
        if created {
            discard_partial(destination);
        }
        return Err(MoveError::RemoveSource {
            from: source.to_path_buf(),
            to: destination.to_path_buf(),
            source: e,
        });
    }

    Ok(())
}

fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(
            path = %path.display(),
            "Could not remove incomplete copy: {}",
            e
        );
    }
}
