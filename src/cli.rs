//! Command-line interface module for smartsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Classification previews
//! - Organization runs with progress reporting
//! - Mapping run results to process exit codes

use crate::classifier::Classifier;
use crate::file_organizer::{Organizer, RunSummary};
use crate::output::OutputFormatter;
use clap::Parser;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};

/// Sort the files of a directory into category folders.
#[derive(Debug, Clone, Parser)]
#[command(name = "smartsort", version, about)]
pub struct Cli {
    /// Directory whose files should be organized
    pub source: PathBuf,

    /// Root directory that receives the category folders
    #[arg(required_unless_present = "preview")]
    pub target: Option<PathBuf>,

    /// Show what would be moved without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Classification rules file (.json or .toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for the run log and the CSV operation log
    #[arg(long, value_name = "DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Only print how the files of SOURCE would be classified
    #[arg(long, conflicts_with = "dry_run")]
    pub preview: bool,

    /// Print every log line to the console (hides the progress bar)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The command these arguments ask for.
    pub fn command(&self) -> OrganizeCommand {
        if self.preview {
            OrganizeCommand::Preview
        } else {
            OrganizeCommand::Organize {
                dry_run: self.dry_run,
            }
        }
    }
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeCommand {
    /// Organize files from the source into the target.
    Organize {
        /// If true, simulate the operation without making changes.
        dry_run: bool,
    },
    /// Show the classification breakdown of the source directory.
    Preview,
}

/// Runs the CLI application.
///
/// Returns the run summary (for a preview, only `examined` is set), or a
/// message when the run could not start.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use smartsort::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["smartsort", "/tmp/in", "/tmp/out", "--dry-run"]);
/// match run_cli(&cli) {
///     Ok(summary) => println!("{} files examined", summary.examined),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<RunSummary, String> {
    match cli.command() {
        OrganizeCommand::Preview => preview_directory(&cli.source, cli.config.as_deref()),
        OrganizeCommand::Organize { dry_run } => {
            let target = cli
                .target
                .as_deref()
                .ok_or_else(|| "A target directory is required".to_string())?;
            organize_directory(cli, target, dry_run)
        }
    }
}

/// Exit status for a run: 0 when everything was organized, 1 when some
/// files failed, 2 when the run could not start.
pub fn exit_code(result: &Result<RunSummary, String>) -> u8 {
    match result {
        Ok(summary) if summary.failed > 0 => 1,
        Ok(_) => 0,
        Err(_) => 2,
    }
}

/// Prints how each file in `source` would be classified.
fn preview_directory(source: &Path, config_path: Option<&Path>) -> Result<RunSummary, String> {
    OutputFormatter::info(&format!("Classification preview of: {}", source.display()));

    let classifier = Classifier::new(config_path);
    let preview = classifier
        .preview(source)
        .map_err(|e| format!("Error reading directory {}: {}", source.display(), e))?;

    if preview.is_empty() {
        OutputFormatter::plain("No files found to classify.");
        return Ok(RunSummary::default());
    }

    for (name, category) in &preview.entries {
        OutputFormatter::plain(&format!(" - {} → {}/", name, category));
    }
    OutputFormatter::summary_table(&preview.counts(), preview.len());

    Ok(RunSummary {
        examined: preview.len(),
        ..RunSummary::default()
    })
}

/// Organizes (or, with `dry_run`, simulates organizing) `cli.source` into `target`.
fn organize_directory(cli: &Cli, target: &Path, dry_run: bool) -> Result<RunSummary, String> {
    if dry_run {
        OutputFormatter::dry_run_notice("No files will be moved.");
    }
    OutputFormatter::info(&format!(
        "Organizing {} into {}",
        cli.source.display(),
        target.display()
    ));

    let mut organizer = Organizer::new(&cli.source, target, cli.config.as_deref())
        .with_log_dir(&cli.log_dir);

    let mut progress: Option<ProgressBar> = None;
    let result = organizer.organize_with_progress(dry_run, |p| {
        if cli.verbose {
            return;
        }
        let pb = progress
            .get_or_insert_with(|| OutputFormatter::create_progress_bar(p.total as u64));
        pb.set_message(format!("{} → {}", p.file_name, p.category));
        pb.inc(1);
    });
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let summary = result.map_err(|e| e.to_string())?;

    if dry_run {
        for message in organizer
            .log()
            .messages()
            .filter(|m| m.starts_with("Would move"))
        {
            OutputFormatter::plain(&format!(" - {}", message));
        }
    }

    for record in organizer.failed() {
        OutputFormatter::error(&format!(
            "{}: {}",
            record.source.display(),
            record.outcome.status()
        ));
    }

    OutputFormatter::run_summary(&summary, dry_run);

    if let Some(path) = organizer.log().path() {
        OutputFormatter::plain(&format!("Log written to {}", path.display()));
    }
    if summary.failed > 0 {
        OutputFormatter::warning("Some files could not be organized. Check the logs for details.");
    } else if !dry_run {
        OutputFormatter::success("Organization complete!");
    }

    Ok(summary)
}
