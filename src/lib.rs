//! smartsort - classify files and move them into category folders
//!
//! This library provides a rule-driven classifier (extensions plus filename
//! regexes, loaded from JSON or TOML), an organizer that moves files into
//! `<target>/<category>/` with content-aware duplicate handling and dry-run
//! support, and per-run text and CSV logs of every operation.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod duplicate;
pub mod file_organizer;
pub mod output;
pub mod run_log;

pub use classifier::{Classifier, OTHERS, Preview};
pub use config::{CategoryRule, ConfigError, RuleSet};
pub use duplicate::{Fingerprint, Resolution};
pub use file_organizer::{
    FileRecord, MoveError, OperationOutcome, OrganizeError, Organizer, RunSummary,
};
pub use run_log::RunLog;

pub use cli::{Cli, OrganizeCommand, run_cli};
