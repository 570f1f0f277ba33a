//! File classification by extension and filename pattern.
//!
//! A [`Classifier`] holds the compiled form of a [`RuleSet`]: per category, a
//! set of lowercase extensions and a list of case-insensitive regexes. Names
//! are matched by scanning the categories in configuration order; the first
//! category whose extension set contains the file's extension, or one of whose
//! patterns occurs anywhere in the lowercased name, wins.
//!
//! # Examples
//!
//! ```
//! use smartsort::classifier::Classifier;
//!
//! let classifier = Classifier::default();
//! assert_eq!(classifier.classify("photo.jpg"), "Images");
//! assert_eq!(classifier.classify("invoice_2025.pdf"), "Documents");
//! assert_eq!(classifier.classify("file.xyz"), "Others");
//! ```

use crate::config::{ConfigError, RuleSet};
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Category returned when no rule matches.
pub const OTHERS: &str = "Others";

/// One category of the rule table, ready for matching.
#[derive(Debug, Clone)]
struct CompiledCategory {
    name: String,
    extensions: HashSet<String>,
    patterns: Vec<Regex>,
}

impl CompiledCategory {
    fn matches_pattern(&self, lower_name: &str) -> bool {
        self.patterns.iter().any(|regex| regex.is_match(lower_name))
    }
}

/// Maps file names to category names.
///
/// The rule table is immutable once built; `classify` is a pure function of
/// the table and the name.
#[derive(Debug, Clone)]
pub struct Classifier {
    categories: Vec<CompiledCategory>,
}

impl Classifier {
    /// Creates a classifier from a rule file.
    ///
    /// Missing or unreadable configuration never fails: see
    /// [`RuleSet::load_or_default`]. If the loaded rules contain an invalid
    /// pattern, a warning is logged and the built-in rules are used instead.
    pub fn new(config_path: Option<&Path>) -> Self {
        let rules = RuleSet::load_or_default(config_path);
        Self::from_rules(rules).unwrap_or_else(|e| {
            tracing::warn!("Could not compile classification rules: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Compiles an in-memory rule set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRegexPattern` if a pattern does not compile.
    pub fn from_rules(rules: RuleSet) -> Result<Self, ConfigError> {
        let categories = rules
            .categories()
            .iter()
            .map(|rule| {
                let patterns = rule
                    .patterns
                    .iter()
                    .map(|pattern| {
                        RegexBuilder::new(pattern)
                            .case_insensitive(true)
                            .build()
                            .map_err(|e| ConfigError::InvalidRegexPattern {
                                category: rule.name.clone(),
                                pattern: pattern.clone(),
                                reason: e.to_string(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(CompiledCategory {
                    name: rule.name.clone(),
                    extensions: rule.extensions.iter().cloned().collect(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { categories })
    }

    /// Category names in evaluation order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// Returns the category for a file name (or path; only the last
    /// component is considered). Returns [`OTHERS`] when nothing matches.
    pub fn classify(&self, file_name: &str) -> &str {
        let base = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| file_name.to_lowercase());
        let ext = extension_of(&base);

        for category in &self.categories {
            if !ext.is_empty() && category.extensions.contains(ext) {
                // A pattern hit confirms the extension; a miss does not veto it.
                return &category.name;
            }
            if category.matches_pattern(&base) {
                return &category.name;
            }
        }

        OTHERS
    }

    /// Classifies the regular files directly inside `dir` without touching them.
    pub fn preview(&self, dir: &Path) -> io::Result<Preview> {
        let listing = regular_files(dir)?;
        for e in &listing.unreadable {
            tracing::warn!(dir = %dir.display(), "Skipping unreadable directory entry: {}", e);
        }
        let entries = listing
            .files
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().to_string();
                let category = self.classify(&name).to_string();
                Some((name, category))
            })
            .collect();
        Ok(Preview { entries })
    }
}

impl Default for Classifier {
    /// Classifier over the built-in rules, without any file I/O.
    fn default() -> Self {
        Self::from_rules(RuleSet::default()).expect("built-in rules are valid regexes")
    }
}

/// Classification breakdown of a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preview {
    /// `(file name, category)` pairs sorted by file name.
    pub entries: Vec<(String, String)>,
}

impl Preview {
    /// Number of files per category.
    pub fn counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for (_, category) in &self.entries {
            *counts.entry(category.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extension of a (lowercased) file name including the dot, or `""`.
///
/// Leading dots do not start an extension, so `.bashrc` has none, while
/// `archive.tar.gz` yields `.gz` and `notes.` yields `.`.
pub fn extension_of(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(dot) if file_name[..dot].chars().any(|c| c != '.') => &file_name[dot..],
        _ => "",
    }
}

/// Contents of a directory listing: the regular files plus the entries that
/// could not be read.
#[derive(Debug, Default)]
pub(crate) struct DirListing {
    /// Regular files (symlinks followed), sorted by path.
    pub files: Vec<PathBuf>,
    pub unreadable: Vec<io::Error>,
}

/// Lists the regular files directly inside `dir`.
///
/// Entry errors do not abort the listing; they are collected so the caller
/// can report them.
pub(crate) fn regular_files(dir: &Path) -> io::Result<DirListing> {
    let mut listing = DirListing::default();
    for entry in fs::read_dir(dir)? {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() {
                    listing.files.push(path);
                }
            }
            Err(e) => listing.unreadable.push(e),
        }
    }
    listing.files.sort();
    Ok(listing)
}
