//! Category rule configuration.
//!
//! This module owns the ordered rule table that drives classification and
//! knows how to read it from, and write it to, JSON or TOML files. The order
//! of categories in the file is the order in which they are tried, so the
//! table is (de)serialized through a hand-written map visitor rather than a
//! hash map.
//!
//! # Configuration File Format
//!
//! ```json
//! {
//!     "Documents": {
//!         "extensions": [".pdf", ".txt"],
//!         "patterns": ["invoice.*\\.(pdf|doc|docx)"]
//!     },
//!     "Images": {
//!         "extensions": [".jpg", ".png"],
//!         "patterns": []
//!     }
//! }
//! ```
//!
//! The same shape is accepted as TOML when the file name ends in `.toml`:
//!
//! ```toml
//! [Documents]
//! extensions = [".pdf", ".txt"]
//! patterns = ['invoice.*\.(pdf|doc|docx)']
//! ```

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading or saving the rule configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid JSON/TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// A category pattern is not a valid regular expression.
    #[error("Invalid regex pattern '{pattern}' in category '{category}': {reason}")]
    InvalidRegexPattern {
        /// The category that declares the pattern.
        category: String,
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// IO error while reading or writing configuration.
    #[error("IO error accessing configuration: {0}")]
    IoError(#[from] std::io::Error),
}

/// On-disk format of a rule file, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML, everything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// A single named category with its extension list and filename patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    /// Category name, also used as the target sub-directory name.
    pub name: String,
    /// Lowercase extensions including the leading dot (e.g. `.pdf`).
    pub extensions: Vec<String>,
    /// Regular expressions searched in the lowercased file name.
    pub patterns: Vec<String>,
}

impl CategoryRule {
    /// Creates a rule, normalising extensions to lowercase dotted form.
    pub fn new<N, E, P>(name: N, extensions: E, patterns: P) -> Self
    where
        N: Into<String>,
        E: IntoIterator,
        E::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            name: name.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// The ordered set of category rules.
///
/// Category names are unique and the first matching category wins, so the
/// order given here is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    categories: Vec<CategoryRule>,
}

impl RuleSet {
    /// Builds a rule set, rejecting duplicate category names.
    pub fn from_categories(categories: Vec<CategoryRule>) -> Result<Self, ConfigError> {
        for (i, category) in categories.iter().enumerate() {
            if categories[..i].iter().any(|c| c.name == category.name) {
                return Err(ConfigError::ConfigInvalid(format!(
                    "duplicate category '{}'",
                    category.name
                )));
            }
        }
        Ok(Self { categories })
    }

    /// Categories in evaluation order.
    pub fn categories(&self) -> &[CategoryRule] {
        &self.categories
    }

    /// Load rules from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if the file does not exist,
    /// `ConfigError::IoError` if it cannot be read, and
    /// `ConfigError::ConfigInvalid` if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;

        match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::from_str(&content)
                .map_err(|e| ConfigError::ConfigInvalid(e.to_string())),
            ConfigFormat::Toml => {
                toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
            }
        }
    }

    /// Load rules, falling back to the built-in defaults.
    ///
    /// Resolution order:
    /// 1. `config_path` if provided, otherwise `~/.config/smartsort/rules.json`
    /// 2. If that file exists, parse it; on any error log a warning and use defaults
    /// 3. If it does not exist, write the defaults there for future edits
    ///    (best-effort) and use them
    ///
    /// Without an explicit path and without a home directory, the defaults are
    /// used in memory and nothing is written.
    pub fn load_or_default(config_path: Option<&Path>) -> Self {
        let Some(path) = config_path.map(Path::to_path_buf).or_else(default_config_path) else {
            return Self::default();
        };

        if path.exists() {
            return match Self::load(&path) {
                Ok(rules) => {
                    tracing::debug!(path = %path.display(), "Loaded classification rules");
                    rules
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        "Could not load rules config: {}. Using defaults.",
                        e
                    );
                    Self::default()
                }
            };
        }

        let defaults = Self::default();
        match defaults.save(&path) {
            Ok(()) => tracing::info!(path = %path.display(), "Wrote default classification rules"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                "Could not persist default rules: {}. Using in-memory defaults.",
                e
            ),
        }
        defaults
    }

    /// Writes the rules to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?,
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}

/// Default location of the rule file: `~/.config/smartsort/rules.json`.
pub fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("smartsort")
            .join("rules.json")
    })
}

impl Default for RuleSet {
    fn default() -> Self {
        let categories = vec![
            CategoryRule::new(
                "Documents",
                [
                    ".pdf", ".doc", ".docx", ".txt", ".rtf", ".odt", ".xls", ".xlsx", ".ppt",
                    ".pptx",
                ],
                [
                    r"invoice.*\.(pdf|doc|docx)",
                    r"resume.*\.(pdf|doc|docx)",
                    r"report.*\.(pdf|doc|docx|txt)",
                ],
            ),
            CategoryRule::new(
                "Images",
                [
                    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".svg", ".webp", ".ico",
                ],
                [
                    r"screenshot.*\.(jpg|jpeg|png)",
                    r"photo.*\.(jpg|jpeg|png)",
                    r"image.*\.(jpg|jpeg|png|gif)",
                ],
            ),
            CategoryRule::new(
                "Videos",
                [".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".m4v"],
                [
                    r"lecture.*\.(mp4|avi|mkv)",
                    r"tutorial.*\.(mp4|avi|mkv)",
                    r"meeting.*\.(mp4|avi|mkv)",
                ],
            ),
            CategoryRule::new(
                "Audio",
                [".mp3", ".wav", ".flac", ".aac", ".ogg", ".wma", ".m4a"],
                [
                    r"music.*\.(mp3|wav|flac)",
                    r"audio.*\.(mp3|wav|flac)",
                    r"podcast.*\.(mp3|wav)",
                ],
            ),
            CategoryRule::new(
                "Code",
                [
                    ".py", ".js", ".html", ".css", ".java", ".cpp", ".c", ".cs", ".php", ".rb",
                    ".go", ".rs",
                ],
                [
                    r"project.*\.(py|js|java|cpp)",
                    r"script.*\.(py|js|sh|bat)",
                    r".*_code\.(py|js|java|cpp)",
                ],
            ),
            CategoryRule::new(
                "Archives",
                [".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz"],
                [r"backup.*\.(zip|rar|tar|gz)", r"archive.*\.(zip|rar|tar|gz)"],
            ),
            CategoryRule::new(
                "Executables",
                [".exe", ".msi", ".dmg", ".deb", ".rpm", ".pkg"],
                [r"setup.*\.(exe|msi)", r"installer.*\.(exe|msi|dmg)"],
            ),
        ];
        Self { categories }
    }
}

#[derive(Serialize)]
struct CategoryFields<'a> {
    extensions: &'a [String],
    patterns: &'a [String],
}

#[derive(Deserialize)]
struct CategoryEntry {
    #[serde(default)]
    extensions: Vec<String>,
    #[serde(default)]
    patterns: Vec<String>,
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for category in &self.categories {
            map.serialize_entry(
                &category.name,
                &CategoryFields {
                    extensions: &category.extensions,
                    patterns: &category.patterns,
                },
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleSetVisitor;

        impl<'de> Visitor<'de> for RuleSetVisitor {
            type Value = RuleSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of category names to {extensions, patterns}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RuleSet, A::Error> {
                let mut categories: Vec<CategoryRule> = Vec::new();
                while let Some((name, entry)) = map.next_entry::<String, CategoryEntry>()? {
                    if categories.iter().any(|c| c.name == name) {
                        return Err(de::Error::custom(format!("duplicate category '{}'", name)));
                    }
                    categories.push(CategoryRule::new(name, entry.extensions, entry.patterns));
                }
                Ok(RuleSet { categories })
            }
        }

        deserializer.deserialize_map(RuleSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(rules: &RuleSet) -> Vec<&str> {
        rules.categories().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_default_rules_order() {
        let rules = RuleSet::default();
        assert_eq!(
            names(&rules),
            vec![
                "Documents",
                "Images",
                "Videos",
                "Audio",
                "Code",
                "Archives",
                "Executables"
            ]
        );
    }

    #[test]
    fn test_json_preserves_file_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");
        fs::write(
            &path,
            r#"{
                "Zeta": {"extensions": [".z"], "patterns": []},
                "Alpha": {"extensions": [".a"]},
                "Mid": {"patterns": ["mid.*"]}
            }"#,
        )
        .unwrap();

        let rules = RuleSet::load(&path).unwrap();
        assert_eq!(names(&rules), vec!["Zeta", "Alpha", "Mid"]);
        assert!(rules.categories()[1].patterns.is_empty());
        assert!(rules.categories()[2].extensions.is_empty());
    }

    #[test]
    fn test_extensions_are_normalized() {
        let rule = CategoryRule::new("Docs", ["PDF", ".TXT", " md "], Vec::<String>::new());
        assert_eq!(rule.extensions, vec![".pdf", ".txt", ".md"]);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let rules: RuleSet = serde_json::from_str(
            r#"{"Docs": {"extensions": [".pdf"], "patterns": [], "color": "blue"}}"#,
        )
        .unwrap();
        assert_eq!(rules.categories()[0].extensions, vec![".pdf"]);
    }

    #[test]
    fn test_duplicate_category_is_invalid() {
        let result: Result<RuleSet, _> =
            serde_json::from_str(r#"{"Docs": {"extensions": [".pdf"]}, "Docs": {}}"#);
        assert!(result.is_err());

        let built = RuleSet::from_categories(vec![
            CategoryRule::new("A", [".a"], Vec::<String>::new()),
            CategoryRule::new("A", [".b"], Vec::<String>::new()),
        ]);
        assert!(matches!(built, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = RuleSet::load(Path::new("/non/existent/rules.json"));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            RuleSet::load(&path),
            Err(ConfigError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_load_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.toml");
        fs::write(
            &path,
            r#"
[Reports]
extensions = [".csv"]
patterns = ['^q[1-4]_.*\.xlsx$']

[Notes]
extensions = ["md"]
"#,
        )
        .unwrap();

        let rules = RuleSet::load(&path).unwrap();
        assert_eq!(names(&rules), vec!["Reports", "Notes"]);
        assert_eq!(rules.categories()[0].patterns, vec![r"^q[1-4]_.*\.xlsx$"]);
        assert_eq!(rules.categories()[1].extensions, vec![".md"]);
    }

    #[test]
    fn test_load_or_default_persists_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config").join("rules.json");

        let rules = RuleSet::load_or_default(Some(path.as_path()));
        assert_eq!(rules, RuleSet::default());
        assert!(path.exists(), "defaults should be written on first use");

        let reloaded = RuleSet::load(&path).unwrap();
        assert_eq!(reloaded, RuleSet::default());
    }

    #[test]
    fn test_load_or_default_persists_toml_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.toml");

        RuleSet::load_or_default(Some(path.as_path()));
        let reloaded = RuleSet::load(&path).unwrap();
        assert_eq!(reloaded, RuleSet::default());
    }

    #[test]
    fn test_load_or_default_falls_back_on_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let rules = RuleSet::load_or_default(Some(path.as_path()));
        assert_eq!(rules, RuleSet::default());
        // A broken file is left alone for the user to fix.
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1, 2, 3]");
    }

    #[test]
    fn test_load_or_default_unwritable_location() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let rules = RuleSet::load_or_default(Some(blocker.join("rules.json").as_path()));
        assert_eq!(rules, RuleSet::default());
    }
}
