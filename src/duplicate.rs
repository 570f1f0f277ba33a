//! Name-collision handling for the target tree.
//!
//! When a file's natural destination is taken, the occupant is compared to the
//! incoming file by content. Identical content means the file is already
//! organized; different content means the file is stored under the first free
//! `stem(n).ext` name, checking each occupied candidate for identical content
//! along the way.

use crate::file_organizer::MoveError;
use crate::run_log::RunLog;
use sha2::{Digest, Sha256};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Upper bound on numbered candidate names tried for one file.
pub const MAX_DUPLICATE_ATTEMPTS: u32 = 100;

/// SHA-256 digest of a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hashes the file at `path` in 8 KiB chunks.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];
        loop {
            let read = file.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        Ok(Self(digest))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Where an incoming file should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A free path the file can be moved to.
    Unique(PathBuf),
    /// An existing file with identical content; nothing needs to be written.
    Identical(PathBuf),
}

/// Finds the destination for `source` given its natural `target` path.
///
/// Unreadable files are never considered identical, so a failed hash only
/// moves the search on to the next candidate name.
///
/// # Errors
///
/// Returns `MoveError::DuplicateExhaustion` when `target` and all
/// [`MAX_DUPLICATE_ATTEMPTS`] numbered candidates are taken by different files.
pub fn resolve(source: &Path, target: &Path, log: &mut RunLog) -> Result<Resolution, MoveError> {
    if !target.exists() {
        return Ok(Resolution::Unique(target.to_path_buf()));
    }

    let source_print = fingerprint(source, log);
    let source_len = fs::metadata(source).map(|m| m.len()).ok();

    if is_identical(source_print.as_ref(), source_len, target, log) {
        return Ok(Resolution::Identical(target.to_path_buf()));
    }

    let stem = target.file_stem().unwrap_or_default();
    let extension = target.extension();
    let parent = target.parent().unwrap_or_else(|| Path::new(""));

    for n in 1..=MAX_DUPLICATE_ATTEMPTS {
        let candidate = parent.join(candidate_name(stem, extension, n));
        if !candidate.exists() {
            return Ok(Resolution::Unique(candidate));
        }
        if is_identical(source_print.as_ref(), source_len, &candidate, log) {
            return Ok(Resolution::Identical(candidate));
        }
    }

    Err(MoveError::DuplicateExhaustion {
        path: source.to_path_buf(),
        attempts: MAX_DUPLICATE_ATTEMPTS,
    })
}

/// `report` + `pdf` + 2 -> `report(2).pdf`
fn candidate_name(stem: &OsStr, extension: Option<&OsStr>, n: u32) -> OsString {
    let mut name = stem.to_os_string();
    name.push(format!("({})", n));
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    name
}

fn fingerprint(path: &Path, log: &mut RunLog) -> Option<Fingerprint> {
    match Fingerprint::of_file(path) {
        Ok(print) => Some(print),
        Err(e) => {
            log.warn(format!(
                "Could not calculate hash for {}: {}",
                path.display(),
                e
            ));
            None
        }
    }
}

fn is_identical(
    source_print: Option<&Fingerprint>,
    source_len: Option<u64>,
    candidate: &Path,
    log: &mut RunLog,
) -> bool {
    let Some(source_print) = source_print else {
        return false;
    };

    // Different sizes cannot hash the same; skip reading the candidate.
    if let (Some(len), Ok(meta)) = (source_len, fs::metadata(candidate))
        && meta.len() != len
    {
        return false;
    }

    fingerprint(candidate, log).as_ref() == Some(source_print)
}
