//! Migration file collection.
//!
//! A migration is a `*.sql` file directly under the migration directory whose
//! name starts with a run of digits, e.g. `0042_add_users.sql`. The digits are
//! the migration version. Files without a leading version are skipped.

use crate::error::{CoreError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::OnceLock;

pub const MIGRATION_EXTENSION: &str = "sql";

// ---------------------------------------------------------------------------
// MigrationFile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationFile {
    /// File name relative to the migration directory (e.g. `1.sql`).
    pub name: String,
    /// Leading digit run of the file name, kept as a string so that
    /// arbitrarily long versions survive untouched.
    pub version: String,
    pub content: String,
}

static VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn version_re() -> &'static Regex {
    VERSION_RE.get_or_init(|| Regex::new(r"^\d+").unwrap())
}

/// Extract the version prefix from a migration file name.
pub fn parse_version(file_name: &str) -> Option<&str> {
    version_re().find(file_name).map(|m| m.as_str())
}

/// Numeric ordering of two digit strings of any length.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Collect the migration files directly under `dir`, ordered by ascending
/// version. Ties fall back to the file name.
pub fn collect(dir: &Path) -> Result<Vec<MigrationFile>> {
    if !dir.is_dir() {
        return Err(CoreError::DirectoryNotFound(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(MIGRATION_EXTENSION) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::info!(file = %path.display(), "skipping file with a non-UTF-8 name");
            continue;
        };
        let Some(version) = parse_version(name) else {
            tracing::info!(file = %name, "skipping file without a version prefix");
            continue;
        };
        let content = std::fs::read_to_string(&path)?;
        tracing::info!(file = %name, version = %version, "collected migration");
        files.push(MigrationFile {
            name: name.to_string(),
            version: version.to_string(),
            content,
        });
    }

    files.sort_by(|a, b| compare_versions(&a.version, &b.version).then_with(|| a.name.cmp(&b.name)));
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
