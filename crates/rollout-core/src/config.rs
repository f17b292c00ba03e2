use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// BranchTarget
// ---------------------------------------------------------------------------

/// Where changes landing on one branch are released to.
///
/// Every field is optional so that a command-line flag can supply what the
/// file leaves out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub branches: BTreeMap<String, BranchTarget>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// The single target configured for `branch`, if any.
    pub fn target_for(&self, branch: &str) -> Option<&BranchTarget> {
        self.branches.get(branch)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.branches.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no branches configured".to_string(),
            });
        }

        for (branch, target) in &self.branches {
            if branch.starts_with("refs/") {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "branch '{branch}' should be a plain branch name, not a ref"
                    ),
                });
            }

            for (field, value) in [
                ("project", &target.project),
                ("database", &target.database),
                ("directory", &target.directory),
            ] {
                if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!("branch '{branch}' has an empty {field}"),
                    });
                }
            }

            if let Some(db) = target.database.as_deref().filter(|d| !d.trim().is_empty()) {
                if !is_database_name(db) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "branch '{branch}' database '{db}' is not of the form \
                             instances/<instance>/databases/<database>"
                        ),
                    });
                }
            }
        }

        warnings
    }
}

fn is_database_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('/').collect();
    parts.len() == 4
        && parts[0] == "instances"
        && parts[2] == "databases"
        && !parts[1].is_empty()
        && !parts[3].is_empty()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
