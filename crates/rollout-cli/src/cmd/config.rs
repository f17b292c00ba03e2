use crate::output::{print_json, Table};
use crate::root::resolve_path;
use anyhow::Context;
use clap::Subcommand;
use rollout_core::config::{Config, WarnLevel};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the branch → project/database/directory mapping
    Show {
        /// Config file, relative to the workspace root
        #[arg(long, env = "INPUT_CONFIG")]
        path: PathBuf,
    },

    /// Validate the config for common mistakes
    Validate {
        /// Config file, relative to the workspace root
        #[arg(long, env = "INPUT_CONFIG")]
        path: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show { path } => show(&resolve_path(root, &path), json),
        ConfigSubcommand::Validate { path } => validate(&resolve_path(root, &path), json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(path).context("failed to load config")?;

    if json {
        return print_json(&config);
    }

    if config.branches.is_empty() {
        println!("No branches configured.");
        return Ok(());
    }

    let mut table = Table::new(&["BRANCH", "PROJECT", "DATABASE", "DIRECTORY"]);
    for (branch, t) in &config.branches {
        table.row([
            branch.as_str(),
            t.project.as_deref().unwrap_or("-"),
            t.database.as_deref().unwrap_or("-"),
            t.directory.as_deref().unwrap_or("-"),
        ]);
    }
    table.print();
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(path).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
