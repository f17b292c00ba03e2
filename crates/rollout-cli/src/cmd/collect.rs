use crate::output::{print_json, Table};
use crate::root::resolve_path;
use anyhow::Context;
use rollout_core::migration;
use std::path::Path;

pub fn run(root: &Path, directory: &Path, json: bool) -> anyhow::Result<()> {
    let dir = resolve_path(root, directory);
    let files = migration::collect(&dir)
        .with_context(|| format!("failed to collect migrations from {}", dir.display()))?;

    if json {
        let value: Vec<serde_json::Value> = files
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "version": f.version,
                    "bytes": f.content.len(),
                })
            })
            .collect();
        return print_json(&value);
    }

    if files.is_empty() {
        println!("No migration files in {}.", dir.display());
        return Ok(());
    }

    let mut table = Table::new(&["VERSION", "FILE", "BYTES"])
        .align_right(0)
        .align_right(2);
    for f in &files {
        table.row([f.version.clone(), f.name.clone(), f.content.len().to_string()]);
    }
    table.print();
    Ok(())
}
