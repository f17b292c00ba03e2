use crate::cmd::{self, PollArgs, ServiceArgs};
use crate::output::print_json;
use crate::root::resolve_path;
use anyhow::{Context, Result};
use clap::Args;
use rollout_client::{plan, poller, release, Client, PollConfig};
use rollout_core::config::{BranchTarget, Config};
use rollout_core::event::{self, Revision, Trigger};
use rollout_core::io::write_step_output;
use rollout_core::migration::{self, MigrationFile};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Project id or `projects/<id>` (default: from --config)
    #[arg(long, env = "INPUT_PROJECT")]
    pub project: Option<String>,

    /// Target database, `instances/<instance>/databases/<database>` (default: from --config)
    #[arg(long, env = "INPUT_DATABASE")]
    pub database: Option<String>,

    /// Migration directory, relative to the workspace root (default: from --config, then `migrations`)
    #[arg(long, env = "INPUT_DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// Branch mapping config file
    #[arg(long, env = "INPUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// GitHub token of the workflow run
    #[arg(long, env = "INPUT_GH-TOKEN", hide_env_values = true)]
    pub gh_token: Option<String>,

    /// Which CI event completes a change: pull-request or push
    #[arg(long, env = "INPUT_TRIGGER", default_value = "pull-request")]
    pub trigger: Trigger,

    /// Name of the CI event that started this run
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    pub event: String,

    /// Path to the CI event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub event_path: PathBuf,

    /// File step outputs are appended to
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: Option<PathBuf>,

    #[command(flatten)]
    pub poll: PollArgs,
}

/// Where this run releases to, after merging flags with the config file.
#[derive(Debug, PartialEq)]
struct Target {
    project: String,
    database: String,
    directory: PathBuf,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    commit: String,
    files: usize,
    release: String,
    release_url: String,
    rollout: String,
    rollout_url: String,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, args: RunArgs, json: bool) -> Result<()> {
    // Gate on the event before anything touches the service.
    let revision = event::load_revision(args.trigger, &args.event, &args.event_path)
        .context("refusing to run for this event")?;
    tracing::info!(
        commit = %revision.commit,
        branch = revision.branch.as_deref().unwrap_or("-"),
        gh_token = args.gh_token.is_some(),
        "accepted {} event",
        args.event
    );

    let branch_target = match &args.config {
        Some(path) => {
            let config = Config::load(&resolve_path(root, path)).context("failed to load config")?;
            branch_target(&config, &revision)
        }
        None => None,
    };
    let target = resolve_target(&args, branch_target.as_ref())?;

    let dir = resolve_path(root, &target.directory);
    let files = migration::collect(&dir)
        .with_context(|| format!("failed to collect migrations from {}", dir.display()))?;
    if files.is_empty() {
        anyhow::bail!("no migration files found in {}", dir.display());
    }

    let client = cmd::client(&args.service, &target.project)?;
    let poll = args.poll.poll_config();
    let output_file = args.output_file.as_deref();

    let summary = cmd::block_on(deliver(
        &client,
        &files,
        &revision,
        &target.database,
        &poll,
        output_file,
    ))??;

    if json {
        print_json(&summary)?;
    } else {
        println!("Release: {}", summary.release_url);
        println!("Rollout: {}", summary.rollout_url);
        println!("Rollout finished ({} files).", summary.files);
    }
    Ok(())
}

async fn deliver(
    client: &Client,
    files: &[MigrationFile],
    revision: &Revision,
    database: &str,
    poll: &PollConfig,
    output_file: Option<&Path>,
) -> Result<RunSummary> {
    let release = release::create_release(client, files, revision)
        .await
        .context("failed to create release")?;
    let release_url = client.resource_url(&release);
    emit_output(output_file, "release-url", &release_url)?;

    let rollout = plan::deploy(client, &release, database)
        .await
        .context("failed to create rollout")?;
    let rollout_url = client.resource_url(&rollout.name);
    emit_output(output_file, "rollout-url", &rollout_url)?;
    tracing::info!(url = %rollout_url, "waiting for rollout");

    poller::wait_for_rollout(client, &rollout, poll)
        .await
        .context("rollout did not complete")?;

    Ok(RunSummary {
        commit: revision.commit.clone(),
        files: files.len(),
        release,
        release_url,
        rollout: rollout.name,
        rollout_url,
    })
}

fn emit_output(output_file: Option<&Path>, name: &str, value: &str) -> Result<()> {
    if let Some(path) = output_file {
        write_step_output(path, name, value)
            .with_context(|| format!("failed to write step output {name}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Target resolution
// ---------------------------------------------------------------------------

fn branch_target(config: &Config, revision: &Revision) -> Option<BranchTarget> {
    let branch = revision.branch.as_deref()?;
    let target = config.target_for(branch).cloned();
    if target.is_none() {
        tracing::info!(branch, "no config entry for branch");
    }
    target
}

/// Flags win over the config entry; the directory falls back to `migrations`.
fn resolve_target(args: &RunArgs, from_config: Option<&BranchTarget>) -> Result<Target> {
    let project = args
        .project
        .clone()
        .or_else(|| from_config.and_then(|t| t.project.clone()))
        .context("no project given: pass --project or map the branch in --config")?;
    let database = args
        .database
        .clone()
        .or_else(|| from_config.and_then(|t| t.database.clone()))
        .context("no database given: pass --database or map the branch in --config")?;
    let directory = args
        .directory
        .clone()
        .or_else(|| from_config.and_then(|t| t.directory.clone()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(cmd::DEFAULT_DIRECTORY));
    Ok(Target {
        project,
        database,
        directory,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
