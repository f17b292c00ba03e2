use crate::cmd::{self, PollArgs, ServiceArgs};
use crate::output::print_json;
use anyhow::Context;
use clap::Args;
use rollout_client::{poller, RolloutApi};

#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Rollout resource name, e.g. `projects/hr/rollouts/42`
    pub rollout: String,

    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(flatten)]
    pub poll: PollArgs,
}

pub fn run(args: WaitArgs, json: bool) -> anyhow::Result<()> {
    let project = project_of(&args.rollout)?;
    let client = cmd::client(&args.service, project)?;
    let poll = args.poll.poll_config();

    cmd::block_on(async {
        let rollout = client
            .get_rollout(&args.rollout)
            .await
            .context("failed to fetch rollout")?;
        poller::wait_for_rollout(&client, &rollout, &poll)
            .await
            .context("rollout did not complete")
    })??;

    let url = client.resource_url(&args.rollout);
    if json {
        print_json(&serde_json::json!({ "rollout": args.rollout, "rolloutUrl": url }))?;
    } else {
        println!("Rollout finished: {url}");
    }
    Ok(())
}

/// `projects/<id>/rollouts/<n>` → `projects/<id>`
fn project_of(rollout: &str) -> anyhow::Result<&str> {
    let parts: Vec<&str> = rollout.split('/').collect();
    match parts.as_slice() {
        ["projects", id, "rollouts", n] if !id.is_empty() && !n.is_empty() => {
            Ok(&rollout[..("projects/".len() + id.len())])
        }
        _ => anyhow::bail!("invalid rollout '{rollout}'; expected projects/<id>/rollouts/<n>"),
    }
}
