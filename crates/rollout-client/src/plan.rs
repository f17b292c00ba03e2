//! Plan and rollout creation for a release.

use crate::client::Client;
use crate::types::{CreateRolloutRequest, Plan, PreviewPlanRequest, PreviewPlanResponse, Rollout};
use crate::{ClientError, Result};

/// Preview the plan that would apply `release` to `database`.
///
/// Fails with [`ClientError::EmptyPlan`] when the preview has nothing to do.
pub async fn preview_plan(client: &Client, release: &str, database: &str) -> Result<Plan> {
    let body = PreviewPlanRequest {
        release: release.to_string(),
        targets: vec![database.to_string()],
        allow_out_of_order: false,
    };
    let path = format!("{}:previewPlan", client.project());
    let resp: PreviewPlanResponse = client.post("preview plan", &path, &body).await?;

    let specs = resp.plan.spec_count();
    if specs == 0 {
        return Err(ClientError::EmptyPlan);
    }
    tracing::info!(release, database, specs, "previewed plan");
    Ok(resp.plan)
}

/// Persist a previewed plan.
pub async fn create_plan(client: &Client, plan: &Plan) -> Result<Plan> {
    let path = format!("{}/plans", client.project());
    let created: Plan = client.post("create plan", &path, plan).await?;
    tracing::info!(plan = %created.name, "created plan");
    Ok(created)
}

pub async fn create_rollout(client: &Client, plan: &str) -> Result<Rollout> {
    let body = CreateRolloutRequest {
        plan: plan.to_string(),
    };
    let path = format!("{}/rollouts", client.project());
    let rollout: Rollout = client.post("create rollout", &path, &body).await?;
    tracing::info!(rollout = %rollout.name, stages = rollout.stages.len(), "created rollout");
    Ok(rollout)
}

/// Preview, persist and launch the plan for `release` on `database`.
pub async fn deploy(client: &Client, release: &str, database: &str) -> Result<Rollout> {
    let preview = preview_plan(client, release, database).await?;
    let plan = create_plan(client, &preview).await?;
    create_rollout(client, &plan.name).await
}

// ─── Tests ────────────────────────────────────────────────────────────────
