//! Wire types for the release, plan and rollout endpoints.
//!
//! The service speaks camelCase JSON. Plans are posted back verbatim after a
//! preview, so [`Plan`] and [`PlanStep`] keep every field they do not model
//! in a flattened map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ─── Sheets ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetContent {
    pub title: String,
    /// Base64-encoded SQL text.
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSheetRequest {
    pub sheet: SheetContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCreateSheetsRequest {
    pub requests: Vec<CreateSheetRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCreateSheetsResponse {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

// ─── Releases ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseFileType {
    Versioned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFile {
    pub path: String,
    pub version: String,
    pub sheet: String,
    #[serde(rename = "type")]
    pub file_type: ReleaseFileType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcsSource {
    pub vcs_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReleaseRequest {
    pub title: String,
    pub files: Vec<ReleaseFile>,
    pub vcs_source: VcsSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
}

// ─── Plans ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPlanRequest {
    pub release: String,
    pub targets: Vec<String>,
    pub allow_out_of_order: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewPlanResponse {
    pub plan: Plan,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(default)]
    pub specs: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Empty until the plan is persisted.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Plan {
    pub fn spec_count(&self) -> usize {
        self.steps.iter().map(|s| s.specs.len()).sum()
    }
}

// ─── Rollouts ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRolloutRequest {
    pub plan: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    NotStarted,
    Pending,
    Running,
    Done,
    Failed,
    Canceled,
    Skipped,
    /// Any status this client does not know about. Waited on like `Running`.
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Done => "DONE",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::Skipped => "SKIPPED",
            TaskStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollout {
    pub name: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunTasksRequest {
    pub tasks: Vec<String>,
    pub reason: String,
}

// ─── Errors ───────────────────────────────────────────────────────────────

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}
