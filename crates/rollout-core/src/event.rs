//! CI trigger gating.
//!
//! The action only ships migrations for a completed change: a merged pull
//! request or a push. The event payload is the JSON file GitHub Actions points
//! at with `GITHUB_EVENT_PATH`.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    PullRequest,
    Push,
}

impl Trigger {
    /// The `GITHUB_EVENT_NAME` this trigger expects.
    pub fn event_name(self) -> &'static str {
        match self {
            Trigger::PullRequest => "pull_request",
            Trigger::Push => "push",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::PullRequest => "pull-request",
            Trigger::Push => "push",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Trigger {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pull-request" | "pull_request" => Ok(Trigger::PullRequest),
            "push" => Ok(Trigger::Push),
            other => Err(CoreError::Config(format!(
                "unknown trigger '{other}'; valid: pull-request, push"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// The source revision a release is tied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub commit: String,
    /// Link back to the pull request or commit, when the payload carries one.
    pub url: Option<String>,
    /// Branch the change landed on (`main`, not `refs/heads/main`).
    pub branch: Option<String>,
}

// ---------------------------------------------------------------------------
// Payload shapes (only the fields we read)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PullRequestEvent {
    action: String,
    pull_request: PullRequest,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    merge_commit_sha: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    base: Option<BaseRef>,
}

#[derive(Debug, Deserialize)]
struct BaseRef {
    #[serde(rename = "ref")]
    branch: String,
}

#[derive(Debug, Deserialize)]
struct PushEvent {
    #[serde(rename = "ref", default)]
    git_ref: Option<String>,
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    compare: Option<String>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    head_commit: Option<HeadCommit>,
}

#[derive(Debug, Deserialize)]
struct HeadCommit {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

// ---------------------------------------------------------------------------
// Gating
// ---------------------------------------------------------------------------

/// Check that `event_name` and `payload` describe the change `trigger`
/// expects, and extract the revision to release.
pub fn resolve_revision(trigger: Trigger, event_name: &str, payload: &str) -> Result<Revision> {
    check_event_name(trigger, event_name)?;

    match trigger {
        Trigger::PullRequest => {
            let event: PullRequestEvent = serde_json::from_str(payload)?;
            if event.action != "closed" || !event.pull_request.merged {
                return Err(CoreError::Precondition(
                    "expect pull request was merged".to_string(),
                ));
            }
            let pr = event.pull_request;
            let commit = pr.merge_commit_sha.filter(|s| !s.is_empty()).ok_or_else(|| {
                CoreError::Precondition("merged pull request has no merge commit".to_string())
            })?;
            Ok(Revision {
                commit,
                url: pr.html_url,
                branch: pr.base.map(|b| b.branch),
            })
        }
        Trigger::Push => {
            let event: PushEvent = serde_json::from_str(payload)?;
            if event.deleted || event.after.as_deref().is_some_and(is_null_sha) {
                return Err(CoreError::Precondition(
                    "push deleted the branch, nothing to release".to_string(),
                ));
            }
            let head = event.head_commit;
            let commit = event
                .after
                .filter(|s| !s.is_empty())
                .or_else(|| head.as_ref().map(|h| h.id.clone()))
                .ok_or_else(|| {
                    CoreError::Precondition("push event has no head commit".to_string())
                })?;
            let url = head.and_then(|h| h.url).or(event.compare);
            let branch = event
                .git_ref
                .map(|r| r.strip_prefix("refs/heads/").unwrap_or(&r).to_string());
            Ok(Revision {
                commit,
                url,
                branch,
            })
        }
    }
}

/// The all-zero SHA GitHub reports as `after` when a ref is deleted.
fn is_null_sha(sha: &str) -> bool {
    !sha.is_empty() && sha.bytes().all(|b| b == b'0')
}

fn check_event_name(trigger: Trigger, event_name: &str) -> Result<()> {
    if event_name != trigger.event_name() {
        return Err(CoreError::Precondition(format!(
            "expect {} event, but got {event_name}",
            trigger.event_name()
        )));
    }
    Ok(())
}

/// Read the payload from `path` and gate it with [`resolve_revision`].
pub fn load_revision(trigger: Trigger, event_name: &str, path: &Path) -> Result<Revision> {
    check_event_name(trigger, event_name)?;
    let payload = std::fs::read_to_string(path)?;
    resolve_revision(trigger, event_name, &payload)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
