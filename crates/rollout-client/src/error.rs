use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{call} failed with status {status}: {message}")]
    RemoteCall {
        call: &'static str,
        status: u16,
        message: String,
    },

    #[error("failed to decode {call} response: {source}")]
    Decode {
        call: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("plan has no specs")]
    EmptyPlan,

    #[error("expected {expected} sheets, got {got}")]
    SheetCountMismatch { expected: usize, got: usize },

    #[error("stage '{stage}' has failed tasks: {}", tasks.join(", "))]
    TaskFailed { stage: String, tasks: Vec<String> },

    #[error("rollout '{rollout}' reported {got} stages, expected {expected}")]
    StageCountChanged {
        rollout: String,
        expected: usize,
        got: usize,
    },

    #[error("rollout did not finish within {}s", elapsed.as_secs())]
    Timeout { elapsed: Duration },

    #[error("invalid client config: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
