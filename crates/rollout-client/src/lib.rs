//! `rollout-client`: typed client for the release, plan and rollout API of
//! the database change-management service.
//!
//! # Architecture
//!
//! ```text
//! [MigrationFile]
//!     │
//!     ▼
//! release::create_release   ← sheets:batchCreate, then releases
//!     │                        returns the release name
//!     ▼
//! plan::deploy              ← :previewPlan (fails on zero specs),
//!     │                        plans, rollouts
//!     ▼
//! poller::wait_for_rollout  ← GET rollout every interval, runs
//!                              NOT_STARTED tasks stage by stage
//! ```
//!
//! Every call goes through [`Client`], which carries the base URL, bearer
//! token and project for the run. Non-2xx responses surface as
//! [`ClientError::RemoteCall`] and are never retried.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use rollout_client::{plan, poller, release, Client, ClientConfig, PollConfig};
//!
//! let client = Client::new(ClientConfig {
//!     base_url: "https://bytebase.example.com".into(),
//!     token: token.into(),
//!     project: "hr".into(),
//! })?;
//! let release = release::create_release(&client, &files, &revision).await?;
//! let rollout = plan::deploy(&client, &release, "instances/prod/databases/hr").await?;
//! poller::wait_for_rollout(&client, &rollout, &PollConfig::default()).await?;
//! ```

pub mod client;
pub mod error;
pub mod plan;
pub mod poller;
pub mod release;
pub mod types;


pub use client::{Client, ClientConfig};
pub use error::ClientError;
pub use poller::{PollConfig, RolloutApi, StageState};
pub use types::{Plan, Rollout, Stage, Task, TaskStatus};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ClientError>;
