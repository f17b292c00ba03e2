//! Rollout polling.
//!
//! Stages run strictly in order. The poller keeps a cursor on the current
//! stage and, on every iteration, re-reads the rollout:
//!
//! ```text
//! stage i all DONE        → advance to i+1 (no sleep)
//! stage i has FAILED task → abort the run
//! otherwise               → batch-run the NOT_STARTED tasks, sleep, repeat
//! ```
//!
//! Polling stops when the cursor passes the last stage, a task fails, a
//! remote call fails or the read shows a different number of stages than the
//! rollout was created with. The optional deadline also bounds each remote
//! call, so a stalled request cannot outlive it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::client::Client;
use crate::types::{BatchRunTasksRequest, Rollout, Stage, TaskStatus};
use crate::{ClientError, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const RUN_TASKS_REASON: &str = "run by rollout action";

// ─── RolloutApi ───────────────────────────────────────────────────────────

/// The two remote calls the poller needs.
pub trait RolloutApi {
    fn get_rollout(&self, name: &str) -> impl Future<Output = Result<Rollout>> + Send;

    fn run_tasks(
        &self,
        stage: &str,
        tasks: &[String],
        reason: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl RolloutApi for Client {
    async fn get_rollout(&self, name: &str) -> Result<Rollout> {
        self.get("get rollout", name).await
    }

    async fn run_tasks(&self, stage: &str, tasks: &[String], reason: &str) -> Result<()> {
        let body = BatchRunTasksRequest {
            tasks: tasks.to_vec(),
            reason: reason.to_string(),
        };
        let path = format!("{stage}/tasks:batchRun");
        let _: serde_json::Value = self.post("batch run tasks", &path, &body).await?;
        Ok(())
    }
}

// ─── PollConfig ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status reads while a stage is still in progress.
    pub interval: Duration,
    /// Give up with [`ClientError::Timeout`] after this long.
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

// ─── Stage evaluation ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageState {
    Done,
    Failed { tasks: Vec<String> },
    InProgress { not_started: Vec<String> },
}

pub fn evaluate(stage: &Stage) -> StageState {
    if stage.tasks.iter().all(|t| t.status == TaskStatus::Done) {
        return StageState::Done;
    }

    let failed: Vec<String> = stage
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Failed)
        .map(|t| t.name.clone())
        .collect();
    if !failed.is_empty() {
        return StageState::Failed { tasks: failed };
    }

    StageState::InProgress {
        not_started: stage
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::NotStarted)
            .map(|t| t.name.clone())
            .collect(),
    }
}

fn stage_label(stage: &Stage) -> &str {
    if stage.title.is_empty() {
        &stage.name
    } else {
        &stage.title
    }
}

// ─── Polling loop ─────────────────────────────────────────────────────────

/// Drive `rollout` until every stage is done.
///
/// `rollout` is the object returned at creation; its stage count decides
/// whether there is anything to wait for and must not change on later reads.
/// Status is always re-read from the service. With a timeout set, every
/// remote call is bounded by the time left.
pub async fn wait_for_rollout<A: RolloutApi>(
    api: &A,
    rollout: &Rollout,
    config: &PollConfig,
) -> Result<()> {
    if rollout.stages.is_empty() {
        tracing::info!(rollout = %rollout.name, "rollout has no stages");
        return Ok(());
    }

    let deadline = Deadline::start(config.timeout);
    let expected = rollout.stages.len();
    let mut cursor = 0usize;

    loop {
        let current = deadline.bound(api.get_rollout(&rollout.name)).await?;
        if current.stages.len() != expected {
            return Err(ClientError::StageCountChanged {
                rollout: rollout.name.clone(),
                expected,
                got: current.stages.len(),
            });
        }
        let stage = &current.stages[cursor];

        match evaluate(stage) {
            StageState::Done => {
                tracing::info!(stage = %stage_label(stage), "stage done");
                cursor += 1;
                if cursor >= expected {
                    break;
                }
                continue;
            }
            StageState::Failed { tasks } => {
                return Err(ClientError::TaskFailed {
                    stage: stage_label(stage).to_string(),
                    tasks,
                });
            }
            StageState::InProgress { not_started } => {
                if !not_started.is_empty() {
                    tracing::info!(
                        stage = %stage_label(stage),
                        tasks = not_started.len(),
                        "running tasks"
                    );
                    deadline
                        .bound(api.run_tasks(&stage.name, &not_started, RUN_TASKS_REASON))
                        .await?;
                }
            }
        }

        tokio::time::sleep(deadline.cap(config.interval)?).await;
    }

    tracing::info!(rollout = %rollout.name, "rollout done");
    Ok(())
}

/// Optional overall time limit for one wait.
struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    fn remaining(&self) -> Result<Option<Duration>> {
        let Some(limit) = self.limit else {
            return Ok(None);
        };
        let elapsed = self.started.elapsed();
        if elapsed >= limit {
            return Err(ClientError::Timeout { elapsed });
        }
        Ok(Some(limit - elapsed))
    }

    /// `delay`, shortened to the time left.
    fn cap(&self, delay: Duration) -> Result<Duration> {
        Ok(match self.remaining()? {
            Some(left) => delay.min(left),
            None => delay,
        })
    }

    async fn bound<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        let Some(left) = self.remaining()? else {
            return call.await;
        };
        match tokio::time::timeout(left, call).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout {
                elapsed: self.started.elapsed(),
            }),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Task;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn task(name: &str, status: TaskStatus) -> Task {
        Task {
            name: name.into(),
            title: String::new(),
            status,
        }
    }

    fn stage(name: &str, tasks: Vec<Task>) -> Stage {
        Stage {
            name: name.into(),
            title: format!("{name} title"),
            tasks,
        }
    }

    fn rollout(stages: Vec<Stage>) -> Rollout {
        Rollout {
            name: "projects/hr/rollouts/1".into(),
            plan: "projects/hr/plans/1".into(),
            stages,
        }
    }

    /// Serves scripted rollout snapshots; the last one repeats forever.
    struct FakeApi {
        snapshots: Mutex<VecDeque<Rollout>>,
        last: Mutex<Option<Rollout>>,
        polls: Mutex<usize>,
        runs: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl FakeApi {
        fn new(snapshots: Vec<Rollout>) -> Self {
            Self {
                snapshots: Mutex::new(snapshots.into()),
                last: Mutex::new(None),
                polls: Mutex::new(0),
                runs: Mutex::new(Vec::new()),
            }
        }

        fn polls(&self) -> usize {
            *self.polls.lock().unwrap()
        }

        fn runs(&self) -> Vec<(String, Vec<String>)> {
            self.runs.lock().unwrap().clone()
        }
    }

    impl RolloutApi for FakeApi {
        async fn get_rollout(&self, _name: &str) -> Result<Rollout> {
            *self.polls.lock().unwrap() += 1;
            let next = self.snapshots.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            if let Some(r) = next {
                *last = Some(r);
            }
            Ok(last.clone().expect("fake api has no snapshots"))
        }

        async fn run_tasks(&self, stage: &str, tasks: &[String], reason: &str) -> Result<()> {
            assert_eq!(reason, RUN_TASKS_REASON);
            self.runs
                .lock()
                .unwrap()
                .push((stage.to_string(), tasks.to_vec()));
            Ok(())
        }
    }

    fn fast() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(1),
            timeout: None,
        }
    }

    #[test]
    fn evaluate_all_done() {
        let s = stage("s", vec![task("a", TaskStatus::Done), task("b", TaskStatus::Done)]);
        assert_eq!(evaluate(&s), StageState::Done);
    }

    #[test]
    fn evaluate_failed_wins_over_pending() {
        let s = stage(
            "s",
            vec![
                task("a", TaskStatus::NotStarted),
                task("b", TaskStatus::Failed),
                task("c", TaskStatus::Done),
            ],
        );
        assert_eq!(
            evaluate(&s),
            StageState::Failed {
                tasks: vec!["b".into()]
            }
        );
    }

    #[test]
    fn evaluate_collects_only_not_started() {
        let s = stage(
            "s",
            vec![
                task("a", TaskStatus::NotStarted),
                task("b", TaskStatus::Running),
                task("c", TaskStatus::NotStarted),
            ],
        );
        assert_eq!(
            evaluate(&s),
            StageState::InProgress {
                not_started: vec!["a".into(), "c".into()]
            }
        );
    }

    #[test]
    fn evaluate_skipped_is_not_done() {
        let s = stage("s", vec![task("a", TaskStatus::Done), task("b", TaskStatus::Skipped)]);
        assert_eq!(
            evaluate(&s),
            StageState::InProgress {
                not_started: vec![]
            }
        );
    }

    #[tokio::test]
    async fn zero_stages_returns_without_polling() {
        let api = FakeApi::new(vec![]);
        wait_for_rollout(&api, &rollout(vec![]), &fast()).await.unwrap();
        assert_eq!(api.polls(), 0);
        assert!(api.runs().is_empty());
    }

    #[tokio::test]
    async fn runs_only_not_started_tasks_once() {
        let pending = rollout(vec![stage(
            "stage-1",
            vec![
                task("t1", TaskStatus::NotStarted),
                task("t2", TaskStatus::Running),
                task("t3", TaskStatus::NotStarted),
            ],
        )]);
        let done = rollout(vec![stage(
            "stage-1",
            vec![
                task("t1", TaskStatus::Done),
                task("t2", TaskStatus::Done),
                task("t3", TaskStatus::Done),
            ],
        )]);
        let api = FakeApi::new(vec![pending.clone(), done]);

        wait_for_rollout(&api, &pending, &fast()).await.unwrap();
        assert_eq!(
            api.runs(),
            vec![("stage-1".to_string(), vec!["t1".to_string(), "t3".to_string()])]
        );
        assert_eq!(api.polls(), 2);
    }

    #[tokio::test]
    async fn running_tasks_are_waited_on_without_rerun() {
        let running = rollout(vec![stage("s", vec![task("t1", TaskStatus::Running)])]);
        let done = rollout(vec![stage("s", vec![task("t1", TaskStatus::Done)])]);
        let api = FakeApi::new(vec![running.clone(), running.clone(), done]);

        wait_for_rollout(&api, &running, &fast()).await.unwrap();
        assert!(api.runs().is_empty());
        assert_eq!(api.polls(), 3);
    }

    #[tokio::test]
    async fn advances_through_stages_in_order() {
        let initial = rollout(vec![
            stage("s1", vec![task("a", TaskStatus::NotStarted)]),
            stage("s2", vec![task("b", TaskStatus::NotStarted)]),
        ]);
        let s1_done = rollout(vec![
            stage("s1", vec![task("a", TaskStatus::Done)]),
            stage("s2", vec![task("b", TaskStatus::NotStarted)]),
        ]);
        let all_done = rollout(vec![
            stage("s1", vec![task("a", TaskStatus::Done)]),
            stage("s2", vec![task("b", TaskStatus::Done)]),
        ]);
        // poll 1: run s1; poll 2: s1 done; poll 3: run s2; poll 4+: done
        let api = FakeApi::new(vec![initial.clone(), s1_done.clone(), s1_done, all_done]);

        wait_for_rollout(&api, &initial, &fast()).await.unwrap();
        let runs = api.runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0], ("s1".to_string(), vec!["a".to_string()]));
        assert_eq!(runs[1], ("s2".to_string(), vec!["b".to_string()]));
    }

    #[tokio::test]
    async fn never_advances_past_unfinished_stage() {
        // s2 is already done, but s1 is not; the cursor must stay on s1.
        let stuck = rollout(vec![
            stage("s1", vec![task("a", TaskStatus::Running)]),
            stage("s2", vec![task("b", TaskStatus::Done)]),
        ]);
        let failed = rollout(vec![
            stage("s1", vec![task("a", TaskStatus::Failed)]),
            stage("s2", vec![task("b", TaskStatus::Done)]),
        ]);
        let api = FakeApi::new(vec![stuck.clone(), stuck.clone(), failed]);

        let err = wait_for_rollout(&api, &stuck, &fast()).await.unwrap_err();
        match err {
            ClientError::TaskFailed { stage, tasks } => {
                assert_eq!(stage, "s1 title");
                assert_eq!(tasks, vec!["a".to_string()]);
            }
            other => panic!("expected TaskFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_failed_task_aborts() {
        let r = rollout(vec![stage(
            "s1",
            vec![
                task("a", TaskStatus::Done),
                task("b", TaskStatus::Failed),
                task("c", TaskStatus::NotStarted),
            ],
        )]);
        let api = FakeApi::new(vec![r.clone()]);

        let err = wait_for_rollout(&api, &r, &fast()).await.unwrap_err();
        assert!(err.to_string().contains("s1 title"));
        assert!(err.to_string().contains('b'));
        assert!(api.runs().is_empty());
        assert_eq!(api.polls(), 1);
    }

    #[tokio::test]
    async fn stage_count_change_is_an_error() {
        let initial = rollout(vec![
            stage("s1", vec![task("a", TaskStatus::NotStarted)]),
            stage("s2", vec![task("b", TaskStatus::NotStarted)]),
        ]);
        let api = FakeApi::new(vec![rollout(vec![])]);

        let err = wait_for_rollout(&api, &initial, &fast()).await.unwrap_err();
        match err {
            ClientError::StageCountChanged { expected, got, .. } => {
                assert_eq!(expected, 2);
                assert_eq!(got, 0);
            }
            other => panic!("expected StageCountChanged, got {other:?}"),
        }
        assert_eq!(api.polls(), 1);
        assert!(api.runs().is_empty());
    }

    /// Never answers a status read.
    struct StalledApi;

    impl RolloutApi for StalledApi {
        async fn get_rollout(&self, _name: &str) -> Result<Rollout> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("status read should have been cut off")
        }

        async fn run_tasks(&self, _stage: &str, _tasks: &[String], _reason: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn deadline_cuts_off_stalled_status_read() {
        let running = rollout(vec![stage("s", vec![task("t1", TaskStatus::Running)])]);
        let config = PollConfig {
            interval: Duration::from_millis(10),
            timeout: Some(Duration::from_millis(50)),
        };

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            wait_for_rollout(&StalledApi, &running, &config),
        )
        .await
        .expect("wait ignored its deadline");
        assert!(matches!(result, Err(ClientError::Timeout { .. })));
    }

    #[tokio::test]
    async fn deadline_converts_to_timeout() {
        let running = rollout(vec![stage("s", vec![task("t1", TaskStatus::Running)])]);
        let api = FakeApi::new(vec![running.clone()]);
        let config = PollConfig {
            interval: Duration::from_millis(5),
            timeout: Some(Duration::from_millis(30)),
        };

        let err = wait_for_rollout(&api, &running, &config).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout { .. }));
        assert!(api.polls() >= 2);
    }
}
