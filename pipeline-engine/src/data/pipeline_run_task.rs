use std::str::FromStr;

use chrono::NaiveDateTime;
use common::error::EmError;
use serde::{Deserialize, Serialize};

use crate::data::pipeline_run::PipelineRunId;

/// Wrapper for a `task_id` value identifying an entry in the static [`crate::task_registry`]
/// catalog. Kept distinct from [`PrTaskId`] (an instance within a run) so a catalog id can never
/// be passed where a run-scoped task id is expected.
#[derive(sqlx::Type, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize, Debug)]
#[sqlx(transparent)]
pub struct TaskId(pub i64);

impl FromStr for TaskId {
    type Err = EmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()?.into())
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrapper for a `pr_task_id` value, the identity of one task instance within a [`PipelineRun`].
#[derive(sqlx::Type, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize, Debug)]
#[sqlx(transparent)]
pub struct PrTaskId(pub i64);

impl FromStr for PrTaskId {
    type Err = EmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()?.into())
    }
}

impl From<i64> for PrTaskId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for PrTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a [`PipelineRunTask`] per the state machine in §4.1: `Waiting -> Scheduled ->
/// Running -> {Complete, Failed}`, with `Complete`/`Failed -> Waiting` via reset. No other
/// transition is valid.
#[derive(sqlx::Type, Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    Waiting,
    Scheduled,
    Running,
    Complete,
    Failed,
}

impl TaskStatus {
    /// Whether `self -> next` is one of the arcs allowed by the state machine.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::{Complete, Failed, Running, Scheduled, Waiting};
        matches!(
            (self, next),
            (Waiting, Scheduled)
                | (Scheduled, Running)
                | (Running, Complete)
                | (Running, Failed)
                | (Complete, Waiting)
                | (Failed, Waiting)
        )
    }
}

/// One task instance within a [`PipelineRun`], as stored in the `pipeline_run_task` table.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct PipelineRunTask {
    pub pr_task_id: PrTaskId,
    pub run_id: PipelineRunId,
    pub task_id: TaskId,
    pub task_order: i32,
    pub task_running: bool,
    pub task_complete: bool,
    pub task_start: Option<NaiveDateTime>,
    pub task_completed: Option<NaiveDateTime>,
    pub task_status: TaskStatus,
    pub task_message: Option<String>,
    pub parent_pr_task_id: Option<PrTaskId>,
}

impl PipelineRunTask {
    /// §3 invariant (iii): `task_start` is non-null iff status has reached `Running` or beyond.
    pub fn started(&self) -> bool {
        matches!(
            self.task_status,
            TaskStatus::Running | TaskStatus::Complete | TaskStatus::Failed
        )
    }

    /// §3 invariant (iv): `task_completed` is non-null iff status is terminal.
    pub fn finished(&self) -> bool {
        matches!(self.task_status, TaskStatus::Complete | TaskStatus::Failed)
    }
}

/// Payload carried by a [`crate::job_queue::SystemJob`], the shape `runTask` hands the queue when
/// the target task is a System task.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SystemJobPayload {
    pub pr_task_id: PrTaskId,
    pub run_id: PipelineRunId,
    pub task_id: TaskId,
    pub run_next: bool,
}

#[cfg(test)]
mod test {
    use super::TaskStatus::{self, Complete, Failed, Running, Scheduled, Waiting};

    const ALL: [TaskStatus; 5] = [Waiting, Scheduled, Running, Complete, Failed];

    const ALLOWED: [(TaskStatus, TaskStatus); 6] = [
        (Waiting, Scheduled),
        (Scheduled, Running),
        (Running, Complete),
        (Running, Failed),
        (Complete, Waiting),
        (Failed, Waiting),
    ];

    #[test]
    fn can_transition_to_allows_exactly_the_state_machine_arcs() {
        for &from in &ALL {
            for &to in &ALL {
                let allowed = ALLOWED.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    allowed,
                    "transition {from:?} -> {to:?} should be {allowed}"
                );
            }
        }
    }

    #[test]
    fn no_status_transitions_to_itself() {
        for &status in &ALL {
            assert!(!status.can_transition_to(status));
        }
    }
}
