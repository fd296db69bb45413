pub mod postgres;

use crate::data::pipeline_run_task::{PipelineRunTask, PrTaskId, TaskStatus};
use crate::data::pipeline_run::PipelineRunId;
use crate::error::Result;
use crate::principal::Principal;

/// Outcome of [`TaskExecutionEngine::run_task`]: a User task runs synchronously and its result is
/// known immediately; a System task is only scheduled, its result arriving later via the job
/// queue/pub-sub path.
#[derive(Debug)]
pub enum RunOutcome {
    /// The task ran inline; `message` is its completion message, if any.
    Completed { success: bool, message: Option<String> },
    /// The task was a System task and has been transitioned to `Scheduled` and enqueued.
    /// `message` is `"Scheduled {pr_task_id}"` (§6/§8 scenarios 1-2).
    Scheduled { message: String },
}

/// The task execution engine: the component that enforces ordering, persists state transitions,
/// and supports "run one" vs. "run all" semantics over [`PipelineRunTask`] rows. See §4.1.
pub trait TaskExecutionEngine
where
    Self: Send + Sync,
{
    /// Return the task list for a run in execution order. Read-only.
    async fn get_ordered_tasks(&self, run_id: PipelineRunId) -> Result<Vec<PipelineRunTask>>;

    /// Authorize `principal` against the run's current stage slot (or admin), then return the
    /// task record. Fails with [`crate::error::Error::Unauthorized`] or
    /// [`crate::error::Error::NotFound`].
    async fn get_record_for_run(
        &self,
        principal: &Principal,
        run_id: PipelineRunId,
        pr_task_id: PrTaskId,
    ) -> Result<PipelineRunTask>;

    /// Validate that no task in the run is currently `Scheduled`/`Running` and that the target
    /// task is `Waiting`, then either run a User task inline or schedule a System task job.
    async fn run_task(
        &self,
        principal: &Principal,
        run_id: PipelineRunId,
        pr_task_id: PrTaskId,
        run_next: bool,
    ) -> Result<RunOutcome>;

    /// Authorize, then reset the target task and any child tasks rooted at it back to `Waiting`,
    /// clearing timestamps/message and deleting child tasks spawned by previous runs.
    async fn reset_task(
        &self,
        principal: &Principal,
        run_id: PipelineRunId,
        pr_task_id: PrTaskId,
    ) -> Result<PipelineRunTask>;

    /// Single-row status read.
    async fn get_status(&self, pr_task_id: PrTaskId) -> Result<TaskStatus>;

    /// Write a status transition. Called only from inside the engine or the worker; rejects any
    /// transition not present in the state machine.
    async fn set_status(
        &self,
        pr_task_id: PrTaskId,
        status: TaskStatus,
        message: Option<String>,
    ) -> Result<()>;
}
