use actix_web::web::{Data, Path, Query};
use common::api::{ApiResponse, QueryApiFormat};
use serde::{Deserialize, Serialize};

use crate::data::pipeline_run::PipelineRunId;
use crate::data::pipeline_run_task::{PipelineRunTask, PrTaskId, TaskStatus};
use crate::engine::{RunOutcome, TaskExecutionEngine};
use crate::principal::Principal;

/// `GET /api/pipeline-run-tasks/{run_id}`: the full task list for a run, in execution order.
pub async fn ordered_tasks<E>(
    run_id: Path<PipelineRunId>,
    service: Data<E>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<Vec<PipelineRunTask>>
where
    E: TaskExecutionEngine,
{
    let format = query.into_inner().f;
    match service.get_ordered_tasks(run_id.into_inner()).await {
        Ok(tasks) => ApiResponse::success(tasks, format),
        Err(error) => error.into_response(format),
    }
}

/// `GET /api/pipeline-run-tasks/{run_id}/{pr_task_id}`: a single task record, authorized against
/// the run's current stage slot.
pub async fn task<E>(
    principal: Principal,
    path: Path<(PipelineRunId, PrTaskId)>,
    service: Data<E>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<PipelineRunTask>
where
    E: TaskExecutionEngine,
{
    let format = query.into_inner().f;
    let (run_id, pr_task_id) = path.into_inner();
    match service.get_record_for_run(&principal, run_id, pr_task_id).await {
        Ok(task) => ApiResponse::success(task, format),
        Err(error) => error.into_response(format),
    }
}

/// `GET /api/task-status/{pr_task_id}`: a single-row status read, used for client-side polling
/// fallback alongside the WebSocket push channel.
pub async fn task_status<E>(
    pr_task_id: Path<PrTaskId>,
    service: Data<E>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<TaskStatus>
where
    E: TaskExecutionEngine,
{
    let format = query.into_inner().f;
    match service.get_status(pr_task_id.into_inner()).await {
        Ok(status) => ApiResponse::success(status, format),
        Err(error) => error.into_response(format),
    }
}

/// Wire shape for [`RunOutcome`]: a completed User task reports its outcome immediately; a
/// scheduled System task reports the `"Scheduled {pr_task_id}"` message (§6/§8 scenarios 1-2),
/// its actual result arriving later over the WebSocket/poll path.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum RunTaskResponse {
    Completed { success: bool, message: Option<String> },
    Scheduled { message: String },
}

impl From<RunOutcome> for RunTaskResponse {
    fn from(value: RunOutcome) -> Self {
        match value {
            RunOutcome::Completed { success, message } => Self::Completed { success, message },
            RunOutcome::Scheduled { message } => Self::Scheduled { message },
        }
    }
}

/// `POST /api/run-task/{run_id}/{pr_task_id}`: run-one semantics.
pub async fn run_task<E>(
    principal: Principal,
    path: Path<(PipelineRunId, PrTaskId)>,
    service: Data<E>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<RunTaskResponse>
where
    E: TaskExecutionEngine,
{
    run(principal, path, service, query, false).await
}

/// `POST /api/run-all/{run_id}/{pr_task_id}`: run-all semantics, chaining through subsequent
/// System tasks until a User task or the end of the run is reached.
pub async fn run_all<E>(
    principal: Principal,
    path: Path<(PipelineRunId, PrTaskId)>,
    service: Data<E>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<RunTaskResponse>
where
    E: TaskExecutionEngine,
{
    run(principal, path, service, query, true).await
}

async fn run<E>(
    principal: Principal,
    path: Path<(PipelineRunId, PrTaskId)>,
    service: Data<E>,
    query: Query<QueryApiFormat>,
    run_next: bool,
) -> ApiResponse<RunTaskResponse>
where
    E: TaskExecutionEngine,
{
    let format = query.into_inner().f;
    let (run_id, pr_task_id) = path.into_inner();
    match service.run_task(&principal, run_id, pr_task_id, run_next).await {
        Ok(outcome) => ApiResponse::success(outcome.into(), format),
        Err(error) => error.into_response(format),
    }
}

/// `POST /api/reset-task/{run_id}/{pr_task_id}`: reset a task (and any children spawned by a
/// previous run) back to `Waiting`.
pub async fn reset_task<E>(
    principal: Principal,
    path: Path<(PipelineRunId, PrTaskId)>,
    service: Data<E>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<PipelineRunTask>
where
    E: TaskExecutionEngine,
{
    let format = query.into_inner().f;
    let (run_id, pr_task_id) = path.into_inner();
    match service.reset_task(&principal, run_id, pr_task_id).await {
        Ok(task) => ApiResponse::success(task, format),
        Err(error) => error.into_response(format),
    }
}
