use actix_web::web::{Data, Path, Query};
use common::api::{ApiResponse, QueryApiFormat};

use crate::data::pipeline_run::{PipelineRun, PipelineRunId};
use crate::principal::Principal;
use crate::runs::PipelineRunsService;

/// `GET /api/pipeline-runs/{code}`: runs sitting at workflow stage `code` that the caller owns
/// (every matching run, for an admin). See spec.md §6.
pub async fn pipeline_runs<R>(
    principal: Principal,
    code: Path<String>,
    service: Data<R>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<Vec<PipelineRun>>
where
    R: PipelineRunsService,
{
    let format = query.into_inner().f;
    match service.list_for_stage(&principal, &code.into_inner()).await {
        Ok(runs) => ApiResponse::success(runs, format),
        Err(error) => error.into_response(format),
    }
}

/// `POST /api/pipeline-runs/{runId}/pickup`: the caller claims the run's current stage slot.
/// Not part of spec.md §6's route table (that table enumerates the task-execution and
/// source-table surface only) but required by the "pickup" operation named in spec.md §3/
/// glossary, which needs some way in over HTTP.
pub async fn pickup<R>(
    principal: Principal,
    run_id: Path<PipelineRunId>,
    service: Data<R>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<PipelineRun>
where
    R: PipelineRunsService,
{
    let format = query.into_inner().f;
    match service.pickup(&principal, run_id.into_inner()).await {
        Ok(run) => ApiResponse::success(run, format),
        Err(error) => error.into_response(format),
    }
}
