use actix_web::web::{Data, Json, Path, Query};
use common::api::{ApiResponse, QueryApiFormat};
use serde::{Deserialize, Serialize};

use crate::data::pipeline_run::PipelineRunId;
use crate::data::source_table::{SourceTable, StOid};
use crate::principal::Principal;
use crate::source_table::{FormData, SourceTableService};

/// `GET /api/source-tables/{run_id}`: the source tables declared against a run.
pub async fn list<S>(
    principal: Principal,
    run_id: Path<PipelineRunId>,
    service: Data<S>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<Vec<SourceTable>>
where
    S: SourceTableService,
{
    let format = query.into_inner().f;
    match service.list(&principal, run_id.into_inner()).await {
        Ok(tables) => ApiResponse::success(tables, format),
        Err(error) => error.into_response(format),
    }
}

/// Wire shape for the `(st_oid, rows_affected)` pair every mutating source-table operation
/// returns.
#[derive(Serialize, Deserialize, Debug)]
pub struct SourceTableWriteResult {
    pub st_oid: StOid,
    pub rows_affected: u64,
}

impl From<(StOid, u64)> for SourceTableWriteResult {
    fn from((st_oid, rows_affected): (StOid, u64)) -> Self {
        Self { st_oid, rows_affected }
    }
}

/// `POST /api/source-tables`: declare a new source table against a run.
pub async fn create<S>(
    principal: Principal,
    form: Json<FormData>,
    service: Data<S>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<SourceTableWriteResult>
where
    S: SourceTableService,
{
    let format = query.into_inner().f;
    match service.create(&principal, &form.into_inner()).await {
        Ok(result) => ApiResponse::success(result.into(), format),
        Err(error) => error.into_response(format),
    }
}

/// `PATCH /api/source-tables`: update an existing source table's fields.
pub async fn update<S>(
    principal: Principal,
    form: Json<FormData>,
    service: Data<S>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<SourceTableWriteResult>
where
    S: SourceTableService,
{
    let format = query.into_inner().f;
    match service.update(&principal, &form.into_inner()).await {
        Ok(result) => ApiResponse::success(result.into(), format),
        Err(error) => error.into_response(format),
    }
}

/// `DELETE /api/source-tables`: remove a source table declaration.
pub async fn delete<S>(
    principal: Principal,
    form: Json<FormData>,
    service: Data<S>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<SourceTableWriteResult>
where
    S: SourceTableService,
{
    let format = query.into_inner().f;
    match service.delete(&principal, &form.into_inner()).await {
        Ok(result) => ApiResponse::success(result.into(), format),
        Err(error) => error.into_response(format),
    }
}
