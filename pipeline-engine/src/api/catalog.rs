use actix_web::web::{Data, Query};
use common::api::{ApiResponse, QueryApiFormat};

use crate::catalog::CatalogService;
use crate::data::action::Action;
use crate::data::workflow_operation::WorkflowOperation;
use crate::principal::Principal;

/// `GET /api/operations`: workflow operations visible to the caller.
pub async fn operations<C>(
    principal: Principal,
    service: Data<C>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<Vec<WorkflowOperation>>
where
    C: CatalogService,
{
    let format = query.into_inner().f;
    match service.list_operations(&principal).await {
        Ok(operations) => ApiResponse::success(operations, format),
        Err(error) => error.into_response(format),
    }
}

/// `GET /api/actions`: actions visible to the caller.
pub async fn actions<C>(
    principal: Principal,
    service: Data<C>,
    query: Query<QueryApiFormat>,
) -> ApiResponse<Vec<Action>>
where
    C: CatalogService,
{
    let format = query.into_inner().f;
    match service.list_actions(&principal).await {
        Ok(actions) => ApiResponse::success(actions, format),
        Err(error) => error.into_response(format),
    }
}
