mod catalog;
mod engine;
mod principal_extractor;
mod runs;
mod sockets;
mod source_table;

use std::net::ToSocketAddrs;

use actix_web::web::{delete, get, patch, post, Data};
use actix_web::{App, HttpServer};
use common::error::EmResult;

use crate::catalog::CatalogService;
use crate::engine::TaskExecutionEngine;
use crate::notifier::PubSubNotifier;
use crate::runs::PipelineRunsService;
use crate::source_table::SourceTableService;
use crate::task_registry::TaskRegistry;

/// Assemble and run the HTTP + WebSocket surface, generic over each collaborating service trait
/// rather than a fixed concrete stack. Each service is registered once as `web::Data` and shared
/// across every worker thread actix spins up.
#[allow(clippy::too_many_arguments)]
pub async fn spawn_api_server<A, C, E, N, R, S>(
    catalog_service: C,
    engine_service: E,
    notifier: N,
    notify_channel: String,
    runs_service: R,
    source_table_service: S,
    registry: TaskRegistry,
    address: A,
) -> EmResult<()>
where
    A: ToSocketAddrs,
    C: CatalogService + Send + Sync + 'static,
    E: TaskExecutionEngine + Send + Sync + 'static,
    N: PubSubNotifier + Clone + Send + Sync + 'static,
    R: PipelineRunsService + Send + Sync + 'static,
    S: SourceTableService + Send + Sync + 'static,
{
    let catalog_data = Data::new(catalog_service);
    let engine_data = Data::new(engine_service);
    let notifier_data = Data::new(notifier);
    let notify_channel_data = Data::new(notify_channel);
    let runs_data = Data::new(runs_service);
    let source_table_data = Data::new(source_table_service);
    let registry_data = Data::new(registry);

    HttpServer::new(move || {
        App::new()
            .app_data(notifier_data.clone())
            .app_data(notify_channel_data.clone())
            .route(
                "/sockets/pipeline-run-tasks/{run_id}",
                get().to(sockets::pipeline_run_tasks::<N>),
            )
            .service(
                actix_web::web::scope("/api")
                .app_data(catalog_data.clone())
                .app_data(engine_data.clone())
                .app_data(runs_data.clone())
                .app_data(source_table_data.clone())
                .app_data(registry_data.clone())
                .route("/operations", get().to(catalog::operations::<C>))
                .route("/actions", get().to(catalog::actions::<C>))
                .route("/pipeline-runs/{code}", get().to(runs::pipeline_runs::<R>))
                .route("/pipeline-runs/{run_id}/pickup", post().to(runs::pickup::<R>))
                .route(
                    "/pipeline-run-tasks/{run_id}",
                    get().to(engine::ordered_tasks::<E>),
                )
                .route(
                    "/pipeline-run-tasks/{run_id}/{pr_task_id}",
                    get().to(engine::task::<E>),
                )
                .route(
                    "/task-status/{pr_task_id}",
                    get().to(engine::task_status::<E>),
                )
                .route(
                    "/run-task/{run_id}/{pr_task_id}",
                    post().to(engine::run_task::<E>),
                )
                .route(
                    "/run-all/{run_id}/{pr_task_id}",
                    post().to(engine::run_all::<E>),
                )
                .route(
                    "/reset-task/{run_id}/{pr_task_id}",
                    post().to(engine::reset_task::<E>),
                )
                .route(
                    "/source-tables/{run_id}",
                    get().to(source_table::list::<S>),
                )
                .route("/source-tables", post().to(source_table::create::<S>))
                .route("/source-tables", patch().to(source_table::update::<S>))
                .route("/source-tables", delete().to(source_table::delete::<S>)),
        )
    })
    .bind(address)?
    .run()
    .await?;
    Ok(())
}
