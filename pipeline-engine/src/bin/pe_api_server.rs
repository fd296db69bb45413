use common::database::postgres::Postgres;
use common::database::Database;
use log::error;
use pipeline_engine::api::spawn_api_server;
use pipeline_engine::catalog::postgres::PgCatalogService;
use pipeline_engine::config::Config;
use pipeline_engine::engine::postgres::PgTaskExecutionEngine;
use pipeline_engine::job_queue::postgres::PgJobQueue;
use pipeline_engine::notifier::postgres::PgNotifier;
use pipeline_engine::runs::postgres::PgPipelineRunsService;
use pipeline_engine::source_table::postgres::PgSourceTableService;
use pipeline_engine::tasks::default_registry;

/// Request-handling binary: assembles every Postgresql-backed service and runs the HTTP +
/// WebSocket surface (`/api/*` plus `/sockets/*`). Authentication/session population (the
/// `Principal` request extension [`pipeline_engine::api::principal_extractor`] reads) is expected
/// to be wired in front of this by an external auth collaborator.
#[tokio::main]
async fn main() {
    pipeline_engine::logging::init("pipeline-engine/pe_api_server.log");

    let config = match Config::from_env() {
        Ok(inner) => inner,
        Err(error) => {
            error!("Could not load configuration. {error}");
            return;
        }
    };

    let pool = match Postgres::create_pool(
        config.connect_options(),
        config.db_max_connections,
        config.db_min_connections,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => {
            error!("Could not create database connection pool. {error}");
            return;
        }
    };

    let registry = default_registry();
    let job_queue = PgJobQueue::new(pool.clone());
    let engine = PgTaskExecutionEngine::new(pool.clone(), registry.clone(), job_queue);
    let catalog = PgCatalogService::new(pool.clone());
    let notifier = PgNotifier::new(pool.clone());
    let runs = PgPipelineRunsService::new(pool.clone());
    let source_tables = PgSourceTableService::new(pool.clone());

    let address = format!("0.0.0.0:{}", config.http_port);
    if let Err(error) = spawn_api_server(
        catalog,
        engine,
        notifier,
        config.channel_name().to_owned(),
        runs,
        source_tables,
        registry,
        address,
    )
    .await
    {
        error!("API server exited with error: {error}");
    }
}
