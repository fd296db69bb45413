use common::database::postgres::Postgres;
use common::database::Database;
use log::{error, info, warn};
use pipeline_engine::config::Config;
use pipeline_engine::job_queue::postgres::PgJobQueue;
use pipeline_engine::job_queue::worker::spawn_workers;
use pipeline_engine::job_queue::JobQueue;
use pipeline_engine::tasks::default_registry;

/// Worker-pool binary: reaps any task left `task_running = true` by a crashed prior instance,
/// then runs `PE_WORKER_COUNT` workers against the shared job queue until the process is killed.
#[tokio::main]
async fn main() {
    pipeline_engine::logging::init("pipeline-engine/pe_job_worker.log");

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

    let job_queue = PgJobQueue::new(pool.clone());
    match job_queue.reap_abandoned().await {
        Ok(0) => info!("No abandoned tasks found at startup"),
        Ok(count) => warn!("Reaped {count} abandoned task(s) to Failed at startup"),
        Err(error) => error!("Could not sweep abandoned tasks at startup: {error}"),
    }

    let registry = default_registry();
    let handles = spawn_workers(
        config.worker_count,
        pool,
        registry,
        job_queue,
        config.job_lease(),
    );

    for handle in handles {
        let _ = handle.await;
    }
}
