pub mod analyze;
pub mod load;

use sqlx::PgPool;

use crate::data::pipeline_run_task::{PipelineRunTask, TaskId};
use crate::task_registry::TaskRegistry;

/// `task_id` for the statically declared "analyze every `analyze`-flagged source table in this
/// run" System task.
pub const ANALYZE_SOURCE_TABLES: TaskId = TaskId(1);

/// `task_id` for the statically declared "load every `load`-flagged, already-analyzed source
/// table in this run" System task.
pub const LOAD_SOURCE_TABLES: TaskId = TaskId(2);

/// The fixed set of System tasks this deployment knows how to run, seeded once at process
/// start-up. Per spec.md §1's "tasks are statically declared, not user-defined graphs": there is
/// no mechanism for registering a task at runtime, only at compile time via calls like this one.
pub fn default_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register_system(ANALYZE_SOURCE_TABLES, |pool: PgPool, task: PipelineRunTask| {
        Box::pin(async move { analyze::run(&pool, task.run_id).await })
    });
    registry.register_system(LOAD_SOURCE_TABLES, |pool: PgPool, task: PipelineRunTask| {
        Box::pin(async move { load::run(&pool, task.run_id).await })
    });
    registry
}
