use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use sqlx::PgPool;

use crate::data::pipeline_run_task::{PipelineRunTask, TaskId};
use crate::error::Result;
use crate::principal::Principal;

/// A System task's run function: takes a pool (it opens its own transaction) and the task
/// instance, returns an optional completion message on success. Boxed so the catalog can hold a
/// heterogeneous collection of task implementations behind one type, per the "avoid class
/// hierarchies; closures over the catalog entry are sufficient" redesign note.
pub type SystemTaskFn =
    Arc<dyn Fn(PgPool, PipelineRunTask) -> BoxFuture<'static, Result<Option<String>>> + Send + Sync>;

/// A User task's run function: executed synchronously inside the request handler that receives
/// `runTask`, given the pool, the authorized caller, and the task instance.
pub type UserTaskFn = Arc<
    dyn Fn(PgPool, Principal, PipelineRunTask) -> BoxFuture<'static, Result<Option<String>>>
        + Send
        + Sync,
>;

/// One entry in the task catalog: either a System task (dispatched to the worker pool) or a User
/// task (run inline by the request handler).
#[derive(Clone)]
pub enum TaskCatalogEntry {
    System(SystemTaskFn),
    User(UserTaskFn),
}

impl TaskCatalogEntry {
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }
}

/// The compile-time catalog mapping a `task_id` to its implementation. Populated once at process
/// start (see `pipeline_engine::task_registry::default_registry` for the seed set); not mutated
/// at runtime.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    entries: HashMap<TaskId, TaskCatalogEntry>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_system<F>(&mut self, task_id: TaskId, run: F)
    where
        F: Fn(PgPool, PipelineRunTask) -> BoxFuture<'static, Result<Option<String>>>
            + Send
            + Sync
            + 'static,
    {
        self.entries
            .insert(task_id, TaskCatalogEntry::System(Arc::new(run)));
    }

    pub fn register_user<F>(&mut self, task_id: TaskId, run: F)
    where
        F: Fn(PgPool, Principal, PipelineRunTask) -> BoxFuture<'static, Result<Option<String>>>
            + Send
            + Sync
            + 'static,
    {
        self.entries
            .insert(task_id, TaskCatalogEntry::User(Arc::new(run)));
    }

    pub fn get(&self, task_id: TaskId) -> Option<&TaskCatalogEntry> {
        self.entries.get(&task_id)
    }
}

#[cfg(test)]
mod test {
    use super::TaskRegistry;
    use crate::data::pipeline_run_task::TaskId;

    #[test]
    fn get_returns_none_for_unregistered_task() {
        let registry = TaskRegistry::new();
        assert!(registry.get(TaskId(1)).is_none());
    }

    #[test]
    fn register_system_is_retrievable_and_tagged_system() {
        let mut registry = TaskRegistry::new();
        registry.register_system(TaskId(1), |_pool, _task| Box::pin(async { Ok(None) }));
        let entry = registry.get(TaskId(1)).expect("registered");
        assert!(entry.is_system());
    }

    #[test]
    fn register_user_is_retrievable_and_tagged_user() {
        let mut registry = TaskRegistry::new();
        registry.register_user(TaskId(2), |_pool, _principal, _task| {
            Box::pin(async { Ok(None) })
        });
        let entry = registry.get(TaskId(2)).expect("registered");
        assert!(!entry.is_system());
    }
}
