pub mod postgres;
pub mod worker;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::data::pipeline_run_task::SystemJobPayload;
use crate::error::Result;

/// Wrapper for a `job_id` value.
#[derive(sqlx::Type, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize, Debug)]
#[sqlx(transparent)]
pub struct JobId(pub i64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A durable job envelope as read back off the queue by a worker.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct JobRecord {
    pub job_id: JobId,
    pub payload: serde_json::Value,
    pub scheduled_at: NaiveDateTime,
    pub attempt_count: i32,
    pub lease_holder: Option<uuid::Uuid>,
    pub lease_expires: Option<NaiveDateTime>,
}

impl JobRecord {
    pub fn decode_payload(&self) -> Result<SystemJobPayload> {
        let payload = serde_json::from_value(self.payload.clone())
            .map_err(common::error::EmError::from)?;
        Ok(payload)
    }
}

/// The durable FIFO contract: one job type (`SystemJob`), at-most-one concurrent claim per row,
/// lease-based ownership that survives a worker restart. See §4.3.
pub trait JobQueue
where
    Self: Send + Sync,
{
    /// Persist a new `SystemJob` envelope for `payload`.
    async fn enqueue(&self, payload: &SystemJobPayload) -> Result<JobId>;

    /// Transactionally claim the next ready job, taking a lease of `lease` duration for
    /// `lease_holder`. Returns `None` if no job is ready.
    async fn claim_next(
        &self,
        lease_holder: uuid::Uuid,
        lease: std::time::Duration,
    ) -> Result<Option<JobRecord>>;

    /// Refresh the lease on a job this worker still holds.
    async fn heartbeat(&self, job_id: JobId, lease_holder: uuid::Uuid, lease: std::time::Duration) -> Result<()>;

    /// Remove a completed job from the queue.
    async fn delete(&self, job_id: JobId) -> Result<()>;

    /// Sweep any task row left `task_running = true` with no live lease back to `Failed` with
    /// message `"abandoned"`. Run once at worker start-up.
    async fn reap_abandoned(&self) -> Result<u64>;
}
