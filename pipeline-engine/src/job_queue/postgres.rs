use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::pipeline_run_task::SystemJobPayload;
use crate::error::Result;
use crate::job_queue::{JobId, JobQueue, JobRecord};

/// Postgresql implementation of the [`JobQueue`]. The table backing this is a plain
/// `pipeline.job` row store; claiming is a `SELECT ... FOR UPDATE SKIP LOCKED` inside a
/// transaction, so concurrent workers never claim the same row twice.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl JobQueue for PgJobQueue {
    async fn enqueue(&self, payload: &SystemJobPayload) -> Result<JobId> {
        let payload_json = serde_json::to_value(payload).map_err(common::error::EmError::from)?;
        let job_id = sqlx::query_scalar(
            r#"
            insert into pipeline.job(payload, scheduled_at, attempt_count)
            values ($1, now(), 0)
            returning job_id"#,
        )
        .bind(payload_json)
        .fetch_one(&self.pool)
        .await?;
        Ok(job_id)
    }

    async fn claim_next(
        &self,
        lease_holder: Uuid,
        lease: Duration,
    ) -> Result<Option<JobRecord>> {
        let mut transaction = self.pool.begin().await?;
        let candidate: Option<JobRecord> = sqlx::query_as(
            r#"
            select job_id, payload, scheduled_at, attempt_count, lease_holder, lease_expires
            from pipeline.job
            where scheduled_at <= now()
              and (lease_expires is null or lease_expires <= now())
            order by scheduled_at
            for update skip locked
            limit 1"#,
        )
        .fetch_optional(&mut *transaction)
        .await?;

        let Some(job) = candidate else {
            transaction.commit().await?;
            return Ok(None);
        };

        let lease_seconds = lease.as_secs() as i64;
        sqlx::query(
            r#"
            update pipeline.job
            set lease_holder = $2, lease_expires = now() + ($3 || ' seconds')::interval,
                attempt_count = attempt_count + 1
            where job_id = $1"#,
        )
        .bind(job.job_id)
        .bind(lease_holder)
        .bind(lease_seconds)
        .execute(&mut *transaction)
        .await?;
        transaction.commit().await?;

        Ok(Some(JobRecord {
            lease_holder: Some(lease_holder),
            lease_expires: Some(Utc::now().naive_utc() + chrono::Duration::seconds(lease_seconds)),
            ..job
        }))
    }

    async fn heartbeat(&self, job_id: JobId, lease_holder: Uuid, lease: Duration) -> Result<()> {
        let lease_seconds = lease.as_secs() as i64;
        sqlx::query(
            r#"
            update pipeline.job
            set lease_expires = now() + ($3 || ' seconds')::interval
            where job_id = $1 and lease_holder = $2"#,
        )
        .bind(job_id)
        .bind(lease_holder)
        .bind(lease_seconds)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, job_id: JobId) -> Result<()> {
        sqlx::query("delete from pipeline.job where job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reap_abandoned(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            update pipeline.pipeline_run_task
            set
                task_status = 'Failed', task_running = false, task_completed = now(),
                task_message = 'abandoned'
            where
                task_running = true
                and pr_task_id not in (
                    select (payload->>'pr_task_id')::bigint
                    from pipeline.job
                    where lease_expires is not null and lease_expires > now()
                )"#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
