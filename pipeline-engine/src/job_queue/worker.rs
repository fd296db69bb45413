use std::time::Duration;

use log::{error, info, warn};
use sqlx::PgPool;
use tokio::time::sleep as tokio_sleep;
use uuid::Uuid;

use crate::data::pipeline_run_task::{PrTaskId, TaskStatus};
use crate::error::Error;
use crate::job_queue::{JobId, JobQueue, JobRecord};
use crate::task_registry::{TaskCatalogEntry, TaskRegistry};

/// One worker in the fixed-size pool, running jobs from the durable queue in parallel across
/// runs, serialized only per task row via the row lock [`crate::job_queue::postgres::PgJobQueue`]
/// takes in [`JobQueue::claim_next`]. Each worker polls the shared queue independently rather than
/// owning a single run outright.
pub struct Worker<Q>
where
    Q: JobQueue + Clone,
{
    id: Uuid,
    pool: PgPool,
    registry: TaskRegistry,
    job_queue: Q,
    lease: Duration,
    poll_interval: Duration,
}

impl<Q> Worker<Q>
where
    Q: JobQueue + Clone,
{
    pub fn new(pool: PgPool, registry: TaskRegistry, job_queue: Q, lease: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            pool,
            registry,
            job_queue,
            lease,
            poll_interval: Duration::from_millis(500),
        }
    }

    /// Run forever: claim a job, execute it, enqueue a successor if `run_next`, repeat. Exits only
    /// on an infrastructure error from the queue itself; the job's own failure becomes `Failed`
    /// and the loop continues.
    pub async fn run(mut self) -> crate::error::Result<()> {
        info!("Worker {} starting", self.id);
        loop {
            let claimed = self.job_queue.claim_next(self.id, self.lease).await?;
            let Some(job) = claimed else {
                tokio_sleep(self.poll_interval).await;
                continue;
            };
            if let Err(error) = self.run_job(&job).await {
                error!("Worker {} failed to process job {}: {error}", self.id, job.job_id);
            }
        }
    }

    async fn run_job(&mut self, job: &JobRecord) -> crate::error::Result<()> {
        let payload = job.decode_payload()?;
        let Some(entry) = self.registry.get(payload.task_id) else {
            return Err(Error::BadRequest(format!(
                "No catalog entry for task_id {}",
                payload.task_id
            )));
        };
        let TaskCatalogEntry::System(run_fn) = entry else {
            return Err(Error::BadRequest(format!(
                "Task {} is a User task; cannot be run by the worker pool",
                payload.task_id
            )));
        };

        if !self.transition_running(payload.pr_task_id).await? {
            warn!(
                "Worker {} could not claim task {} into Running (no longer Scheduled); \
                 abandoning job {} for requeue",
                self.id, payload.pr_task_id, job.job_id
            );
            return Ok(());
        }

        let task = self.fetch_task(payload.pr_task_id).await?;
        let heartbeat_handle = self.spawn_lease_heartbeat(job.job_id);
        let outcome = run_fn(self.pool.clone(), task).await;
        heartbeat_handle.abort();

        match outcome {
            Ok(message) => {
                self.transition_terminal(payload.pr_task_id, TaskStatus::Complete, message)
                    .await?;
                if payload.run_next {
                    self.schedule_next(payload.run_id).await?;
                }
            }
            Err(error) => {
                self.transition_terminal(
                    payload.pr_task_id,
                    TaskStatus::Failed,
                    Some(error.to_string()),
                )
                .await?;
            }
        }

        self.job_queue.delete(job.job_id).await?;
        Ok(())
    }

    /// Refresh `job_id`'s lease at half the lease duration while `run_fn` is executing, so a
    /// slow-but-alive task is not reclaimed by another worker out from under it. Aborted once the
    /// task finishes; a stuck task still gets reaped after the lease lapses (§4.1).
    fn spawn_lease_heartbeat(&self, job_id: JobId) -> tokio::task::JoinHandle<()> {
        let job_queue = self.job_queue.clone();
        let worker_id = self.id;
        let lease = self.lease;
        let interval = lease / 2;
        tokio::spawn(async move {
            loop {
                tokio_sleep(interval).await;
                if let Err(error) = job_queue.heartbeat(job_id, worker_id, lease).await {
                    warn!("Worker {worker_id} failed to refresh lease for job {job_id}: {error}");
                }
            }
        })
    }

    async fn fetch_task(
        &self,
        pr_task_id: PrTaskId,
    ) -> crate::error::Result<crate::data::pipeline_run_task::PipelineRunTask> {
        let task = sqlx::query_as(
            r#"
            select
                pr_task_id, run_id, task_id, task_order, task_running, task_complete, task_start,
                task_completed, task_status, task_message, parent_pr_task_id
            from pipeline.pipeline_run_task
            where pr_task_id = $1"#,
        )
        .bind(pr_task_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Task {pr_task_id}")))?;
        Ok(task)
    }

    /// Acquire the §4.1 advisory row lock on `pr_task_id` and transition it `Scheduled ->
    /// Running`. Returns `false` (without writing anything) if the row could not be locked or was
    /// no longer `Scheduled` by the time it was locked — e.g. a concurrent `resetTask` moved it
    /// back to `Waiting` between this job being claimed and the worker reaching it. The caller
    /// must not run the task nor write a terminal status in that case.
    async fn transition_running(&self, pr_task_id: PrTaskId) -> crate::error::Result<bool> {
        let mut transaction = self.pool.begin().await?;
        let locked: Option<PrTaskId> = sqlx::query_scalar(
            r#"
            select pr_task_id
            from pipeline.pipeline_run_task
            where pr_task_id = $1 and task_status = 'Scheduled'
            for update skip locked"#,
        )
        .bind(pr_task_id)
        .fetch_optional(&mut *transaction)
        .await?;
        if locked.is_none() {
            transaction.rollback().await?;
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            update pipeline.pipeline_run_task
            set task_status = 'Running', task_running = true, task_start = now()
            where pr_task_id = $1 and task_status = 'Scheduled'"#,
        )
        .bind(pr_task_id)
        .execute(&mut *transaction)
        .await?;
        if result.rows_affected() != 1 {
            transaction.rollback().await?;
            return Ok(false);
        }

        transaction.commit().await?;
        Ok(true)
    }

    async fn transition_terminal(
        &self,
        pr_task_id: PrTaskId,
        status: TaskStatus,
        message: Option<String>,
    ) -> crate::error::Result<()> {
        sqlx::query(
            r#"
            update pipeline.pipeline_run_task
            set
                task_status = $2, task_running = false, task_complete = $3,
                task_completed = now(), task_message = $4
            where pr_task_id = $1"#,
        )
        .bind(pr_task_id)
        .bind(status)
        .bind(status == TaskStatus::Complete)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// §4.1 run-all semantics: on success with `runNext`, find the next `Waiting` task in the
    /// same run and, if it is a System task, schedule it with `runNext` still true; a User task
    /// stops the chain, returning control to whichever request picks it up next.
    async fn schedule_next(&mut self, run_id: crate::data::pipeline_run::PipelineRunId) -> crate::error::Result<()> {
        let next: Option<(PrTaskId, crate::data::pipeline_run_task::TaskId)> = sqlx::query_as(
            r#"
            select pr_task_id, task_id
            from pipeline.pipeline_run_task
            where run_id = $1 and task_status = 'Waiting'
            order by task_order
            limit 1"#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((pr_task_id, task_id)) = next else {
            return Ok(());
        };

        let Some(entry) = self.registry.get(task_id) else {
            warn!("No catalog entry for next task_id {task_id}; stopping chain");
            return Ok(());
        };
        if !entry.is_system() {
            info!("Next task {pr_task_id} is a User task; stopping run-all chain");
            return Ok(());
        }

        sqlx::query("update pipeline.pipeline_run_task set task_status = 'Scheduled' where pr_task_id = $1")
            .bind(pr_task_id)
            .execute(&self.pool)
            .await?;
        self.job_queue
            .enqueue(&crate::data::pipeline_run_task::SystemJobPayload {
                pr_task_id,
                run_id,
                task_id,
                run_next: true,
            })
            .await?;
        Ok(())
    }
}

/// Spawn `worker_count` [`Worker`]s as background tasks, each polling the shared `job_queue`
/// independently. Returns their join handles so the caller (the `pe_job_worker` binary) can await
/// them, e.g. on a shutdown signal.
pub fn spawn_workers<Q>(
    worker_count: usize,
    pool: PgPool,
    registry: TaskRegistry,
    job_queue: Q,
    lease: Duration,
) -> Vec<tokio::task::JoinHandle<()>>
where
    Q: JobQueue + Clone + 'static,
{
    (0..worker_count)
        .map(|_| {
            let worker = Worker::new(pool.clone(), registry.clone(), job_queue.clone(), lease);
            tokio::spawn(async move {
                if let Err(error) = worker.run().await {
                    error!("Worker exited with error: {error}");
                }
            })
        })
        .collect()
}
