use log::warn;
use sqlx::{PgPool, Postgres, Transaction};

use crate::authz::check_user_run;
use crate::data::pipeline_run::{PipelineRun, PipelineRunId};
use crate::data::pipeline_run_task::{PipelineRunTask, PrTaskId, SystemJobPayload, TaskStatus};
use crate::engine::{RunOutcome, TaskExecutionEngine};
use crate::error::{Error, Result};
use crate::job_queue::JobQueue;
use crate::principal::Principal;
use crate::task_registry::{TaskCatalogEntry, TaskRegistry};

/// Postgresql implementation of the [`TaskExecutionEngine`]. Wraps a [`PgPool`] plus the shared
/// [`TaskRegistry`] and [`JobQueue`] it dispatches System tasks through.
#[derive(Clone)]
pub struct PgTaskExecutionEngine<Q>
where
    Q: JobQueue + Clone,
{
    pool: PgPool,
    registry: TaskRegistry,
    job_queue: Q,
}

impl<Q> PgTaskExecutionEngine<Q>
where
    Q: JobQueue + Clone,
{
    pub fn new(pool: PgPool, registry: TaskRegistry, job_queue: Q) -> Self {
        Self {
            pool,
            registry,
            job_queue,
        }
    }

    async fn fetch_run(&self, run_id: PipelineRunId) -> Result<PipelineRun> {
        let run = sqlx::query_as(
            r#"
            select
                run_id, data_source_id, record_date, workflow_operation, operation_state,
                collection_user, load_user, check_user, qa_user
            from pipeline.pipeline_run
            where run_id = $1"#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Pipeline run {run_id}")))?;
        Ok(run)
    }

    async fn fetch_task(&self, run_id: PipelineRunId, pr_task_id: PrTaskId) -> Result<PipelineRunTask> {
        let task = sqlx::query_as(
            r#"
            select
                pr_task_id, run_id, task_id, task_order, task_running, task_complete, task_start,
                task_completed, task_status, task_message, parent_pr_task_id
            from pipeline.pipeline_run_task
            where run_id = $1 and pr_task_id = $2"#,
        )
        .bind(run_id)
        .bind(pr_task_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Task {pr_task_id} for run {run_id}")))?;
        Ok(task)
    }

    /// §4.1 precondition: at most one task per run may be `Scheduled`/`Running` at a time.
    async fn assert_no_task_in_flight(&self, run_id: PipelineRunId) -> Result<()> {
        let in_flight: Option<PrTaskId> = sqlx::query_scalar(
            r#"
            select pr_task_id
            from pipeline.pipeline_run_task
            where run_id = $1 and task_status in ('Scheduled', 'Running')
            limit 1"#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;
        if in_flight.is_some() {
            return Err(Error::Conflict("Task already running".to_owned()));
        }
        Ok(())
    }

    async fn write_status(
        transaction: &mut Transaction<'_, Postgres>,
        pr_task_id: PrTaskId,
        status: TaskStatus,
        message: Option<&str>,
    ) -> Result<()> {
        match status {
            TaskStatus::Scheduled => {
                sqlx::query(
                    "update pipeline.pipeline_run_task set task_status = $2 where pr_task_id = $1",
                )
                .bind(pr_task_id)
                .bind(status)
                .execute(&mut *transaction)
                .await?;
            }
            TaskStatus::Running => {
                sqlx::query(
                    r#"
                    update pipeline.pipeline_run_task
                    set task_status = $2, task_running = true, task_start = now()
                    where pr_task_id = $1"#,
                )
                .bind(pr_task_id)
                .bind(status)
                .execute(&mut *transaction)
                .await?;
            }
            TaskStatus::Complete | TaskStatus::Failed => {
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
                .execute(&mut *transaction)
                .await?;
            }
            TaskStatus::Waiting => {
                sqlx::query(
                    r#"
                    update pipeline.pipeline_run_task
                    set
                        task_status = 'Waiting', task_running = false, task_complete = false,
                        task_start = null, task_completed = null, task_message = null
                    where pr_task_id = $1"#,
                )
                .bind(pr_task_id)
                .execute(&mut *transaction)
                .await?;
            }
        }
        Ok(())
    }
}

impl<Q> TaskExecutionEngine for PgTaskExecutionEngine<Q>
where
    Q: JobQueue + Clone,
{
    async fn get_ordered_tasks(&self, run_id: PipelineRunId) -> Result<Vec<PipelineRunTask>> {
        let tasks = sqlx::query_as(
            r#"
            select
                pr_task_id, run_id, task_id, task_order, task_running, task_complete, task_start,
                task_completed, task_status, task_message, parent_pr_task_id
            from pipeline.pipeline_run_task
            where run_id = $1
            order by task_order"#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn get_record_for_run(
        &self,
        principal: &Principal,
        run_id: PipelineRunId,
        pr_task_id: PrTaskId,
    ) -> Result<PipelineRunTask> {
        let run = self.fetch_run(run_id).await?;
        check_user_run(&run, principal)?;
        self.fetch_task(run_id, pr_task_id).await
    }

    async fn run_task(
        &self,
        principal: &Principal,
        run_id: PipelineRunId,
        pr_task_id: PrTaskId,
        run_next: bool,
    ) -> Result<RunOutcome> {
        let run = self.fetch_run(run_id).await?;
        check_user_run(&run, principal)?;
        self.assert_no_task_in_flight(run_id).await?;
        let task = self.fetch_task(run_id, pr_task_id).await?;
        if task.task_status != TaskStatus::Waiting {
            return Err(Error::Conflict(format!(
                "Task {pr_task_id} is not Waiting (currently {:?})",
                task.task_status
            )));
        }

        let Some(entry) = self.registry.get(task.task_id) else {
            return Err(Error::BadRequest(format!(
                "No catalog entry for task_id {}",
                task.task_id
            )));
        };

        match entry {
            TaskCatalogEntry::User(run_fn) => {
                let mut transaction = self.pool.begin().await?;
                Self::write_status(&mut transaction, pr_task_id, TaskStatus::Running, None).await?;
                transaction.commit().await?;

                let result = run_fn(self.pool.clone(), principal.clone(), task).await;
                let mut transaction = self.pool.begin().await?;
                let (status, message) = match &result {
                    Ok(message) => (TaskStatus::Complete, message.clone()),
                    Err(error) => (TaskStatus::Failed, Some(error.to_string())),
                };
                Self::write_status(&mut transaction, pr_task_id, status, message.as_deref())
                    .await?;
                transaction.commit().await?;

                Ok(RunOutcome::Completed {
                    success: result.is_ok(),
                    message,
                })
            }
            TaskCatalogEntry::System(_) => {
                let mut transaction = self.pool.begin().await?;
                Self::write_status(&mut transaction, pr_task_id, TaskStatus::Scheduled, None)
                    .await?;
                transaction.commit().await?;

                self.job_queue
                    .enqueue(&SystemJobPayload {
                        pr_task_id,
                        run_id,
                        task_id: task.task_id,
                        run_next,
                    })
                    .await?;
                Ok(RunOutcome::Scheduled {
                    message: format!("Scheduled {pr_task_id}"),
                })
            }
        }
    }

    async fn reset_task(
        &self,
        principal: &Principal,
        run_id: PipelineRunId,
        pr_task_id: PrTaskId,
    ) -> Result<PipelineRunTask> {
        let run = self.fetch_run(run_id).await?;
        check_user_run(&run, principal)?;
        let task = self.fetch_task(run_id, pr_task_id).await?;
        if task.task_status == TaskStatus::Scheduled || task.task_status == TaskStatus::Running {
            return Err(Error::Conflict(
                "Cannot reset a task that is Scheduled or Running".to_owned(),
            ));
        }

        let mut transaction = self.pool.begin().await?;
        // Resetting a task fully deletes any child task rows rooted at it rather than resetting
        // them in place.
        sqlx::query(
            r#"
            delete from pipeline.pipeline_run_task
            where run_id = $1 and parent_pr_task_id = $2"#,
        )
        .bind(run_id)
        .bind(pr_task_id)
        .execute(&mut *transaction)
        .await?;
        Self::write_status(&mut transaction, pr_task_id, TaskStatus::Waiting, None).await?;
        transaction.commit().await?;

        self.fetch_task(run_id, pr_task_id).await
    }

    async fn get_status(&self, pr_task_id: PrTaskId) -> Result<TaskStatus> {
        let status = sqlx::query_scalar(
            "select task_status from pipeline.pipeline_run_task where pr_task_id = $1",
        )
        .bind(pr_task_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Task {pr_task_id}")))?;
        Ok(status)
    }

    async fn set_status(
        &self,
        pr_task_id: PrTaskId,
        status: TaskStatus,
        message: Option<String>,
    ) -> Result<()> {
        let current = self.get_status(pr_task_id).await?;
        if !current.can_transition_to(status) {
            warn!("Rejected transition {current:?} -> {status:?} for task {pr_task_id}");
            return Err(Error::Conflict(format!(
                "Cannot transition task {pr_task_id} from {current:?} to {status:?}"
            )));
        }
        let mut transaction = self.pool.begin().await?;
        Self::write_status(&mut transaction, pr_task_id, status, message.as_deref()).await?;
        transaction.commit().await?;
        Ok(())
    }
}

