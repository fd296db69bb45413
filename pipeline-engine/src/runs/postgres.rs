use sqlx::PgPool;

use crate::authz::slot_for_operation;
use crate::data::pipeline_run::{PipelineRun, PipelineRunId, StageSlot};
use crate::error::{Error, Result};
use crate::principal::Principal;
use crate::runs::PipelineRunsService;

/// Postgresql-backed [`PipelineRunsService`].
#[derive(Clone)]
pub struct PgPipelineRunsService {
    pool: PgPool,
}

impl PgPipelineRunsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn slot_column(slot: StageSlot) -> &'static str {
    match slot {
        StageSlot::Collection => "collection_user",
        StageSlot::Load => "load_user",
        StageSlot::Check => "check_user",
        StageSlot::Qa => "qa_user",
    }
}

impl PipelineRunsService for PgPipelineRunsService {
    async fn list_for_stage(
        &self,
        principal: &Principal,
        workflow_operation: &str,
    ) -> Result<Vec<PipelineRun>> {
        let slot = slot_for_operation(workflow_operation).ok_or_else(|| {
            Error::BadRequest(format!("Unknown workflow operation '{workflow_operation}'"))
        })?;

        let runs = if principal.is_admin() {
            sqlx::query_as(
                r#"
                select
                    run_id, data_source_id, record_date, workflow_operation, operation_state,
                    collection_user, load_user, check_user, qa_user
                from pipeline.pipeline_run
                where workflow_operation = $1
                order by run_id"#,
            )
            .bind(workflow_operation)
            .fetch_all(&self.pool)
            .await?
        } else {
            let query = format!(
                r#"
                select
                    run_id, data_source_id, record_date, workflow_operation, operation_state,
                    collection_user, load_user, check_user, qa_user
                from pipeline.pipeline_run
                where workflow_operation = $1 and {column} = $2
                order by run_id"#,
                column = slot_column(slot)
            );
            sqlx::query_as(&query)
                .bind(workflow_operation)
                .bind(&principal.username)
                .fetch_all(&self.pool)
                .await?
        };
        Ok(runs)
    }

    async fn pickup(&self, principal: &Principal, run_id: PipelineRunId) -> Result<PipelineRun> {
        let run: PipelineRun = sqlx::query_as(
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

        let slot = slot_for_operation(&run.workflow_operation).ok_or_else(|| {
            Error::BadRequest(format!(
                "Unknown workflow operation '{}'",
                run.workflow_operation
            ))
        })?;
        if run.slot_user(slot).is_some() {
            return Err(Error::Conflict(format!(
                "Run {run_id} has already been picked up at its current stage"
            )));
        }

        let query = format!(
            r#"
            update pipeline.pipeline_run
            set {column} = $2, operation_state = 'Active'
            where run_id = $1 and {column} is null"#,
            column = slot_column(slot)
        );
        let result = sqlx::query(&query)
            .bind(run_id)
            .bind(&principal.username)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "Run {run_id} has already been picked up at its current stage"
            )));
        }

        self.list_for_stage(principal, &run.workflow_operation)
            .await?
            .into_iter()
            .find(|r| r.run_id == run_id)
            .ok_or_else(|| Error::NotFound(format!("Pipeline run {run_id}")))
    }
}

#[cfg(test)]
mod test {
    use super::slot_column;
    use crate::data::pipeline_run::StageSlot;

    #[test]
    fn slot_column_maps_every_stage() {
        assert_eq!(slot_column(StageSlot::Collection), "collection_user");
        assert_eq!(slot_column(StageSlot::Load), "load_user");
        assert_eq!(slot_column(StageSlot::Check), "check_user");
        assert_eq!(slot_column(StageSlot::Qa), "qa_user");
    }
}
