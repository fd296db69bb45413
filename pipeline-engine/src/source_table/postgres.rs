use sqlx::PgPool;

use crate::authz::check_user_run;
use crate::data::pipeline_run::{PipelineRun, PipelineRunId};
use crate::data::source_table::{SourceTable, StOid};
use crate::error::{Error, Result};
use crate::principal::Principal;
use crate::source_table::{parse_run_id, parse_st_oid, FormData, SourceTableFields, SourceTableService};

/// Postgresql-backed [`SourceTableService`]. Each operation fetches the owning [`PipelineRun`],
/// authorizes the caller against its current stage slot via [`check_user_run`], and then runs a
/// single statement against `pipeline.source_table`.
#[derive(Clone)]
pub struct PgSourceTableService {
    pool: PgPool,
}

impl PgSourceTableService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
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
}

impl SourceTableService for PgSourceTableService {
    async fn list(&self, principal: &Principal, run_id: PipelineRunId) -> Result<Vec<SourceTable>> {
        let run = self.fetch_run(run_id).await?;
        check_user_run(&run, principal)?;
        let tables = sqlx::query_as(
            r#"
            select
                st_oid, run_id, table_name, file_id, file_name, loader_type, sub_table,
                delimiter, qualified, encoding, collect_type, analyze, load, record_count,
                url, comments
            from pipeline.source_table
            where run_id = $1
            order by st_oid"#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    async fn create(&self, principal: &Principal, form: &FormData) -> Result<(StOid, u64)> {
        let run_id = parse_run_id(form)?;
        let run = self.fetch_run(run_id).await?;
        check_user_run(&run, principal)?;
        let fields = SourceTableFields::parse(form)?;

        let st_oid: StOid = sqlx::query_scalar(
            r#"
            insert into pipeline.source_table(
                run_id, table_name, file_id, file_name, loader_type, sub_table, delimiter,
                qualified, collect_type, analyze, load, url, comments
            )
            values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            returning st_oid"#,
        )
        .bind(run_id)
        .bind(&fields.table_name)
        .bind(&fields.file_id)
        .bind(&fields.file_name)
        .bind(fields.loader_type)
        .bind(&fields.sub_table)
        .bind(&fields.delimiter)
        .bind(fields.qualified)
        .bind(fields.collect_type)
        .bind(fields.analyze)
        .bind(fields.load)
        .bind(&fields.url)
        .bind(&fields.comments)
        .fetch_one(&self.pool)
        .await?;
        Ok((st_oid, 1))
    }

    async fn update(&self, principal: &Principal, form: &FormData) -> Result<(StOid, u64)> {
        let run_id = parse_run_id(form)?;
        let st_oid = parse_st_oid(form)?;
        let run = self.fetch_run(run_id).await?;
        check_user_run(&run, principal)?;
        let fields = SourceTableFields::parse(form)?;

        let rows_affected = sqlx::query(
            r#"
            update pipeline.source_table
            set
                table_name = $3, file_id = $4, file_name = $5, loader_type = $6,
                sub_table = $7, delimiter = $8, qualified = $9, collect_type = $10,
                analyze = $11, load = $12, url = $13, comments = $14
            where run_id = $1 and st_oid = $2"#,
        )
        .bind(run_id)
        .bind(st_oid)
        .bind(&fields.table_name)
        .bind(&fields.file_id)
        .bind(&fields.file_name)
        .bind(fields.loader_type)
        .bind(&fields.sub_table)
        .bind(&fields.delimiter)
        .bind(fields.qualified)
        .bind(fields.collect_type)
        .bind(fields.analyze)
        .bind(fields.load)
        .bind(&fields.url)
        .bind(&fields.comments)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(Error::NotFound(format!(
                "Source table {st_oid} for run {run_id}"
            )));
        }
        Ok((st_oid, rows_affected))
    }

    async fn delete(&self, principal: &Principal, form: &FormData) -> Result<(StOid, u64)> {
        let run_id = parse_run_id(form)?;
        let st_oid = parse_st_oid(form)?;
        let run = self.fetch_run(run_id).await?;
        check_user_run(&run, principal)?;

        let rows_affected = sqlx::query(
            "delete from pipeline.source_table where run_id = $1 and st_oid = $2",
        )
        .bind(run_id)
        .bind(st_oid)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(Error::NotFound(format!(
                "Source table {st_oid} for run {run_id}"
            )));
        }
        Ok((st_oid, rows_affected))
    }
}
