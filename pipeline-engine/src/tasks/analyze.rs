use ingest::analyze::analyze_via_reader;
use ingest::error::IngestionError;
use ingest::formats::dbf::DbfReader;
use ingest::formats::excel::ExcelReader;
use ingest::formats::flat::FlatFileReader;
use ingest::formats::mdb::MdbReader;
use ingest::formats::AnalyzeDescriptor;
use ingest::LoaderType;
use log::{info, warn};
use sqlx::PgPool;

use crate::data::pipeline_run::PipelineRunId;
use crate::data::source_table::{SourceTable, StOid};
use crate::error::Result;

/// Run the analyze pass for every `analyze`-flagged [`SourceTable`] declared against `run_id`,
/// persisting the resulting record count and [`crate::data::source_table::SourceTableColumn`]
/// rows. Resolves a source table's file with its `file_id` taken as a filesystem path, the
/// simplest reading consistent with spec.md's `file_id` pattern `F\d+` serving as an opaque
/// handle into whatever upstream file store populated it (an Open Question resolved in
/// DESIGN.md).
pub async fn run(pool: &PgPool, run_id: PipelineRunId) -> Result<Option<String>> {
    let tables: Vec<SourceTable> = sqlx::query_as(
        r#"
        select
            st_oid, run_id, table_name, file_id, file_name, loader_type, sub_table, delimiter,
            qualified, encoding, collect_type, analyze, load, record_count, url, comments
        from pipeline.source_table
        where run_id = $1 and analyze = true"#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    let mut analyzed = 0usize;
    for table in &tables {
        match analyze_one(pool, table).await {
            Ok(()) => analyzed += 1,
            Err(error) => {
                warn!(
                    "Could not analyze source table {} ({}) for run {run_id}: {error}",
                    table.st_oid, table.table_name
                );
                return Err(error);
            }
        }
    }

    Ok(Some(format!(
        "Analyzed {analyzed} of {} source table(s) for run {run_id}",
        tables.len()
    )))
}

async fn analyze_one(pool: &PgPool, table: &SourceTable) -> Result<()> {
    let path = std::path::Path::new(&table.file_id);
    let descriptor = AnalyzeDescriptor {
        table_name: table.table_name.clone(),
        sub_table: table.sub_table.clone(),
        delimiter: table.delimiter.as_ref().and_then(|d| d.chars().next()),
    };

    let result = match table.loader_type {
        LoaderType::Flat => {
            let delimiter = descriptor.delimiter.unwrap_or(',') as u8;
            let mut reader = FlatFileReader::open(path, delimiter)?;
            analyze_via_reader(&mut reader, &descriptor)?
        }
        LoaderType::Excel => {
            let mut reader = ExcelReader::open(path)?;
            analyze_via_reader(&mut reader, &descriptor)?
        }
        LoaderType::Dbf => {
            let mut reader = DbfReader::open(path)?;
            analyze_via_reader(&mut reader, &descriptor)?
        }
        LoaderType::Mdb => {
            let environment = unsafe { odbc_api::Environment::new() }
                .map_err(|e| IngestionError::Odbc(e.to_string()))?;
            let mut reader = MdbReader::open(&environment, path)?;
            analyze_via_reader(&mut reader, &descriptor)?
        }
    };

    let mut transaction = pool.begin().await?;
    sqlx::query("update pipeline.source_table set record_count = $2 where st_oid = $1")
        .bind(table.st_oid)
        .bind(result.record_count)
        .execute(&mut *transaction)
        .await?;
    sqlx::query("delete from pipeline.source_table_column where st_oid = $1")
        .bind(table.st_oid)
        .execute(&mut *transaction)
        .await?;
    for column in &result.columns {
        insert_column(&mut transaction, table.st_oid, column).await?;
    }
    transaction.commit().await?;

    info!(
        "Analyzed source table {} ({}): {} record(s), {} column(s)",
        table.st_oid,
        table.table_name,
        result.record_count,
        result.columns.len()
    );
    Ok(())
}

async fn insert_column(
    transaction: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    st_oid: StOid,
    column: &ingest::analyze::ColumnStat,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into pipeline.source_table_column(st_oid, name, type, max_length, min_length, column_index)
        values ($1, $2, $3, $4, $5, $6)"#,
    )
    .bind(st_oid)
    .bind(&column.name)
    .bind(&column.r#type)
    .bind(column.max_length)
    .bind(column.min_length)
    .bind(column.index)
    .execute(&mut **transaction)
    .await?;
    Ok(())
}
