use ingest::error::IngestionError;
use ingest::load::{load_file, LoaderDescriptor};
use log::{info, warn};
use sqlx::PgPool;

use crate::data::pipeline_run::PipelineRunId;
use crate::data::source_table::{SourceTable, SourceTableColumn};
use crate::error::Result;

/// Run the load pass for every `load`-flagged [`SourceTable`] declared against `run_id`, using the
/// column list the analyze task already persisted to synthesize each destination table's DDL. A
/// table that has never been analyzed (`record_count` still null) is skipped with a warning rather
/// than failing the whole run, since a later retry of the analyze task will make it loadable.
pub async fn run(pool: &PgPool, run_id: PipelineRunId) -> Result<Option<String>> {
    let tables: Vec<SourceTable> = sqlx::query_as(
        r#"
        select
            st_oid, run_id, table_name, file_id, file_name, loader_type, sub_table, delimiter,
            qualified, encoding, collect_type, analyze, load, record_count, url, comments
        from pipeline.source_table
        where run_id = $1 and load = true"#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    let mut loaded = 0usize;
    for table in &tables {
        if table.record_count.is_none() {
            warn!(
                "Skipping load of source table {} ({}): not yet analyzed",
                table.st_oid, table.table_name
            );
            continue;
        }
        load_one(pool, table).await?;
        loaded += 1;
    }

    Ok(Some(format!(
        "Loaded {loaded} of {} source table(s) for run {run_id}",
        tables.len()
    )))
}

async fn load_one(pool: &PgPool, table: &SourceTable) -> Result<()> {
    let columns: Vec<SourceTableColumn> = sqlx::query_as(
        r#"
        select st_oid, name, type, max_length, min_length, column_index
        from pipeline.source_table_column
        where st_oid = $1
        order by column_index"#,
    )
    .bind(table.st_oid)
    .fetch_all(pool)
    .await?;
    if columns.is_empty() {
        return Err(IngestionError::Generic(format!(
            "No analyzed columns for source table {}; run analyze first",
            table.st_oid
        ))
        .into());
    }

    let column_defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.r#type))
        .collect();
    let create_statement = format!(
        "create table if not exists {}({})",
        table.table_name,
        column_defs.join(", ")
    );

    let descriptor = LoaderDescriptor {
        st_oid: table.st_oid.0,
        table_name: table.table_name.clone(),
        sub_table: table.sub_table.clone(),
        delimiter: table.delimiter.as_ref().and_then(|d| d.chars().next()).unwrap_or(','),
        qualified: table.qualified,
        columns: columns.iter().map(|c| c.name.clone()).collect(),
        create_statement,
    };

    let path = std::path::Path::new(&table.file_id);
    let mut transaction = pool.begin().await?;
    let outcomes = match load_file(path, table.loader_type, std::slice::from_ref(&descriptor), &mut transaction).await {
        Ok(outcomes) => outcomes,
        Err(error) => {
            transaction.rollback().await?;
            return Err(error.into());
        }
    };
    transaction.commit().await?;

    for outcome in outcomes {
        info!(
            "Loaded {} record(s) into '{}' (st_oid {})",
            outcome.record_count, table.table_name, outcome.st_oid
        );
    }
    Ok(())
}
