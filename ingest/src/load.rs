use std::path::Path;

use log::info;
use sqlx::{Postgres, Transaction};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::copy_sink::{encode_csv_line, CopySink};
use crate::error::{IngestionError, IngestionResult};
use crate::formats::dbf::DbfReader;
use crate::formats::excel::ExcelReader;
use crate::formats::mdb::MdbReader;
use crate::formats::{AnalyzeDescriptor, FormatReader, Record};
use crate::{validate_descriptors, LoaderType};

/// Load-time descriptor for one destination table within a source file.
#[derive(Debug, Clone)]
pub struct LoaderDescriptor {
    pub st_oid: i64,
    pub table_name: String,
    pub sub_table: Option<String>,
    pub delimiter: char,
    pub qualified: bool,
    pub columns: Vec<String>,
    /// DDL executed in the same transaction as the COPY, ahead of it.
    pub create_statement: String,
}

/// Record count reported for one descriptor after loading.
pub struct LoadOutcome {
    pub st_oid: i64,
    pub record_count: u64,
}

const LOAD_CHUNK_SIZE: usize = 10_000;

/// Run `create_statement` then stream `path`'s records into the database for every descriptor, in
/// order, inside `transaction`. A failure on any descriptor aborts the whole call; the caller's
/// transaction is expected to roll back so no partial rows from the failing descriptor (or any
/// prior DDL against the same connection) survive.
pub async fn load_file(
    path: &Path,
    loader_type: LoaderType,
    descriptors: &[LoaderDescriptor],
    transaction: &mut Transaction<'_, Postgres>,
) -> IngestionResult<Vec<LoadOutcome>> {
    validate_descriptors(path, descriptors)?;

    // A single ODBC environment handle serves every MDB descriptor in this call; `odbc-api`
    // requires it be created with `unsafe` since a process may only sensibly hold one at a time.
    let odbc_environment = if loader_type == LoaderType::Mdb {
        Some(unsafe { odbc_api::Environment::new() }.map_err(|e| IngestionError::Odbc(e.to_string()))?)
    } else {
        None
    };

    let mut outcomes = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        sqlx::query(&descriptor.create_statement)
            .execute(&mut *transaction)
            .await?;

        let record_count = match loader_type {
            LoaderType::Flat => load_flat(path, descriptor, transaction).await?,
            LoaderType::Excel => {
                let mut reader = ExcelReader::open(path)?;
                load_via_reader(&mut reader, descriptor, transaction).await?
            }
            LoaderType::Dbf => {
                let mut reader = DbfReader::open(path)?;
                load_via_reader(&mut reader, descriptor, transaction).await?
            }
            LoaderType::Mdb => {
                let environment = odbc_environment.as_ref().expect("constructed above");
                let mut reader = MdbReader::open(environment, path)?;
                load_via_reader(&mut reader, descriptor, transaction).await?
            }
        };

        info!(
            "Loaded {record_count} records into '{}' (st_oid {})",
            descriptor.table_name, descriptor.st_oid
        );
        outcomes.push(LoadOutcome {
            st_oid: descriptor.st_oid,
            record_count,
        });
    }
    Ok(outcomes)
}

async fn load_flat(
    path: &Path,
    descriptor: &LoaderDescriptor,
    transaction: &mut Transaction<'_, Postgres>,
) -> IngestionResult<u64> {
    let file = tokio::fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut sink = CopySink::open(
        transaction,
        &descriptor.table_name,
        &descriptor.columns,
        descriptor.delimiter,
        descriptor.qualified,
        true,
    )
    .await?;

    while let Some(line) = lines.next_line().await? {
        let mut bytes = line.into_bytes();
        bytes.push(b'\n');
        sink.write_line(&bytes).await?;
    }
    sink.finish().await
}

/// Shared load path for every format that decodes records and re-encodes them as CSV, rather than
/// passing source bytes through unchanged (Flat only).
pub async fn load_via_reader(
    reader: &mut dyn FormatReader,
    descriptor: &LoaderDescriptor,
    transaction: &mut Transaction<'_, Postgres>,
) -> IngestionResult<u64> {
    let analyze_descriptor = AnalyzeDescriptor {
        table_name: descriptor.table_name.clone(),
        sub_table: descriptor.sub_table.clone(),
        delimiter: None,
    };

    let mut sink = CopySink::open(
        transaction,
        &descriptor.table_name,
        &descriptor.columns,
        descriptor.delimiter,
        descriptor.qualified,
        false,
    )
    .await?;

    let mut buffer: Vec<Record> = Vec::with_capacity(LOAD_CHUNK_SIZE);
    loop {
        buffer.clear();
        let read = reader.read_chunk(&analyze_descriptor, LOAD_CHUNK_SIZE, &mut buffer)?;
        if read == 0 {
            break;
        }
        for record in &buffer {
            sink.write_line(&encode_csv_line(record)).await?;
        }
    }
    sink.finish().await
}
