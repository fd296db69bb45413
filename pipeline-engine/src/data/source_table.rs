use std::str::FromStr;

use common::error::EmError;
use ingest::LoaderType;
use serde::{Deserialize, Serialize};

use crate::data::pipeline_run::PipelineRunId;

/// Wrapper for a `st_oid` value, the identity of a [`SourceTable`].
#[derive(sqlx::Type, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize, Debug)]
#[sqlx(transparent)]
pub struct StOid(pub i64);

impl FromStr for StOid {
    type Err = EmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()?.into())
    }
}

impl From<i64> for StOid {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for StOid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a source table's records were/are to be collected, a user-facing classification orthogonal
/// to [`LoaderType`] (which is derived mechanically from the file extension).
#[derive(sqlx::Type, Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
#[sqlx(type_name = "collect_type")]
pub enum CollectType {
    Manual,
    Automated,
    Vendor,
}

impl FromStr for CollectType {
    type Err = EmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Manual" => Ok(Self::Manual),
            "Automated" => Ok(Self::Automated),
            "Vendor" => Ok(Self::Vendor),
            other => Err(EmError::Generic(format!(
                "'{other}' is not a valid collect_type"
            ))),
        }
    }
}

/// A user-declared mapping between a file (or sub-table in a file) and a destination database
/// table, populated and consumed across the collection/load stages of a run.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct SourceTable {
    pub st_oid: StOid,
    pub run_id: PipelineRunId,
    pub table_name: String,
    pub file_id: String,
    pub file_name: String,
    pub loader_type: LoaderType,
    pub sub_table: Option<String>,
    pub delimiter: Option<String>,
    pub qualified: bool,
    pub encoding: Option<String>,
    pub collect_type: Option<CollectType>,
    pub analyze: bool,
    pub load: bool,
    pub record_count: Option<i64>,
    pub url: Option<String>,
    pub comments: Option<String>,
}

/// One column of a [`SourceTable`], populated by the analyze task and consumed by the load task
/// to synthesize `CREATE TABLE` DDL.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct SourceTableColumn {
    pub st_oid: StOid,
    pub name: String,
    pub r#type: String,
    pub max_length: i32,
    pub min_length: i32,
    pub column_index: i32,
}
