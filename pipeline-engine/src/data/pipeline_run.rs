use std::str::FromStr;

use chrono::NaiveDate;
use common::error::EmError;
use serde::{Deserialize, Serialize};

/// Wrapper for a `run_id` value, the identity of a [`PipelineRun`].
#[derive(sqlx::Type, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize, Debug)]
#[sqlx(transparent)]
pub struct PipelineRunId(pub i64);

impl FromStr for PipelineRunId {
    type Err = EmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()?.into())
    }
}

impl From<i64> for PipelineRunId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for PipelineRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse state of a run independent of its individual task statuses: `Ready` while no stage is
/// picked up, `Active` once a user has claimed the current stage slot.
#[derive(sqlx::Type, Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
#[sqlx(type_name = "operation_state")]
pub enum OperationState {
    Ready,
    Active,
}

/// One of the four stage-owner slots on a [`PipelineRun`]. `runTask`/`getRecordForRun`
/// authorization checks the slot matching the run's current `workflow_operation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSlot {
    Collection,
    Load,
    Check,
    Qa,
}

/// A single pipeline run: one instance of processing a data source through the workflow stages.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct PipelineRun {
    pub run_id: PipelineRunId,
    pub data_source_id: i64,
    pub record_date: NaiveDate,
    pub workflow_operation: String,
    pub operation_state: OperationState,
    pub collection_user: Option<String>,
    pub load_user: Option<String>,
    pub check_user: Option<String>,
    pub qa_user: Option<String>,
}

impl PipelineRun {
    /// Read the username occupying the stage `slot`, if any.
    pub fn slot_user(&self, slot: StageSlot) -> Option<&str> {
        match slot {
            StageSlot::Collection => self.collection_user.as_deref(),
            StageSlot::Load => self.load_user.as_deref(),
            StageSlot::Check => self.check_user.as_deref(),
            StageSlot::Qa => self.qa_user.as_deref(),
        }
    }
}
