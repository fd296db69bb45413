pub mod postgres;

use crate::data::pipeline_run::{PipelineRun, PipelineRunId};
use crate::error::Result;
use crate::principal::Principal;

/// Backs `GET /api/pipeline-runs/{code}` (spec.md §6) and the pickup operation named in spec.md
/// §3/glossary: a user claiming responsibility for a run at its current stage.
pub trait PipelineRunsService
where
    Self: Send + Sync,
{
    async fn list_for_stage(
        &self,
        principal: &Principal,
        workflow_operation: &str,
    ) -> Result<Vec<PipelineRun>>;

    /// "Pickup": set the slot matching `run`'s current `workflow_operation` to `principal`'s
    /// username, iff that slot is currently empty; fails with
    /// [`crate::error::Error::Conflict`] otherwise. See spec.md §3.
    async fn pickup(&self, principal: &Principal, run_id: PipelineRunId) -> Result<PipelineRun>;
}
