pub mod postgres;

use crate::data::action::Action;
use crate::data::workflow_operation::WorkflowOperation;
use crate::error::Result;
use crate::principal::Principal;

/// Read-only surface over the two statically declared catalogs: [`WorkflowOperation`] and
/// [`Action`]. Both are filtered down to what `principal`'s roles make visible, backing
/// `GET /api/operations` and `GET /api/actions`.
pub trait CatalogService
where
    Self: Send + Sync,
{
    /// Workflow operations visible to `principal`'s roles, ordered by their `ordering` rank.
    async fn list_operations(&self, principal: &Principal) -> Result<Vec<WorkflowOperation>>;

    /// Actions visible to `principal`'s roles.
    async fn list_actions(&self, principal: &Principal) -> Result<Vec<Action>>;
}
