use serde::{Deserialize, Serialize};

/// A workflow stage (collection, load, check, qa), enumerable to a user given their roles. Used to
/// drive the actions/operations surface at `/api/operations`.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct WorkflowOperation {
    pub code: String,
    pub href: String,
    pub role: String,
    pub ordering: i32,
}
