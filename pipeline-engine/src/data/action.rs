use serde::{Deserialize, Serialize};

/// A statically declared `(role, state, href, label)` tuple shown to users based on run state.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Action {
    pub role: String,
    pub state: String,
    pub href: String,
    pub label: String,
}
