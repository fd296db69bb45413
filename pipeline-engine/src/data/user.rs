use std::str::FromStr;

use common::error::EmError;
use serde::{Deserialize, Serialize};

/// Wrapper for a `user_id` value.
#[derive(sqlx::Type, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize, Debug)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl FromStr for UserId {
    type Err = EmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()?.into())
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user account. Created once; roles are mutated only by an admin; accounts are never deleted,
/// only deactivated.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub roles: Vec<String>,
    pub is_active: bool,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }
}

/// A static role definition, seeded once at schema init.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Role {
    pub name: String,
    pub description: String,
}
