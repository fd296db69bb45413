use crate::data::user::UserId;

/// The authenticated caller of an engine/source-table operation, passed as a plain function
/// argument rather than pulled from ambient request-scoped storage (per the request-scoped
/// session redesign). Authentication/session storage that produces a [`Principal`] is an external
/// collaborator; the core only consumes the value.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }
}
