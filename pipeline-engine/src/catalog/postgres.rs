use sqlx::PgPool;

use crate::catalog::CatalogService;
use crate::data::action::Action;
use crate::data::workflow_operation::WorkflowOperation;
use crate::error::Result;
use crate::principal::Principal;

/// Postgresql-backed [`CatalogService`]. Admins see every row; everyone else sees only rows whose
/// `role` column matches one of their roles.
#[derive(Clone)]
pub struct PgCatalogService {
    pool: PgPool,
}

impl PgCatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CatalogService for PgCatalogService {
    async fn list_operations(&self, principal: &Principal) -> Result<Vec<WorkflowOperation>> {
        let operations = if principal.is_admin() {
            sqlx::query_as(
                "select code, href, role, ordering from pipeline.workflow_operation order by ordering",
            )
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r#"
                select code, href, role, ordering
                from pipeline.workflow_operation
                where role = any($1)
                order by ordering"#,
            )
            .bind(&principal.roles)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(operations)
    }

    async fn list_actions(&self, principal: &Principal) -> Result<Vec<Action>> {
        let actions = if principal.is_admin() {
            sqlx::query_as("select role, state, href, label from pipeline.action")
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as(
                "select role, state, href, label from pipeline.action where role = any($1)",
            )
            .bind(&principal.roles)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(actions)
    }
}
