use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::debug;
use uuid::Uuid;

use super::repository::WorkspaceAccess;
use crate::errors::ServiceError;

/// Membership backed by the `workspace_member` table.
#[derive(Clone)]
pub struct SeaOrmWorkspaceAccess {
    pub db: DatabaseConnection,
}

impl SeaOrmWorkspaceAccess {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

#[async_trait]
impl WorkspaceAccess for SeaOrmWorkspaceAccess {
    async fn is_workspace_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError> {
        let member = models::workspace_member::is_member(&self.db, workspace_id, user_id).await?;
        debug!(workspace_id = %workspace_id, user_id = %user_id, member, "membership_checked");
        Ok(member)
    }
}
