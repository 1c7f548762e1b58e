use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::ServiceError;

#[async_trait]
pub trait WorkspaceAccess: Send + Sync {
    async fn is_workspace_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError>;
}

/// In-memory membership set for tests
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::RwLock;

    #[derive(Default)]
    pub struct StaticWorkspaceAccess {
        members: RwLock<HashSet<(Uuid, Uuid)>>, // (workspace_id, user_id)
    }

    impl StaticWorkspaceAccess {
        pub fn grant(&self, workspace_id: Uuid, user_id: Uuid) {
            let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());
            members.insert((workspace_id, user_id));
        }

        pub fn revoke(&self, workspace_id: Uuid, user_id: Uuid) {
            let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());
            members.remove(&(workspace_id, user_id));
        }
    }

    #[async_trait]
    impl WorkspaceAccess for StaticWorkspaceAccess {
        async fn is_workspace_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError> {
            let members = self.members.read().unwrap_or_else(|e| e.into_inner());
            Ok(members.contains(&(workspace_id, user_id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::StaticWorkspaceAccess;
    use super::*;

    #[tokio::test]
    async fn static_access_grants_and_revokes() {
        let access = StaticWorkspaceAccess::default();
        let (ws, user) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(!access.is_workspace_member(ws, user).await.unwrap());
        access.grant(ws, user);
        assert!(access.is_workspace_member(ws, user).await.unwrap());
        assert!(!access.is_workspace_member(Uuid::new_v4(), user).await.unwrap());
        access.revoke(ws, user);
        assert!(!access.is_workspace_member(ws, user).await.unwrap());
    }
}
