use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const INDEXES: &[(&str, &str, &[&str])] = &[
    ("idx_workspace_member_user", "workspace_member", &["user_id"]),
    ("idx_crm_project_workspace", "crm_project", &["workspace_id"]),
    ("idx_crm_sprint_project", "crm_sprint", &["project_id"]),
    // Issue listing and status aggregation are both per project
    ("idx_crm_issue_project_status", "crm_issue", &["project_id", "status"]),
    ("idx_crm_issue_sprint", "crm_issue", &["sprint_id"]),
    ("idx_crm_issue_assignee", "crm_issue", &["assignee_id"]),
    ("idx_crm_issue_parent", "crm_issue", &["parent_id"]),
    ("idx_crm_comment_issue", "crm_comment", &["issue_id"]),
    ("idx_crm_time_log_issue", "crm_time_log", &["issue_id"]),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, cols) in INDEXES {
            let mut index = Index::create();
            index.name(*name).table(Alias::new(*table));
            for col in cols.iter() {
                index.col(Alias::new(*col));
            }
            manager.create_index(index.to_owned()).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, _) in INDEXES {
            manager
                .drop_index(Index::drop().name(*name).table(Alias::new(*table)).to_owned())
                .await?;
        }
        Ok(())
    }
}
