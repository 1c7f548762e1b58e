//! Create `crm_issue` table.
//!
//! Belongs to a project; optional sprint, assignee and parent issue (subtasks).
//! Status, priority and type are stored as text values of the model enums.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrmIssue::Table)
                    .if_not_exists()
                    .col(uuid(CrmIssue::Id).primary_key())
                    .col(string_len(CrmIssue::Title, 512).not_null())
                    .col(ColumnDef::new(CrmIssue::Description).text().null())
                    .col(string_len(CrmIssue::Status, 32).not_null())
                    .col(string_len(CrmIssue::Priority, 32).not_null())
                    .col(string_len(CrmIssue::Type, 32).not_null())
                    .col(uuid(CrmIssue::ProjectId).not_null())
                    .col(ColumnDef::new(CrmIssue::AssigneeId).uuid().null())
                    .col(uuid(CrmIssue::ReporterId).not_null())
                    .col(ColumnDef::new(CrmIssue::SprintId).uuid().null())
                    .col(ColumnDef::new(CrmIssue::ParentId).uuid().null())
                    .col(ColumnDef::new(CrmIssue::StoryPoints).integer().null())
                    .col(ColumnDef::new(CrmIssue::DueDate).timestamp_with_time_zone().null())
                    .col(timestamp_with_time_zone(CrmIssue::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(CrmIssue::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_issue_project")
                            .from(CrmIssue::Table, CrmIssue::ProjectId)
                            .to(CrmProject::Table, CrmProject::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_issue_assignee")
                            .from(CrmIssue::Table, CrmIssue::AssigneeId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_issue_reporter")
                            .from(CrmIssue::Table, CrmIssue::ReporterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_issue_sprint")
                            .from(CrmIssue::Table, CrmIssue::SprintId)
                            .to(CrmSprint::Table, CrmSprint::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_issue_parent")
                            .from(CrmIssue::Table, CrmIssue::ParentId)
                            .to(CrmIssue::Table, CrmIssue::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CrmIssue::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CrmIssue {
    Table,
    Id,
    Title,
    Description,
    Status,
    Priority,
    Type,
    ProjectId,
    AssigneeId,
    ReporterId,
    SprintId,
    ParentId,
    StoryPoints,
    DueDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CrmProject { Table, Id }

#[derive(DeriveIden)]
enum CrmSprint { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
