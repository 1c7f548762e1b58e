//! Create `crm_time_log` table with FKs to `crm_issue` and `user`.
//!
//! `time_spent` is stored in minutes.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrmTimeLog::Table)
                    .if_not_exists()
                    .col(uuid(CrmTimeLog::Id).primary_key())
                    .col(uuid(CrmTimeLog::IssueId).not_null())
                    .col(uuid(CrmTimeLog::UserId).not_null())
                    .col(integer(CrmTimeLog::TimeSpent).not_null())
                    .col(ColumnDef::new(CrmTimeLog::Description).text().null())
                    .col(timestamp_with_time_zone(CrmTimeLog::LoggedAt).not_null())
                    .col(timestamp_with_time_zone(CrmTimeLog::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_time_log_issue")
                            .from(CrmTimeLog::Table, CrmTimeLog::IssueId)
                            .to(CrmIssue::Table, CrmIssue::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_time_log_user")
                            .from(CrmTimeLog::Table, CrmTimeLog::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CrmTimeLog::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CrmTimeLog { Table, Id, IssueId, UserId, TimeSpent, Description, LoggedAt, CreatedAt }

#[derive(DeriveIden)]
enum CrmIssue { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
