//! Create `crm_comment` table with FKs to `crm_issue` and `user` (author).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrmComment::Table)
                    .if_not_exists()
                    .col(uuid(CrmComment::Id).primary_key())
                    .col(text(CrmComment::Content).not_null())
                    .col(uuid(CrmComment::IssueId).not_null())
                    .col(uuid(CrmComment::AuthorId).not_null())
                    .col(timestamp_with_time_zone(CrmComment::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(CrmComment::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_comment_issue")
                            .from(CrmComment::Table, CrmComment::IssueId)
                            .to(CrmIssue::Table, CrmIssue::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_comment_author")
                            .from(CrmComment::Table, CrmComment::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CrmComment::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CrmComment { Table, Id, Content, IssueId, AuthorId, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum CrmIssue { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
