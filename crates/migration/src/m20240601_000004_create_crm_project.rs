//! Create `crm_project` table with FKs to `workspace` and `user` (lead).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrmProject::Table)
                    .if_not_exists()
                    .col(uuid(CrmProject::Id).primary_key())
                    .col(string_len(CrmProject::Name, 255).not_null())
                    .col(string_len(CrmProject::Key, 16).unique_key().not_null())
                    .col(ColumnDef::new(CrmProject::Description).text().null())
                    .col(uuid(CrmProject::WorkspaceId).not_null())
                    .col(ColumnDef::new(CrmProject::LeadId).uuid().null())
                    .col(timestamp_with_time_zone(CrmProject::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(CrmProject::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_project_workspace")
                            .from(CrmProject::Table, CrmProject::WorkspaceId)
                            .to(Workspace::Table, Workspace::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_project_lead")
                            .from(CrmProject::Table, CrmProject::LeadId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CrmProject::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CrmProject { Table, Id, Name, Key, Description, WorkspaceId, LeadId, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Workspace { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
