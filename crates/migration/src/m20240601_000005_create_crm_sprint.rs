//! Create `crm_sprint` table with FK to `crm_project`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrmSprint::Table)
                    .if_not_exists()
                    .col(uuid(CrmSprint::Id).primary_key())
                    .col(string_len(CrmSprint::Name, 255).not_null())
                    .col(ColumnDef::new(CrmSprint::Goal).text().null())
                    .col(uuid(CrmSprint::ProjectId).not_null())
                    .col(timestamp_with_time_zone(CrmSprint::StartDate).not_null())
                    .col(timestamp_with_time_zone(CrmSprint::EndDate).not_null())
                    .col(boolean(CrmSprint::IsActive).not_null())
                    .col(timestamp_with_time_zone(CrmSprint::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(CrmSprint::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crm_sprint_project")
                            .from(CrmSprint::Table, CrmSprint::ProjectId)
                            .to(CrmProject::Table, CrmProject::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CrmSprint::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CrmSprint { Table, Id, Name, Goal, ProjectId, StartDate, EndDate, IsActive, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum CrmProject { Table, Id }
