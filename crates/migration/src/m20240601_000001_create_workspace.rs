//! Create `workspace` table.
//!
//! Root tenant container; CRM projects reference it.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Workspace::Table)
                    .if_not_exists()
                    .col(uuid(Workspace::Id).primary_key())
                    .col(string_len(Workspace::Name, 128).not_null())
                    .col(timestamp_with_time_zone(Workspace::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Workspace::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Workspace { Table, Id, Name, CreatedAt }
