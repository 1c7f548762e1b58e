//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_workspace;
mod m20240601_000002_create_user;
mod m20240601_000003_create_workspace_member;
mod m20240601_000004_create_crm_project;
mod m20240601_000005_create_crm_sprint;
mod m20240601_000006_create_crm_issue;
mod m20240601_000007_create_crm_comment;
mod m20240601_000008_create_crm_time_log;
mod m20240601_000009_add_crm_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_workspace::Migration),
            Box::new(m20240601_000002_create_user::Migration),
            Box::new(m20240601_000003_create_workspace_member::Migration),
            Box::new(m20240601_000004_create_crm_project::Migration),
            Box::new(m20240601_000005_create_crm_sprint::Migration),
            Box::new(m20240601_000006_create_crm_issue::Migration),
            Box::new(m20240601_000007_create_crm_comment::Migration),
            Box::new(m20240601_000008_create_crm_time_log::Migration),
            // Indexes should always be applied last
            Box::new(m20240601_000009_add_crm_indexes::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm_migration::sea_orm::Database;

    #[tokio::test]
    async fn up_and_down_on_sqlite() -> Result<(), DbErr> {
        let db = Database::connect("sqlite::memory:").await?;
        Migrator::up(&db, None).await?;
        let manager = SchemaManager::new(&db);
        for table in ["workspace", "user", "workspace_member", "crm_project", "crm_sprint", "crm_issue", "crm_comment", "crm_time_log"] {
            assert!(manager.has_table(table).await?, "missing table {table}");
        }
        Migrator::down(&db, None).await?;
        assert!(!manager.has_table("crm_issue").await?);
        Ok(())
    }
}
