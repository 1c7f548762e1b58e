

use sea_orm::DatabaseConnection;
use migration::MigratorTrait;

use crate::{crm_project, db, user, workspace, workspace_member};

/// Fresh in-memory SQLite with the full schema applied.
pub(crate) async fn setup() -> DatabaseConnection {
    let cfg = configs::DatabaseConfig { url: "sqlite::memory:".into(), ..Default::default() };
    let db = db::connect_with_config(&cfg).await.expect("connect sqlite");
    migration::Migrator::up(&db, None).await.expect("migrate up");
    db
}

pub(crate) struct Fixture {
    pub db: DatabaseConnection,
    pub workspace: workspace::Model,
    pub user: user::Model,
    pub project: crm_project::Model,
}

/// One workspace, one member user and one project led by that user.
pub(crate) async fn fixture() -> Fixture {
    let db = setup().await;
    let ws = workspace::create(&db, "Acme").await.expect("workspace");
    let u = user::create(&db, "alice@example.com", "Alice").await.expect("user");
    workspace_member::add(&db, ws.id, u.id, None).await.expect("member");
    let project = crm_project::create(
        &db,
        crm_project::NewProject {
            name: "Platform".into(),
            key: "plat".into(),
            description: None,
            workspace_id: ws.id,
            lead_id: Some(u.id),
        },
    )
    .await
    .expect("project")
    .project;
    Fixture { db, workspace: ws, user: u, project }
}
