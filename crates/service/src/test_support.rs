#![cfg(test)]
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use uuid::Uuid;

use models::{db::connect_with_config, user, workspace, workspace_member};

use crate::crm::{CrmService, NewProject};

/// Fresh in-memory database with the schema applied; one per test.
pub async fn get_db() -> DatabaseConnection {
    let cfg = configs::DatabaseConfig { url: "sqlite::memory:".into(), ..Default::default() };
    let db = connect_with_config(&cfg).await.expect("connect sqlite");
    migration::Migrator::up(&db, None).await.expect("migrate up");
    db
}

/// A workspace with two members (`member`, `other_member`), one outsider and a project.
pub struct World {
    pub svc: CrmService,
    pub workspace_id: Uuid,
    pub member: Uuid,
    pub outsider: Uuid,
    pub other_member: Uuid,
    pub project_id: Uuid,
}

pub async fn world() -> World {
    let db = get_db().await;
    let ws = workspace::create(&db, "Acme").await.expect("workspace");
    let member = user::create(&db, "u1@example.com", "U1").await.expect("u1");
    let outsider = user::create(&db, "u2@example.com", "U2").await.expect("u2");
    let other = user::create(&db, "u3@example.com", "U3").await.expect("u3");
    workspace_member::add(&db, ws.id, member.id, Some("owner")).await.expect("member u1");
    workspace_member::add(&db, ws.id, other.id, None).await.expect("member u3");

    let svc = CrmService::new(db);
    let project = svc
        .create_project(NewProject {
            name: "Platform".into(),
            key: "PLAT".into(),
            description: None,
            workspace_id: ws.id,
            lead_id: Some(member.id),
        })
        .await
        .expect("project");
    World {
        svc,
        workspace_id: ws.id,
        member: member.id,
        outsider: outsider.id,
        other_member: other.id,
        project_id: project.project.id,
    }
}
