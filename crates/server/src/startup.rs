use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::AppConfig;
use migration::{Migrator, MigratorTrait};
use tower_http::cors::CorsLayer;
use tracing::info;

use common::metrics::Metrics;
use service::{access::{SeaOrmWorkspaceAccess, WorkspaceAccess}, CrmService};

use crate::graphql::build_schema;
use crate::routes::{self, auth};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Connect to the store, optionally migrate, and assemble the shared request state.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<auth::ServerState> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    if cfg.database.auto_migrate {
        Migrator::up(&db, None).await?;
        info!(event = "migrations_applied", "database schema up to date");
    }

    let crm = CrmService::new(db.clone());
    let access: Arc<dyn WorkspaceAccess> = Arc::new(SeaOrmWorkspaceAccess::new(db));
    let schema = build_schema(crm.clone(), access, &cfg.graphql);

    Ok(auth::ServerState {
        crm,
        schema,
        metrics: Metrics::new()?,
        auth: auth::ServerAuthConfig { jwt_secret: cfg.auth.jwt_secret.clone() },
        playground: cfg.graphql.playground,
    })
}

pub fn build_app(state: auth::ServerState) -> Router {
    routes::build_router(state, build_cors())
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&cfg).await?;
    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, event = "listening", "starting crm server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
