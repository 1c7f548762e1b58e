#![allow(dead_code)]

use async_graphql::{Request, Response, Value, Variables};
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use common::types::CurrentUser;
use configs::AppConfig;
use models::{user, workspace, workspace_member};
use server::graphql::CrmSchema;
use server::routes::auth::{Claims, ServerState};

pub const SECRET: &str = "test-secret";

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.database.url = "sqlite::memory:".into();
    cfg.database.auto_migrate = true;
    cfg.auth.jwt_secret = SECRET.into();
    cfg.graphql.playground = true;
    cfg
}

/// W1 with members U1 and U3, non-member U2, and project P1 led by U3.
pub struct World {
    pub state: ServerState,
    pub workspace_id: Uuid,
    pub u1: Uuid,
    pub u2: Uuid,
    pub u3: Uuid,
    pub project_id: Uuid,
}

pub async fn world() -> anyhow::Result<World> {
    let state = server::build_state(&test_config()).await?;
    let db = state.crm.db();
    let ws = workspace::create(db, "W1").await?;
    let u1 = user::create(db, "u1@example.com", "U1").await?;
    let u2 = user::create(db, "u2@example.com", "U2").await?;
    let u3 = user::create(db, "u3@example.com", "U3").await?;
    workspace_member::add(db, ws.id, u1.id, None).await?;
    workspace_member::add(db, ws.id, u3.id, Some("owner")).await?;

    let mut w = World { state, workspace_id: ws.id, u1: u1.id, u2: u2.id, u3: u3.id, project_id: Uuid::nil() };
    let resp = w
        .exec(
            w.u3,
            "mutation($ws: ID!, $lead: ID) { createCrmProject(input: { name: \"Platform\", key: \"plat\", workspaceId: $ws, leadId: $lead }) { id } }",
            serde_json::json!({ "ws": w.workspace_id, "lead": w.u3 }),
        )
        .await;
    w.project_id = Uuid::parse_str(ok(&resp)["createCrmProject"]["id"].as_str().unwrap_or_default())?;
    Ok(w)
}

impl World {
    pub async fn exec(&self, caller: Uuid, query: &str, vars: serde_json::Value) -> Response {
        exec_on(&self.state.schema, caller, query, vars).await
    }

    pub async fn exec_anonymous(&self, query: &str) -> Response {
        self.state.schema.execute(Request::new(query)).await
    }

    pub fn token(&self, user_id: Uuid) -> String {
        token_for(&user_id.to_string(), 3600)
    }
}

/// Runs an operation as `caller` against any schema, e.g. one wired to a different membership source.
pub async fn exec_on(schema: &CrmSchema, caller: Uuid, query: &str, vars: serde_json::Value) -> Response {
    let req = Request::new(query)
        .variables(Variables::from_json(vars))
        .data(CurrentUser { id: caller });
    schema.execute(req).await
}

pub fn token_for(uid: &str, ttl_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims { uid: uid.into(), exp: (now + ttl_secs) as usize, iat: Some(now as usize) };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).expect("encode token")
}

/// Data of a successful response as JSON; panics with the errors otherwise.
pub fn ok(resp: &Response) -> serde_json::Value {
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    resp.data.clone().into_json().expect("data as json")
}

/// `extensions.code` of the first error.
pub fn error_code(resp: &Response) -> String {
    let err = resp.errors.first().expect("an error");
    match err.extensions.as_ref().and_then(|x| x.get("code")) {
        Some(Value::String(code)) => code.clone(),
        other => panic!("no code on {err:?}: {other:?}"),
    }
}

pub fn str_field(v: &serde_json::Value) -> String {
    v.as_str().expect("string field").to_string()
}
