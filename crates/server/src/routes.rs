use std::time::Instant;

use async_graphql::{http::GraphiQLSource, Value};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::{CurrentUser, Health};

pub mod auth;

use auth::ServerState;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics(State(state): State<ServerState>) -> (StatusCode, String) {
    state.metrics.encode()
}

/// Outcome label for the operations counter: `ok` or the first error's code.
fn outcome(resp: &async_graphql::Response) -> String {
    match resp.errors.first() {
        None => "ok".to_string(),
        Some(err) => match err.extensions.as_ref().and_then(|x| x.get("code")) {
            Some(Value::String(code)) => code.clone(),
            _ => "GRAPHQL_ERROR".to_string(),
        },
    }
}

async fn graphql(
    State(state): State<ServerState>,
    user: Option<Extension<CurrentUser>>,
    Json(req): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let started = Instant::now();
    let mut req = req;
    if let Some(Extension(user)) = user {
        req = req.data(user);
    }
    let resp = state.schema.execute(req).await;
    let outcome = outcome(&resp);
    state.metrics.observe(&outcome, started.elapsed().as_secs_f64());
    if outcome != "ok" {
        tracing::debug!(%outcome, "graphql operation failed");
    }
    Json(resp)
}

async fn graphiql(State(state): State<ServerState>) -> Response {
    if !state.playground {
        return StatusCode::NOT_FOUND.into_response();
    }
    Html(GraphiQLSource::build().endpoint("/graphql").finish()).into_response()
}

/// Build the application router: health, metrics and the GraphQL endpoint behind bearer auth
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/graphql", get(graphiql).post(graphql))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token_state))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径等，日志级别为 INFO
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 请求到达时打点
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                // 响应返回时打点，包含状态码与耗时
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
