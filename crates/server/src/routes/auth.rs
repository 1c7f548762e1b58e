use axum::{extract::{Request, State}, http::StatusCode, middleware::Next, response::Response};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{metrics::Metrics, types::CurrentUser};
use service::CrmService;

use crate::graphql::CrmSchema;

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
}

#[derive(Clone)]
pub struct ServerState {
    pub crm: CrmService,
    pub schema: CrmSchema,
    pub metrics: Metrics,
    pub auth: ServerAuthConfig,
    pub playground: bool,
}

/// Bearer token payload; `uid` names the calling user.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub uid: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
}

const AUTH_COOKIE: &str = "auth_token";

fn is_public(method: &axum::http::Method, path: &str) -> bool {
    path == "/health"
        || path == "/metrics"
        || (path == "/graphql" && method == axum::http::Method::GET)
        || method == axum::http::Method::OPTIONS
}

/// 全局中间件：除健康检查、指标、GraphiQL 与预检外，校验 Authorization: Bearer <token>
/// 缺失 token 返回 400，非法、过期或 uid 无效返回 401；校验通过后注入 CurrentUser
pub async fn require_bearer_token_state(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if is_public(&method, &path) {
        return Ok(next.run(req).await);
    }

    // 读取 Authorization 头；如缺失则回退从 Cookie 中解析 auth_token
    let token = {
        let authz = req
            .headers()
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        if let Some(h) = authz {
            match h.strip_prefix("Bearer ") {
                Some(t) if !t.trim().is_empty() => t.trim().to_string(),
                _ => {
                    tracing::warn!(path = %path, "invalid Authorization format (expect Bearer)");
                    return Err(StatusCode::UNAUTHORIZED);
                }
            }
        } else {
            let cookie_header = req
                .headers()
                .get(axum::http::header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            let token_val = cookie_header
                .split(';')
                .find_map(|part| part.trim().strip_prefix("auth_token="))
                .map(str::to_string);

            match token_val {
                Some(t) if !t.is_empty() => t,
                _ => {
                    tracing::warn!(path = %path, "missing Authorization header and {AUTH_COOKIE} cookie");
                    return Err(StatusCode::BAD_REQUEST);
                }
            }
        }
    };

    let user_id = verify_token(&state.auth.jwt_secret, &token).map_err(|e| {
        tracing::error!(path = %path, err = %e, "token validation failed");
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(CurrentUser { id: user_id });
    Ok(next.run(req).await)
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("uid claim is not a uuid: {0}")]
    BadUid(String),
}

/// Decode an HS256 token and return the caller id from its `uid` claim.
pub fn verify_token(secret: &str, token: &str) -> Result<Uuid, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &key, &validation)?;
    Uuid::parse_str(&data.claims.uid).map_err(|_| TokenError::BadUid(data.claims.uid))
}
