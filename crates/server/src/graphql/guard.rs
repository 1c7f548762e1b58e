//! Caller identity and workspace-membership checks shared by every resolver.

use std::sync::Arc;

use async_graphql::{Context, Result, ID};
use uuid::Uuid;

use common::types::CurrentUser;
use service::access::{Resource, Scope, WorkspaceAccess};
use service::CrmService;

use super::errors::{bad_input, forbidden, unauthenticated, GqlResultExt};

pub fn current_user(ctx: &Context<'_>) -> Result<Uuid> {
    ctx.data_opt::<CurrentUser>().map(|u| u.id).ok_or_else(unauthenticated)
}

pub fn crm<'a>(ctx: &'a Context<'_>) -> Result<&'a CrmService> {
    ctx.data::<CrmService>()
}

pub fn parse_id(id: &ID) -> Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| bad_input(format!("invalid id: {}", id.as_str())))
}

pub fn parse_opt_id(id: Option<&ID>) -> Result<Option<Uuid>> {
    id.map(parse_id).transpose()
}

/// Resolve the resource's workspace, then require the caller to be a member of it.
/// A missing resource surfaces as NOT_FOUND before membership is consulted.
pub async fn authorize(ctx: &Context<'_>, resource: Resource, denied: &str) -> Result<(Uuid, Scope)> {
    let user_id = current_user(ctx)?;
    let scope = crm(ctx)?.resolve_scope(resource).await.gql()?;
    let access = ctx.data::<Arc<dyn WorkspaceAccess>>()?;
    if !access.is_workspace_member(scope.workspace_id, user_id).await.gql()? {
        tracing::info!(%user_id, workspace_id = %scope.workspace_id, ?resource, "crm access denied");
        return Err(forbidden(denied));
    }
    Ok((user_id, scope))
}

/// `authorize`, then require the caller to own the row (comment author, time-log user).
pub async fn authorize_owner(ctx: &Context<'_>, resource: Resource, denied: &str, not_owner: &str) -> Result<Uuid> {
    let (user_id, scope) = authorize(ctx, resource, denied).await?;
    if scope.owner_id != Some(user_id) {
        tracing::info!(%user_id, ?resource, "crm ownership check failed");
        return Err(forbidden(not_owner));
    }
    Ok(user_id)
}
