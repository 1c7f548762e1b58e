use async_graphql::{Context, InputObject, Object, Result, ID};
use chrono::{DateTime, Utc};

use models::CommentRecord;
use service::access::Resource;
use service::crm::NewComment;

use super::errors::GqlResultExt;
use super::guard::{authorize, authorize_owner, crm, parse_id};
use super::types::{to_id, utc, UserInfo};

pub struct CrmCommentType(pub CommentRecord);

impl From<models::crm_comment::Model> for CrmCommentType {
    fn from(comment: models::crm_comment::Model) -> Self {
        Self(CommentRecord { comment, author: None })
    }
}

#[Object]
impl CrmCommentType {
    async fn id(&self) -> ID { to_id(self.0.comment.id) }
    async fn content(&self) -> &str { &self.0.comment.content }
    async fn issue_id(&self) -> ID { to_id(self.0.comment.issue_id) }
    async fn author_id(&self) -> ID { to_id(self.0.comment.author_id) }
    async fn author(&self) -> Option<UserInfo> { self.0.author.clone().map(Into::into) }
    async fn created_at(&self) -> DateTime<Utc> { utc(self.0.comment.created_at) }
    async fn updated_at(&self) -> DateTime<Utc> { utc(self.0.comment.updated_at) }
}

#[derive(InputObject)]
pub struct CreateCommentInput {
    pub content: String,
    pub issue_id: ID,
}

#[derive(InputObject)]
pub struct UpdateCommentInput {
    pub content: String,
}

#[derive(Default)]
pub struct CommentMutation;

#[Object]
impl CommentMutation {
    /// The author is always the caller.
    async fn create_crm_comment(&self, ctx: &Context<'_>, input: CreateCommentInput) -> Result<CrmCommentType> {
        let issue_id = parse_id(&input.issue_id)?;
        let (caller, _) = authorize(ctx, Resource::Issue(issue_id), "No access to this issue").await?;
        let new = NewComment { content: input.content, issue_id, author_id: caller };
        Ok(CrmCommentType(crm(ctx)?.create_comment(new).await.gql()?))
    }

    async fn update_crm_comment(&self, ctx: &Context<'_>, id: ID, input: UpdateCommentInput) -> Result<CrmCommentType> {
        let id = parse_id(&id)?;
        authorize_owner(ctx, Resource::Comment(id), "No access to this comment", "Can only edit your own comments").await?;
        Ok(CrmCommentType(crm(ctx)?.update_comment(id, Some(input.content)).await.gql()?))
    }

    async fn delete_crm_comment(&self, ctx: &Context<'_>, id: ID) -> Result<CrmCommentType> {
        let id = parse_id(&id)?;
        authorize_owner(ctx, Resource::Comment(id), "No access to this comment", "Can only delete your own comments").await?;
        Ok(crm(ctx)?.delete_comment(id).await.gql()?.into())
    }
}
