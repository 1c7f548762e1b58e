use async_graphql::{Context, InputObject, MaybeUndefined, Object, Result, ID};
use chrono::{DateTime, Utc};

use models::IssueRecord;
use service::access::Resource;
use service::crm::{IssueFilters, IssuePatch, NewIssue};

use super::comment::CrmCommentType;
use super::errors::GqlResultExt;
use super::guard::{authorize, crm, parse_id, parse_opt_id};
use super::project::CrmProjectType;
use super::sprint::CrmSprintType;
use super::time_log::CrmTimeLogType;
use super::types::{count, from_utc, patch, patch_id, to_id, utc, IssueKind, IssuePriority, IssueStatus, IssueStatusCount, UserInfo};

const NO_ISSUE_ACCESS: &str = "No access to this issue";
const NO_PROJECT_ACCESS: &str = "No access to this project";

/// An issue plus whatever relations the query that produced it loaded.
pub struct CrmIssueType(pub IssueRecord);

impl From<models::crm_issue::Model> for CrmIssueType {
    fn from(issue: models::crm_issue::Model) -> Self {
        Self(IssueRecord::bare(issue))
    }
}

#[Object]
impl CrmIssueType {
    async fn id(&self) -> ID { to_id(self.0.issue.id) }
    async fn title(&self) -> &str { &self.0.issue.title }
    async fn description(&self) -> Option<&str> { self.0.issue.description.as_deref() }
    async fn status(&self) -> IssueStatus { self.0.issue.status.into() }
    async fn priority(&self) -> IssuePriority { self.0.issue.priority.into() }
    #[graphql(name = "type")]
    async fn issue_type(&self) -> IssueKind { self.0.issue.issue_type.into() }
    async fn project_id(&self) -> ID { to_id(self.0.issue.project_id) }
    async fn assignee_id(&self) -> Option<ID> { self.0.issue.assignee_id.map(to_id) }
    async fn reporter_id(&self) -> ID { to_id(self.0.issue.reporter_id) }
    async fn sprint_id(&self) -> Option<ID> { self.0.issue.sprint_id.map(to_id) }
    async fn parent_id(&self) -> Option<ID> { self.0.issue.parent_id.map(to_id) }
    async fn story_points(&self) -> Option<i32> { self.0.issue.story_points }
    async fn due_date(&self) -> Option<DateTime<Utc>> { self.0.issue.due_date.map(utc) }
    async fn created_at(&self) -> DateTime<Utc> { utc(self.0.issue.created_at) }
    async fn updated_at(&self) -> DateTime<Utc> { utc(self.0.issue.updated_at) }

    async fn project(&self) -> Option<CrmProjectType> { self.0.project.clone().map(Into::into) }
    async fn assignee(&self) -> Option<UserInfo> { self.0.assignee.clone().map(Into::into) }
    async fn reporter(&self) -> Option<UserInfo> { self.0.reporter.clone().map(Into::into) }
    async fn sprint(&self) -> Option<CrmSprintType> { self.0.sprint.clone().map(Into::into) }
    async fn comments_count(&self) -> Option<i32> { count(self.0.comments_count) }
    async fn time_logs_count(&self) -> Option<i32> { count(self.0.time_logs_count) }

    // Relation fields below are resolved per parent; the parent was already authorized.

    async fn comments(&self, ctx: &Context<'_>) -> Result<Vec<CrmCommentType>> {
        let comments = match &self.0.comments {
            Some(loaded) => loaded.clone(),
            None => crm(ctx)?.get_comments_by_issue(self.0.issue.id).await.gql()?,
        };
        Ok(comments.into_iter().map(CrmCommentType).collect())
    }

    async fn time_logs(&self, ctx: &Context<'_>) -> Result<Vec<CrmTimeLogType>> {
        let logs = match &self.0.time_logs {
            Some(loaded) => loaded.clone(),
            None => crm(ctx)?.get_time_logs_by_issue(self.0.issue.id).await.gql()?,
        };
        Ok(logs.into_iter().map(CrmTimeLogType).collect())
    }

    /// Minutes logged against this issue; 0 when nothing was logged.
    async fn total_time_spent(&self, ctx: &Context<'_>) -> Result<i64> {
        crm(ctx)?.get_total_time_spent(self.0.issue.id).await.gql()
    }

    async fn subtasks(&self, ctx: &Context<'_>) -> Result<Vec<CrmIssueType>> {
        let subtasks = crm(ctx)?.get_subtasks(self.0.issue.id).await.gql()?;
        Ok(subtasks.into_iter().map(CrmIssueType).collect())
    }
}

#[derive(InputObject)]
pub struct CreateIssueInput {
    pub title: String,
    pub description: Option<String>,
    pub project_id: ID,
    pub assignee_id: Option<ID>,
    /// Defaults to the caller.
    pub reporter_id: Option<ID>,
    pub sprint_id: Option<ID>,
    pub parent_id: Option<ID>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    #[graphql(name = "type")]
    pub issue_type: Option<IssueKind>,
    pub story_points: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(InputObject)]
pub struct UpdateIssueInput {
    pub title: Option<String>,
    pub description: MaybeUndefined<String>,
    pub assignee_id: MaybeUndefined<ID>,
    pub sprint_id: MaybeUndefined<ID>,
    pub parent_id: MaybeUndefined<ID>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    #[graphql(name = "type")]
    pub issue_type: Option<IssueKind>,
    pub story_points: MaybeUndefined<i32>,
    pub due_date: MaybeUndefined<DateTime<Utc>>,
}

#[derive(Default)]
pub struct IssueQuery;

#[Object]
impl IssueQuery {
    async fn crm_issue(&self, ctx: &Context<'_>, id: ID) -> Result<CrmIssueType> {
        let id = parse_id(&id)?;
        authorize(ctx, Resource::Issue(id), NO_ISSUE_ACCESS).await?;
        Ok(CrmIssueType(crm(ctx)?.get_issue(id).await.gql()?))
    }

    async fn crm_issues_by_project(
        &self,
        ctx: &Context<'_>,
        project_id: ID,
        status: Option<IssueStatus>,
        assignee_id: Option<ID>,
        sprint_id: Option<ID>,
        #[graphql(name = "type")] issue_type: Option<IssueKind>,
        priority: Option<IssuePriority>,
    ) -> Result<Vec<CrmIssueType>> {
        let project_id = parse_id(&project_id)?;
        authorize(ctx, Resource::Project(project_id), NO_PROJECT_ACCESS).await?;
        let filters = IssueFilters {
            status: status.map(Into::into),
            assignee_id: parse_opt_id(assignee_id.as_ref())?,
            sprint_id: parse_opt_id(sprint_id.as_ref())?,
            issue_type: issue_type.map(Into::into),
            priority: priority.map(Into::into),
        };
        let issues = crm(ctx)?.get_issues_by_project(project_id, filters).await.gql()?;
        Ok(issues.into_iter().map(CrmIssueType).collect())
    }

    /// Issue count per status for a project; every status is listed, zero-filled.
    async fn crm_issue_status_count(&self, ctx: &Context<'_>, project_id: ID) -> Result<Vec<IssueStatusCount>> {
        let project_id = parse_id(&project_id)?;
        authorize(ctx, Resource::Project(project_id), NO_PROJECT_ACCESS).await?;
        let counts = crm(ctx)?.get_issue_status_count(project_id).await.gql()?;
        Ok(counts.into_iter().map(Into::into).collect())
    }
}

#[derive(Default)]
pub struct IssueMutation;

#[Object]
impl IssueMutation {
    async fn create_crm_issue(&self, ctx: &Context<'_>, input: CreateIssueInput) -> Result<CrmIssueType> {
        let project_id = parse_id(&input.project_id)?;
        let (caller, _) = authorize(ctx, Resource::Project(project_id), NO_PROJECT_ACCESS).await?;
        let new = NewIssue {
            title: input.title,
            description: input.description,
            status: input.status.map(Into::into),
            priority: input.priority.map(Into::into),
            issue_type: input.issue_type.map(Into::into),
            project_id,
            assignee_id: parse_opt_id(input.assignee_id.as_ref())?,
            reporter_id: parse_opt_id(input.reporter_id.as_ref())?.unwrap_or(caller),
            sprint_id: parse_opt_id(input.sprint_id.as_ref())?,
            parent_id: parse_opt_id(input.parent_id.as_ref())?,
            story_points: input.story_points,
            due_date: input.due_date.map(from_utc),
        };
        Ok(CrmIssueType(crm(ctx)?.create_issue(new).await.gql()?))
    }

    async fn update_crm_issue(&self, ctx: &Context<'_>, id: ID, input: UpdateIssueInput) -> Result<CrmIssueType> {
        let id = parse_id(&id)?;
        authorize(ctx, Resource::Issue(id), NO_ISSUE_ACCESS).await?;
        let changes = IssuePatch {
            title: input.title,
            description: patch(input.description),
            status: input.status.map(Into::into),
            priority: input.priority.map(Into::into),
            issue_type: input.issue_type.map(Into::into),
            assignee_id: patch_id(input.assignee_id)?,
            sprint_id: patch_id(input.sprint_id)?,
            parent_id: patch_id(input.parent_id)?,
            story_points: patch(input.story_points),
            due_date: patch(input.due_date).map(|d| d.map(from_utc)),
        };
        Ok(CrmIssueType(crm(ctx)?.update_issue(id, changes).await.gql()?))
    }

    async fn delete_crm_issue(&self, ctx: &Context<'_>, id: ID) -> Result<CrmIssueType> {
        let id = parse_id(&id)?;
        authorize(ctx, Resource::Issue(id), NO_ISSUE_ACCESS).await?;
        Ok(crm(ctx)?.delete_issue(id).await.gql()?.into())
    }
}
