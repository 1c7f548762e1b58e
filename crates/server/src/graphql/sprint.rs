use async_graphql::{Context, InputObject, MaybeUndefined, Object, Result, ID};
use chrono::{DateTime, Utc};

use models::SprintRecord;
use service::access::Resource;
use service::crm::{NewSprint, SprintPatch};

use super::errors::GqlResultExt;
use super::guard::{authorize, crm, parse_id};
use super::issue::CrmIssueType;
use super::project::CrmProjectType;
use super::types::{count, from_utc, patch, to_id, utc};

const NO_SPRINT_ACCESS: &str = "No access to this sprint";
const NO_PROJECT_ACCESS: &str = "No access to this project";

pub struct CrmSprintType(pub SprintRecord);

impl From<models::crm_sprint::Model> for CrmSprintType {
    fn from(sprint: models::crm_sprint::Model) -> Self {
        Self(SprintRecord { sprint, project: None, issues: None, issues_count: None })
    }
}

#[Object]
impl CrmSprintType {
    async fn id(&self) -> ID { to_id(self.0.sprint.id) }
    async fn name(&self) -> &str { &self.0.sprint.name }
    async fn goal(&self) -> Option<&str> { self.0.sprint.goal.as_deref() }
    async fn project_id(&self) -> ID { to_id(self.0.sprint.project_id) }
    async fn start_date(&self) -> DateTime<Utc> { utc(self.0.sprint.start_date) }
    async fn end_date(&self) -> DateTime<Utc> { utc(self.0.sprint.end_date) }
    async fn is_active(&self) -> bool { self.0.sprint.is_active }
    async fn created_at(&self) -> DateTime<Utc> { utc(self.0.sprint.created_at) }
    async fn updated_at(&self) -> DateTime<Utc> { utc(self.0.sprint.updated_at) }
    async fn issues_count(&self) -> Option<i32> { count(self.0.issues_count) }
    async fn project(&self) -> Option<CrmProjectType> { self.0.project.clone().map(Into::into) }

    /// Loaded by `crmSprint` only; list queries leave it null.
    async fn issues(&self) -> Option<Vec<CrmIssueType>> {
        self.0.issues.clone().map(|v| v.into_iter().map(CrmIssueType).collect())
    }
}

#[derive(InputObject)]
pub struct CreateSprintInput {
    pub name: String,
    pub goal: Option<String>,
    pub project_id: ID,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: Option<bool>,
}

#[derive(InputObject)]
pub struct UpdateSprintInput {
    pub name: Option<String>,
    pub goal: MaybeUndefined<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Default)]
pub struct SprintQuery;

#[Object]
impl SprintQuery {
    async fn crm_sprint(&self, ctx: &Context<'_>, id: ID) -> Result<CrmSprintType> {
        let id = parse_id(&id)?;
        authorize(ctx, Resource::Sprint(id), NO_SPRINT_ACCESS).await?;
        Ok(CrmSprintType(crm(ctx)?.get_sprint(id).await.gql()?))
    }

    async fn crm_sprints_by_project(&self, ctx: &Context<'_>, project_id: ID) -> Result<Vec<CrmSprintType>> {
        let project_id = parse_id(&project_id)?;
        authorize(ctx, Resource::Project(project_id), NO_PROJECT_ACCESS).await?;
        let sprints = crm(ctx)?.get_sprints_by_project(project_id).await.gql()?;
        Ok(sprints.into_iter().map(CrmSprintType).collect())
    }
}

#[derive(Default)]
pub struct SprintMutation;

#[Object]
impl SprintMutation {
    async fn create_crm_sprint(&self, ctx: &Context<'_>, input: CreateSprintInput) -> Result<CrmSprintType> {
        let project_id = parse_id(&input.project_id)?;
        authorize(ctx, Resource::Project(project_id), NO_PROJECT_ACCESS).await?;
        let new = NewSprint {
            name: input.name,
            goal: input.goal,
            project_id,
            start_date: from_utc(input.start_date),
            end_date: from_utc(input.end_date),
            is_active: input.is_active,
        };
        Ok(CrmSprintType(crm(ctx)?.create_sprint(new).await.gql()?))
    }

    async fn update_crm_sprint(&self, ctx: &Context<'_>, id: ID, input: UpdateSprintInput) -> Result<CrmSprintType> {
        let id = parse_id(&id)?;
        authorize(ctx, Resource::Sprint(id), NO_SPRINT_ACCESS).await?;
        let changes = SprintPatch {
            name: input.name,
            goal: patch(input.goal),
            start_date: input.start_date.map(from_utc),
            end_date: input.end_date.map(from_utc),
            is_active: input.is_active,
        };
        Ok(CrmSprintType(crm(ctx)?.update_sprint(id, changes).await.gql()?))
    }

    async fn delete_crm_sprint(&self, ctx: &Context<'_>, id: ID) -> Result<CrmSprintType> {
        let id = parse_id(&id)?;
        authorize(ctx, Resource::Sprint(id), NO_SPRINT_ACCESS).await?;
        Ok(crm(ctx)?.delete_sprint(id).await.gql()?.into())
    }
}
