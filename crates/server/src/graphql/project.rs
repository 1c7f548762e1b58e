use async_graphql::{Context, InputObject, MaybeUndefined, Object, Result, ID};
use chrono::{DateTime, Utc};

use models::ProjectRecord;
use service::access::Resource;
use service::crm::{NewProject, ProjectPatch};

use super::errors::GqlResultExt;
use super::guard::{authorize, crm, parse_id, parse_opt_id};
use super::types::{count, to_id, patch, patch_id, utc, UserInfo};

const NO_PROJECT_ACCESS: &str = "No access to this project";
const NO_WORKSPACE_ACCESS: &str = "No access to this workspace";

pub struct CrmProjectType(pub ProjectRecord);

impl From<models::crm_project::Model> for CrmProjectType {
    fn from(project: models::crm_project::Model) -> Self {
        Self(ProjectRecord { project, lead: None, issues_count: None })
    }
}

#[Object]
impl CrmProjectType {
    async fn id(&self) -> ID { to_id(self.0.project.id) }
    async fn name(&self) -> &str { &self.0.project.name }
    async fn key(&self) -> &str { &self.0.project.key }
    async fn description(&self) -> Option<&str> { self.0.project.description.as_deref() }
    async fn workspace_id(&self) -> ID { to_id(self.0.project.workspace_id) }
    async fn lead_id(&self) -> Option<ID> { self.0.project.lead_id.map(to_id) }
    async fn lead(&self) -> Option<UserInfo> { self.0.lead.clone().map(Into::into) }
    async fn created_at(&self) -> DateTime<Utc> { utc(self.0.project.created_at) }
    async fn updated_at(&self) -> DateTime<Utc> { utc(self.0.project.updated_at) }
    async fn issues_count(&self) -> Option<i32> { count(self.0.issues_count) }
}

#[derive(InputObject)]
pub struct CreateProjectInput {
    pub name: String,
    pub key: String,
    pub description: Option<String>,
    pub workspace_id: ID,
    pub lead_id: Option<ID>,
}

#[derive(InputObject)]
pub struct UpdateProjectInput {
    pub name: Option<String>,
    pub key: Option<String>,
    pub description: MaybeUndefined<String>,
    pub lead_id: MaybeUndefined<ID>,
}

#[derive(Default)]
pub struct ProjectQuery;

#[Object]
impl ProjectQuery {
    async fn crm_project(&self, ctx: &Context<'_>, id: ID) -> Result<CrmProjectType> {
        let id = parse_id(&id)?;
        authorize(ctx, Resource::Project(id), NO_PROJECT_ACCESS).await?;
        Ok(CrmProjectType(crm(ctx)?.get_project(id).await.gql()?))
    }

    async fn crm_projects_by_workspace(&self, ctx: &Context<'_>, workspace_id: ID) -> Result<Vec<CrmProjectType>> {
        let workspace_id = parse_id(&workspace_id)?;
        authorize(ctx, Resource::Workspace(workspace_id), NO_WORKSPACE_ACCESS).await?;
        let projects = crm(ctx)?.get_projects_by_workspace(workspace_id).await.gql()?;
        Ok(projects.into_iter().map(CrmProjectType).collect())
    }
}

#[derive(Default)]
pub struct ProjectMutation;

#[Object]
impl ProjectMutation {
    async fn create_crm_project(&self, ctx: &Context<'_>, input: CreateProjectInput) -> Result<CrmProjectType> {
        let workspace_id = parse_id(&input.workspace_id)?;
        authorize(ctx, Resource::Workspace(workspace_id), NO_WORKSPACE_ACCESS).await?;
        let new = NewProject {
            name: input.name,
            key: input.key,
            description: input.description,
            workspace_id,
            lead_id: parse_opt_id(input.lead_id.as_ref())?,
        };
        Ok(CrmProjectType(crm(ctx)?.create_project(new).await.gql()?))
    }

    async fn update_crm_project(&self, ctx: &Context<'_>, id: ID, input: UpdateProjectInput) -> Result<CrmProjectType> {
        let id = parse_id(&id)?;
        authorize(ctx, Resource::Project(id), NO_PROJECT_ACCESS).await?;
        let changes = ProjectPatch {
            name: input.name,
            key: input.key,
            description: patch(input.description),
            lead_id: patch_id(input.lead_id)?,
        };
        Ok(CrmProjectType(crm(ctx)?.update_project(id, changes).await.gql()?))
    }

    async fn delete_crm_project(&self, ctx: &Context<'_>, id: ID) -> Result<CrmProjectType> {
        let id = parse_id(&id)?;
        authorize(ctx, Resource::Project(id), NO_PROJECT_ACCESS).await?;
        Ok(crm(ctx)?.delete_project(id).await.gql()?.into())
    }
}
