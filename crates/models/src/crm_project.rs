use sea_orm::{entity::prelude::*, ActiveValue::Unchanged, ConnectionTrait, PaginatorTrait, QueryOrder, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{self, ModelError};
use crate::records::ProjectRecord;
use crate::{crm_issue, user, workspace};

pub const ENTITY: &str = "project";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "crm_project")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub key: String,
    pub description: Option<String>,
    pub workspace_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Workspace,
    Lead,
    Issues,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Workspace => Entity::belongs_to(workspace::Entity).from(Column::WorkspaceId).to(workspace::Column::Id).into(),
            Relation::Lead => Entity::belongs_to(user::Entity).from(Column::LeadId).to(user::Column::Id).into(),
            Relation::Issues => Entity::has_many(crm_issue::Entity).into(),
        }
    }
}

impl Related<crm_issue::Entity> for Entity {
    fn to() -> RelationDef { Relation::Issues.def() }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, Default)]
pub struct NewProject {
    pub name: String,
    pub key: String,
    pub description: Option<String>,
    pub workspace_id: Uuid,
    pub lead_id: Option<Uuid>,
}

/// Partial update. `None` leaves a column alone; `Some(None)` clears a nullable one.
#[derive(Clone, Debug, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub key: Option<String>,
    pub description: Option<Option<String>>,
    pub lead_id: Option<Option<Uuid>>,
}

/// Upper-cases and checks a project key: 2 to 10 ASCII letters or digits.
pub fn normalize_key(key: &str) -> Result<String, ModelError> {
    let key = key.trim().to_ascii_uppercase();
    if key.is_empty() {
        return Err(ModelError::Validation("key required".into()));
    }
    if !(2..=10).contains(&key.len()) || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ModelError::Validation("key must be 2-10 letters or digits".into()));
    }
    Ok(key)
}

async fn with_lead<C: ConnectionTrait>(db: &C, project: Model) -> Result<ProjectRecord, ModelError> {
    let lead = match project.lead_id {
        Some(id) => user::get(db, id).await?,
        None => None,
    };
    Ok(ProjectRecord { project, lead, issues_count: None })
}

pub async fn find<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

pub async fn get<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<ProjectRecord>, ModelError> {
    match find(db, id).await? {
        Some(m) => Ok(Some(with_lead(db, m).await?)),
        None => Ok(None),
    }
}

pub async fn list_by_workspace<C: ConnectionTrait>(db: &C, workspace_id: Uuid) -> Result<Vec<ProjectRecord>, ModelError> {
    let projects = Entity::find()
        .filter(Column::WorkspaceId.eq(workspace_id))
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?;
    let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
    let counts = crm_issue::count_by_projects(db, &ids).await?;
    let leads = user::infos_by_ids(db, projects.iter().filter_map(|p| p.lead_id)).await?;
    Ok(projects
        .into_iter()
        .map(|p| ProjectRecord {
            lead: p.lead_id.and_then(|id| leads.get(&id).cloned()),
            issues_count: Some(counts.get(&p.id).copied().unwrap_or(0)),
            project: p,
        })
        .collect())
}

pub async fn count_by_workspace<C: ConnectionTrait>(db: &C, workspace_id: Uuid) -> Result<u64, ModelError> {
    Ok(Entity::find().filter(Column::WorkspaceId.eq(workspace_id)).count(db).await?)
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewProject) -> Result<ProjectRecord, ModelError> {
    errors::require_non_empty(&input.name, "name")?;
    let key = normalize_key(&input.key)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name.trim().to_string()),
        key: Set(key),
        description: Set(input.description),
        workspace_id: Set(input.workspace_id),
        lead_id: Set(input.lead_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let m = am.insert(db).await?;
    with_lead(db, m).await
}

pub async fn update<C: ConnectionTrait>(db: &C, id: Uuid, patch: ProjectPatch) -> Result<ProjectRecord, ModelError> {
    let mut am = ActiveModel { id: Unchanged(id), ..Default::default() };
    if let Some(name) = patch.name {
        errors::require_non_empty(&name, "name")?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(key) = patch.key {
        am.key = Set(normalize_key(&key)?);
    }
    if let Some(description) = patch.description {
        am.description = Set(description);
    }
    if let Some(lead_id) = patch.lead_id {
        am.lead_id = Set(lead_id);
    }
    am.updated_at = Set(Utc::now().into());
    let m = am.update(db).await.map_err(|e| ModelError::missing_row(e, ENTITY, id))?;
    with_lead(db, m).await
}

/// Deletes the project row only; dependent rows are the caller's concern.
pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Model, ModelError> {
    let found = find(db, id).await?.ok_or_else(|| ModelError::not_found(ENTITY, id))?;
    Entity::delete_by_id(id).exec(db).await?;
    Ok(found)
}
