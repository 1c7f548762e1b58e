use sea_orm::{entity::prelude::*, ActiveValue::Unchanged, ConnectionTrait, QueryOrder, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{self, ModelError};
use crate::records::SprintRecord;
use crate::{crm_issue, crm_project};

pub const ENTITY: &str = "sprint";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "crm_sprint")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub goal: Option<String>,
    pub project_id: Uuid,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Project,
    Issues,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Project => Entity::belongs_to(crm_project::Entity).from(Column::ProjectId).to(crm_project::Column::Id).into(),
            Relation::Issues => Entity::has_many(crm_issue::Entity).into(),
        }
    }
}

impl Related<crm_project::Entity> for Entity {
    fn to() -> RelationDef { Relation::Project.def() }
}

impl Related<crm_issue::Entity> for Entity {
    fn to() -> RelationDef { Relation::Issues.def() }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug)]
pub struct NewSprint {
    pub name: String,
    pub goal: Option<String>,
    pub project_id: Uuid,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    pub is_active: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct SprintPatch {
    pub name: Option<String>,
    pub goal: Option<Option<String>>,
    pub start_date: Option<DateTimeWithTimeZone>,
    pub end_date: Option<DateTimeWithTimeZone>,
    pub is_active: Option<bool>,
}

pub fn validate_window(start: &DateTimeWithTimeZone, end: &DateTimeWithTimeZone) -> Result<(), ModelError> {
    if end < start {
        return Err(ModelError::Validation("endDate must not be before startDate".into()));
    }
    Ok(())
}

async fn with_project<C: ConnectionTrait>(db: &C, sprint: Model) -> Result<SprintRecord, ModelError> {
    let project = crm_project::find(db, sprint.project_id).await?;
    Ok(SprintRecord { sprint, project, issues: None, issues_count: None })
}

pub async fn find<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// Sprint with its project and its issues (each with assignee and reporter).
pub async fn get<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<SprintRecord>, ModelError> {
    let Some(sprint) = find(db, id).await? else { return Ok(None) };
    let project = crm_project::find(db, sprint.project_id).await?;
    let issues = crm_issue::list_by_sprint(db, id).await?;
    Ok(Some(SprintRecord {
        sprint,
        project,
        issues_count: Some(issues.len() as u64),
        issues: Some(issues),
    }))
}

pub async fn list_by_project<C: ConnectionTrait>(db: &C, project_id: Uuid) -> Result<Vec<SprintRecord>, ModelError> {
    let sprints = Entity::find()
        .filter(Column::ProjectId.eq(project_id))
        .order_by_desc(Column::StartDate)
        .all(db)
        .await?;
    let ids: Vec<Uuid> = sprints.iter().map(|s| s.id).collect();
    let counts = crm_issue::count_by_sprints(db, &ids).await?;
    Ok(sprints
        .into_iter()
        .map(|s| SprintRecord {
            issues_count: Some(counts.get(&s.id).copied().unwrap_or(0)),
            sprint: s,
            project: None,
            issues: None,
        })
        .collect())
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewSprint) -> Result<SprintRecord, ModelError> {
    errors::require_non_empty(&input.name, "name")?;
    validate_window(&input.start_date, &input.end_date)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name.trim().to_string()),
        goal: Set(input.goal),
        project_id: Set(input.project_id),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        is_active: Set(input.is_active.unwrap_or(false)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let m = am.insert(db).await?;
    with_project(db, m).await
}

/// Applies the patch as given; the merged start/end window is checked by the caller,
/// which already holds the current row.
pub async fn update<C: ConnectionTrait>(db: &C, id: Uuid, patch: SprintPatch) -> Result<SprintRecord, ModelError> {
    let mut am = ActiveModel { id: Unchanged(id), ..Default::default() };
    if let Some(name) = patch.name {
        errors::require_non_empty(&name, "name")?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(goal) = patch.goal {
        am.goal = Set(goal);
    }
    if let Some(start) = patch.start_date {
        am.start_date = Set(start);
    }
    if let Some(end) = patch.end_date {
        am.end_date = Set(end);
    }
    if let Some(active) = patch.is_active {
        am.is_active = Set(active);
    }
    am.updated_at = Set(Utc::now().into());
    let m = am.update(db).await.map_err(|e| ModelError::missing_row(e, ENTITY, id))?;
    with_project(db, m).await
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Model, ModelError> {
    let found = find(db, id).await?.ok_or_else(|| ModelError::not_found(ENTITY, id))?;
    Entity::delete_by_id(id).exec(db).await?;
    Ok(found)
}

pub async fn delete_by_project<C: ConnectionTrait>(db: &C, project_id: Uuid) -> Result<u64, ModelError> {
    let res = Entity::delete_many().filter(Column::ProjectId.eq(project_id)).exec(db).await?;
    Ok(res.rows_affected)
}
