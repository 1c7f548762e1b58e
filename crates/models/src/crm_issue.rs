use std::collections::HashMap;

use sea_orm::{
    entity::prelude::*, sea_query::Expr, ActiveEnum, ActiveValue::Unchanged, ConnectionTrait, PaginatorTrait,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{self, ModelError};
use crate::records::IssueRecord;
use crate::types::{IssuePriority, IssueStatus, IssueType};
use crate::{crm_comment, crm_project, crm_sprint, crm_time_log, user};

pub const ENTITY: &str = "issue";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "crm_issue")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    #[sea_orm(column_name = "type")]
    pub issue_type: IssueType,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub reporter_id: Uuid,
    pub sprint_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub story_points: Option<i32>,
    pub due_date: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Project,
    Sprint,
    Parent,
    Assignee,
    Reporter,
    Comments,
    TimeLogs,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Project => Entity::belongs_to(crm_project::Entity).from(Column::ProjectId).to(crm_project::Column::Id).into(),
            Relation::Sprint => Entity::belongs_to(crm_sprint::Entity).from(Column::SprintId).to(crm_sprint::Column::Id).into(),
            Relation::Parent => Entity::belongs_to(Entity).from(Column::ParentId).to(Column::Id).into(),
            Relation::Assignee => Entity::belongs_to(user::Entity).from(Column::AssigneeId).to(user::Column::Id).into(),
            Relation::Reporter => Entity::belongs_to(user::Entity).from(Column::ReporterId).to(user::Column::Id).into(),
            Relation::Comments => Entity::has_many(crm_comment::Entity).into(),
            Relation::TimeLogs => Entity::has_many(crm_time_log::Entity).into(),
        }
    }
}

impl Related<crm_project::Entity> for Entity {
    fn to() -> RelationDef { Relation::Project.def() }
}

impl Related<crm_sprint::Entity> for Entity {
    fn to() -> RelationDef { Relation::Sprint.def() }
}

impl Related<crm_comment::Entity> for Entity {
    fn to() -> RelationDef { Relation::Comments.def() }
}

impl Related<crm_time_log::Entity> for Entity {
    fn to() -> RelationDef { Relation::TimeLogs.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Optional listing filters, combined with AND.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IssueFilters {
    pub status: Option<IssueStatus>,
    pub assignee_id: Option<Uuid>,
    pub sprint_id: Option<Uuid>,
    pub issue_type: Option<IssueType>,
    pub priority: Option<IssuePriority>,
}

#[derive(Clone, Debug, Default)]
pub struct NewIssue {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    pub issue_type: Option<IssueType>,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub reporter_id: Uuid,
    pub sprint_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub story_points: Option<i32>,
    pub due_date: Option<DateTimeWithTimeZone>,
}

/// Partial update. `None` leaves a column alone; `Some(None)` clears a nullable one.
#[derive(Clone, Debug, Default)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    pub issue_type: Option<IssueType>,
    pub assignee_id: Option<Option<Uuid>>,
    pub sprint_id: Option<Option<Uuid>>,
    pub parent_id: Option<Option<Uuid>>,
    pub story_points: Option<Option<i32>>,
    pub due_date: Option<Option<DateTimeWithTimeZone>>,
}

fn validate_story_points(points: Option<i32>) -> Result<(), ModelError> {
    match points {
        Some(p) if p < 0 => Err(ModelError::Validation("storyPoints must be >= 0".into())),
        _ => Ok(()),
    }
}

pub async fn find<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// Fills assignee and reporter for a batch of issues with one user query.
async fn attach_people<C: ConnectionTrait>(db: &C, issues: Vec<Model>) -> Result<Vec<IssueRecord>, ModelError> {
    let users = user::infos_by_ids(
        db,
        issues.iter().flat_map(|i| std::iter::once(i.reporter_id).chain(i.assignee_id)),
    )
    .await?;
    Ok(issues
        .into_iter()
        .map(|i| {
            let mut r = IssueRecord::bare(i);
            r.assignee = r.issue.assignee_id.and_then(|id| users.get(&id).cloned());
            r.reporter = users.get(&r.issue.reporter_id).cloned();
            r
        })
        .collect())
}

/// Shape returned by create and update: project, assignee, reporter, sprint.
async fn with_relations<C: ConnectionTrait>(db: &C, issue: Model) -> Result<IssueRecord, ModelError> {
    let project = crm_project::find(db, issue.project_id).await?;
    let sprint = match issue.sprint_id {
        Some(id) => crm_sprint::find(db, id).await?,
        None => None,
    };
    let mut record = attach_people(db, vec![issue])
        .await?
        .pop()
        .ok_or_else(|| ModelError::Db("issue record lost while loading relations".into()))?;
    record.project = project;
    record.sprint = sprint;
    Ok(record)
}

/// Issue with project, people, sprint, comments (oldest first) and time logs (newest first).
pub async fn get<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<IssueRecord>, ModelError> {
    let Some(issue) = find(db, id).await? else { return Ok(None) };
    let mut record = with_relations(db, issue).await?;
    let comments = crm_comment::list_by_issue(db, id).await?;
    let time_logs = crm_time_log::list_by_issue(db, id).await?;
    record.comments_count = Some(comments.len() as u64);
    record.time_logs_count = Some(time_logs.len() as u64);
    record.comments = Some(comments);
    record.time_logs = Some(time_logs);
    Ok(Some(record))
}

pub async fn list_by_project<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    filters: &IssueFilters,
) -> Result<Vec<IssueRecord>, ModelError> {
    let mut query = Entity::find().filter(Column::ProjectId.eq(project_id));
    if let Some(status) = filters.status {
        query = query.filter(Column::Status.eq(status));
    }
    if let Some(assignee) = filters.assignee_id {
        query = query.filter(Column::AssigneeId.eq(assignee));
    }
    if let Some(sprint) = filters.sprint_id {
        query = query.filter(Column::SprintId.eq(sprint));
    }
    if let Some(issue_type) = filters.issue_type {
        query = query.filter(Column::IssueType.eq(issue_type));
    }
    if let Some(priority) = filters.priority {
        query = query.filter(Column::Priority.eq(priority));
    }
    let issues = query.order_by_desc(Column::CreatedAt).all(db).await?;

    let ids: Vec<Uuid> = issues.iter().map(|i| i.id).collect();
    let mut sprint_ids: Vec<Uuid> = issues.iter().filter_map(|i| i.sprint_id).collect();
    sprint_ids.sort_unstable();
    sprint_ids.dedup();
    let sprints: HashMap<Uuid, crm_sprint::Model> = if sprint_ids.is_empty() {
        HashMap::new()
    } else {
        crm_sprint::Entity::find()
            .filter(crm_sprint::Column::Id.is_in(sprint_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect()
    };
    let comment_counts = crm_comment::count_by_issues(db, &ids).await?;
    let time_log_counts = crm_time_log::count_by_issues(db, &ids).await?;

    let mut records = attach_people(db, issues).await?;
    for r in records.iter_mut() {
        r.sprint = r.issue.sprint_id.and_then(|id| sprints.get(&id).cloned());
        r.comments_count = Some(comment_counts.get(&r.issue.id).copied().unwrap_or(0));
        r.time_logs_count = Some(time_log_counts.get(&r.issue.id).copied().unwrap_or(0));
    }
    Ok(records)
}

/// Issues planned into a sprint, with assignee and reporter.
pub async fn list_by_sprint<C: ConnectionTrait>(db: &C, sprint_id: Uuid) -> Result<Vec<IssueRecord>, ModelError> {
    let issues = Entity::find()
        .filter(Column::SprintId.eq(sprint_id))
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?;
    attach_people(db, issues).await
}

/// Direct children of an issue, oldest first, with assignee and reporter.
pub async fn list_subtasks<C: ConnectionTrait>(db: &C, parent_id: Uuid) -> Result<Vec<IssueRecord>, ModelError> {
    let issues = Entity::find()
        .filter(Column::ParentId.eq(parent_id))
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?;
    attach_people(db, issues).await
}

pub async fn ids_by_project<C: ConnectionTrait>(db: &C, project_id: Uuid) -> Result<Vec<Uuid>, ModelError> {
    Ok(Entity::find()
        .select_only()
        .column(Column::Id)
        .filter(Column::ProjectId.eq(project_id))
        .into_tuple::<Uuid>()
        .all(db)
        .await?)
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewIssue) -> Result<IssueRecord, ModelError> {
    errors::require_non_empty(&input.title, "title")?;
    validate_story_points(input.story_points)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(input.title.trim().to_string()),
        description: Set(input.description),
        status: Set(input.status.unwrap_or_default()),
        priority: Set(input.priority.unwrap_or_default()),
        issue_type: Set(input.issue_type.unwrap_or_default()),
        project_id: Set(input.project_id),
        assignee_id: Set(input.assignee_id),
        reporter_id: Set(input.reporter_id),
        sprint_id: Set(input.sprint_id),
        parent_id: Set(input.parent_id),
        story_points: Set(input.story_points),
        due_date: Set(input.due_date),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let m = am.insert(db).await?;
    with_relations(db, m).await
}

pub async fn update<C: ConnectionTrait>(db: &C, id: Uuid, patch: IssuePatch) -> Result<IssueRecord, ModelError> {
    let mut am = ActiveModel { id: Unchanged(id), ..Default::default() };
    if let Some(title) = patch.title {
        errors::require_non_empty(&title, "title")?;
        am.title = Set(title.trim().to_string());
    }
    if let Some(description) = patch.description {
        am.description = Set(description);
    }
    if let Some(status) = patch.status {
        am.status = Set(status);
    }
    if let Some(priority) = patch.priority {
        am.priority = Set(priority);
    }
    if let Some(issue_type) = patch.issue_type {
        am.issue_type = Set(issue_type);
    }
    if let Some(assignee) = patch.assignee_id {
        am.assignee_id = Set(assignee);
    }
    if let Some(sprint) = patch.sprint_id {
        am.sprint_id = Set(sprint);
    }
    if let Some(parent) = patch.parent_id {
        am.parent_id = Set(parent);
    }
    if let Some(points) = patch.story_points {
        validate_story_points(points)?;
        am.story_points = Set(points);
    }
    if let Some(due) = patch.due_date {
        am.due_date = Set(due);
    }
    am.updated_at = Set(Utc::now().into());
    let m = am.update(db).await.map_err(|e| ModelError::missing_row(e, ENTITY, id))?;
    with_relations(db, m).await
}

/// Deletes the issue row only; comments, time logs and subtasks are the caller's concern.
pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Model, ModelError> {
    let found = find(db, id).await?.ok_or_else(|| ModelError::not_found(ENTITY, id))?;
    Entity::delete_by_id(id).exec(db).await?;
    Ok(found)
}

pub async fn delete_by_project<C: ConnectionTrait>(db: &C, project_id: Uuid) -> Result<u64, ModelError> {
    // 先断开父子关系，避免同一批删除中的自引用外键互相阻塞
    Entity::update_many()
        .col_expr(Column::ParentId, Expr::value(Option::<Uuid>::None))
        .filter(Column::ProjectId.eq(project_id))
        .exec(db)
        .await?;
    let res = Entity::delete_many().filter(Column::ProjectId.eq(project_id)).exec(db).await?;
    Ok(res.rows_affected)
}

/// Clears `parent_id` on the children of `parent_id`.
pub async fn detach_children<C: ConnectionTrait>(db: &C, parent_id: Uuid) -> Result<u64, ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::ParentId, Expr::value(Option::<Uuid>::None))
        .col_expr(Column::UpdatedAt, Expr::value(DateTimeWithTimeZone::from(Utc::now())))
        .filter(Column::ParentId.eq(parent_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Clears `sprint_id` on every issue planned into the sprint.
pub async fn detach_sprint<C: ConnectionTrait>(db: &C, sprint_id: Uuid) -> Result<u64, ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::SprintId, Expr::value(Option::<Uuid>::None))
        .col_expr(Column::UpdatedAt, Expr::value(DateTimeWithTimeZone::from(Utc::now())))
        .filter(Column::SprintId.eq(sprint_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

pub async fn count_by_project<C: ConnectionTrait>(db: &C, project_id: Uuid) -> Result<u64, ModelError> {
    Ok(Entity::find().filter(Column::ProjectId.eq(project_id)).count(db).await?)
}

/// Issues per status for a project; statuses with no issues are absent.
pub async fn count_by_status<C: ConnectionTrait>(db: &C, project_id: Uuid) -> Result<Vec<(IssueStatus, u64)>, ModelError> {
    let rows: Vec<(String, i64)> = Entity::find()
        .select_only()
        .column(Column::Status)
        .column_as(Column::Id.count(), "count")
        .filter(Column::ProjectId.eq(project_id))
        .group_by(Column::Status)
        .into_tuple()
        .all(db)
        .await?;
    rows.into_iter()
        .map(|(status, n)| -> Result<_, ModelError> {
            Ok((IssueStatus::try_from_value(&status)?, n.max(0) as u64))
        })
        .collect()
}

async fn count_grouped<C: ConnectionTrait>(db: &C, column: Column, ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, ModelError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, i64)> = Entity::find()
        .select_only()
        .column(column)
        .column_as(Column::Id.count(), "count")
        .filter(column.is_in(ids.iter().copied()))
        .group_by(column)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|(id, n)| (id, n.max(0) as u64)).collect())
}

pub async fn count_by_projects<C: ConnectionTrait>(db: &C, project_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, ModelError> {
    count_grouped(db, Column::ProjectId, project_ids).await
}

pub async fn count_by_sprints<C: ConnectionTrait>(db: &C, sprint_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, ModelError> {
    count_grouped(db, Column::SprintId, sprint_ids).await
}
