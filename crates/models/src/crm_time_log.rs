use std::collections::HashMap;

use sea_orm::{entity::prelude::*, ActiveValue::Unchanged, ConnectionTrait, QueryOrder, QuerySelect, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::records::TimeLogRecord;
use crate::{crm_issue, user};

pub const ENTITY: &str = "time log";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "crm_time_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub issue_id: Uuid,
    pub user_id: Uuid,
    /// Minutes.
    pub time_spent: i32,
    pub description: Option<String>,
    pub logged_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Issue,
    User,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Issue => Entity::belongs_to(crm_issue::Entity).from(Column::IssueId).to(crm_issue::Column::Id).into(),
            Relation::User => Entity::belongs_to(user::Entity).from(Column::UserId).to(user::Column::Id).into(),
        }
    }
}

impl Related<crm_issue::Entity> for Entity {
    fn to() -> RelationDef { Relation::Issue.def() }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug)]
pub struct NewTimeLog {
    pub issue_id: Uuid,
    pub user_id: Uuid,
    pub time_spent: i32,
    pub description: Option<String>,
    /// Defaults to now.
    pub logged_at: Option<DateTimeWithTimeZone>,
}

#[derive(Clone, Debug, Default)]
pub struct TimeLogPatch {
    pub time_spent: Option<i32>,
    pub description: Option<Option<String>>,
    pub logged_at: Option<DateTimeWithTimeZone>,
}

pub fn validate_time_spent(minutes: i32) -> Result<(), ModelError> {
    if minutes <= 0 {
        return Err(ModelError::Validation("timeSpent must be a positive number of minutes".into()));
    }
    Ok(())
}

async fn with_user<C: ConnectionTrait>(db: &C, time_log: Model) -> Result<TimeLogRecord, ModelError> {
    let user = user::get(db, time_log.user_id).await?;
    Ok(TimeLogRecord { time_log, user })
}

pub async fn find<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

pub async fn get<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<TimeLogRecord>, ModelError> {
    match find(db, id).await? {
        Some(m) => Ok(Some(with_user(db, m).await?)),
        None => Ok(None),
    }
}

/// Time logs of an issue, most recent `logged_at` first, each with its user.
pub async fn list_by_issue<C: ConnectionTrait>(db: &C, issue_id: Uuid) -> Result<Vec<TimeLogRecord>, ModelError> {
    let logs = Entity::find()
        .filter(Column::IssueId.eq(issue_id))
        .order_by_desc(Column::LoggedAt)
        .all(db)
        .await?;
    let users = user::infos_by_ids(db, logs.iter().map(|l| l.user_id)).await?;
    Ok(logs
        .into_iter()
        .map(|l| TimeLogRecord { user: users.get(&l.user_id).cloned(), time_log: l })
        .collect())
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewTimeLog) -> Result<TimeLogRecord, ModelError> {
    validate_time_spent(input.time_spent)?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        issue_id: Set(input.issue_id),
        user_id: Set(input.user_id),
        time_spent: Set(input.time_spent),
        description: Set(input.description),
        logged_at: Set(input.logged_at.unwrap_or(now)),
        created_at: Set(now),
    };
    let m = am.insert(db).await?;
    with_user(db, m).await
}

pub async fn update<C: ConnectionTrait>(db: &C, id: Uuid, patch: TimeLogPatch) -> Result<TimeLogRecord, ModelError> {
    let mut am = ActiveModel { id: Unchanged(id), ..Default::default() };
    if let Some(minutes) = patch.time_spent {
        validate_time_spent(minutes)?;
        am.time_spent = Set(minutes);
    }
    if let Some(description) = patch.description {
        am.description = Set(description);
    }
    if let Some(logged_at) = patch.logged_at {
        am.logged_at = Set(logged_at);
    }
    let m = am.update(db).await.map_err(|e| ModelError::missing_row(e, ENTITY, id))?;
    with_user(db, m).await
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Model, ModelError> {
    let found = find(db, id).await?.ok_or_else(|| ModelError::not_found(ENTITY, id))?;
    Entity::delete_by_id(id).exec(db).await?;
    Ok(found)
}

pub async fn delete_by_issues<C: ConnectionTrait>(db: &C, issue_ids: &[Uuid]) -> Result<u64, ModelError> {
    if issue_ids.is_empty() {
        return Ok(0);
    }
    let res = Entity::delete_many()
        .filter(Column::IssueId.is_in(issue_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Total minutes logged against an issue; `None` when nothing has been logged.
pub async fn sum_time_spent<C: ConnectionTrait>(db: &C, issue_id: Uuid) -> Result<Option<i64>, ModelError> {
    let total: Option<Option<i64>> = Entity::find()
        .select_only()
        .column_as(Column::TimeSpent.sum(), "total")
        .filter(Column::IssueId.eq(issue_id))
        .into_tuple()
        .one(db)
        .await?;
    Ok(total.flatten())
}

pub async fn count_by_issues<C: ConnectionTrait>(db: &C, issue_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, ModelError> {
    if issue_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, i64)> = Entity::find()
        .select_only()
        .column(Column::IssueId)
        .column_as(Column::Id.count(), "count")
        .filter(Column::IssueId.is_in(issue_ids.iter().copied()))
        .group_by(Column::IssueId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|(id, n)| (id, n.max(0) as u64)).collect())
}
