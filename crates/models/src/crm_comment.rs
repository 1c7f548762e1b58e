use std::collections::HashMap;

use sea_orm::{entity::prelude::*, ActiveValue::Unchanged, ConnectionTrait, QueryOrder, QuerySelect, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{self, ModelError};
use crate::records::CommentRecord;
use crate::{crm_issue, user};

pub const ENTITY: &str = "comment";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "crm_comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub issue_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Issue,
    Author,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Issue => Entity::belongs_to(crm_issue::Entity).from(Column::IssueId).to(crm_issue::Column::Id).into(),
            Relation::Author => Entity::belongs_to(user::Entity).from(Column::AuthorId).to(user::Column::Id).into(),
        }
    }
}

impl Related<crm_issue::Entity> for Entity {
    fn to() -> RelationDef { Relation::Issue.def() }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug)]
pub struct NewComment {
    pub content: String,
    pub issue_id: Uuid,
    pub author_id: Uuid,
}

async fn with_author<C: ConnectionTrait>(db: &C, comment: Model) -> Result<CommentRecord, ModelError> {
    let author = user::get(db, comment.author_id).await?;
    Ok(CommentRecord { comment, author })
}

pub async fn find<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

pub async fn get<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<CommentRecord>, ModelError> {
    match find(db, id).await? {
        Some(m) => Ok(Some(with_author(db, m).await?)),
        None => Ok(None),
    }
}

/// Comments of an issue, oldest first, each with its author.
pub async fn list_by_issue<C: ConnectionTrait>(db: &C, issue_id: Uuid) -> Result<Vec<CommentRecord>, ModelError> {
    let comments = Entity::find()
        .filter(Column::IssueId.eq(issue_id))
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?;
    let authors = user::infos_by_ids(db, comments.iter().map(|c| c.author_id)).await?;
    Ok(comments
        .into_iter()
        .map(|c| CommentRecord { author: authors.get(&c.author_id).cloned(), comment: c })
        .collect())
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewComment) -> Result<CommentRecord, ModelError> {
    errors::require_non_empty(&input.content, "content")?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        content: Set(input.content),
        issue_id: Set(input.issue_id),
        author_id: Set(input.author_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let m = am.insert(db).await?;
    with_author(db, m).await
}

/// Only the content of a comment is editable.
pub async fn update<C: ConnectionTrait>(db: &C, id: Uuid, content: Option<String>) -> Result<CommentRecord, ModelError> {
    let mut am = ActiveModel { id: Unchanged(id), ..Default::default() };
    if let Some(content) = content {
        errors::require_non_empty(&content, "content")?;
        am.content = Set(content);
    }
    am.updated_at = Set(Utc::now().into());
    let m = am.update(db).await.map_err(|e| ModelError::missing_row(e, ENTITY, id))?;
    with_author(db, m).await
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
