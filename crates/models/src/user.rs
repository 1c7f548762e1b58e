use std::collections::HashMap;

use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{self, ModelError};
use crate::records::UserInfo;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create<C: ConnectionTrait>(db: &C, email: &str, name: &str) -> Result<Model, ModelError> {
    if !email.contains('@') { return Err(ModelError::Validation("invalid email".into())); }
    errors::require_non_empty(name, "name")?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        avatar_url: Set(None),
        created_at: Set(Utc::now().into()),
    };
    Ok(am.insert(db).await?)
}

pub async fn get<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<UserInfo>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?.map(UserInfo::from))
}

/// Batch-load public user projections, keyed by id. Unknown ids are simply absent.
pub async fn infos_by_ids<C, I>(db: &C, ids: I) -> Result<HashMap<Uuid, UserInfo>, ModelError>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = Uuid>,
{
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = Entity::find().filter(Column::Id.is_in(ids)).all(db).await?;
    Ok(rows.into_iter().map(|m| (m.id, UserInfo::from(m))).collect())
}
