use sea_orm::{entity::prelude::*, ConnectionTrait, PaginatorTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{user, workspace};

pub const DEFAULT_ROLE: &str = "member";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workspace_member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Workspace,
    User,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Workspace => Entity::belongs_to(workspace::Entity).from(Column::WorkspaceId).to(workspace::Column::Id).into(),
            Relation::User => Entity::belongs_to(user::Entity).from(Column::UserId).to(user::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn add<C: ConnectionTrait>(db: &C, workspace_id: Uuid, user_id: Uuid, role: Option<&str>) -> Result<Model, ModelError> {
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        workspace_id: Set(workspace_id),
        user_id: Set(user_id),
        role: Set(role.unwrap_or(DEFAULT_ROLE).to_string()),
        created_at: Set(Utc::now().into()),
    };
    Ok(am.insert(db).await?)
}

pub async fn is_member<C: ConnectionTrait>(db: &C, workspace_id: Uuid, user_id: Uuid) -> Result<bool, ModelError> {
    let n = Entity::find()
        .filter(Column::WorkspaceId.eq(workspace_id))
        .filter(Column::UserId.eq(user_id))
        .count(db)
        .await?;
    Ok(n > 0)
}
