//! Enums and small shared object types exposed by the schema.

use async_graphql::{Enum, MaybeUndefined, SimpleObject, ID};
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;

use models::{IssuePriority as DbPriority, IssueStatus as DbStatus, IssueType as DbType, UserInfo as DbUser};
use service::crm::StatusCount;

#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
#[graphql(name = "IssueStatus")]
pub enum IssueStatus {
    Backlog,
    Todo,
    InProgress,
    InReview,
    Done,
    Cancelled,
}

#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
#[graphql(name = "IssuePriority")]
pub enum IssuePriority {
    Lowest,
    Low,
    Medium,
    High,
    Highest,
}

#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
#[graphql(name = "IssueType")]
pub enum IssueKind {
    Epic,
    Story,
    Task,
    Bug,
    Subtask,
}

macro_rules! mirror_enum {
    ($api:ident, $db:ident, [$($v:ident),+]) => {
        impl From<$db> for $api {
            fn from(v: $db) -> Self {
                match v { $($db::$v => Self::$v),+ }
            }
        }
        impl From<$api> for $db {
            fn from(v: $api) -> Self {
                match v { $($api::$v => Self::$v),+ }
            }
        }
    };
}

mirror_enum!(IssueStatus, DbStatus, [Backlog, Todo, InProgress, InReview, Done, Cancelled]);
mirror_enum!(IssuePriority, DbPriority, [Lowest, Low, Medium, High, Highest]);
mirror_enum!(IssueKind, DbType, [Epic, Story, Task, Bug, Subtask]);

#[derive(SimpleObject, Clone, Debug)]
pub struct UserInfo {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl From<DbUser> for UserInfo {
    fn from(u: DbUser) -> Self {
        Self { id: ID(u.id.to_string()), name: u.name, email: u.email, avatar_url: u.avatar_url }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct IssueStatusCount {
    pub status: IssueStatus,
    pub count: i32,
}

impl From<StatusCount> for IssueStatusCount {
    fn from(c: StatusCount) -> Self {
        Self { status: c.status.into(), count: i32::try_from(c.count).unwrap_or(i32::MAX) }
    }
}

pub fn to_id(u: uuid::Uuid) -> ID {
    ID(u.to_string())
}

pub fn utc(d: DateTimeWithTimeZone) -> DateTime<Utc> {
    d.with_timezone(&Utc)
}

pub fn from_utc(d: DateTime<Utc>) -> DateTimeWithTimeZone {
    d.fixed_offset()
}

pub fn count(n: Option<u64>) -> Option<i32> {
    n.map(|v| i32::try_from(v).unwrap_or(i32::MAX))
}

/// `null` clears, an absent field leaves the column untouched.
pub fn patch<T>(v: MaybeUndefined<T>) -> Option<Option<T>> {
    match v {
        MaybeUndefined::Undefined => None,
        MaybeUndefined::Null => Some(None),
        MaybeUndefined::Value(x) => Some(Some(x)),
    }
}

pub fn patch_id(v: MaybeUndefined<ID>) -> async_graphql::Result<Option<Option<uuid::Uuid>>> {
    match patch(v) {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(raw)) => Ok(Some(Some(super::guard::parse_id(&raw)?))),
    }
}
