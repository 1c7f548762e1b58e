//! Read shapes returned by the data-access functions.
//!
//! Each query loads a fixed set of relations; relations a query does not load
//! stay `None` rather than empty.

use serde::Serialize;
use uuid::Uuid;

use crate::{crm_comment, crm_issue, crm_project, crm_sprint, crm_time_log, user};

/// Public projection of a user row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl From<user::Model> for UserInfo {
    fn from(m: user::Model) -> Self {
        Self { id: m.id, name: m.name, email: m.email, avatar_url: m.avatar_url }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProjectRecord {
    pub project: crm_project::Model,
    pub lead: Option<UserInfo>,
    pub issues_count: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IssueRecord {
    pub issue: crm_issue::Model,
    pub project: Option<crm_project::Model>,
    pub assignee: Option<UserInfo>,
    pub reporter: Option<UserInfo>,
    pub sprint: Option<crm_sprint::Model>,
    pub comments: Option<Vec<CommentRecord>>,
    pub time_logs: Option<Vec<TimeLogRecord>>,
    pub comments_count: Option<u64>,
    pub time_logs_count: Option<u64>,
}

impl IssueRecord {
    pub fn bare(issue: crm_issue::Model) -> Self {
        Self {
            issue,
            project: None,
            assignee: None,
            reporter: None,
            sprint: None,
            comments: None,
            time_logs: None,
            comments_count: None,
            time_logs_count: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SprintRecord {
    pub sprint: crm_sprint::Model,
    pub project: Option<crm_project::Model>,
    pub issues: Option<Vec<IssueRecord>>,
    pub issues_count: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommentRecord {
    pub comment: crm_comment::Model,
    pub author: Option<UserInfo>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeLogRecord {
    pub time_log: crm_time_log::Model,
    pub user: Option<UserInfo>,
}
