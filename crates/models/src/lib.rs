pub mod errors;
pub mod db;
pub mod types;
pub mod records;
pub mod workspace;
pub mod user;
pub mod workspace_member;
pub mod crm_project;
pub mod crm_sprint;
pub mod crm_issue;
pub mod crm_comment;
pub mod crm_time_log;

pub use errors::ModelError;
pub use records::{CommentRecord, IssueRecord, ProjectRecord, SprintRecord, TimeLogRecord, UserInfo};
pub use types::{IssuePriority, IssueStatus, IssueType};

#[cfg(test)]
mod tests;
