//! Write inputs accepted by `CrmService`.
//!
//! Partial updates use `Option<Option<T>>` for nullable columns: the outer
//! `None` means "leave unchanged", `Some(None)` clears the column.

pub use models::crm_comment::NewComment;
pub use models::crm_issue::{IssueFilters, IssuePatch, NewIssue};
pub use models::crm_project::{NewProject, ProjectPatch};
pub use models::crm_sprint::{NewSprint, SprintPatch};
pub use models::crm_time_log::{NewTimeLog, TimeLogPatch};
