use std::collections::HashSet;

use sea_orm::{ConnectionTrait, DatabaseConnection, Iterable, TransactionTrait};
use tracing::{info, instrument};
use uuid::Uuid;

use models::{crm_comment, crm_issue, crm_project, crm_sprint, crm_time_log, workspace};
use models::{CommentRecord, IssueRecord, IssueStatus, ProjectRecord, SprintRecord, TimeLogRecord};

use super::inputs::*;
use crate::access::{Resource, Scope};
use crate::errors::ServiceError;

/// One row of a project's status breakdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusCount {
    pub status: IssueStatus,
    pub count: u64,
}

/// CRM operations over an injected connection pool.
///
/// Reads that find nothing return `ServiceError::NotFound`. Deletes touching more
/// than one table run in a single transaction.
#[derive(Clone)]
pub struct CrmService {
    db: DatabaseConnection,
}

impl CrmService {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    pub fn db(&self) -> &DatabaseConnection { &self.db }

    /// Resolve the workspace a resource belongs to (entity -> project -> workspace).
    #[instrument(skip(self))]
    pub async fn resolve_scope(&self, resource: Resource) -> Result<Scope, ServiceError> {
        let db = &self.db;
        let (project_id, owner_id) = match resource {
            Resource::Workspace(id) => {
                workspace::get(db, id).await?.ok_or_else(|| ServiceError::not_found("workspace", id))?;
                return Ok(Scope { workspace_id: id, owner_id: None });
            }
            Resource::Project(id) => (id, None),
            Resource::Issue(id) => (self.find_issue(id).await?.project_id, None),
            Resource::Sprint(id) => {
                let sprint = crm_sprint::find(db, id).await?.ok_or_else(|| ServiceError::not_found(crm_sprint::ENTITY, id))?;
                (sprint.project_id, None)
            }
            Resource::Comment(id) => {
                let comment = crm_comment::find(db, id).await?.ok_or_else(|| ServiceError::not_found(crm_comment::ENTITY, id))?;
                (self.find_issue(comment.issue_id).await?.project_id, Some(comment.author_id))
            }
            Resource::TimeLog(id) => {
                let log = crm_time_log::find(db, id).await?.ok_or_else(|| ServiceError::not_found(crm_time_log::ENTITY, id))?;
                (self.find_issue(log.issue_id).await?.project_id, Some(log.user_id))
            }
        };
        let project = crm_project::find(db, project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(crm_project::ENTITY, project_id))?;
        Ok(Scope { workspace_id: project.workspace_id, owner_id })
    }

    // ---- projects ----

    #[instrument(skip(self), fields(project_id = %id))]
    pub async fn get_project(&self, id: Uuid) -> Result<ProjectRecord, ServiceError> {
        crm_project::get(&self.db, id).await?.ok_or_else(|| ServiceError::not_found(crm_project::ENTITY, id))
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id))]
    pub async fn get_projects_by_workspace(&self, workspace_id: Uuid) -> Result<Vec<ProjectRecord>, ServiceError> {
        Ok(crm_project::list_by_workspace(&self.db, workspace_id).await?)
    }

    pub async fn count_projects_by_workspace(&self, workspace_id: Uuid) -> Result<u64, ServiceError> {
        Ok(crm_project::count_by_workspace(&self.db, workspace_id).await?)
    }

    #[instrument(skip(self, input), fields(workspace_id = %input.workspace_id, key = %input.key))]
    pub async fn create_project(&self, input: NewProject) -> Result<ProjectRecord, ServiceError> {
        let rec = crm_project::create(&self.db, input).await?;
        info!(project_id = %rec.project.id, key = %rec.project.key, "crm_project_created");
        Ok(rec)
    }

    #[instrument(skip(self, patch), fields(project_id = %id))]
    pub async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> Result<ProjectRecord, ServiceError> {
        let rec = crm_project::update(&self.db, id, patch).await?;
        info!(project_id = %id, "crm_project_updated");
        Ok(rec)
    }

    /// Removes the project together with its time logs, comments, issues and sprints.
    #[instrument(skip(self), fields(project_id = %id))]
    pub async fn delete_project(&self, id: Uuid) -> Result<crm_project::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let issue_ids = crm_issue::ids_by_project(&txn, id).await?;
        let time_logs = crm_time_log::delete_by_issues(&txn, &issue_ids).await?;
        let comments = crm_comment::delete_by_issues(&txn, &issue_ids).await?;
        let issues = crm_issue::delete_by_project(&txn, id).await?;
        let sprints = crm_sprint::delete_by_project(&txn, id).await?;
        let project = crm_project::delete(&txn, id).await?;
        txn.commit().await?;
        info!(project_id = %id, issues, sprints, comments, time_logs, "crm_project_deleted");
        Ok(project)
    }

    // ---- issues ----

    /// Bare issue row, for scope checks and parent walks.
    pub async fn find_issue(&self, id: Uuid) -> Result<crm_issue::Model, ServiceError> {
        crm_issue::find(&self.db, id).await?.ok_or_else(|| ServiceError::not_found(crm_issue::ENTITY, id))
    }

    #[instrument(skip(self), fields(issue_id = %id))]
    pub async fn get_issue(&self, id: Uuid) -> Result<IssueRecord, ServiceError> {
        crm_issue::get(&self.db, id).await?.ok_or_else(|| ServiceError::not_found(crm_issue::ENTITY, id))
    }

    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn get_issues_by_project(&self, project_id: Uuid, filters: IssueFilters) -> Result<Vec<IssueRecord>, ServiceError> {
        Ok(crm_issue::list_by_project(&self.db, project_id, &filters).await?)
    }

    pub async fn get_subtasks(&self, issue_id: Uuid) -> Result<Vec<IssueRecord>, ServiceError> {
        Ok(crm_issue::list_subtasks(&self.db, issue_id).await?)
    }

    pub async fn count_issues_by_project(&self, project_id: Uuid) -> Result<u64, ServiceError> {
        Ok(crm_issue::count_by_project(&self.db, project_id).await?)
    }

    /// Every status with its issue count, zeros included, in workflow order.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn get_issue_status_count(&self, project_id: Uuid) -> Result<Vec<StatusCount>, ServiceError> {
        let present = crm_issue::count_by_status(&self.db, project_id).await?;
        Ok(IssueStatus::iter()
            .map(|status| StatusCount {
                status,
                count: present.iter().find(|(s, _)| *s == status).map(|(_, n)| *n).unwrap_or(0),
            })
            .collect())
    }

    #[instrument(skip(self, input), fields(project_id = %input.project_id))]
    pub async fn create_issue(&self, input: NewIssue) -> Result<IssueRecord, ServiceError> {
        check_issue_links(&self.db, input.project_id, input.sprint_id, input.parent_id, None).await?;
        let rec = crm_issue::create(&self.db, input).await?;
        info!(issue_id = %rec.issue.id, project_id = %rec.issue.project_id, "crm_issue_created");
        Ok(rec)
    }

    #[instrument(skip(self, patch), fields(issue_id = %id))]
    pub async fn update_issue(&self, id: Uuid, patch: IssuePatch) -> Result<IssueRecord, ServiceError> {
        let current = self.find_issue(id).await?;
        let sprint_id = patch.sprint_id.flatten();
        let parent_id = patch.parent_id.flatten();
        check_issue_links(&self.db, current.project_id, sprint_id, parent_id, Some(id)).await?;
        let rec = crm_issue::update(&self.db, id, patch).await?;
        info!(issue_id = %id, status = ?rec.issue.status, "crm_issue_updated");
        Ok(rec)
    }

    /// Removes the issue with its comments and time logs; subtasks lose their parent.
    #[instrument(skip(self), fields(issue_id = %id))]
    pub async fn delete_issue(&self, id: Uuid) -> Result<crm_issue::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let comments = crm_comment::delete_by_issues(&txn, &[id]).await?;
        let time_logs = crm_time_log::delete_by_issues(&txn, &[id]).await?;
        let detached = crm_issue::detach_children(&txn, id).await?;
        let issue = crm_issue::delete(&txn, id).await?;
        txn.commit().await?;
        info!(issue_id = %id, comments, time_logs, detached, "crm_issue_deleted");
        Ok(issue)
    }

    // ---- sprints ----

    #[instrument(skip(self), fields(sprint_id = %id))]
    pub async fn get_sprint(&self, id: Uuid) -> Result<SprintRecord, ServiceError> {
        crm_sprint::get(&self.db, id).await?.ok_or_else(|| ServiceError::not_found(crm_sprint::ENTITY, id))
    }

    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn get_sprints_by_project(&self, project_id: Uuid) -> Result<Vec<SprintRecord>, ServiceError> {
        Ok(crm_sprint::list_by_project(&self.db, project_id).await?)
    }

    #[instrument(skip(self, input), fields(project_id = %input.project_id))]
    pub async fn create_sprint(&self, input: NewSprint) -> Result<SprintRecord, ServiceError> {
        let rec = crm_sprint::create(&self.db, input).await?;
        info!(sprint_id = %rec.sprint.id, project_id = %rec.sprint.project_id, "crm_sprint_created");
        Ok(rec)
    }

    /// The start/end window is validated on the merged values.
    #[instrument(skip(self, patch), fields(sprint_id = %id))]
    pub async fn update_sprint(&self, id: Uuid, patch: SprintPatch) -> Result<SprintRecord, ServiceError> {
        if patch.start_date.is_some() || patch.end_date.is_some() {
            let current = crm_sprint::find(&self.db, id).await?.ok_or_else(|| ServiceError::not_found(crm_sprint::ENTITY, id))?;
            let start = patch.start_date.unwrap_or(current.start_date);
            let end = patch.end_date.unwrap_or(current.end_date);
            crm_sprint::validate_window(&start, &end)?;
        }
        let rec = crm_sprint::update(&self.db, id, patch).await?;
        info!(sprint_id = %id, "crm_sprint_updated");
        Ok(rec)
    }

    /// Removes the sprint; its issues stay in the project without a sprint.
    #[instrument(skip(self), fields(sprint_id = %id))]
    pub async fn delete_sprint(&self, id: Uuid) -> Result<crm_sprint::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let detached = crm_issue::detach_sprint(&txn, id).await?;
        let sprint = crm_sprint::delete(&txn, id).await?;
        txn.commit().await?;
        info!(sprint_id = %id, detached, "crm_sprint_deleted");
        Ok(sprint)
    }

    // ---- comments ----

    pub async fn get_comment(&self, id: Uuid) -> Result<CommentRecord, ServiceError> {
        crm_comment::get(&self.db, id).await?.ok_or_else(|| ServiceError::not_found(crm_comment::ENTITY, id))
    }

    pub async fn get_comments_by_issue(&self, issue_id: Uuid) -> Result<Vec<CommentRecord>, ServiceError> {
        Ok(crm_comment::list_by_issue(&self.db, issue_id).await?)
    }

    #[instrument(skip(self, input), fields(issue_id = %input.issue_id, author_id = %input.author_id))]
    pub async fn create_comment(&self, input: NewComment) -> Result<CommentRecord, ServiceError> {
        let rec = crm_comment::create(&self.db, input).await?;
        info!(comment_id = %rec.comment.id, "crm_comment_created");
        Ok(rec)
    }

    #[instrument(skip(self, content), fields(comment_id = %id))]
    pub async fn update_comment(&self, id: Uuid, content: Option<String>) -> Result<CommentRecord, ServiceError> {
        let rec = crm_comment::update(&self.db, id, content).await?;
        info!(comment_id = %id, "crm_comment_updated");
        Ok(rec)
    }

    #[instrument(skip(self), fields(comment_id = %id))]
    pub async fn delete_comment(&self, id: Uuid) -> Result<crm_comment::Model, ServiceError> {
        let comment = crm_comment::delete(&self.db, id).await?;
        info!(comment_id = %id, "crm_comment_deleted");
        Ok(comment)
    }

    // ---- time logs ----

    pub async fn get_time_log(&self, id: Uuid) -> Result<TimeLogRecord, ServiceError> {
        crm_time_log::get(&self.db, id).await?.ok_or_else(|| ServiceError::not_found(crm_time_log::ENTITY, id))
    }

    pub async fn get_time_logs_by_issue(&self, issue_id: Uuid) -> Result<Vec<TimeLogRecord>, ServiceError> {
        Ok(crm_time_log::list_by_issue(&self.db, issue_id).await?)
    }

    #[instrument(skip(self, input), fields(issue_id = %input.issue_id, user_id = %input.user_id))]
    pub async fn create_time_log(&self, input: NewTimeLog) -> Result<TimeLogRecord, ServiceError> {
        let rec = crm_time_log::create(&self.db, input).await?;
        info!(time_log_id = %rec.time_log.id, minutes = rec.time_log.time_spent, "crm_time_logged");
        Ok(rec)
    }

    #[instrument(skip(self, patch), fields(time_log_id = %id))]
    pub async fn update_time_log(&self, id: Uuid, patch: TimeLogPatch) -> Result<TimeLogRecord, ServiceError> {
        let rec = crm_time_log::update(&self.db, id, patch).await?;
        info!(time_log_id = %id, "crm_time_log_updated");
        Ok(rec)
    }

    #[instrument(skip(self), fields(time_log_id = %id))]
    pub async fn delete_time_log(&self, id: Uuid) -> Result<crm_time_log::Model, ServiceError> {
        let log = crm_time_log::delete(&self.db, id).await?;
        info!(time_log_id = %id, "crm_time_log_deleted");
        Ok(log)
    }

    /// Total logged minutes; 0 when nothing has been logged.
    pub async fn get_total_time_spent(&self, issue_id: Uuid) -> Result<i64, ServiceError> {
        Ok(crm_time_log::sum_time_spent(&self.db, issue_id).await?.unwrap_or(0))
    }
}

/// Sprint and parent must live in the issue's project, and re-parenting must not loop.
async fn check_issue_links<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    sprint_id: Option<Uuid>,
    parent_id: Option<Uuid>,
    issue_id: Option<Uuid>,
) -> Result<(), ServiceError> {
    if let Some(sprint_id) = sprint_id {
        let sprint = crm_sprint::find(db, sprint_id).await?.ok_or_else(|| ServiceError::not_found(crm_sprint::ENTITY, sprint_id))?;
        if sprint.project_id != project_id {
            return Err(ServiceError::Validation("sprint belongs to a different project".into()));
        }
    }
    let Some(parent_id) = parent_id else { return Ok(()) };
    if issue_id == Some(parent_id) {
        return Err(ServiceError::Validation("an issue cannot be its own parent".into()));
    }
    let parent = crm_issue::find(db, parent_id).await?.ok_or_else(|| ServiceError::not_found(crm_issue::ENTITY, parent_id))?;
    if parent.project_id != project_id {
        return Err(ServiceError::Validation("parent issue belongs to a different project".into()));
    }
    if let Some(issue_id) = issue_id {
        let mut seen = HashSet::from([parent_id]);
        let mut cursor = parent.parent_id;
        while let Some(ancestor) = cursor {
            if ancestor == issue_id {
                return Err(ServiceError::Validation("parent issue would create a cycle".into()));
            }
            if !seen.insert(ancestor) {
                break;
            }
            cursor = crm_issue::find(db, ancestor).await?.and_then(|i| i.parent_id);
        }
    }
    Ok(())
}
