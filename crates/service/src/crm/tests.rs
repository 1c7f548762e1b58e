use chrono::{Duration, TimeZone, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

use models::{IssueStatus, IssueType};

use super::*;
use crate::access::{Resource, SeaOrmWorkspaceAccess, WorkspaceAccess};
use crate::errors::ServiceError;
use crate::test_support::{world, World};

fn issue(w: &World, title: &str) -> NewIssue {
    NewIssue { title: title.into(), project_id: w.project_id, reporter_id: w.member, ..Default::default() }
}

fn sprint(w: &World, name: &str, start_day: u32) -> NewSprint {
    let start: DateTimeWithTimeZone = Utc.with_ymd_and_hms(2024, 6, start_day, 0, 0, 0).unwrap().into();
    NewSprint {
        name: name.into(),
        goal: None,
        project_id: w.project_id,
        start_date: start,
        end_date: start + Duration::days(14),
        is_active: None,
    }
}

#[tokio::test]
async fn status_count_is_zero_filled_and_sums_to_total() {
    let w = world().await;
    for status in [IssueStatus::Todo, IssueStatus::Todo, IssueStatus::Done] {
        w.svc.create_issue(NewIssue { status: Some(status), ..issue(&w, "t") }).await.unwrap();
    }
    let counts = w.svc.get_issue_status_count(w.project_id).await.unwrap();
    assert_eq!(counts.len(), 6);
    let get = |s: IssueStatus| counts.iter().find(|c| c.status == s).map(|c| c.count);
    assert_eq!(get(IssueStatus::Todo), Some(2));
    assert_eq!(get(IssueStatus::Done), Some(1));
    assert_eq!(get(IssueStatus::Backlog), Some(0));
    assert_eq!(get(IssueStatus::Cancelled), Some(0));
    let total: u64 = counts.iter().map(|c| c.count).sum();
    assert_eq!(total, w.svc.count_issues_by_project(w.project_id).await.unwrap());
}

#[tokio::test]
async fn total_time_spent_defaults_to_zero() {
    let w = world().await;
    let i = w.svc.create_issue(issue(&w, "t")).await.unwrap().issue;
    assert_eq!(w.svc.get_total_time_spent(i.id).await.unwrap(), 0);
    for minutes in [30, 45] {
        w.svc
            .create_time_log(NewTimeLog { issue_id: i.id, user_id: w.member, time_spent: minutes, description: None, logged_at: None })
            .await
            .unwrap();
    }
    assert_eq!(w.svc.get_total_time_spent(i.id).await.unwrap(), 75);
}

#[tokio::test]
async fn deleting_a_project_removes_everything_under_it() {
    let w = world().await;
    let s = w.svc.create_sprint(sprint(&w, "S1", 1)).await.unwrap().sprint;
    let parent = w.svc.create_issue(NewIssue { sprint_id: Some(s.id), ..issue(&w, "epic") }).await.unwrap().issue;
    let child = w.svc.create_issue(NewIssue { parent_id: Some(parent.id), ..issue(&w, "sub") }).await.unwrap().issue;
    let c = w.svc.create_comment(NewComment { content: "c".into(), issue_id: child.id, author_id: w.member }).await.unwrap();
    let l = w.svc
        .create_time_log(NewTimeLog { issue_id: parent.id, user_id: w.member, time_spent: 10, description: None, logged_at: None })
        .await
        .unwrap();

    let deleted = w.svc.delete_project(w.project_id).await.unwrap();
    assert_eq!(deleted.id, w.project_id);

    assert!(matches!(w.svc.get_project(w.project_id).await, Err(ServiceError::NotFound { .. })));
    assert!(matches!(w.svc.get_sprint(s.id).await, Err(ServiceError::NotFound { .. })));
    assert!(matches!(w.svc.get_issue(parent.id).await, Err(ServiceError::NotFound { .. })));
    assert!(matches!(w.svc.get_issue(child.id).await, Err(ServiceError::NotFound { .. })));
    assert!(matches!(w.svc.get_comment(c.comment.id).await, Err(ServiceError::NotFound { .. })));
    assert!(matches!(w.svc.get_time_log(l.time_log.id).await, Err(ServiceError::NotFound { .. })));
    assert_eq!(w.svc.count_projects_by_workspace(w.workspace_id).await.unwrap(), 0);

    let again = w.svc.delete_project(w.project_id).await.unwrap_err();
    assert_eq!(again.code(), "NOT_FOUND");
}

#[tokio::test]
async fn deleting_a_sprint_keeps_its_issues() {
    let w = world().await;
    let s = w.svc.create_sprint(sprint(&w, "S1", 1)).await.unwrap().sprint;
    let i = w.svc.create_issue(NewIssue { sprint_id: Some(s.id), ..issue(&w, "planned") }).await.unwrap().issue;

    w.svc.delete_sprint(s.id).await.unwrap();
    let i = w.svc.get_issue(i.id).await.unwrap();
    assert!(i.issue.sprint_id.is_none());
    assert!(i.sprint.is_none());
}

#[tokio::test]
async fn deleting_an_issue_drops_comments_and_orphans_subtasks() {
    let w = world().await;
    let parent = w.svc.create_issue(issue(&w, "epic")).await.unwrap().issue;
    let child = w.svc.create_issue(NewIssue { parent_id: Some(parent.id), issue_type: Some(IssueType::Subtask), ..issue(&w, "sub") }).await.unwrap().issue;
    let c = w.svc.create_comment(NewComment { content: "c".into(), issue_id: parent.id, author_id: w.member }).await.unwrap();
    assert_eq!(w.svc.get_subtasks(parent.id).await.unwrap().len(), 1);

    let deleted = w.svc.delete_issue(parent.id).await.unwrap();
    assert_eq!(deleted.id, parent.id);
    assert!(matches!(w.svc.get_comment(c.comment.id).await, Err(ServiceError::NotFound { entity: "comment", .. })));
    let child = w.svc.get_issue(child.id).await.unwrap();
    assert!(child.issue.parent_id.is_none());
    assert_eq!(child.issue.issue_type, IssueType::Subtask);
}

#[tokio::test]
async fn issue_links_must_stay_in_project_and_acyclic() {
    let w = world().await;
    let a = w.svc.create_issue(issue(&w, "a")).await.unwrap().issue;
    let b = w.svc.create_issue(NewIssue { parent_id: Some(a.id), ..issue(&w, "b") }).await.unwrap().issue;
    let c = w.svc.create_issue(NewIssue { parent_id: Some(b.id), ..issue(&w, "c") }).await.unwrap().issue;

    let err = w.svc.update_issue(a.id, IssuePatch { parent_id: Some(Some(c.id)), ..Default::default() }).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)), "{err:?}");
    let err = w.svc.update_issue(a.id, IssuePatch { parent_id: Some(Some(a.id)), ..Default::default() }).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    // re-parenting to a non-descendant is fine, and clearing works
    let moved = w.svc.update_issue(c.id, IssuePatch { parent_id: Some(Some(a.id)), ..Default::default() }).await.unwrap();
    assert_eq!(moved.issue.parent_id, Some(a.id));
    let cleared = w.svc.update_issue(c.id, IssuePatch { parent_id: Some(None), ..Default::default() }).await.unwrap();
    assert!(cleared.issue.parent_id.is_none());

    let other = w.svc
        .create_project(NewProject { name: "Other".into(), key: "OTH".into(), description: None, workspace_id: w.workspace_id, lead_id: None })
        .await
        .unwrap();
    let foreign_sprint = w.svc
        .create_sprint(NewSprint { project_id: other.project.id, ..sprint(&w, "X", 1) })
        .await
        .unwrap()
        .sprint;
    let err = w.svc.create_issue(NewIssue { sprint_id: Some(foreign_sprint.id), ..issue(&w, "d") }).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    let err = w.svc.create_issue(NewIssue { parent_id: Some(Uuid::new_v4()), ..issue(&w, "e") }).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "issue", .. }));
}

#[tokio::test]
async fn sprint_update_checks_merged_window() {
    let w = world().await;
    let s = w.svc.create_sprint(sprint(&w, "S1", 10)).await.unwrap().sprint;
    let too_late: DateTimeWithTimeZone = Utc.with_ymd_and_hms(2024, 7, 30, 0, 0, 0).unwrap().into();
    let err = w.svc
        .update_sprint(s.id, SprintPatch { start_date: Some(too_late), ..Default::default() })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "BAD_USER_INPUT");

    let rec = w.svc
        .update_sprint(s.id, SprintPatch { is_active: Some(true), goal: Some(Some("ship it".into())), ..Default::default() })
        .await
        .unwrap();
    assert!(rec.sprint.is_active);
    assert_eq!(rec.sprint.start_date, s.start_date);

    let err = w.svc.update_sprint(Uuid::new_v4(), SprintPatch::default()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "sprint", .. }));
}

#[tokio::test]
async fn sprints_list_newest_start_first_with_counts() {
    let w = world().await;
    let early = w.svc.create_sprint(sprint(&w, "early", 1)).await.unwrap().sprint;
    let late = w.svc.create_sprint(sprint(&w, "late", 20)).await.unwrap().sprint;
    w.svc.create_issue(NewIssue { sprint_id: Some(early.id), ..issue(&w, "x") }).await.unwrap();

    let list = w.svc.get_sprints_by_project(w.project_id).await.unwrap();
    assert_eq!(list.iter().map(|s| s.sprint.id).collect::<Vec<_>>(), vec![late.id, early.id]);
    assert_eq!(list[0].issues_count, Some(0));
    assert_eq!(list[1].issues_count, Some(1));
}

#[tokio::test]
async fn duplicate_project_key_is_a_conflict() {
    let w = world().await;
    let err = w.svc
        .create_project(NewProject { name: "Dup".into(), key: "plat".into(), description: None, workspace_id: w.workspace_id, lead_id: None })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
}

#[tokio::test]
async fn scope_resolves_through_project_to_workspace() {
    let w = world().await;
    let i = w.svc.create_issue(issue(&w, "t")).await.unwrap().issue;
    let s = w.svc.create_sprint(sprint(&w, "S", 1)).await.unwrap().sprint;
    let c = w.svc.create_comment(NewComment { content: "c".into(), issue_id: i.id, author_id: w.other_member }).await.unwrap();
    let l = w.svc
        .create_time_log(NewTimeLog { issue_id: i.id, user_id: w.member, time_spent: 5, description: None, logged_at: None })
        .await
        .unwrap();

    for r in [Resource::Workspace(w.workspace_id), Resource::Project(w.project_id), Resource::Issue(i.id), Resource::Sprint(s.id)] {
        let scope = w.svc.resolve_scope(r).await.unwrap();
        assert_eq!(scope.workspace_id, w.workspace_id, "{r:?}");
        assert_eq!(scope.owner_id, None);
    }
    let scope = w.svc.resolve_scope(Resource::Comment(c.comment.id)).await.unwrap();
    assert_eq!(scope.owner_id, Some(w.other_member));
    let scope = w.svc.resolve_scope(Resource::TimeLog(l.time_log.id)).await.unwrap();
    assert_eq!(scope.owner_id, Some(w.member));

    for r in [Resource::Project(Uuid::new_v4()), Resource::Comment(Uuid::new_v4()), Resource::Workspace(Uuid::new_v4())] {
        assert_eq!(w.svc.resolve_scope(r).await.unwrap_err().code(), "NOT_FOUND");
    }
}

#[tokio::test]
async fn seaorm_access_reads_membership_table() {
    let w = world().await;
    let access = SeaOrmWorkspaceAccess::new(w.svc.db().clone());
    assert!(access.is_workspace_member(w.workspace_id, w.member).await.unwrap());
    assert!(access.is_workspace_member(w.workspace_id, w.other_member).await.unwrap());
    assert!(!access.is_workspace_member(w.workspace_id, w.outsider).await.unwrap());
}
