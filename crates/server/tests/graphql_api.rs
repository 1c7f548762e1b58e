mod support;

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use server::graphql::build_schema;
use service::access::repository::mock::StaticWorkspaceAccess;
use support::{error_code, exec_on, ok, str_field, test_config, world, World};

const CREATE_ISSUE: &str = r#"
mutation($input: CreateIssueInput!) {
  createCrmIssue(input: $input) { id title status priority type reporterId storyPoints }
}"#;

const GET_ISSUE: &str = r#"
query($id: ID!) {
  crmIssue(id: $id) {
    id title description status priority type storyPoints
    reporter { id name }
    project { key }
    comments { content author { name } }
    timeLogs { timeSpent }
    commentsCount timeLogsCount totalTimeSpent
  }
}"#;

async fn create_issue(w: &World, caller: Uuid, input: serde_json::Value) -> String {
    let resp = w.exec(caller, CREATE_ISSUE, json!({ "input": input })).await;
    str_field(&ok(&resp)["createCrmIssue"]["id"])
}

async fn create_comment(w: &World, caller: Uuid, issue_id: &str, content: &str) -> String {
    let resp = w
        .exec(
            caller,
            "mutation($input: CreateCommentInput!) { createCrmComment(input: $input) { id authorId } }",
            json!({ "input": { "issueId": issue_id, "content": content } }),
        )
        .await;
    let data = ok(&resp);
    assert_eq!(str_field(&data["createCrmComment"]["authorId"]), caller.to_string());
    str_field(&data["createCrmComment"]["id"])
}

#[tokio::test]
async fn member_reads_issue_and_outsider_is_forbidden() -> anyhow::Result<()> {
    let w = world().await?;
    let issue_id = create_issue(
        &w,
        w.u1,
        json!({ "title": "Login fails", "projectId": w.project_id, "status": "TODO", "priority": "HIGH", "type": "BUG", "storyPoints": 3 }),
    )
    .await;

    let resp = w.exec(w.u1, GET_ISSUE, json!({ "id": issue_id })).await;
    let issue = &ok(&resp)["crmIssue"];
    assert_eq!(issue["title"], "Login fails");
    assert_eq!(issue["status"], "TODO");
    assert_eq!(issue["priority"], "HIGH");
    assert_eq!(issue["type"], "BUG");
    assert_eq!(issue["storyPoints"], 3);
    assert_eq!(issue["reporter"]["name"], "U1");
    assert_eq!(issue["project"]["key"], "PLAT");
    assert_eq!(issue["comments"], json!([]));
    assert_eq!(issue["commentsCount"], 0);
    assert_eq!(issue["totalTimeSpent"], 0);

    let resp = w.exec(w.u2, GET_ISSUE, json!({ "id": issue_id })).await;
    assert_eq!(error_code(&resp), "FORBIDDEN");
    assert_eq!(resp.errors[0].message, "No access to this issue");
    Ok(())
}

#[tokio::test]
async fn missing_issue_is_not_found_even_for_outsiders() -> anyhow::Result<()> {
    let w = world().await?;
    let resp = w.exec(w.u2, GET_ISSUE, json!({ "id": Uuid::new_v4() })).await;
    assert_eq!(error_code(&resp), "NOT_FOUND");

    let resp = w.exec(w.u1, GET_ISSUE, json!({ "id": "not-a-uuid" })).await;
    assert_eq!(error_code(&resp), "BAD_USER_INPUT");
    Ok(())
}

#[tokio::test]
async fn outsider_is_forbidden_on_every_project_entry_point() -> anyhow::Result<()> {
    let w = world().await?;
    let project = json!({ "id": w.project_id, "pid": w.project_id, "ws": w.workspace_id });

    let cases = [
        "query($id: ID!) { crmProject(id: $id) { id } }",
        "query($ws: ID!) { crmProjectsByWorkspace(workspaceId: $ws) { id } }",
        "query($pid: ID!) { crmIssuesByProject(projectId: $pid) { id } }",
        "query($pid: ID!) { crmIssueStatusCount(projectId: $pid) { status count } }",
        "query($pid: ID!) { crmSprintsByProject(projectId: $pid) { id } }",
        "mutation($id: ID!) { updateCrmProject(id: $id, input: { name: \"x\" }) { id } }",
        "mutation($id: ID!) { deleteCrmProject(id: $id) { id } }",
        "mutation($ws: ID!) { createCrmProject(input: { name: \"Ops\", key: \"OPS\", workspaceId: $ws }) { id } }",
        "mutation($pid: ID!) { createCrmIssue(input: { title: \"t\", projectId: $pid }) { id } }",
        "mutation($pid: ID!) { createCrmSprint(input: { name: \"S\", projectId: $pid, startDate: \"2024-06-01T00:00:00Z\", endDate: \"2024-06-14T00:00:00Z\" }) { id } }",
    ];
    for query in cases {
        let resp = w.exec(w.u2, query, project.clone()).await;
        assert_eq!(error_code(&resp), "FORBIDDEN", "{query}");
    }

    // Nothing was touched.
    let resp = w.exec(w.u1, "query($id: ID!) { crmProject(id: $id) { name issuesCount } }", project).await;
    assert_eq!(ok(&resp)["crmProject"]["name"], "Platform");
    Ok(())
}

#[tokio::test]
async fn outsider_is_forbidden_on_every_issue_scoped_entry_point() -> anyhow::Result<()> {
    let w = world().await?;
    let issue_id = create_issue(&w, w.u1, json!({ "title": "I1", "projectId": w.project_id })).await;
    let comment_id = create_comment(&w, w.u1, &issue_id, "keep me").await;
    let resp = w
        .exec(
            w.u1,
            "mutation($input: CreateTimeLogInput!) { createCrmTimeLog(input: $input) { id } }",
            json!({ "input": { "issueId": issue_id, "timeSpent": 20 } }),
        )
        .await;
    let log_id = str_field(&ok(&resp)["createCrmTimeLog"]["id"]);
    let resp = w
        .exec(
            w.u1,
            "mutation($pid: ID!) { createCrmSprint(input: { name: \"S1\", projectId: $pid, startDate: \"2024-06-01T00:00:00Z\", endDate: \"2024-06-14T00:00:00Z\" }) { id } }",
            json!({ "pid": w.project_id }),
        )
        .await;
    let sprint_id = str_field(&ok(&resp)["createCrmSprint"]["id"]);
    let ids = json!({ "iid": issue_id, "sid": sprint_id, "cid": comment_id, "tid": log_id });

    let cases = [
        "query($iid: ID!) { crmIssue(id: $iid) { id } }",
        "query($iid: ID!) { crmIssueTotalTime(issueId: $iid) }",
        "mutation($iid: ID!) { updateCrmIssue(id: $iid, input: { title: \"x\" }) { id } }",
        "mutation($iid: ID!) { deleteCrmIssue(id: $iid) { id } }",
        "query($sid: ID!) { crmSprint(id: $sid) { id } }",
        "mutation($sid: ID!) { updateCrmSprint(id: $sid, input: { name: \"x\" }) { id } }",
        "mutation($sid: ID!) { deleteCrmSprint(id: $sid) { id } }",
        "mutation($iid: ID!) { createCrmComment(input: { issueId: $iid, content: \"x\" }) { id } }",
        "mutation($cid: ID!) { updateCrmComment(id: $cid, input: { content: \"x\" }) { id } }",
        "mutation($cid: ID!) { deleteCrmComment(id: $cid) { id } }",
        "mutation($iid: ID!) { createCrmTimeLog(input: { issueId: $iid, timeSpent: 5 }) { id } }",
        "mutation($tid: ID!) { updateCrmTimeLog(id: $tid, input: { timeSpent: 5 }) { id } }",
        "mutation($tid: ID!) { deleteCrmTimeLog(id: $tid) { id } }",
    ];
    for query in cases {
        let resp = w.exec(w.u2, query, ids.clone()).await;
        assert_eq!(error_code(&resp), "FORBIDDEN", "{query}");
    }

    // Nothing was touched.
    let resp = w.exec(w.u1, GET_ISSUE, json!({ "id": issue_id })).await;
    let data = ok(&resp);
    let issue = &data["crmIssue"];
    assert_eq!(issue["title"], "I1");
    assert_eq!(issue["comments"][0]["content"], "keep me");
    assert_eq!(issue["commentsCount"], 1);
    assert_eq!(issue["totalTimeSpent"], 20);
    let resp = w.exec(w.u1, "query($sid: ID!) { crmSprint(id: $sid) { name } }", ids).await;
    assert_eq!(ok(&resp)["crmSprint"]["name"], "S1");
    Ok(())
}

#[tokio::test]
async fn revoked_member_loses_own_comment() -> anyhow::Result<()> {
    let w = world().await?;
    let issue_id = create_issue(&w, w.u1, json!({ "title": "I1", "projectId": w.project_id })).await;
    let comment_id = create_comment(&w, w.u1, &issue_id, "mine").await;

    let access = Arc::new(StaticWorkspaceAccess::default());
    access.grant(w.workspace_id, w.u1);
    let schema = build_schema(w.state.crm.clone(), access.clone(), &test_config().graphql);
    let update = "mutation($id: ID!, $c: String!) { updateCrmComment(id: $id, input: { content: $c }) { content } }";

    let resp = exec_on(&schema, w.u1, update, json!({ "id": comment_id, "c": "still mine" })).await;
    assert_eq!(ok(&resp)["updateCrmComment"]["content"], "still mine");

    access.revoke(w.workspace_id, w.u1);
    let resp = exec_on(&schema, w.u1, update, json!({ "id": comment_id, "c": "gone" })).await;
    assert_eq!(error_code(&resp), "FORBIDDEN");
    assert_eq!(resp.errors[0].message, "No access to this comment");
    let resp = exec_on(&schema, w.u1, "mutation($id: ID!) { deleteCrmComment(id: $id) { id } }", json!({ "id": comment_id })).await;
    assert_eq!(error_code(&resp), "FORBIDDEN");

    // Existence is still checked before membership.
    let resp = exec_on(&schema, w.u1, update, json!({ "id": Uuid::new_v4(), "c": "x" })).await;
    assert_eq!(error_code(&resp), "NOT_FOUND");

    access.grant(w.workspace_id, w.u1);
    let resp = exec_on(&schema, w.u1, update, json!({ "id": comment_id, "c": "back" })).await;
    assert_eq!(ok(&resp)["updateCrmComment"]["content"], "back");
    Ok(())
}

#[tokio::test]
async fn comment_edits_are_author_only() -> anyhow::Result<()> {
    let w = world().await?;
    let issue_id = create_issue(&w, w.u1, json!({ "title": "I1", "projectId": w.project_id })).await;
    let comment_id = create_comment(&w, w.u1, &issue_id, "first").await;

    let update = "mutation($id: ID!, $c: String!) { updateCrmComment(id: $id, input: { content: $c }) { content } }";
    let resp = w.exec(w.u1, update, json!({ "id": comment_id, "c": "edited" })).await;
    assert_eq!(ok(&resp)["updateCrmComment"]["content"], "edited");

    // U3 is a workspace owner and the project lead, but not the author.
    let resp = w.exec(w.u3, update, json!({ "id": comment_id, "c": "hijack" })).await;
    assert_eq!(error_code(&resp), "FORBIDDEN");
    assert_eq!(resp.errors[0].message, "Can only edit your own comments");

    let delete = "mutation($id: ID!) { deleteCrmComment(id: $id) { id } }";
    let resp = w.exec(w.u3, delete, json!({ "id": comment_id })).await;
    assert_eq!(resp.errors[0].message, "Can only delete your own comments");

    let resp = w.exec(w.u2, update, json!({ "id": comment_id, "c": "x" })).await;
    assert_eq!(error_code(&resp), "FORBIDDEN");

    let resp = w.exec(w.u1, GET_ISSUE, json!({ "id": issue_id })).await;
    let issue = &ok(&resp)["crmIssue"];
    assert_eq!(issue["comments"][0]["content"], "edited");
    assert_eq!(issue["comments"][0]["author"]["name"], "U1");

    let resp = w.exec(w.u1, delete, json!({ "id": comment_id })).await;
    ok(&resp);
    let resp = w.exec(w.u1, delete, json!({ "id": comment_id })).await;
    assert_eq!(error_code(&resp), "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn time_logs_sum_and_stay_owner_only() -> anyhow::Result<()> {
    let w = world().await?;
    let issue_id = create_issue(&w, w.u1, json!({ "title": "I1", "projectId": w.project_id })).await;
    let total = "query($id: ID!) { crmIssueTotalTime(issueId: $id) }";

    let resp = w.exec(w.u1, total, json!({ "id": issue_id })).await;
    assert_eq!(ok(&resp)["crmIssueTotalTime"], 0);

    let log = "mutation($input: CreateTimeLogInput!) { createCrmTimeLog(input: $input) { id userId timeSpent } }";
    let resp = w.exec(w.u1, log, json!({ "input": { "issueId": issue_id, "timeSpent": 30 } })).await;
    let first = ok(&resp);
    assert_eq!(str_field(&first["createCrmTimeLog"]["userId"]), w.u1.to_string());
    let log_id = str_field(&first["createCrmTimeLog"]["id"]);
    let resp = w.exec(w.u3, log, json!({ "input": { "issueId": issue_id, "timeSpent": 45, "description": "review" } })).await;
    ok(&resp);

    let resp = w.exec(w.u1, total, json!({ "id": issue_id })).await;
    assert_eq!(ok(&resp)["crmIssueTotalTime"], 75);
    let resp = w.exec(w.u2, total, json!({ "id": issue_id })).await;
    assert_eq!(error_code(&resp), "FORBIDDEN");

    let resp = w.exec(w.u1, log, json!({ "input": { "issueId": issue_id, "timeSpent": 0 } })).await;
    assert_eq!(error_code(&resp), "BAD_USER_INPUT");

    let update = "mutation($id: ID!) { updateCrmTimeLog(id: $id, input: { timeSpent: 40 }) { timeSpent } }";
    let resp = w.exec(w.u3, update, json!({ "id": log_id })).await;
    assert_eq!(error_code(&resp), "FORBIDDEN");
    let resp = w.exec(w.u1, update, json!({ "id": log_id })).await;
    assert_eq!(ok(&resp)["updateCrmTimeLog"]["timeSpent"], 40);

    let delete = "mutation($id: ID!) { deleteCrmTimeLog(id: $id) { id } }";
    let resp = w.exec(w.u3, delete, json!({ "id": log_id })).await;
    assert_eq!(resp.errors[0].message, "Can only delete your own time logs");
    let resp = w.exec(w.u1, delete, json!({ "id": log_id })).await;
    ok(&resp);

    let resp = w.exec(w.u1, total, json!({ "id": issue_id })).await;
    assert_eq!(ok(&resp)["crmIssueTotalTime"], 45);
    Ok(())
}

#[tokio::test]
async fn status_count_lists_all_statuses() -> anyhow::Result<()> {
    let w = world().await?;
    for status in ["TODO", "TODO", "DONE"] {
        create_issue(&w, w.u1, json!({ "title": "t", "projectId": w.project_id, "status": status })).await;
    }
    let resp = w
        .exec(w.u1, "query($pid: ID!) { crmIssueStatusCount(projectId: $pid) { status count } }", json!({ "pid": w.project_id }))
        .await;
    let data = ok(&resp);
    let rows = data["crmIssueStatusCount"].as_array().expect("rows");
    assert_eq!(rows.len(), 6);
    let count_of = |s: &str| rows.iter().find(|r| r["status"] == s).map(|r| r["count"].as_i64().unwrap_or(-1));
    assert_eq!(count_of("TODO"), Some(2));
    assert_eq!(count_of("DONE"), Some(1));
    assert_eq!(count_of("BACKLOG"), Some(0));
    assert_eq!(rows.iter().map(|r| r["count"].as_i64().unwrap_or(0)).sum::<i64>(), 3);
    Ok(())
}

#[tokio::test]
async fn partial_update_touches_only_supplied_fields() -> anyhow::Result<()> {
    let w = world().await?;
    let issue_id = create_issue(
        &w,
        w.u1,
        json!({ "title": "Old", "description": "keep me", "projectId": w.project_id, "priority": "LOW", "assigneeId": w.u3 }),
    )
    .await;

    let update = "mutation($id: ID!, $input: UpdateIssueInput!) { updateCrmIssue(id: $id, input: $input) { title description priority assigneeId status } }";
    let resp = w.exec(w.u3, update, json!({ "id": issue_id, "input": { "title": "New" } })).await;
    let issue = ok(&resp)["updateCrmIssue"].clone();
    assert_eq!(issue["title"], "New");
    assert_eq!(issue["description"], "keep me");
    assert_eq!(issue["priority"], "LOW");
    assert_eq!(str_field(&issue["assigneeId"]), w.u3.to_string());
    assert_eq!(issue["status"], "BACKLOG");

    let resp = w.exec(w.u1, update, json!({ "id": issue_id, "input": { "description": null, "assigneeId": null } })).await;
    let issue = ok(&resp)["updateCrmIssue"].clone();
    assert_eq!(issue["description"], serde_json::Value::Null);
    assert_eq!(issue["assigneeId"], serde_json::Value::Null);
    assert_eq!(issue["title"], "New");

    let resp = w.exec(w.u1, update, json!({ "id": issue_id, "input": { "title": "  " } })).await;
    assert_eq!(error_code(&resp), "BAD_USER_INPUT");
    Ok(())
}

#[tokio::test]
async fn parent_links_reject_cycles() -> anyhow::Result<()> {
    let w = world().await?;
    let epic = create_issue(&w, w.u1, json!({ "title": "Epic", "projectId": w.project_id, "type": "EPIC" })).await;
    let story = create_issue(&w, w.u1, json!({ "title": "Story", "projectId": w.project_id, "parentId": epic })).await;

    let resp = w
        .exec(w.u1, "query($id: ID!) { crmIssue(id: $id) { subtasks { id parentId } } }", json!({ "id": epic }))
        .await;
    assert_eq!(str_field(&ok(&resp)["crmIssue"]["subtasks"][0]["id"]), story);

    let update = "mutation($id: ID!, $p: ID) { updateCrmIssue(id: $id, input: { parentId: $p }) { id } }";
    let resp = w.exec(w.u1, update, json!({ "id": epic, "p": story })).await;
    assert_eq!(error_code(&resp), "BAD_USER_INPUT");
    let resp = w.exec(w.u1, update, json!({ "id": epic, "p": epic })).await;
    assert_eq!(error_code(&resp), "BAD_USER_INPUT");

    // Deleting the epic orphans the story.
    let resp = w.exec(w.u1, "mutation($id: ID!) { deleteCrmIssue(id: $id) { id } }", json!({ "id": epic })).await;
    ok(&resp);
    let resp = w.exec(w.u1, "query($id: ID!) { crmIssue(id: $id) { parentId } }", json!({ "id": story })).await;
    assert_eq!(ok(&resp)["crmIssue"]["parentId"], serde_json::Value::Null);
    Ok(())
}

#[tokio::test]
async fn sprint_lifecycle() -> anyhow::Result<()> {
    let w = world().await?;
    let create = r#"mutation($pid: ID!) {
      createCrmSprint(input: { name: "Sprint 1", projectId: $pid, startDate: "2024-06-01T00:00:00Z", endDate: "2024-06-14T00:00:00Z" }) { id isActive }
    }"#;
    let resp = w.exec(w.u1, create, json!({ "pid": w.project_id })).await;
    let data = ok(&resp);
    assert_eq!(data["createCrmSprint"]["isActive"], false);
    let sprint_id = str_field(&data["createCrmSprint"]["id"]);

    let issue_id = create_issue(&w, w.u1, json!({ "title": "In sprint", "projectId": w.project_id, "sprintId": sprint_id })).await;

    let resp = w
        .exec(w.u1, "query($id: ID!) { crmSprint(id: $id) { name issuesCount issues { id } project { key } } }", json!({ "id": sprint_id }))
        .await;
    let sprint = ok(&resp)["crmSprint"].clone();
    assert_eq!(sprint["issuesCount"], 1);
    assert_eq!(str_field(&sprint["issues"][0]["id"]), issue_id);
    assert_eq!(sprint["project"]["key"], "PLAT");

    let bad_window = "mutation($id: ID!) { updateCrmSprint(id: $id, input: { endDate: \"2024-05-01T00:00:00Z\" }) { id } }";
    let resp = w.exec(w.u1, bad_window, json!({ "id": sprint_id })).await;
    assert_eq!(error_code(&resp), "BAD_USER_INPUT");

    let resp = w.exec(w.u2, "mutation($id: ID!) { deleteCrmSprint(id: $id) { id } }", json!({ "id": sprint_id })).await;
    assert_eq!(error_code(&resp), "FORBIDDEN");
    assert_eq!(resp.errors[0].message, "No access to this sprint");

    let resp = w.exec(w.u1, "mutation($id: ID!) { deleteCrmSprint(id: $id) { id } }", json!({ "id": sprint_id })).await;
    ok(&resp);
    let resp = w.exec(w.u1, "query($id: ID!) { crmIssue(id: $id) { sprintId } }", json!({ "id": issue_id })).await;
    assert_eq!(ok(&resp)["crmIssue"]["sprintId"], serde_json::Value::Null);
    Ok(())
}

#[tokio::test]
async fn project_cascade_and_conflicts() -> anyhow::Result<()> {
    let w = world().await?;
    let issue_id = create_issue(&w, w.u1, json!({ "title": "I1", "projectId": w.project_id })).await;
    create_comment(&w, w.u1, &issue_id, "note").await;

    let dup = "mutation($ws: ID!) { createCrmProject(input: { name: \"Again\", key: \"PLAT\", workspaceId: $ws }) { id } }";
    let resp = w.exec(w.u1, dup, json!({ "ws": w.workspace_id })).await;
    assert_eq!(error_code(&resp), "CONFLICT");

    let resp = w
        .exec(w.u1, "query($ws: ID!) { crmProjectsByWorkspace(workspaceId: $ws) { key issuesCount lead { name } } }", json!({ "ws": w.workspace_id }))
        .await;
    let projects = ok(&resp)["crmProjectsByWorkspace"].clone();
    assert_eq!(projects[0]["issuesCount"], 1);
    assert_eq!(projects[0]["lead"]["name"], "U3");

    let resp = w.exec(w.u1, "mutation($id: ID!) { deleteCrmProject(id: $id) { key } }", json!({ "id": w.project_id })).await;
    assert_eq!(ok(&resp)["deleteCrmProject"]["key"], "PLAT");
    let resp = w.exec(w.u1, GET_ISSUE, json!({ "id": issue_id })).await;
    assert_eq!(error_code(&resp), "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn anonymous_callers_are_unauthenticated() -> anyhow::Result<()> {
    let w = world().await?;
    let resp = w.exec_anonymous(&format!("{{ crmProject(id: \"{}\") {{ id }} }}", w.project_id)).await;
    assert_eq!(error_code(&resp), "UNAUTHENTICATED");
    Ok(())
}
