use std::sync::Arc;

use async_graphql::{EmptySubscription, MergedObject, Schema};

use configs::GraphqlConfig;
use service::{access::WorkspaceAccess, CrmService};

use super::comment::CommentMutation;
use super::issue::{IssueMutation, IssueQuery};
use super::project::{ProjectMutation, ProjectQuery};
use super::sprint::{SprintMutation, SprintQuery};
use super::time_log::{TimeLogMutation, TimeLogQuery};

#[derive(MergedObject, Default)]
pub struct QueryRoot(ProjectQuery, IssueQuery, SprintQuery, TimeLogQuery);

#[derive(MergedObject, Default)]
pub struct MutationRoot(ProjectMutation, IssueMutation, SprintMutation, CommentMutation, TimeLogMutation);

pub type CrmSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema with the service and membership checker as context data.
/// The caller's `CurrentUser` is attached per request.
pub fn build_schema(crm: CrmService, access: Arc<dyn WorkspaceAccess>, cfg: &GraphqlConfig) -> CrmSchema {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(crm)
        .data(access)
        .limit_depth(cfg.max_depth)
        .limit_complexity(cfg.max_complexity)
        .finish()
}
