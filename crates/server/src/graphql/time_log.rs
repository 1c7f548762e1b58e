use async_graphql::{Context, InputObject, MaybeUndefined, Object, Result, ID};
use chrono::{DateTime, Utc};

use models::TimeLogRecord;
use service::access::Resource;
use service::crm::{NewTimeLog, TimeLogPatch};

use super::errors::GqlResultExt;
use super::guard::{authorize, authorize_owner, crm, parse_id};
use super::types::{from_utc, patch, to_id, utc, UserInfo};

const NO_ISSUE_ACCESS: &str = "No access to this issue";
const NO_TIME_LOG_ACCESS: &str = "No access to this time log";

pub struct CrmTimeLogType(pub TimeLogRecord);

impl From<models::crm_time_log::Model> for CrmTimeLogType {
    fn from(time_log: models::crm_time_log::Model) -> Self {
        Self(TimeLogRecord { time_log, user: None })
    }
}

#[Object]
impl CrmTimeLogType {
    async fn id(&self) -> ID { to_id(self.0.time_log.id) }
    async fn issue_id(&self) -> ID { to_id(self.0.time_log.issue_id) }
    async fn user_id(&self) -> ID { to_id(self.0.time_log.user_id) }
    /// Minutes.
    async fn time_spent(&self) -> i32 { self.0.time_log.time_spent }
    async fn description(&self) -> Option<&str> { self.0.time_log.description.as_deref() }
    async fn logged_at(&self) -> DateTime<Utc> { utc(self.0.time_log.logged_at) }
    async fn created_at(&self) -> DateTime<Utc> { utc(self.0.time_log.created_at) }
    async fn user(&self) -> Option<UserInfo> { self.0.user.clone().map(Into::into) }
}

#[derive(InputObject)]
pub struct CreateTimeLogInput {
    pub issue_id: ID,
    pub time_spent: i32,
    pub description: Option<String>,
    /// Defaults to now.
    pub logged_at: Option<DateTime<Utc>>,
}

#[derive(InputObject)]
pub struct UpdateTimeLogInput {
    pub time_spent: Option<i32>,
    pub description: MaybeUndefined<String>,
    pub logged_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct TimeLogQuery;

#[Object]
impl TimeLogQuery {
    async fn crm_issue_total_time(&self, ctx: &Context<'_>, issue_id: ID) -> Result<i64> {
        let issue_id = parse_id(&issue_id)?;
        authorize(ctx, Resource::Issue(issue_id), NO_ISSUE_ACCESS).await?;
        crm(ctx)?.get_total_time_spent(issue_id).await.gql()
    }
}

#[derive(Default)]
pub struct TimeLogMutation;

#[Object]
impl TimeLogMutation {
    /// The logging user is always the caller.
    async fn create_crm_time_log(&self, ctx: &Context<'_>, input: CreateTimeLogInput) -> Result<CrmTimeLogType> {
        let issue_id = parse_id(&input.issue_id)?;
        let (caller, _) = authorize(ctx, Resource::Issue(issue_id), NO_ISSUE_ACCESS).await?;
        let new = NewTimeLog {
            issue_id,
            user_id: caller,
            time_spent: input.time_spent,
            description: input.description,
            logged_at: input.logged_at.map(from_utc),
        };
        Ok(CrmTimeLogType(crm(ctx)?.create_time_log(new).await.gql()?))
    }

    async fn update_crm_time_log(&self, ctx: &Context<'_>, id: ID, input: UpdateTimeLogInput) -> Result<CrmTimeLogType> {
        let id = parse_id(&id)?;
        authorize_owner(ctx, Resource::TimeLog(id), NO_TIME_LOG_ACCESS, "Can only edit your own time logs").await?;
        let changes = TimeLogPatch {
            time_spent: input.time_spent,
            description: patch(input.description),
            logged_at: input.logged_at.map(from_utc),
        };
        Ok(CrmTimeLogType(crm(ctx)?.update_time_log(id, changes).await.gql()?))
    }

    async fn delete_crm_time_log(&self, ctx: &Context<'_>, id: ID) -> Result<CrmTimeLogType> {
        let id = parse_id(&id)?;
        authorize_owner(ctx, Resource::TimeLog(id), NO_TIME_LOG_ACCESS, "Can only delete your own time logs").await?;
        Ok(crm(ctx)?.delete_time_log(id).await.gql()?.into())
    }
}
