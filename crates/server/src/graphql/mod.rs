//! GraphQL API over the CRM service.
//!
//! Every root field authorizes the same way: resolve the target (or the project /
//! workspace named in the input) to its workspace, then check the caller's
//! membership. Comment and time-log edits also require the caller to own the row.

pub mod comment;
pub mod errors;
pub mod guard;
pub mod issue;
pub mod project;
pub mod schema;
pub mod sprint;
pub mod time_log;
pub mod types;

pub use schema::{build_schema, CrmSchema};
