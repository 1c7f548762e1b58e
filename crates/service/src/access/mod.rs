//! Workspace membership: the only question authorization asks of the store.

pub mod repository;
pub mod seaorm;

pub use repository::WorkspaceAccess;
pub use seaorm::SeaOrmWorkspaceAccess;

use uuid::Uuid;

/// Anything a request can target; each resolves to exactly one workspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Workspace(Uuid),
    Project(Uuid),
    Issue(Uuid),
    Sprint(Uuid),
    Comment(Uuid),
    TimeLog(Uuid),
}

/// Where a resource lives, plus its owner for author-only rows (comments, time logs).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scope {
    pub workspace_id: Uuid,
    pub owner_id: Option<Uuid>,
}
