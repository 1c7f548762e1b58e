use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("database unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Db(String),
}

impl ModelError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Rewrites "no row touched" store errors into `NotFound` for the given row.
    pub(crate) fn missing_row(err: DbErr, entity: &'static str, id: Uuid) -> Self {
        match err {
            DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => Self::not_found(entity, id),
            other => other.into(),
        }
    }
}

impl From<DbErr> for ModelError {
    fn from(err: DbErr) -> Self {
        if let Some(sql) = err.sql_err() {
            match sql {
                SqlErr::UniqueConstraintViolation(m) | SqlErr::ForeignKeyConstraintViolation(m) => {
                    return Self::Constraint(m)
                }
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }
        match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => Self::Unavailable(err.to_string()),
            other => Self::Db(other.to_string()),
        }
    }
}

pub(crate) fn require_non_empty(value: &str, field: &str) -> Result<(), ModelError> {
    if value.trim().is_empty() {
        return Err(ModelError::Validation(format!("{field} required")));
    }
    Ok(())
}
