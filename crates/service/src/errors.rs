use models::errors::ModelError;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("forbidden")]
    Forbidden,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("database error: {0}")]
    Db(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self { Self::NotFound { entity, id } }

    /// Stable machine-readable code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "BAD_USER_INPUT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Db(_) => "INTERNAL",
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(m) => Self::Validation(m),
            ModelError::NotFound { entity, id } => Self::NotFound { entity, id },
            ModelError::Constraint(m) => Self::Conflict(m),
            ModelError::Unavailable(m) => Self::StoreUnavailable(m),
            ModelError::Db(m) => Self::Db(m),
        }
    }
}

impl From<DbErr> for ServiceError {
    fn from(e: DbErr) -> Self { ModelError::from(e).into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_errors_map_to_codes() {
        let id = Uuid::new_v4();
        let cases = [
            (ModelError::Validation("x".into()), "BAD_USER_INPUT"),
            (ModelError::not_found("issue", id), "NOT_FOUND"),
            (ModelError::Constraint("dup".into()), "CONFLICT"),
            (ModelError::Unavailable("pool".into()), "STORE_UNAVAILABLE"),
            (ModelError::Db("boom".into()), "INTERNAL"),
        ];
        for (model, code) in cases {
            assert_eq!(ServiceError::from(model).code(), code);
        }
        assert_eq!(ServiceError::Forbidden.code(), "FORBIDDEN");
    }

    #[test]
    fn not_found_message_names_entity() {
        let id = Uuid::nil();
        assert_eq!(ServiceError::not_found("sprint", id).to_string(), format!("sprint {id} not found"));
    }
}
