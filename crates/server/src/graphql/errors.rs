//! Mapping of service failures onto GraphQL errors carrying `extensions.code`.

use async_graphql::{Error, ErrorExtensions};
use service::ServiceError;

pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";

fn coded(message: impl Into<String>, code: &'static str) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

/// Convert a service error; store-level detail is logged, never returned.
pub fn service_error(err: ServiceError) -> Error {
    let code = err.code();
    match &err {
        ServiceError::Db(detail) => {
            tracing::error!(code, %detail, "crm store failure");
            coded("internal error", code)
        }
        ServiceError::StoreUnavailable(detail) => {
            tracing::error!(code, %detail, "crm store unavailable");
            coded("store unavailable", code)
        }
        ServiceError::Conflict(detail) => {
            tracing::warn!(code, %detail, "crm constraint violation");
            coded("conflicting record", code)
        }
        ServiceError::Validation(msg) => coded(msg.clone(), code),
        ServiceError::NotFound { .. } | ServiceError::Forbidden => coded(err.to_string(), code),
    }
}

pub fn forbidden(message: &str) -> Error {
    coded(message, "FORBIDDEN")
}

pub fn unauthenticated() -> Error {
    coded("authentication required", UNAUTHENTICATED)
}

pub fn bad_input(message: impl Into<String>) -> Error {
    coded(message, "BAD_USER_INPUT")
}

/// `?`-friendly conversion for service results inside resolvers.
pub trait GqlResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T> GqlResultExt<T> for Result<T, ServiceError> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(service_error)
    }
}
