//! Service layer for the CRM: business rules on top of the `models` data access.
//! - `crm::CrmService` owns cross-entity checks, aggregates and cascading deletes.
//! - `access::WorkspaceAccess` answers membership questions for the API layer.

pub mod errors;
pub mod access;
pub mod crm;
#[cfg(test)]
pub mod test_support;

pub use crm::CrmService;
pub use errors::ServiceError;
