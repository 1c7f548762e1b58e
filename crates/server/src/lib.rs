pub mod graphql;
pub mod routes;
pub mod startup;

pub use startup::{build_app, build_state, run};
