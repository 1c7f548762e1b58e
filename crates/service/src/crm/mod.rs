pub mod inputs;
pub mod service;

pub use inputs::*;
pub use service::{CrmService, StatusCount};

#[cfg(test)]
mod tests;
