//! API server for the bzk job orchestrator.
//!
//! Provides the HTTP REST API over projects, jobs and images.

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use state::AppState;
