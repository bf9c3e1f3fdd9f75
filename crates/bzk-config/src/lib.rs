//! Configuration for the bzk job orchestrator.
//!
//! This crate handles:
//! - Server configuration (KDL file with environment overrides)
//! - The typed view over a project's string-valued configuration map

pub mod error;
pub mod project;
pub mod server;

pub use error::{ConfigError, ConfigResult};
pub use project::ProjectSettings;
pub use server::{LogFormat, ServerConfig};
