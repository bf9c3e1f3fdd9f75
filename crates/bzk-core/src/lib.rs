//! Core domain types and traits for the bzk job orchestrator.
//!
//! This crate contains:
//! - Resource identifiers
//! - Project, job and secret material types
//! - Trigger normalization (webhook payloads to start requests)
//! - The executor trait for launching isolated execution units

pub mod error;
pub mod executor;
pub mod id;
pub mod job;
pub mod project;
pub mod secret;
pub mod trigger;

pub use error::{Error, Result};
pub use id::ResourceId;
