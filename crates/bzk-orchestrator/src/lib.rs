//! Job orchestration for bzk.
//!
//! Turns a start request into a running execution unit: provisions the
//! per-job filesystem resources, assembles the unit's environment, launches
//! it and watches it until it exits.

pub mod engine;
pub mod environment;
pub mod layout;
pub mod monitor;
pub mod provision;
pub mod registry;
pub mod settings;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use engine::{JobEngine, ORCHESTRATION_IMAGE};
pub use environment::{LaunchEnvironment, assemble};
pub use layout::BuildLayout;
pub use monitor::{Cleanup, JobMonitor, MonitorOutcome, MonitorReport, record_outcomes};
pub use provision::{Provisioned, Provisioner};
pub use registry::ProjectRegistry;
pub use settings::OrchestratorSettings;
