//! Execution unit backends for the bzk job orchestrator.
//!
//! Provides the local Docker executor used to launch orchestration
//! containers.

pub mod docker;

pub use bzk_core::executor::{Executor, ExecutionHandle, RemoveOptions, RunSpec, VolumeBind};
pub use docker::DockerExecutor;
