//! Executor trait and execution unit types.
//!
//! An executor launches the isolated unit (a container) that performs one
//! build. The orchestrator only needs three things from it: run detached,
//! wait for exit, and force-remove.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ResourceId, Result};

/// Everything needed to launch one execution unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpec {
    /// Job the unit belongs to.
    pub job_id: ResourceId,
    /// Image to run.
    pub image: String,
    /// Environment variables.
    pub env: BTreeMap<String, String>,
    /// Host paths bound into the unit.
    pub volumes: Vec<VolumeBind>,
}

/// A host path bound into the execution unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeBind {
    pub host_path: String,
    pub container_path: String,
}

impl VolumeBind {
    pub fn new(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
        }
    }

    /// `host:container` form understood by container runtimes.
    pub fn to_bind_string(&self) -> String {
        format!("{}:{}", self.host_path, self.container_path)
    }
}

/// Handle to a launched execution unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionHandle {
    /// The job the unit was launched for.
    pub job_id: ResourceId,
    /// Executor-specific identifier (e.g. container ID).
    pub executor_id: String,
    /// Name of the executor running this unit.
    pub executor_name: String,
}

/// How to remove a finished unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOptions {
    pub force: bool,
    pub remove_volumes: bool,
}

impl RemoveOptions {
    /// Force removal, dropping anonymous volumes along with the unit.
    pub fn purge() -> Self {
        Self {
            force: true,
            remove_volumes: true,
        }
    }
}

/// Trait for execution unit backends.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Name of this executor.
    fn name(&self) -> &'static str;

    /// Launch a unit without waiting for it.
    async fn spawn(&self, spec: RunSpec) -> Result<ExecutionHandle>;

    /// Block until the unit exits and return its exit code.
    async fn wait(&self, handle: &ExecutionHandle) -> Result<i64>;

    /// Remove a unit.
    async fn remove(&self, handle: &ExecutionHandle, options: RemoveOptions) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_string() {
        let bind = VolumeBind::new("/srv/bzk/build/p/j", "/bazooka");
        assert_eq!(bind.to_bind_string(), "/srv/bzk/build/p/j:/bazooka");
    }

    #[test]
    fn test_purge_options() {
        let opts = RemoveOptions::purge();
        assert!(opts.force);
        assert!(opts.remove_volumes);
    }
}
