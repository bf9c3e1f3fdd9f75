//! Application state.

use bzk_core::executor::Executor;
use bzk_db::Repositories;
use bzk_orchestrator::{JobEngine, JobMonitor, MonitorReport, OrchestratorSettings, ProjectRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub engine: Arc<JobEngine>,
    pub registry: Arc<ProjectRegistry>,
}

impl AppState {
    /// Wire the orchestrator. Monitor reports go to `reports`; monitors stop
    /// when `shutdown` is cancelled.
    pub fn new(
        repos: Repositories,
        executor: Arc<dyn Executor>,
        reports: mpsc::Sender<MonitorReport>,
        shutdown: CancellationToken,
        settings: OrchestratorSettings,
    ) -> Self {
        let monitor = JobMonitor::new(executor.clone(), reports, shutdown);
        let engine = Arc::new(JobEngine::new(repos.clone(), executor, monitor, settings));
        let registry = Arc::new(ProjectRegistry::new(repos.clone()));

        Self {
            repos,
            engine,
            registry,
        }
    }
}
