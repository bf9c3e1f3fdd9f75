//! Lifecycle monitoring of launched execution units.
//!
//! One detached task per unit waits for it to exit. Units that exit cleanly
//! are removed along with their volumes; failed units are kept for
//! postmortem. Every outcome is reported to the status recorder, which
//! persists it on the job.

use bzk_core::ResourceId;
use bzk_core::executor::{ExecutionHandle, Executor, RemoveOptions};
use bzk_core::job::JobStatus;
use bzk_db::JobRepo;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How a watch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    Exited { exit_code: i64 },
    /// Waiting on the unit failed; its state is unknown.
    ObservationFailed { message: String },
    /// The server shut down before the unit exited.
    Cancelled,
}

impl MonitorOutcome {
    /// Status to persist for this outcome, with the exit code if known.
    pub fn status(&self) -> Option<(JobStatus, Option<i64>)> {
        match self {
            MonitorOutcome::Exited { exit_code: 0 } => Some((JobStatus::Succeeded, Some(0))),
            MonitorOutcome::Exited { exit_code } => Some((JobStatus::Failed, Some(*exit_code))),
            MonitorOutcome::ObservationFailed { .. } => Some((JobStatus::Lost, None)),
            MonitorOutcome::Cancelled => None,
        }
    }
}

/// What happened to the unit after it exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    Removed,
    Kept,
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub job_id: ResourceId,
    pub handle: ExecutionHandle,
    pub outcome: MonitorOutcome,
    pub cleanup: Cleanup,
}

/// Spawns one watch task per launched unit.
#[derive(Clone)]
pub struct JobMonitor {
    executor: Arc<dyn Executor>,
    reports: mpsc::Sender<MonitorReport>,
    shutdown: CancellationToken,
}

impl JobMonitor {
    pub fn new(
        executor: Arc<dyn Executor>,
        reports: mpsc::Sender<MonitorReport>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            executor,
            reports,
            shutdown,
        }
    }

    /// Watch `handle` in the background until the unit exits.
    pub fn watch(&self, handle: ExecutionHandle) -> JoinHandle<()> {
        let executor = self.executor.clone();
        let reports = self.reports.clone();
        let cancel = self.shutdown.child_token();

        tokio::spawn(async move {
            let report = observe(executor.as_ref(), handle, cancel).await;
            if reports.send(report).await.is_err() {
                warn!("Status recorder is gone, dropping monitor report");
            }
        })
    }
}

async fn observe(
    executor: &dyn Executor,
    handle: ExecutionHandle,
    cancel: CancellationToken,
) -> MonitorReport {
    let job_id = handle.job_id;

    let waited = tokio::select! {
        _ = cancel.cancelled() => None,
        result = executor.wait(&handle) => Some(result),
    };

    let (outcome, cleanup) = match waited {
        None => {
            info!(job_id = %job_id, orchestration_id = %handle.executor_id, "Stopped watching execution unit");
            (MonitorOutcome::Cancelled, Cleanup::Kept)
        }
        Some(Err(e)) => {
            error!(
                job_id = %job_id,
                orchestration_id = %handle.executor_id,
                error = %e,
                "Error while waiting for execution unit"
            );
            (
                MonitorOutcome::ObservationFailed {
                    message: e.to_string(),
                },
                Cleanup::Kept,
            )
        }
        Some(Ok(exit_code)) if exit_code != 0 => {
            error!(
                job_id = %job_id,
                orchestration_id = %handle.executor_id,
                exit_code,
                "Execution unit failed, keeping it for inspection"
            );
            (MonitorOutcome::Exited { exit_code }, Cleanup::Kept)
        }
        Some(Ok(exit_code)) => {
            let cleanup = match executor.remove(&handle, RemoveOptions::purge()).await {
                Ok(()) => {
                    info!(job_id = %job_id, orchestration_id = %handle.executor_id, "Execution unit finished and removed");
                    Cleanup::Removed
                }
                Err(e) => {
                    warn!(
                        job_id = %job_id,
                        orchestration_id = %handle.executor_id,
                        error = %e,
                        "Failed to remove execution unit"
                    );
                    Cleanup::Failed {
                        message: e.to_string(),
                    }
                }
            };
            (MonitorOutcome::Exited { exit_code }, cleanup)
        }
    };

    MonitorReport {
        job_id,
        handle,
        outcome,
        cleanup,
    }
}

/// Persist monitor outcomes until every sender is dropped.
///
/// Failed writes are logged and the report dropped.
pub async fn record_outcomes(jobs: Arc<dyn JobRepo>, mut reports: mpsc::Receiver<MonitorReport>) {
    while let Some(report) = reports.recv().await {
        let Some((status, exit_code)) = report.outcome.status() else {
            continue;
        };

        match jobs.record_outcome(report.job_id, status, exit_code).await {
            Ok(()) => info!(job_id = %report.job_id, status = %status, "Recorded job outcome"),
            Err(e) => error!(
                job_id = %report.job_id,
                status = %status,
                error = %e,
                "Failed to record job outcome"
            ),
        }
    }
}
