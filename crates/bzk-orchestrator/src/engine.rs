//! Job orchestration engine.
//!
//! `start_job` records the job, provisions and launches its orchestration
//! unit, hands the unit to the lifecycle monitor and links it to the job.
//! The job record is written before anything else so that an attempt that
//! fails later stays visible, in the `started` state and without a unit.

use bzk_config::ProjectSettings;
use bzk_core::executor::{ExecutionHandle, Executor, RunSpec};
use bzk_core::job::{Job, JobStatus, StartRequest};
use bzk_core::project::Project;
use bzk_core::{Error, ResourceId, Result};
use bzk_db::{DbError, Repositories};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::environment::assemble;
use crate::layout::BuildLayout;
use crate::monitor::JobMonitor;
use crate::provision::Provisioner;
use crate::settings::OrchestratorSettings;

/// Logical name of the image every job runs first.
pub const ORCHESTRATION_IMAGE: &str = "orchestration";

pub struct JobEngine {
    repos: Repositories,
    executor: Arc<dyn Executor>,
    provisioner: Provisioner,
    monitor: JobMonitor,
    settings: OrchestratorSettings,
}

impl JobEngine {
    pub fn new(
        repos: Repositories,
        executor: Arc<dyn Executor>,
        monitor: JobMonitor,
        settings: OrchestratorSettings,
    ) -> Self {
        let provisioner = Provisioner::new(repos.secrets.clone(), settings.scm_keyfile.clone());
        Self {
            repos,
            executor,
            provisioner,
            monitor,
            settings,
        }
    }

    /// Start a job of `project_id` and return it, linked to its running unit.
    pub async fn start_job(&self, project_id: ResourceId, request: StartRequest) -> Result<Job> {
        request.validate()?;

        let project = self.repos.projects.get_by_id(project_id).await?;

        let image = match self.repos.images.get(ORCHESTRATION_IMAGE).await {
            Ok(image) => image,
            Err(DbError::NotFound(_)) => {
                error!("No orchestration image registered, cannot start jobs");
                return Err(Error::Unavailable(format!(
                    "image '{}' is not registered",
                    ORCHESTRATION_IMAGE
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut job = Job::started(project.id, request.parameters.clone());
        self.repos.jobs.create(&job).await.map_err(|e| {
            error!(project_id = %project.id, error = %e, "Failed to record job");
            Error::Persistence(e.to_string())
        })?;

        let handle = match self.launch(&project, &job, &request, image).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(job_id = %job.id, project_id = %project.id, error = %e, "Job aborted before launch");
                return Err(e);
            }
        };

        self.monitor.watch(handle.clone());

        info!(
            job_id = %job.id,
            project_id = %project.id,
            orchestration_id = %handle.executor_id,
            "Starting job"
        );

        if let Err(e) = self
            .repos
            .jobs
            .link_execution(job.id, &handle.executor_id)
            .await
        {
            error!(
                job_id = %job.id,
                orchestration_id = %handle.executor_id,
                error = %e,
                "Failed to link execution unit to job"
            );
            return Err(Error::Persistence(e.to_string()));
        }

        job.orchestration_id = Some(handle.executor_id);
        job.status = JobStatus::Running;
        Ok(job)
    }

    async fn launch(
        &self,
        project: &Project,
        job: &Job,
        request: &StartRequest,
        image: String,
    ) -> Result<ExecutionHandle> {
        request.validate_parameters()?;

        let job_parameters = serde_json::to_string(&request.parameters)
            .map_err(|e| Error::Internal(format!("cannot serialize parameters: {}", e)))?;

        let project_settings = ProjectSettings::from_config(&project.config)
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;

        let layout = BuildLayout::new(
            &self.settings.home,
            &self.settings.local_home,
            project.id,
            job.id,
        );
        let provisioned = self
            .provisioner
            .provision(project, &project_settings, &layout)
            .await?;

        let launch = assemble(
            &self.settings,
            project,
            job,
            request,
            &job_parameters,
            &layout,
            &provisioned,
        )?;

        self.executor
            .spawn(RunSpec {
                job_id: job.id,
                image,
                env: launch.env,
                volumes: launch.volumes,
            })
            .await
    }
}
