//! In-memory repositories and a recording executor for tests.

use async_trait::async_trait;
use bzk_core::executor::{ExecutionHandle, Executor, RemoveOptions, RunSpec};
use bzk_core::job::{Job, JobStatus};
use bzk_core::project::Project;
use bzk_core::secret::{SecretKind, SecretMaterial};
use bzk_core::{Error, ResourceId, Result};
use bzk_db::{
    DbError, DbResult, Image, ImageRepo, JobRepo, LogEntry, LogRepo, ProjectRepo, Repositories,
    SecretRepo,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MemoryStore {
    projects: Mutex<BTreeMap<ResourceId, Project>>,
    jobs: Mutex<BTreeMap<ResourceId, Job>>,
    secrets: Mutex<HashMap<(ResourceId, SecretKind), SecretMaterial>>,
    images: Mutex<BTreeMap<String, Image>>,
    logs: Mutex<Vec<LogEntry>>,
    fail_link: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            projects: self.clone(),
            jobs: self.clone(),
            secrets: self.clone(),
            images: self.clone(),
            logs: self.clone(),
        }
    }

    pub fn insert_project(&self, project: Project) {
        self.projects.lock().unwrap().insert(project.id, project);
    }

    pub fn insert_secret(&self, secret: SecretMaterial) {
        self.secrets
            .lock()
            .unwrap()
            .insert((secret.project_id, secret.kind), secret);
    }

    pub fn insert_image(&self, name: &str, image: &str) {
        self.images.lock().unwrap().insert(
            name.to_string(),
            Image {
                name: name.to_string(),
                image: image.to_string(),
                updated_at: Utc::now(),
            },
        );
    }

    pub fn insert_log(&self, entry: LogEntry) {
        self.logs.lock().unwrap().push(entry);
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().values().cloned().collect()
    }

    pub fn secret(&self, project_id: ResourceId, kind: SecretKind) -> Option<SecretMaterial> {
        self.secrets.lock().unwrap().get(&(project_id, kind)).cloned()
    }

    /// Make every following `link_execution` fail.
    pub fn fail_link(&self) {
        *self.fail_link.lock().unwrap() = true;
    }
}

#[async_trait]
impl ProjectRepo for MemoryStore {
    async fn create(&self, project: &Project) -> DbResult<()> {
        let mut projects = self.projects.lock().unwrap();
        let taken = projects.values().any(|p| {
            p.name == project.name
                || (p.scm_type == project.scm_type && p.scm_uri == project.scm_uri)
        });
        if taken {
            return Err(DbError::Duplicate(format!("project {}", project.name)));
        }
        projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: ResourceId) -> DbResult<Project> {
        self.projects
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("project {}", id)))
    }

    async fn list(&self) -> DbResult<Vec<Project>> {
        Ok(self.projects.lock().unwrap().values().cloned().collect())
    }

    async fn exists_by_name(&self, name: &str) -> DbResult<bool> {
        Ok(self.projects.lock().unwrap().values().any(|p| p.name == name))
    }

    async fn exists_by_scm(&self, scm_type: &str, scm_uri: &str) -> DbResult<bool> {
        Ok(self
            .projects
            .lock()
            .unwrap()
            .values()
            .any(|p| p.scm_type == scm_type && p.scm_uri == scm_uri))
    }

    async fn set_config_key(&self, id: ResourceId, key: &str, value: &str) -> DbResult<()> {
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(format!("project {}", id)))?;
        project.config.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn unset_config_key(&self, id: ResourceId, key: &str) -> DbResult<()> {
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(format!("project {}", id)))?;
        project.config.remove(key);
        Ok(())
    }
}

#[async_trait]
impl JobRepo for MemoryStore {
    async fn create(&self, job: &Job) -> DbResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(DbError::Duplicate(format!("job {}", job.id)));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: ResourceId) -> DbResult<Job> {
        self.jobs
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("job {}", id)))
    }

    async fn list_by_project(&self, project_id: ResourceId) -> DbResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| j.project_id == project_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.started.cmp(&a.started));
        Ok(jobs)
    }

    async fn list_all(&self) -> DbResult<Vec<Job>> {
        let mut jobs = self.jobs();
        jobs.sort_by(|a, b| b.started.cmp(&a.started));
        Ok(jobs)
    }

    async fn link_execution(&self, id: ResourceId, orchestration_id: &str) -> DbResult<()> {
        if *self.fail_link.lock().unwrap() {
            return Err(DbError::Database(sqlx_unavailable()));
        }
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(format!("job {}", id)))?;
        if job.orchestration_id.is_some() {
            return Err(DbError::Duplicate(format!("job {} is already linked", id)));
        }
        job.orchestration_id = Some(orchestration_id.to_string());
        if job.status == JobStatus::Started {
            job.status = JobStatus::Running;
        }
        Ok(())
    }

    async fn record_outcome(
        &self,
        id: ResourceId,
        status: JobStatus,
        exit_code: Option<i64>,
    ) -> DbResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(format!("job {}", id)))?;
        job.status = status;
        job.exit_code = exit_code;
        job.finished = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl SecretRepo for MemoryStore {
    async fn get(&self, project_id: ResourceId, kind: SecretKind) -> DbResult<SecretMaterial> {
        self.secret(project_id, kind)
            .ok_or_else(|| DbError::NotFound(format!("{} key of project {}", kind, project_id)))
    }

    async fn create(&self, secret: &SecretMaterial) -> DbResult<()> {
        let mut secrets = self.secrets.lock().unwrap();
        let key = (secret.project_id, secret.kind);
        if secrets.contains_key(&key) {
            return Err(DbError::Duplicate(format!(
                "{} key of project {}",
                secret.kind, secret.project_id
            )));
        }
        secrets.insert(key, secret.clone());
        Ok(())
    }
}

#[async_trait]
impl ImageRepo for MemoryStore {
    async fn get(&self, name: &str) -> DbResult<String> {
        self.images
            .lock()
            .unwrap()
            .get(name)
            .map(|i| i.image.clone())
            .ok_or_else(|| DbError::NotFound(format!("image {}", name)))
    }

    async fn exists(&self, name: &str) -> DbResult<bool> {
        Ok(self.images.lock().unwrap().contains_key(name))
    }

    async fn list(&self) -> DbResult<Vec<Image>> {
        Ok(self.images.lock().unwrap().values().cloned().collect())
    }

    async fn set(&self, name: &str, image: &str) -> DbResult<()> {
        self.insert_image(name, image);
        Ok(())
    }
}

#[async_trait]
impl LogRepo for MemoryStore {
    async fn list_for_job(&self, job_id: ResourceId) -> DbResult<Vec<LogEntry>> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.job_id == *job_id.as_uuid())
            .cloned()
            .collect())
    }
}

fn sqlx_unavailable() -> sqlx::Error {
    sqlx::Error::PoolTimedOut
}

/// What `wait` reports for every unit.
#[derive(Debug, Clone)]
pub enum WaitBehavior {
    Exit(i64),
    Fail(String),
    /// Never returns; used to exercise cancellation.
    Hang,
}

/// Executor that records calls instead of running anything.
pub struct FakeExecutor {
    wait: WaitBehavior,
    fail_spawn: bool,
    fail_remove: bool,
    spawned: Mutex<Vec<RunSpec>>,
    removed: Mutex<Vec<(ExecutionHandle, RemoveOptions)>>,
}

impl FakeExecutor {
    pub fn exiting(code: i64) -> Arc<Self> {
        Arc::new(Self::with_wait(WaitBehavior::Exit(code)))
    }

    pub fn with_wait(wait: WaitBehavior) -> Self {
        Self {
            wait,
            fail_spawn: false,
            fail_remove: false,
            spawned: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_spawn(mut self) -> Self {
        self.fail_spawn = true;
        self
    }

    pub fn failing_remove(mut self) -> Self {
        self.fail_remove = true;
        self
    }

    pub fn spawned(&self) -> Vec<RunSpec> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<(ExecutionHandle, RemoveOptions)> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn spawn(&self, spec: RunSpec) -> Result<ExecutionHandle> {
        if self.fail_spawn {
            return Err(Error::ExecutionFailed("image not found".to_string()));
        }
        let handle = ExecutionHandle {
            job_id: spec.job_id,
            executor_id: format!("unit-{}", spec.job_id),
            executor_name: self.name().to_string(),
        };
        self.spawned.lock().unwrap().push(spec);
        Ok(handle)
    }

    async fn wait(&self, _handle: &ExecutionHandle) -> Result<i64> {
        match &self.wait {
            WaitBehavior::Exit(code) => Ok(*code),
            WaitBehavior::Fail(message) => Err(Error::ExecutionFailed(message.clone())),
            WaitBehavior::Hang => std::future::pending().await,
        }
    }

    async fn remove(&self, handle: &ExecutionHandle, options: RemoveOptions) -> Result<()> {
        self.removed.lock().unwrap().push((handle.clone(), options));
        if self.fail_remove {
            return Err(Error::ExecutionFailed("removal refused".to_string()));
        }
        Ok(())
    }
}
