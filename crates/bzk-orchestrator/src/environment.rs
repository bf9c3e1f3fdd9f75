//! Environment assembly for execution units.
//!
//! The orchestration unit reads everything it needs from environment
//! variables. Entries are inserted in a fixed order, later ones replacing
//! earlier ones: base entries, key files, reused checkout, cache mounts.

use bzk_core::executor::VolumeBind;
use bzk_core::job::{Job, StartRequest};
use bzk_core::project::Project;
use bzk_core::{Error, Result};
use std::collections::BTreeMap;

use crate::layout::{BuildLayout, UNIT_DOCKER_SOCK, UNIT_HOME, UNIT_SOURCE};
use crate::provision::Provisioned;
use crate::settings::OrchestratorSettings;

/// Variable names understood by the orchestration unit.
pub mod vars {
    pub const SCM: &str = "BZK_SCM";
    pub const SCM_URL: &str = "BZK_SCM_URL";
    pub const SCM_REFERENCE: &str = "BZK_SCM_REFERENCE";
    pub const SCM_KEYFILE: &str = "BZK_SCM_KEYFILE";
    pub const CRYPTO_KEYFILE: &str = "BZK_CRYPTO_KEYFILE";
    pub const HOME: &str = "BZK_HOME";
    pub const SRC: &str = "BZK_SRC";
    pub const PROJECT_ID: &str = "BZK_PROJECT_ID";
    pub const JOB_ID: &str = "BZK_JOB_ID";
    pub const DOCKERSOCK: &str = "BZK_DOCKERSOCK";
    pub const JOB_PARAMETERS: &str = "BZK_JOB_PARAMETERS";
    pub const DB_ADDR: &str = "BZK_DB_ADDR";
    pub const DB_PORT: &str = "BZK_DB_PORT";
    pub const REUSE_SCM_CHECKOUT: &str = "BZK_REUSE_SCM_CHECKOUT";
    pub const CACHE_MOUNTS: &str = "BZK_CACHE_MOUNTS";
}

/// Environment and volumes for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEnvironment {
    pub env: BTreeMap<String, String>,
    pub volumes: Vec<VolumeBind>,
}

impl LaunchEnvironment {
    fn set(&mut self, key: &str, value: impl Into<String>) {
        self.env.insert(key.to_string(), value.into());
    }
}

/// Build the environment of the orchestration unit for `job`.
///
/// `job_parameters` is the already serialized parameter list.
pub fn assemble(
    settings: &OrchestratorSettings,
    project: &Project,
    job: &Job,
    request: &StartRequest,
    job_parameters: &str,
    layout: &BuildLayout,
    provisioned: &Provisioned,
) -> Result<LaunchEnvironment> {
    let host_job_dir = layout.host_job_dir().display().to_string();

    let mut launch = LaunchEnvironment {
        env: BTreeMap::new(),
        volumes: vec![
            VolumeBind::new(host_job_dir.clone(), UNIT_HOME),
            VolumeBind::new(settings.docker_sock.clone(), UNIT_DOCKER_SOCK),
        ],
    };

    launch.set(vars::SCM, project.scm_type.clone());
    launch.set(vars::SCM_URL, project.scm_uri.clone());
    launch.set(vars::SCM_REFERENCE, request.scm_reference.clone());
    launch.set(vars::HOME, host_job_dir);
    launch.set(vars::SRC, UNIT_SOURCE);
    launch.set(vars::PROJECT_ID, project.id.to_string());
    launch.set(vars::JOB_ID, job.id.to_string());
    launch.set(vars::DOCKERSOCK, settings.docker_sock.clone());
    launch.set(vars::JOB_PARAMETERS, job_parameters);
    launch.set(vars::DB_ADDR, settings.db_addr.clone());
    launch.set(vars::DB_PORT, settings.db_port.to_string());

    if let Some(keyfile) = &provisioned.scm_keyfile {
        launch.set(vars::SCM_KEYFILE, keyfile.clone());
    }
    if let Some(keyfile) = &provisioned.crypto_keyfile {
        launch.set(vars::CRYPTO_KEYFILE, keyfile.clone());
    }

    if let Some(shared) = &provisioned.shared_source {
        launch.set(vars::SRC, shared.clone());
        launch.set(vars::REUSE_SCM_CHECKOUT, "1");
        launch
            .volumes
            .push(VolumeBind::new(shared.clone(), UNIT_SOURCE));
    }

    if !provisioned.cache_mounts.is_empty() {
        let mounts = serde_json::to_string(&provisioned.cache_mounts)
            .map_err(|e| Error::Internal(format!("cannot serialize cache mounts: {}", e)))?;
        launch.set(vars::CACHE_MOUNTS, mounts);
    }

    Ok(launch)
}
