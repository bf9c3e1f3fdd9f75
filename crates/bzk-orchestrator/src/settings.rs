//! Server settings the orchestrator needs.

use bzk_config::ServerConfig;
use std::path::PathBuf;

/// The subset of [`ServerConfig`] used to provision and launch jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// bzk home as seen by the container host.
    pub home: PathBuf,
    /// bzk home as seen by this process.
    pub local_home: PathBuf,
    pub docker_sock: String,
    /// Global SSH key, used when a project has none of its own.
    pub scm_keyfile: Option<String>,
    pub db_addr: String,
    pub db_port: u16,
}

impl From<&ServerConfig> for OrchestratorSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            home: config.home.clone(),
            local_home: config.local_home.clone(),
            docker_sock: config.docker_sock.clone(),
            scm_keyfile: config.scm_keyfile.clone(),
            db_addr: config.db_addr.clone(),
            db_port: config.db_port,
        }
    }
}
