//! Docker executor implementation.

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    WaitContainerOptions,
};
use bollard::models::HostConfig;
use bzk_core::executor::*;
use bzk_core::{Error, ResourceId, Result};
use futures::StreamExt;
use tracing::{debug, info, warn};

/// Seconds before a request to the Docker daemon times out.
const CLIENT_TIMEOUT_SECS: u64 = 120;

/// Runs execution units as containers on a Docker daemon.
pub struct DockerExecutor {
    docker: Docker,
}

impl DockerExecutor {
    /// Connect to the daemon listening on the given unix socket.
    pub fn connect(socket_path: &str) -> Result<Self> {
        let docker =
            Docker::connect_with_unix(socket_path, CLIENT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    Error::Unavailable(format!("cannot connect to Docker at {}: {}", socket_path, e))
                })?;
        Ok(Self { docker })
    }

    /// Create with a custom Docker client.
    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }

    fn container_name(job_id: &ResourceId) -> String {
        format!("bzk-orchestration-{}", job_id)
    }

    fn container_config(spec: &RunSpec) -> Config<String> {
        let env: Vec<String> = spec
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let binds: Vec<String> = spec.volumes.iter().map(VolumeBind::to_bind_string).collect();

        Config {
            image: Some(spec.image.clone()),
            env: Some(env),
            attach_stdout: Some(false),
            attach_stderr: Some(false),
            tty: Some(false),
            host_config: Some(HostConfig {
                binds: if binds.is_empty() { None } else { Some(binds) },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Start a created container, force-removing it if it cannot start.
    async fn start_or_discard(&self, container_id: &str, container_name: &str) -> Result<()> {
        let Err(e) = self
            .docker
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
        else {
            return Ok(());
        };

        let remove_options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        if let Err(remove_err) = self
            .docker
            .remove_container(container_id, Some(remove_options))
            .await
        {
            warn!(
                container = %container_name,
                error = %remove_err,
                "Failed to remove container that did not start"
            );
        }
        Err(Error::ExecutionFailed(format!(
            "Failed to start container: {}",
            e
        )))
    }
}

#[async_trait]
impl Executor for DockerExecutor {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn spawn(&self, spec: RunSpec) -> Result<ExecutionHandle> {
        let container_name = Self::container_name(&spec.job_id);
        let config = Self::container_config(&spec);

        let create_options = CreateContainerOptions {
            name: container_name.clone(),
            platform: None,
        };

        info!(container = %container_name, image = %spec.image, "Creating container");
        let container = self
            .docker
            .create_container(Some(create_options), config)
            .await
            .map_err(|e| Error::ExecutionFailed(format!("Failed to create container: {}", e)))?;

        for warning in &container.warnings {
            debug!(container = %container_name, warning = %warning, "Docker warning");
        }

        info!(container = %container_name, "Starting container");
        self.start_or_discard(&container.id, &container_name).await?;

        Ok(ExecutionHandle {
            job_id: spec.job_id,
            executor_id: container.id,
            executor_name: self.name().to_string(),
        })
    }

    async fn wait(&self, handle: &ExecutionHandle) -> Result<i64> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };

        let mut stream = self
            .docker
            .wait_container(&handle.executor_id, Some(options));

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error carrying the code
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(Error::ExecutionFailed(format!(
                "Failed to wait for container {}: {}",
                handle.executor_id, e
            ))),
            None => Err(Error::ExecutionFailed(format!(
                "Wait stream for container {} ended without a status",
                handle.executor_id
            ))),
        }
    }

    async fn remove(&self, handle: &ExecutionHandle, options: RemoveOptions) -> Result<()> {
        let remove_options = RemoveContainerOptions {
            force: options.force,
            v: options.remove_volumes,
            ..Default::default()
        };

        self.docker
            .remove_container(&handle.executor_id, Some(remove_options))
            .await
            .map_err(|e| Error::ExecutionFailed(format!("Failed to remove container: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn make_spec() -> RunSpec {
        let mut env = BTreeMap::new();
        env.insert("BZK_SCM_REFERENCE".to_string(), "abc123".to_string());
        env.insert("BZK_JOB_PARAMETERS".to_string(), r#"["A=1"]"#.to_string());
        RunSpec {
            job_id: ResourceId::new(),
            image: "bazooka/orchestration".to_string(),
            env,
            volumes: vec![
                VolumeBind::new("/srv/bzk/build/p/j", "/bazooka"),
                VolumeBind::new("/var/run/docker.sock", "/var/run/docker.sock"),
            ],
        }
    }

    #[test]
    fn test_container_name_is_per_job() {
        let id = ResourceId::new();
        let name = DockerExecutor::container_name(&id);
        assert!(name.starts_with("bzk-orchestration-"));
        assert_eq!(name, DockerExecutor::container_name(&id));
        assert_ne!(name, DockerExecutor::container_name(&ResourceId::new()));
    }

    #[test]
    fn test_container_config_carries_env_and_binds() {
        let spec = make_spec();
        let config = DockerExecutor::container_config(&spec);

        assert_eq!(config.image.as_deref(), Some("bazooka/orchestration"));
        let env = config.env.unwrap();
        assert!(env.contains(&"BZK_SCM_REFERENCE=abc123".to_string()));
        assert!(env.contains(&r#"BZK_JOB_PARAMETERS=["A=1"]"#.to_string()));

        let binds = config.host_config.unwrap().binds.unwrap();
        assert_eq!(
            binds,
            vec![
                "/srv/bzk/build/p/j:/bazooka".to_string(),
                "/var/run/docker.sock:/var/run/docker.sock".to_string(),
            ]
        );
    }

    #[test]
    fn test_container_config_without_volumes() {
        let spec = RunSpec {
            volumes: vec![],
            ..make_spec()
        };
        let config = DockerExecutor::container_config(&spec);
        assert!(config.host_config.unwrap().binds.is_none());
    }
}

/// Integration tests that require Docker to be running.
/// Run with: cargo test -- --ignored
#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::collections::BTreeMap;

    fn alpine(job_id: ResourceId) -> RunSpec {
        RunSpec {
            job_id,
            image: "alpine:latest".to_string(),
            env: BTreeMap::new(),
            volumes: vec![],
        }
    }

    #[tokio::test]
    #[ignore]
    async fn test_wait_reports_exit_codes() {
        let executor = DockerExecutor::connect("/var/run/docker.sock").unwrap();

        // alpine's default command is `sh`, which exits 0 immediately without a tty
        let handle = executor
            .spawn(alpine(ResourceId::new()))
            .await
            .expect("Should spawn container");
        assert_eq!(handle.executor_name, "docker");
        assert_eq!(executor.wait(&handle).await.unwrap(), 0);
        executor
            .remove(&handle, RemoveOptions::purge())
            .await
            .expect("Should remove container");
    }

    #[tokio::test]
    #[ignore]
    async fn test_failed_start_leaves_no_container() {
        let executor = DockerExecutor::connect("/var/run/docker.sock").unwrap();
        let name = DockerExecutor::container_name(&ResourceId::new());
        let config = Config {
            cmd: Some(vec!["/does-not-exist".to_string()]),
            ..DockerExecutor::container_config(&alpine(ResourceId::new()))
        };
        let container = executor
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    platform: None,
                }),
                config,
            )
            .await
            .expect("Should create container");

        let result = executor.start_or_discard(&container.id, &name).await;
        assert!(matches!(result, Err(Error::ExecutionFailed(_))));
        assert!(executor.docker.inspect_container(&name, None).await.is_err());
    }

    #[tokio::test]
    #[ignore]
    async fn test_remove_unknown_container_fails() {
        let executor = DockerExecutor::connect("/var/run/docker.sock").unwrap();
        let handle = ExecutionHandle {
            job_id: ResourceId::new(),
            executor_id: "does-not-exist".to_string(),
            executor_name: "docker".to_string(),
        };
        assert!(executor.remove(&handle, RemoveOptions::purge()).await.is_err());
    }
}
