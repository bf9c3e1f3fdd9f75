//! Project registration and key management.

use bzk_core::project::{NewProject, Project, scm_fetch_image};
use bzk_core::secret::{SecretKind, SecretMaterial};
use bzk_core::{Error, ResourceId, Result};
use bzk_db::Repositories;
use tracing::info;
use uuid::Uuid;

pub struct ProjectRegistry {
    repos: Repositories,
}

impl ProjectRegistry {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Register a project and generate its crypto key.
    pub async fn create(&self, request: NewProject) -> Result<Project> {
        request.validate()?;

        if self.repos.projects.exists_by_name(&request.name).await? {
            return Err(Error::Conflict(format!(
                "a project named '{}' already exists",
                request.name
            )));
        }
        if self
            .repos
            .projects
            .exists_by_scm(&request.scm_type, &request.scm_uri)
            .await?
        {
            return Err(Error::Conflict(format!(
                "a project for {} '{}' already exists",
                request.scm_type, request.scm_uri
            )));
        }
        if !self
            .repos
            .images
            .exists(&scm_fetch_image(&request.scm_type))
            .await?
        {
            return Err(Error::InvalidArgument(format!(
                "unsupported scm_type: '{}'",
                request.scm_type
            )));
        }

        let project = request.into_project();
        self.repos.projects.create(&project).await?;
        info!(project_id = %project.id, name = %project.name, "Registered project");

        let key = SecretMaterial::new(project.id, SecretKind::Crypto, generate_crypto_key());
        self.repos.secrets.create(&key).await?;

        Ok(project)
    }

    /// Store the project's SSH key. Keys cannot be replaced.
    pub async fn set_ssh_key(&self, project_id: ResourceId, content: Vec<u8>) -> Result<()> {
        if content.is_empty() {
            return Err(Error::InvalidArgument("key is mandatory".to_string()));
        }
        self.repos.projects.get_by_id(project_id).await?;

        self.repos
            .secrets
            .create(&SecretMaterial::new(project_id, SecretKind::Ssh, content))
            .await?;
        info!(project_id = %project_id, "Stored SSH key");
        Ok(())
    }
}

/// 32 random alphanumeric characters.
fn generate_crypto_key() -> String {
    Uuid::new_v4().simple().to_string()
}
