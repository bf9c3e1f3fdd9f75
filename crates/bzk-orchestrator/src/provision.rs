//! Resource provisioning.
//!
//! Materializes what an execution unit needs on disk before it starts: the
//! project's key files, the shared checkout directory and cache directories.
//! Everything here is idempotent so concurrent jobs of one project can
//! provision the same shared directories.

use bzk_config::ProjectSettings;
use bzk_core::project::Project;
use bzk_core::secret::SecretKind;
use bzk_core::{Error, ResourceId, Result};
use bzk_db::{DbError, SecretRepo};
use std::collections::BTreeMap;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::layout::BuildLayout;

const KEY_FILE_MODE: u32 = 0o600;

/// What provisioning contributed to a launch. Paths are host paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provisioned {
    pub scm_keyfile: Option<String>,
    pub crypto_keyfile: Option<String>,
    /// Shared checkout, when the project reuses one.
    pub shared_source: Option<String>,
    /// Host cache directory to container path.
    pub cache_mounts: BTreeMap<String, String>,
}

pub struct Provisioner {
    secrets: Arc<dyn SecretRepo>,
    fallback_keyfile: Option<String>,
}

impl Provisioner {
    /// `fallback_keyfile` is used for projects without their own SSH key.
    pub fn new(secrets: Arc<dyn SecretRepo>, fallback_keyfile: Option<String>) -> Self {
        Self {
            secrets,
            fallback_keyfile,
        }
    }

    pub async fn provision(
        &self,
        project: &Project,
        settings: &ProjectSettings,
        layout: &BuildLayout,
    ) -> Result<Provisioned> {
        let scm_keyfile = match self.write_key(project.id, SecretKind::Ssh, layout).await? {
            Some(path) => Some(path),
            None => self.fallback_keyfile.clone(),
        };
        let crypto_keyfile = self.write_key(project.id, SecretKind::Crypto, layout).await?;

        let shared_source = if settings.reuse_checkout {
            ensure_dir(&layout.local_shared_source()).await?;
            Some(layout.host_shared_source().display().to_string())
        } else {
            None
        };

        let mut cache_mounts = BTreeMap::new();
        for dir in &settings.cache_dirs {
            ensure_dir(&layout.local_cache_dir(dir)).await?;
            cache_mounts.insert(layout.host_cache_dir(dir).display().to_string(), dir.clone());
        }

        Ok(Provisioned {
            scm_keyfile,
            crypto_keyfile,
            shared_source,
            cache_mounts,
        })
    }

    /// Write the project's key of `kind` into the job directory.
    ///
    /// `None` when the project has no such key.
    async fn write_key(
        &self,
        project_id: ResourceId,
        kind: SecretKind,
        layout: &BuildLayout,
    ) -> Result<Option<String>> {
        let secret = match self.secrets.get(project_id, kind).await {
            Ok(secret) => secret,
            Err(DbError::NotFound(_)) => {
                debug!(project_id = %project_id, kind = %kind, "No key for project");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let dir = layout.local_job_dir();
        ensure_dir(&dir).await?;
        let path = dir.join(kind.file_name());
        write_private(&path, &secret.content).await?;
        debug!(project_id = %project_id, kind = %kind, path = %path.display(), "Wrote key file");

        Ok(Some(
            layout
                .host_job_dir()
                .join(kind.file_name())
                .display()
                .to_string(),
        ))
    }
}

async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::provisioning(path, e))
}

/// Write `content` to a file readable only by its owner.
async fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(KEY_FILE_MODE)
        .open(path)
        .await
        .map_err(|e| Error::provisioning(path, e))?;
    file.write_all(content)
        .await
        .map_err(|e| Error::provisioning(path, e))?;
    file.flush().await.map_err(|e| Error::provisioning(path, e))?;

    // an existing file keeps its old mode through open()
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(KEY_FILE_MODE))
        .await
        .map_err(|e| Error::provisioning(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use bzk_core::project::NewProject;
    use bzk_core::secret::SecretMaterial;
    use tempfile::TempDir;

    struct Fixture {
        host: TempDir,
        local: TempDir,
        store: Arc<MemoryStore>,
        project: Project,
        layout: BuildLayout,
    }

    fn fixture() -> Fixture {
        let host = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        let project = NewProject {
            name: "api".to_string(),
            scm_type: "git".to_string(),
            scm_uri: "git@example.com:acme/api.git".to_string(),
            ..Default::default()
        }
        .into_project();
        let layout = BuildLayout::new(host.path(), local.path(), project.id, ResourceId::new());
        let store = MemoryStore::new();
        store.insert_project(project.clone());
        Fixture {
            host,
            local,
            store,
            project,
            layout,
        }
    }

    fn provisioner(store: &Arc<MemoryStore>, fallback: Option<&str>) -> Provisioner {
        Provisioner::new(store.clone(), fallback.map(String::from))
    }

    #[tokio::test]
    async fn test_nothing_configured_provisions_nothing() {
        let f = fixture();
        let provisioned = provisioner(&f.store, None)
            .provision(&f.project, &ProjectSettings::default(), &f.layout)
            .await
            .unwrap();

        assert_eq!(provisioned, Provisioned::default());
        assert!(!f.layout.local_job_dir().exists());
    }

    #[tokio::test]
    async fn test_fallback_keyfile_without_project_key() {
        let f = fixture();
        let provisioned = provisioner(&f.store, Some("/srv/bzk/global-key"))
            .provision(&f.project, &ProjectSettings::default(), &f.layout)
            .await
            .unwrap();

        assert_eq!(provisioned.scm_keyfile.as_deref(), Some("/srv/bzk/global-key"));
        assert!(provisioned.crypto_keyfile.is_none());
    }

    #[tokio::test]
    async fn test_key_files_are_private_and_inside_job_dir() {
        let f = fixture();
        f.store
            .insert_secret(SecretMaterial::new(f.project.id, SecretKind::Ssh, "ssh-material"));
        f.store
            .insert_secret(SecretMaterial::new(f.project.id, SecretKind::Crypto, "crypto-material"));

        let provisioned = provisioner(&f.store, Some("/srv/bzk/global-key"))
            .provision(&f.project, &ProjectSettings::default(), &f.layout)
            .await
            .unwrap();

        let host_key = f.layout.host_job_dir().join("key");
        assert_eq!(provisioned.scm_keyfile, Some(host_key.display().to_string()));
        assert!(host_key.starts_with(f.host.path()));
        assert_eq!(
            provisioned.crypto_keyfile,
            Some(f.layout.host_job_dir().join("crypto-key").display().to_string())
        );

        for (file, content) in [("key", "ssh-material"), ("crypto-key", "crypto-material")] {
            let path = f.layout.local_job_dir().join(file);
            assert!(path.starts_with(f.local.path()));
            assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{} should be owner-only", file);
        }
    }

    #[tokio::test]
    async fn test_existing_key_file_is_tightened() {
        let f = fixture();
        f.store
            .insert_secret(SecretMaterial::new(f.project.id, SecretKind::Ssh, "new"));
        let path = f.layout.local_job_dir().join("key");
        std::fs::create_dir_all(f.layout.local_job_dir()).unwrap();
        std::fs::write(&path, "old and longer").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        provisioner(&f.store, None)
            .provision(&f.project, &ProjectSettings::default(), &f.layout)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_reuse_and_cache_dirs_are_created() {
        let f = fixture();
        let settings = ProjectSettings {
            reuse_checkout: true,
            cache_dirs: vec!["node_modules".to_string(), "vendor".to_string()],
        };

        let provisioned = provisioner(&f.store, None)
            .provision(&f.project, &settings, &f.layout)
            .await
            .unwrap();

        assert!(f.layout.local_shared_source().is_dir());
        assert_eq!(
            provisioned.shared_source,
            Some(f.layout.host_shared_source().display().to_string())
        );

        assert!(f.layout.local_cache_dir("node_modules").is_dir());
        assert!(f.layout.local_cache_dir("vendor").is_dir());
        assert_eq!(provisioned.cache_mounts.len(), 2);
        assert_eq!(
            provisioned
                .cache_mounts
                .get(&f.layout.host_cache_dir("vendor").display().to_string())
                .map(String::as_str),
            Some("vendor")
        );
    }

    #[tokio::test]
    async fn test_provisioning_twice_succeeds() {
        let f = fixture();
        f.store
            .insert_secret(SecretMaterial::new(f.project.id, SecretKind::Ssh, "ssh-material"));
        let settings = ProjectSettings {
            reuse_checkout: true,
            cache_dirs: vec!["node_modules".to_string()],
        };
        let provisioner = provisioner(&f.store, None);

        let first = provisioner
            .provision(&f.project, &settings, &f.layout)
            .await
            .unwrap();
        let second = provisioner
            .provision(&f.project, &settings, &f.layout)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cache_dir_blocked_by_file_is_fatal() {
        let f = fixture();
        let cache_root = f.layout.local_cache_dir("");
        std::fs::create_dir_all(&cache_root).unwrap();
        std::fs::write(cache_root.join("vendor"), "not a directory").unwrap();
        let settings = ProjectSettings {
            reuse_checkout: false,
            cache_dirs: vec!["node_modules".to_string(), "vendor".to_string()],
        };

        let err = provisioner(&f.store, None)
            .provision(&f.project, &settings, &f.layout)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Provisioning { ref path, .. } if path.ends_with("vendor")));
        // earlier entries are left in place
        assert!(f.layout.local_cache_dir("node_modules").is_dir());
    }
}
