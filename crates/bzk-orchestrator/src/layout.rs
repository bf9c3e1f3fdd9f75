//! Per-job filesystem layout.
//!
//! Every job owns `<home>/build/<project>/<job>`. Projects may additionally
//! share `<home>/build/<project>/source` (reused checkout) and
//! `<home>/build/<project>/cache/<name>` between their jobs.
//!
//! The server and the container host can see the bzk home under different
//! paths, so each location is available in both forms: `local_*` for
//! filesystem operations done here, `host_*` for paths handed to the
//! execution unit.

use bzk_core::ResourceId;
use std::path::{Path, PathBuf};

/// Job directory inside the execution unit.
pub const UNIT_HOME: &str = "/bazooka";
/// Source checkout inside the execution unit.
pub const UNIT_SOURCE: &str = "/bazooka/source";
/// Runtime socket inside the execution unit.
pub const UNIT_DOCKER_SOCK: &str = "/var/run/docker.sock";

const SHARED_SOURCE_DIR: &str = "source";
const CACHE_DIR: &str = "cache";

#[derive(Debug, Clone)]
pub struct BuildLayout {
    host_project_dir: PathBuf,
    local_project_dir: PathBuf,
    job_id: ResourceId,
}

impl BuildLayout {
    pub fn new(
        host_home: &Path,
        local_home: &Path,
        project_id: ResourceId,
        job_id: ResourceId,
    ) -> Self {
        let project = project_id.to_string();
        Self {
            host_project_dir: host_home.join("build").join(&project),
            local_project_dir: local_home.join("build").join(&project),
            job_id,
        }
    }

    pub fn host_job_dir(&self) -> PathBuf {
        self.host_project_dir.join(self.job_id.to_string())
    }

    pub fn local_job_dir(&self) -> PathBuf {
        self.local_project_dir.join(self.job_id.to_string())
    }

    pub fn host_shared_source(&self) -> PathBuf {
        self.host_project_dir.join(SHARED_SOURCE_DIR)
    }

    pub fn local_shared_source(&self) -> PathBuf {
        self.local_project_dir.join(SHARED_SOURCE_DIR)
    }

    /// Host-side directory backing the cache entry `name`.
    pub fn host_cache_dir(&self, name: &str) -> PathBuf {
        self.host_project_dir.join(CACHE_DIR).join(cache_name(name))
    }

    pub fn local_cache_dir(&self, name: &str) -> PathBuf {
        self.local_project_dir.join(CACHE_DIR).join(cache_name(name))
    }
}

/// Absolute container paths are stored relative to the cache root.
fn cache_name(name: &str) -> &str {
    name.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> (BuildLayout, ResourceId, ResourceId) {
        let project_id = ResourceId::new();
        let job_id = ResourceId::new();
        let layout = BuildLayout::new(
            Path::new("/srv/bzk"),
            Path::new("/bazooka"),
            project_id,
            job_id,
        );
        (layout, project_id, job_id)
    }

    #[test]
    fn test_job_dirs() {
        let (layout, project_id, job_id) = layout();
        assert_eq!(
            layout.host_job_dir(),
            PathBuf::from(format!("/srv/bzk/build/{}/{}", project_id, job_id))
        );
        assert_eq!(
            layout.local_job_dir(),
            PathBuf::from(format!("/bazooka/build/{}/{}", project_id, job_id))
        );
    }

    #[test]
    fn test_shared_dirs_are_per_project() {
        let (layout, project_id, _) = layout();
        assert_eq!(
            layout.host_shared_source(),
            PathBuf::from(format!("/srv/bzk/build/{}/source", project_id))
        );
        assert_eq!(
            layout.local_cache_dir("node_modules"),
            PathBuf::from(format!("/bazooka/build/{}/cache/node_modules", project_id))
        );
    }

    #[test]
    fn test_absolute_cache_entry_stays_under_cache_root() {
        let (layout, project_id, _) = layout();
        assert_eq!(
            layout.host_cache_dir("/root/.m2"),
            PathBuf::from(format!("/srv/bzk/build/{}/cache/root/.m2", project_id))
        );
    }
}
