//! Registered projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Error, ResourceId, Result};

/// A registered project: a source repository plus its build configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ResourceId,
    /// Unique across all projects.
    pub name: String,
    /// Source-control type (e.g. "git"). Unique together with `scm_uri`.
    pub scm_type: String,
    pub scm_uri: String,
    /// Free-form configuration, mutated key by key.
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Request to register a project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scm_type: String,
    #[serde(default)]
    pub scm_uri: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

impl NewProject {
    /// Check mandatory fields, reporting the first one missing.
    pub fn validate(&self) -> Result<()> {
        let missing = if self.scm_uri.trim().is_empty() {
            Some("scm_uri")
        } else if self.scm_type.trim().is_empty() {
            Some("scm_type")
        } else if self.name.trim().is_empty() {
            Some("name")
        } else {
            None
        };

        match missing {
            Some(field) => Err(Error::InvalidArgument(format!("{} is mandatory", field))),
            None => Ok(()),
        }
    }

    pub fn into_project(self) -> Project {
        Project {
            id: ResourceId::new(),
            name: self.name,
            scm_type: self.scm_type,
            scm_uri: self.scm_uri,
            config: self.config,
            created_at: Utc::now(),
        }
    }
}

/// Name of the image that fetches sources for a given scm type.
pub fn scm_fetch_image(scm_type: &str) -> String {
    format!("scm/fetch/{}", scm_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_project() -> NewProject {
        NewProject {
            name: "api".to_string(),
            scm_type: "git".to_string(),
            scm_uri: "git@example.com:team/api.git".to_string(),
            config: BTreeMap::new(),
        }
    }

    #[test]
    fn test_validate_accepts_complete_request() {
        assert!(new_project().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_missing_fields_in_order() {
        let err = NewProject::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: scm_uri is mandatory");

        let mut req = new_project();
        req.scm_type = " ".to_string();
        req.name = String::new();
        let err = req.validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: scm_type is mandatory");

        let mut req = new_project();
        req.name = String::new();
        let err = req.validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: name is mandatory");
    }

    #[test]
    fn test_scm_fetch_image_name() {
        assert_eq!(scm_fetch_image("git"), "scm/fetch/git");
    }
}
