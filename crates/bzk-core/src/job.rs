//! Jobs and the canonical start request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, ResourceId, Result};

/// Canonical, provider-independent description of what to build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    /// Commit or revision to build.
    #[serde(default)]
    pub scm_reference: String,
    /// `NAME=VALUE` build parameters, in caller order.
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl StartRequest {
    pub fn new(scm_reference: impl Into<String>) -> Self {
        Self {
            scm_reference: scm_reference.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Reject a request with no source reference.
    pub fn validate(&self) -> Result<()> {
        if self.scm_reference.is_empty() {
            return Err(Error::InvalidPayload("reference is mandatory".to_string()));
        }
        Ok(())
    }

    /// Check that every parameter carries a `=` separator.
    ///
    /// All offending entries are listed in the error.
    pub fn validate_parameters(&self) -> Result<()> {
        let invalid: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| !p.contains('='))
            .map(String::as_str)
            .collect();

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "parameters must be of the form NAME=VALUE, got: {}",
                invalid.join(", ")
            )))
        }
    }
}

/// Persisted job status.
///
/// `Started` until the execution unit is linked, `Running` once linked, then
/// one of the terminal states written by the lifecycle monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Started,
    Running,
    Succeeded,
    Failed,
    /// The monitor could not observe the unit to completion.
    Lost,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Started => "started",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Lost => "lost",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Lost
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "started" => Ok(JobStatus::Started),
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            "lost" => Ok(JobStatus::Lost),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// One attempt at building a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: ResourceId,
    pub project_id: ResourceId,
    pub started: DateTime<Utc>,
    pub parameters: Vec<String>,
    /// Identity of the launched execution unit. Set once.
    pub orchestration_id: Option<String>,
    pub status: JobStatus,
    pub exit_code: Option<i64>,
    pub finished: Option<DateTime<Utc>>,
}

impl Job {
    /// A fresh job record, not yet linked to an execution unit.
    pub fn started(project_id: ResourceId, parameters: Vec<String>) -> Self {
        Self {
            id: ResourceId::new(),
            project_id,
            started: Utc::now(),
            parameters,
            orchestration_id: None,
            status: JobStatus::Started,
            exit_code: None,
            finished: None,
        }
    }
}
