//! Per-project secret material (SSH keys and crypto keys).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ResourceId;

/// The kind of secret a project may own. At most one of each per project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretKind {
    /// Key used by the execution unit to fetch sources.
    Ssh,
    /// Symmetric key used to decrypt secured build variables.
    Crypto,
}

impl SecretKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKind::Ssh => "ssh",
            SecretKind::Crypto => "crypto",
        }
    }

    /// File name the material is written to inside the job build directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            SecretKind::Ssh => "key",
            SecretKind::Crypto => "crypto-key",
        }
    }
}

impl std::fmt::Display for SecretKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SecretKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ssh" => Ok(SecretKind::Ssh),
            "crypto" => Ok(SecretKind::Crypto),
            _ => Err(format!("Unknown secret kind: {}", s)),
        }
    }
}

/// Secret content owned by a project. Immutable once created.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretMaterial {
    pub project_id: ResourceId,
    pub kind: SecretKind,
    pub content: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl SecretMaterial {
    pub fn new(project_id: ResourceId, kind: SecretKind, content: impl Into<Vec<u8>>) -> Self {
        Self {
            project_id,
            kind,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

// Keep key content out of logs.
impl std::fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretMaterial")
            .field("project_id", &self.project_id)
            .field("kind", &self.kind)
            .field("content", &format_args!("<{} bytes>", self.content.len()))
            .finish()
    }
}
