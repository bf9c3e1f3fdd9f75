//! Trigger normalization.
//!
//! Webhook payloads come in provider-specific shapes. Each one is parsed into
//! a [`TriggerPayload`] variant selected by an explicit [`Provider`] tag and
//! then converted into the single canonical [`StartRequest`].

use serde::Deserialize;

use crate::job::StartRequest;
use crate::{Error, Result};

/// Where a trigger came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Commit-list payloads (Bitbucket style).
    Bitbucket,
    /// Head-commit payloads (GitHub style).
    Github,
    /// The caller posts a [`StartRequest`] directly.
    Direct,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Bitbucket => write!(f, "bitbucket"),
            Provider::Github => write!(f, "github"),
            Provider::Direct => write!(f, "direct"),
        }
    }
}

/// Commit-list payload. Only the fields the orchestrator needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitListPayload {
    #[serde(default)]
    pub commits: Vec<ListedCommit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListedCommit {
    #[serde(default)]
    pub raw_node: String,
}

/// Head-commit payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadCommitPayload {
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadCommit {
    #[serde(default)]
    pub id: String,
}

/// A parsed trigger, one variant per provider shape.
#[derive(Debug, Clone)]
pub enum TriggerPayload {
    CommitList(CommitListPayload),
    HeadCommit(HeadCommitPayload),
    Direct(StartRequest),
}

impl TriggerPayload {
    /// Parse a raw request body according to the provider tag.
    pub fn parse(provider: Provider, body: &[u8]) -> Result<Self> {
        let invalid =
            |e: serde_json::Error| Error::InvalidPayload(format!("malformed {} payload: {}", provider, e));

        match provider {
            Provider::Bitbucket => serde_json::from_slice(body)
                .map(TriggerPayload::CommitList)
                .map_err(invalid),
            Provider::Github => serde_json::from_slice(body)
                .map(TriggerPayload::HeadCommit)
                .map_err(invalid),
            Provider::Direct => serde_json::from_slice(body)
                .map(TriggerPayload::Direct)
                .map_err(invalid),
        }
    }

    /// Convert into the canonical start request.
    ///
    /// Commit lists are trusted to put the most recent commit first; entries
    /// are not reordered by timestamp.
    pub fn into_start_request(self) -> Result<StartRequest> {
        match self {
            TriggerPayload::CommitList(payload) => {
                let first = payload.commits.into_iter().next().ok_or_else(|| {
                    Error::InvalidPayload("no commit found in Bitbucket payload".to_string())
                })?;
                if first.raw_node.is_empty() {
                    return Err(Error::InvalidPayload(
                        "raw_node is empty in Bitbucket payload".to_string(),
                    ));
                }
                Ok(StartRequest::new(first.raw_node))
            }
            TriggerPayload::HeadCommit(payload) => {
                let id = payload.head_commit.map(|c| c.id).unwrap_or_default();
                if id.is_empty() {
                    return Err(Error::InvalidPayload(
                        "head_commit is empty in GitHub payload".to_string(),
                    ));
                }
                Ok(StartRequest::new(id))
            }
            TriggerPayload::Direct(request) => {
                request.validate()?;
                Ok(request)
            }
        }
    }
}

/// Parse and normalize in one step.
pub fn normalize(provider: Provider, body: &[u8]) -> Result<StartRequest> {
    TriggerPayload::parse(provider, body)?.into_start_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_list_takes_first_entry() {
        let body = br#"{
            "commits": [
                {"raw_node": "newest", "timestamp": "2024-05-02 10:00:00"},
                {"raw_node": "older", "timestamp": "2024-05-01 10:00:00"}
            ]
        }"#;
        let req = normalize(Provider::Bitbucket, body).unwrap();
        assert_eq!(req.scm_reference, "newest");
        assert!(req.parameters.is_empty());
    }

    #[test]
    fn test_commit_list_rejects_empty_list() {
        let err = normalize(Provider::Bitbucket, br#"{"commits": []}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));

        let err = normalize(Provider::Bitbucket, br#"{}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
    }

    #[test]
    fn test_commit_list_rejects_empty_reference() {
        let err = normalize(Provider::Bitbucket, br#"{"commits": [{"raw_node": ""}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("raw_node"));
    }

    #[test]
    fn test_head_commit() {
        let body = br#"{"ref": "refs/heads/main", "head_commit": {"id": "abc123", "message": "fix"}}"#;
        let req = normalize(Provider::Github, body).unwrap();
        assert_eq!(req.scm_reference, "abc123");
    }

    #[test]
    fn test_head_commit_missing_or_empty() {
        assert!(matches!(
            normalize(Provider::Github, br#"{"ref": "refs/heads/main"}"#),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(
            normalize(Provider::Github, br#"{"head_commit": {"id": ""}}"#),
            Err(Error::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_direct_keeps_parameters_in_order() {
        let body = br#"{"scm_reference": "v1.2", "parameters": ["B=2", "A=1"]}"#;
        let req = normalize(Provider::Direct, body).unwrap();
        assert_eq!(req.scm_reference, "v1.2");
        assert_eq!(req.parameters, vec!["B=2", "A=1"]);
    }

    #[test]
    fn test_direct_requires_reference() {
        let err = normalize(Provider::Direct, br#"{"parameters": ["A=1"]}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
    }

    #[test]
    fn test_malformed_json_is_invalid_payload() {
        let err = normalize(Provider::Github, b"not json").unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(msg) if msg.contains("github")));
    }
}
