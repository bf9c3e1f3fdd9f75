//! Typed view over a project's configuration map.
//!
//! Projects store configuration as a schema-less string map. The keys the
//! orchestrator understands are parsed here, at the boundary.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use crate::{ConfigError, ConfigResult};

/// Share one source checkout across all jobs of the project.
pub const REUSE_CHECKOUT_KEY: &str = "bzk.scm.reuse";

/// Colon-separated, container-relative directories cached between jobs.
pub const CACHE_DIRS_KEY: &str = "bzk.cache.dirs";

/// Orchestrator-relevant project settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSettings {
    pub reuse_checkout: bool,
    /// Cache directories in declaration order.
    pub cache_dirs: Vec<String>,
}

impl ProjectSettings {
    pub fn from_config(config: &BTreeMap<String, String>) -> ConfigResult<Self> {
        let reuse_checkout = match config.get(REUSE_CHECKOUT_KEY) {
            Some(value) => parse_flag(REUSE_CHECKOUT_KEY, value)?,
            None => false,
        };

        let cache_dirs = match config.get(CACHE_DIRS_KEY) {
            Some(value) => parse_cache_dirs(value)?,
            None => Vec::new(),
        };

        Ok(Self {
            reuse_checkout,
            cache_dirs,
        })
    }
}

fn parse_flag(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}

fn parse_cache_dirs(value: &str) -> ConfigResult<Vec<String>> {
    let mut dirs = Vec::new();
    for entry in value.split(':').map(str::trim).filter(|e| !e.is_empty()) {
        if Path::new(entry)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ConfigError::InvalidValue {
                field: CACHE_DIRS_KEY.to_string(),
                message: format!("'{}' escapes the cache directory", entry),
            });
        }
        dirs.push(entry.to_string());
    }
    Ok(dirs)
}
