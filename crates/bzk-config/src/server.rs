//! Server configuration.
//!
//! Read from an optional KDL file, then overridden by environment variables:
//!
//! ```kdl
//! home "/srv/bzk"
//! local-home "/bazooka"
//! docker-sock "/var/run/docker.sock"
//! database-url "postgres://bzk:bzk@db:5432/bzk"
//! db-addr "db"
//! db-port 5432
//! listen "0.0.0.0:3000"
//! ```

use kdl::{KdlDocument, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::{ConfigError, ConfigResult};

pub const DEFAULT_LOCAL_HOME: &str = "/bazooka";
pub const DEFAULT_DOCKER_SOCK: &str = "/var/run/docker.sock";
pub const DEFAULT_DB_ADDR: &str = "127.0.0.1";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_LISTEN: &str = "0.0.0.0:3000";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// bzk home directory as seen by the container host. Paths handed to
    /// execution units are built from this.
    pub home: PathBuf,
    /// The same directory as seen by this server process.
    pub local_home: PathBuf,
    /// Container runtime socket on the host.
    pub docker_sock: String,
    /// Global SSH key used when a project has none.
    pub scm_keyfile: Option<String>,
    pub database_url: String,
    /// Database address handed to execution units.
    pub db_addr: String,
    pub db_port: u16,
    pub listen: SocketAddr,
    pub log_format: LogFormat,
}

/// Field names, with their KDL node and environment variable.
const FIELDS: &[(&str, &str)] = &[
    ("home", "BZK_HOME"),
    ("local-home", "BZK_LOCAL_HOME"),
    ("docker-sock", "BZK_DOCKERSOCK"),
    ("scm-keyfile", "BZK_SCM_KEYFILE"),
    ("database-url", "DATABASE_URL"),
    ("db-addr", "BZK_DB_ADDR"),
    ("db-port", "BZK_DB_PORT"),
    ("listen", "BZK_LISTEN"),
    ("log-format", "BZK_LOG_FORMAT"),
];

#[derive(Debug, Default)]
struct RawConfig {
    values: std::collections::HashMap<&'static str, String>,
}

impl RawConfig {
    fn take(&mut self, field: &str) -> Option<String> {
        self.values.remove(field).filter(|v| !v.is_empty())
    }

    fn require(&mut self, field: &str) -> ConfigResult<String> {
        self.take(field)
            .ok_or_else(|| ConfigError::MissingField(field.to_string()))
    }
}

impl ServerConfig {
    /// Load from an optional file and the process environment.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let text = match path {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => None,
        };
        Self::from_sources(text.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build from KDL text (if any) and an environment lookup. Environment
    /// values win over the file.
    pub fn from_sources<F>(kdl: Option<&str>, env: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut raw = RawConfig::default();

        if let Some(text) = kdl {
            let doc: KdlDocument = text.parse()?;
            for node in doc.nodes() {
                let name = node.name().value();
                if let Some((field, _)) = FIELDS.iter().find(|(f, _)| *f == name) {
                    let value = first_arg(node).ok_or_else(|| ConfigError::InvalidValue {
                        field: field.to_string(),
                        message: "expected a string or integer argument".to_string(),
                    })?;
                    raw.values.insert(*field, value);
                }
            }
        }

        for (field, var) in FIELDS {
            if let Some(value) = env(*var) {
                raw.values.insert(*field, value);
            }
        }

        Self::from_raw(raw)
    }

    fn from_raw(mut raw: RawConfig) -> ConfigResult<Self> {
        let home = PathBuf::from(raw.require("home")?);
        let database_url = raw.require("database-url")?;

        let local_home = raw
            .take("local-home")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_HOME));
        let docker_sock = raw
            .take("docker-sock")
            .unwrap_or_else(|| DEFAULT_DOCKER_SOCK.to_string());
        let scm_keyfile = raw.take("scm-keyfile");
        let db_addr = raw
            .take("db-addr")
            .unwrap_or_else(|| DEFAULT_DB_ADDR.to_string());

        let db_port = match raw.take("db-port") {
            Some(v) => v.parse().map_err(|e| ConfigError::InvalidValue {
                field: "db-port".to_string(),
                message: format!("{}: {}", v, e),
            })?,
            None => DEFAULT_DB_PORT,
        };

        let listen_raw = raw
            .take("listen")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = listen_raw.parse().map_err(|e| ConfigError::InvalidValue {
            field: "listen".to_string(),
            message: format!("{}: {}", listen_raw, e),
        })?;

        let log_format = match raw.take("log-format").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    field: "log-format".to_string(),
                    message: format!("expected 'text' or 'json', got '{}'", other),
                });
            }
        };

        Ok(Self {
            home,
            local_home,
            docker_sock,
            scm_keyfile,
            database_url,
            db_addr,
            db_port,
            listen,
            log_format,
        })
    }
}

fn first_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| match e.value() {
            KdlValue::String(s) => Some(s.clone()),
            KdlValue::Integer(i) => Some(i.to_string()),
            _ => None,
        })
}
