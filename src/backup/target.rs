// dbbackup-agent/src/backup/target.rs
use std::fmt;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::errors::{AppError, Result};

/// Database engines the agent knows how to dump. Anything else is kept as
/// `Unrecognized` so the orchestrator can report it by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseKind {
    Postgresql,
    Mongodb,
    Mysql,
    Unrecognized(String),
}

impl DatabaseKind {
    pub fn from_scheme(scheme: &str) -> Self {
        match scheme {
            "postgresql" => DatabaseKind::Postgresql,
            "mongodb" => DatabaseKind::Mongodb,
            "mysql" => DatabaseKind::Mysql,
            other => DatabaseKind::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DatabaseKind::Postgresql => "postgresql",
            DatabaseKind::Mongodb => "mongodb",
            DatabaseKind::Mysql => "mysql",
            DatabaseKind::Unrecognized(scheme) => scheme,
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured database, parsed fresh from its URI on every run.
#[derive(Clone)]
pub struct DatabaseTarget {
    pub kind: DatabaseKind,
    pub db_name: String,
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: Option<String>,
    original: String,
    parsed: Url,
}

impl DatabaseTarget {
    pub fn parse(uri: &str) -> Result<Self> {
        let parsed = Url::parse(uri)
            .map_err(|e| AppError::InvalidTarget(format!("{}: {}", redact_uri(uri), e)))?;

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AppError::InvalidTarget(format!("{}: missing host", redact_uri(uri))))?
            .to_string();

        Ok(DatabaseTarget {
            kind: DatabaseKind::from_scheme(parsed.scheme()),
            db_name: parsed.path().trim_start_matches('/').to_string(),
            host,
            port: parsed.port(),
            username: decode(parsed.username()),
            password: parsed.password().map(decode),
            original: uri.to_string(),
            parsed,
        })
    }

    /// The URI exactly as configured, credentials included.
    pub fn uri(&self) -> &str {
        &self.original
    }

    /// The URI with its password removed, for tools that take the password
    /// through a separate channel.
    pub fn uri_without_password(&self) -> String {
        let mut stripped = self.parsed.clone();
        match stripped.set_password(None) {
            Ok(()) => stripped.to_string(),
            Err(()) => self.parsed.to_string(),
        }
    }
}

impl fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseTarget")
            .field("kind", &self.kind)
            .field("db_name", &self.db_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

fn decode(component: &str) -> String {
    percent_decode_str(component).decode_utf8_lossy().into_owned()
}

/// Renders a URI for log output with any password masked.
pub fn redact_uri(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<unparsable uri>".to_string(),
    }
}
