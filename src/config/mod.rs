// dbbackup-agent/src/config/mod.rs
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::backup::target::redact_uri;
use crate::errors::{AppError, Result};

/// Time bound applied to every external process when `DUMP_TIMEOUT_SECS` is unset.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60 * 60);

// Settings exactly as found in the environment, before validation.
#[derive(Clone, Default)]
pub struct RawEnvConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub bucket_name: Option<String>,
    pub folder_prefix: Option<String>,
    pub databases: Option<String>,
    pub cron: Option<String>,
    pub run_on_startup: Option<String>,
    pub scratch_dir: Option<String>,
    pub dump_timeout_secs: Option<String>,
}

impl RawEnvConfig {
    /// Reads every recognized setting through `lookup`. Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        RawEnvConfig {
            access_key_id: get("AWS_ACCESS_KEY_ID"),
            secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            region: get("AWS_S3_REGION"),
            endpoint_url: get("AWS_S3_ENDPOINT"),
            bucket_name: get("AWS_S3_BUCKET"),
            folder_prefix: get("AWS_S3_FOLDER_PREFIX"),
            databases: get("DATABASES"),
            cron: get("CRON"),
            run_on_startup: get("RUN_ON_STARTUP"),
            scratch_dir: get("BACKUP_SCRATCH_DIR"),
            dump_timeout_secs: get("DUMP_TIMEOUT_SECS"),
        }
    }
}

// Application's internal configuration structs
#[derive(Clone)]
pub struct SpacesConfig {
    pub endpoint_url: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub folder_prefix: Option<String>,
}

impl SpacesConfig {
    /// Object key for an artifact, honoring the optional folder prefix.
    pub fn object_key(&self, filename: &str) -> String {
        match &self.folder_prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), filename),
            None => filename.to_string(),
        }
    }
}

impl fmt::Debug for SpacesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpacesConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("bucket_name", &self.bucket_name)
            .field("folder_prefix", &self.folder_prefix)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub spaces: SpacesConfig,
    /// Database URIs in configured order.
    pub databases: Vec<String>,
    pub cron: Option<String>,
    pub run_on_startup: bool,
    pub scratch_dir: PathBuf,
    pub command_timeout: Duration,
}

// Database URIs carry passwords.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let databases: Vec<String> = self.databases.iter().map(|uri| redact_uri(uri)).collect();
        f.debug_struct("AppConfig")
            .field("spaces", &self.spaces)
            .field("databases", &databases)
            .field("cron", &self.cron)
            .field("run_on_startup", &self.run_on_startup)
            .field("scratch_dir", &self.scratch_dir)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl AppConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_raw(RawEnvConfig::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Validates raw settings. Either every required setting is present or
    /// nothing is built.
    pub fn from_raw(raw: RawEnvConfig) -> Result<Self> {
        let RawEnvConfig {
            access_key_id,
            secret_access_key,
            region,
            endpoint_url,
            bucket_name,
            folder_prefix,
            databases,
            cron,
            run_on_startup,
            scratch_dir,
            dump_timeout_secs,
        } = raw;

        let mut missing = Vec::new();
        let mut require = |name: &'static str, value: Option<String>| {
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        };
        let access_key_id = require("AWS_ACCESS_KEY_ID", access_key_id);
        let secret_access_key = require("AWS_SECRET_ACCESS_KEY", secret_access_key);
        let region = require("AWS_S3_REGION", region);
        let endpoint_url = require("AWS_S3_ENDPOINT", endpoint_url);
        let bucket_name = require("AWS_S3_BUCKET", bucket_name);
        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "missing required environment variable(s): {}",
                missing.join(", ")
            )));
        }

        let command_timeout = match dump_timeout_secs.as_deref() {
            Some(value) => parse_timeout(value)?,
            None => DEFAULT_COMMAND_TIMEOUT,
        };

        Ok(AppConfig {
            spaces: SpacesConfig {
                endpoint_url,
                region,
                access_key_id,
                secret_access_key,
                bucket_name,
                folder_prefix: folder_prefix
                    .map(|p| p.trim().trim_matches('/').to_string())
                    .filter(|p| !p.is_empty()),
            },
            databases: parse_database_list(databases.as_deref()),
            cron: cron.map(|c| c.trim().to_string()),
            run_on_startup: run_on_startup
                .as_deref()
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
            scratch_dir: scratch_dir
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            command_timeout,
        })
    }
}

/// Splits the comma-separated `DATABASES` value, dropping blank entries.
fn parse_database_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|uri| !uri.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_timeout(value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(AppError::Config(format!(
            "DUMP_TIMEOUT_SECS must be a positive number of seconds, got '{}'",
            value
        ))),
    }
}
