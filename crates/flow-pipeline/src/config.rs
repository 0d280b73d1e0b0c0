//! Configuration for flowlens
//!
//! Loaded from TOML, overlaid with `TAIGA_*` environment variables, then
//! validated. Every setting except the credentials and the project has a
//! default.
//!
//! ```toml
//! project = "my-team"
//!
//! [connection]
//! base_url = "https://api.taiga.io"
//! username = "ana"
//! password = "..."
//! request_timeout_secs = 10
//!
//! [workflow]
//! wip_statuses = ["In progress", "Ready for test"]
//! closed_statuses = ["Done", "Closed"]
//!
//! [pipeline]
//! cycle_deadline_secs = 60
//! history_window_days = 30
//! history_concurrency = 8
//! cache_ttl_secs = 300
//! cache_capacity = 64
//!
//! [pipeline.retry]
//! max_retries = 2
//! base_delay_ms = 250
//! max_delay_ms = 5000
//! ```

use crate::error::ConfigError;
use flow_client::{ClientConfig, ProjectRef, RetryPolicy, DEFAULT_BASE_URL};
use flow_core::WorkflowVocabulary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the base URL
pub const ENV_URL: &str = "TAIGA_URL";
/// Environment variable overriding the username
pub const ENV_USERNAME: &str = "TAIGA_USERNAME";
/// Environment variable overriding the password
pub const ENV_PASSWORD: &str = "TAIGA_PASSWORD";
/// Environment variable overriding the project reference
pub const ENV_PROJECT: &str = "TAIGA_PROJECT_ID";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Project id or slug
    pub project: Option<ProjectRef>,
    /// Backend connection
    pub connection: ConnectionConfig,
    /// Status vocabularies
    pub workflow: WorkflowVocabulary,
    /// Cycle tuning
    pub pipeline: PipelineSettings,
}

/// Backend connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Backend root URL
    pub base_url: String,
    /// Login name
    pub username: Option<String>,
    /// Login password, never serialized
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: None,
            password: None,
            request_timeout_secs: 10,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Refresh cycle tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Upper bound for the fetch phase of one cycle
    pub cycle_deadline_secs: u64,
    /// Only items modified this recently get their history fetched
    pub history_window_days: i64,
    /// Concurrent history requests
    pub history_concurrency: usize,
    /// Result cache time-to-live
    pub cache_ttl_secs: u64,
    /// Maximum cached records
    pub cache_capacity: u64,
    /// Retry policy for collection and history requests
    pub retry: RetrySettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            cycle_deadline_secs: 60,
            history_window_days: 30,
            history_concurrency: 8,
            cache_ttl_secs: 300,
            cache_capacity: 64,
            retry: RetrySettings::default(),
        }
    }
}

impl PipelineSettings {
    /// Cycle deadline
    #[inline]
    #[must_use]
    pub fn cycle_deadline(&self) -> Duration {
        Duration::from_secs(self.cycle_deadline_secs)
    }

    /// Cache time-to-live
    #[inline]
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Retry settings in config units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// First backoff delay
    pub base_delay_ms: u64,
    /// Backoff cap
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_ms: u64::try_from(policy.base_delay.as_millis()).unwrap_or(250),
            max_delay_ms: u64::try_from(policy.max_delay.as_millis()).unwrap_or(5000),
        }
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        RetryPolicy {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

impl FlowConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Toml` if it is not valid configuration
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// - `ConfigError::Toml` if the text is not valid configuration
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Overlay `TAIGA_*` variables from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay `TAIGA_*` variables from `lookup`; empty values are ignored
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());
        if let Some(url) = get(ENV_URL) {
            self.connection.base_url = url;
        }
        if let Some(username) = get(ENV_USERNAME) {
            self.connection.username = Some(username);
        }
        if let Some(password) = get(ENV_PASSWORD) {
            self.connection.password = Some(password);
        }
        if let Some(project) = get(ENV_PROJECT) {
            self.project = project.parse().ok();
        }
    }

    /// With username and password
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.connection.username = Some(username.into());
        self.connection.password = Some(password.into());
        self
    }

    /// With base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.connection.base_url = base_url.into();
        self
    }

    /// With project reference
    #[must_use]
    pub fn with_project(mut self, project: ProjectRef) -> Self {
        self.project = Some(project);
        self
    }

    /// Check required settings and ranges
    ///
    /// # Errors
    /// - `ConfigError::Missing` for absent username, password or project
    /// - `ConfigError::Invalid` for unusable values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.credentials()?;
        match &self.project {
            None => return Err(ConfigError::Missing("project")),
            Some(ProjectRef::Slug(slug)) if slug.is_empty() => {
                return Err(ConfigError::Missing("project"));
            }
            Some(_) => {}
        }
        if self.connection.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("connection.base_url"));
        }
        if self.connection.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("connection.request_timeout_secs", "must be positive"));
        }
        if self.pipeline.cycle_deadline_secs == 0 {
            return Err(ConfigError::invalid("pipeline.cycle_deadline_secs", "must be positive"));
        }
        if self.pipeline.history_concurrency == 0 {
            return Err(ConfigError::invalid("pipeline.history_concurrency", "must be at least 1"));
        }
        if self.pipeline.cache_capacity == 0 {
            return Err(ConfigError::invalid("pipeline.cache_capacity", "must be at least 1"));
        }
        if self.pipeline.history_window_days < 0 {
            return Err(ConfigError::invalid("pipeline.history_window_days", "must not be negative"));
        }
        Ok(())
    }

    /// Username and password
    ///
    /// # Errors
    /// - `ConfigError::Missing` if either is absent or empty
    pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        let username = self
            .connection
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing("connection.username"))?;
        let password = self
            .connection
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::Missing("connection.password"))?;
        Ok((username, password))
    }

    /// Settings for the HTTP client
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.connection.base_url.clone())
            .with_timeout(Duration::from_secs(self.connection.request_timeout_secs))
            .with_retry(self.pipeline.retry.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = FlowConfig::default();
        assert_eq!(config.connection.base_url, "https://api.taiga.io");
        assert_eq!(config.connection.request_timeout_secs, 10);
        assert_eq!(config.pipeline.cache_ttl_secs, 300);
        assert_eq!(config.pipeline.history_concurrency, 8);
        assert_eq!(config.pipeline.retry.max_retries, 2);
        assert!(config.workflow.is_wip("in progress"));
    }

    #[test]
    fn parse_partial_toml() {
        let config = FlowConfig::from_toml_str(
            r#"
            project = 42

            [connection]
            username = "ana"
            password = "pw"

            [workflow]
            wip_statuses = ["Doing"]

            [pipeline.retry]
            max_retries = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.project, Some(ProjectRef::Id(42)));
        assert!(config.workflow.is_wip("doing"));
        assert!(!config.workflow.is_wip("In progress"));
        assert!(config.workflow.is_closed("Done"));
        assert_eq!(config.pipeline.retry.max_retries, 0);
        assert_eq!(config.pipeline.retry.base_delay_ms, 250);
        assert_eq!(config.pipeline.cycle_deadline_secs, 60);
        config.validate().unwrap();
    }

    #[test]
    fn unknown_type_is_toml_error() {
        let err = FlowConfig::from_toml_str("[pipeline]\nhistory_concurrency = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn env_overlay_wins_and_ignores_empty() {
        let env: HashMap<&str, &str> = [
            (ENV_URL, "https://taiga.example.com"),
            (ENV_USERNAME, "rui"),
            (ENV_PASSWORD, ""),
            (ENV_PROJECT, "team-x"),
        ]
        .into_iter()
        .collect();
        let mut config = FlowConfig::new().with_credentials("ana", "pw");
        config.apply_env_from(|k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.connection.base_url, "https://taiga.example.com");
        assert_eq!(config.connection.username.as_deref(), Some("rui"));
        assert_eq!(config.connection.password.as_deref(), Some("pw"));
        assert_eq!(config.project, Some(ProjectRef::Slug("team-x".into())));
    }

    #[test]
    fn validation_reports_missing_settings() {
        let config = FlowConfig::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("connection.username"))
        ));

        let config = FlowConfig::new().with_credentials("ana", "pw");
        assert!(matches!(config.validate(), Err(ConfigError::Missing("project"))));

        let mut config = config.with_project(ProjectRef::Id(1));
        config.validate().unwrap();
        config.pipeline.history_concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn zero_cache_capacity_is_rejected() {
        let config = FlowConfig::from_toml_str(
            r#"
            project = "alpha"

            [connection]
            username = "ana"
            password = "pw"

            [pipeline]
            cache_capacity = 0
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "pipeline.cache_capacity",
                ..
            })
        ));
    }

    #[test]
    fn password_is_redacted_and_not_serialized() {
        let config = FlowConfig::new().with_credentials("ana", "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains("ana"));
    }

    #[test]
    fn client_config_carries_timeout_and_retry() {
        let mut config = FlowConfig::new();
        config.connection.request_timeout_secs = 3;
        config.pipeline.retry.max_retries = 5;
        let client = config.client_config();
        assert_eq!(client.timeout, Duration::from_secs(3));
        assert_eq!(client.retry.max_retries, 5);
    }
}
