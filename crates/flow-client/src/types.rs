//! Request-side types: credentials, project references, resources and policies

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "https://api.taiga.io";

/// Per-request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bearer token obtained from a successful login
///
/// Session-scoped; the token never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Wrap a bearer token
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Raw token
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    pub(crate) fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("token", &"<redacted>").finish()
    }
}

/// Project reference: numeric id or slug
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectRef {
    /// Numeric identifier
    Id(u64),
    /// URL slug
    Slug(String),
}

impl FromStr for ProjectRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = s.parse() {
                return Ok(ProjectRef::Id(id));
            }
        }
        Ok(ProjectRef::Slug(s.to_string()))
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectRef::Id(id) => write!(f, "{id}"),
            ProjectRef::Slug(slug) => f.write_str(slug),
        }
    }
}

impl Serialize for ProjectRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProjectRef::Id(id) => serializer.serialize_u64(*id),
            ProjectRef::Slug(slug) => serializer.serialize_str(slug),
        }
    }
}

impl<'de> Deserialize<'de> for ProjectRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Number(id) => ProjectRef::Id(id),
            Repr::Text(text) => text.parse().unwrap_or(ProjectRef::Slug(text)),
        })
    }
}

/// Paginated project collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// `/userstories`
    UserStories,
    /// `/tasks`
    Tasks,
    /// `/issues`
    Issues,
    /// `/milestones`
    Milestones,
}

impl Resource {
    /// All collections fetched per cycle
    pub const ALL: [Resource; 4] = [
        Resource::UserStories,
        Resource::Tasks,
        Resource::Issues,
        Resource::Milestones,
    ];

    /// Path segment under `/api/v1`
    #[inline]
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Resource::UserStories => "userstories",
            Resource::Tasks => "tasks",
            Resource::Issues => "issues",
            Resource::Milestones => "milestones",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Item type of a history lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryScope {
    /// `/history/userstory`
    UserStory,
    /// `/history/task`
    Task,
    /// `/history/issue`
    Issue,
}

impl HistoryScope {
    /// Path segment under `/api/v1/history`
    #[inline]
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            HistoryScope::UserStory => "userstory",
            HistoryScope::Task => "task",
            HistoryScope::Issue => "issue",
        }
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based)
    ///
    /// A server-provided `Retry-After` replaces the computed backoff; both
    /// are capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let computed = retry_after.unwrap_or_else(|| {
            let factor = 2u32.saturating_pow(attempt);
            self.base_delay.saturating_mul(factor)
        });
        computed.min(self.max_delay)
    }
}

/// Client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend root, without the `/api/v1` suffix
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry policy for collection and history requests
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Config for `base_url` with default timeout and retry policy
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// With timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// With retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Canonical form of a base URL: trimmed, no trailing slash, lowercase scheme and host
#[must_use]
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let (host, path) = rest.split_once('/').map_or((rest, ""), |(h, p)| (h, p));
            let mut out = format!("{}://{}", scheme.to_ascii_lowercase(), host.to_ascii_lowercase());
            if !path.is_empty() {
                out.push('/');
                out.push_str(path);
            }
            out
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let cred = Credential::new("s3cr3t");
        let debug = format!("{cred:?}");
        assert!(!debug.contains("s3cr3t"));
        assert_eq!(cred.token(), "s3cr3t");
    }

    #[test]
    fn project_ref_parses_digits_as_id() {
        assert_eq!("42".parse::<ProjectRef>().unwrap(), ProjectRef::Id(42));
        assert_eq!(
            "my-project".parse::<ProjectRef>().unwrap(),
            ProjectRef::Slug("my-project".into())
        );
        assert_eq!(" 7 ".parse::<ProjectRef>().unwrap(), ProjectRef::Id(7));
    }

    #[test]
    fn project_ref_deserializes_number_or_string() {
        let id: ProjectRef = serde_json::from_str("12").unwrap();
        let text_id: ProjectRef = serde_json::from_str("\"12\"").unwrap();
        let slug: ProjectRef = serde_json::from_str("\"alpha\"").unwrap();
        assert_eq!(id, ProjectRef::Id(12));
        assert_eq!(text_id, ProjectRef::Id(12));
        assert_eq!(slug, ProjectRef::Slug("alpha".into()));
        assert_eq!(serde_json::to_string(&id).unwrap(), "12");
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0, None), Duration::from_millis(250));
        assert_eq!(policy.delay_for(1, None), Duration::from_millis(500));
        assert_eq!(policy.delay_for(10, None), Duration::from_secs(5));
        assert_eq!(
            policy.delay_for(0, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(
            policy.delay_for(0, Some(Duration::from_secs(60))),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn base_url_normalization() {
        assert_eq!(normalize_base_url("HTTPS://API.Taiga.io/"), "https://api.taiga.io");
        assert_eq!(
            normalize_base_url(" https://host/taiga/ "),
            "https://host/taiga"
        );
    }

    #[test]
    fn resource_paths() {
        assert_eq!(Resource::UserStories.path(), "userstories");
        assert_eq!(Resource::Milestones.to_string(), "milestones");
        assert_eq!(HistoryScope::UserStory.path(), "userstory");
    }
}
