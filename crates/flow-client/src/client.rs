//! HTTP client for the Taiga REST API
//!
//! Login, project lookup, paginated collections and item history. Every
//! request carries the configured timeout and can additionally be bounded by
//! a caller-supplied deadline shared across a whole refresh cycle.

use crate::error::{ClientError, Result};
use crate::types::{normalize_base_url, ClientConfig, Credential, HistoryScope, ProjectRef, Resource, RetryPolicy};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Continuation header consulted after every page
pub const PAGINATION_NEXT_HEADER: &str = "x-pagination-next";

/// Whether a continuation header value asks for another page
///
/// Absent, empty and case-insensitive `"false"` values end the collection.
#[must_use]
pub fn continuation_requested(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) => !v.eq_ignore_ascii_case("false"),
    }
}

/// Why a paginated fetch stopped
#[derive(Debug)]
pub enum StopReason {
    /// Empty page or no continuation requested
    Exhausted,
    /// A request failed; records collected before it are kept
    Failed(ClientError),
}

/// Records collected by [`TaigaClient::fetch_all`]
#[derive(Debug)]
pub struct FetchOutcome {
    /// Concatenated page bodies in page order
    pub records: Vec<Value>,
    /// Pages requested, not counting retries
    pub pages_requested: u32,
    /// Stop condition
    pub stop: StopReason,
}

impl FetchOutcome {
    /// Whether the collection was read to the end
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.stop, StopReason::Exhausted)
    }

    /// Failure that stopped the fetch, if any
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&ClientError> {
        match &self.stop {
            StopReason::Exhausted => None,
            StopReason::Failed(e) => Some(e),
        }
    }
}

/// Taiga API client bound to one base URL
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct TaigaClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl TaigaClient {
    /// Create client
    ///
    /// # Errors
    /// - `ClientError::InvalidUrl` if the base URL is not `http(s)://`
    /// - `ClientError::Transport` if the HTTP client cannot be built
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url);
        let has_host = base_url
            .split_once("://")
            .is_some_and(|(scheme, rest)| matches!(scheme, "http" | "https") && !rest.is_empty());
        if !has_host {
            return Err(ClientError::InvalidUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::transport(&base_url, e))?;

        Ok(Self {
            http,
            base_url,
            retry: config.retry,
        })
    }

    /// Normalized base URL
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.base_url)
    }

    /// Exchange username and password for a bearer token
    ///
    /// Not retried.
    ///
    /// # Errors
    /// - `ClientError::AuthRejected` on a non-success status
    /// - `ClientError::MissingToken` if the body has no string `auth_token`
    /// - `ClientError::Transport` if the request cannot be completed
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Credential> {
        let url = self.endpoint("auth");
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "type": "normal",
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::transport(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::AuthRejected {
                url,
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|_| ClientError::MissingToken)?;
        let token = body
            .get("auth_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(ClientError::MissingToken)?;

        debug!(base_url = %self.base_url, "authenticated");
        Ok(Credential::new(token))
    }

    /// Fetch project metadata by id or slug
    ///
    /// # Errors
    /// - `ClientError::NotFound` if the project does not exist
    /// - Any request error from the underlying GET
    pub async fn project(
        &self,
        project: &ProjectRef,
        credential: &Credential,
        deadline: Option<Instant>,
    ) -> Result<Value> {
        let (url, query) = match project {
            ProjectRef::Id(id) => (self.endpoint(&format!("projects/{id}")), Vec::new()),
            ProjectRef::Slug(slug) => (
                self.endpoint("projects/by_slug"),
                vec![("slug", slug.clone())],
            ),
        };
        match self.get_json(&url, &query, credential, deadline).await {
            Ok((body, _)) if body.is_object() => Ok(body),
            Ok(_) => Err(ClientError::decode(url, "project payload is not an object")),
            Err(ClientError::NotFound { .. }) => Err(ClientError::NotFound {
                resource: format!("project {project}"),
            }),
            Err(e) => Err(e),
        }
    }

    /// Fetch every page of a collection
    ///
    /// Requests `page=1,2,..` with `query` appended and stops on an empty
    /// page, a missing or false continuation header, or the first failure.
    /// Never fails as a whole: records read before a failure are returned
    /// alongside it.
    pub async fn fetch_all(
        &self,
        resource: Resource,
        query: &[(&str, String)],
        credential: &Credential,
        deadline: Option<Instant>,
    ) -> FetchOutcome {
        let url = self.endpoint(resource.path());
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut params: Vec<(&str, String)> = query.to_vec();
            params.push(("page", page.to_string()));

            let (body, headers) = match self.get_json(&url, &params, credential, deadline).await {
                Ok(ok) => ok,
                Err(e) => {
                    debug!(%resource, page, error = %e, "pagination stopped by failure");
                    return FetchOutcome {
                        records,
                        pages_requested: page,
                        stop: StopReason::Failed(e),
                    };
                }
            };

            let Value::Array(items) = body else {
                return FetchOutcome {
                    records,
                    pages_requested: page,
                    stop: StopReason::Failed(ClientError::decode(&url, "page body is not an array")),
                };
            };

            let received = items.len();
            debug!(%resource, page, received, "fetched page");
            if items.is_empty() {
                break;
            }
            records.extend(items);

            let next = headers
                .get(PAGINATION_NEXT_HEADER)
                .and_then(|v| v.to_str().ok());
            if !continuation_requested(next) {
                break;
            }
            page += 1;
        }

        FetchOutcome {
            records,
            pages_requested: page,
            stop: StopReason::Exhausted,
        }
    }

    /// Fetch the history of one item, oldest entry first as served
    ///
    /// # Errors
    /// - `ClientError::Decode` if the body is not an array
    /// - Any request error from the underlying GET
    pub async fn history(
        &self,
        scope: HistoryScope,
        id: i64,
        credential: &Credential,
        deadline: Option<Instant>,
    ) -> Result<Vec<Value>> {
        let url = self.endpoint(&format!("history/{}/{id}", scope.path()));
        match self.get_json(&url, &[], credential, deadline).await? {
            (Value::Array(entries), _) => Ok(entries),
            _ => Err(ClientError::decode(url, "history body is not an array")),
        }
    }

    /// GET with retry on retryable failures
    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        credential: &Credential,
        deadline: Option<Instant>,
    ) -> Result<(Value, HeaderMap)> {
        let mut attempt = 0;
        loop {
            match self.get_once(url, query, credential, deadline).await {
                Ok(ok) => return Ok(ok),
                Err((e, retry_after)) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt, retry_after);
                    if deadline.is_some_and(|d| Instant::now() + delay >= d) {
                        return Err(e);
                    }
                    warn!(
                        url,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err((e, _)) => return Err(e),
            }
        }
    }

    async fn get_once(
        &self,
        url: &str,
        query: &[(&str, String)],
        credential: &Credential,
        deadline: Option<Instant>,
    ) -> std::result::Result<(Value, HeaderMap), (ClientError, Option<Duration>)> {
        let request = self
            .http
            .get(url)
            .query(query)
            .header(reqwest::header::AUTHORIZATION, credential.header_value())
            .send();

        let plain = |e: ClientError| -> (ClientError, Option<Duration>) { (e, None) };
        let response = within(deadline, request)
            .await
            .map_err(plain)?
            .map_err(|e| plain(ClientError::transport(url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err((
                ClientError::NotFound {
                    resource: url.to_string(),
                },
                None,
            ));
        }
        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            return Err((
                ClientError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                },
                retry_after,
            ));
        }

        let headers = response.headers().clone();
        let body = within(deadline, response.json::<Value>())
            .await
            .map_err(plain)?
            .map_err(|e| {
                plain(if e.is_decode() {
                    ClientError::decode(url, e.to_string())
                } else {
                    ClientError::transport(url, e)
                })
            })?;

        Ok((body, headers))
    }
}

/// Run `fut`, failing with `DeadlineExceeded` once `deadline` passes
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Result<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| ClientError::DeadlineExceeded),
        None => Ok(fut.await),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
