//! In-process Taiga-compatible backend built on warp
//!
//! Serves the auth, project, collection and history endpoints from canned
//! JSON and records every request so tests can assert on traffic.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use warp::http::{Method, Response, StatusCode};
use warp::hyper::body::Bytes;
use warp::path::FullPath;
use warp::Filter;

/// Token issued by a successful login
pub const TEST_TOKEN: &str = "test-token-123";

/// How the `x-pagination-next` header is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingStyle {
    /// Header set to the next page URL on every page but the last, absent there
    NextUrlUntilLast,
    /// Header `"true"` on every page but the last, `"False"` on the last
    FalseOnLast,
    /// Header `"true"` on every page; the collection ends with an empty page
    AlwaysTrue,
}

/// A request received by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: String,
    /// Request path
    pub path: String,
    /// Raw query string
    pub query: String,
}

#[derive(Debug)]
struct BackendState {
    username: String,
    password: String,
    issue_token: bool,
    project: Option<Value>,
    collections: HashMap<String, Vec<Vec<Value>>>,
    paging: PagingStyle,
    failures: HashMap<(String, u32), u16>,
    transient: HashMap<(String, u32), (u32, u16)>,
    histories: HashMap<(String, i64), Vec<Value>>,
    history_failures: HashSet<(String, i64)>,
    history_delay: Option<Duration>,
    collection_delays: HashMap<String, Duration>,
    requests: Vec<RecordedRequest>,
}

/// Builder for [`MockTaiga`]
#[derive(Debug)]
pub struct MockTaigaBuilder {
    state: BackendState,
}

impl Default for MockTaigaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTaigaBuilder {
    /// Backend accepting `tester`/`secret` with no project and empty collections
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: BackendState {
                username: "tester".to_string(),
                password: "secret".to_string(),
                issue_token: true,
                project: None,
                collections: HashMap::new(),
                paging: PagingStyle::NextUrlUntilLast,
                failures: HashMap::new(),
                transient: HashMap::new(),
                histories: HashMap::new(),
                history_failures: HashSet::new(),
                history_delay: None,
                collection_delays: HashMap::new(),
                requests: Vec::new(),
            },
        }
    }

    /// Accepted credentials
    #[must_use]
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.state.username = username.to_string();
        self.state.password = password.to_string();
        self
    }

    /// Answer logins with 200 but without `auth_token`
    #[must_use]
    pub fn without_token(mut self) -> Self {
        self.state.issue_token = false;
        self
    }

    /// Project payload served by id and by slug
    #[must_use]
    pub fn project(mut self, project: Value) -> Self {
        self.state.project = Some(project);
        self
    }

    /// Pages of `resource` (`userstories`, `tasks`, `issues`, `milestones`)
    #[must_use]
    pub fn collection(mut self, resource: &str, pages: Vec<Vec<Value>>) -> Self {
        self.state.collections.insert(resource.to_string(), pages);
        self
    }

    /// Continuation header style
    #[must_use]
    pub fn paging(mut self, style: PagingStyle) -> Self {
        self.state.paging = style;
        self
    }

    /// Answer `page` of `resource` with `status` every time
    #[must_use]
    pub fn fail_page(mut self, resource: &str, page: u32, status: u16) -> Self {
        self.state.failures.insert((resource.to_string(), page), status);
        self
    }

    /// Answer `page` of `resource` with `status` for the first `times` requests
    #[must_use]
    pub fn flaky_page(mut self, resource: &str, page: u32, times: u32, status: u16) -> Self {
        self.state
            .transient
            .insert((resource.to_string(), page), (times, status));
        self
    }

    /// Delay every page of `resource`
    #[must_use]
    pub fn collection_delay(mut self, resource: &str, delay: Duration) -> Self {
        self.state.collection_delays.insert(resource.to_string(), delay);
        self
    }

    /// History of `item_type` (`userstory`, `task`, `issue`) item `id`
    #[must_use]
    pub fn history(mut self, item_type: &str, id: i64, events: Vec<Value>) -> Self {
        self.state.histories.insert((item_type.to_string(), id), events);
        self
    }

    /// Answer history of the item with 500
    #[must_use]
    pub fn fail_history(mut self, item_type: &str, id: i64) -> Self {
        self.state.history_failures.insert((item_type.to_string(), id));
        self
    }

    /// Delay every history response
    #[must_use]
    pub fn history_delay(mut self, delay: Duration) -> Self {
        self.state.history_delay = Some(delay);
        self
    }

    /// Bind to an ephemeral local port and start serving
    ///
    /// Must be called inside a tokio runtime.
    pub async fn start(self) -> MockTaiga {
        let state = Arc::new(Mutex::new(self.state));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handler_state = state.clone();
        let routes = warp::any()
            .and(warp::method())
            .and(warp::path::full())
            .and(
                warp::query::raw()
                    .or(warp::any().map(String::new))
                    .unify(),
            )
            .and(warp::header::optional::<String>("authorization"))
            .and(warp::body::bytes())
            .and_then(
                move |method: Method, path: FullPath, query: String, auth: Option<String>, body: Bytes| {
                    let state = handler_state.clone();
                    async move {
                        Ok::<_, Infallible>(
                            handle(&state, &method, path.as_str(), &query, auth.as_deref(), &body).await,
                        )
                    }
                },
            );

        let (addr, server) = warp::serve(routes)
            .bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
                shutdown_rx.await.ok();
            });
        tokio::spawn(server);

        MockTaiga {
            state,
            addr,
            _shutdown: shutdown_tx,
        }
    }
}

/// Running synthetic backend; stops when dropped
#[derive(Debug)]
pub struct MockTaiga {
    state: Arc<Mutex<BackendState>>,
    addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
}

impl MockTaiga {
    /// Start building a backend
    #[must_use]
    pub fn builder() -> MockTaigaBuilder {
        MockTaigaBuilder::new()
    }

    /// Base URL (`http://127.0.0.1:<port>`)
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Bound socket address
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// All requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of requests received for `path`
    #[must_use]
    pub fn request_count(&self, path: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// Number of requests whose path starts with `prefix`
    #[must_use]
    pub fn request_count_prefix(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.path.starts_with(prefix))
            .count()
    }
}

fn json_response(status: u16, body: &Value, next: Option<&str>) -> Response<String> {
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .header("content-type", "application/json");
    if let Some(next) = next {
        builder = builder.header("x-pagination-next", next);
    }
    builder
        .body(body.to_string())
        .unwrap_or_else(|_| Response::new(String::new()))
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

async fn handle(
    state: &Mutex<BackendState>,
    method: &Method,
    path: &str,
    query: &str,
    auth: Option<&str>,
    body: &[u8],
) -> Response<String> {
    let (response, delay) = {
        let mut state = state.lock();
        state.requests.push(RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
            query: query.to_string(),
        });
        route(&mut state, method, path, query, auth, body)
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    response
}

fn route(
    state: &mut BackendState,
    method: &Method,
    path: &str,
    query: &str,
    auth: Option<&str>,
    body: &[u8],
) -> (Response<String>, Option<Duration>) {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    if method == Method::POST && segments == ["api", "v1", "auth"] {
        return (login(state, body), None);
    }

    if auth != Some(format!("Bearer {TEST_TOKEN}").as_str()) {
        return (
            json_response(401, &json!({"detail": "authentication required"}), None),
            None,
        );
    }

    match segments.as_slice() {
        ["api", "v1", "projects", "by_slug"] => {
            let slug = query_param(query, "slug");
            (project_response(state, |p| p.get("slug").and_then(Value::as_str) == slug), None)
        }
        ["api", "v1", "projects", id] => {
            let id = id.parse::<i64>().ok();
            (project_response(state, |p| p.get("id").and_then(Value::as_i64) == id), None)
        }
        ["api", "v1", "history", item_type, id] => {
            let key = ((*item_type).to_string(), id.parse::<i64>().unwrap_or(-1));
            let response = if state.history_failures.contains(&key) {
                json_response(500, &json!({"detail": "boom"}), None)
            } else {
                let events = state.histories.get(&key).cloned().unwrap_or_default();
                json_response(200, &Value::Array(events), None)
            };
            (response, state.history_delay)
        }
        ["api", "v1", resource] => {
            let page = query_param(query, "page")
                .and_then(|p| p.parse::<u32>().ok())
                .unwrap_or(1);
            let delay = state.collection_delays.get(*resource).copied();
            (collection_page(state, resource, page), delay)
        }
        _ => (json_response(404, &json!({"detail": "not found"}), None), None),
    }
}

fn login(state: &BackendState, body: &[u8]) -> Response<String> {
    let Ok(request) = serde_json::from_slice::<Value>(body) else {
        return json_response(400, &json!({"detail": "invalid json"}), None);
    };
    let matches = request.get("username").and_then(Value::as_str) == Some(state.username.as_str())
        && request.get("password").and_then(Value::as_str) == Some(state.password.as_str())
        && request.get("type").and_then(Value::as_str) == Some("normal");
    if !matches {
        return json_response(401, &json!({"detail": "invalid credentials"}), None);
    }
    if state.issue_token {
        json_response(200, &json!({"auth_token": TEST_TOKEN, "username": state.username}), None)
    } else {
        json_response(200, &json!({"username": state.username}), None)
    }
}

fn project_response(state: &BackendState, matches: impl Fn(&Value) -> bool) -> Response<String> {
    match &state.project {
        Some(project) if matches(project) => json_response(200, project, None),
        _ => json_response(404, &json!({"detail": "No Project matches the given query."}), None),
    }
}

fn collection_page(state: &mut BackendState, resource: &str, page: u32) -> Response<String> {
    let key = (resource.to_string(), page);
    if let Some(status) = state.failures.get(&key) {
        return json_response(*status, &json!({"detail": "failure"}), None);
    }
    if let Some((remaining, status)) = state.transient.get_mut(&key) {
        if *remaining > 0 {
            *remaining -= 1;
            return json_response(*status, &json!({"detail": "try again"}), None);
        }
    }

    let Some(pages) = state.collections.get(resource) else {
        return json_response(200, &json!([]), None);
    };
    let index = page.saturating_sub(1) as usize;
    let Some(records) = pages.get(index) else {
        return json_response(200, &json!([]), None);
    };

    let is_last = index + 1 >= pages.len();
    let next_url = format!("/api/v1/{resource}?page={}", page + 1);
    let next = match (state.paging, is_last) {
        (PagingStyle::NextUrlUntilLast, false) => Some(next_url.as_str()),
        (PagingStyle::NextUrlUntilLast, true) => None,
        (PagingStyle::FalseOnLast, false) | (PagingStyle::AlwaysTrue, _) => Some("true"),
        (PagingStyle::FalseOnLast, true) => Some("False"),
    };
    json_response(200, &Value::Array(records.clone()), next)
}
