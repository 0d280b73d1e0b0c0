//! Refresh cycle orchestration
//!
//! One cycle:
//! 1. Authenticate (fresh token every cycle)
//! 2. Resolve the project and build its catalog
//! 3. Fetch the four collections concurrently
//! 4. Normalize, filter
//! 5. Fetch history of recently modified filtered items through the pool
//! 6. Compute metrics against a single reference instant
//!
//! The whole fetch phase is bounded by the cycle deadline. Failures before
//! the project is resolved are fatal; later failures degrade the record.

use crate::cache::{CacheKey, ResultCache};
use crate::config::{FlowConfig, PipelineSettings};
use crate::error::{ConfigError, CycleError};
use crate::pool::FetchPool;
use crate::record::{MetricsRecord, Source, SourceWarning};
use chrono::{DateTime, Utc};
use flow_client::{ClientError, Credential, ErrorKind, HistoryScope, ProjectRef, Resource, TaigaClient};
use flow_core::{
    filter, normalize_all, parse_history, HistoryEvent, ItemId, ItemKind, MetricsEngine, Milestone,
    PredicateSet, ProjectCatalog, ProjectRecord, WorkflowVocabulary,
};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

fn history_scope(kind: ItemKind) -> HistoryScope {
    match kind {
        ItemKind::Story => HistoryScope::UserStory,
        ItemKind::Task => HistoryScope::Task,
        ItemKind::Issue => HistoryScope::Issue,
    }
}

fn fatal(e: CycleError) -> CycleError {
    error!(category = %e.category(), error = %e, "refresh cycle failed");
    e
}

/// Fetch-normalize-compute pipeline for one project
#[derive(Debug)]
pub struct FlowPipeline {
    client: TaigaClient,
    username: String,
    password: String,
    project: ProjectRef,
    vocabulary: WorkflowVocabulary,
    settings: PipelineSettings,
    pool: FetchPool,
    cache: ResultCache,
}

impl FlowPipeline {
    /// Create pipeline from validated settings
    ///
    /// # Errors
    /// - Any `ConfigError` from [`FlowConfig::validate`]
    /// - `ConfigError::Client` if the base URL is unusable
    pub fn new(config: &FlowConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (username, password) = config.credentials()?;
        let project = config.project.clone().ok_or(ConfigError::Missing("project"))?;
        let client = TaigaClient::new(&config.client_config())?;

        Ok(Self {
            client,
            username: username.to_string(),
            password: password.to_string(),
            project,
            vocabulary: config.workflow.clone(),
            settings: config.pipeline.clone(),
            pool: FetchPool::new(config.pipeline.history_concurrency),
            cache: ResultCache::new(config.pipeline.cache_capacity, config.pipeline.cache_ttl()),
        })
    }

    /// Result cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Cache key of a selection
    #[must_use]
    pub fn cache_key(&self, predicates: &PredicateSet) -> CacheKey {
        CacheKey::new(
            self.client.base_url(),
            &self.project,
            &self.username,
            &self.password,
            predicates,
            &self.vocabulary,
        )
    }

    /// Cached metrics for `predicates`, running a cycle on a miss
    ///
    /// # Errors
    /// Returns the fatal error of the cycle, shared with concurrent callers.
    pub async fn metrics(&self, predicates: &PredicateSet) -> Result<Arc<MetricsRecord>, Arc<CycleError>> {
        let key = self.cache_key(predicates);
        self.cache
            .get_or_compute(key, || self.run_cycle(predicates, Utc::now()))
            .await
    }

    /// Run one uncached cycle against the reference instant `now`
    ///
    /// # Errors
    /// - `CycleError::Authentication` if login fails
    /// - `CycleError::Project` if the project cannot be fetched
    /// - `CycleError::ProjectMetadata` if the project payload is malformed
    /// - `CycleError::DeadlineExceeded` if the deadline passes before the project is resolved
    pub async fn run_cycle(
        &self,
        predicates: &PredicateSet,
        now: DateTime<Utc>,
    ) -> Result<MetricsRecord, CycleError> {
        let started = Instant::now();
        let deadline = started + self.settings.cycle_deadline();
        let deadline_secs = self.settings.cycle_deadline_secs;
        info!(project = %self.project, base_url = %self.client.base_url(), "starting refresh cycle");

        let credential = match tokio::time::timeout_at(
            deadline,
            self.client.authenticate(&self.username, &self.password),
        )
        .await
        {
            Err(_) => return Err(fatal(CycleError::DeadlineExceeded { secs: deadline_secs })),
            Ok(Err(e)) => return Err(fatal(CycleError::Authentication(e))),
            Ok(Ok(credential)) => credential,
        };

        let raw_project = self
            .client
            .project(&self.project, &credential, Some(deadline))
            .await
            .map_err(|e| match e {
                ClientError::DeadlineExceeded => CycleError::DeadlineExceeded { secs: deadline_secs },
                other => CycleError::Project(other),
            })
            .map_err(fatal)?;
        let project = ProjectRecord::from_value(&raw_project).map_err(|e| fatal(e.into()))?;
        let catalog = ProjectCatalog::from_project(&project);
        debug!(project_id = project.id, "project resolved");

        let mut warnings = Vec::new();
        let collections = self.fetch_collections(project.id, &credential, deadline, &mut warnings).await;

        let mut items = Vec::new();
        let mut data_quality = Vec::new();
        for (kind, records) in [
            (ItemKind::Story, &collections.stories),
            (ItemKind::Task, &collections.tasks),
            (ItemKind::Issue, &collections.issues),
        ] {
            let batch = normalize_all(records, kind, &catalog);
            if batch.rejected > 0 {
                warn!(kind = %kind, rejected = batch.rejected, "records skipped");
            }
            items.extend(batch.items);
            data_quality.extend(batch.issues);
        }

        let milestones: Vec<Milestone> = collections
            .milestones
            .iter()
            .filter_map(|raw| match Milestone::from_value(raw) {
                Ok(milestone) => Some(milestone),
                Err(e) => {
                    warn!(error = %e, "skipping malformed milestone");
                    None
                }
            })
            .collect();

        let filtered = filter::apply(&items, predicates);

        let window_start = chrono::Duration::try_days(self.settings.history_window_days)
            .and_then(|window| now.checked_sub_signed(window));
        let targets: Vec<(ItemId, ItemKind)> = filtered
            .iter()
            .filter(|item| {
                item.modified_at
                    .is_some_and(|modified| window_start.map_or(true, |start| modified >= start))
            })
            .map(|item| (item.id, item.kind()))
            .collect();
        let (history, history_warning) = self.fetch_history(targets, &credential, deadline).await;
        warnings.extend(history_warning);

        let metrics = MetricsEngine::new(&self.vocabulary, &catalog.ordinals).compute(&filtered, &history, now);
        let partial = !warnings.is_empty();

        info!(
            project_id = project.id,
            items = items.len(),
            filtered = filtered.len(),
            history_events = history.len(),
            warnings = warnings.len(),
            data_quality = data_quality.len(),
            partial,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "refresh cycle complete"
        );

        Ok(MetricsRecord {
            project: project.summary(),
            filters: predicates.clone(),
            metrics,
            items: filtered,
            milestones,
            warnings,
            data_quality,
            partial,
        })
    }

    async fn fetch_collections(
        &self,
        project_id: i64,
        credential: &Credential,
        deadline: Instant,
        warnings: &mut Vec<SourceWarning>,
    ) -> Collections {
        let query = [("project", project_id.to_string())];
        let query = &query[..];
        let fetches = Resource::ALL.map(|resource| async move {
            let outcome = self
                .client
                .fetch_all(resource, query, credential, Some(deadline))
                .await;
            (resource, outcome)
        });

        let mut collections = Collections::default();
        for (resource, outcome) in join_all(fetches).await {
            let collected = outcome.records.len();
            match outcome.error() {
                Some(e) => {
                    warn!(source = %resource, records = collected, category = %e.kind(), error = %e, "source degraded");
                    warnings.push(SourceWarning {
                        source: resource.into(),
                        category: e.kind(),
                        message: e.to_string(),
                        records_collected: collected,
                    });
                }
                None => debug!(source = %resource, records = collected, "collection fetched"),
            }
            let slot = match resource {
                Resource::UserStories => &mut collections.stories,
                Resource::Tasks => &mut collections.tasks,
                Resource::Issues => &mut collections.issues,
                Resource::Milestones => &mut collections.milestones,
            };
            *slot = outcome.records;
        }
        collections
    }

    async fn fetch_history(
        &self,
        targets: Vec<(ItemId, ItemKind)>,
        credential: &Credential,
        deadline: Instant,
    ) -> (Vec<HistoryEvent>, Option<SourceWarning>) {
        if targets.is_empty() {
            return (Vec::new(), None);
        }
        let requested = targets.len();

        let (results, stats) = self
            .pool
            .run(targets, |(id, kind)| {
                let client = self.client.clone();
                let credential = credential.clone();
                async move {
                    let entries = client
                        .history(history_scope(kind), id.0, &credential, Some(deadline))
                        .await;
                    (id, kind, entries)
                }
            })
            .await;

        let mut events = Vec::new();
        let mut failures = 0;
        let mut first_error: Option<ClientError> = None;
        for slot in results {
            match slot {
                Some((id, kind, Ok(entries))) => events.extend(parse_history(id, kind, &entries)),
                Some((_, _, Err(e))) => {
                    failures += 1;
                    first_error.get_or_insert(e);
                }
                None => failures += 1,
            }
        }
        debug!(requested, completed = stats.completed, failures, events = events.len(), "history fetched");

        if failures == 0 {
            return (events, None);
        }
        let category = first_error.as_ref().map_or(ErrorKind::Transport, ClientError::kind);
        let detail = first_error.map(|e| format!(": {e}")).unwrap_or_default();
        let warning = SourceWarning {
            source: Source::History,
            category,
            message: format!("history unavailable for {failures} of {requested} items{detail}"),
            records_collected: requested - failures,
        };
        warn!(failures, requested, category = %category, "history degraded");
        (events, Some(warning))
    }
}

/// Raw records per collection
#[derive(Debug, Default)]
struct Collections {
    stories: Vec<Value>,
    tasks: Vec<Value>,
    issues: Vec<Value>,
    milestones: Vec<Value>,
}
