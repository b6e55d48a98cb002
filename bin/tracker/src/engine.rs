use crate::{
    metrics::Metrics,
    signal::{AlertSignal, Permission, SignalSink},
    TrackerError,
};
use balance::{AlertEvaluator, AlertHistory, BalanceFetcher, FetchRequest};
use futures::future::join_all;
use normalize::normalize_endpoint;
use parking_lot::Mutex;
use registry::ChainDescriptor;
use snapshot::{ImportMode, ImportPayload, ImportReport, Snapshot};
use std::{sync::Arc, time::Instant};
use store::{
    KeyValueStore, LiveState, NewQuery, ProjectSummary, QueryEntity, RefreshSettings,
};
use tokio::{
    sync::{watch, Mutex as AsyncMutex},
    task::{self, JoinHandle},
};
use tracing::{debug, info, warn};

/// Final state of one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Updated { alerting: bool, triggered: bool },
    Failed,
    /// The query was removed while the fetch was in flight
    Dropped,
}

/// A query that was just created, with its first fetch running.
#[derive(Debug)]
pub struct QueryHandle {
    pub id: String,
    pub fetch: JoinHandle<FetchStatus>,
}

/// The balance tracking engine.
///
/// Cheap to clone; all clones share state. The state lock is only held for
/// in-memory updates; storage writes run on the blocking pool from a
/// snapshot.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<LiveState>,
    history: Mutex<AlertHistory>,
    fetcher: BalanceFetcher,
    evaluator: AlertEvaluator,
    storage: Arc<dyn KeyValueStore>,
    /// Serializes storage writes so a newer snapshot is never overwritten
    /// by an older one
    persist: AsyncMutex<()>,
    signals: Arc<dyn SignalSink>,
    metrics: Metrics,
    refresh: watch::Sender<RefreshSettings>,
}

impl Tracker {
    pub fn new(
        state: LiveState,
        fetcher: BalanceFetcher,
        evaluator: AlertEvaluator,
        storage: Arc<dyn KeyValueStore>,
        signals: Arc<dyn SignalSink>,
    ) -> Self {
        let metrics = Metrics::new();
        metrics.set_tracked_queries(state.queries.len());
        let (refresh, _) = watch::channel(state.refresh);

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                history: Mutex::new(AlertHistory::new()),
                fetcher,
                evaluator,
                storage,
                persist: AsyncMutex::new(()),
                signals,
                metrics,
                refresh,
            }),
        }
    }

    /// Build from the persisted state in `storage`.
    pub fn load(
        storage: Arc<dyn KeyValueStore>,
        fetcher: BalanceFetcher,
        evaluator: AlertEvaluator,
        signals: Arc<dyn SignalSink>,
    ) -> Result<Self, TrackerError> {
        let state = LiveState::load(storage.as_ref())?;
        Ok(Self::new(state, fetcher, evaluator, storage, signals))
    }

    /// Run `f` against the live state.
    pub fn with_state<R>(&self, f: impl FnOnce(&LiveState) -> R) -> R {
        f(&self.inner.state.lock())
    }

    pub fn query(&self, id: &str) -> Option<QueryEntity> {
        self.with_state(|s| s.queries.get(id).cloned())
    }

    pub fn queries(&self) -> Vec<QueryEntity> {
        self.with_state(|s| s.queries.list().to_vec())
    }

    pub fn query_count(&self) -> usize {
        self.with_state(|s| s.queries.len())
    }

    pub fn chains(&self) -> Vec<ChainDescriptor> {
        self.with_state(|s| s.registry.list_all().to_vec())
    }

    pub fn summaries(&self) -> Vec<ProjectSummary> {
        self.with_state(LiveState::summaries)
    }

    /// Last known alerting state of a query, if it has been evaluated.
    pub fn alert_history(&self, id: &str) -> Option<bool> {
        self.inner.history.lock().get(id)
    }

    /// Save the whole live state.
    pub async fn persist(&self) -> Result<(), TrackerError> {
        let _guard = self.inner.persist.lock().await;
        let state = self.inner.state.lock().clone();
        let storage = self.inner.storage.clone();
        task::spawn_blocking(move || state.save(storage.as_ref())).await??;
        Ok(())
    }

    /// Validate and insert a query, then start its first fetch.
    ///
    /// The query is visible in the loading state as soon as this returns.
    /// A failed save is logged; the fetch runs regardless.
    pub async fn add_query(&self, input: NewQuery) -> Result<QueryHandle, TrackerError> {
        let (id, request) = {
            let mut state = self.inner.state.lock();
            let id = state.create_query(input)?;
            let request = state
                .queries
                .begin_fetch(&id)
                .ok_or_else(|| TrackerError::UnknownQuery(id.clone()))?;
            self.inner.metrics.set_tracked_queries(state.queries.len());
            (id, request)
        };
        if let Err(e) = self.persist().await {
            warn!(id = %id, error = %e, "Failed to persist new query");
        }

        let tracker = self.clone();
        let fetch = tokio::spawn(async move { tracker.run_fetch(request).await });
        Ok(QueryHandle { id, fetch })
    }

    /// Remove a query together with its alert history.
    pub async fn remove_query(&self, id: &str) -> Result<QueryEntity, TrackerError> {
        let removed = {
            let mut state = self.inner.state.lock();
            let removed = state
                .queries
                .remove(id)
                .ok_or_else(|| TrackerError::UnknownQuery(id.to_string()))?;
            self.inner.history.lock().forget(id);
            self.inner.metrics.set_tracked_queries(state.queries.len());
            removed
        };
        info!(id, "Removed query");
        self.persist().await?;
        Ok(removed)
    }

    /// Flip a query's alert and reset its alerting state.
    ///
    /// Returns whether the alert is now enabled.
    pub async fn toggle_alert(&self, id: &str) -> Result<bool, TrackerError> {
        if self.query(id).is_none() {
            return Err(TrackerError::UnknownQuery(id.to_string()));
        }
        let permission = self.inner.signals.request_permission().await;
        if permission == Permission::Denied {
            warn!(id, "Notification permission denied");
        }

        let enabled = {
            let mut state = self.inner.state.lock();
            let enabled = state
                .queries
                .toggle_alert(id, permission == Permission::Denied)
                .ok_or_else(|| TrackerError::UnknownQuery(id.to_string()))?;
            self.inner.history.lock().forget(id);
            enabled
        };
        self.persist().await?;
        Ok(enabled)
    }

    /// Fetch one query. `None` when the id is unknown.
    pub async fn fetch_one(&self, id: &str) -> Option<FetchStatus> {
        let request = self.inner.state.lock().queries.begin_fetch(id)?;
        Some(self.run_fetch(request).await)
    }

    pub async fn refresh_one(&self, id: &str) -> Result<FetchStatus, TrackerError> {
        self.fetch_one(id)
            .await
            .ok_or_else(|| TrackerError::UnknownQuery(id.to_string()))
    }

    /// Fetch every query filed under `project`; returns how many ran.
    pub async fn refresh_project(&self, project: &str) -> usize {
        let ids = self.with_state(|s| s.queries.ids_in_project(project));
        self.fetch_many(ids).await
    }

    /// Fetch every query; returns how many ran.
    pub async fn refresh_all(&self) -> usize {
        let ids = self.with_state(|s| s.queries.ids());
        let count = self.fetch_many(ids).await;
        self.inner.metrics.record_refresh_cycle();
        count
    }

    /// Launch all fetches at once and wait for every one of them.
    async fn fetch_many(&self, ids: Vec<String>) -> usize {
        let fetches = ids.iter().map(|id| self.fetch_one(id));
        join_all(fetches).await.into_iter().flatten().count()
    }

    async fn run_fetch(&self, request: FetchRequest) -> FetchStatus {
        let started = Instant::now();
        let family = request.target.family();
        let result = self.inner.fetcher.fetch(&request).await;
        self.inner
            .metrics
            .record_fetch(family.as_str(), result.is_ok(), started.elapsed());

        let id = request.id.as_str();
        let (status, signal) = {
            let mut state = self.inner.state.lock();
            match result {
                Ok(outcome) => {
                    let Some(config) = state.queries.get(id).map(|q| q.alert.clone()) else {
                        debug!(id, "Query removed during fetch");
                        return FetchStatus::Dropped;
                    };
                    let alert = self.inner.history.lock().evaluate(
                        &self.inner.evaluator,
                        id,
                        outcome.raw_balance,
                        outcome.decimals,
                        &config,
                    );
                    let signal = state
                        .queries
                        .apply_success(id, &outcome, alert)
                        .filter(|_| alert.triggered)
                        .map(AlertSignal::from_entity);
                    let status = FetchStatus::Updated {
                        alerting: alert.alerting,
                        triggered: alert.triggered,
                    };
                    (status, signal)
                }
                Err(e) => {
                    warn!(id, error = %e, "Balance fetch failed");
                    match state.queries.apply_failure(id, &e.to_string()) {
                        Some(_) => (FetchStatus::Failed, None),
                        None => (FetchStatus::Dropped, None),
                    }
                }
            }
        };

        if let Some(signal) = signal {
            info!(id, chain = %signal.chain, symbol = %signal.symbol, "Alert triggered");
            self.inner.metrics.record_alert();
            signal.deliver(self.inner.signals.as_ref());
        }
        status
    }

    /// Current snapshot document.
    pub fn export(&self) -> Snapshot {
        self.with_state(Snapshot::capture)
    }

    pub fn export_file_name(&self) -> String {
        self.with_state(|s| s.user.export_file_name())
    }

    /// Parse and apply snapshot text.
    ///
    /// A document that is not a JSON object fails before anything changes.
    pub async fn import(&self, text: &str, mode: ImportMode) -> Result<ImportReport, TrackerError> {
        let payload = ImportPayload::parse(text)?;
        let (report, refresh) = {
            let mut state = self.inner.state.lock();
            let report = snapshot::apply(&mut state, payload, mode);
            if report.queries_replaced {
                self.inner.history.lock().clear();
            }
            self.inner.metrics.set_tracked_queries(state.queries.len());
            (report, state.refresh)
        };
        self.inner.refresh.send_replace(refresh);
        self.persist().await?;
        Ok(report)
    }

    /// Update the auto-refresh flag and/or interval and rearm the scheduler.
    pub async fn set_refresh(
        &self,
        enabled: Option<bool>,
        seconds: Option<f64>,
    ) -> Result<RefreshSettings, TrackerError> {
        let settings = {
            let mut state = self.inner.state.lock();
            let mut settings = state.refresh;
            if let Some(seconds) = seconds {
                if !settings.set_seconds(seconds) {
                    return Err(TrackerError::InvalidRefreshInterval(seconds));
                }
            }
            if let Some(enabled) = enabled {
                settings.enabled = enabled;
            }
            state.refresh = settings;
            settings
        };
        self.inner.refresh.send_replace(settings);
        self.persist().await?;
        Ok(settings)
    }

    pub fn refresh_settings(&self) -> RefreshSettings {
        self.with_state(|s| s.refresh)
    }

    /// Receiver that observes every refresh settings change.
    pub fn subscribe_refresh(&self) -> watch::Receiver<RefreshSettings> {
        self.inner.refresh.subscribe()
    }

    /// Edit a chain's endpoint; only queries created afterwards see it.
    pub async fn set_chain_endpoint(&self, key: &str, endpoint: &str) -> Result<(), TrackerError> {
        if !endpoint.trim().is_empty() {
            normalize_endpoint(endpoint)?;
        }
        self.inner.state.lock().registry.set_endpoint(key, endpoint)?;
        self.persist().await
    }

    pub async fn set_chain_id(&self, key: &str, chain_id: u64) -> Result<(), TrackerError> {
        self.inner.state.lock().registry.set_chain_id(key, chain_id)?;
        self.persist().await
    }

    pub async fn set_chain_credential(&self, key: &str, credential: &str) -> Result<(), TrackerError> {
        self.inner
            .state
            .lock()
            .registry
            .set_credential(key, credential)?;
        self.persist().await
    }

    /// Add a project to the catalog and select it.
    pub async fn add_project(&self, name: &str) -> Result<String, TrackerError> {
        let name = self.inner.state.lock().add_project(name);
        self.persist().await?;
        Ok(name)
    }

    pub async fn select_project(&self, name: &str) -> Result<String, TrackerError> {
        let selected = {
            let mut state = self.inner.state.lock();
            state.select_project(name);
            state.selected_project.clone()
        };
        self.persist().await?;
        Ok(selected)
    }
}
