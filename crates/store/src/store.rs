use crate::{project::normalize_project_name, query::QueryEntity};
use balance::{AlertOutcome, FetchOutcome, FetchRequest};
use chrono::Utc;
use serde_json::Value;
use tracing::debug;

/// Recorded on an entity when alert notifications cannot be delivered.
pub const PERMISSION_DENIED_MESSAGE: &str =
    "Notification permission denied; alerts stay in-app only";

/// Ordered set of query entities, newest first.
///
/// Each entity moves `Idle -> Loading -> Idle` per fetch. Completions are
/// applied by id in whatever order they arrive; the last completion wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStore {
    queries: Vec<QueryEntity>,
}

impl QueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entities(queries: Vec<QueryEntity>) -> Self {
        Self { queries }
    }

    /// Rebuild from persisted JSON, dropping entries that are not objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        let entries = value.as_array()?;
        Some(Self::from_entities(
            entries.iter().filter_map(QueryEntity::from_value).collect(),
        ))
    }

    /// Add a newly created entity at the front.
    pub fn insert(&mut self, entity: QueryEntity) {
        self.queries.insert(0, entity);
    }

    /// Append entities at the back, in order.
    pub fn extend(&mut self, entities: impl IntoIterator<Item = QueryEntity>) {
        self.queries.extend(entities);
    }

    /// Swap in a whole new entity set.
    pub fn replace(&mut self, entities: Vec<QueryEntity>) {
        self.queries = entities;
    }

    pub fn get(&self, id: &str) -> Option<&QueryEntity> {
        self.queries.iter().find(|q| q.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut QueryEntity> {
        self.queries.iter_mut().find(|q| q.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: &str) -> Option<QueryEntity> {
        let index = self.queries.iter().position(|q| q.id == id)?;
        Some(self.queries.remove(index))
    }

    pub fn list(&self) -> &[QueryEntity] {
        &self.queries
    }

    pub fn ids(&self) -> Vec<String> {
        self.queries.iter().map(|q| q.id.clone()).collect()
    }

    /// Ids of every entity filed under `project`, compared after normalization.
    pub fn ids_in_project(&self, project: &str) -> Vec<String> {
        let project = normalize_project_name(project);
        self.queries
            .iter()
            .filter(|q| q.project() == project)
            .map(|q| q.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Mark an entity as loading and describe the fetch to run.
    ///
    /// A fetch already in flight is not blocked; callers should avoid issuing
    /// two fetches for the same id.
    pub fn begin_fetch(&mut self, id: &str) -> Option<FetchRequest> {
        let entity = self.get_mut(id)?;
        entity.is_loading = true;
        entity.last_error = None;
        Some(entity.fetch_request())
    }

    /// Record a successful fetch and its alert evaluation.
    ///
    /// Returns the updated entity, or `None` if it was removed meanwhile.
    pub fn apply_success(
        &mut self,
        id: &str,
        outcome: &FetchOutcome,
        alert: AlertOutcome,
    ) -> Option<&QueryEntity> {
        let entity = self.get_mut(id)?;
        let now = Utc::now();

        entity.is_loading = false;
        entity.last_error = None;
        entity.decimals = Some(outcome.decimals);
        entity.symbol_resolved = outcome.symbol.clone();
        entity.name_resolved = outcome.name.clone();
        entity.balance = outcome.balance.clone();
        entity.last_updated = Some(now);
        entity.is_alerting = alert.alerting;
        if alert.triggered {
            entity.alert_triggered_at = Some(now);
        }

        debug!(id, balance = %entity.balance, alerting = alert.alerting, "Applied fetch result");
        Some(entity)
    }

    /// Record a failed fetch; prior balance and metadata stay untouched.
    pub fn apply_failure(&mut self, id: &str, error: &str) -> Option<&QueryEntity> {
        let entity = self.get_mut(id)?;
        entity.is_loading = false;
        entity.last_error = Some(error.to_string());
        entity.last_updated = Some(Utc::now());
        Some(entity)
    }

    /// Flip the alert flag and reset the alerting state.
    ///
    /// Returns the new `enabled` value. When notifications are denied the
    /// entity records why alerts stay in-app.
    pub fn toggle_alert(&mut self, id: &str, permission_denied: bool) -> Option<bool> {
        let entity = self.get_mut(id)?;
        entity.alert.enabled = !entity.alert.enabled;
        entity.is_alerting = false;
        entity.alert_triggered_at = None;
        if permission_denied {
            entity.last_error = Some(PERMISSION_DENIED_MESSAGE.to_string());
        }
        Some(entity.alert.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::NewQuery;
    use alloy_primitives::U256;
    use balance::AlertConfig;
    use registry::ChainRegistry;
    use serde_json::json;

    fn entity(project: &str) -> QueryEntity {
        let input = NewQuery {
            chain_key: "ETH".to_string(),
            holder: "0x000000000000000000000000000000000000dEaD".to_string(),
            token: "0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string(),
            project_name: Some(project.to_string()),
            alert: AlertConfig::below("100"),
            ..Default::default()
        };
        QueryEntity::create(input, &ChainRegistry::with_defaults()).unwrap()
    }

    fn outcome(balance: &str) -> FetchOutcome {
        FetchOutcome {
            raw_balance: U256::from(50_000_000u64),
            decimals: 6,
            symbol: "USDT".to_string(),
            name: "Tether USD".to_string(),
            balance: balance.to_string(),
        }
    }

    #[test]
    fn test_insert_front_and_remove() {
        let mut store = QueryStore::new();
        let a = entity("ops");
        let b = entity("ops");
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        store.insert(a);
        store.insert(b);

        assert_eq!(store.ids(), vec![b_id.clone(), a_id.clone()]);
        assert_eq!(store.remove(&a_id).unwrap().id, a_id);
        assert!(store.remove(&a_id).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ids_in_project_normalizes() {
        let mut store = QueryStore::new();
        let ops = entity("ops");
        let ops_id = ops.id.clone();
        store.insert(ops);
        store.insert(entity(""));

        assert_eq!(store.ids_in_project(" ops "), vec![ops_id]);
        assert_eq!(store.ids_in_project("").len(), 1);
    }

    #[test]
    fn test_fetch_lifecycle_success() {
        let mut store = QueryStore::new();
        let e = entity("ops");
        let id = e.id.clone();
        store.insert(e);

        let request = store.begin_fetch(&id).unwrap();
        assert_eq!(request.id, id);
        assert!(store.get(&id).unwrap().is_loading);

        let alert = AlertOutcome {
            alerting: true,
            triggered: true,
        };
        let updated = store.apply_success(&id, &outcome("50.0"), alert).unwrap();
        assert!(!updated.is_loading);
        assert_eq!(updated.balance, "50.0");
        assert_eq!(updated.decimals, Some(6));
        assert!(updated.is_alerting);
        assert!(updated.alert_triggered_at.is_some());
    }

    #[test]
    fn test_failure_keeps_prior_balance() {
        let mut store = QueryStore::new();
        let e = entity("ops");
        let id = e.id.clone();
        store.insert(e);

        store.begin_fetch(&id);
        store.apply_success(&id, &outcome("50.0"), AlertOutcome::default());
        store.begin_fetch(&id);
        let failed = store.apply_failure(&id, "Transport error: timeout").unwrap();

        assert_eq!(failed.balance, "50.0");
        assert_eq!(failed.decimals, Some(6));
        assert_eq!(failed.last_error.as_deref(), Some("Transport error: timeout"));
        assert!(!failed.is_loading);
    }

    #[test]
    fn test_completion_after_removal_is_dropped() {
        let mut store = QueryStore::new();
        let e = entity("ops");
        let id = e.id.clone();
        store.insert(e);
        store.begin_fetch(&id);
        store.remove(&id);

        assert!(store
            .apply_success(&id, &outcome("1.0"), AlertOutcome::default())
            .is_none());
        assert!(store.apply_failure(&id, "gone").is_none());
    }

    #[test]
    fn test_toggle_alert_resets_state() {
        let mut store = QueryStore::new();
        let e = entity("ops");
        let id = e.id.clone();
        store.insert(e);
        store.apply_success(
            &id,
            &outcome("50.0"),
            AlertOutcome {
                alerting: true,
                triggered: true,
            },
        );

        assert_eq!(store.toggle_alert(&id, true), Some(false));
        let toggled = store.get(&id).unwrap();
        assert!(!toggled.is_alerting);
        assert!(toggled.alert_triggered_at.is_none());
        assert_eq!(toggled.last_error.as_deref(), Some(PERMISSION_DENIED_MESSAGE));

        assert_eq!(store.toggle_alert(&id, false), Some(true));
        assert_eq!(store.toggle_alert("missing", false), None);
    }

    #[test]
    fn test_from_value_skips_non_objects() {
        let store = QueryStore::from_value(&json!([{ "chainKey": "ETH" }, 7, null])).unwrap();
        assert_eq!(store.len(), 1);
        assert!(QueryStore::from_value(&json!({})).is_none());
    }
}
