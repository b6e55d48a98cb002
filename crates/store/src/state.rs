use crate::{
    project::{normalize_project_name, ProjectSet, DEFAULT_PROJECT},
    query::{CreateError, NewQuery, QueryEntity},
    storage::{
        KeyValueStore, StorageError, CHAINS_KEY, PROJECTS_KEY, QUERIES_KEY, REFRESH_ENABLED_KEY,
        REFRESH_SECONDS_KEY, SELECTED_PROJECT_KEY, USER_KEY,
    },
    store::QueryStore,
    summary::{summarize, ProjectSummary},
    user::{parse_seconds, RefreshSettings, User},
};
use registry::ChainRegistry;
use serde_json::{json, Value};
use tracing::{debug, info};

/// Everything the tracker persists between sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveState {
    pub registry: ChainRegistry,
    pub projects: ProjectSet,
    pub selected_project: String,
    pub user: User,
    pub queries: QueryStore,
    pub refresh: RefreshSettings,
}

impl Default for LiveState {
    fn default() -> Self {
        Self {
            registry: ChainRegistry::with_defaults(),
            projects: ProjectSet::new(),
            selected_project: DEFAULT_PROJECT.to_string(),
            user: User::default(),
            queries: QueryStore::new(),
            refresh: RefreshSettings::default(),
        }
    }
}

impl LiveState {
    /// Load every slice, falling back to defaults for absent ones, then heal.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, StorageError> {
        let mut state = Self::default();

        if let Some(registry) = store.load(CHAINS_KEY)?.as_ref().and_then(ChainRegistry::from_value) {
            state.registry = registry;
        }
        if let Some(projects) = store.load(PROJECTS_KEY)?.as_ref().and_then(ProjectSet::from_value) {
            state.projects = projects;
        }
        if let Some(Value::String(selected)) = store.load(SELECTED_PROJECT_KEY)? {
            state.selected_project = selected;
        }
        if let Some(user) = store.load(USER_KEY)?.as_ref().and_then(User::from_value) {
            state.user = user;
        }
        if let Some(queries) = store.load(QUERIES_KEY)?.as_ref().and_then(QueryStore::from_value) {
            state.queries = queries;
        }
        if let Some(Value::Bool(enabled)) = store.load(REFRESH_ENABLED_KEY)? {
            state.refresh.enabled = enabled;
        }
        if let Some(seconds) = store.load(REFRESH_SECONDS_KEY)?.as_ref().and_then(parse_seconds) {
            state.refresh.set_seconds(seconds);
        }

        state.heal();
        info!(
            chains = state.registry.len(),
            queries = state.queries.len(),
            projects = state.projects.len(),
            "Loaded tracker state"
        );
        Ok(state)
    }

    /// Write every slice.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        let encode = |key: &str, value: Result<Value, serde_json::Error>| {
            value.map_err(|source| StorageError::Encode {
                key: key.to_string(),
                source,
            })
        };

        store.save(
            CHAINS_KEY,
            &encode(CHAINS_KEY, serde_json::to_value(self.registry.list_all()))?,
        )?;
        store.save(
            QUERIES_KEY,
            &encode(QUERIES_KEY, serde_json::to_value(self.queries.list()))?,
        )?;
        store.save(PROJECTS_KEY, &json!(self.projects.names()))?;
        store.save(SELECTED_PROJECT_KEY, &json!(self.selected_project))?;
        store.save(USER_KEY, &encode(USER_KEY, serde_json::to_value(&self.user))?)?;
        store.save(REFRESH_ENABLED_KEY, &json!(self.refresh.enabled))?;
        store.save(REFRESH_SECONDS_KEY, &json!(self.refresh.seconds))?;

        debug!(queries = self.queries.len(), "Saved tracker state");
        Ok(())
    }

    /// Restore the invariants that loading or importing may have broken.
    pub fn heal(&mut self) {
        self.user.heal();
        self.heal_selection();
    }

    /// Validate and insert a new query at the front, returning its id.
    pub fn create_query(&mut self, input: NewQuery) -> Result<String, CreateError> {
        let entity = QueryEntity::create(input, &self.registry)?;
        self.projects.ensure(&entity.project_name);
        let id = entity.id.clone();

        info!(id = %id, chain = %entity.chain_key, project = %entity.project_name, "Created query");
        self.queries.insert(entity);
        Ok(id)
    }

    /// Add a project to the catalog and select it.
    pub fn add_project(&mut self, name: &str) -> String {
        let name = self.projects.ensure(name);
        self.selected_project = name.clone();
        name
    }

    pub fn select_project(&mut self, name: &str) {
        self.selected_project = normalize_project_name(name);
        self.heal_selection();
    }

    pub fn summaries(&self) -> Vec<ProjectSummary> {
        summarize(&self.projects, self.queries.list())
    }

    fn heal_selection(&mut self) {
        let selected = normalize_project_name(&self.selected_project);
        self.selected_project = if self.projects.contains(&selected) {
            selected
        } else {
            DEFAULT_PROJECT.to_string()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use balance::AlertConfig;
    use registry::TRON_KEY;

    fn new_query(project: &str) -> NewQuery {
        NewQuery {
            chain_key: "ETH".to_string(),
            holder: "0x000000000000000000000000000000000000dEaD".to_string(),
            token: "0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string(),
            project_name: Some(project.to_string()),
            alert: AlertConfig::below("100"),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_store_loads_defaults() {
        let state = LiveState::load(&MemoryStore::new()).unwrap();
        assert!(state.registry.get(TRON_KEY).is_some());
        assert_eq!(state.projects.names(), [DEFAULT_PROJECT]);
        assert_eq!(state.selected_project, DEFAULT_PROJECT);
        assert!(state.refresh.enabled);
        assert!(!state.user.id.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let mut state = LiveState::default();
        state.create_query(new_query("ops")).unwrap();
        state.add_project("treasury");
        state.refresh.enabled = false;
        state.refresh.set_seconds(12.0);
        state.user.name = "alice".to_string();
        state.save(&store).unwrap();

        let loaded = LiveState::load(&store).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.selected_project, "treasury");
    }

    #[test]
    fn test_load_heals_slices() {
        let store = MemoryStore::new();
        store.save(CHAINS_KEY, &json!([{ "key": "ETH", "rpcUrl": "https://x.com" }])).unwrap();
        store.save(PROJECTS_KEY, &json!(["ops"])).unwrap();
        store.save(SELECTED_PROJECT_KEY, &json!("gone")).unwrap();
        store.save(USER_KEY, &json!({ "name": "bob" })).unwrap();
        store.save(REFRESH_SECONDS_KEY, &json!(-3)).unwrap();
        store.save(QUERIES_KEY, &json!("not a list")).unwrap();

        let state = LiveState::load(&store).unwrap();
        assert_eq!(state.registry.len(), 2);
        assert!(state.projects.contains(DEFAULT_PROJECT));
        assert_eq!(state.selected_project, DEFAULT_PROJECT);
        assert_eq!(state.user.name, "bob");
        assert!(!state.user.id.is_empty());
        assert_eq!(state.refresh, RefreshSettings::default());
        assert!(state.queries.is_empty());
    }

    #[test]
    fn test_create_query_ensures_project() {
        let mut state = LiveState::default();
        let id = state.create_query(new_query(" desk ")).unwrap();

        assert!(state.projects.contains("desk"));
        assert_eq!(state.queries.ids(), vec![id]);
        assert_eq!(state.summaries().len(), 1);
    }

    #[test]
    fn test_select_unknown_project_resets() {
        let mut state = LiveState::default();
        state.add_project("ops");
        state.select_project(" ops ");
        assert_eq!(state.selected_project, "ops");
        state.select_project("missing");
        assert_eq!(state.selected_project, DEFAULT_PROJECT);
    }
}
