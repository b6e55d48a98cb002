use crate::ImportError;
use chrono::{DateTime, Utc};
use registry::ChainDescriptor;
use serde::Serialize;
use serde_json::Value;
use store::{parse_seconds, LiveState, ProjectSet, QueryEntity, User};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The exported configuration document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub user: User,
    pub chains: Vec<ChainDescriptor>,
    pub projects: ProjectSet,
    pub selected_project_name: String,
    pub queries: Vec<QueryEntity>,
    pub refresh_enabled: bool,
    pub refresh_seconds: f64,
}

impl Snapshot {
    pub fn capture(state: &LiveState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            user: state.user.clone(),
            chains: state.registry.list_all().to_vec(),
            projects: state.projects.clone(),
            selected_project_name: state.selected_project.clone(),
            queries: state.queries.list().to_vec(),
            refresh_enabled: state.refresh.enabled,
            refresh_seconds: state.refresh.seconds,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// A sanitized import document.
///
/// `None` marks a top-level field that was absent or unusable; such fields
/// never touch live state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportPayload {
    pub user: Option<User>,
    pub chains: Option<Vec<ChainDescriptor>>,
    pub projects: Option<ProjectSet>,
    pub selected_project: Option<String>,
    pub queries: Option<Vec<QueryEntity>>,
    pub refresh_enabled: Option<bool>,
    pub refresh_seconds: Option<f64>,
}

impl ImportPayload {
    /// Parse snapshot text from a file or the clipboard.
    pub fn parse(text: &str) -> Result<Self, ImportError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ImportError::InvalidConfig(format!("not valid JSON: {e}")))?;
        Self::from_value(&value)
    }

    /// Sanitize every top-level field.
    ///
    /// Array entries that cannot be sanitized are dropped; the array itself
    /// still counts as present.
    pub fn from_value(value: &Value) -> Result<Self, ImportError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ImportError::InvalidConfig("expected a JSON object".to_string()))?;

        let array = |field: &str| obj.get(field).and_then(Value::as_array);

        Ok(Self {
            user: obj.get("user").and_then(User::from_value),
            chains: array("chains")
                .map(|chains| chains.iter().filter_map(ChainDescriptor::from_value).collect()),
            projects: obj.get("projects").and_then(ProjectSet::from_value),
            selected_project: obj
                .get("selectedProjectName")
                .and_then(Value::as_str)
                .map(str::to_string),
            queries: array("queries")
                .map(|queries| queries.iter().filter_map(QueryEntity::from_value).collect()),
            refresh_enabled: obj.get("refreshEnabled").and_then(Value::as_bool),
            refresh_seconds: obj.get("refreshSeconds").and_then(parse_seconds),
        })
    }
}
