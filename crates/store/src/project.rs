use serde::Serialize;
use serde_json::Value;

/// Project every query falls back to; always present in the catalog.
pub const DEFAULT_PROJECT: &str = "Default";

/// Trim a project name; empty means the default project.
pub fn normalize_project_name(name: &str) -> String {
    match name.trim() {
        "" => DEFAULT_PROJECT.to_string(),
        name => name.to_string(),
    }
}

/// Ordered, deduplicated catalog of project names.
///
/// Queries reference projects by name only, so removing a name never touches
/// the queries filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProjectSet {
    names: Vec<String>,
}

impl Default for ProjectSet {
    fn default() -> Self {
        Self {
            names: vec![DEFAULT_PROJECT.to_string()],
        }
    }
}

impl ProjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary names; blanks are dropped, duplicates collapse.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self { names: Vec::new() };
        set.extend(names);
        set
    }

    /// Rebuild from persisted or imported JSON; non-string entries are ignored.
    pub fn from_value(value: &Value) -> Option<Self> {
        let names = value.as_array()?;
        Some(Self::from_names(names.iter().filter_map(Value::as_str)))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim();
        self.names.iter().any(|n| n == name)
    }

    /// Add a project and return its normalized name.
    pub fn ensure(&mut self, name: &str) -> String {
        let name = normalize_project_name(name);
        self.add(&name);
        name
    }

    /// Union with `names`, keeping the default project.
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.add(name.as_ref());
        }
        self.add(DEFAULT_PROJECT);
    }

    /// Drop a project name. The default project cannot be removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name == DEFAULT_PROJECT {
            return false;
        }
        let before = self.names.len();
        self.names.retain(|n| n != name);
        self.names.len() != before
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn add(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() && !self.contains(name) {
            self.names.push(name.to_string());
        }
    }
}
