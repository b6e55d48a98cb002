use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Floor applied to the auto-refresh interval.
pub const MIN_REFRESH_SECS: u64 = 5;

/// Ceiling applied to the auto-refresh interval.
pub const MAX_REFRESH_SECS: u64 = 24 * 60 * 60;

/// Interval used when the stored one is unusable.
pub const DEFAULT_REFRESH_SECS: f64 = 30.0;

/// Characters that cannot appear in an export file name.
const RESERVED: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// The local user; only the name is user-editable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: new_id(),
            name: String::new(),
        }
    }
}

impl User {
    /// Read a `{id, name}` object; a missing id is left empty.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |field: &str| {
            obj.get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Some(Self {
            id: text("id"),
            name: text("name"),
        })
    }

    /// Generate an id if there is none.
    pub fn heal(&mut self) {
        if self.id.trim().is_empty() {
            self.id = new_id();
        }
    }

    /// `mcbt-config-{name}.json`, with reserved characters replaced.
    pub fn export_file_name(&self) -> String {
        let safe: String = self
            .name
            .chars()
            .map(|c| if RESERVED.contains(&c) { '_' } else { c })
            .take(40)
            .collect();
        let safe = if safe.is_empty() { "user" } else { &safe };
        format!("mcbt-config-{safe}.json")
    }
}

/// Fresh globally unique identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Auto-refresh flag and interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshSettings {
    pub enabled: bool,
    /// Seconds as stored; see [`RefreshSettings::interval`]
    pub seconds: f64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            seconds: DEFAULT_REFRESH_SECS,
        }
    }
}

impl RefreshSettings {
    /// Accepts only positive, finite values.
    pub fn set_seconds(&mut self, seconds: f64) -> bool {
        if seconds.is_finite() && seconds > 0.0 {
            self.seconds = seconds;
            true
        } else {
            false
        }
    }

    /// Effective timer period, clamped to five seconds and one day.
    pub fn interval(&self) -> Duration {
        let seconds = if self.seconds.is_finite() && self.seconds > 0.0 {
            self.seconds
        } else {
            DEFAULT_REFRESH_SECS
        };
        let seconds = seconds.clamp(MIN_REFRESH_SECS as f64, MAX_REFRESH_SECS as f64);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::from_secs(MAX_REFRESH_SECS))
    }
}

/// Read a number or numeric string.
pub fn parse_seconds(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
