use balance::AlertTrigger;
use serde::{Deserialize, Serialize};
use std::{io, path::Path, path::PathBuf, time::Duration};

/// Top-level tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the persisted state slices
    pub state_dir: PathBuf,

    /// Prometheus exporter port, disabled when absent
    pub metrics_port: Option<u16>,

    /// Whether an ongoing alert re-fires every cycle or only on entry
    pub alert_trigger: AlertTrigger,

    /// Per-request timeout for TRON HTTP calls
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("state"),
            metrics_port: None,
            alert_trigger: AlertTrigger::default(),
            request_timeout_secs: 15,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Like [`Config::from_file`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> eyre::Result<Self> {
        match Self::from_file(&path) {
            Ok(config) => Ok(config),
            Err(e) if is_not_found(&e) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn is_not_found(e: &eyre::Report) -> bool {
    e.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}
