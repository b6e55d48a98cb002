//! Alert side effects.

use async_trait::async_trait;
use balance::AlertDirection;
use store::{short_address, QueryEntity};
use tracing::{info, warn};

/// Title of every alert notification.
pub const ALERT_TITLE: &str = "Balance alert";

/// Outcome of a notification permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Platform notification, speech and audio.
///
/// Every method is best effort and must not fail.
#[async_trait]
pub trait SignalSink: Send + Sync {
    fn notify(&self, title: &str, body: &str);

    fn speak(&self, text: &str);

    fn beep(&self);

    /// Ask for notification permission; denial only limits delivery.
    async fn request_permission(&self) -> Permission;
}

/// Sink that writes every signal to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl SignalSink for LogSink {
    fn notify(&self, title: &str, body: &str) {
        warn!(%title, body = %body.replace('\n', " "), "Notification");
    }

    fn speak(&self, text: &str) {
        warn!(%text, "Speech");
    }

    fn beep(&self) {
        info!("Beep");
    }

    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }
}

/// Everything needed to announce one triggered alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSignal {
    pub project: String,
    pub chain: String,
    pub symbol: String,
    pub direction: AlertDirection,
    pub threshold: String,
    pub balance: String,
    pub holder: String,
}

impl AlertSignal {
    pub fn from_entity(entity: &QueryEntity) -> Self {
        Self {
            project: entity.project().to_string(),
            chain: entity.chain_name.clone(),
            symbol: entity.display_symbol().to_string(),
            direction: entity.alert.direction,
            threshold: entity.alert.threshold.clone(),
            balance: entity.balance.clone(),
            holder: entity.holder_address.clone(),
        }
    }

    pub fn spoken(&self) -> String {
        format!(
            "Alert, {}, {}, {}: balance {} {}",
            self.project,
            self.chain,
            self.symbol,
            self.direction.as_str(),
            self.threshold
        )
    }

    pub fn body(&self) -> String {
        format!(
            "{} {} {}\n{}",
            self.chain,
            self.symbol,
            self.balance,
            short_address(&self.holder)
        )
    }

    /// Speak, notify and beep.
    pub fn deliver(&self, sink: &dyn SignalSink) {
        sink.speak(&self.spoken());
        sink.notify(ALERT_TITLE, &self.body());
        sink.beep();
    }
}
