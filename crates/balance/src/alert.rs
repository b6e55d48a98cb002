//! Threshold alerts on fixed-point balances.

use alloy_primitives::U256;
use normalize::parse_units;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Which side of the threshold raises the alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    Above,
    #[default]
    Below,
}

impl AlertDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

/// Per-query alert configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub enabled: bool,
    pub direction: AlertDirection,
    /// Decimal threshold in token units, e.g. `"100.5"`
    pub threshold: String,
}

impl AlertConfig {
    pub fn below(threshold: &str) -> Self {
        Self {
            enabled: true,
            direction: AlertDirection::Below,
            threshold: threshold.to_string(),
        }
    }

    pub fn above(threshold: &str) -> Self {
        Self {
            enabled: true,
            direction: AlertDirection::Above,
            threshold: threshold.to_string(),
        }
    }

    /// Enabled with a non-empty threshold.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.threshold.trim().is_empty()
    }
}

/// When an alerting evaluation counts as a trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTrigger {
    /// Every evaluation that finds the condition true re-fires.
    #[default]
    EveryCycle,
    /// Only the transition from not-alerting to alerting fires.
    Edge,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertOutcome {
    pub alerting: bool,
    pub triggered: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator {
    trigger: AlertTrigger,
}

impl AlertEvaluator {
    pub const fn new(trigger: AlertTrigger) -> Self {
        Self { trigger }
    }

    pub const fn trigger(&self) -> AlertTrigger {
        self.trigger
    }

    /// Compare a balance against the configured threshold.
    ///
    /// Returns `None` when the alert is disabled, has no threshold, or the
    /// threshold does not parse at `decimals`; callers treat that as quiet.
    /// Equality never alerts.
    pub fn check(
        &self,
        balance: U256,
        decimals: u8,
        config: &AlertConfig,
        previous: Option<bool>,
    ) -> Option<AlertOutcome> {
        if !config.is_active() {
            return None;
        }

        let threshold = match parse_units(&config.threshold, decimals) {
            Ok(threshold) => threshold,
            Err(e) => {
                debug!(threshold = %config.threshold, decimals, error = %e, "Ignoring unparseable alert threshold");
                return None;
            }
        };

        let alerting = match config.direction {
            AlertDirection::Above => balance > threshold,
            AlertDirection::Below => balance < threshold,
        };
        let triggered = match self.trigger {
            AlertTrigger::EveryCycle => alerting,
            AlertTrigger::Edge => alerting && previous != Some(true),
        };

        Some(AlertOutcome {
            alerting,
            triggered,
        })
    }
}

/// Last known alerting state per query id.
///
/// Transient: never persisted, dropped when a query is removed or its alert
/// is toggled.
#[derive(Debug, Clone, Default)]
pub struct AlertHistory {
    last: HashMap<String, bool>,
}

impl AlertHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<bool> {
        self.last.get(id).copied()
    }

    /// Evaluate and record the result for `id`.
    ///
    /// History is only written when a comparison actually happened.
    pub fn evaluate(
        &mut self,
        evaluator: &AlertEvaluator,
        id: &str,
        balance: U256,
        decimals: u8,
        config: &AlertConfig,
    ) -> AlertOutcome {
        match evaluator.check(balance, decimals, config, self.get(id)) {
            Some(outcome) => {
                self.last.insert(id.to_string(), outcome.alerting);
                outcome
            }
            None => AlertOutcome::default(),
        }
    }

    pub fn forget(&mut self, id: &str) -> Option<bool> {
        self.last.remove(id)
    }

    pub fn clear(&mut self) {
        self.last.clear();
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn six(units: u64) -> U256 {
        U256::from(units) * U256::from(1_000_000u64)
    }

    #[test]
    fn test_below_threshold() {
        let evaluator = AlertEvaluator::default();
        let config = AlertConfig::below("100");

        let low = evaluator.check(six(50), 6, &config, None).unwrap();
        assert_eq!(
            low,
            AlertOutcome {
                alerting: true,
                triggered: true
            }
        );

        let high = evaluator.check(six(150), 6, &config, None).unwrap();
        assert!(!high.alerting);
        assert!(!high.triggered);
    }

    #[test]
    fn test_equality_never_alerts() {
        let evaluator = AlertEvaluator::default();
        for config in [AlertConfig::below("100"), AlertConfig::above("100")] {
            let outcome = evaluator.check(six(100), 6, &config, None).unwrap();
            assert!(!outcome.alerting);
        }
    }

    #[test]
    fn test_above_threshold_with_fraction() {
        let evaluator = AlertEvaluator::default();
        let config = AlertConfig::above("100.5");
        assert!(evaluator.check(six(101), 6, &config, None).unwrap().alerting);
        assert!(!evaluator.check(six(100), 6, &config, None).unwrap().alerting);
    }

    #[test]
    fn test_inactive_or_invalid_threshold_is_quiet() {
        let evaluator = AlertEvaluator::default();
        let mut history = AlertHistory::new();

        let empty = AlertConfig::below("");
        assert_eq!(evaluator.check(six(1), 6, &empty, None), None);

        let disabled = AlertConfig {
            enabled: false,
            ..AlertConfig::below("100")
        };
        assert_eq!(evaluator.check(six(1), 6, &disabled, None), None);

        // More precision than the token supports
        let precise = AlertConfig::below("0.0000001");
        assert_eq!(
            history.evaluate(&evaluator, "q", six(0), 6, &precise),
            AlertOutcome::default()
        );
        assert!(history.is_empty());
    }

    #[test]
    fn test_every_cycle_retriggers() {
        let evaluator = AlertEvaluator::new(AlertTrigger::EveryCycle);
        let mut history = AlertHistory::new();
        let config = AlertConfig::below("100");

        for _ in 0..3 {
            let outcome = history.evaluate(&evaluator, "q", six(50), 6, &config);
            assert!(outcome.triggered);
        }
        assert_eq!(history.get("q"), Some(true));
    }

    #[test]
    fn test_edge_triggers_once_per_crossing() {
        let evaluator = AlertEvaluator::new(AlertTrigger::Edge);
        let mut history = AlertHistory::new();
        let config = AlertConfig::below("100");

        assert!(history.evaluate(&evaluator, "q", six(50), 6, &config).triggered);
        assert!(!history.evaluate(&evaluator, "q", six(40), 6, &config).triggered);
        assert!(!history.evaluate(&evaluator, "q", six(150), 6, &config).alerting);
        assert!(history.evaluate(&evaluator, "q", six(10), 6, &config).triggered);
    }

    #[test]
    fn test_forget_resets_edge_state() {
        let evaluator = AlertEvaluator::new(AlertTrigger::Edge);
        let mut history = AlertHistory::new();
        let config = AlertConfig::below("100");

        history.evaluate(&evaluator, "q", six(50), 6, &config);
        assert_eq!(history.forget("q"), Some(true));
        assert!(history.evaluate(&evaluator, "q", six(50), 6, &config).triggered);
    }
}
