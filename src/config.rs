use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::SeekOrigin;

/// Tuning for the reconciliation engine.
///
/// The grace windows and drift tolerances are hand-tuned values, not derived
/// from a formal model; deployments may override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interval between position samples of the surface, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long to wait for the surface readiness callback before failing.
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,

    /// Step size for relative seeks (the skip back/forward controls).
    #[serde(default = "default_step_seek_secs")]
    pub step_seek_secs: u64,

    #[serde(default)]
    pub guard: GuardConfig,
}

/// Per-origin windows during which a seek target is trusted over polled
/// samples, and the drift each origin tolerates before a sample is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default = "default_user_grace_ms")]
    pub user_grace_ms: u64,

    #[serde(default = "default_user_drift_tolerance_secs")]
    pub user_drift_tolerance_secs: u64,

    #[serde(default = "default_external_grace_ms")]
    pub external_grace_ms: u64,

    #[serde(default = "default_external_drift_tolerance_secs")]
    pub external_drift_tolerance_secs: u64,
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}

impl GuardConfig {
    pub fn grace_window(&self, origin: SeekOrigin) -> Duration {
        match origin {
            SeekOrigin::User => Duration::from_millis(self.user_grace_ms),
            SeekOrigin::External => Duration::from_millis(self.external_grace_ms),
        }
    }

    pub fn drift_tolerance(&self, origin: SeekOrigin) -> u64 {
        match origin {
            SeekOrigin::User => self.user_drift_tolerance_secs,
            SeekOrigin::External => self.external_drift_tolerance_secs,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            ready_timeout_secs: default_ready_timeout_secs(),
            step_seek_secs: default_step_seek_secs(),
            guard: GuardConfig::default(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            user_grace_ms: default_user_grace_ms(),
            user_drift_tolerance_secs: default_user_drift_tolerance_secs(),
            external_grace_ms: default_external_grace_ms(),
            external_drift_tolerance_secs: default_external_drift_tolerance_secs(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_ready_timeout_secs() -> u64 {
    10
}

fn default_step_seek_secs() -> u64 {
    5
}

fn default_user_grace_ms() -> u64 {
    5000
}

fn default_user_drift_tolerance_secs() -> u64 {
    3
}

fn default_external_grace_ms() -> u64 {
    2000
}

fn default_external_drift_tolerance_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_values() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.ready_timeout(), Duration::from_secs(10));
        assert_eq!(config.step_seek_secs, 5);
        assert_eq!(
            config.guard.grace_window(SeekOrigin::User),
            Duration::from_millis(5000)
        );
        assert_eq!(config.guard.drift_tolerance(SeekOrigin::User), 3);
        assert_eq!(
            config.guard.grace_window(SeekOrigin::External),
            Duration::from_millis(2000)
        );
        assert_eq!(config.guard.drift_tolerance(SeekOrigin::External), 5);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            poll_interval_ms = 250

            [guard]
            user_grace_ms = 8000
            "#,
        )
        .unwrap();

        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.ready_timeout_secs, 10);
        assert_eq!(config.guard.user_grace_ms, 8000);
        assert_eq!(config.guard.external_grace_ms, 2000);
    }
}
