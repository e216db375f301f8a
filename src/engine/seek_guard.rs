use tokio::time::Instant;

use tracing::trace;

use crate::config::GuardConfig;
use crate::types::{SeekIntent, SeekOrigin};

/// What to do with an observed position sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDecision {
    Accept,
    Reject,
}

/// Tracks the single authoritative seek intent and decides whether observed
/// samples are trustworthy.
///
/// Tokens strictly increase; a newer intent supersedes the old one and an
/// older intent is never reinstated. An intent is retired once a sample is
/// accepted or its grace window elapses.
pub struct SeekGuard {
    config: GuardConfig,
    active: Option<SeekIntent>,
    next_token: u64,
}

impl SeekGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            active: None,
            next_token: 1,
        }
    }

    /// Register a new intent, superseding any active one.
    pub fn register_intent(&mut self, target_seconds: u64, origin: SeekOrigin, now: Instant) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.active = Some(SeekIntent {
            target_seconds,
            requested_at: now,
            token,
            origin,
        });
        trace!(token, target_seconds, ?origin, "seek intent registered");
        token
    }

    /// Pure decision: is this sample trustworthy right now?
    pub fn should_accept(&self, sample_seconds: u64, now: Instant) -> bool {
        match &self.active {
            None => true,
            Some(intent) => {
                let window = self.config.grace_window(intent.origin);
                if now.duration_since(intent.requested_at) >= window {
                    return true;
                }
                let tolerance = self.config.drift_tolerance(intent.origin);
                sample_seconds.abs_diff(intent.target_seconds) <= tolerance
            }
        }
    }

    /// Apply the decision rule and retire the intent on acceptance.
    pub fn observe_sample(&mut self, sample_seconds: u64, now: Instant) -> SampleDecision {
        if self.should_accept(sample_seconds, now) {
            if let Some(intent) = self.active.take() {
                trace!(token = intent.token, sample_seconds, "intent retired by accepted sample");
            }
            SampleDecision::Accept
        } else {
            SampleDecision::Reject
        }
    }

    /// Re-anchor the active intent on the position the surface confirmed,
    /// restarting its grace window. No-op unless `token` is still active.
    pub fn refresh(&mut self, token: u64, actual_seconds: u64, now: Instant) -> bool {
        match &mut self.active {
            Some(intent) if intent.token == token => {
                intent.target_seconds = actual_seconds;
                intent.requested_at = now;
                true
            }
            _ => false,
        }
    }

    /// Retire the active intent if its grace window has elapsed.
    pub fn expire(&mut self, now: Instant) {
        if let Some(intent) = &self.active {
            let window = self.config.grace_window(intent.origin);
            if now.duration_since(intent.requested_at) >= window {
                trace!(token = intent.token, "intent retired by window expiry");
                self.active = None;
            }
        }
    }

    pub fn active_token(&self) -> Option<u64> {
        self.active.as_ref().map(|intent| intent.token)
    }

    pub fn active_intent(&self) -> Option<&SeekIntent> {
        self.active.as_ref()
    }

    pub fn is_guarded(&self, now: Instant) -> bool {
        match &self.active {
            None => false,
            Some(intent) => {
                now.duration_since(intent.requested_at) < self.config.grace_window(intent.origin)
            }
        }
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}
