//! Hub tuning: dedup, backfill, delivery and inbox settings

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::handlers::InboxAggregatorConfig;
use crate::application::hub::{DedupConfig, HubOptions};
use crate::domain::order::TransitionPolicy;

/// Hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Correlation ids remembered per connection and room
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,

    /// Content-duplicate window in milliseconds
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,

    /// Events replayed on join
    #[serde(default = "default_backfill_limit")]
    pub backfill_limit: usize,

    /// Per-connection delivery deadline in milliseconds
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,

    /// Outbound queue depth per connection
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    /// Room activity channel depth
    #[serde(default = "default_activity_capacity")]
    pub activity_capacity: usize,

    /// Inbox fallback recompute period in seconds
    #[serde(default = "default_inbox_resync_secs")]
    pub inbox_resync_secs: u64,

    /// Enforce the forward status graph instead of only blocking final states
    #[serde(default)]
    pub strict_transitions: bool,

    /// JSON file with orders and known customers loaded at startup
    pub seed_path: Option<PathBuf>,
}

impl HubConfig {
    pub fn hub_options(&self) -> HubOptions {
        HubOptions {
            dedup: DedupConfig {
                capacity: self.dedup_capacity,
                window: Duration::from_millis(self.dedup_window_ms),
            },
            backfill_limit: self.backfill_limit,
            delivery_timeout: Duration::from_millis(self.delivery_timeout_ms),
            outbound_capacity: self.outbound_capacity,
            activity_capacity: self.activity_capacity,
        }
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        if self.strict_transitions {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Permissive
        }
    }

    pub fn inbox_config(&self) -> InboxAggregatorConfig {
        InboxAggregatorConfig::default()
            .with_resync_interval(Duration::from_secs(self.inbox_resync_secs))
    }

    /// Validate hub configuration
    ///
    /// `backfill_limit` may be zero (no replay); every other size must not.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("dedup_capacity", self.dedup_capacity as u64),
            ("delivery_timeout_ms", self.delivery_timeout_ms),
            ("outbound_capacity", self.outbound_capacity as u64),
            ("activity_capacity", self.activity_capacity as u64),
            ("inbox_resync_secs", self.inbox_resync_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ValidationError::MustBePositive(name));
            }
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            dedup_capacity: default_dedup_capacity(),
            dedup_window_ms: default_dedup_window_ms(),
            backfill_limit: default_backfill_limit(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
            outbound_capacity: default_outbound_capacity(),
            activity_capacity: default_activity_capacity(),
            inbox_resync_secs: default_inbox_resync_secs(),
            strict_transitions: false,
            seed_path: None,
        }
    }
}

fn default_dedup_capacity() -> usize {
    500
}

fn default_dedup_window_ms() -> u64 {
    3_000
}

fn default_backfill_limit() -> usize {
    200
}

fn default_delivery_timeout_ms() -> u64 {
    2_000
}

fn default_outbound_capacity() -> usize {
    256
}

fn default_activity_capacity() -> usize {
    1024
}

fn default_inbox_resync_secs() -> u64 {
    60
}
