//! Configuration types for the record synchronizer
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identity of the managed record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTarget {
    /// Domain (zone) that owns the record, e.g. "example.com"
    pub domain: String,

    /// Record type, e.g. "A" or "AAAA"
    #[serde(default = "default_record_type")]
    pub record_type: String,

    /// Record name relative to the domain, "@" for the apex
    #[serde(default = "default_record_name")]
    pub record_name: String,
}

impl SyncTarget {
    /// Create a new target
    pub fn new(
        domain: impl Into<String>,
        record_type: impl Into<String>,
        record_name: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            record_type: record_type.into(),
            record_name: record_name.into(),
        }
    }

    /// Whether a remote record has this target's type and name
    pub fn matches(&self, record_type: &str, record_name: &str) -> bool {
        self.record_type == record_type && self.record_name == record_name
    }

    /// Validate the target
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.is_empty() {
            return Err(crate::Error::config("Domain cannot be empty"));
        }
        if self.record_type.is_empty() {
            return Err(crate::Error::config("Record type cannot be empty"));
        }
        if self.record_name.is_empty() {
            return Err(crate::Error::config("Record name cannot be empty"));
        }
        Ok(())
    }
}

impl std::fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.record_type, self.record_name, self.domain)
    }
}

/// Throttle for remote reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPolicy {
    /// Minimum interval between remote reads (in milliseconds)
    ///
    /// A refresh only happens when a write is about to be attempted and the
    /// cached record is at least this old.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Overwrite the cached value with the written one after a successful write
    ///
    /// Off by default: the cache keeps the pre-write value until the next
    /// refresh, so an unchanged desired value is written again every cycle
    /// until the refresh interval elapses.
    #[serde(default)]
    pub update_cache_on_write: bool,
}

impl SyncPolicy {
    /// Create a policy with the given refresh interval
    ///
    /// Sub-millisecond remainders round up, never down.
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            refresh_interval_ms: whole_millis_ceil(refresh_interval),
            update_cache_on_write: false,
        }
    }

    /// Enable or disable the optimistic cache update after writes
    pub fn with_update_cache_on_write(mut self, enabled: bool) -> Self {
        self.update_cache_on_write = enabled;
        self
    }

    /// Minimum interval between remote reads
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.refresh_interval_ms == 0 {
            return Err(crate::Error::config("Refresh interval must be > 0"));
        }
        Ok(())
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            update_cache_on_write: false,
        }
    }
}

/// Flat construction parameters for a [`crate::Syncer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncerConfig {
    /// Which record to manage
    #[serde(flatten)]
    pub target: SyncTarget,

    /// Read throttle
    #[serde(flatten)]
    pub policy: SyncPolicy,
}

impl SyncerConfig {
    /// Create a new configuration with the default policy
    pub fn new(target: SyncTarget) -> Self {
        Self {
            target,
            policy: SyncPolicy::default(),
        }
    }

    /// Set the policy
    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.target.validate()?;
        self.policy.validate()
    }
}

/// Polling loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Sleep between cycles (in milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Capacity of the event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl PollerConfig {
    /// Create a configuration with the given poll interval
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval_ms: whole_millis_ceil(poll_interval),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Set the event channel capacity
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Sleep between cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_ms == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_record_type() -> String {
    "A".to_string()
}

fn default_record_name() -> String {
    "@".to_string()
}

fn default_refresh_interval_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

/// `duration` in whole milliseconds, rounded up and saturating at `u64::MAX`
fn whole_millis_ceil(duration: Duration) -> u64 {
    let millis = duration.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

fn default_event_channel_capacity() -> usize {
    100
}
