//! Single-record synchronization engine
//!
//! The Syncer is responsible for:
//! - Holding a local cache of the remote record
//! - Deciding when that cache is stale enough to re-read
//! - Comparing the desired value with the cached one
//! - Issuing at most one write per observation
//!
//! ## Decision Flow
//!
//! ```text
//!  desired ──▶ equals cache.data? ──yes──▶ (unchanged, no calls)
//!                    │ no
//!                    ▼
//!              cache stale? ──yes──▶ refresh ──fail──▶ (unchanged, error swallowed)
//!                    │ no               │ ok
//!                    ▼                  ▼
//!                  write ◀──────────────┘
//!                    │
//!          ok ──▶ (changed)      fail ──▶ Err
//! ```
//!
//! A refresh never short-circuits the write: once a difference against the
//! cache was seen, the desired value is written even if the refreshed record
//! already holds it.

use crate::config::{SyncPolicy, SyncTarget, SyncerConfig};
use crate::error::{Error, Result};
use crate::traits::{RateLimit, RecordStore};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Last known remote record state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedRecord {
    /// Provider-assigned record id
    pub id: u64,
    /// Record value as of the last refresh
    pub data: String,
    /// When the record was fetched; `None` until the first refresh
    pub fetched_at: Option<Instant>,
}

impl CachedRecord {
    /// Whether the cache is at least `interval` old at `now`
    ///
    /// A cache that was never fetched is always stale.
    pub fn is_stale_at(&self, interval: Duration, now: Instant) -> bool {
        match self.fetched_at {
            None => true,
            Some(fetched_at) => fetched_at
                .checked_add(interval)
                .is_some_and(|deadline| now >= deadline),
        }
    }
}

/// Outcome of a single [`Syncer::sync`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Whether a write was issued and succeeded
    pub changed: bool,
    /// Cached value before this cycle
    pub previous: String,
}

impl SyncOutcome {
    fn unchanged(previous: String) -> Self {
        Self {
            changed: false,
            previous,
        }
    }
}

/// Keeps one DNS record in sync with a locally observed value
///
/// ## Threading
///
/// All state is plain fields mutated through `&mut self`. One `sync` call
/// completes, nested store calls included, before the next may start.
pub struct Syncer {
    /// Which record to manage
    target: SyncTarget,

    /// Read throttle
    policy: SyncPolicy,

    /// Provider API
    store: Box<dyn RecordStore>,

    /// Last known remote state
    cache: CachedRecord,

    /// Quota reported by the most recent write attempt
    rate_limit: Option<RateLimit>,
}

impl Syncer {
    /// Create a new syncer with an empty cache
    ///
    /// # Parameters
    ///
    /// - `config`: Target record and read policy
    /// - `store`: Provider API used for refreshes and writes
    pub fn new(config: SyncerConfig, store: Box<dyn RecordStore>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            target: config.target,
            policy: config.policy,
            store,
            cache: CachedRecord::default(),
            rate_limit: None,
        })
    }

    /// The managed record
    pub fn target(&self) -> &SyncTarget {
        &self.target
    }

    /// The read policy
    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// The cached remote record
    pub fn cached_record(&self) -> &CachedRecord {
        &self.cache
    }

    /// Quota reported by the most recent write attempt
    pub fn rate_limit(&self) -> Option<&RateLimit> {
        self.rate_limit.as_ref()
    }

    /// Whether the next differing value would trigger a refresh
    pub fn is_stale(&self) -> bool {
        self.cache
            .is_stale_at(self.policy.refresh_interval(), Instant::now())
    }

    /// Bring the remote record in line with `desired`
    ///
    /// # Returns
    ///
    /// - `Ok(SyncOutcome)`: `changed` is true only when a write succeeded.
    ///   A failed refresh also lands here, as an unchanged outcome.
    /// - `Err(Error)`: The write failed
    pub async fn sync(&mut self, desired: &str) -> Result<SyncOutcome> {
        let previous = self.cache.data.clone();

        if desired == self.cache.data {
            debug!("Record {} already holds {}, nothing to do", self.target, desired);
            return Ok(SyncOutcome::unchanged(previous));
        }

        if self.is_stale() {
            if let Err(e) = self.refresh().await {
                warn!("Refresh of {} failed, skipping update this cycle: {}", self.target, e);
                return Ok(SyncOutcome::unchanged(previous));
            }
        }

        self.update(desired).await?;

        debug!("Wrote {} to {}", desired, self.target);
        Ok(SyncOutcome {
            changed: true,
            previous,
        })
    }

    /// Re-read the managed record into the cache
    ///
    /// Lists every record under the target's domain and takes the first one
    /// whose type and name match. On success the cache is replaced wholesale
    /// and the staleness clock restarts, whether or not the value changed.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The cache now holds the remote record
    /// - `Err(Error)`: `NotFound` if no record matched, or the store's error
    pub async fn refresh(&mut self) -> Result<()> {
        debug!("Refreshing {} from {}", self.target, self.store.store_name());

        let listing = self.store.list_records(&self.target.domain).await?;

        if let Some(rate) = &listing.rate_limit {
            debug!(
                "{} quota after list: {}/{} remaining",
                self.store.store_name(),
                rate.remaining,
                rate.limit
            );
        }

        let record = listing
            .records
            .into_iter()
            .find(|record| self.target.matches(&record.record_type, &record.name))
            .ok_or_else(|| Error::not_found(format!("No record matches {}", self.target)))?;

        debug!("Fetched {} (id {}) = {}", self.target, record.id, record.data);

        self.cache = CachedRecord {
            id: record.id,
            data: record.data,
            fetched_at: Some(Instant::now()),
        };

        Ok(())
    }

    /// Write `data` to the cached record id
    ///
    /// The rate limit snapshot is overwritten on every attempt, failed ones
    /// included.
    async fn update(&mut self, data: &str) -> Result<()> {
        let result = self
            .store
            .edit_record(&self.target.domain, self.cache.id, data)
            .await;

        match result {
            Ok(rate) => {
                self.rate_limit = Some(rate);
                if self.policy.update_cache_on_write {
                    self.cache.data = data.to_string();
                }
                Ok(())
            }
            Err(e) => {
                self.rate_limit = e.rate_limit().cloned();
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for Syncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Syncer")
            .field("target", &self.target)
            .field("policy", &self.policy)
            .field("store", &self.store.store_name())
            .field("cache", &self.cache)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}
