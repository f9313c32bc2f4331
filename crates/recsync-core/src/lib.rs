// # recsync-core
//
// Core library for keeping a single DNS record in sync with a locally
// observed value, typically the host's public IP.
//
// ## Architecture Overview
//
// - **Syncer**: Decision engine. Caches the remote record, refreshes it only
//   when a write is due and the cache is stale, writes at most once per call
// - **RecordStore**: Trait for the provider API (list records, edit a record)
// - **IpSource**: Trait for discovering the desired value
// - **Poller**: Sequential loop feeding the Syncer once per interval
//
// ## Design Principles
//
// 1. **Reads are expensive**: Provider reads are rate-limited, so the cache
//    is trusted until it goes stale
// 2. **Single-threaded**: One sync completes before the next starts
// 3. **Write failures are fatal, read failures are not**: A failed refresh
//    skips the cycle, a failed write stops the loop
// 4. **Library-First**: The daemon is a thin layer over this crate

pub mod config;
pub mod error;
pub mod poller;
pub mod syncer;
pub mod traits;

// Re-export core types for convenience
pub use config::{PollerConfig, SyncPolicy, SyncTarget, SyncerConfig};
pub use error::{Error, Result};
pub use poller::{Poller, PollerEvent};
pub use syncer::{CachedRecord, SyncOutcome, Syncer};
pub use traits::{IpSource, IpVersion, RateLimit, RecordListing, RecordStore, RemoteRecord};
