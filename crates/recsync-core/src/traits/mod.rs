//! Collaborator traits for the record synchronizer
//!
//! This module defines the abstract interfaces the core is driven through.
//!
//! - [`RecordStore`]: List and edit records via a provider API
//! - [`IpSource`]: Discover the value the record should hold

pub mod ip_source;
pub mod record_store;

pub use ip_source::{IpSource, IpVersion};
pub use record_store::{RateLimit, RecordListing, RecordStore, RemoteRecord};
