// # Record Store Trait
//
// Defines the interface to the DNS provider API that holds the managed record.
//
// ## Implementations
//
// - DigitalOcean: `recsync-provider-digitalocean` crate
//
// ## Usage
//
// ```rust,ignore
// use recsync_core::RecordStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* RecordStore implementation */;
//
//     let listing = store.list_records("example.com").await?;
//     for record in &listing.records {
//         println!("{} {} {}", record.record_type, record.name, record.data);
//     }
//
//     store.edit_record("example.com", listing.records[0].id, "1.2.3.4").await?;
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A DNS record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Provider-assigned record id
    pub id: u64,
    /// Record type (A, AAAA, CNAME, ...)
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record name relative to the domain
    pub name: String,
    /// Record value
    pub data: String,
    /// Time-to-live, when reported
    #[serde(default)]
    pub ttl: Option<u32>,
}

impl RemoteRecord {
    /// Create a record without TTL information
    pub fn new(
        id: u64,
        record_type: impl Into<String>,
        name: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id,
            record_type: record_type.into(),
            name: name.into(),
            data: data.into(),
            ttl: None,
        }
    }
}

/// Provider-reported quota state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests allowed per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset: Option<DateTime<Utc>>,
}

/// Result of listing a domain's records
#[derive(Debug, Clone, Default)]
pub struct RecordListing {
    /// Every record under the domain, in provider order
    pub records: Vec<RemoteRecord>,
    /// Quota reported by the last response
    pub rate_limit: Option<RateLimit>,
}

/// Trait for DNS provider record APIs
///
/// Implementations perform exactly one logical API operation per call and
/// keep no state between calls. Retry, caching and the decision to write are
/// owned by [`crate::Syncer`].
///
/// Any timeout must be enforced here; the syncer awaits each call to
/// completion.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List every record under `domain`
    ///
    /// # Returns
    ///
    /// - `Ok(RecordListing)`: All records and the last reported quota
    /// - `Err(Error)`: `Transport` if the call failed, `NotFound` if the
    ///   domain does not exist
    async fn list_records(&self, domain: &str) -> Result<RecordListing, crate::Error>;

    /// Set the value of record `record_id` under `domain` to `data`
    ///
    /// # Returns
    ///
    /// - `Ok(RateLimit)`: The quota reported by the response
    /// - `Err(Error)`: A `Transport` error; when a response was received its
    ///   quota is attached (see [`crate::Error::rate_limit`])
    async fn edit_record(
        &self,
        domain: &str,
        record_id: u64,
        data: &str,
    ) -> Result<RateLimit, crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_record_reads_provider_type_field() {
        let record: RemoteRecord = serde_json::from_str(
            r#"{ "id": 42, "type": "A", "name": "@", "data": "1.2.3.4", "ttl": 1800 }"#,
        )
        .unwrap();

        assert_eq!(record.id, 42);
        assert_eq!(record.record_type, "A");
        assert_eq!(record.ttl, Some(1800));
    }
}
