// # IP Source Trait
//
// Defines the interface for discovering the host's current address, the
// value the managed record should hold.
//
// ## Implementations
//
// - HTTP echo service: `recsync-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use recsync_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//     let ip = source.current().await?;
//     println!("External IP: {}", ip);
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// IP version filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 only
    V4,
    /// IPv6 only
    V6,
    /// Either family
    Both,
}

impl IpVersion {
    /// Pick the family a record type can hold
    ///
    /// `A` holds IPv4, `AAAA` holds IPv6, anything else is unconstrained.
    pub fn for_record_type(record_type: &str) -> Self {
        match record_type.to_ascii_uppercase().as_str() {
            "A" => IpVersion::V4,
            "AAAA" => IpVersion::V6,
            _ => IpVersion::Both,
        }
    }

    /// Whether `ip` belongs to this family
    pub fn accepts(&self, ip: &IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.is_ipv4(),
            IpVersion::V6 => ip.is_ipv6(),
            IpVersion::Both => true,
        }
    }
}

/// Trait for IP source implementations
///
/// A source answers one question per call. Polling cadence and what to do
/// with the answer belong to [`crate::Poller`].
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current, validated address
    /// - `Err(Error)`: `Transport` if the lookup failed, `Validation` if the
    ///   answer is not an acceptable address
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_from_record_type() {
        assert_eq!(IpVersion::for_record_type("A"), IpVersion::V4);
        assert_eq!(IpVersion::for_record_type("aaaa"), IpVersion::V6);
        assert_eq!(IpVersion::for_record_type("TXT"), IpVersion::Both);
    }

    #[test]
    fn version_accepts_matching_family() {
        let v4: IpAddr = "1.2.3.4".parse().unwrap();
        let v6: IpAddr = "2001:db8::1".parse().unwrap();

        assert!(IpVersion::V4.accepts(&v4));
        assert!(!IpVersion::V4.accepts(&v6));
        assert!(IpVersion::V6.accepts(&v6));
        assert!(IpVersion::Both.accepts(&v4));
    }
}
