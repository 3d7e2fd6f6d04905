//! Bulb record representation
//!
//! The core treats the bulb list as read-only: it is pulled from an
//! external record store (see `wizbridge_bridge::store`) and never
//! written back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Canonical bulb identity: lowercase hex octets joined by colons,
/// e.g. `aa:bb:cc:dd:ee:01`.
///
/// Parsing accepts upper/lower case and `:` or `-` separators, but
/// `Display` always renders the canonical form so two records for the
/// same physical bulb compare equal regardless of how the store
/// formatted them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BulbId(String);

impl BulbId {
    pub fn parse(raw: &str) -> Result<Self> {
        let octets: Vec<&str> = raw.split(|c| c == ':' || c == '-').collect();
        let valid = octets.len() == 6
            && octets
                .iter()
                .all(|o| o.len() == 2 && o.bytes().all(|b| b.is_ascii_hexdigit()));
        if !valid {
            return Err(Error::InvalidMac(raw.to_string()));
        }
        let canonical = octets
            .iter()
            .map(|o| o.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(":");
        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BulbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BulbId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<BulbId> for String {
    fn from(id: BulbId) -> Self {
        id.0
    }
}

/// A physical bulb as configured by the operator.
///
/// Supplied and owned by the external record store; the bridge never
/// mutates one of these, it only reads the snapshot handed to it on
/// each config reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulbRecord {
    pub mac: BulbId,
    pub ip: Ipv4Addr,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// 1-based DMX starting slot. The bulb occupies six consecutive
    /// slots at array indices `channel-1 ..= channel+4` (see
    /// `SlotVector::extract`).
    pub channel: u16,
}

impl BulbRecord {
    pub fn new(mac: BulbId, ip: Ipv4Addr, name: impl Into<String>, channel: u16) -> Self {
        Self {
            mac,
            ip,
            name: name.into(),
            kind: String::new(),
            channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_mac() {
        let id = BulbId::parse("AA:BB:CC:DD:EE:01").unwrap();
        assert_eq!(id.as_str(), "aa:bb:cc:dd:ee:01");
    }

    #[test]
    fn parses_hyphenated_mac() {
        let id = BulbId::parse("aa-bb-cc-dd-ee-01").unwrap();
        assert_eq!(id.as_str(), "aa:bb:cc:dd:ee:01");
    }

    #[test]
    fn rejects_malformed_mac() {
        assert!(BulbId::parse("not-a-mac").is_err());
        assert!(BulbId::parse("aa:bb:cc:dd:ee").is_err());
        assert!(BulbId::parse("zz:bb:cc:dd:ee:01").is_err());
    }

    #[test]
    fn equal_regardless_of_source_casing() {
        let a = BulbId::parse("AA:BB:CC:DD:EE:01").unwrap();
        let b = BulbId::parse("aa:bb:cc:dd:ee:01").unwrap();
        assert_eq!(a, b);
    }
}
