//! `BulbStore`: the Rust expression of the external bulb record store's
//! consumed `readAll()` interface (`spec.md` §6).
//!
//! The core only ever reads this list; `create`/`update`/`remove` are
//! admin-surface concerns and are not modeled here.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use wizbridge_core::BulbRecord;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("response was not a bulb list: {0}")]
    Decode(String),
}

/// Abstracts the external bulb record store's `readAll()` call.
///
/// Implementations must be cheap to clone/share (`Send + Sync`) since
/// the config-reload loop polls through an `Arc<dyn BulbStore>`.
#[async_trait]
pub trait BulbStore: Send + Sync {
    async fn read_all(&self) -> Result<Vec<BulbRecord>>;
}

/// Polls a REST admin surface's `GET {base_url}/bulbs` for the current
/// bulb list, mirroring the teacher's `RendezvousClient` HTTP-client
/// shape (a thin `reqwest::Client` wrapper around one base URL).
pub struct HttpBulbStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBulbStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BulbStore for HttpBulbStore {
    async fn read_all(&self) -> Result<Vec<BulbRecord>> {
        let url = format!("{}/bulbs", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let records: Vec<BulbRecord> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        debug!("loaded {} bulb records from {}", records.len(), url);
        Ok(records)
    }
}

/// An in-memory bulb list, swappable at runtime. Used for tests and
/// for embedding the bridge without the admin HTTP surface at all.
#[derive(Clone, Default)]
pub struct StaticBulbStore {
    records: Arc<RwLock<Vec<BulbRecord>>>,
}

impl StaticBulbStore {
    pub fn new(records: Vec<BulbRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Replace the bulb list the next `read_all` will return.
    pub fn set(&self, records: Vec<BulbRecord>) {
        *self.records.write() = records;
    }
}

#[async_trait]
impl BulbStore for StaticBulbStore {
    async fn read_all(&self) -> Result<Vec<BulbRecord>> {
        Ok(self.records.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use wizbridge_core::BulbId;

    fn record(mac: &str, channel: u16) -> BulbRecord {
        BulbRecord::new(
            BulbId::parse(mac).unwrap(),
            Ipv4Addr::new(192, 168, 1, 10),
            "bulb",
            channel,
        )
    }

    #[tokio::test]
    async fn static_store_returns_configured_records() {
        let store = StaticBulbStore::new(vec![record("aa:bb:cc:dd:ee:01", 1)]);
        let records = store.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn static_store_reflects_updates() {
        let store = StaticBulbStore::new(vec![record("aa:bb:cc:dd:ee:01", 1)]);
        store.set(vec![
            record("aa:bb:cc:dd:ee:01", 1),
            record("aa:bb:cc:dd:ee:02", 7),
        ]);
        let records = store.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
    }
}
