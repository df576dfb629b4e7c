//! # Store Module
//!
//! Access to the shared key-value store holding toggle records.
//!
//! Layers, bottom up:
//!
//! - [`Connection`] / [`Connector`]: the backend seam. A backend only has to
//!   get, set and scan keys by prefix, reporting failures as
//!   [`StoreUnavailable`].
//! - [`Pool`]: bounded checkout of connections with an acquisition timeout.
//! - [`RemoteStore`]: the adapter used by the resolver. Reads propagate
//!   `StoreUnavailable` so the caller can tell "unknown" from "false";
//!   writes and scans absorb it.
//!
//! Backends: [`MemoryStore`] (in-process), [`RedbStore`] (single file) and,
//! with the `redis` feature, `RedisConnector`.

mod memory;
mod pool;
mod redb_store;
#[cfg(feature = "redis")]
mod redis_store;

pub use memory::{MemoryConnection, MemoryStore};
pub use pool::{Pool, PoolStats, PooledConnection};
pub use redb_store::{RedbConnection, RedbStore};
#[cfg(feature = "redis")]
pub use redis_store::{RedisConnection, RedisConnector};

use crate::error::StoreUnavailable;
use crate::settings::Settings;
use std::time::Duration;
use tracing::warn;

// =============================================================================
// BACKEND SEAM
// =============================================================================

/// A live connection to the store.
pub trait Connection: Send {
    /// Read a key. `Ok(None)` means the key is absent.
    fn get(&mut self, key: &str) -> Result<Option<String>, StoreUnavailable>;

    /// Write a key. Returns whether the store acknowledged the write.
    fn set(&mut self, key: &str, value: &str) -> Result<bool, StoreUnavailable>;

    /// All keys starting with `prefix`.
    fn scan_prefix(&mut self, prefix: &str) -> Result<Vec<String>, StoreUnavailable>;
}

/// Opens connections for a [`Pool`].
pub trait Connector: Send + Sync {
    type Conn: Connection;

    fn connect(&self) -> Result<Self::Conn, StoreUnavailable>;
}

// =============================================================================
// NAMESPACE
// =============================================================================

/// Prefix scoping toggle keys: `<namespace>:<toggle>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Store key for a toggle.
    #[must_use]
    pub fn key(&self, toggle: &str) -> String {
        format!("{}:{}", self.0, toggle)
    }

    /// Prefix shared by every key in this namespace.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}:", self.0)
    }

    /// Toggle name for a store key, if the key belongs to this namespace.
    #[must_use]
    pub fn strip<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.0.as_str())?.strip_prefix(':')
    }
}

// =============================================================================
// REMOTE STORE ADAPTER
// =============================================================================

/// Pooled access to the shared store.
pub struct RemoteStore<C: Connector> {
    pool: Pool<C>,
}

impl<C: Connector> RemoteStore<C> {
    pub fn new(connector: C, size: usize, timeout: Duration) -> Self {
        Self {
            pool: Pool::new(connector, size, timeout),
        }
    }

    /// Adapter sized from settings.
    pub fn from_settings(connector: C, settings: &Settings) -> Self {
        Self::new(connector, settings.pool_size, settings.pool_timeout)
    }

    /// Read a key. Failures are returned so the caller can degrade.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreUnavailable> {
        self.pool.with(|conn| conn.get(key))
    }

    /// Write a key. `false` when the store is unavailable or refused the write.
    pub fn set(&self, key: &str, value: &str) -> bool {
        match self.pool.with(|conn| conn.set(key, value)) {
            Ok(acknowledged) => acknowledged,
            Err(err) => {
                warn!(key, error = %err, "store write failed");
                false
            }
        }
    }

    /// Keys starting with `prefix`. Empty when the store is unavailable.
    pub fn scan_keys(&self, prefix: &str) -> Vec<String> {
        match self.pool.with(|conn| conn.scan_prefix(prefix)) {
            Ok(keys) => keys,
            Err(err) => {
                warn!(prefix, error = %err, "store scan failed");
                Vec::new()
            }
        }
    }

    #[must_use]
    pub fn pool(&self) -> &Pool<C> {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_keys() {
        let ns = Namespace::new("features");
        assert_eq!(ns.key("dark_mode"), "features:dark_mode");
        assert_eq!(ns.prefix(), "features:");
        assert_eq!(ns.strip("features:dark_mode"), Some("dark_mode"));
        assert_eq!(ns.strip("featuresx:dark_mode"), None);
        assert_eq!(ns.strip("other:dark_mode"), None);
    }

    #[test]
    fn adapter_absorbs_write_and_scan_failures() {
        let store = MemoryStore::new();
        let remote = RemoteStore::new(store.clone(), 2, Duration::from_millis(50));

        assert!(remote.set("features:a", "true"));
        assert_eq!(remote.get("features:a").unwrap().as_deref(), Some("true"));

        store.set_online(false);
        assert!(remote.get("features:a").is_err());
        assert!(!remote.set("features:a", "false"));
        assert!(remote.scan_keys("features:").is_empty());

        store.set_online(true);
        assert_eq!(remote.get("features:a").unwrap().as_deref(), Some("true"));
    }
}
