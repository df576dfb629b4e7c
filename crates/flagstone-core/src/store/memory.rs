//! In-process store.
//!
//! Every connection shares one map, so a `MemoryStore` behaves like a single
//! server seen by many clients. It can be taken offline to exercise the
//! degraded paths.

use super::{Connection, Connector};
use crate::error::StoreUnavailable;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug)]
struct Shared {
    entries: RwLock<BTreeMap<String, String>>,
    online: AtomicBool,
}

/// Shared in-memory key-value store. Clones share the same data.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: RwLock::new(BTreeMap::new()),
                online: AtomicBool::new(true),
            }),
        }
    }

    /// Toggle availability. While offline, connecting and every operation
    /// fail with [`StoreUnavailable::ConnectionRefused`].
    pub fn set_online(&self, online: bool) {
        self.shared.online.store(online, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.shared.online.load(Ordering::SeqCst)
    }

    /// Read a key directly, bypassing availability.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        self.shared
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Write a key directly, bypassing availability.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.shared
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Remove a key directly, bypassing availability.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.shared
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_online(&self) -> Result<(), StoreUnavailable> {
        if self.is_online() {
            Ok(())
        } else {
            Err(StoreUnavailable::ConnectionRefused(
                "memory store is offline".to_string(),
            ))
        }
    }
}

impl Connector for MemoryStore {
    type Conn = MemoryConnection;

    fn connect(&self) -> Result<MemoryConnection, StoreUnavailable> {
        self.ensure_online()?;
        Ok(MemoryConnection {
            store: self.clone(),
        })
    }
}

/// Connection handle onto a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    store: MemoryStore,
}

impl Connection for MemoryConnection {
    fn get(&mut self, key: &str) -> Result<Option<String>, StoreUnavailable> {
        self.store.ensure_online()?;
        Ok(self.store.peek(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<bool, StoreUnavailable> {
        self.store.ensure_online()?;
        self.store.insert(key, value);
        Ok(true)
    }

    fn scan_prefix(&mut self, prefix: &str) -> Result<Vec<String>, StoreUnavailable> {
        self.store.ensure_online()?;
        let entries = self
            .store
            .shared
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
