//! # Lister
//!
//! Report of toggles resident in the store.
//!
//! Toggles that exist only in the defaults file and were never written to
//! the store are not listed: this is a store-content report, not the set
//! of effective toggles.

use crate::store::{Connector, Namespace, RemoteStore};
use std::collections::BTreeSet;

/// Bare names of every toggle stored under `namespace`.
///
/// Empty when the store is unavailable.
pub fn list_toggles<C: Connector>(store: &RemoteStore<C>, namespace: &Namespace) -> BTreeSet<String> {
    store
        .scan_keys(&namespace.prefix())
        .iter()
        .filter_map(|key| namespace.strip(key))
        .map(str::to_string)
        .collect()
}
