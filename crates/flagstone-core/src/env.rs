//! # Environment Snapshot
//!
//! Read-only view of process environment variables, captured once so that
//! resolution is deterministic for the life of a resolver.

use std::collections::BTreeMap;

/// Immutable copy of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Build a snapshot from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check whether a variable is set.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Get a variable's value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Value of the first variable in `names` that is set and non-empty.
    #[must_use]
    pub fn first_of(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .find(|value| !value.is_empty())
    }

    /// Raw override for a toggle, looked up by its upper-cased name.
    #[must_use]
    pub fn toggle_override(&self, toggle: &str) -> Option<&str> {
        self.get(&override_var(toggle))
    }
}

/// Environment variable name that overrides `toggle`.
#[must_use]
pub fn override_var(toggle: &str) -> String {
    toggle.to_uppercase()
}
