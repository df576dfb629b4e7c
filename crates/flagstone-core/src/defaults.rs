//! # Defaults Loader
//!
//! File-derived fallback values.
//!
//! The defaults file is a two-level YAML mapping:
//!
//! ```yaml
//! defaults:
//!   new_checkout: false
//!   dark_mode: true
//! production:
//!   new_checkout: true
//! ```
//!
//! The `defaults` namespace is overlaid by the namespace of the active
//! runtime environment; on key collision the environment wins.
//!
//! Values are booleans. Besides `true`/`false`, the YAML 1.1 words `yes`,
//! `no`, `on`, `off`, `y` and `n` (any case) are accepted, since the YAML
//! 1.2 parser reads them as strings. Anything else is a parse error.

use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde_yaml::Value;
use tracing::debug;

/// Reserved namespace holding values shared by every environment.
pub const DEFAULTS_NAMESPACE: &str = "defaults";

/// Flattened toggle -> value mapping for one runtime environment.
pub type DefaultsMap = BTreeMap<String, bool>;

/// Raw file shape. A namespace written as `production:` with no body
/// deserializes to `None` and counts as empty.
type RawDefaults = BTreeMap<String, Option<BTreeMap<String, Value>>>;

// =============================================================================
// DEFAULTS SOURCE
// =============================================================================

/// Where the resolver obtains its defaults mapping.
///
/// The resolver calls [`DefaultsSource::load`] at most once and freezes the
/// result for its lifetime.
pub trait DefaultsSource: Send + Sync {
    fn load(&self) -> Result<DefaultsMap, ConfigError>;
}

/// Defaults read from a YAML file for one runtime environment.
#[derive(Debug, Clone)]
pub struct YamlDefaults {
    path: PathBuf,
    environment: String,
}

impl YamlDefaults {
    pub fn new(path: impl Into<PathBuf>, environment: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            environment: environment.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DefaultsSource for YamlDefaults {
    fn load(&self) -> Result<DefaultsMap, ConfigError> {
        load(&self.path, &self.environment)
    }
}

/// Defaults supplied in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticDefaults(pub DefaultsMap);

impl StaticDefaults {
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        Self(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl DefaultsSource for StaticDefaults {
    fn load(&self) -> Result<DefaultsMap, ConfigError> {
        Ok(self.0.clone())
    }
}

// =============================================================================
// LOADING
// =============================================================================

/// Load the defaults mapping for `environment` from `path`.
///
/// A missing file is an empty mapping, not an error.
pub fn load(path: &Path, environment: &str) -> Result<DefaultsMap, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no defaults file");
        return Ok(DefaultsMap::new());
    }

    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    parse(&text, environment).map_err(|reason| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse defaults text and flatten it for `environment`.
///
/// A blank document is an empty mapping.
pub fn parse(text: &str, environment: &str) -> Result<DefaultsMap, String> {
    if text.trim().is_empty() {
        return Ok(DefaultsMap::new());
    }

    let raw: RawDefaults = serde_yaml::from_str(text).map_err(|e| e.to_string())?;

    let mut namespaces = BTreeMap::new();
    for (namespace, entries) in raw {
        let mut toggles = DefaultsMap::new();
        for (name, value) in entries.unwrap_or_default() {
            let value = as_bool(&value).ok_or_else(|| {
                format!("{namespace}.{name}: expected a boolean, found {value:?}")
            })?;
            toggles.insert(name, value);
        }
        namespaces.insert(namespace, toggles);
    }

    let mut merged = namespaces.remove(DEFAULTS_NAMESPACE).unwrap_or_default();
    if environment != DEFAULTS_NAMESPACE {
        merged.extend(namespaces.remove(environment).unwrap_or_default());
    }

    Ok(merged)
}

/// Boolean reading of a YAML scalar, including the YAML 1.1 words.
fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "yes" | "y" | "on" | "true" => Some(true),
            "no" | "n" | "off" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================
