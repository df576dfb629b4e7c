//! # Resolver
//!
//! Answers "is this toggle on?" by walking the tiers in precedence order:
//!
//! 1. **Remote**: `<namespace>:<name>` in the shared store. A present value
//!    always wins, including `"false"`, and is never rewritten.
//! 2. **Environment**: the upper-cased name in the environment snapshot.
//!    Process-local, so it is neither written back nor does it require the
//!    defaults file.
//! 3. **Default**: the frozen defaults mapping.
//! 4. **Unset**: `false`.
//!
//! Values from tiers 3 and 4 are written back to the store (best effort) so
//! later readers, in this process or others, observe the same answer.
//!
//! ## Failure policy
//!
//! - Store failures are logged and absorbed: resolution continues with the
//!   local tiers. There are no retries.
//! - A malformed defaults file is reported as [`FlagError::Config`] on the
//!   first resolution that needs it, and on every one after.
//! - An unknown toggle name is not an error. It resolves to `false`.

use crate::defaults::{DefaultsMap, DefaultsSource};
use crate::env::EnvSnapshot;
use crate::error::{ConfigError, FlagError, Result};
use crate::lister;
use crate::settings::Settings;
use crate::store::{Connector, Namespace, RemoteStore};
use crate::truthy::{as_token, is_truthy};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

// =============================================================================
// RESOLUTION
// =============================================================================

/// The tier that produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Remote,
    Environment,
    Default,
    Unset,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Remote => "remote",
            Tier::Environment => "environment",
            Tier::Default => "default",
            Tier::Unset => "unset",
        };
        f.write_str(name)
    }
}

/// A resolved toggle with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub name: String,
    pub value: bool,
    pub tier: Tier,
    /// The store could not be read; the value came from a local tier.
    pub degraded: bool,
    /// The value was written back to the store and acknowledged.
    pub written_back: bool,
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Toggle resolver with injected store, defaults source and environment.
///
/// Safe to share across threads. The defaults mapping is loaded at most once
/// per resolver, on the first resolution that falls through to it, and then
/// frozen even if the backing file changes.
pub struct Resolver<C: Connector> {
    store: RemoteStore<C>,
    namespace: Namespace,
    env: EnvSnapshot,
    source: Box<dyn DefaultsSource>,
    defaults: OnceLock<std::result::Result<DefaultsMap, ConfigError>>,
}

impl<C: Connector> Resolver<C> {
    /// Build a resolver, pooling `connector` as configured in `settings`.
    pub fn new(
        connector: C,
        source: impl DefaultsSource + 'static,
        env: EnvSnapshot,
        settings: &Settings,
    ) -> Self {
        Self::from_parts(
            RemoteStore::from_settings(connector, settings),
            Namespace::new(settings.namespace.clone()),
            source,
            env,
        )
    }

    /// Build a resolver from an existing store adapter.
    pub fn from_parts(
        store: RemoteStore<C>,
        namespace: Namespace,
        source: impl DefaultsSource + 'static,
        env: EnvSnapshot,
    ) -> Self {
        Self {
            store,
            namespace,
            env,
            source: Box::new(source),
            defaults: OnceLock::new(),
        }
    }

    /// Whether `name` is on.
    pub fn resolve(&self, name: &str) -> Result<bool> {
        self.explain(name).map(|resolution| resolution.value)
    }

    /// Run `action` if `name` is on, returning its result; `None` otherwise.
    ///
    /// `action` is never invoked for a toggle that is off.
    pub fn resolve_with_action<R>(&self, name: &str, action: impl FnOnce() -> R) -> Result<Option<R>> {
        Ok(self.resolve(name)?.then(action))
    }

    /// Resolve `name` and report which tier answered.
    pub fn explain(&self, name: &str) -> Result<Resolution> {
        let key = self.namespace.key(name);

        let degraded = match self.store.get(&key) {
            Ok(Some(raw)) => {
                debug!(toggle = name, value = %raw, "remote hit");
                return Ok(Resolution {
                    name: name.to_string(),
                    value: is_truthy(Some(&raw)),
                    tier: Tier::Remote,
                    degraded: false,
                    written_back: false,
                });
            }
            Ok(None) => false,
            Err(err) => {
                warn!(toggle = name, error = %err, "store unavailable, using local tiers");
                true
            }
        };

        if let Some(raw) = self.env.toggle_override(name) {
            debug!(toggle = name, value = raw, "environment override");
            return Ok(Resolution {
                name: name.to_string(),
                value: is_truthy(Some(raw)),
                tier: Tier::Environment,
                degraded,
                written_back: false,
            });
        }

        let (value, tier) = match self.frozen_defaults(!degraded)?.get(name) {
            Some(&value) => (value, Tier::Default),
            None => (false, Tier::Unset),
        };
        let written_back = self.store.set(&key, as_token(value));
        debug!(toggle = name, value, %tier, written_back, "fallback");

        Ok(Resolution {
            name: name.to_string(),
            value,
            tier,
            degraded,
            written_back,
        })
    }

    /// Overwrite `name` in the store. `false` when the store did not accept it.
    pub fn write(&self, name: &str, value: bool) -> bool {
        self.store.set(&self.namespace.key(name), as_token(value))
    }

    /// Toggles resident in the store under this resolver's namespace.
    pub fn list_toggles(&self) -> BTreeSet<String> {
        lister::list_toggles(&self.store, &self.namespace)
    }

    /// The frozen defaults mapping, loading it on first use.
    pub fn defaults(&self) -> Result<&DefaultsMap> {
        self.frozen_defaults(true)
    }

    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    #[must_use]
    pub fn store(&self) -> &RemoteStore<C> {
        &self.store
    }

    /// Load on first use. Seeding is skipped when the read that triggered
    /// the load already failed.
    fn frozen_defaults(&self, seed: bool) -> Result<&DefaultsMap> {
        self.defaults
            .get_or_init(|| self.load_defaults(seed))
            .as_ref()
            .map_err(|err| FlagError::Config(err.clone()))
    }

    fn load_defaults(&self, seed: bool) -> std::result::Result<DefaultsMap, ConfigError> {
        let defaults = self.source.load()?;
        info!(count = defaults.len(), "defaults loaded");
        if seed {
            self.seed(&defaults);
        } else {
            debug!("store unavailable, seeding skipped");
        }
        Ok(defaults)
    }

    /// Write every default the store does not hold yet. Existing records are
    /// left alone; the first store failure ends seeding.
    fn seed(&self, defaults: &DefaultsMap) {
        let mut seeded = 0usize;
        for (name, &value) in defaults {
            let key = self.namespace.key(name);
            match self.store.get(&key) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    if self.store.set(&key, as_token(value)) {
                        seeded += 1;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "store unavailable, seeding skipped");
                    return;
                }
            }
        }
        if seeded > 0 {
            info!(seeded, "seeded store from defaults");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
