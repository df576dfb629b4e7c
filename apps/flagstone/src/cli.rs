//! # CLI Commands
//!
//! Each command opens the selected store, builds a resolver from the
//! process environment plus command-line overrides, runs once and prints
//! its result to stdout. A store that cannot be opened (locked redb file,
//! bad redis URL) is treated as unavailable: `check` still answers from
//! the local tiers, `set` reports nothing written, `list` is empty.

use flagstone_core::store::{MemoryStore, RedbStore};
#[cfg(feature = "redis")]
use flagstone_core::store::RedisConnector;
use flagstone_core::{
    EnvSnapshot, FlagError, Resolution, Resolver, Settings, StoreUnavailable, YamlDefaults,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Flag(#[from] FlagError),

    #[error("cannot encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store '{0}' requires a connection URL (--url or FLAGSTONE_STORE_URL)")]
    MissingUrl(&'static str),

    #[error("store '{0}' is not available in this build")]
    Unsupported(&'static str),
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Store backend selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreKind {
    /// Empty in-process store (resolves from environment and defaults only).
    Memory,
    /// Local redb database file.
    Redb,
    /// Redis server (requires the `redis` feature).
    Redis,
}

impl StoreKind {
    fn name(self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::Redb => "redb",
            StoreKind::Redis => "redis",
        }
    }
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub store: StoreKind,
    pub db: PathBuf,
    pub url: Option<String>,
    pub defaults: Option<PathBuf>,
    pub environment: Option<String>,
    pub namespace: Option<String>,
}

impl StoreOptions {
    /// Options for a redb file with everything else taken from the environment.
    pub fn redb(db: impl Into<PathBuf>) -> Self {
        Self {
            store: StoreKind::Redb,
            db: db.into(),
            url: None,
            defaults: None,
            environment: None,
            namespace: None,
        }
    }

    /// Settings from `env`, with command-line overrides applied on top.
    pub fn settings(&self, env: &EnvSnapshot) -> Settings {
        let mut settings = Settings::from_env(env);
        if let Some(path) = &self.defaults {
            settings = settings.with_defaults_path(path);
        }
        if let Some(environment) = &self.environment {
            settings = settings.with_environment(environment);
        }
        if let Some(namespace) = &self.namespace {
            settings = settings.with_namespace(namespace);
        }
        if let Some(url) = &self.url {
            settings = settings.with_store_url(url);
        }
        settings
    }
}

// =============================================================================
// BACKEND DISPATCH
// =============================================================================

enum Backend {
    Memory(Resolver<MemoryStore>),
    Redb(Resolver<RedbStore>),
    #[cfg(feature = "redis")]
    Redis(Resolver<RedisConnector>),
}

macro_rules! dispatch {
    ($backend:expr, $r:ident => $body:expr) => {
        match $backend {
            Backend::Memory($r) => $body,
            Backend::Redb($r) => $body,
            #[cfg(feature = "redis")]
            Backend::Redis($r) => $body,
        }
    };
}

fn open(opts: &StoreOptions, env: EnvSnapshot) -> Result<Backend, CliError> {
    let settings = opts.settings(&env);
    let defaults = YamlDefaults::new(settings.defaults_path.clone(), settings.environment.clone());
    debug!(
        store = opts.store.name(),
        defaults = %defaults.path().display(),
        environment = %settings.environment,
        namespace = %settings.namespace,
        "opening resolver"
    );

    let backend = match opts.store {
        StoreKind::Memory => Backend::Memory(Resolver::new(MemoryStore::new(), defaults, env, &settings)),
        StoreKind::Redb => match RedbStore::open(&opts.db) {
            Ok(store) => Backend::Redb(Resolver::new(store, defaults, env, &settings)),
            Err(err) => offline_backend(opts.store, &err, defaults, env, &settings),
        },
        #[cfg(feature = "redis")]
        StoreKind::Redis => {
            let url = settings
                .store_url
                .clone()
                .ok_or(CliError::MissingUrl(StoreKind::Redis.name()))?;
            match RedisConnector::new(&url, settings.pool_timeout) {
                Ok(connector) => Backend::Redis(Resolver::new(connector, defaults, env, &settings)),
                Err(err) => offline_backend(opts.store, &err, defaults, env, &settings),
            }
        }
        #[cfg(not(feature = "redis"))]
        StoreKind::Redis => return Err(CliError::Unsupported(StoreKind::Redis.name())),
    };
    Ok(backend)
}

/// Resolver over an offline store, used when the selected store cannot be
/// opened. Every store call fails, so resolution degrades to the
/// environment and defaults tiers.
fn offline_backend(
    kind: StoreKind,
    err: &StoreUnavailable,
    defaults: YamlDefaults,
    env: EnvSnapshot,
    settings: &Settings,
) -> Backend {
    warn!(store = kind.name(), error = %err, "store unavailable, using local tiers");
    let offline = MemoryStore::new();
    offline.set_online(false);
    Backend::Memory(Resolver::new(offline, defaults, env, settings))
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Resolve a toggle and print the value with the tier that produced it.
pub fn cmd_check(opts: &StoreOptions, name: &str, json: bool) -> Result<Resolution, CliError> {
    cmd_check_with_env(opts, EnvSnapshot::from_process(), name, json)
}

/// [`cmd_check`] against an explicit environment.
pub fn cmd_check_with_env(
    opts: &StoreOptions,
    env: EnvSnapshot,
    name: &str,
    json: bool,
) -> Result<Resolution, CliError> {
    let backend = open(opts, env)?;
    let resolution = dispatch!(&backend, r => r.explain(name))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        let mut line = format!("{} = {} ({})", resolution.name, resolution.value, resolution.tier);
        if resolution.degraded {
            line.push_str(" [store unavailable]");
        }
        println!("{line}");
    }
    Ok(resolution)
}

#[derive(Serialize)]
struct SetOutput<'a> {
    name: &'a str,
    value: bool,
    stored: bool,
}

/// Overwrite a toggle in the store. Returns whether the store accepted it.
pub fn cmd_set(opts: &StoreOptions, name: &str, value: bool, json: bool) -> Result<bool, CliError> {
    let backend = open(opts, EnvSnapshot::from_process())?;
    let stored = dispatch!(&backend, r => r.write(name, value));

    if json {
        let output = SetOutput { name, value, stored };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if stored {
        println!("{name} = {value}");
    } else {
        println!("{name}: store unavailable, not written");
    }
    Ok(stored)
}

/// List toggles resident in the store.
pub fn cmd_list(opts: &StoreOptions, json: bool) -> Result<BTreeSet<String>, CliError> {
    let backend = open(opts, EnvSnapshot::from_process())?;
    let names = dispatch!(&backend, r => r.list_toggles());

    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        for name in &names {
            println!("{name}");
        }
    }
    Ok(names)
}
