//! # Settings
//!
//! Deployment configuration, read once from an [`EnvSnapshot`] at startup.

use crate::env::EnvSnapshot;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Store key prefix used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "features";

/// Runtime environment used when no selector variable is set.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Defaults file, relative to the working directory.
pub const DEFAULT_DEFAULTS_PATH: &str = "config/features.yml";

/// Variables selecting the runtime environment, in priority order.
pub const ENVIRONMENT_VARS: [&str; 2] = ["FLAGSTONE_ENV", "APP_ENV"];

/// Override for the connection pool size.
pub const POOL_SIZE_VAR: &str = "FLAGSTONE_POOL_SIZE";

/// Override for the pool acquisition timeout, in milliseconds.
pub const POOL_TIMEOUT_VAR: &str = "FLAGSTONE_POOL_TIMEOUT_MS";

/// Connection URL for a networked store.
pub const STORE_URL_VAR: &str = "FLAGSTONE_STORE_URL";

/// Connections held by the pool when not overridden.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Pool acquisition timeout when not overridden.
pub const DEFAULT_POOL_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// SETTINGS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Prefix scoping toggle keys in the store.
    pub namespace: String,

    /// Runtime environment selecting the overlay namespace of the defaults file.
    pub environment: String,

    /// Location of the defaults file.
    pub defaults_path: PathBuf,

    /// Maximum simultaneously open store connections.
    pub pool_size: usize,

    /// How long a caller waits for a free connection.
    pub pool_timeout: Duration,

    /// Connection URL for networked stores.
    pub store_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            defaults_path: PathBuf::from(DEFAULT_DEFAULTS_PATH),
            pool_size: DEFAULT_POOL_SIZE,
            pool_timeout: DEFAULT_POOL_TIMEOUT,
            store_url: None,
        }
    }
}

impl Settings {
    /// Read settings from the environment, falling back to defaults.
    ///
    /// Unparseable or zero numeric overrides are ignored with a warning.
    #[must_use]
    pub fn from_env(env: &EnvSnapshot) -> Self {
        let defaults = Self::default();

        Self {
            environment: env
                .first_of(&ENVIRONMENT_VARS)
                .map(str::to_string)
                .unwrap_or(defaults.environment),
            pool_size: positive(env, POOL_SIZE_VAR)
                .map(|n| n as usize)
                .unwrap_or(defaults.pool_size),
            pool_timeout: positive(env, POOL_TIMEOUT_VAR)
                .map(Duration::from_millis)
                .unwrap_or(defaults.pool_timeout),
            store_url: env
                .get(STORE_URL_VAR)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            ..defaults
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    #[must_use]
    pub fn with_defaults_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.defaults_path = path.into();
        self
    }

    /// Set the pool size (at least 1).
    #[must_use]
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_pool_timeout(mut self, timeout: Duration) -> Self {
        self.pool_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_store_url(mut self, url: impl Into<String>) -> Self {
        self.store_url = Some(url.into());
        self
    }
}

fn positive(env: &EnvSnapshot, var: &str) -> Option<u64> {
    let raw = env.get(var)?;
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            warn!(var, value = raw, "ignoring invalid override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_environment_gives_defaults() {
        let settings = Settings::from_env(&EnvSnapshot::empty());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.environment, "development");
        assert_eq!(settings.namespace, "features");
        assert_eq!(settings.pool_size, 5);
    }

    #[test]
    fn primary_environment_variable_wins() {
        let env = EnvSnapshot::from_pairs([("FLAGSTONE_ENV", "production"), ("APP_ENV", "test")]);
        assert_eq!(Settings::from_env(&env).environment, "production");

        let env = EnvSnapshot::from_pairs([("APP_ENV", "test")]);
        assert_eq!(Settings::from_env(&env).environment, "test");
    }

    #[test]
    fn numeric_overrides() {
        let env = EnvSnapshot::from_pairs([
            ("FLAGSTONE_POOL_SIZE", "12"),
            ("FLAGSTONE_POOL_TIMEOUT_MS", "250"),
            ("FLAGSTONE_STORE_URL", "redis://cache:6379/0"),
        ]);
        let settings = Settings::from_env(&env);
        assert_eq!(settings.pool_size, 12);
        assert_eq!(settings.pool_timeout, Duration::from_millis(250));
        assert_eq!(settings.store_url.as_deref(), Some("redis://cache:6379/0"));
    }

    #[test]
    fn invalid_pool_size_falls_back() {
        for raw in ["0", "-3", "many"] {
            let env = EnvSnapshot::from_pairs([("FLAGSTONE_POOL_SIZE", raw)]);
            assert_eq!(Settings::from_env(&env).pool_size, DEFAULT_POOL_SIZE);
        }
    }

    #[test]
    fn builder_clamps_pool_size() {
        let settings = Settings::default().with_pool_size(0);
        assert_eq!(settings.pool_size, 1);
    }
}
