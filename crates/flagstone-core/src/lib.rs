//! # Flagstone Core
//!
//! Tiered boolean toggle resolution.
//!
//! A toggle is answered by the first tier that knows it:
//!
//! 1. the shared key-value store (`<namespace>:<name>`),
//! 2. the process environment (`NAME` upper-cased),
//! 3. the defaults file (`defaults` namespace overlaid by the active
//!    runtime environment's namespace),
//! 4. `false`.
//!
//! When the answer comes from the defaults tier it is written back to the
//! store so other readers converge on the same value. Store failures never
//! reach the caller: resolution degrades to the local tiers, listing and
//! writing report an empty/negative result.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flagstone_core::{EnvSnapshot, Resolver, Settings, YamlDefaults};
//! use flagstone_core::store::MemoryStore;
//!
//! let env = EnvSnapshot::from_process();
//! let settings = Settings::from_env(&env);
//! let defaults = YamlDefaults::new(settings.defaults_path.clone(), settings.environment.clone());
//! let resolver = Resolver::new(MemoryStore::new(), defaults, env, &settings);
//!
//! if resolver.resolve("new_checkout")? {
//!     // ...
//! }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]

pub mod defaults;
pub mod env;
pub mod error;
pub mod lister;
pub mod resolver;
pub mod settings;
pub mod store;
pub mod truthy;

pub use defaults::{DefaultsMap, DefaultsSource, StaticDefaults, YamlDefaults};
pub use env::EnvSnapshot;
pub use error::{ConfigError, FlagError, Result, StoreUnavailable};
pub use resolver::{Resolution, Resolver, Tier};
pub use settings::Settings;
pub use store::{Namespace, RemoteStore};
pub use truthy::is_truthy;
