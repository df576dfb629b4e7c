//! Integration tests for Flagstone CLI commands.
//!
//! Uses tempfile for redb databases and defaults files.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use flagstone::cli::{
    CliError, StoreKind, StoreOptions, cmd_check_with_env, cmd_list, cmd_set,
};
use flagstone_core::store::RedbStore;
use flagstone_core::{EnvSnapshot, FlagError, Tier};
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn create_defaults(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("features.yml");
    let content = "defaults:\n  search: true\n  beta: false\nproduction:\n  search: false\n";
    std::fs::write(&path, content).unwrap();
    path
}

fn redb_options(dir: &TempDir) -> StoreOptions {
    StoreOptions {
        defaults: Some(create_defaults(dir)),
        environment: Some("development".to_string()),
        ..StoreOptions::redb(dir.path().join("toggles.redb"))
    }
}

// =============================================================================
// CHECK COMMAND TESTS
// =============================================================================

#[test]
fn test_check_uses_defaults_then_store() {
    let temp = create_temp_dir();
    let opts = redb_options(&temp);

    let first = cmd_check_with_env(&opts, EnvSnapshot::empty(), "search", false).unwrap();
    assert!(first.value);
    assert_eq!(first.tier, Tier::Default);

    // Written back to the redb file: the next process reads it remotely.
    let second = cmd_check_with_env(&opts, EnvSnapshot::empty(), "search", true).unwrap();
    assert!(second.value);
    assert_eq!(second.tier, Tier::Remote);
}

#[test]
fn test_check_environment_selects_overlay() {
    let temp = create_temp_dir();
    let opts = StoreOptions {
        environment: Some("production".to_string()),
        ..redb_options(&temp)
    };

    let resolution = cmd_check_with_env(&opts, EnvSnapshot::empty(), "search", false).unwrap();
    assert!(!resolution.value);
}

#[test]
fn test_check_environment_override() {
    let temp = create_temp_dir();
    let opts = StoreOptions {
        store: StoreKind::Memory,
        ..redb_options(&temp)
    };
    let env = EnvSnapshot::from_pairs([("BETA", "yes")]);

    let resolution = cmd_check_with_env(&opts, env, "beta", false).unwrap();
    assert!(resolution.value);
    assert_eq!(resolution.tier, Tier::Environment);
}

#[test]
fn test_check_malformed_defaults_fails() {
    let temp = create_temp_dir();
    let path = temp.path().join("broken.yml");
    std::fs::write(&path, "defaults: nope\n").unwrap();
    let opts = StoreOptions {
        defaults: Some(path),
        ..redb_options(&temp)
    };

    let result = cmd_check_with_env(&opts, EnvSnapshot::empty(), "search", false);
    assert!(matches!(result, Err(CliError::Flag(FlagError::Config(_)))));
}

#[test]
fn test_check_degrades_when_database_locked() {
    let temp = create_temp_dir();
    let opts = redb_options(&temp);
    // Another holder of the redb file keeps it locked for this command.
    let _held = RedbStore::open(&opts.db).unwrap();

    let env = EnvSnapshot::from_pairs([("SEARCH", "yes")]);
    let resolution = cmd_check_with_env(&opts, env, "search", false).unwrap();
    assert!(resolution.value);
    assert_eq!(resolution.tier, Tier::Environment);
    assert!(resolution.degraded);

    let resolution = cmd_check_with_env(&opts, EnvSnapshot::empty(), "search", false).unwrap();
    assert!(resolution.value);
    assert_eq!(resolution.tier, Tier::Default);
    assert!(resolution.degraded);
    assert!(!resolution.written_back);
}

#[test]
fn test_set_and_list_degrade_when_database_locked() {
    let temp = create_temp_dir();
    let opts = redb_options(&temp);
    let _held = RedbStore::open(&opts.db).unwrap();

    assert!(!cmd_set(&opts, "search", true, false).unwrap());
    assert!(cmd_list(&opts, false).unwrap().is_empty());
}

// =============================================================================
// SET / LIST COMMAND TESTS
// =============================================================================

#[test]
fn test_set_then_check() {
    let temp = create_temp_dir();
    let opts = redb_options(&temp);

    assert!(cmd_set(&opts, "search", false, false).unwrap());
    let resolution = cmd_check_with_env(&opts, EnvSnapshot::empty(), "search", false).unwrap();
    assert!(!resolution.value);
    assert_eq!(resolution.tier, Tier::Remote);
}

#[test]
fn test_list_reports_store_contents() {
    let temp = create_temp_dir();
    let opts = StoreOptions {
        namespace: Some("cli".to_string()),
        ..redb_options(&temp)
    };

    assert!(cmd_list(&opts, false).unwrap().is_empty());

    cmd_set(&opts, "one", true, false).unwrap();
    cmd_set(&opts, "two", false, true).unwrap();

    let names: Vec<String> = cmd_list(&opts, true).unwrap().into_iter().collect();
    assert_eq!(names, vec!["one", "two"]);
}

#[test]
fn test_namespaces_are_isolated() {
    let temp = create_temp_dir();
    let left = StoreOptions {
        namespace: Some("left".to_string()),
        ..redb_options(&temp)
    };
    let right = StoreOptions {
        namespace: Some("right".to_string()),
        ..redb_options(&temp)
    };

    cmd_set(&left, "only_left", true, false).unwrap();
    assert!(cmd_list(&right, false).unwrap().is_empty());
}

#[cfg(not(feature = "redis"))]
#[test]
fn test_redis_store_requires_feature() {
    let temp = create_temp_dir();
    let opts = StoreOptions {
        store: StoreKind::Redis,
        ..redb_options(&temp)
    };

    let result = cmd_check_with_env(&opts, EnvSnapshot::empty(), "search", false);
    assert!(matches!(result, Err(CliError::Unsupported(_))));
}
