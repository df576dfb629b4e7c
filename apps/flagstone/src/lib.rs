//! # Flagstone Library
//!
//! This library exposes the Flagstone CLI commands for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod cli;

// Re-export flagstone_core for convenience
pub use flagstone_core;
