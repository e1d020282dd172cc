//! Foreign-language entry point for `securestore-core`.
//!
//! Builds the static and dynamic libraries that Kotlin and Swift bindings
//! load, and re-exports the core crate for Rust consumers.

securestore_core::uniffi_reexport_scaffolding!();

pub use securestore_core::*;
