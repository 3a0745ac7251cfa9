//! # securekv storage
//!
//! Persisted-preferences backends for securekv.
//!
//! This crate provides the lowest-level storage abstraction: a named,
//! ordered, string-keyed map. Backends are **opaque** - they never see
//! plaintext, only the already-encrypted envelopes written by
//! `securekv_core`.
//!
//! ## Design Principles
//!
//! - Backends are simple maps (get, put, remove, clear, enumerate)
//! - No knowledge of namespacing prefixes, ciphers or envelopes
//! - Must be `Send + Sync` for concurrent access
//! - No transactions across keys
//!
//! ## Available Backends
//!
//! - [`InMemoryPreferences`] / [`InMemoryProvider`] - For testing and ephemeral storage
//! - [`FilePreferences`] / [`FileProvider`] - One JSON document per store
//!
//! ## Example
//!
//! ```rust
//! use securekv_storage::{InMemoryProvider, PreferencesProvider};
//!
//! let provider = InMemoryProvider::new();
//! let prefs = provider.open("app").unwrap();
//! prefs.put("greeting", "hello").unwrap();
//! assert!(prefs.contains("greeting").unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{PreferencesBackend, PreferencesProvider};
pub use error::{StorageError, StorageResult};
pub use file::{FilePreferences, FileProvider};
pub use memory::{InMemoryPreferences, InMemoryProvider};
