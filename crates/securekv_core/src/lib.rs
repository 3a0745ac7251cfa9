//! # securekv core
//!
//! Encrypted key-value store with cipher-version migration.
//!
//! This crate provides:
//! - Master key management over a protected key facility
//! - Versioned value ciphers (AES-256-GCM current, AES-256-CBC legacy)
//! - Per-value cipher metadata so existing data picks its own cipher
//! - Lazy, at-most-once migration of legacy entries into the current backend
//! - A namespaced CRUD façade with opt-in reset-on-error
//! - A method-name command surface for host integrations
//!
//! ## Usage
//!
//! ```
//! use securekv_core::{Outcome, SecureStore, StorageConfig};
//!
//! let store = SecureStore::in_memory(StorageConfig::new().key_prefix("app"));
//! store.write("token", "abc123").unwrap();
//!
//! assert_eq!(
//!     store.read("token").unwrap(),
//!     Outcome::Value(Some("abc123".to_string()))
//! );
//! assert_eq!(store.contains_key("missing").unwrap(), Outcome::Value(false));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod config;
pub mod crypto;
mod encrypted;
mod error;
mod facade;
mod migration;
mod namespace;
mod store;

pub use command::{
    Command, CommandArgs, CommandError, CommandResponse, SecureStoreRegistry, RESET_MESSAGE,
};
pub use config::{
    StorageConfig, DEFAULT_KEY_PREFIX, DEFAULT_LEGACY_STORE_NAME, DEFAULT_STORE_NAME,
    OPTION_KEY_PREFIX, OPTION_RESET_ON_ERROR, OPTION_STORE_NAME,
};
pub use encrypted::{EncryptedPreferences, KEY_CHECK_KEY};
pub use error::{CipherError, CipherResult, StoreError, StoreResult};
pub use facade::{Outcome, SecureStore};
pub use migration::{MigrationFailure, MigrationReport, Migrator};
pub use namespace::KeyPrefixCodec;
pub use store::{MigratingEncryptedStore, StoreState};
