//! Method-name command surface for host integrations.
//!
//! A host sends a method name plus an argument bundle:
//!
//! | Method        | Arguments        | Response            |
//! |---------------|------------------|---------------------|
//! | `write`       | `key`, `value`   | `Unit`              |
//! | `read`        | `key`            | `Value`             |
//! | `readAll`     |                  | `Map`               |
//! | `containsKey` | `key`            | `Bool`              |
//! | `delete`      | `key`            | `Unit`              |
//! | `deleteAll`   |                  | `Unit`              |
//!
//! Every call may carry an `options` bundle which selects the store
//! configuration (see [`StorageConfig::from_options`]). Stores are cached
//! per configuration by [`SecureStoreRegistry`].

use crate::config::StorageConfig;
use crate::crypto::{InMemoryKeyFacility, KeyFacility};
use crate::error::StoreError;
use crate::facade::{Outcome, SecureStore};
use parking_lot::Mutex;
use securekv_storage::{InMemoryProvider, PreferencesProvider};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// Message a host reports when reset-on-error wiped the store.
pub const RESET_MESSAGE: &str = "Data has been reset";

/// Errors from the command surface.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The method name is not recognized.
    #[error("method not implemented: {method}")]
    NotImplemented {
        /// The unrecognized method.
        method: String,
    },

    /// A required argument is absent.
    #[error("{method}: missing argument '{argument}'")]
    MissingArgument {
        /// The method being parsed.
        method: &'static str,
        /// Name of the missing argument.
        argument: &'static str,
    },

    /// The store operation failed.
    #[error("{method} failed: {source}")]
    OperationFailure {
        /// The method that failed.
        method: &'static str,
        /// The underlying store error.
        source: StoreError,
    },
}

/// Arguments accompanying a method call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    /// Logical key.
    pub key: Option<String>,
    /// Value to write.
    pub value: Option<String>,
    /// Store configuration options.
    pub options: BTreeMap<String, String>,
}

impl CommandArgs {
    /// Creates empty arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the value.
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Adds a configuration option.
    #[must_use]
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

/// A parsed store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a value.
    Write {
        /// Logical key.
        key: String,
        /// Plaintext value.
        value: String,
    },
    /// Read a value.
    Read {
        /// Logical key.
        key: String,
    },
    /// Read every value.
    ReadAll,
    /// Test for a key.
    ContainsKey {
        /// Logical key.
        key: String,
    },
    /// Remove a value.
    Delete {
        /// Logical key.
        key: String,
    },
    /// Remove every value.
    DeleteAll,
}

impl Command {
    /// Parses `method` and its arguments.
    ///
    /// # Errors
    ///
    /// Returns `NotImplemented` for unknown methods and `MissingArgument`
    /// when `key` or, for `write`, `value` is absent.
    pub fn parse(method: &str, args: &CommandArgs) -> Result<Self, CommandError> {
        let key = |method: &'static str| {
            args.key.clone().ok_or(CommandError::MissingArgument {
                method,
                argument: "key",
            })
        };

        match method {
            "write" => {
                let key = key("write")?;
                let value = args.value.clone().ok_or(CommandError::MissingArgument {
                    method: "write",
                    argument: "value",
                })?;
                Ok(Self::Write { key, value })
            }
            "read" => Ok(Self::Read { key: key("read")? }),
            "readAll" => Ok(Self::ReadAll),
            "containsKey" => Ok(Self::ContainsKey {
                key: key("containsKey")?,
            }),
            "delete" => Ok(Self::Delete { key: key("delete")? }),
            "deleteAll" => Ok(Self::DeleteAll),
            other => Err(CommandError::NotImplemented {
                method: other.to_string(),
            }),
        }
    }

    /// Returns the host method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Write { .. } => "write",
            Self::Read { .. } => "read",
            Self::ReadAll => "readAll",
            Self::ContainsKey { .. } => "containsKey",
            Self::Delete { .. } => "delete",
            Self::DeleteAll => "deleteAll",
        }
    }

    /// Runs the command against `store`.
    ///
    /// # Errors
    ///
    /// Wraps store failures in `OperationFailure`.
    pub fn execute(&self, store: &SecureStore) -> Result<CommandResponse, CommandError> {
        let response = match self {
            Self::Write { key, value } => store
                .write(key, value)
                .map(|o| o.map(|()| CommandResponse::Unit)),
            Self::Read { key } => store.read(key).map(|o| o.map(CommandResponse::Value)),
            Self::ReadAll => store.read_all().map(|o| o.map(CommandResponse::Map)),
            Self::ContainsKey { key } => store
                .contains_key(key)
                .map(|o| o.map(CommandResponse::Bool)),
            Self::Delete { key } => store.delete(key).map(|o| o.map(|()| CommandResponse::Unit)),
            Self::DeleteAll => store.delete_all().map(|o| o.map(|()| CommandResponse::Unit)),
        };

        match response {
            Ok(Outcome::Value(response)) => Ok(response),
            Ok(Outcome::Reset) => Ok(CommandResponse::Reset),
            Err(source) => Err(CommandError::OperationFailure {
                method: self.method(),
                source,
            }),
        }
    }
}

/// Result shapes returned to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse {
    /// Success with no payload.
    Unit,
    /// A value, or none if the key is absent.
    Value(Option<String>),
    /// Every readable entry.
    Map(BTreeMap<String, String>),
    /// A membership answer.
    Bool(bool),
    /// Reset-on-error wiped the store; reported as [`RESET_MESSAGE`].
    Reset,
}

/// Dispatches commands to one [`SecureStore`] engine per store identity.
///
/// The identity is the current store name, the legacy store name and the
/// key prefix. `resetOnError` is applied per call on a view over the shared
/// engine, so calls that differ only in that flag never initialize or
/// migrate the same data twice.
pub struct SecureStoreRegistry {
    provider: Arc<dyn PreferencesProvider>,
    facility: Arc<dyn KeyFacility>,
    stores: Mutex<HashMap<StoreIdentity, SecureStore>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StoreIdentity {
    store_name: String,
    legacy_store_name: String,
    key_prefix: String,
}

impl From<&StorageConfig> for StoreIdentity {
    fn from(config: &StorageConfig) -> Self {
        Self {
            store_name: config.store_name.clone(),
            legacy_store_name: config.legacy_store_name.clone(),
            key_prefix: config.key_prefix.clone(),
        }
    }
}

impl SecureStoreRegistry {
    /// Creates a registry whose stores share `provider` and `facility`.
    pub fn new(provider: Arc<dyn PreferencesProvider>, facility: Arc<dyn KeyFacility>) -> Self {
        Self {
            provider,
            facility,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a registry over in-memory storage and keys.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryProvider::new()),
            Arc::new(InMemoryKeyFacility::new()),
        )
    }

    /// Returns a view of the store for `config`, creating the engine on
    /// first use. The view carries `config.reset_on_error`.
    pub fn store_for(&self, config: &StorageConfig) -> SecureStore {
        let mut stores = self.stores.lock();
        let store = stores.entry(StoreIdentity::from(config)).or_insert_with(|| {
            tracing::debug!(
                store = %config.store_name,
                prefix = %config.key_prefix,
                "creating store"
            );
            SecureStore::new(
                config.clone(),
                Arc::clone(&self.provider),
                Arc::clone(&self.facility),
            )
        });
        store.with_reset_on_error(config.reset_on_error)
    }

    /// Parses and runs one host call.
    ///
    /// # Errors
    ///
    /// See [`Command::parse`] and [`Command::execute`].
    pub fn execute(
        &self,
        method: &str,
        args: &CommandArgs,
    ) -> Result<CommandResponse, CommandError> {
        let command = Command::parse(method, args)?;
        let store = self.store_for(&StorageConfig::from_options(&args.options));
        command.execute(&store).inspect_err(|e| {
            tracing::error!(method, error = %e, "command failed");
        })
    }
}

impl std::fmt::Debug for SecureStoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureStoreRegistry")
            .field("stores", &self.stores.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OPTION_KEY_PREFIX, OPTION_RESET_ON_ERROR};

    #[test]
    fn parse_known_methods() {
        let args = CommandArgs::new().key("k").value("v");
        assert_eq!(
            Command::parse("write", &args).unwrap(),
            Command::Write {
                key: "k".into(),
                value: "v".into()
            }
        );
        assert_eq!(Command::parse("readAll", &args).unwrap(), Command::ReadAll);
        assert_eq!(
            Command::parse("containsKey", &args).unwrap().method(),
            "containsKey"
        );
    }

    #[test]
    fn write_without_value_is_rejected() {
        let err = Command::parse("write", &CommandArgs::new().key("k")).unwrap_err();
        assert!(matches!(
            err,
            CommandError::MissingArgument {
                method: "write",
                argument: "value"
            }
        ));
    }

    #[test]
    fn read_without_key_is_rejected() {
        let err = Command::parse("read", &CommandArgs::new()).unwrap_err();
        assert!(matches!(err, CommandError::MissingArgument { argument: "key", .. }));
    }

    #[test]
    fn unknown_method() {
        let err = Command::parse("explode", &CommandArgs::new()).unwrap_err();
        assert_eq!(err.to_string(), "method not implemented: explode");
    }

    #[test]
    fn registry_round_trip() {
        let registry = SecureStoreRegistry::in_memory();
        let args = CommandArgs::new().key("token").value("abc123");
        assert_eq!(registry.execute("write", &args).unwrap(), CommandResponse::Unit);
        assert_eq!(
            registry.execute("read", &args).unwrap(),
            CommandResponse::Value(Some("abc123".into()))
        );
        assert_eq!(
            registry.execute("containsKey", &args).unwrap(),
            CommandResponse::Bool(true)
        );
        registry.execute("deleteAll", &args).unwrap();
        assert_eq!(
            registry.execute("readAll", &args).unwrap(),
            CommandResponse::Map(BTreeMap::new())
        );
    }

    #[test]
    fn options_select_store() {
        let registry = SecureStoreRegistry::in_memory();
        let a = CommandArgs::new().key("k").value("a").option(OPTION_KEY_PREFIX, "A");
        let b = CommandArgs::new().key("k").value("b").option(OPTION_KEY_PREFIX, "B");
        registry.execute("write", &a).unwrap();
        registry.execute("write", &b).unwrap();

        assert_eq!(
            registry.execute("read", &a).unwrap(),
            CommandResponse::Value(Some("a".into()))
        );
        assert_eq!(
            registry.execute("read", &b).unwrap(),
            CommandResponse::Value(Some("b".into()))
        );

        let same = registry.store_for(&StorageConfig::from_options(&a.options));
        let again = registry.store_for(&StorageConfig::from_options(&a.options));
        let other = registry.store_for(&StorageConfig::from_options(&b.options));
        assert!(same.shares_engine_with(&again));
        assert!(!same.shares_engine_with(&other));
    }

    #[test]
    fn reset_flag_does_not_split_store() {
        let registry = SecureStoreRegistry::in_memory();
        let plain = registry.store_for(&StorageConfig::new());
        let resetting = registry.store_for(&StorageConfig::new().reset_on_error(true));
        assert!(plain.shares_engine_with(&resetting));
        assert!(!plain.config().reset_on_error);
        assert!(resetting.config().reset_on_error);

        plain.initialize().unwrap();
        assert_eq!(resetting.state(), crate::store::StoreState::Ready);
    }

    #[test]
    fn reset_option_is_parsed() {
        let args = CommandArgs::new().option(OPTION_RESET_ON_ERROR, "true");
        let registry = SecureStoreRegistry::in_memory();
        let store = registry.store_for(&StorageConfig::from_options(&args.options));
        assert!(store.config().reset_on_error);
    }
}
