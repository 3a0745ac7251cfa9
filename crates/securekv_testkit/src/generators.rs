//! Property-based test generators using proptest.
//!
//! Provides strategies for generating keys, values and operation sequences
//! for the cipher and store properties.

use proptest::prelude::*;
use securekv_core::crypto::{SymmetricKey, KEY_SIZE};

/// Strategy for generating master keys.
pub fn symmetric_key_strategy() -> impl Strategy<Value = SymmetricKey> {
    prop::collection::vec(any::<u8>(), KEY_SIZE)
        .prop_map(|bytes| SymmetricKey::from_bytes(&bytes).expect("32-byte key"))
}

/// Strategy for generating arbitrary UTF-8 values.
pub fn value_strategy() -> impl Strategy<Value = String> {
    ".{0,256}"
}

/// Strategy for generating logical keys.
pub fn logical_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_.-]{1,24}").expect("Invalid regex")
}

/// Strategy for generating key prefixes without the separator.
pub fn prefix_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9]{1,16}").expect("Invalid regex")
}

/// Operations for store model tests.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Write a value.
    Write {
        /// Logical key.
        key: String,
        /// Value.
        value: String,
    },
    /// Read a value.
    Read {
        /// Logical key.
        key: String,
    },
    /// Delete a value.
    Delete {
        /// Logical key.
        key: String,
    },
    /// Delete every value.
    DeleteAll,
}

/// Strategy for generating store operations over a small key space.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    let key = prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(String::from);
    prop_oneof![
        4 => (key.clone(), value_strategy())
            .prop_map(|(key, value)| StoreOperation::Write { key, value }),
        3 => key.clone().prop_map(|key| StoreOperation::Read { key }),
        2 => key.prop_map(|key| StoreOperation::Delete { key }),
        1 => Just(StoreOperation::DeleteAll),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
