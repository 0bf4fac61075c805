//! Hash coordinate ("token") and the partitioner.
//!
//! A token is the hash-space position of one partition key. Token order, not
//! key order, is the physical order of partitions; range scans across
//! partitions are intervals over tokens.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Stable seed for token hashing; part of the on-disk placement contract.
const TOKEN_SEED: u64 = 0;

///
/// Token
///

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct Token(pub i64);

impl Token {
    pub const MIN: Self = Self(i64::MIN);
    pub const MAX: Self = Self(i64::MAX);

    /// Render this token as a key-component value for index-table
    /// coordinates (the leading clustering component of a global index row).
    #[must_use]
    pub const fn as_value(self) -> Value {
        Value::Int(self.0)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash one composed partition key into its token.
///
/// Components are canonically encoded with per-component framing, so keys
/// with shifted component boundaries cannot collide structurally.
#[must_use]
pub fn token_of(key_components: &[Value]) -> Token {
    let mut bytes = Vec::new();
    for component in key_components {
        let encoded = component.encode_canonical();
        bytes.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&encoded);
    }

    Token(xxh3_64_with_seed(&bytes, TOKEN_SEED) as i64)
}

///
/// TESTS
///
