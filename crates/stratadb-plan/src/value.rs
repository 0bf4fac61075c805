//! Semantic literal values and their canonical ordering/encoding.
//!
//! Planning compares and encodes values; it never coerces them. Mixed-variant
//! comparisons are rank-only and must remain deterministic.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Value
///
/// Tagged semantic literal produced by the expression evaluator. `List` is
/// the resolved shape of IN operands; `Tuple` is the resolved shape of
/// multi-column operands.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    Uuid(u128),
    List(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    /// Canonical variant rank; the first ordering criterion across variants.
    #[must_use]
    pub const fn canonical_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Text(_) => 3,
            Self::Bytes(_) => 4,
            Self::Uuid(_) => 5,
            Self::List(_) => 6,
            Self::Tuple(_) => 7,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Canonical byte encoding of one key component.
    ///
    /// The encoding is order-preserving within a variant: comparing encoded
    /// components bytewise agrees with `canonical_cmp`. Integers are
    /// sign-flipped big-endian; variable-length payloads carry a big-endian
    /// length prefix so composite keys cannot alias across components.
    #[must_use]
    pub fn encode_canonical(&self) -> Vec<u8> {
        let mut out = vec![self.canonical_rank()];
        match self {
            Self::Null => {}
            Self::Bool(b) => out.push(u8::from(*b)),
            Self::Int(i) => {
                // Flip the sign bit so byte order matches numeric order.
                out.extend_from_slice(&(*i as u64 ^ (1 << 63)).to_be_bytes());
            }
            Self::Text(s) => {
                out.extend_from_slice(&(s.len() as u32).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Self::Bytes(b) => {
                out.extend_from_slice(&(b.len() as u32).to_be_bytes());
                out.extend_from_slice(b);
            }
            Self::Uuid(u) => out.extend_from_slice(&u.to_be_bytes()),
            Self::List(items) | Self::Tuple(items) => {
                out.extend_from_slice(&(items.len() as u32).to_be_bytes());
                for item in items {
                    let encoded = item.encode_canonical();
                    out.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
                    out.extend_from_slice(&encoded);
                }
            }
        }

        out
    }
}

/// Total canonical comparator used by all planning surfaces.
///
/// Ordering rules:
/// 1. Canonical variant rank
/// 2. Variant-specific comparison for same-ranked values
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = left.canonical_rank().cmp(&right.canonical_rank());
    if rank != Ordering::Equal {
        return rank;
    }

    canonical_cmp_same_rank(left, right)
}

/// Strict comparator for identical orderable variants.
///
/// Returns `None` for mismatched or non-orderable variants.
#[must_use]
pub fn strict_order_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn canonical_cmp_same_rank(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
            canonical_cmp_seq(a, b)
        }
        _ => strict_order_cmp(left, right).unwrap_or(Ordering::Equal),
    }
}

/// Lexicographic canonical comparison over value sequences (prefix-ordered).
#[must_use]
pub fn canonical_cmp_seq(left: &[Value], right: &[Value]) -> Ordering {
    for (a, b) in left.iter().zip(right.iter()) {
        let ord = canonical_cmp(a, b);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len())
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_cmp_orders_within_variant() {
        assert_eq!(
            canonical_cmp(&Value::Int(-5), &Value::Int(3)),
            Ordering::Less
        );
        assert_eq!(
            canonical_cmp(&Value::Text("a".into()), &Value::Text("b".into())),
            Ordering::Less
        );
    }

    #[test]
    fn canonical_cmp_is_rank_only_across_variants() {
        assert_eq!(
            canonical_cmp(&Value::Bool(true), &Value::Int(i64::MIN)),
            Ordering::Less
        );
    }

    #[test]
    fn encoded_int_order_matches_numeric_order() {
        let values = [i64::MIN, -7, -1, 0, 1, 42, i64::MAX];
        for pair in values.windows(2) {
            let a = Value::Int(pair[0]).encode_canonical();
            let b = Value::Int(pair[1]).encode_canonical();
            assert!(a < b, "encoding must preserve order for {pair:?}");
        }
    }

    #[test]
    fn encoded_components_do_not_alias() {
        // ("ab", "c") and ("a", "bc") must encode differently.
        let left = Value::Tuple(vec![Value::Text("ab".into()), Value::Text("c".into())]);
        let right = Value::Tuple(vec![Value::Text("a".into()), Value::Text("bc".into())]);
        assert_ne!(left.encode_canonical(), right.encode_canonical());
    }

    #[test]
    fn seq_cmp_orders_prefixes_first() {
        let short = [Value::Int(1)];
        let long = [Value::Int(1), Value::Int(2)];
        assert_eq!(canonical_cmp_seq(&short, &long), Ordering::Less);
    }
}
