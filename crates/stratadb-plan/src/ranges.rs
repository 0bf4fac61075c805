//! Concrete range shapes handed to storage, plus interval helpers.
//!
//! Ranges are semantic: endpoints are value sequences ordered by the
//! canonical comparator, which agrees with key byte order. A clustering
//! bound whose prefix is shorter than the full clustering key denotes the
//! whole block of rows sharing that prefix.

use crate::{
    error::InvalidRequestError,
    token::Token,
    value::{Value, canonical_cmp_seq},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::Bound;

///
/// PartitionRange
///
/// One partition-level scan target: either a single partition addressed by
/// its full key (with the token precomputed for placement), or an interval
/// over hash space. The full domain is the unbounded token interval.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PartitionRange {
    SingleKey { key: Vec<Value>, token: Token },
    TokenInterval {
        lower: Bound<Token>,
        upper: Bound<Token>,
    },
}

impl PartitionRange {
    /// The whole hash domain.
    #[must_use]
    pub const fn full() -> Self {
        Self::TokenInterval {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    #[must_use]
    pub const fn is_single_key(&self) -> bool {
        matches!(self, Self::SingleKey { .. })
    }
}

///
/// ClusteringRange
///
/// One interval over clustering prefixes within a partition. A range whose
/// two bounds are the same inclusive prefix denotes every row under that
/// prefix; the unbounded range denotes the whole partition.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClusteringRange {
    pub lower: Bound<Vec<Value>>,
    pub upper: Bound<Vec<Value>>,
}

impl ClusteringRange {
    #[must_use]
    pub const fn new(lower: Bound<Vec<Value>>, upper: Bound<Vec<Value>>) -> Self {
        Self { lower, upper }
    }

    /// The whole partition.
    #[must_use]
    pub const fn full() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// Every row sharing `prefix`.
    #[must_use]
    pub fn whole_prefix(prefix: Vec<Value>) -> Self {
        Self::new(Bound::Included(prefix.clone()), Bound::Included(prefix))
    }

    #[must_use]
    pub const fn is_full(&self) -> bool {
        matches!(
            (&self.lower, &self.upper),
            (Bound::Unbounded, Bound::Unbounded)
        )
    }

    /// The bound prefix values, lower then upper, where bounded.
    pub fn bound_values(&self) -> impl Iterator<Item = &Vec<Value>> {
        [&self.lower, &self.upper].into_iter().filter_map(|bound| {
            match bound {
                Bound::Included(prefix) | Bound::Excluded(prefix) => Some(prefix),
                Bound::Unbounded => None,
            }
        })
    }

    /// Drop the leading `count` components from both bounds.
    ///
    /// Used to project index-table coordinates back onto base-table
    /// clustering columns.
    #[must_use]
    pub fn strip_prefix(&self, count: usize) -> Self {
        let strip = |bound: &Bound<Vec<Value>>| match bound {
            Bound::Included(prefix) => {
                Bound::Included(prefix.iter().skip(count).cloned().collect())
            }
            Bound::Excluded(prefix) => {
                Bound::Excluded(prefix.iter().skip(count).cloned().collect())
            }
            Bound::Unbounded => Bound::Unbounded,
        };

        Self::new(strip(&self.lower), strip(&self.upper))
    }
}

/// True when a bounded interval cannot contain anything under `cmp`.
///
/// `(a, a]`, `[a, a)` and `(a, a)` are empty; `[a, a]` is the point. Ranges
/// with an unbounded side are never empty.
pub(crate) fn interval_is_empty<T>(
    lower: &Bound<T>,
    upper: &Bound<T>,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> bool {
    let (lo, lo_inclusive) = match lower {
        Bound::Included(v) => (v, true),
        Bound::Excluded(v) => (v, false),
        Bound::Unbounded => return false,
    };
    let (hi, hi_inclusive) = match upper {
        Bound::Included(v) => (v, true),
        Bound::Excluded(v) => (v, false),
        Bound::Unbounded => return false,
    };

    match cmp(lo, hi) {
        Ordering::Greater => true,
        Ordering::Equal => !(lo_inclusive && hi_inclusive),
        Ordering::Less => false,
    }
}

/// True when a prefix-semantics interval cannot contain anything.
///
/// Bounds are prefix sequences: an inclusive bound covers the whole block of
/// rows sharing the prefix, an exclusive one stops right outside it. When
/// one bound is a strict prefix of the other, the longer bound lies inside
/// the shorter one's block, so only the shorter bound's inclusivity decides.
pub(crate) fn prefix_interval_is_empty(
    lower: &[Value],
    lower_inclusive: bool,
    upper: &[Value],
    upper_inclusive: bool,
) -> bool {
    if lower.len() < upper.len() && upper.starts_with(lower) {
        return !lower_inclusive;
    }
    if upper.len() < lower.len() && lower.starts_with(upper) {
        return !upper_inclusive;
    }

    match canonical_cmp_seq(lower, upper) {
        Ordering::Greater => true,
        Ordering::Equal => !(lower_inclusive && upper_inclusive),
        Ordering::Less => false,
    }
}

/// Enumerate the Cartesian product of per-position value lists, bounded by
/// `max` combinations. Output order follows input list order.
pub(crate) fn cartesian(
    lists: &[Vec<Value>],
    max: usize,
) -> Result<Vec<Vec<Value>>, InvalidRequestError> {
    let mut size: usize = 1;
    for list in lists {
        size = size.checked_mul(list.len()).ok_or(
            InvalidRequestError::KeyCartesianTooLarge {
                size: usize::MAX,
                max,
            },
        )?;
    }
    if size > max {
        return Err(InvalidRequestError::KeyCartesianTooLarge { size, max });
    }

    let mut combos: Vec<Vec<Value>> = vec![Vec::with_capacity(lists.len())];
    for list in lists {
        let mut next = Vec::with_capacity(combos.len() * list.len());
        for combo in &combos {
            for value in list {
                let mut extended = combo.clone();
                extended.push(value.clone());
                next.push(extended);
            }
        }
        combos = next;
    }

    Ok(combos)
}

/// Sort prefix combinations into canonical key order and drop duplicates.
pub(crate) fn sort_dedup_combos(combos: &mut Vec<Vec<Value>>) {
    combos.sort_by(|a, b| canonical_cmp_seq(a, b));
    combos.dedup();
}

///
/// TESTS
///
