//! Non-primary-key restriction collector.
//!
//! Regular and static column restrictions never narrow key ranges; they feed
//! index selection and, past that, row-by-row filtering.

use crate::{
    error::InvalidRequestError,
    expr::{Atom, Operator},
};
use std::collections::BTreeMap;

///
/// SingleColumnRestrictions
///
/// Per-column atom lists, keyed by column name in deterministic order.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct SingleColumnRestrictions {
    atoms: BTreeMap<String, Vec<Atom>>,
}

impl SingleColumnRestrictions {
    /// Merge one atom, rejecting combinations that can never hold together.
    pub(crate) fn add(&mut self, column: &str, atom: Atom) -> Result<(), InvalidRequestError> {
        let slot = self.atoms.entry(column.to_string()).or_default();

        let has_point = slot
            .iter()
            .any(|existing| matches!(existing.op, Operator::Eq | Operator::In));
        if has_point || (matches!(atom.op, Operator::Eq | Operator::In) && !slot.is_empty()) {
            return Err(InvalidRequestError::ConflictingEquality {
                column: column.to_string(),
            });
        }

        slot.push(atom);

        Ok(())
    }

    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    #[must_use]
    pub(crate) fn is_restricted(&self, column: &str) -> bool {
        self.atoms.contains_key(column)
    }

    /// Restricted column names in deterministic order.
    pub(crate) fn columns(&self) -> impl Iterator<Item = &str> {
        self.atoms.keys().map(String::as_str)
    }

    /// Every collected atom, column-ordered.
    pub(crate) fn iter_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.values().flatten()
    }

    #[must_use]
    pub(crate) fn has_eq_on(&self, column: &str) -> bool {
        self.atoms
            .get(column)
            .is_some_and(|atoms| atoms.iter().any(|atom| atom.op == Operator::Eq))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Operand;

    #[test]
    fn slices_on_both_sides_accumulate() {
        let mut set = SingleColumnRestrictions::default();
        set.add("score", Atom::slice("score", Operator::Gt, Operand::int(1)))
            .expect("lower");
        set.add("score", Atom::slice("score", Operator::Lt, Operand::int(9)))
            .expect("upper");

        assert!(set.is_restricted("score"));
        assert_eq!(set.iter_atoms().count(), 2);
    }

    #[test]
    fn second_equality_conflicts() {
        let mut set = SingleColumnRestrictions::default();
        set.add("score", Atom::eq("score", Operand::int(1)))
            .expect("first");
        let err = set
            .add("score", Atom::eq("score", Operand::int(2)))
            .unwrap_err();

        assert_eq!(
            err,
            InvalidRequestError::ConflictingEquality {
                column: "score".into()
            }
        );
    }

    #[test]
    fn equality_after_slice_conflicts() {
        let mut set = SingleColumnRestrictions::default();
        set.add("score", Atom::slice("score", Operator::Gt, Operand::int(1)))
            .expect("slice");
        assert!(set.add("score", Atom::eq("score", Operand::int(2))).is_err());
    }
}
