//! Partition-key restriction builder.
//!
//! The partition key is either addressed explicitly (EQ/IN per column, an
//! enumerable key list) or by a token interval over hash space; the two
//! forms cannot be combined without filtering, so mixing them is rejected
//! outright. Inequalities on individual partition columns cannot narrow
//! placement and are kept as filtering residue.

use crate::{
    error::{BoundName, InvalidRequestError},
    expr::{Atom, Operand, Operator},
    schema::ColumnDef,
};

/// Display name used in messages about the partition-key token.
pub(crate) const TOKEN_LHS: &str = "token(pk)";

///
/// ColumnValues
/// Explicit restriction on one partition-key position.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum ColumnValues {
    Eq(Operand),
    In(Operand),
}

///
/// TokenSlice
/// Token restriction: a point or a (possibly half-open) interval.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct TokenSlice {
    pub eq: Option<Operand>,
    pub lower: Option<(Operand, bool)>,
    pub upper: Option<(Operand, bool)>,
}

///
/// PartitionMode
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum PartitionMode {
    Empty,
    Columns(Vec<Option<ColumnValues>>),
    Token(TokenSlice),
}

///
/// PartitionRestrictions
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct PartitionRestrictions {
    pub mode: PartitionMode,
    /// Single-column partition atoms only filtering can serve.
    pub residue: Vec<Atom>,
}

impl PartitionRestrictions {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            mode: PartitionMode::Empty,
            residue: Vec::new(),
        }
    }

    /// Merge one single-column atom on a partition-key column.
    pub(crate) fn add_column_atom(
        &mut self,
        pk_len: usize,
        column: &ColumnDef,
        atom: Atom,
    ) -> Result<(), InvalidRequestError> {
        if matches!(self.mode, PartitionMode::Token(_)) {
            return Err(InvalidRequestError::TokenAndColumnMix {
                column: column.name.clone(),
            });
        }

        match atom.op {
            Operator::Eq | Operator::In => {
                let slots = match &mut self.mode {
                    PartitionMode::Columns(slots) => slots,
                    mode => {
                        *mode = PartitionMode::Columns(vec![None; pk_len]);
                        match mode {
                            PartitionMode::Columns(slots) => slots,
                            _ => unreachable!("mode was just set to Columns"),
                        }
                    }
                };

                let slot = &mut slots[column.position];
                if slot.is_some() {
                    return Err(InvalidRequestError::ConflictingEquality {
                        column: column.name.clone(),
                    });
                }
                *slot = Some(match atom.op {
                    Operator::Eq => ColumnValues::Eq(atom.rhs),
                    _ => ColumnValues::In(atom.rhs),
                });

                Ok(())
            }
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte | Operator::Like => {
                // Cannot narrow placement; row-level filtering only.
                self.residue.push(atom);

                Ok(())
            }
            Operator::Contains | Operator::ContainsKey | Operator::IsNotNull => {
                Err(InvalidRequestError::UnsupportedOperator {
                    column: column.name.clone(),
                    op: atom.op,
                })
            }
        }
    }

    /// Merge one token atom.
    pub(crate) fn add_token_atom(&mut self, atom: Atom) -> Result<(), InvalidRequestError> {
        match &self.mode {
            PartitionMode::Columns(slots) => {
                let column = slots
                    .iter()
                    .position(Option::is_some)
                    .map_or_else(|| TOKEN_LHS.to_string(), |pos| format!("position {pos}"));
                return Err(InvalidRequestError::TokenAndColumnMix { column });
            }
            PartitionMode::Empty if !self.residue.is_empty() => {
                let column = self.residue[0]
                    .single_column()
                    .unwrap_or(TOKEN_LHS)
                    .to_string();
                return Err(InvalidRequestError::TokenAndColumnMix { column });
            }
            _ => {}
        }

        let slice = match &mut self.mode {
            PartitionMode::Token(slice) => slice,
            mode => {
                *mode = PartitionMode::Token(TokenSlice::default());
                match mode {
                    PartitionMode::Token(slice) => slice,
                    _ => unreachable!("mode was just set to Token"),
                }
            }
        };

        let conflict_with_eq =
            slice.eq.is_some() || (atom.op == Operator::Eq && (slice.lower.is_some() || slice.upper.is_some()));
        if conflict_with_eq {
            return Err(InvalidRequestError::ConflictingEquality {
                column: TOKEN_LHS.to_string(),
            });
        }

        match atom.op {
            Operator::Eq => slice.eq = Some(atom.rhs),
            Operator::Gt | Operator::Gte => {
                if slice.lower.is_some() {
                    return Err(InvalidRequestError::DuplicateBound {
                        column: TOKEN_LHS.to_string(),
                        bound: BoundName::Start,
                    });
                }
                slice.lower = Some((atom.rhs, atom.op.is_inclusive()));
            }
            Operator::Lt | Operator::Lte => {
                if slice.upper.is_some() {
                    return Err(InvalidRequestError::DuplicateBound {
                        column: TOKEN_LHS.to_string(),
                        bound: BoundName::End,
                    });
                }
                slice.upper = Some((atom.rhs, atom.op.is_inclusive()));
            }
            _ => {
                return Err(InvalidRequestError::UnsupportedOperator {
                    column: TOKEN_LHS.to_string(),
                    op: atom.op,
                });
            }
        }

        Ok(())
    }

    #[must_use]
    pub(crate) const fn has_token(&self) -> bool {
        matches!(self.mode, PartitionMode::Token(_))
    }

    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self.mode, PartitionMode::Empty) && self.residue.is_empty()
    }

    /// Whether every partition-key position carries an explicit EQ/IN value.
    #[must_use]
    pub(crate) fn explicit_complete(&self) -> bool {
        match &self.mode {
            PartitionMode::Columns(slots) => slots.iter().all(Option::is_some),
            PartitionMode::Empty | PartitionMode::Token(_) => false,
        }
    }

    /// Whether some per-column component of the partition key is
    /// unrestricted. Token restrictions leave every component unrestricted.
    #[must_use]
    pub(crate) fn has_unrestricted_components(&self) -> bool {
        !self.explicit_complete()
    }

    #[must_use]
    pub(crate) fn key_is_in_relation(&self) -> bool {
        match &self.mode {
            PartitionMode::Columns(slots) => slots
                .iter()
                .flatten()
                .any(|values| matches!(values, ColumnValues::In(_))),
            PartitionMode::Empty | PartitionMode::Token(_) => false,
        }
    }

    /// Whether every present restriction is a plain EQ (vacuously true when
    /// empty; false for token and IN forms and for filtering residue).
    #[must_use]
    pub(crate) fn is_all_eq(&self) -> bool {
        if !self.residue.is_empty() {
            return false;
        }
        match &self.mode {
            PartitionMode::Empty => true,
            PartitionMode::Columns(slots) => slots
                .iter()
                .flatten()
                .all(|values| matches!(values, ColumnValues::Eq(_))),
            PartitionMode::Token(_) => false,
        }
    }

    /// Number of restricted partition-key columns (token counts none).
    #[must_use]
    pub(crate) fn restricted_len(&self) -> usize {
        let explicit = match &self.mode {
            PartitionMode::Columns(slots) => slots.iter().flatten().count(),
            PartitionMode::Empty | PartitionMode::Token(_) => 0,
        };

        explicit + self.residue.len()
    }

    /// Position of the first partition column with no explicit value.
    #[must_use]
    pub(crate) fn first_unrestricted_position(&self, pk_len: usize) -> Option<usize> {
        match &self.mode {
            PartitionMode::Columns(slots) => slots.iter().position(Option::is_none),
            PartitionMode::Empty | PartitionMode::Token(_) => (pk_len > 0).then_some(0),
        }
    }

    #[must_use]
    pub(crate) fn is_position_restricted(&self, position: usize) -> bool {
        match &self.mode {
            PartitionMode::Columns(slots) => {
                slots.get(position).is_some_and(Option::is_some)
            }
            PartitionMode::Empty | PartitionMode::Token(_) => false,
        }
    }

    #[must_use]
    pub(crate) fn has_eq_at(&self, position: usize) -> bool {
        match &self.mode {
            PartitionMode::Columns(slots) => matches!(
                slots.get(position),
                Some(Some(ColumnValues::Eq(_)))
            ),
            PartitionMode::Empty | PartitionMode::Token(_) => false,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnKind, ColumnType};

    fn pk_column(name: &str, position: usize) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            kind: ColumnKind::PartitionKey,
            position,
            ty: ColumnType::Int,
        }
    }

    #[test]
    fn complete_eq_is_not_a_key_range() {
        let mut set = PartitionRestrictions::new();
        set.add_column_atom(2, &pk_column("p1", 0), Atom::eq("p1", Operand::int(1)))
            .expect("p1");
        set.add_column_atom(2, &pk_column("p2", 1), Atom::eq("p2", Operand::int(2)))
            .expect("p2");

        assert!(set.explicit_complete());
        assert!(set.is_all_eq());
        assert!(!set.has_unrestricted_components());
    }

    #[test]
    fn second_relation_on_same_column_conflicts() {
        let mut set = PartitionRestrictions::new();
        let col = pk_column("p1", 0);
        set.add_column_atom(1, &col, Atom::eq("p1", Operand::int(1)))
            .expect("first");
        let err = set
            .add_column_atom(1, &col, Atom::in_list("p1", vec![Operand::int(2)]))
            .unwrap_err();

        assert_eq!(
            err,
            InvalidRequestError::ConflictingEquality { column: "p1".into() }
        );
    }

    #[test]
    fn token_after_column_restriction_is_rejected() {
        let mut set = PartitionRestrictions::new();
        set.add_column_atom(2, &pk_column("p1", 0), Atom::eq("p1", Operand::int(1)))
            .expect("p1");
        let err = set
            .add_token_atom(Atom::token(Operator::Gt, Operand::int(5)))
            .unwrap_err();

        assert!(matches!(err, InvalidRequestError::TokenAndColumnMix { .. }));
    }

    #[test]
    fn column_after_token_restriction_is_rejected() {
        let mut set = PartitionRestrictions::new();
        set.add_token_atom(Atom::token(Operator::Gt, Operand::int(5)))
            .expect("token");
        let err = set
            .add_column_atom(2, &pk_column("p1", 0), Atom::eq("p1", Operand::int(1)))
            .unwrap_err();

        assert_eq!(
            err,
            InvalidRequestError::TokenAndColumnMix { column: "p1".into() }
        );
    }

    #[test]
    fn duplicate_token_lower_bound_is_rejected() {
        let mut set = PartitionRestrictions::new();
        set.add_token_atom(Atom::token(Operator::Gt, Operand::int(5)))
            .expect("first");
        let err = set
            .add_token_atom(Atom::token(Operator::Gte, Operand::int(9)))
            .unwrap_err();

        assert_eq!(
            err,
            InvalidRequestError::DuplicateBound {
                column: TOKEN_LHS.to_string(),
                bound: BoundName::Start,
            }
        );
    }

    #[test]
    fn slice_on_partition_column_becomes_residue() {
        let mut set = PartitionRestrictions::new();
        set.add_column_atom(
            1,
            &pk_column("p1", 0),
            Atom::slice("p1", Operator::Gt, Operand::int(5)),
        )
        .expect("residue");

        assert_eq!(set.residue.len(), 1);
        assert!(!set.explicit_complete());
        assert!(!set.is_empty());
    }
}
