//! Clustering-key restriction builder.
//!
//! Positions strictly before the last restricted one admit only EQ or IN;
//! the last admits EQ, IN, or a slice. Atoms are uniformly single-column or
//! uniformly multi-column, never mixed. Restrictions past a gap or past a
//! slice cannot narrow the range and are only reachable by filtering.

use crate::{
    error::{BoundName, InvalidRequestError},
    expr::{Atom, AtomLhs, Operand, Operator},
    schema::{ColumnDef, TableSchema},
};

///
/// SliceBounds
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct SliceBounds {
    pub lower: Option<(Operand, bool)>,
    pub upper: Option<(Operand, bool)>,
}

///
/// SingleSlot
/// Restriction state of one clustering position in single-column mode.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) enum SingleSlot {
    #[default]
    None,
    Eq(Operand),
    In(Operand),
    Slice(SliceBounds),
}

impl SingleSlot {
    #[must_use]
    pub(crate) const fn is_restricted(&self) -> bool {
        !matches!(self, Self::None)
    }

    #[must_use]
    const fn is_point(&self) -> bool {
        matches!(self, Self::Eq(_) | Self::In(_))
    }
}

///
/// MultiRestrictions
/// Tuple atoms over a contiguous clustering prefix starting at position 0.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct MultiRestrictions {
    pub eq: Option<Operand>,
    pub in_: Option<Operand>,
    pub lower: Option<(Operand, bool)>,
    pub upper: Option<(Operand, bool)>,
    /// Longest tuple arity seen; the covered prefix length.
    pub covered: usize,
}

///
/// ClusteringMode
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum ClusteringMode {
    Empty,
    Single(Vec<SingleSlot>),
    Multi(MultiRestrictions),
}

///
/// ClusteringRestrictions
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ClusteringRestrictions {
    pub mode: ClusteringMode,
    /// Single-column clustering atoms no prefix can serve (CONTAINS, LIKE).
    pub residue: Vec<Atom>,
}

impl ClusteringRestrictions {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            mode: ClusteringMode::Empty,
            residue: Vec::new(),
        }
    }

    /// Merge one single-column atom on a clustering column.
    pub(crate) fn add_single(
        &mut self,
        ck_len: usize,
        column: &ColumnDef,
        atom: Atom,
    ) -> Result<(), InvalidRequestError> {
        match atom.op {
            Operator::Contains | Operator::ContainsKey | Operator::Like => {
                // Reachable by filtering (or an index) only.
                self.residue.push(atom);
                return Ok(());
            }
            Operator::IsNotNull => {
                return Err(InvalidRequestError::UnsupportedOperator {
                    column: column.name.clone(),
                    op: atom.op,
                });
            }
            _ => {}
        }

        let slots = match &mut self.mode {
            ClusteringMode::Single(slots) => slots,
            ClusteringMode::Multi(_) => return Err(InvalidRequestError::MixedClusteringForms),
            mode => {
                *mode = ClusteringMode::Single(vec![SingleSlot::default(); ck_len]);
                match mode {
                    ClusteringMode::Single(slots) => slots,
                    _ => unreachable!("mode was just set to Single"),
                }
            }
        };

        let slot = &mut slots[column.position];
        match atom.op {
            Operator::Eq | Operator::In => {
                if slot.is_restricted() {
                    return Err(InvalidRequestError::ConflictingEquality {
                        column: column.name.clone(),
                    });
                }
                *slot = match atom.op {
                    Operator::Eq => SingleSlot::Eq(atom.rhs),
                    _ => SingleSlot::In(atom.rhs),
                };
            }
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
                let bounds = match slot {
                    SingleSlot::None => {
                        *slot = SingleSlot::Slice(SliceBounds::default());
                        match slot {
                            SingleSlot::Slice(bounds) => bounds,
                            _ => unreachable!("slot was just set to Slice"),
                        }
                    }
                    SingleSlot::Slice(bounds) => bounds,
                    SingleSlot::Eq(_) | SingleSlot::In(_) => {
                        return Err(InvalidRequestError::ConflictingEquality {
                            column: column.name.clone(),
                        });
                    }
                };

                let side = if atom.op.is_lower_bound() {
                    (&mut bounds.lower, BoundName::Start)
                } else {
                    (&mut bounds.upper, BoundName::End)
                };
                if side.0.is_some() {
                    return Err(InvalidRequestError::DuplicateBound {
                        column: column.name.clone(),
                        bound: side.1,
                    });
                }
                *side.0 = Some((atom.rhs, atom.op.is_inclusive()));
            }
            _ => unreachable!("residue operators handled above"),
        }

        Ok(())
    }

    /// Merge one multi-column atom; its tuple must name a contiguous
    /// clustering prefix starting at the first clustering column.
    pub(crate) fn add_multi(
        &mut self,
        schema: &TableSchema,
        atom: Atom,
    ) -> Result<(), InvalidRequestError> {
        let AtomLhs::Tuple(names) = &atom.lhs else {
            unreachable!("add_multi requires a tuple LHS");
        };

        for (expected, name) in names.iter().enumerate() {
            let column = schema
                .column(name)
                .ok_or_else(|| InvalidRequestError::UnknownColumn {
                    column: name.clone(),
                })?;
            if column.kind != crate::schema::ColumnKind::ClusteringKey {
                return Err(InvalidRequestError::MultiColumnOnNonClustering {
                    column: name.clone(),
                });
            }
            if column.position != expected {
                return Err(InvalidRequestError::NonPrefixMultiColumn {
                    column: name.clone(),
                });
            }
        }

        let multi = match &mut self.mode {
            ClusteringMode::Multi(multi) => multi,
            ClusteringMode::Single(_) => return Err(InvalidRequestError::MixedClusteringForms),
            mode => {
                *mode = ClusteringMode::Multi(MultiRestrictions::default());
                match mode {
                    ClusteringMode::Multi(multi) => multi,
                    _ => unreachable!("mode was just set to Multi"),
                }
            }
        };

        let arity = names.len();
        let lhs_name = || format!("({})", names.join(", "));

        let has_point = multi.eq.is_some() || multi.in_.is_some();
        match atom.op {
            Operator::Eq => {
                if has_point || multi.lower.is_some() || multi.upper.is_some() {
                    return Err(InvalidRequestError::ConflictingEquality { column: lhs_name() });
                }
                multi.eq = Some(atom.rhs);
            }
            Operator::In => {
                if has_point || multi.lower.is_some() || multi.upper.is_some() {
                    return Err(InvalidRequestError::ConflictingRestriction {
                        column: lhs_name(),
                    });
                }
                multi.in_ = Some(atom.rhs);
            }
            Operator::Gt | Operator::Gte => {
                if has_point {
                    return Err(InvalidRequestError::ConflictingEquality { column: lhs_name() });
                }
                if multi.lower.is_some() {
                    return Err(InvalidRequestError::DuplicateBound {
                        column: lhs_name(),
                        bound: BoundName::Start,
                    });
                }
                multi.lower = Some((atom.rhs, atom.op.is_inclusive()));
            }
            Operator::Lt | Operator::Lte => {
                if has_point {
                    return Err(InvalidRequestError::ConflictingEquality { column: lhs_name() });
                }
                if multi.upper.is_some() {
                    return Err(InvalidRequestError::DuplicateBound {
                        column: lhs_name(),
                        bound: BoundName::End,
                    });
                }
                multi.upper = Some((atom.rhs, atom.op.is_inclusive()));
            }
            _ => {
                return Err(InvalidRequestError::UnsupportedOperator {
                    column: lhs_name(),
                    op: atom.op,
                });
            }
        }
        multi.covered = multi.covered.max(arity);

        Ok(())
    }

    #[must_use]
    pub(crate) fn has_restrictions(&self) -> bool {
        !matches!(self.mode, ClusteringMode::Empty) || !self.residue.is_empty()
    }

    #[must_use]
    pub(crate) fn has_in(&self) -> bool {
        match &self.mode {
            ClusteringMode::Single(slots) => {
                slots.iter().any(|slot| matches!(slot, SingleSlot::In(_)))
            }
            ClusteringMode::Multi(multi) => multi.in_.is_some(),
            ClusteringMode::Empty => false,
        }
    }

    /// Empty or pure EQ: drives single-range-vs-enumeration decisions.
    #[must_use]
    pub(crate) fn is_all_eq(&self) -> bool {
        if !self.residue.is_empty() {
            return false;
        }
        match &self.mode {
            ClusteringMode::Empty => true,
            ClusteringMode::Single(slots) => slots
                .iter()
                .all(|slot| matches!(slot, SingleSlot::None | SingleSlot::Eq(_))),
            ClusteringMode::Multi(multi) => {
                multi.in_.is_none() && multi.lower.is_none() && multi.upper.is_none()
            }
        }
    }

    /// Length of the contiguous EQ/IN run starting at position 0.
    #[must_use]
    pub(crate) fn point_prefix_len(&self) -> usize {
        match &self.mode {
            ClusteringMode::Single(slots) => slots
                .iter()
                .take_while(|slot| slot.is_point())
                .count(),
            ClusteringMode::Multi(_) | ClusteringMode::Empty => 0,
        }
    }

    /// Slice immediately after the point prefix, if any.
    #[must_use]
    pub(crate) fn slice_after_prefix(&self) -> Option<&SliceBounds> {
        let ClusteringMode::Single(slots) = &self.mode else {
            return None;
        };
        match slots.get(self.point_prefix_len()) {
            Some(SingleSlot::Slice(bounds)) => Some(bounds),
            _ => None,
        }
    }

    /// Number of leading positions the range translator can use.
    #[must_use]
    pub(crate) fn usable_prefix_len(&self) -> usize {
        match &self.mode {
            ClusteringMode::Single(_) => {
                self.point_prefix_len() + usize::from(self.slice_after_prefix().is_some())
            }
            ClusteringMode::Multi(multi) => multi.covered,
            ClusteringMode::Empty => 0,
        }
    }

    /// Restricted positions the usable prefix cannot reach (gap or
    /// past-slice restrictions).
    pub(crate) fn out_of_prefix_positions(&self) -> Vec<usize> {
        let ClusteringMode::Single(slots) = &self.mode else {
            return Vec::new();
        };
        let usable = self.usable_prefix_len();

        slots
            .iter()
            .enumerate()
            .skip(usable)
            .filter_map(|(position, slot)| slot.is_restricted().then_some(position))
            .collect()
    }

    /// First (restricted, unrestricted-predecessor) position pair, for the
    /// gap diagnostic.
    #[must_use]
    pub(crate) fn first_gap(&self) -> Option<(usize, usize)> {
        let ClusteringMode::Single(slots) = &self.mode else {
            return None;
        };
        let mut first_unrestricted = None;
        for (position, slot) in slots.iter().enumerate() {
            match (slot.is_restricted(), first_unrestricted) {
                (false, None) => first_unrestricted = Some(position),
                (true, Some(gap)) => return Some((position, gap)),
                _ => {}
            }
        }

        None
    }

    /// Whether the usable prefix leaves restricted positions behind.
    #[must_use]
    pub(crate) fn has_unreachable_restrictions(&self) -> bool {
        !self.residue.is_empty() || !self.out_of_prefix_positions().is_empty()
    }

    #[must_use]
    pub(crate) fn is_position_restricted(&self, position: usize) -> bool {
        match &self.mode {
            ClusteringMode::Single(slots) => {
                slots.get(position).is_some_and(SingleSlot::is_restricted)
            }
            ClusteringMode::Multi(multi) => position < multi.covered,
            ClusteringMode::Empty => false,
        }
    }

    #[must_use]
    pub(crate) fn has_eq_at(&self, position: usize) -> bool {
        match &self.mode {
            ClusteringMode::Single(slots) => {
                matches!(slots.get(position), Some(SingleSlot::Eq(_)))
            }
            ClusteringMode::Multi(multi) => {
                multi.eq.is_some() && position < multi.covered
            }
            ClusteringMode::Empty => false,
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

    fn ck_column(name: &str, position: usize) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            kind: ColumnKind::ClusteringKey,
            position,
            ty: ColumnType::Int,
        }
    }

    fn schema_ck3() -> TableSchema {
        TableSchema::new(
            "ks",
            "t",
            1,
            vec![("pk", ColumnType::Int)],
            vec![
                ("c1", ColumnType::Int),
                ("c2", ColumnType::Int),
                ("c3", ColumnType::Int),
            ],
            vec![],
            vec![],
        )
    }

    #[test]
    fn eq_then_slice_forms_a_usable_prefix() {
        let mut set = ClusteringRestrictions::new();
        set.add_single(3, &ck_column("c1", 0), Atom::eq("c1", Operand::int(5)))
            .expect("eq");
        set.add_single(
            3,
            &ck_column("c2", 1),
            Atom::slice("c2", Operator::Gt, Operand::int(10)),
        )
        .expect("slice");

        assert_eq!(set.point_prefix_len(), 1);
        assert_eq!(set.usable_prefix_len(), 2);
        assert!(!set.has_unreachable_restrictions());
        assert!(set.first_gap().is_none());
    }

    #[test]
    fn gap_leaves_unreachable_restrictions() {
        let mut set = ClusteringRestrictions::new();
        set.add_single(3, &ck_column("c1", 0), Atom::eq("c1", Operand::int(5)))
            .expect("c1");
        set.add_single(3, &ck_column("c3", 2), Atom::eq("c3", Operand::int(7)))
            .expect("c3");

        assert_eq!(set.usable_prefix_len(), 1);
        assert_eq!(set.out_of_prefix_positions(), vec![2]);
        assert_eq!(set.first_gap(), Some((2, 1)));
    }

    #[test]
    fn restriction_past_a_slice_is_unreachable() {
        let mut set = ClusteringRestrictions::new();
        set.add_single(
            3,
            &ck_column("c1", 0),
            Atom::slice("c1", Operator::Lt, Operand::int(9)),
        )
        .expect("slice");
        set.add_single(3, &ck_column("c2", 1), Atom::eq("c2", Operand::int(1)))
            .expect("c2");

        assert_eq!(set.usable_prefix_len(), 1);
        assert!(set.has_unreachable_restrictions());
        // Not a gap: c1 is restricted, just not by a point.
        assert!(set.first_gap().is_none());
    }

    #[test]
    fn two_sided_slice_merges_bounds() {
        let mut set = ClusteringRestrictions::new();
        let col = ck_column("c1", 0);
        set.add_single(3, &col, Atom::slice("c1", Operator::Gte, Operand::int(1)))
            .expect("lower");
        set.add_single(3, &col, Atom::slice("c1", Operator::Lt, Operand::int(9)))
            .expect("upper");

        let bounds = set.slice_after_prefix().expect("slice");
        assert_eq!(bounds.lower, Some((Operand::int(1), true)));
        assert_eq!(bounds.upper, Some((Operand::int(9), false)));
    }

    #[test]
    fn duplicate_slice_side_is_rejected() {
        let mut set = ClusteringRestrictions::new();
        let col = ck_column("c1", 0);
        set.add_single(3, &col, Atom::slice("c1", Operator::Gt, Operand::int(1)))
            .expect("lower");
        let err = set
            .add_single(3, &col, Atom::slice("c1", Operator::Gte, Operand::int(2)))
            .unwrap_err();

        assert_eq!(
            err,
            InvalidRequestError::DuplicateBound {
                column: "c1".into(),
                bound: BoundName::Start,
            }
        );
    }

    #[test]
    fn multi_column_must_start_at_first_clustering_column() {
        let schema = schema_ck3();
        let mut set = ClusteringRestrictions::new();
        let err = set
            .add_multi(
                &schema,
                Atom::multi(
                    vec!["c2", "c3"],
                    Operator::Gt,
                    Operand::Tuple(vec![Operand::int(1), Operand::int(2)]),
                ),
            )
            .unwrap_err();

        assert_eq!(
            err,
            InvalidRequestError::NonPrefixMultiColumn { column: "c2".into() }
        );
    }

    #[test]
    fn multi_column_out_of_order_names_the_offender() {
        let schema = schema_ck3();
        let mut set = ClusteringRestrictions::new();
        let err = set
            .add_multi(
                &schema,
                Atom::multi(
                    vec!["c1", "c3"],
                    Operator::Eq,
                    Operand::Tuple(vec![Operand::int(1), Operand::int(2)]),
                ),
            )
            .unwrap_err();

        assert_eq!(
            err,
            InvalidRequestError::NonPrefixMultiColumn { column: "c3".into() }
        );
    }

    #[test]
    fn mixing_single_and_multi_is_rejected() {
        let schema = schema_ck3();
        let mut set = ClusteringRestrictions::new();
        set.add_single(3, &ck_column("c1", 0), Atom::eq("c1", Operand::int(5)))
            .expect("single");
        let err = set
            .add_multi(
                &schema,
                Atom::multi(
                    vec!["c1", "c2"],
                    Operator::Gt,
                    Operand::Tuple(vec![Operand::int(1), Operand::int(2)]),
                ),
            )
            .unwrap_err();

        assert_eq!(err, InvalidRequestError::MixedClusteringForms);
    }

    #[test]
    fn multi_two_sided_slice_covers_longest_arity() {
        let schema = schema_ck3();
        let mut set = ClusteringRestrictions::new();
        set.add_multi(
            &schema,
            Atom::multi(
                vec!["c1", "c2"],
                Operator::Gt,
                Operand::Tuple(vec![Operand::int(1), Operand::int(2)]),
            ),
        )
        .expect("lower");
        set.add_multi(
            &schema,
            Atom::multi(vec!["c1"], Operator::Lte, Operand::Tuple(vec![Operand::int(8)])),
        )
        .expect("upper");

        assert_eq!(set.usable_prefix_len(), 2);
        assert!(!set.is_all_eq());
    }
}
