//! Statement restriction resolution.
//!
//! One pure pass over the parsed WHERE clause: classify atoms into
//! partition/clustering/non-primary buckets, process each bucket, select a
//! secondary index, and decide filtering — producing an immutable record the
//! statement layer queries for scan strategy and the execution engine
//! queries for concrete ranges.
//!
//! Determinism: the same schema, atoms, flags, and candidate list always
//! produce the same record, including index tie-breaks.

pub(crate) mod clustering;
pub(crate) mod filtering;
pub(crate) mod index_select;
pub(crate) mod partition;
pub(crate) mod single_column;
pub(crate) mod translate;


pub use index_select::ChosenIndex;
pub use translate::IndexTablePrefix;

use crate::{
    error::InvalidRequestError,
    expr::{Atom, AtomLhs, Operator, WhereClause},
    schema::{ColumnDef, ColumnKind, ColumnType, IndexCandidate, SchemaRef, TableSchema},
    trace::{self, PlanTraceEvent, PlanTraceSink},
};
use clustering::ClusteringRestrictions;
use filtering::FilteringInputs;
use partition::PartitionRestrictions;
use single_column::SingleColumnRestrictions;
use std::collections::BTreeSet;
use std::fmt::{self, Display};

///
/// PlanFlags
///
/// Preparation-time switches owned by the statement layer. `for_view`
/// relaxes partition-key completeness for materialized-view base scans and
/// admits IS NOT NULL atoms.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PlanFlags {
    pub allow_filtering: bool,
    pub for_view: bool,
    pub selects_only_static_columns: bool,
}

impl PlanFlags {
    #[must_use]
    pub const fn allow_filtering() -> Self {
        Self {
            allow_filtering: true,
            for_view: false,
            selects_only_static_columns: false,
        }
    }

    #[must_use]
    pub const fn for_view() -> Self {
        Self {
            allow_filtering: false,
            for_view: true,
            selects_only_static_columns: false,
        }
    }
}

///
/// StatementRestrictions
///
/// The fully-populated decision record. Immutable after analysis except for
/// the one-shot index-table coordinate preparation in `translate`.
///

#[derive(Clone, Debug)]
pub struct StatementRestrictions {
    schema: SchemaRef,
    partition: PartitionRestrictions,
    clustering: ClusteringRestrictions,
    nonprimary: SingleColumnRestrictions,
    not_null: BTreeSet<String>,
    index_atoms: Vec<Atom>,
    chosen_index: Option<ChosenIndex>,
    is_key_range: bool,
    needs_filtering: bool,
    pub(crate) idx_prefix: Option<IndexTablePrefix>,
}

impl StatementRestrictions {
    /// Resolve one WHERE clause against a schema snapshot.
    pub fn analyze(
        schema: SchemaRef,
        clause: &WhereClause,
        candidates: &[IndexCandidate],
        flags: PlanFlags,
    ) -> Result<Self, InvalidRequestError> {
        Self::analyze_traced(schema, clause, candidates, flags, None)
    }

    /// As [`Self::analyze`], with an optional planning-trace sink.
    pub fn analyze_traced(
        schema: SchemaRef,
        clause: &WhereClause,
        candidates: &[IndexCandidate],
        flags: PlanFlags,
        sink: Option<&dyn PlanTraceSink>,
    ) -> Result<Self, InvalidRequestError> {
        let pk_len = schema.partition_key_len();
        let ck_len = schema.clustering_key_len();

        let mut partition = PartitionRestrictions::new();
        let mut clustering = ClusteringRestrictions::new();
        let mut nonprimary = SingleColumnRestrictions::default();
        let mut not_null = BTreeSet::new();
        let mut index_atoms = Vec::new();
        let (mut partition_count, mut clustering_count, mut regular_count) = (0u32, 0u32, 0u32);

        for atom in clause.iter() {
            match &atom.lhs {
                AtomLhs::Token => {
                    partition_count += 1;
                    partition.add_token_atom(atom.clone())?;
                }
                AtomLhs::Tuple(_) => {
                    clustering_count += 1;
                    clustering.add_multi(&schema, atom.clone())?;
                }
                AtomLhs::Column(name) => {
                    let column = schema.column(name).cloned().ok_or_else(|| {
                        InvalidRequestError::UnknownColumn {
                            column: name.clone(),
                        }
                    })?;

                    if atom.op == Operator::IsNotNull {
                        if !flags.for_view {
                            return Err(InvalidRequestError::IsNotNullOutsideView {
                                column: column.name,
                            });
                        }
                        not_null.insert(column.name);
                        continue;
                    }

                    validate_operator(&column, atom.op)?;
                    index_atoms.push(atom.clone());

                    match column.kind {
                        ColumnKind::PartitionKey => {
                            partition_count += 1;
                            partition.add_column_atom(pk_len, &column, atom.clone())?;
                        }
                        ColumnKind::ClusteringKey => {
                            clustering_count += 1;
                            clustering.add_single(ck_len, &column, atom.clone())?;
                        }
                        ColumnKind::Regular | ColumnKind::Static => {
                            regular_count += 1;
                            nonprimary.add(&column.name, atom.clone())?;
                        }
                    }
                }
            }
        }

        trace::emit(
            sink,
            PlanTraceEvent::Classified {
                partition: partition_count,
                clustering: clustering_count,
                regular: regular_count,
                not_null: not_null.len() as u32,
            },
        );

        let is_key_range = !partition.explicit_complete();

        // Index selection runs only when key ranges alone leave some
        // restriction unserved; once an index is chosen the decision
        // never reverts.
        let pre_index = FilteringInputs {
            schema: &schema,
            partition: &partition,
            clustering: &clustering,
            nonprimary: &nonprimary,
            chosen: None,
        };
        let chosen_index = if pre_index.needs_filtering() {
            index_select::find_index(
                &schema,
                candidates,
                &index_atoms,
                clustering.usable_prefix_len(),
                partition.explicit_complete(),
            )
        } else {
            None
        };

        trace::emit(
            sink,
            PlanTraceEvent::IndexSelection {
                chosen: chosen_index
                    .as_ref()
                    .map(|chosen| chosen.candidate.name.clone()),
                score: chosen_index.as_ref().map_or(0, |chosen| chosen.score),
            },
        );

        if let Some(chosen) = &chosen_index
            && flags.selects_only_static_columns
        {
            return Err(InvalidRequestError::IndexOverStaticProjection {
                column: chosen.candidate.column.clone(),
            });
        }

        let needs_filtering = FilteringInputs {
            schema: &schema,
            partition: &partition,
            clustering: &clustering,
            nonprimary: &nonprimary,
            chosen: chosen_index.as_ref(),
        }
        .needs_filtering();

        if needs_filtering && !flags.allow_filtering && !flags.for_view {
            return Err(filtering_refusal(
                &schema,
                &partition,
                &clustering,
                chosen_index.as_ref(),
            ));
        }

        trace::emit(
            sink,
            PlanTraceEvent::Decided {
                is_key_range,
                uses_secondary_indexing: chosen_index.is_some(),
                needs_filtering,
            },
        );

        Ok(Self {
            schema,
            partition,
            clustering,
            nonprimary,
            not_null,
            index_atoms,
            chosen_index,
            is_key_range,
            needs_filtering,
            idx_prefix: None,
        })
    }

    /// Whether the query scans a range of partitions rather than an
    /// enumerable key list.
    #[must_use]
    pub const fn is_key_range(&self) -> bool {
        self.is_key_range
    }

    #[must_use]
    pub const fn uses_secondary_indexing(&self) -> bool {
        self.chosen_index.is_some()
    }

    #[must_use]
    pub const fn chosen_index(&self) -> Option<&ChosenIndex> {
        self.chosen_index.as_ref()
    }

    /// Whether the partition key carries an IN restriction.
    #[must_use]
    pub fn key_is_in_relation(&self) -> bool {
        self.partition.key_is_in_relation()
    }

    #[must_use]
    pub fn clustering_key_restrictions_has_in(&self) -> bool {
        self.clustering.has_in()
    }

    /// Empty or pure EQ clustering restrictions.
    #[must_use]
    pub fn clustering_is_all_eq(&self) -> bool {
        self.clustering.is_all_eq()
    }

    #[must_use]
    pub const fn has_token_restrictions(&self) -> bool {
        self.partition.has_token()
    }

    #[must_use]
    pub fn has_partition_key_unrestricted_components(&self) -> bool {
        self.partition.has_unrestricted_components()
    }

    #[must_use]
    pub fn partition_key_restrictions_is_empty(&self) -> bool {
        self.partition.is_empty()
    }

    #[must_use]
    pub fn partition_key_restrictions_is_all_eq(&self) -> bool {
        self.partition.is_all_eq()
    }

    #[must_use]
    pub fn partition_key_restrictions_size(&self) -> usize {
        self.partition.restricted_len()
    }

    #[must_use]
    pub fn has_clustering_columns_restriction(&self) -> bool {
        self.clustering.has_restrictions()
    }

    #[must_use]
    pub fn has_unrestricted_clustering_columns(&self) -> bool {
        let ck_len = self.schema.clustering_key_len();
        (0..ck_len).any(|position| !self.clustering.is_position_restricted(position))
    }

    #[must_use]
    pub fn has_non_primary_key_restriction(&self) -> bool {
        !self.nonprimary.is_empty()
    }

    /// Whether the column carries a plain EQ restriction (IN is not EQ).
    #[must_use]
    pub fn has_eq_restriction_on_column(&self, column: &ColumnDef) -> bool {
        match column.kind {
            ColumnKind::PartitionKey => self.partition.has_eq_at(column.position),
            ColumnKind::ClusteringKey => self.clustering.has_eq_at(column.position),
            ColumnKind::Regular | ColumnKind::Static => self.nonprimary.has_eq_on(&column.name),
        }
    }

    /// Whether the column is restricted by anything, IS NOT NULL included.
    #[must_use]
    pub fn is_restricted(&self, column: &ColumnDef) -> bool {
        if self.not_null.contains(&column.name) {
            return true;
        }
        match column.kind {
            ColumnKind::PartitionKey => {
                self.partition.is_position_restricted(column.position)
                    || self
                        .partition
                        .residue
                        .iter()
                        .any(|atom| atom.single_column() == Some(column.name.as_str()))
            }
            ColumnKind::ClusteringKey => {
                self.clustering.is_position_restricted(column.position)
                    || self
                        .clustering
                        .residue
                        .iter()
                        .any(|atom| atom.single_column() == Some(column.name.as_str()))
            }
            ColumnKind::Regular | ColumnKind::Static => {
                self.nonprimary.is_restricted(&column.name)
            }
        }
    }

    /// Single-column atoms eligible for index selection.
    #[must_use]
    pub fn index_restrictions(&self) -> &[Atom] {
        &self.index_atoms
    }

    #[must_use]
    pub const fn need_filtering(&self) -> bool {
        self.needs_filtering
    }

    #[must_use]
    pub fn pk_restrictions_need_filtering(&self) -> bool {
        !self.partition.residue.is_empty()
            || (!self.partition.is_empty()
                && !self.partition.has_token()
                && self.partition.has_unrestricted_components())
    }

    #[must_use]
    pub fn ck_restrictions_need_filtering(&self) -> bool {
        if !self.clustering.has_restrictions() {
            return false;
        }

        self.partition.has_unrestricted_components()
            || self.clustering.has_unreachable_restrictions()
            || (self.uses_secondary_indexing() && self.partition.has_token())
    }

    /// Column definitions the execution layer must filter on.
    #[must_use]
    pub fn columns_for_filtering(&self) -> Vec<ColumnDef> {
        self.filtering_inputs().columns_for_filtering()
    }

    #[must_use]
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub(crate) fn filtering_inputs(&self) -> FilteringInputs<'_> {
        FilteringInputs {
            schema: &self.schema,
            partition: &self.partition,
            clustering: &self.clustering,
            nonprimary: &self.nonprimary,
            chosen: self.chosen_index.as_ref(),
        }
    }
}

impl Display for StatementRestrictions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "restrictions{{table: {}, partition: {}, clustering: {}, non_primary: {}, \
             key_range: {}, index: {}, filtering: {}}}",
            self.schema,
            self.partition.restricted_len(),
            self.clustering.usable_prefix_len(),
            self.nonprimary.columns().count(),
            self.is_key_range,
            self.chosen_index
                .as_ref()
                .map_or("none", |chosen| chosen.candidate.name.as_str()),
            self.needs_filtering,
        )
    }
}

/// Reject operators that can never apply to a column's type.
fn validate_operator(column: &ColumnDef, op: Operator) -> Result<(), InvalidRequestError> {
    let supported = match op {
        Operator::Contains => column.ty.is_collection(),
        Operator::ContainsKey => column.ty.is_map(),
        Operator::Like => column.ty == ColumnType::Text,
        _ => true,
    };

    if supported {
        Ok(())
    } else {
        Err(InvalidRequestError::UnsupportedOperator {
            column: column.name.clone(),
            op,
        })
    }
}

/// Pick the most specific refusal when filtering is needed but disallowed.
fn filtering_refusal(
    schema: &TableSchema,
    partition: &PartitionRestrictions,
    clustering: &ClusteringRestrictions,
    chosen: Option<&ChosenIndex>,
) -> InvalidRequestError {
    if chosen.is_none() {
        if !partition.is_empty()
            && !partition.has_token()
            && let Some(position) = partition.first_unrestricted_position(schema.partition_key_len())
            && partition.restricted_len() > partition.residue.len()
        {
            if let Some(column) = schema.partition_column(position) {
                return InvalidRequestError::MissingPartitionKeyPart {
                    column: column.name.clone(),
                };
            }
        }

        if let Some((position, gap)) = clustering.first_gap() {
            let column = schema
                .clustering_column(position)
                .map(|col| col.name.clone())
                .unwrap_or_default();
            let preceding = schema
                .clustering_column(gap)
                .map(|col| col.name.clone())
                .unwrap_or_default();
            return InvalidRequestError::ClusteringGap { column, preceding };
        }
    }

    InvalidRequestError::NeedsAllowFiltering
}
