//! Secondary-index selection.
//!
//! Deterministic scoring over the candidates offered by the index manager.
//! EQ on the indexed column scores highest, CONTAINS/CONTAINS KEY next;
//! anything else disqualifies the candidate. Ties prefer a candidate whose
//! driving restriction lies inside the usable clustering prefix (less
//! post-index filtering), then a local index over a global one (no
//! cross-partition fan-out), then the lexicographically smaller name so
//! selection is a total order.

use crate::{
    expr::{Atom, Operator},
    schema::{ColumnKind, IndexCandidate, IndexLocality, TableSchema},
};

///
/// ChosenIndex
///
/// The selected candidate plus the restriction expression that justified
/// it; that restriction is served by the index, everything else is not.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChosenIndex {
    pub candidate: IndexCandidate,
    pub driving: Atom,
    pub score: u32,
}

const SCORE_EQ: u32 = 3;
const SCORE_CONTAINS: u32 = 2;

/// Score one atom as a driver for an index on its column.
fn atom_score(atom: &Atom) -> u32 {
    match atom.op {
        Operator::Eq => SCORE_EQ,
        Operator::Contains | Operator::ContainsKey => SCORE_CONTAINS,
        _ => 0,
    }
}

/// Pick the best eligible candidate, or none.
///
/// `index_atoms` is every single-column atom accumulated during
/// classification; `usable_prefix_len` bounds the clustering positions whose
/// restrictions the range translator can serve without the index.
/// `partition_complete` gates local candidates: a local index table is
/// co-located with its base partition and cannot be read without the full
/// partition key.
pub(crate) fn find_index(
    schema: &TableSchema,
    candidates: &[IndexCandidate],
    index_atoms: &[Atom],
    usable_prefix_len: usize,
    partition_complete: bool,
) -> Option<ChosenIndex> {
    let mut best: Option<ChosenIndex> = None;

    for candidate in candidates {
        if candidate.locality == IndexLocality::Local && !partition_complete {
            continue;
        }
        let Some((driving, score)) = best_driver(candidate, index_atoms) else {
            continue;
        };

        let contender = ChosenIndex {
            candidate: candidate.clone(),
            driving,
            score,
        };
        match &best {
            None => best = Some(contender),
            Some(current) => {
                if beats(schema, usable_prefix_len, &contender, current) {
                    best = Some(contender);
                }
            }
        }
    }

    best
}

/// Best-scoring atom on this candidate's column.
fn best_driver(candidate: &IndexCandidate, index_atoms: &[Atom]) -> Option<(Atom, u32)> {
    index_atoms
        .iter()
        .filter(|atom| atom.single_column() == Some(candidate.column.as_str()))
        .map(|atom| (atom.clone(), atom_score(atom)))
        .filter(|(_, score)| *score > 0)
        .max_by_key(|(_, score)| *score)
}

fn beats(
    schema: &TableSchema,
    usable_prefix_len: usize,
    contender: &ChosenIndex,
    current: &ChosenIndex,
) -> bool {
    if contender.score != current.score {
        return contender.score > current.score;
    }

    let contender_in_prefix = in_clustering_prefix(schema, usable_prefix_len, contender);
    let current_in_prefix = in_clustering_prefix(schema, usable_prefix_len, current);
    if contender_in_prefix != current_in_prefix {
        return contender_in_prefix;
    }

    let contender_local = contender.candidate.locality == IndexLocality::Local;
    let current_local = current.candidate.locality == IndexLocality::Local;
    if contender_local != current_local {
        return contender_local;
    }

    contender.candidate.name < current.candidate.name
}

/// Whether the driving restriction's column is a clustering column inside
/// the usable prefix.
fn in_clustering_prefix(
    schema: &TableSchema,
    usable_prefix_len: usize,
    chosen: &ChosenIndex,
) -> bool {
    schema
        .column(&chosen.candidate.column)
        .is_some_and(|column| {
            column.kind == ColumnKind::ClusteringKey && column.position < usable_prefix_len
        })
}

///
/// TESTS
///
