//! Restriction resolution for the stratadb query planner: classifies parsed
//! WHERE-clause atoms against a table schema, decides partition targeting,
//! secondary-index use, and filtering, and translates the result into
//! concrete key ranges — including index-table coordinate spaces.
#![warn(unreachable_pub)]

pub mod error;
pub mod eval;
pub mod expr;
pub mod ranges;
pub mod restrictions;
pub mod schema;
pub mod token;
pub mod trace;
pub mod value;

///
/// CONSTANTS
///

/// Maximum number of key combinations enumerable from IN restrictions.
///
/// Bounds both partition-key Cartesian products and clustering prefix
/// expansion; exceeding it is a user-correctable error, not a truncation.
pub const MAX_KEY_CARTESIAN_PRODUCT: usize = 100;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, translators, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        eval::QueryOptions,
        expr::{Atom, AtomLhs, Operand, Operator, WhereClause},
        ranges::{ClusteringRange, PartitionRange},
        restrictions::{PlanFlags, StatementRestrictions},
        schema::{ColumnKind, ColumnType, IndexCandidate, IndexLocality, TableSchema},
        token::Token,
        value::Value,
    };
}
