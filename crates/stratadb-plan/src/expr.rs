//! Restriction expression model.
//!
//! Pure representation of parsed WHERE-clause atoms. This layer carries no
//! schema knowledge, no classification, and no range semantics; all
//! interpretation happens in the restriction builders.

use crate::value::Value;
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

///
/// Operator
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Operator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Contains,
    ContainsKey,
    IsNotNull,
    Like,
}

impl Operator {
    /// Whether this operator is a one-sided inequality.
    #[must_use]
    pub const fn is_slice(self) -> bool {
        matches!(self, Self::Lt | Self::Lte | Self::Gt | Self::Gte)
    }

    /// Whether this operator constrains the lower end of an interval.
    #[must_use]
    pub const fn is_lower_bound(self) -> bool {
        matches!(self, Self::Gt | Self::Gte)
    }

    /// Whether the bound this operator contributes is inclusive.
    #[must_use]
    pub const fn is_inclusive(self) -> bool {
        matches!(self, Self::Lte | Self::Gte | Self::Eq)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::In => "IN",
            Self::Contains => "CONTAINS",
            Self::ContainsKey => "CONTAINS KEY",
            Self::IsNotNull => "IS NOT NULL",
            Self::Like => "LIKE",
        };
        write!(f, "{label}")
    }
}

///
/// Operand
///
/// Right-hand side of an atom. Markers are resolved against per-execution
/// bound values by the expression evaluator; planning treats them as opaque.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Operand {
    Literal(Value),
    Marker(u16),
    List(Vec<Operand>),
    Tuple(Vec<Operand>),
}

impl Operand {
    #[must_use]
    pub const fn literal(value: Value) -> Self {
        Self::Literal(value)
    }

    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Literal(Value::Int(value))
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Literal(Value::Text(value.into()))
    }
}

///
/// AtomLhs
///
/// Left-hand side of an atom: one column, an ordered column tuple
/// (clustering only), or the token of the whole partition key.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum AtomLhs {
    Column(String),
    Tuple(Vec<String>),
    Token,
}

///
/// Atom
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Atom {
    pub lhs: AtomLhs,
    pub op: Operator,
    pub rhs: Operand,
}

impl Atom {
    #[must_use]
    pub fn new(lhs: AtomLhs, op: Operator, rhs: Operand) -> Self {
        Self { lhs, op, rhs }
    }

    #[must_use]
    pub fn column(name: impl Into<String>, op: Operator, rhs: Operand) -> Self {
        Self::new(AtomLhs::Column(name.into()), op, rhs)
    }

    #[must_use]
    pub fn eq(name: impl Into<String>, rhs: Operand) -> Self {
        Self::column(name, Operator::Eq, rhs)
    }

    #[must_use]
    pub fn in_list(name: impl Into<String>, values: Vec<Operand>) -> Self {
        Self::column(name, Operator::In, Operand::List(values))
    }

    #[must_use]
    pub fn slice(name: impl Into<String>, op: Operator, rhs: Operand) -> Self {
        debug_assert!(op.is_slice(), "slice atom requires an inequality operator");
        Self::column(name, op, rhs)
    }

    #[must_use]
    pub fn is_not_null(name: impl Into<String>) -> Self {
        Self::column(name, Operator::IsNotNull, Operand::Literal(Value::Null))
    }

    #[must_use]
    pub fn multi(columns: Vec<&str>, op: Operator, rhs: Operand) -> Self {
        Self::new(
            AtomLhs::Tuple(columns.into_iter().map(str::to_string).collect()),
            op,
            rhs,
        )
    }

    #[must_use]
    pub fn token(op: Operator, rhs: Operand) -> Self {
        Self::new(AtomLhs::Token, op, rhs)
    }

    /// The single column this atom names, if its LHS is single-column.
    #[must_use]
    pub fn single_column(&self) -> Option<&str> {
        match &self.lhs {
            AtomLhs::Column(name) => Some(name),
            AtomLhs::Tuple(_) | AtomLhs::Token => None,
        }
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lhs {
            AtomLhs::Column(name) => write!(f, "{name} {}", self.op),
            AtomLhs::Tuple(names) => write!(f, "({}) {}", names.join(", "), self.op),
            AtomLhs::Token => write!(f, "token(pk) {}", self.op),
        }
    }
}

///
/// WhereClause
///
/// Ordered conjunction of atoms; may be empty. Atom order is the parse
/// order and carries no semantic weight.
///

#[derive(Clone, Debug, Default, Deref, Deserialize, Eq, IntoIterator, PartialEq, Serialize)]
pub struct WhereClause(#[into_iterator(owned, ref)] Vec<Atom>);

impl WhereClause {
    #[must_use]
    pub const fn new(atoms: Vec<Atom>) -> Self {
        Self(atoms)
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }
}

impl From<Vec<Atom>> for WhereClause {
    fn from(atoms: Vec<Atom>) -> Self {
        Self(atoms)
    }
}
