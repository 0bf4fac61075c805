use crate::expr::Operator;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InvalidRequestError
///
/// User-correctable WHERE-clause failures, detected synchronously during
/// statement preparation or range translation. Every message names the
/// offending column and/or operator so the client can fix the query.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum InvalidRequestError {
    #[error("column '{column}' cannot be restricted by more than one relation if it includes an equality")]
    ConflictingEquality { column: String },

    #[error("column '{column}' is restricted by multiple incompatible relations")]
    ConflictingRestriction { column: String },

    #[error("more than one restriction was found for the {bound} bound on '{column}'")]
    DuplicateBound { column: String, bound: BoundName },

    #[error("partition key token cannot be mixed with per-column restrictions on '{column}'")]
    TokenAndColumnMix { column: String },

    #[error(
        "partition key column '{column}' must be restricted as other partition key columns are; \
         rerun with ALLOW FILTERING to scan and filter"
    )]
    MissingPartitionKeyPart { column: String },

    #[error(
        "clustering column '{column}' cannot be restricted as preceding column '{preceding}' is \
         not restricted; rerun with ALLOW FILTERING to scan and filter"
    )]
    ClusteringGap { column: String, preceding: String },

    #[error("multi-column relation does not form a clustering key prefix at column '{column}'")]
    NonPrefixMultiColumn { column: String },

    #[error("mixing single-column and multi-column relations on clustering columns is not allowed")]
    MixedClusteringForms,

    #[error("multi-column relations are only supported on clustering columns; '{column}' is not one")]
    MultiColumnOnNonClustering { column: String },

    #[error("operator {op} is not supported on column '{column}'")]
    UnsupportedOperator { column: String, op: Operator },

    #[error("unknown column '{column}' in where clause")]
    UnknownColumn { column: String },

    #[error("IS NOT NULL on '{column}' is only supported in materialized view preparation")]
    IsNotNullOutsideView { column: String },

    #[error("secondary index on '{column}' cannot serve a statement selecting only static columns")]
    IndexOverStaticProjection { column: String },

    #[error(
        "this query requires scanning rows and filtering them, which may read the whole table; \
         rerun with ALLOW FILTERING to accept the cost"
    )]
    NeedsAllowFiltering,

    #[error("bind marker {marker} has no bound value")]
    UnsetBindMarker { marker: u16 },

    #[error("operand for '{column}' does not resolve to a list of values")]
    ExpectedListOperand { column: String },

    #[error("invalid null value for key column '{column}'")]
    NullKeyPart { column: String },

    #[error("operand for '{column}' does not match its declared type")]
    InvalidKeyLiteral { column: String },

    #[error("key combinations from IN restrictions ({size}) exceed the cap of {max}")]
    KeyCartesianTooLarge { size: usize, max: usize },
}

///
/// BoundName
/// Which end of an interval a duplicate-bound complaint refers to.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BoundName {
    Start,
    End,
}

impl fmt::Display for BoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::End => "end",
        };
        write!(f, "{label}")
    }
}

///
/// InternalError
///
/// Structured planner-contract violation with a stable internal
/// classification. Indicates a defect in the statement layer or in this
/// component; never user-recoverable and never built from user input.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{origin}:{class}: {message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub(crate) fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a restrictions-origin invariant violation.
    pub(crate) fn restrictions_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Restrictions,
            message,
        )
    }

    /// Construct a ranges-origin invariant violation.
    pub(crate) fn ranges_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Ranges, message)
    }

    /// Construct an index-origin invariant violation.
    pub(crate) fn index_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Index, message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Internal,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Restrictions,
    Ranges,
    Index,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Restrictions => "restrictions",
            Self::Ranges => "ranges",
            Self::Index => "index",
        };
        write!(f, "{label}")
    }
}

///
/// RangeError
///
/// Failure surface of the range accessors: either a user-correctable
/// request problem discovered while resolving bound values, or an internal
/// contract violation (accessor invoked before its preparation, wrong
/// index locality).
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum RangeError {
    #[error("{0}")]
    Invalid(Box<InvalidRequestError>),

    #[error("{0}")]
    Internal(Box<InternalError>),
}

impl From<InvalidRequestError> for RangeError {
    fn from(err: InvalidRequestError) -> Self {
        Self::Invalid(Box::new(err))
    }
}

impl From<InternalError> for RangeError {
    fn from(err: InternalError) -> Self {
        Self::Internal(Box::new(err))
    }
}
