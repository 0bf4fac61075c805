//! Operand resolution boundary.
//!
//! The expression evaluator is a collaborator: restriction resolution treats
//! operands as opaque until execution time, when bound values arrive in
//! `QueryOptions`. Resolution must not allocate schema knowledge; type
//! compatibility is checked by the builders at preparation time.

use crate::{
    error::InvalidRequestError,
    expr::Operand,
    value::Value,
};

///
/// QueryOptions
///
/// Per-execution bound-parameter values, positional by marker id.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryOptions {
    bound: Vec<Value>,
}

impl QueryOptions {
    #[must_use]
    pub const fn new(bound: Vec<Value>) -> Self {
        Self { bound }
    }

    #[must_use]
    pub const fn none() -> Self {
        Self { bound: Vec::new() }
    }

    #[must_use]
    pub fn marker(&self, id: u16) -> Option<&Value> {
        self.bound.get(usize::from(id))
    }
}

/// Resolve one operand into a concrete value.
pub fn resolve(operand: &Operand, options: &QueryOptions) -> Result<Value, InvalidRequestError> {
    match operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Marker(id) => options
            .marker(*id)
            .cloned()
            .ok_or(InvalidRequestError::UnsetBindMarker { marker: *id }),
        Operand::List(items) => Ok(Value::List(resolve_all(items, options)?)),
        Operand::Tuple(items) => Ok(Value::Tuple(resolve_all(items, options)?)),
    }
}

/// Resolve an IN operand into its list of values.
pub fn resolve_list(
    column: &str,
    operand: &Operand,
    options: &QueryOptions,
) -> Result<Vec<Value>, InvalidRequestError> {
    match resolve(operand, options)? {
        Value::List(items) => Ok(items),
        _ => Err(InvalidRequestError::ExpectedListOperand {
            column: column.to_string(),
        }),
    }
}

fn resolve_all(
    items: &[Operand],
    options: &QueryOptions,
) -> Result<Vec<Value>, InvalidRequestError> {
    items.iter().map(|item| resolve(item, options)).collect()
}

///
/// TESTS
///
