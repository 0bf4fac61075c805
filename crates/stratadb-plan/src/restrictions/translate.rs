//! Range translation: restriction sets to concrete key ranges.
//!
//! Partition ranges enumerate explicit keys (Cartesian product under the
//! combination cap) or emit one token interval. Clustering bounds expand the
//! usable prefix into ordered prefix intervals. Index-table preparation
//! re-expresses the base prefix in the index table's own clustering
//! coordinates: (indexed value, base CK) for a local index and
//! (token, base PK, base CK) for a global one, with the token filled
//! per partition at execution time.

use crate::{
    MAX_KEY_CARTESIAN_PRODUCT,
    error::{InternalError, InvalidRequestError, RangeError},
    eval::{self, QueryOptions},
    expr::Operand,
    ranges::{
        ClusteringRange, PartitionRange, cartesian, interval_is_empty, prefix_interval_is_empty,
        sort_dedup_combos,
    },
    restrictions::{
        StatementRestrictions,
        clustering::{ClusteringMode, MultiRestrictions, SingleSlot, SliceBounds},
        partition::{ColumnValues, PartitionMode, TOKEN_LHS, TokenSlice},
    },
    schema::{ColumnDef, IndexLocality},
    token::{Token, token_of},
    value::Value,
};
use std::ops::Bound;

///
/// IndexTablePrefix
///
/// Shape of the index-table clustering prefix, fixed once per preparation.
/// Which base coordinates fold into the prefix depends on locality and on
/// whether the base partition key is fully enumerable.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexTablePrefix {
    pub locality: IndexLocality,
    pub include_partition: bool,
    pub include_clustering: bool,
}

impl StatementRestrictions {
    /// Concrete partition-level scan targets for one execution.
    pub fn partition_key_ranges(
        &self,
        options: &QueryOptions,
    ) -> Result<Vec<PartitionRange>, RangeError> {
        match &self.partition.mode {
            PartitionMode::Token(slice) => self.token_ranges(slice, options),
            PartitionMode::Columns(_) if self.partition.explicit_complete() => {
                let Some(lists) = self.partition_value_lists(options)? else {
                    return Ok(Vec::new());
                };
                let mut combos = cartesian(&lists, MAX_KEY_CARTESIAN_PRODUCT)?;
                sort_dedup_combos(&mut combos);

                Ok(combos
                    .into_iter()
                    .map(|key| {
                        let token = token_of(&key);
                        PartitionRange::SingleKey { key, token }
                    })
                    .collect())
            }
            PartitionMode::Columns(_) | PartitionMode::Empty => Ok(vec![PartitionRange::full()]),
        }
    }

    /// Clustering intervals for the base table.
    pub fn clustering_bounds(
        &self,
        options: &QueryOptions,
    ) -> Result<Vec<ClusteringRange>, RangeError> {
        self.ck_ranges(options, &[])
    }

    /// True iff a partition or clustering range is empty specifically
    /// because an EQ operand (or slice endpoint) resolved to null.
    pub fn range_or_slice_eq_null(
        &self,
        options: &QueryOptions,
    ) -> Result<bool, InvalidRequestError> {
        if let PartitionMode::Columns(slots) = &self.partition.mode {
            for slot in slots.iter().flatten() {
                if let ColumnValues::Eq(operand) = slot
                    && eval::resolve(operand, options)?.is_null()
                {
                    return Ok(true);
                }
            }
        }

        match &self.clustering.mode {
            ClusteringMode::Single(slots) => {
                for slot in slots {
                    match slot {
                        SingleSlot::Eq(operand) => {
                            if eval::resolve(operand, options)?.is_null() {
                                return Ok(true);
                            }
                        }
                        SingleSlot::Slice(bounds) => {
                            for (operand, _) in
                                bounds.lower.iter().chain(bounds.upper.iter())
                            {
                                if eval::resolve(operand, options)?.is_null() {
                                    return Ok(true);
                                }
                            }
                        }
                        SingleSlot::None | SingleSlot::In(_) => {}
                    }
                }
            }
            ClusteringMode::Multi(multi) => {
                let operands = multi
                    .eq
                    .iter()
                    .chain(multi.lower.iter().map(|(operand, _)| operand))
                    .chain(multi.upper.iter().map(|(operand, _)| operand));
                for operand in operands {
                    if let Value::Tuple(items) = eval::resolve(operand, options)?
                        && items.iter().any(Value::is_null)
                    {
                        return Ok(true);
                    }
                }
            }
            ClusteringMode::Empty => {}
        }

        Ok(false)
    }

    /// Fix the index-table prefix shape for a local index. Idempotent;
    /// global preparation afterwards is a contract violation.
    pub fn prepare_indexed_local(&mut self) -> Result<(), InternalError> {
        let chosen = self.chosen_index.as_ref().ok_or_else(|| {
            InternalError::index_invariant("index-table preparation without a chosen index")
        })?;
        if chosen.candidate.locality != IndexLocality::Local {
            return Err(InternalError::index_invariant(format!(
                "local preparation for global index '{}'",
                chosen.candidate.name,
            )));
        }

        match &self.idx_prefix {
            Some(prefix) if prefix.locality == IndexLocality::Local => Ok(()),
            Some(_) => Err(InternalError::ranges_invariant(
                "index-table prefix already prepared for the other locality",
            )),
            None => {
                let include_clustering = matches!(
                    self.clustering.mode,
                    ClusteringMode::Single(_) | ClusteringMode::Empty
                );
                self.idx_prefix = Some(IndexTablePrefix {
                    locality: IndexLocality::Local,
                    // The local index table shares the base partition key;
                    // nothing to fold into its clustering prefix.
                    include_partition: false,
                    include_clustering,
                });

                Ok(())
            }
        }
    }

    /// Fix the index-table prefix shape for a global index. Idempotent;
    /// local preparation afterwards is a contract violation.
    pub fn prepare_indexed_global(&mut self) -> Result<(), InternalError> {
        let chosen = self.chosen_index.as_ref().ok_or_else(|| {
            InternalError::index_invariant("index-table preparation without a chosen index")
        })?;
        if chosen.candidate.locality != IndexLocality::Global {
            return Err(InternalError::index_invariant(format!(
                "global preparation for local index '{}'",
                chosen.candidate.name,
            )));
        }

        match &self.idx_prefix {
            Some(prefix) if prefix.locality == IndexLocality::Global => Ok(()),
            Some(_) => Err(InternalError::ranges_invariant(
                "index-table prefix already prepared for the other locality",
            )),
            None => {
                let include_partition =
                    self.partition.explicit_complete() && !self.partition.has_token();
                // The prefix must stay gap-free in index-table coordinates:
                // clustering columns are reachable only through the full
                // partition key.
                let include_clustering = include_partition
                    && matches!(
                        self.clustering.mode,
                        ClusteringMode::Single(_) | ClusteringMode::Empty
                    );
                self.idx_prefix = Some(IndexTablePrefix {
                    locality: IndexLocality::Global,
                    include_partition,
                    include_clustering,
                });

                Ok(())
            }
        }
    }

    /// Clustering ranges over a local index table: (indexed value, base CK).
    pub fn local_index_clustering_ranges(
        &self,
        options: &QueryOptions,
    ) -> Result<Vec<ClusteringRange>, RangeError> {
        let prefix = self.prepared_prefix(IndexLocality::Local)?;
        let Some(index_value) = self.driving_value(options)? else {
            return Ok(Vec::new());
        };

        let lead = vec![index_value];
        if prefix.include_clustering {
            self.ck_ranges(options, &lead)
        } else {
            Ok(vec![ClusteringRange::whole_prefix(lead)])
        }
    }

    /// Clustering ranges over a global index table for one base partition:
    /// (token, base PK, base CK) with the token supplied by the caller.
    pub fn global_index_clustering_ranges(
        &self,
        options: &QueryOptions,
        token: Token,
    ) -> Result<Vec<ClusteringRange>, RangeError> {
        let prefix = self.prepared_prefix(IndexLocality::Global)?;
        if self.partition.has_token() {
            return Err(InternalError::ranges_invariant(
                "token-restricted statement must use the token range accessor",
            )
            .into());
        }

        let mut leads = vec![vec![token.as_value()]];
        if prefix.include_partition {
            let Some(lists) = self.partition_value_lists(options)? else {
                return Ok(Vec::new());
            };
            let mut combos = cartesian(&lists, MAX_KEY_CARTESIAN_PRODUCT)?;
            sort_dedup_combos(&mut combos);
            leads = combos
                .into_iter()
                .map(|combo| {
                    let mut lead = Vec::with_capacity(combo.len() + 1);
                    lead.push(token.as_value());
                    lead.extend(combo);
                    lead
                })
                .collect();
        }

        let mut out = Vec::new();
        for lead in leads {
            if prefix.include_clustering {
                out.extend(self.ck_ranges(options, &lead)?);
            } else {
                out.push(ClusteringRange::whole_prefix(lead));
            }
        }

        Ok(out)
    }

    /// Clustering ranges over a global index table when the base statement
    /// restricts the token itself: one interval over the token component.
    pub fn global_index_token_clustering_ranges(
        &self,
        options: &QueryOptions,
    ) -> Result<Vec<ClusteringRange>, RangeError> {
        self.prepared_prefix(IndexLocality::Global)?;
        let PartitionMode::Token(slice) = &self.partition.mode else {
            return Err(InternalError::ranges_invariant(
                "statement has no token restriction",
            )
            .into());
        };

        let ranges = self.token_ranges(slice, options)?;
        Ok(ranges
            .into_iter()
            .filter_map(|range| match range {
                PartitionRange::TokenInterval { lower, upper } => {
                    let as_prefix = |bound: Bound<Token>| match bound {
                        Bound::Included(token) => Bound::Included(vec![token.as_value()]),
                        Bound::Excluded(token) => Bound::Excluded(vec![token.as_value()]),
                        Bound::Unbounded => Bound::Unbounded,
                    };
                    Some(ClusteringRange::new(as_prefix(lower), as_prefix(upper)))
                }
                PartitionRange::SingleKey { .. } => None,
            })
            .collect())
    }

    fn prepared_prefix(&self, locality: IndexLocality) -> Result<&IndexTablePrefix, RangeError> {
        let prefix = self.idx_prefix.as_ref().ok_or_else(|| {
            InternalError::ranges_invariant(
                "index-table ranges requested before index-table preparation",
            )
        })?;
        if prefix.locality != locality {
            return Err(InternalError::ranges_invariant(
                "index-table ranges requested for the wrong index locality",
            )
            .into());
        }

        Ok(prefix)
    }

    /// Resolved value of the restriction driving the chosen index; `None`
    /// when it resolves to null (no row can match).
    fn driving_value(&self, options: &QueryOptions) -> Result<Option<Value>, RangeError> {
        let chosen = self.chosen_index.as_ref().ok_or_else(|| {
            InternalError::index_invariant("index-table ranges without a chosen index")
        })?;

        let value = eval::resolve(&chosen.driving.rhs, options).map_err(RangeError::from)?;
        Ok((!value.is_null()).then_some(value))
    }

    /// Per-position partition value lists, canonically ordered; `None` when
    /// an EQ operand resolves to null.
    fn partition_value_lists(
        &self,
        options: &QueryOptions,
    ) -> Result<Option<Vec<Vec<Value>>>, RangeError> {
        let PartitionMode::Columns(slots) = &self.partition.mode else {
            return Err(InternalError::ranges_invariant(
                "explicit partition values requested without per-column restrictions",
            )
            .into());
        };

        let mut lists = Vec::with_capacity(slots.len());
        for (position, slot) in slots.iter().enumerate() {
            let Some(values) = slot else {
                return Err(InternalError::ranges_invariant(format!(
                    "partition position {position} has no explicit value",
                ))
                .into());
            };
            let column = self.partition_column(position)?;

            match values {
                ColumnValues::Eq(operand) => {
                    let value = eval::resolve(operand, options).map_err(RangeError::from)?;
                    if value.is_null() {
                        return Ok(None);
                    }
                    check_literal(&column, &value)?;
                    lists.push(vec![value]);
                }
                ColumnValues::In(operand) => {
                    let mut values = eval::resolve_list(&column.name, operand, options)
                        .map_err(RangeError::from)?;
                    // Null entries cannot match any key; drop them.
                    values.retain(|value| !value.is_null());
                    for value in &values {
                        check_literal(&column, value)?;
                    }
                    let mut singletons: Vec<Vec<Value>> =
                        values.into_iter().map(|value| vec![value]).collect();
                    sort_dedup_combos(&mut singletons);
                    lists.push(singletons.into_iter().flatten().collect());
                }
            }
        }

        Ok(Some(lists))
    }

    /// Token interval(s) for one execution; empty when the interval cannot
    /// contain anything.
    fn token_ranges(
        &self,
        slice: &TokenSlice,
        options: &QueryOptions,
    ) -> Result<Vec<PartitionRange>, RangeError> {
        if let Some(operand) = &slice.eq {
            let token = resolve_token(operand, options)?;
            return Ok(vec![PartitionRange::TokenInterval {
                lower: Bound::Included(token),
                upper: Bound::Included(token),
            }]);
        }

        let as_bound = |side: &Option<(Operand, bool)>| -> Result<Bound<Token>, RangeError> {
            match side {
                None => Ok(Bound::Unbounded),
                Some((operand, inclusive)) => {
                    let token = resolve_token(operand, options)?;
                    Ok(if *inclusive {
                        Bound::Included(token)
                    } else {
                        Bound::Excluded(token)
                    })
                }
            }
        };

        let lower = as_bound(&slice.lower)?;
        let upper = as_bound(&slice.upper)?;
        if interval_is_empty(&lower, &upper, Token::cmp) {
            return Ok(Vec::new());
        }

        Ok(vec![PartitionRange::TokenInterval { lower, upper }])
    }

    /// Clustering intervals with `lead` prepended to every bound; the shared
    /// machinery behind base-table and index-table accessors.
    fn ck_ranges(
        &self,
        options: &QueryOptions,
        lead: &[Value],
    ) -> Result<Vec<ClusteringRange>, RangeError> {
        match &self.clustering.mode {
            ClusteringMode::Empty => Ok(vec![if lead.is_empty() {
                ClusteringRange::full()
            } else {
                ClusteringRange::whole_prefix(lead.to_vec())
            }]),
            ClusteringMode::Single(_) => self.single_ck_ranges(options, lead),
            ClusteringMode::Multi(multi) => self.multi_ck_ranges(multi, options, lead),
        }
    }

    fn single_ck_ranges(
        &self,
        options: &QueryOptions,
        lead: &[Value],
    ) -> Result<Vec<ClusteringRange>, RangeError> {
        let point_len = self.clustering.point_prefix_len();
        let ClusteringMode::Single(slots) = &self.clustering.mode else {
            unreachable!("single_ck_ranges requires single-column mode");
        };

        let mut lists = Vec::with_capacity(point_len);
        for (position, slot) in slots.iter().take(point_len).enumerate() {
            let column = self.clustering_column(position)?;
            match slot {
                SingleSlot::Eq(operand) => {
                    let value = eval::resolve(operand, options).map_err(RangeError::from)?;
                    if value.is_null() {
                        return Ok(Vec::new());
                    }
                    check_literal(&column, &value)?;
                    lists.push(vec![value]);
                }
                SingleSlot::In(operand) => {
                    let mut values = eval::resolve_list(&column.name, operand, options)
                        .map_err(RangeError::from)?;
                    values.retain(|value| !value.is_null());
                    for value in &values {
                        check_literal(&column, value)?;
                    }
                    let mut singletons: Vec<Vec<Value>> =
                        values.into_iter().map(|value| vec![value]).collect();
                    sort_dedup_combos(&mut singletons);
                    lists.push(singletons.into_iter().flatten().collect());
                }
                SingleSlot::None | SingleSlot::Slice(_) => {
                    unreachable!("point prefix contains only EQ/IN slots")
                }
            }
        }

        let mut combos = cartesian(&lists, MAX_KEY_CARTESIAN_PRODUCT)?;
        sort_dedup_combos(&mut combos);

        let slice = self.clustering.slice_after_prefix();
        let resolved_slice = match slice {
            Some(bounds) => {
                let Some(resolved) = resolve_slice(bounds, options)? else {
                    // A null slice endpoint can never bound a row.
                    return Ok(Vec::new());
                };
                Some(resolved)
            }
            None => None,
        };

        let mut out = Vec::with_capacity(combos.len());
        for combo in combos {
            let mut prefix = Vec::with_capacity(lead.len() + combo.len());
            prefix.extend_from_slice(lead);
            prefix.extend(combo);

            match &resolved_slice {
                None => out.push(ClusteringRange::whole_prefix(prefix)),
                Some((lower, upper)) => {
                    if let Some(range) = slice_range(&prefix, lower, upper) {
                        out.push(range);
                    }
                }
            }
        }

        Ok(out)
    }

    fn multi_ck_ranges(
        &self,
        multi: &MultiRestrictions,
        options: &QueryOptions,
        lead: &[Value],
    ) -> Result<Vec<ClusteringRange>, RangeError> {
        if let Some(operand) = &multi.eq {
            let Some(items) = resolve_tuple(operand, options)? else {
                return Ok(Vec::new());
            };
            let mut prefix = lead.to_vec();
            prefix.extend(items);
            return Ok(vec![ClusteringRange::whole_prefix(prefix)]);
        }

        if let Some(operand) = &multi.in_ {
            let tuples =
                eval::resolve_list("clustering key", operand, options).map_err(RangeError::from)?;
            let mut prefixes = Vec::with_capacity(tuples.len());
            for tuple in tuples {
                let Value::Tuple(items) = tuple else {
                    return Err(InvalidRequestError::InvalidKeyLiteral {
                        column: "clustering key".to_string(),
                    }
                    .into());
                };
                if items.iter().any(Value::is_null) {
                    continue;
                }
                let mut prefix = lead.to_vec();
                prefix.extend(items);
                prefixes.push(prefix);
            }
            sort_dedup_combos(&mut prefixes);

            return Ok(prefixes
                .into_iter()
                .map(ClusteringRange::whole_prefix)
                .collect());
        }

        let resolve_side = |side: &Option<(Operand, bool)>| -> Result<
            Option<Option<(Vec<Value>, bool)>>,
            RangeError,
        > {
            match side {
                None => Ok(Some(None)),
                Some((operand, inclusive)) => match resolve_tuple(operand, options)? {
                    None => Ok(None),
                    Some(items) => Ok(Some(Some((items, *inclusive)))),
                },
            }
        };

        let (Some(lower), Some(upper)) = (resolve_side(&multi.lower)?, resolve_side(&multi.upper)?)
        else {
            // A null tuple element can never bound a row.
            return Ok(Vec::new());
        };

        match slice_range(lead, &lower, &upper) {
            Some(range) => Ok(vec![range]),
            None => Ok(Vec::new()),
        }
    }

    fn partition_column(&self, position: usize) -> Result<ColumnDef, RangeError> {
        self.schema()
            .partition_column(position)
            .cloned()
            .ok_or_else(|| {
                InternalError::ranges_invariant(format!(
                    "partition position {position} is outside the schema",
                ))
                .into()
            })
    }

    fn clustering_column(&self, position: usize) -> Result<ColumnDef, RangeError> {
        self.schema()
            .clustering_column(position)
            .cloned()
            .ok_or_else(|| {
                InternalError::ranges_invariant(format!(
                    "clustering position {position} is outside the schema",
                ))
                .into()
            })
    }
}

/// Resolve both sides of a slice; `None` when an endpoint is null.
#[expect(clippy::type_complexity)]
fn resolve_slice(
    bounds: &SliceBounds,
    options: &QueryOptions,
) -> Result<Option<(Option<(Vec<Value>, bool)>, Option<(Vec<Value>, bool)>)>, RangeError> {
    let resolve_side = |side: &Option<(Operand, bool)>| -> Result<
        Option<Option<(Vec<Value>, bool)>>,
        RangeError,
    > {
        match side {
            None => Ok(Some(None)),
            Some((operand, inclusive)) => {
                let value = eval::resolve(operand, options).map_err(RangeError::from)?;
                if value.is_null() {
                    return Ok(None);
                }
                Ok(Some(Some((vec![value], *inclusive))))
            }
        }
    };

    let (Some(lower), Some(upper)) = (resolve_side(&bounds.lower)?, resolve_side(&bounds.upper)?)
    else {
        return Ok(None);
    };

    Ok(Some((lower, upper)))
}

/// Build one prefix interval from a shared prefix and resolved slice sides,
/// rejecting intervals that cannot contain anything.
fn slice_range(
    prefix: &[Value],
    lower: &Option<(Vec<Value>, bool)>,
    upper: &Option<(Vec<Value>, bool)>,
) -> Option<ClusteringRange> {
    let extend = |suffix: &[Value]| {
        let mut bound = Vec::with_capacity(prefix.len() + suffix.len());
        bound.extend_from_slice(prefix);
        bound.extend_from_slice(suffix);
        bound
    };

    let lower_bound = match lower {
        None => {
            if prefix.is_empty() {
                Bound::Unbounded
            } else {
                Bound::Included(prefix.to_vec())
            }
        }
        Some((suffix, true)) => Bound::Included(extend(suffix)),
        Some((suffix, false)) => Bound::Excluded(extend(suffix)),
    };
    let upper_bound = match upper {
        None => {
            if prefix.is_empty() {
                Bound::Unbounded
            } else {
                Bound::Included(prefix.to_vec())
            }
        }
        Some((suffix, true)) => Bound::Included(extend(suffix)),
        Some((suffix, false)) => Bound::Excluded(extend(suffix)),
    };

    if let (Some((lo, lo_inc)), Some((hi, hi_inc))) = (lower, upper) {
        let lo_seq = extend(lo);
        let hi_seq = extend(hi);
        if prefix_interval_is_empty(&lo_seq, *lo_inc, &hi_seq, *hi_inc) {
            return None;
        }
    }

    Some(ClusteringRange::new(lower_bound, upper_bound))
}

/// Resolve one tuple operand; `None` when any element is null.
fn resolve_tuple(
    operand: &Operand,
    options: &QueryOptions,
) -> Result<Option<Vec<Value>>, RangeError> {
    let Value::Tuple(items) = eval::resolve(operand, options).map_err(RangeError::from)? else {
        return Err(InvalidRequestError::InvalidKeyLiteral {
            column: "clustering key".to_string(),
        }
        .into());
    };

    if items.iter().any(Value::is_null) {
        return Ok(None);
    }

    Ok(Some(items))
}

fn resolve_token(operand: &Operand, options: &QueryOptions) -> Result<Token, RangeError> {
    let value = eval::resolve(operand, options).map_err(RangeError::from)?;
    match value {
        Value::Int(raw) => Ok(Token(raw)),
        Value::Null => Err(InvalidRequestError::NullKeyPart {
            column: TOKEN_LHS.to_string(),
        }
        .into()),
        _ => Err(InvalidRequestError::InvalidKeyLiteral {
            column: TOKEN_LHS.to_string(),
        }
        .into()),
    }
}

fn check_literal(column: &ColumnDef, value: &Value) -> Result<(), RangeError> {
    if column.ty.accepts(value) {
        Ok(())
    } else {
        Err(InvalidRequestError::InvalidKeyLiteral {
            column: column.name.clone(),
        }
        .into())
    }
}
