//! Filtering decision engine.
//!
//! A restriction is "served" when storage can honor it through key ranges
//! alone: an enumerable partition key, the usable clustering prefix under a
//! complete partition key, a token interval, or the one restriction driving
//! the chosen index. Everything else must be evaluated row by row.

use crate::{
    expr::{Operand, Operator},
    restrictions::{
        clustering::{ClusteringMode, ClusteringRestrictions, SingleSlot},
        index_select::ChosenIndex,
        partition::{ColumnValues, PartitionMode, PartitionRestrictions},
        single_column::SingleColumnRestrictions,
    },
    schema::{ColumnDef, TableSchema},
};
use std::collections::BTreeSet;

pub(crate) struct FilteringInputs<'a> {
    pub schema: &'a TableSchema,
    pub partition: &'a PartitionRestrictions,
    pub clustering: &'a ClusteringRestrictions,
    pub nonprimary: &'a SingleColumnRestrictions,
    pub chosen: Option<&'a ChosenIndex>,
}

impl FilteringInputs<'_> {
    /// Whether the query must evaluate residual restrictions row by row.
    pub(crate) fn needs_filtering(&self) -> bool {
        // One token maps to any number of partitions, so an indexed query
        // cannot form a tight clustering prefix under a token restriction.
        if self.chosen.is_some() && self.partition.has_token() {
            return true;
        }

        !self.unserved_columns().is_empty()
    }

    /// Column definitions the execution layer needs for row filtering,
    /// in schema declaration order.
    pub(crate) fn columns_for_filtering(&self) -> Vec<ColumnDef> {
        let unserved = self.unserved_columns();

        let mut out: Vec<ColumnDef> = Vec::with_capacity(unserved.len());
        for column in self.schema.partition_columns() {
            if unserved.contains(column.name.as_str()) {
                out.push(column.clone());
            }
        }
        for column in self.schema.clustering_columns() {
            if unserved.contains(column.name.as_str()) {
                out.push(column.clone());
            }
        }
        for name in &unserved {
            if let Some(column) = self.schema.column(name)
                && !column.kind.is_primary()
            {
                out.push(column.clone());
            }
        }

        out
    }

    fn drives(&self, column: &str, op: Operator, rhs: &Operand) -> bool {
        self.chosen.is_some_and(|chosen| {
            chosen.driving.single_column() == Some(column)
                && chosen.driving.op == op
                && chosen.driving.rhs == *rhs
        })
    }

    /// Names of columns carrying restrictions key ranges cannot serve.
    fn unserved_columns(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        let partition_complete = self.partition.explicit_complete();

        // Explicit partition values that do not enumerate a full key.
        if let PartitionMode::Columns(slots) = &self.partition.mode
            && !partition_complete
        {
            for (position, slot) in slots.iter().enumerate() {
                let Some(values) = slot else { continue };
                let Some(column) = self.schema.partition_column(position) else {
                    continue;
                };
                let (op, rhs) = match values {
                    ColumnValues::Eq(rhs) => (Operator::Eq, rhs),
                    ColumnValues::In(rhs) => (Operator::In, rhs),
                };
                if !self.drives(&column.name, op, rhs) {
                    out.insert(column.name.as_str());
                }
            }
        }

        // Partition residue can never narrow placement.
        for atom in &self.partition.residue {
            if let Some(column) = atom.single_column()
                && !self.drives(column, atom.op, &atom.rhs)
            {
                out.insert(column);
            }
        }

        // Clustering restrictions: the usable prefix is served only under a
        // complete partition key; everything past it is not.
        match &self.clustering.mode {
            ClusteringMode::Single(slots) => {
                let usable = self.clustering.usable_prefix_len();
                for (position, slot) in slots.iter().enumerate() {
                    if !slot.is_restricted() || (partition_complete && position < usable) {
                        continue;
                    }
                    let Some(column) = self.schema.clustering_column(position) else {
                        continue;
                    };
                    let driven = match slot {
                        SingleSlot::Eq(rhs) => self.drives(&column.name, Operator::Eq, rhs),
                        _ => false,
                    };
                    if !driven {
                        out.insert(column.name.as_str());
                    }
                }
            }
            ClusteringMode::Multi(multi) => {
                if !partition_complete {
                    for position in 0..multi.covered {
                        if let Some(column) = self.schema.clustering_column(position) {
                            out.insert(column.name.as_str());
                        }
                    }
                }
            }
            ClusteringMode::Empty => {}
        }
        for atom in &self.clustering.residue {
            if let Some(column) = atom.single_column()
                && !self.drives(column, atom.op, &atom.rhs)
            {
                out.insert(column);
            }
        }

        // Non-primary-key restrictions are only served by the chosen index.
        for atom in self.nonprimary.iter_atoms() {
            if let Some(column) = atom.single_column()
                && !self.drives(column, atom.op, &atom.rhs)
            {
                out.insert(column);
            }
        }

        out
    }
}
