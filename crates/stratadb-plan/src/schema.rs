//! Read-only schema and index-candidate snapshots consumed during planning.
//!
//! These are minimal runtime descriptors resolved by the catalog before
//! preparation starts; planning never mutates them and never reaches back
//! into the catalog.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::sync::Arc;

///
/// ColumnKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ColumnKind {
    PartitionKey,
    ClusteringKey,
    Regular,
    Static,
}

impl ColumnKind {
    #[must_use]
    pub const fn is_primary(self) -> bool {
        matches!(self, Self::PartitionKey | Self::ClusteringKey)
    }
}

///
/// ColumnType
///
/// Minimal type surface needed by restriction resolution. A lossy projection
/// of catalog types: planning only needs literal compatibility and whether a
/// column holds a collection.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ColumnType {
    Bool,
    Int,
    Text,
    Bytes,
    Uuid,
    List(Box<ColumnType>),
    Set(Box<ColumnType>),
    Map {
        key: Box<ColumnType>,
        value: Box<ColumnType>,
    },
}

impl ColumnType {
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_) | Self::Map { .. })
    }

    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map { .. })
    }

    /// Whether a resolved literal is shape-compatible with this type.
    /// Null is accepted everywhere; nullability is a range-time concern.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null)
            | (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Text, Value::Text(_))
            | (Self::Bytes, Value::Bytes(_))
            | (Self::Uuid, Value::Uuid(_)) => true,
            (Self::List(inner) | Self::Set(inner), Value::List(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            _ => false,
        }
    }
}

///
/// ColumnDef
///
/// Schema-bound column identity. `position` is the index inside the column's
/// own kind bucket (partition position, clustering position, or declaration
/// order for regular/static columns).
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    pub position: usize,
    pub ty: ColumnType,
}

impl Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

///
/// TableSchema
///
/// Immutable snapshot of one table's column layout. Column identity is bound
/// to the owning schema: comparing columns across snapshots with different
/// `(keyspace, table, version)` identities is meaningless.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableSchema {
    keyspace: String,
    table: String,
    version: u64,
    columns: Vec<ColumnDef>,
    partition_len: usize,
    clustering_len: usize,
}

pub type SchemaRef = Arc<TableSchema>;

impl TableSchema {
    /// Build a snapshot from per-kind column lists. Key order is positional.
    #[must_use]
    pub fn new(
        keyspace: impl Into<String>,
        table: impl Into<String>,
        version: u64,
        partition: Vec<(&str, ColumnType)>,
        clustering: Vec<(&str, ColumnType)>,
        regular: Vec<(&str, ColumnType)>,
        statics: Vec<(&str, ColumnType)>,
    ) -> Self {
        let mut columns = Vec::new();
        let partition_len = partition.len();
        let clustering_len = clustering.len();

        let buckets = [
            (ColumnKind::PartitionKey, partition),
            (ColumnKind::ClusteringKey, clustering),
            (ColumnKind::Regular, regular),
            (ColumnKind::Static, statics),
        ];
        for (kind, defs) in buckets {
            for (position, (name, ty)) in defs.into_iter().enumerate() {
                columns.push(ColumnDef {
                    name: name.to_string(),
                    kind,
                    position,
                    ty,
                });
            }
        }

        Self {
            keyspace: keyspace.into(),
            table: table.into(),
            version,
            columns,
            partition_len,
            clustering_len,
        }
    }

    #[must_use]
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Whether two snapshots denote the same schema identity.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        self.keyspace == other.keyspace
            && self.table == other.table
            && self.version == other.version
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|col| col.name == name)
    }

    #[must_use]
    pub const fn partition_key_len(&self) -> usize {
        self.partition_len
    }

    #[must_use]
    pub const fn clustering_key_len(&self) -> usize {
        self.clustering_len
    }

    /// Partition-key columns in key order.
    pub fn partition_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns
            .iter()
            .filter(|col| col.kind == ColumnKind::PartitionKey)
    }

    /// Clustering-key columns in key order.
    pub fn clustering_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns
            .iter()
            .filter(|col| col.kind == ColumnKind::ClusteringKey)
    }

    #[must_use]
    pub fn partition_column(&self, position: usize) -> Option<&ColumnDef> {
        self.partition_columns().nth(position)
    }

    #[must_use]
    pub fn clustering_column(&self, position: usize) -> Option<&ColumnDef> {
        self.clustering_columns().nth(position)
    }
}

impl Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}@v{}", self.keyspace, self.table, self.version)
    }
}

///
/// IndexLocality
///
/// Local indexes are co-located with their base partition; global indexes
/// are independently partitioned and need hash-coordinate translation.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum IndexLocality {
    Local,
    Global,
}

///
/// IndexCandidate
///
/// One secondary index offered by the index manager for the duration of
/// planning; read-only.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexCandidate {
    pub name: String,
    pub column: String,
    pub locality: IndexLocality,
}

impl IndexCandidate {
    #[must_use]
    pub fn new(name: impl Into<String>, column: impl Into<String>, locality: IndexLocality) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            locality,
        }
    }
}

impl Display for IndexCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locality = match self.locality {
            IndexLocality::Local => "local",
            IndexLocality::Global => "global",
        };
        write!(f, "{}({}, {locality})", self.name, self.column)
    }
}
