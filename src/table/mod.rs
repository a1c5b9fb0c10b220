//! Core table, column index, and value types

pub mod index;
pub mod value;

pub use index::ColumnIndex;
pub use value::Value;

use crate::error::SchemaError;
use std::sync::Arc;

/// One fixed-width row of cells.
pub type Row = Vec<Value>;

/// Backing storage: fixed-width rows, or bare scalars when unindexed.
#[derive(Clone, Debug)]
pub(crate) enum Source {
    Rows(Vec<Row>),
    Values(Vec<Value>),
}

impl Source {
    pub(crate) fn len(&self) -> usize {
        match self {
            Source::Rows(rows) => rows.len(),
            Source::Values(values) => values.len(),
        }
    }
}

/// Immutable pairing of a row source and its column index.
///
/// Shared by `Arc` across every pipeline derived from it and never mutated
/// after construction.
#[derive(Clone, Debug)]
pub struct Table {
    pub(crate) source: Source,
    pub(crate) index: Option<Arc<ColumnIndex>>,
}

impl Table {
    /// Build a table of fixed-width rows described by `index`.
    ///
    /// Every row must be exactly as wide as the index.
    pub fn new(rows: Vec<Row>, index: ColumnIndex) -> Result<Self, SchemaError> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != index.len() {
                return Err(SchemaError::WidthMismatch {
                    row: i,
                    width: row.len(),
                    index: index.len(),
                });
            }
        }
        Ok(Table {
            source: Source::Rows(rows),
            index: Some(Arc::new(index)),
        })
    }

    /// Convenience: build the index from an ordered name list.
    pub fn with_names<I, S>(rows: Vec<Row>, names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(rows, ColumnIndex::from_names(names)?)
    }

    /// A table of bare scalars with no column index.
    pub fn unindexed(values: Vec<Value>) -> Self {
        Table {
            source: Source::Values(values),
            index: None,
        }
    }

    /// Number of rows (or scalars) in the source.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The column index, if this table is indexed.
    pub fn index(&self) -> Option<&ColumnIndex> {
        self.index.as_deref()
    }
}
