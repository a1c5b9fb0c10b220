//! Error taxonomy
//!
//! Two families: [`ArgumentError`] for invalid arguments to an operation,
//! [`SchemaError`] for anything that disagrees with a table's shape or its
//! column index. Validation happens in the call that introduces the bad
//! input, before any pipeline stage is appended, never mid-evaluation.

use thiserror::Error;

/// An operation received an invalid argument.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// `cols` was called with an empty name list
    #[error("column list is empty")]
    EmptyColumns,

    /// `stats` was called with no statistics
    #[error("no statistics requested")]
    EmptyStats,

    /// A statistic name outside the fixed set was requested
    #[error("unknown statistic `{0}`")]
    UnknownStat(String),
}

/// A name or shape disagrees with the table's column index.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The name is not present in the effective column index
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    /// The same name was given twice when building a column index
    #[error("duplicate column name `{0}`")]
    DuplicateColumn(String),

    /// Explicit positions do not cover 0..n exactly once
    #[error("column positions do not form a permutation of 0..{0}")]
    BrokenPermutation(usize),

    /// A row's width disagrees with the column index size
    #[error("row {row} is {width} values wide, column index describes {index}")]
    WidthMismatch {
        row: usize,
        width: usize,
        index: usize,
    },

    /// A row pipeline was requested over an unindexed (scalar) table
    #[error("table has no column index")]
    MissingIndex,

    /// A scalar pipeline was requested over an indexed table
    #[error("table carries a column index")]
    UnexpectedIndex,
}

/// Either error family, for operations that can fail both ways.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
