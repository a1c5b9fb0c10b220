//! Column name → position index

use crate::error::SchemaError;
use indexmap::IndexMap;

/// Maps column names to zero-based positions within a row.
///
/// Positions always form a permutation of `0..len`, and iteration order is
/// position order. Built once per table (or per reshaping projection) and
/// immutable thereafter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnIndex {
    positions: IndexMap<String, usize>,
}

impl ColumnIndex {
    /// Build an index from an ordered name list; the i-th name gets
    /// position i.
    pub fn from_names<I, S>(names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut positions = IndexMap::new();
        for name in names {
            let name = name.into();
            let next = positions.len();
            if positions.insert(name.clone(), next).is_some() {
                return Err(SchemaError::DuplicateColumn(name));
            }
        }
        Ok(ColumnIndex { positions })
    }

    /// Build an index from explicit name → position pairs. The positions
    /// must cover `0..n` exactly once.
    pub fn from_positions<I, S>(pairs: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut pairs: Vec<(String, usize)> = pairs
            .into_iter()
            .map(|(name, pos)| (name.into(), pos))
            .collect();
        pairs.sort_by_key(|&(_, pos)| pos);

        let total = pairs.len();
        let mut positions = IndexMap::with_capacity(total);
        for (expected, (name, pos)) in pairs.into_iter().enumerate() {
            if pos != expected {
                return Err(SchemaError::BrokenPermutation(total));
            }
            if positions.insert(name.clone(), pos).is_some() {
                return Err(SchemaError::DuplicateColumn(name));
            }
        }
        Ok(ColumnIndex { positions })
    }

    /// Position of `name`, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Position of `name`, or a schema error naming the offender.
    pub fn resolve(&self, name: &str) -> Result<usize, SchemaError> {
        self.position(name)
            .ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Column names ordered by position.
    pub fn columns(&self) -> Vec<&str> {
        self.positions.keys().map(String::as_str).collect()
    }

    /// (name, position) pairs in position order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.positions.iter().map(|(name, &pos)| (name.as_str(), pos))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
