//! Grouping engine
//!
//! `group_by` buckets a pipeline's output by key into an ordered mapping of
//! fresh sub-pipelines over the partitioned rows. The [`Flock`] wrapper
//! broadcasts the whole pipeline vocabulary while its values are pipelines;
//! a terminal broadcast yields a plain ordered mapping whose type exposes
//! no further chain operations. The capability lives in the type parameter,
//! not in a runtime flag.

use super::pipeline::{Pipeline, ScalarPipeline};
use super::reduce::Stat;
use crate::error::{ArgumentError, Error, SchemaError};
use crate::table::{ColumnIndex, Row, Value};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// Ordered key → value mapping produced by grouping, in first-seen key
/// order.
#[derive(Clone, Debug, PartialEq)]
pub struct Flock<V> {
    groups: IndexMap<Value, V>,
}

impl<V> Flock<V> {
    /// Wrap a caller-built mapping.
    pub fn new(groups: IndexMap<Value, V>) -> Self {
        Flock { groups }
    }

    pub fn get(&self, key: &Value) -> Option<&V> {
        self.groups.get(key)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.groups.contains_key(key)
    }

    /// Keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.groups.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &V)> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Apply `f` to every entry, collecting the results in key order.
    pub fn map_entries<T, F>(&self, mut f: F) -> Vec<T>
    where
        F: FnMut(&Value, &V) -> T,
    {
        self.groups.iter().map(|(key, value)| f(key, value)).collect()
    }

    /// Unwrap into the underlying ordered map.
    pub fn into_map(self) -> IndexMap<Value, V> {
        self.groups
    }

    fn broadcast<T, F>(&self, f: F) -> Flock<T>
    where
        F: Fn(&V) -> T,
    {
        Flock {
            groups: self
                .groups
                .iter()
                .map(|(key, value)| (key.clone(), f(value)))
                .collect(),
        }
    }

    fn try_broadcast<T, E, F>(&self, f: F) -> Result<Flock<T>, E>
    where
        F: Fn(&V) -> Result<T, E>,
    {
        let mut groups = IndexMap::with_capacity(self.groups.len());
        for (key, value) in &self.groups {
            groups.insert(key.clone(), f(value)?);
        }
        Ok(Flock { groups })
    }
}

impl<V> IntoIterator for Flock<V> {
    type Item = (Value, V);
    type IntoIter = indexmap::map::IntoIter<Value, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a Flock<V> {
    type Item = (&'a Value, &'a V);
    type IntoIter = indexmap::map::Iter<'a, Value, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

impl Pipeline {
    /// Partition output rows by the raw value in column `name`, in
    /// first-seen key order.
    pub fn group_by(&self, name: &str) -> Result<Flock<Pipeline>, SchemaError> {
        self.group_rows(name, |value| value.clone())
    }

    /// Partition output rows by a key derived from column `name`.
    pub fn group_by_key<F>(&self, name: &str, key: F) -> Result<Flock<Pipeline>, SchemaError>
    where
        F: Fn(&Value) -> Value,
    {
        self.group_rows(name, key)
    }

    fn group_rows<F>(&self, name: &str, key: F) -> Result<Flock<Pipeline>, SchemaError>
    where
        F: Fn(&Value) -> Value,
    {
        let pos = self.index.resolve(name)?;
        let mut buckets: IndexMap<Value, Vec<Row>> = IndexMap::new();
        for row in self.iter() {
            let cell = row.get(pos).cloned().unwrap_or(Value::Null);
            buckets.entry(key(&cell)).or_default().push(row);
        }
        debug!(column = name, groups = buckets.len(), "partitioned row stream");
        let groups = buckets
            .into_iter()
            .map(|(k, rows)| (k, Pipeline::partitioned(rows, Arc::clone(&self.index))))
            .collect();
        Ok(Flock { groups })
    }

    /// Wrap a caller-built key → pipeline mapping in the same chainable
    /// structure `group_by` produces.
    pub fn flock<F>(&self, builder: F) -> Flock<Pipeline>
    where
        F: FnOnce(&Pipeline) -> IndexMap<Value, Pipeline>,
    {
        Flock::new(builder(self))
    }
}

impl ScalarPipeline {
    /// Partition output values by themselves, in first-seen key order.
    pub fn group_by(&self) -> Flock<ScalarPipeline> {
        self.group_values(|value| value.clone())
    }

    /// Partition output values by a derived key.
    pub fn group_by_key<F>(&self, key: F) -> Flock<ScalarPipeline>
    where
        F: Fn(&Value) -> Value,
    {
        self.group_values(key)
    }

    fn group_values<F>(&self, key: F) -> Flock<ScalarPipeline>
    where
        F: Fn(&Value) -> Value,
    {
        let mut buckets: IndexMap<Value, Vec<Value>> = IndexMap::new();
        for value in self.iter() {
            buckets.entry(key(&value)).or_default().push(value);
        }
        debug!(groups = buckets.len(), "partitioned scalar stream");
        let groups = buckets
            .into_iter()
            .map(|(k, values)| (k, ScalarPipeline::partitioned(values)))
            .collect();
        Flock { groups }
    }

    /// Wrap a caller-built key → pipeline mapping.
    pub fn flock<F>(&self, builder: F) -> Flock<ScalarPipeline>
    where
        F: FnOnce(&ScalarPipeline) -> IndexMap<Value, ScalarPipeline>,
    {
        Flock::new(builder(self))
    }
}

impl Flock<Pipeline> {
    pub fn filter<F>(&self, pred: F) -> Flock<Pipeline>
    where
        F: Fn(&Row, &ColumnIndex) -> bool + 'static,
    {
        let pred = Arc::new(pred);
        self.broadcast(|p| {
            let pred = Arc::clone(&pred);
            p.filter(move |row, index| (*pred)(row, index))
        })
    }

    pub fn filter_by<F>(&self, name: &str, pred: F) -> Result<Flock<Pipeline>, SchemaError>
    where
        F: Fn(&Value) -> bool + 'static,
    {
        let pred = Arc::new(pred);
        self.try_broadcast(|p| {
            let pred = Arc::clone(&pred);
            p.filter_by(name, move |value| (*pred)(value))
        })
    }

    pub fn map<F>(&self, f: F) -> Flock<Pipeline>
    where
        F: Fn(&Row, &ColumnIndex) -> Row + 'static,
    {
        let f = Arc::new(f);
        self.broadcast(|p| {
            let f = Arc::clone(&f);
            p.map(move |row, index| (*f)(row, index))
        })
    }

    pub fn col(&self, name: &str) -> Result<Flock<ScalarPipeline>, SchemaError> {
        self.try_broadcast(|p| p.col(name))
    }

    pub fn cols(&self, names: &[&str]) -> Result<Flock<Pipeline>, Error> {
        self.try_broadcast(|p| p.cols(names))
    }

    pub fn take(&self, n: usize) -> Flock<Pipeline> {
        self.broadcast(|p| p.take(n))
    }

    pub fn drop(&self, n: usize) -> Flock<Pipeline> {
        self.broadcast(|p| p.drop(n))
    }

    pub fn skip(&self, n: usize) -> Flock<Pipeline> {
        self.broadcast(|p| p.skip(n))
    }

    pub fn to_vec(&self) -> Flock<Vec<Row>> {
        self.broadcast(Pipeline::to_vec)
    }

    pub fn uniq(&self) -> Flock<Vec<Row>> {
        self.broadcast(Pipeline::uniq)
    }

    pub fn reduce<A, F>(&self, seed: A, step: F) -> Flock<A>
    where
        A: Clone,
        F: Fn(A, Row) -> A,
    {
        self.broadcast(|p| p.reduce(seed.clone(), &step))
    }

    pub fn reduce_each<A, F>(&self, seed: A, step: F) -> Flock<IndexMap<String, A>>
    where
        A: Clone,
        F: Fn(A, Value) -> A,
    {
        self.broadcast(|p| p.reduce_each(seed.clone(), &step))
    }

    pub fn count(&self) -> Flock<IndexMap<String, usize>> {
        self.broadcast(Pipeline::count)
    }

    pub fn sum(&self) -> Flock<IndexMap<String, Value>> {
        self.broadcast(Pipeline::sum)
    }

    pub fn min(&self) -> Flock<IndexMap<String, Value>> {
        self.broadcast(Pipeline::min)
    }

    pub fn max(&self) -> Flock<IndexMap<String, Value>> {
        self.broadcast(Pipeline::max)
    }

    pub fn mean(&self) -> Flock<IndexMap<String, f64>> {
        self.broadcast(Pipeline::mean)
    }

    pub fn count_uniq(&self) -> Flock<IndexMap<String, usize>> {
        self.broadcast(Pipeline::count_uniq)
    }

    pub fn stats(
        &self,
        stats: &[Stat],
    ) -> Result<Flock<IndexMap<String, Vec<Value>>>, ArgumentError> {
        self.try_broadcast(|p| p.stats(stats))
    }

    pub fn group_by(&self, name: &str) -> Result<Flock<Flock<Pipeline>>, SchemaError> {
        self.try_broadcast(|p| p.group_by(name))
    }
}

impl Flock<ScalarPipeline> {
    pub fn filter<F>(&self, pred: F) -> Flock<ScalarPipeline>
    where
        F: Fn(&Value) -> bool + 'static,
    {
        let pred = Arc::new(pred);
        self.broadcast(|p| {
            let pred = Arc::clone(&pred);
            p.filter(move |value| (*pred)(value))
        })
    }

    pub fn map<F>(&self, f: F) -> Flock<ScalarPipeline>
    where
        F: Fn(&Value) -> Value + 'static,
    {
        let f = Arc::new(f);
        self.broadcast(|p| {
            let f = Arc::clone(&f);
            p.map(move |value| (*f)(value))
        })
    }

    pub fn take(&self, n: usize) -> Flock<ScalarPipeline> {
        self.broadcast(|p| p.take(n))
    }

    pub fn drop(&self, n: usize) -> Flock<ScalarPipeline> {
        self.broadcast(|p| p.drop(n))
    }

    pub fn skip(&self, n: usize) -> Flock<ScalarPipeline> {
        self.broadcast(|p| p.skip(n))
    }

    pub fn to_vec(&self) -> Flock<Vec<Value>> {
        self.broadcast(ScalarPipeline::to_vec)
    }

    pub fn uniq(&self) -> Flock<Vec<Value>> {
        self.broadcast(ScalarPipeline::uniq)
    }

    pub fn reduce<A, F>(&self, seed: A, step: F) -> Flock<A>
    where
        A: Clone,
        F: Fn(A, Value) -> A,
    {
        self.broadcast(|p| p.reduce(seed.clone(), &step))
    }

    pub fn count(&self) -> Flock<usize> {
        self.broadcast(ScalarPipeline::count)
    }

    pub fn sum(&self) -> Flock<Value> {
        self.broadcast(ScalarPipeline::sum)
    }

    pub fn min(&self) -> Flock<Value> {
        self.broadcast(ScalarPipeline::min)
    }

    pub fn max(&self) -> Flock<Value> {
        self.broadcast(ScalarPipeline::max)
    }

    pub fn mean(&self) -> Flock<f64> {
        self.broadcast(ScalarPipeline::mean)
    }

    pub fn count_uniq(&self) -> Flock<usize> {
        self.broadcast(ScalarPipeline::count_uniq)
    }

    pub fn stats(&self, stats: &[Stat]) -> Result<Flock<Vec<Value>>, ArgumentError> {
        self.try_broadcast(|p| p.stats(stats))
    }

    pub fn group_by(&self) -> Flock<Flock<ScalarPipeline>> {
        self.broadcast(ScalarPipeline::group_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    fn ints(values: &[i64]) -> Row {
        values.iter().map(|&v| Value::Int(v)).collect()
    }

    fn sample() -> Pipeline {
        let table = Table::with_names(
            vec![ints(&[1, 10]), ints(&[2, 20]), ints(&[1, 30])],
            ["a", "b"],
        )
        .unwrap();
        Pipeline::new(table).unwrap()
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let grouped = sample().group_by("a").unwrap();
        let keys: Vec<Value> = grouped.keys().cloned().collect();
        assert_eq!(keys, vec![Value::Int(1), Value::Int(2)]);

        let ones = grouped.get(&Value::Int(1)).map(Pipeline::to_vec);
        assert_eq!(ones, Some(vec![ints(&[1, 10]), ints(&[1, 30])]));
        let twos = grouped.get(&Value::Int(2)).map(Pipeline::to_vec);
        assert_eq!(twos, Some(vec![ints(&[2, 20])]));
    }

    #[test]
    fn test_group_by_unknown_column() {
        let err = sample().group_by("zzz").unwrap_err();
        assert_eq!(err, SchemaError::UnknownColumn("zzz".to_string()));
    }

    #[test]
    fn test_group_by_key_function() {
        let grouped = sample()
            .group_by_key("b", |v| {
                Value::Int(v.as_f64().map_or(0, |x| (x / 25.0).ceil() as i64))
            })
            .unwrap();
        let keys: Vec<Value> = grouped.keys().cloned().collect();
        assert_eq!(keys, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_union_of_buckets_is_the_output() {
        use std::collections::HashMap;

        let p = sample();
        let grouped = p.group_by("a").unwrap();
        let mut union: HashMap<Row, usize> = HashMap::new();
        for (_, member) in grouped.iter() {
            for row in member.to_vec() {
                *union.entry(row).or_insert(0) += 1;
            }
        }
        let mut expected: HashMap<Row, usize> = HashMap::new();
        for row in p.to_vec() {
            *expected.entry(row).or_insert(0) += 1;
        }
        assert_eq!(union, expected);
    }

    #[test]
    fn test_broadcast_keeps_chaining() {
        // group → project → aggregate, all through the wrapper.
        let sums = sample().group_by("a").unwrap().col("b").unwrap().sum();
        assert_eq!(sums.get(&Value::Int(1)), Some(&Value::Int(40)));
        assert_eq!(sums.get(&Value::Int(2)), Some(&Value::Int(20)));
    }

    #[test]
    fn test_broadcast_filter() {
        let grouped = sample()
            .group_by("a")
            .unwrap()
            .filter_by("b", |v| *v != Value::Int(10))
            .unwrap()
            .to_vec();
        assert_eq!(
            grouped.get(&Value::Int(1)),
            Some(&vec![ints(&[1, 30])])
        );
        assert_eq!(
            grouped.get(&Value::Int(2)),
            Some(&vec![ints(&[2, 20])])
        );
    }

    #[test]
    fn test_terminal_broadcast_is_a_plain_mapping() {
        let materialized = sample().group_by("a").unwrap().to_vec();
        assert_eq!(materialized.len(), 2);
        let entries = materialized.map_entries(|key, rows| (key.clone(), rows.len()));
        assert_eq!(entries, vec![(Value::Int(1), 2), (Value::Int(2), 1)]);
    }

    #[test]
    fn test_scalar_group_by_keys_are_the_values() {
        let grouped = sample().col("a").unwrap().group_by();
        let keys: Vec<Value> = grouped.keys().cloned().collect();
        assert_eq!(keys, vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(grouped.count().get(&Value::Int(1)), Some(&2));
    }

    #[test]
    fn test_scalar_group_by_key_function() {
        let p = sample().col("b").unwrap();
        let grouped = p.group_by_key(|v| {
            Value::Bool(v.as_f64().map_or(false, |x| x > 15.0))
        });
        assert_eq!(grouped.get(&Value::Bool(false)).map(|g| g.count()), Some(1));
        assert_eq!(grouped.get(&Value::Bool(true)).map(|g| g.count()), Some(2));
    }

    #[test]
    fn test_flock_wraps_caller_built_mapping() {
        let p = sample();
        let wrapped = p.flock(|p| {
            let mut groups = IndexMap::new();
            groups.insert(Value::from("low"), p.take(1));
            groups.insert(Value::from("rest"), p.drop(1));
            groups
        });
        let counts = wrapped.count();
        assert_eq!(
            counts.get(&Value::from("low")).and_then(|c| c.get("a")),
            Some(&1)
        );
        assert_eq!(
            counts.get(&Value::from("rest")).and_then(|c| c.get("a")),
            Some(&2)
        );
    }

    #[test]
    fn test_nested_group_by() {
        let nested = sample().group_by("a").unwrap().group_by("b").unwrap();
        let inner = nested.get(&Value::Int(1)).map(Flock::len);
        assert_eq!(inner, Some(2));
    }
}
