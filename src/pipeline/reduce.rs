//! Named statistics and one-pass folds
//!
//! Every named statistic is a step/seed/finalize triple; requesting several
//! at once fuses them into a single traversal of the stream. Terminal
//! aggregates dispatch on the pipeline flavour: a [`ScalarPipeline`] folds
//! to one value, while the same call on a [`Pipeline`] steps one
//! accumulator per column in scope (still a single traversal) and returns
//! an ordered name-to-result mapping.

use super::pipeline::{Pipeline, ScalarPipeline};
use crate::error::ArgumentError;
use crate::table::{Row, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// The fixed set of named statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    Sum,
    Count,
    Min,
    Max,
    Mean,
    CountUniq,
}

impl Stat {
    pub const ALL: [Stat; 6] = [
        Stat::Sum,
        Stat::Count,
        Stat::Min,
        Stat::Max,
        Stat::Mean,
        Stat::CountUniq,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stat::Sum => "sum",
            Stat::Count => "count",
            Stat::Min => "min",
            Stat::Max => "max",
            Stat::Mean => "mean",
            Stat::CountUniq => "countUniq",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stat {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Stat::Sum),
            "count" => Ok(Stat::Count),
            "min" => Ok(Stat::Min),
            "max" => Ok(Stat::Max),
            "mean" => Ok(Stat::Mean),
            "countUniq" | "count_uniq" => Ok(Stat::CountUniq),
            other => Err(ArgumentError::UnknownStat(other.to_string())),
        }
    }
}

/// Running state for one statistic: the variant payload is the seed,
/// [`StatAcc::step`] folds one element, [`StatAcc::finish`] finalizes.
pub(crate) enum StatAcc {
    Sum(Value),
    Count(i64),
    Min(Value),
    Max(Value),
    Mean { count: i64, sum: Value },
    CountUniq(HashSet<Value>),
}

impl StatAcc {
    pub(crate) fn seed(stat: Stat) -> StatAcc {
        match stat {
            Stat::Sum => StatAcc::Sum(Value::Int(0)),
            Stat::Count => StatAcc::Count(0),
            Stat::Min => StatAcc::Min(Value::Float(f64::INFINITY)),
            Stat::Max => StatAcc::Max(Value::Float(f64::NEG_INFINITY)),
            Stat::Mean => StatAcc::Mean {
                count: 0,
                sum: Value::Int(0),
            },
            Stat::CountUniq => StatAcc::CountUniq(HashSet::new()),
        }
    }

    pub(crate) fn step(&mut self, value: &Value) {
        match self {
            StatAcc::Sum(acc) => *acc = acc.add(value),
            StatAcc::Count(count) => *count += 1,
            // Keep-lesser/keep-greater: the accumulator survives only a
            // strict win, so an incomparable element replaces it.
            StatAcc::Min(min) => {
                if !matches!((*min).partial_cmp(value), Some(Ordering::Less)) {
                    *min = value.clone();
                }
            }
            StatAcc::Max(max) => {
                if !matches!((*max).partial_cmp(value), Some(Ordering::Greater)) {
                    *max = value.clone();
                }
            }
            StatAcc::Mean { count, sum } => {
                *count += 1;
                *sum = sum.add(value);
            }
            StatAcc::CountUniq(seen) => {
                seen.insert(value.clone());
            }
        }
    }

    pub(crate) fn finish(self) -> Value {
        match self {
            StatAcc::Sum(acc) => acc,
            StatAcc::Count(count) => Value::Int(count),
            StatAcc::Min(min) => min,
            StatAcc::Max(max) => max,
            StatAcc::Mean { count, sum } => {
                Value::Float(sum.as_f64().unwrap_or(f64::NAN) / count as f64)
            }
            StatAcc::CountUniq(seen) => Value::Int(seen.len() as i64),
        }
    }
}

/// Fuse several statistics into one pass over a value stream; results come
/// back in request order.
fn fold_values<I>(values: I, stats: &[Stat]) -> Vec<Value>
where
    I: Iterator<Item = Value>,
{
    let mut accs: Vec<StatAcc> = stats.iter().map(|&stat| StatAcc::seed(stat)).collect();
    for value in values {
        for acc in accs.iter_mut() {
            acc.step(&value);
        }
    }
    accs.into_iter().map(StatAcc::finish).collect()
}

fn fold_one<I>(values: I, stat: Stat) -> Value
where
    I: Iterator<Item = Value>,
{
    let mut acc = StatAcc::seed(stat);
    for value in values {
        acc.step(&value);
    }
    acc.finish()
}

impl ScalarPipeline {
    /// One-pass generic fold over the output values.
    pub fn reduce<A, F>(&self, seed: A, mut step: F) -> A
    where
        F: FnMut(A, Value) -> A,
    {
        let mut acc = seed;
        for value in self.iter() {
            acc = step(acc, value);
        }
        acc
    }

    /// Fold several named statistics simultaneously, in request order.
    pub fn stats(&self, stats: &[Stat]) -> Result<Vec<Value>, ArgumentError> {
        if stats.is_empty() {
            return Err(ArgumentError::EmptyStats);
        }
        Ok(fold_values(self.iter(), stats))
    }

    /// Number of output values.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Numeric sum; `Int` streams stay exact.
    pub fn sum(&self) -> Value {
        fold_one(self.iter(), Stat::Sum)
    }

    /// Smallest value under keep-lesser; `Float(+∞)` over an empty stream.
    pub fn min(&self) -> Value {
        fold_one(self.iter(), Stat::Min)
    }

    /// Largest value under keep-greater; `Float(−∞)` over an empty stream.
    pub fn max(&self) -> Value {
        fold_one(self.iter(), Stat::Max)
    }

    /// Arithmetic mean; NaN over an empty stream.
    pub fn mean(&self) -> f64 {
        fold_one(self.iter(), Stat::Mean)
            .as_f64()
            .unwrap_or(f64::NAN)
    }

    /// Number of distinct output values.
    pub fn count_uniq(&self) -> usize {
        let mut seen = HashSet::new();
        for value in self.iter() {
            seen.insert(value);
        }
        seen.len()
    }
}

impl Pipeline {
    /// One-pass generic fold over whole rows. See
    /// [`Pipeline::reduce_each`] for the per-column form.
    pub fn reduce<A, F>(&self, seed: A, mut step: F) -> A
    where
        F: FnMut(A, Row) -> A,
    {
        let mut acc = seed;
        for row in self.iter() {
            acc = step(acc, row);
        }
        acc
    }

    /// Independent per-column folds in a single traversal: `seed` is
    /// cloned per column and `step` sees that column's cells in row order.
    pub fn reduce_each<A, F>(&self, seed: A, step: F) -> IndexMap<String, A>
    where
        A: Clone,
        F: Fn(A, Value) -> A,
    {
        let width = self.index.len();
        let mut slots: Vec<Option<A>> = vec![Some(seed); width];
        for row in self.iter() {
            let mut cells = row.into_iter();
            for slot in slots.iter_mut() {
                let value = cells.next().unwrap_or(Value::Null);
                if let Some(acc) = slot.take() {
                    *slot = Some(step(acc, value));
                }
            }
        }
        self.index
            .columns()
            .into_iter()
            .map(String::from)
            .zip(slots.into_iter().flatten())
            .collect()
    }

    /// One accumulator set per column, stepped together in a single pass.
    fn fold_columns(&self, stats: &[Stat]) -> IndexMap<String, Vec<Value>> {
        let width = self.index.len();
        let mut accs: Vec<Vec<StatAcc>> = (0..width)
            .map(|_| stats.iter().map(|&stat| StatAcc::seed(stat)).collect())
            .collect();
        let null = Value::Null;
        for row in self.iter() {
            for (pos, column) in accs.iter_mut().enumerate() {
                let value = row.get(pos).unwrap_or(&null);
                for acc in column.iter_mut() {
                    acc.step(value);
                }
            }
        }
        self.index
            .columns()
            .into_iter()
            .map(String::from)
            .zip(
                accs.into_iter()
                    .map(|column| column.into_iter().map(StatAcc::finish).collect()),
            )
            .collect()
    }

    fn fold_columns_one(&self, stat: Stat) -> IndexMap<String, Value> {
        self.fold_columns(&[stat])
            .into_iter()
            .map(|(name, mut results)| (name, results.pop().unwrap_or(Value::Null)))
            .collect()
    }

    /// Fold several named statistics per column, in request order.
    pub fn stats(&self, stats: &[Stat]) -> Result<IndexMap<String, Vec<Value>>, ArgumentError> {
        if stats.is_empty() {
            return Err(ArgumentError::EmptyStats);
        }
        Ok(self.fold_columns(stats))
    }

    /// Row count, replicated per column name.
    pub fn count(&self) -> IndexMap<String, usize> {
        let rows = self.iter().count();
        self.index
            .columns()
            .into_iter()
            .map(|name| (name.to_string(), rows))
            .collect()
    }

    /// Per-column numeric sum.
    pub fn sum(&self) -> IndexMap<String, Value> {
        self.fold_columns_one(Stat::Sum)
    }

    /// Per-column minimum.
    pub fn min(&self) -> IndexMap<String, Value> {
        self.fold_columns_one(Stat::Min)
    }

    /// Per-column maximum.
    pub fn max(&self) -> IndexMap<String, Value> {
        self.fold_columns_one(Stat::Max)
    }

    /// Per-column arithmetic mean.
    pub fn mean(&self) -> IndexMap<String, f64> {
        self.fold_columns_one(Stat::Mean)
            .into_iter()
            .map(|(name, value)| (name, value.as_f64().unwrap_or(f64::NAN)))
            .collect()
    }

    /// Per-column distinct count.
    pub fn count_uniq(&self) -> IndexMap<String, usize> {
        self.fold_columns_one(Stat::CountUniq)
            .into_iter()
            .map(|(name, value)| {
                let distinct = match value {
                    Value::Int(n) => n as usize,
                    _ => 0,
                };
                (name, distinct)
            })
            .collect()
    }
}
