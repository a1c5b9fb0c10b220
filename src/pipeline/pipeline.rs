//! Pipeline construction
//!
//! Every chain call validates its arguments, appends one action, and
//! returns a fresh pipeline value; the table is shared by `Arc` and never
//! copied. The scalar/row distinction is carried by the type: [`Pipeline`]
//! streams fixed-width rows under an effective column index, and
//! [`ScalarPipeline`] (produced by `col` or an unindexed table) streams
//! bare values.

use super::action::{Action, Datum, Reshape};
use super::eval::Eval;
use crate::error::{ArgumentError, Error, SchemaError};
use crate::table::{ColumnIndex, Row, Source, Table, Value};
use indexmap::IndexSet;
use std::fmt;
use std::sync::Arc;

/// Shared spine of both pipeline flavours: a table plus the ordered action
/// list, copy-on-write on append.
#[derive(Clone)]
pub(crate) struct Chain {
    table: Arc<Table>,
    actions: Vec<Arc<Action>>,
}

impl Chain {
    fn over(table: Arc<Table>) -> Chain {
        Chain {
            table,
            actions: Vec::new(),
        }
    }

    fn push(&self, action: Action) -> Chain {
        let mut actions = self.actions.clone();
        actions.push(Arc::new(action));
        Chain {
            table: Arc::clone(&self.table),
            actions,
        }
    }

    pub(crate) fn eval(&self) -> Eval<'_> {
        Eval::new(&self.table, &self.actions)
    }

    fn debug_actions(&self) -> &[Arc<Action>] {
        &self.actions
    }
}

/// A lazy query streaming fixed-width rows.
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) chain: Chain,
    pub(crate) index: Arc<ColumnIndex>,
}

/// A lazy query streaming bare values, produced by [`Pipeline::col`] or an
/// unindexed table.
#[derive(Clone)]
pub struct ScalarPipeline {
    pub(crate) chain: Chain,
}

impl Pipeline {
    /// Wrap an indexed table. Fails on a scalar (unindexed) table.
    pub fn new(table: Table) -> Result<Self, SchemaError> {
        let index = table.index.clone().ok_or(SchemaError::MissingIndex)?;
        Ok(Pipeline {
            chain: Chain::over(Arc::new(table)),
            index,
        })
    }

    /// Bucket constructor for group partitions: rows come from a parent
    /// pipeline's output, so width validation is relaxed.
    pub(crate) fn partitioned(rows: Vec<Row>, index: Arc<ColumnIndex>) -> Self {
        let table = Table {
            source: Source::Rows(rows),
            index: Some(Arc::clone(&index)),
        };
        Pipeline {
            chain: Chain::over(Arc::new(table)),
            index,
        }
    }

    fn derive(&self, action: Action) -> Pipeline {
        Pipeline {
            chain: self.chain.push(action),
            index: Arc::clone(&self.index),
        }
    }

    /// The index in force after the last reshaping projection.
    pub fn index(&self) -> &ColumnIndex {
        &self.index
    }

    /// Column names in position order.
    pub fn columns(&self) -> Vec<&str> {
        self.index.columns()
    }

    /// Keep only rows satisfying `pred`, which receives each row together
    /// with the effective column index.
    pub fn filter<F>(&self, pred: F) -> Pipeline
    where
        F: Fn(&Row, &ColumnIndex) -> bool + 'static,
    {
        self.derive(Action::Filter(Box::new(move |datum, index| {
            match (datum.as_row(), index) {
                (Some(row), Some(ix)) => pred(row, ix),
                _ => false,
            }
        })))
    }

    /// Resolve `name` once, then filter on that cell.
    pub fn filter_by<F>(&self, name: &str, pred: F) -> Result<Pipeline, SchemaError>
    where
        F: Fn(&Value) -> bool + 'static,
    {
        let pos = self.index.resolve(name)?;
        Ok(self.filter(move |row, _| row.get(pos).map_or(false, |value| pred(value))))
    }

    /// Transform each row. The effective index is left untouched.
    pub fn map<F>(&self, f: F) -> Pipeline
    where
        F: Fn(&Row, &ColumnIndex) -> Row + 'static,
    {
        self.derive(Action::Project {
            apply: Box::new(move |datum, index| match (datum, index) {
                (Datum::Row(row), Some(ix)) => Datum::Row(f(&row, ix)),
                (datum, _) => datum,
            }),
            reshape: Reshape::Keep,
        })
    }

    /// Project a single column into a scalar stream.
    pub fn col(&self, name: &str) -> Result<ScalarPipeline, SchemaError> {
        let pos = self.index.resolve(name)?;
        let chain = self.chain.push(Action::Project {
            apply: Box::new(move |datum, _| match datum {
                Datum::Row(mut row) => Datum::Scalar(if pos < row.len() {
                    row.swap_remove(pos)
                } else {
                    Value::Null
                }),
                datum => datum,
            }),
            reshape: Reshape::Scalar,
        });
        Ok(ScalarPipeline { chain })
    }

    /// Project an ordered subset of columns; the new index renumbers them
    /// to positions `0..k`.
    pub fn cols(&self, names: &[&str]) -> Result<Pipeline, Error> {
        if names.is_empty() {
            return Err(ArgumentError::EmptyColumns.into());
        }
        let mut positions = Vec::with_capacity(names.len());
        for name in names {
            positions.push(self.index.resolve(name).map_err(Error::from)?);
        }
        let index = Arc::new(
            ColumnIndex::from_names(names.iter().copied()).map_err(Error::from)?,
        );
        let chain = self.chain.push(Action::Project {
            apply: Box::new(move |datum, _| match datum {
                Datum::Row(row) => Datum::Row(
                    positions
                        .iter()
                        .map(|&pos| row.get(pos).cloned().unwrap_or(Value::Null))
                        .collect(),
                ),
                datum => datum,
            }),
            reshape: Reshape::Rows(Arc::clone(&index)),
        });
        Ok(Pipeline { chain, index })
    }

    /// Pass at most the first `n` rows seen at this stage.
    pub fn take(&self, n: usize) -> Pipeline {
        self.derive(Action::Take(n))
    }

    /// Suppress the first `n` rows seen at this stage.
    ///
    /// `drop(0)` is the identity and appends nothing.
    pub fn drop(&self, n: usize) -> Pipeline {
        if n == 0 {
            self.clone()
        } else {
            self.derive(Action::Drop(n))
        }
    }

    /// Alias for [`Pipeline::drop`].
    pub fn skip(&self, n: usize) -> Pipeline {
        self.drop(n)
    }

    /// Lazily iterate the output rows; the source is only consumed as far
    /// as the caller pulls.
    pub fn iter(&self) -> impl Iterator<Item = Row> + '_ {
        self.chain.eval().filter_map(Datum::into_row)
    }

    /// Materialize every output row.
    pub fn to_vec(&self) -> Vec<Row> {
        self.iter().collect()
    }

    /// Materialize the distinct output rows, in first-occurrence order.
    pub fn uniq(&self) -> Vec<Row> {
        let distinct: IndexSet<Row> = self.iter().collect();
        distinct.into_iter().collect()
    }
}

impl ScalarPipeline {
    /// Wrap an unindexed table. Fails on an indexed table.
    pub fn new(table: Table) -> Result<Self, SchemaError> {
        if table.index.is_some() {
            return Err(SchemaError::UnexpectedIndex);
        }
        Ok(ScalarPipeline {
            chain: Chain::over(Arc::new(table)),
        })
    }

    /// Bucket constructor for group partitions.
    pub(crate) fn partitioned(values: Vec<Value>) -> Self {
        ScalarPipeline {
            chain: Chain::over(Arc::new(Table::unindexed(values))),
        }
    }

    fn derive(&self, action: Action) -> ScalarPipeline {
        ScalarPipeline {
            chain: self.chain.push(action),
        }
    }

    /// Keep only values satisfying `pred`.
    pub fn filter<F>(&self, pred: F) -> ScalarPipeline
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.derive(Action::Filter(Box::new(move |datum, _| {
            datum.as_scalar().map_or(false, |value| pred(value))
        })))
    }

    /// Transform each value.
    pub fn map<F>(&self, f: F) -> ScalarPipeline
    where
        F: Fn(&Value) -> Value + 'static,
    {
        self.derive(Action::Project {
            apply: Box::new(move |datum, _| match datum {
                Datum::Scalar(value) => Datum::Scalar(f(&value)),
                datum => datum,
            }),
            reshape: Reshape::Keep,
        })
    }

    /// Pass at most the first `n` values seen at this stage.
    pub fn take(&self, n: usize) -> ScalarPipeline {
        self.derive(Action::Take(n))
    }

    /// Suppress the first `n` values seen at this stage.
    ///
    /// `drop(0)` is the identity and appends nothing.
    pub fn drop(&self, n: usize) -> ScalarPipeline {
        if n == 0 {
            self.clone()
        } else {
            self.derive(Action::Drop(n))
        }
    }

    /// Alias for [`ScalarPipeline::drop`].
    pub fn skip(&self, n: usize) -> ScalarPipeline {
        self.drop(n)
    }

    /// Lazily iterate the output values.
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        self.chain.eval().filter_map(Datum::into_scalar)
    }

    /// Materialize every output value.
    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().collect()
    }

    /// Materialize the distinct output values, in first-occurrence order.
    pub fn uniq(&self) -> Vec<Value> {
        let distinct: IndexSet<Value> = self.iter().collect();
        distinct.into_iter().collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("columns", &self.index.columns())
            .field("actions", &self.chain.debug_actions())
            .finish()
    }
}

impl fmt::Debug for ScalarPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarPipeline")
            .field("actions", &self.chain.debug_actions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn ints(values: &[i64]) -> Row {
        values.iter().map(|&v| Value::Int(v)).collect()
    }

    fn sample() -> Pipeline {
        let table = Table::with_names(
            vec![ints(&[1, 10]), ints(&[2, 20]), ints(&[1, 30]), ints(&[4, 40]), ints(&[5, 50])],
            ["a", "b"],
        )
        .unwrap();
        Pipeline::new(table).unwrap()
    }

    #[test]
    fn test_no_actions_yields_source_order() {
        let p = sample();
        assert_eq!(
            p.to_vec(),
            vec![ints(&[1, 10]), ints(&[2, 20]), ints(&[1, 30]), ints(&[4, 40]), ints(&[5, 50])]
        );
    }

    #[test]
    fn test_new_rejects_unindexed_table() {
        let err = Pipeline::new(Table::unindexed(vec![Value::Int(1)])).unwrap_err();
        assert_eq!(err, SchemaError::MissingIndex);
    }

    #[test]
    fn test_scalar_new_rejects_indexed_table() {
        let table = Table::with_names(vec![ints(&[1])], ["a"]).unwrap();
        let err = ScalarPipeline::new(table).unwrap_err();
        assert_eq!(err, SchemaError::UnexpectedIndex);
    }

    #[test]
    fn test_chaining_never_mutates_the_receiver() {
        let p = sample();
        let filtered = p.filter(|row, ix| row[ix.position("a").unwrap_or(0)] == Value::Int(1));
        assert_eq!(filtered.to_vec().len(), 2);
        // The original pipeline still sees everything.
        assert_eq!(p.to_vec().len(), 5);
    }

    #[test]
    fn test_filter_receives_effective_index() {
        let p = sample();
        let narrowed = p.cols(&["b"]).unwrap();
        let out = narrowed
            .filter(|row, ix| {
                ix.position("b") == Some(0) && row[0] != Value::Int(20)
            })
            .to_vec();
        assert_eq!(out, vec![ints(&[10]), ints(&[30]), ints(&[40]), ints(&[50])]);
    }

    #[test]
    fn test_filter_by_resolves_name() {
        let p = sample();
        let out = p
            .filter_by("a", |v| *v == Value::Int(1))
            .unwrap()
            .to_vec();
        assert_eq!(out, vec![ints(&[1, 10]), ints(&[1, 30])]);

        let err = p.filter_by("missing", |_| true).unwrap_err();
        assert_eq!(err, SchemaError::UnknownColumn("missing".to_string()));
    }

    #[test]
    fn test_col_projects_scalars() {
        let p = sample();
        let out = p.col("b").unwrap().to_vec();
        assert_eq!(
            out,
            vec![Value::Int(10), Value::Int(20), Value::Int(30), Value::Int(40), Value::Int(50)]
        );
        assert!(p.col("zzz").is_err());
    }

    #[test]
    fn test_cols_renumbers_positions() {
        let p = sample();
        let narrowed = p.cols(&["b", "a"]).unwrap();
        assert_eq!(narrowed.columns(), vec!["b", "a"]);
        assert_eq!(narrowed.to_vec()[0], ints(&[10, 1]));

        assert!(matches!(
            p.cols(&[]),
            Err(Error::Argument(ArgumentError::EmptyColumns))
        ));
        assert!(matches!(p.cols(&["a", "zzz"]), Err(Error::Schema(_))));
    }

    #[test]
    fn test_map_keeps_index() {
        let p = sample();
        let doubled = p.map(|row, ix| {
            let pos = ix.position("a").unwrap_or(0);
            let mut row = row.clone();
            row[pos] = row[pos].add(&row[pos]);
            row
        });
        assert_eq!(doubled.columns(), vec!["a", "b"]);
        assert_eq!(doubled.to_vec()[0], ints(&[2, 10]));
    }

    #[test]
    fn test_take_drop_boundaries() {
        let p = sample();
        assert!(p.take(0).to_vec().is_empty());
        assert_eq!(p.take(2).to_vec().len(), 2);
        assert_eq!(p.take(100).to_vec().len(), 5);
        assert_eq!(p.drop(0).to_vec().len(), 5);
        assert_eq!(p.drop(3).to_vec(), vec![ints(&[4, 40]), ints(&[5, 50])]);
        assert_eq!(p.drop(100).to_vec().len(), 0);
    }

    #[test]
    fn test_slices_compose_positionally() {
        // take bounds the window first; drop re-offsets inside it.
        let p = sample();
        assert_eq!(p.take(2).drop(1).to_vec(), vec![ints(&[2, 20])]);
        assert_eq!(p.drop(1).take(2).to_vec(), vec![ints(&[2, 20]), ints(&[1, 30])]);
    }

    #[test]
    fn test_slice_counts_rows_seen_at_its_stage() {
        let p = sample();
        // Filter first: take counts surviving rows, not source rows.
        let out = p
            .filter_by("a", |v| *v == Value::Int(1))
            .unwrap()
            .take(2)
            .to_vec();
        assert_eq!(out, vec![ints(&[1, 10]), ints(&[1, 30])]);
    }

    #[test]
    fn test_take_stops_consuming_the_source() {
        let p = sample();
        let pulled = Rc::new(Cell::new(0));
        let probe = Rc::clone(&pulled);
        let out = p
            .filter(move |_, _| {
                probe.set(probe.get() + 1);
                true
            })
            .take(2)
            .to_vec();
        assert_eq!(out.len(), 2);
        // Early termination: rows past the bound were never visited.
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn test_counters_reset_between_evaluations() {
        let p = sample().take(2);
        assert_eq!(p.to_vec().len(), 2);
        assert_eq!(p.to_vec().len(), 2);
    }

    #[test]
    fn test_uniq_keeps_first_occurrence_order() {
        let p = sample();
        let out = p.col("a").unwrap().uniq();
        assert_eq!(
            out,
            vec![Value::Int(1), Value::Int(2), Value::Int(4), Value::Int(5)]
        );
    }

    #[test]
    fn test_scalar_chain() {
        let p = sample();
        let out = p
            .col("a")
            .unwrap()
            .filter(|v| v.as_f64().map_or(false, |x| x > 1.0))
            .map(|v| v.add(&Value::Int(100)))
            .to_vec();
        assert_eq!(out, vec![Value::Int(102), Value::Int(104), Value::Int(105)]);
    }

    #[test]
    fn test_scalar_pipeline_over_unindexed_table() {
        let p = ScalarPipeline::new(Table::unindexed(vec![
            Value::Int(3),
            Value::Int(1),
            Value::Int(3),
        ]))
        .unwrap();
        assert_eq!(p.uniq(), vec![Value::Int(3), Value::Int(1)]);
    }
}
