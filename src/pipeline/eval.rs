//! Pull-based pipeline evaluation
//!
//! Drives source rows through the action list left to right in a single
//! forward pass: a failing filter aborts the row, a projection replaces the
//! working datum (and, when reshaping, the effective index seen by later
//! stages of that row), and Drop/Take advance per-evaluation counters. Once
//! a Take bound is reached nothing downstream can ever pass again, so the
//! source is not consumed further.

use super::action::{Action, Datum, EffectiveIndex, Reshape};
use crate::table::{Row, Source, Table, Value};
use std::sync::Arc;
use tracing::trace;

enum SourceIter<'a> {
    Rows(std::slice::Iter<'a, Row>),
    Values(std::slice::Iter<'a, Value>),
}

impl SourceIter<'_> {
    fn pull(&mut self) -> Option<Datum> {
        match self {
            SourceIter::Rows(rows) => rows.next().map(|row| Datum::Row(row.clone())),
            SourceIter::Values(values) => {
                values.next().map(|value| Datum::Scalar(value.clone()))
            }
        }
    }
}

/// One evaluation pass over a pipeline.
///
/// Take/Drop counters are keyed by action position and owned here, so
/// separate evaluations of one pipeline value never share state.
pub(crate) struct Eval<'a> {
    source: SourceIter<'a>,
    actions: &'a [Arc<Action>],
    base_index: EffectiveIndex<'a>,
    counters: Vec<usize>,
    done: bool,
}

impl<'a> Eval<'a> {
    pub(crate) fn new(table: &'a Table, actions: &'a [Arc<Action>]) -> Self {
        trace!(
            rows = table.len(),
            actions = actions.len(),
            "evaluating pipeline"
        );
        let source = match &table.source {
            Source::Rows(rows) => SourceIter::Rows(rows.iter()),
            Source::Values(values) => SourceIter::Values(values.iter()),
        };
        // A zero Take bound can never pass anything; skip the scan outright.
        let done = actions
            .iter()
            .any(|action| matches!(action.as_ref(), Action::Take(0)));
        Eval {
            source,
            actions,
            base_index: table.index.as_ref(),
            counters: vec![0; actions.len()],
            done,
        }
    }
}

impl Iterator for Eval<'_> {
    type Item = Datum;

    fn next(&mut self) -> Option<Datum> {
        let actions = self.actions;
        'rows: while !self.done {
            let mut datum = self.source.pull()?;
            let mut index = self.base_index;
            for (pos, action) in actions.iter().enumerate() {
                match action.as_ref() {
                    Action::Filter(pred) => {
                        if !pred(&datum, index) {
                            continue 'rows;
                        }
                    }
                    Action::Project { apply, reshape } => {
                        datum = apply(datum, index);
                        match reshape {
                            Reshape::Keep => {}
                            Reshape::Rows(replacement) => index = Some(replacement),
                            Reshape::Scalar => index = None,
                        }
                    }
                    Action::Drop(bound) => {
                        let seen = self.counters[pos];
                        self.counters[pos] += 1;
                        if seen < *bound {
                            continue 'rows;
                        }
                    }
                    Action::Take(bound) => {
                        if self.counters[pos] >= *bound {
                            // Nothing downstream of this stage can pass again.
                            self.done = true;
                            continue 'rows;
                        }
                        self.counters[pos] += 1;
                        if self.counters[pos] == *bound {
                            // Current datum still flows; stop pulling after it.
                            self.done = true;
                        }
                    }
                }
            }
            return Some(datum);
        }
        None
    }
}
