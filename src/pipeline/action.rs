//! Pipeline stages
//!
//! Each stage is a tagged [`Action`]. Predicates and transforms are boxed
//! closures over the stream [`Datum`]; the closures a pipeline operation
//! installs are mode-appropriate by construction, so mismatched arms are
//! unreachable and fall through harmlessly.

use crate::table::{ColumnIndex, Row, Value};
use std::fmt;
use std::sync::Arc;

/// One element flowing through a pipeline: a full row or a bare scalar.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Datum {
    Row(Row),
    Scalar(Value),
}

impl Datum {
    pub(crate) fn as_row(&self) -> Option<&Row> {
        match self {
            Datum::Row(row) => Some(row),
            Datum::Scalar(_) => None,
        }
    }

    pub(crate) fn as_scalar(&self) -> Option<&Value> {
        match self {
            Datum::Scalar(value) => Some(value),
            Datum::Row(_) => None,
        }
    }

    pub(crate) fn into_row(self) -> Option<Row> {
        match self {
            Datum::Row(row) => Some(row),
            Datum::Scalar(_) => None,
        }
    }

    pub(crate) fn into_scalar(self) -> Option<Value> {
        match self {
            Datum::Scalar(value) => Some(value),
            Datum::Row(_) => None,
        }
    }
}

/// The column index in force while a datum flows through a stage.
pub(crate) type EffectiveIndex<'a> = Option<&'a Arc<ColumnIndex>>;

pub(crate) type Predicate = Box<dyn Fn(&Datum, EffectiveIndex<'_>) -> bool>;
pub(crate) type Transform = Box<dyn Fn(Datum, EffectiveIndex<'_>) -> Datum>;

/// How a projection changes the index seen by later stages.
#[derive(Clone, Debug)]
pub(crate) enum Reshape {
    /// Plain map: later stages keep the current index
    Keep,
    /// Column subset: later stages see a replacement index
    Rows(Arc<ColumnIndex>),
    /// Single-column projection: the stream becomes bare scalars
    Scalar,
}

/// One pipeline stage.
///
/// `Drop`/`Take` carry only their bound; consumption counters live in the
/// evaluator, scoped to a single evaluation call.
pub(crate) enum Action {
    Filter(Predicate),
    Project { apply: Transform, reshape: Reshape },
    Drop(usize),
    Take(usize),
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Filter(_) => f.write_str("Filter"),
            Action::Project { reshape, .. } => {
                f.debug_struct("Project").field("reshape", reshape).finish()
            }
            Action::Drop(n) => f.debug_tuple("Drop").field(n).finish(),
            Action::Take(n) => f.debug_tuple("Take").field(n).finish(),
        }
    }
}
