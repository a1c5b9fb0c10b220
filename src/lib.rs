//! perch: lazy, chainable query pipelines over in-memory tables
//!
//! A [`Pipeline`] accumulates filter / projection / slice actions over a
//! shared immutable [`Table`] and evaluates them in one pull-driven pass.
//! Projecting a single column yields a [`ScalarPipeline`] of bare values;
//! terminal aggregates fold a scalar stream to one value and a row stream
//! to an ordered per-column mapping. `group_by` partitions either stream
//! into a [`Flock`] of sub-pipelines that answers the same vocabulary.
//!
//! ```
//! use perch::{Pipeline, Table, Value};
//!
//! let table = Table::with_names(
//!     vec![
//!         vec![Value::Int(1), Value::Int(10)],
//!         vec![Value::Int(2), Value::Int(20)],
//!         vec![Value::Int(1), Value::Int(30)],
//!     ],
//!     ["a", "b"],
//! )?;
//! let pipeline = Pipeline::new(table)?;
//!
//! assert_eq!(pipeline.col("a")?.sum(), Value::Int(4));
//!
//! let by_a = pipeline.group_by("a")?.col("b")?.sum();
//! assert_eq!(by_a.get(&Value::Int(1)), Some(&Value::Int(40)));
//! # Ok::<(), perch::Error>(())
//! ```

pub mod error;
pub mod pipeline;
pub mod table;

pub use error::{ArgumentError, Error, SchemaError};
pub use pipeline::{Flock, Pipeline, ScalarPipeline, Stat};
pub use table::{ColumnIndex, Row, Table, Value};

// `Flock` construction and `flock` builders speak IndexMap; re-export it so
// embedders don't need to pin a matching version themselves.
pub use indexmap::IndexMap;
