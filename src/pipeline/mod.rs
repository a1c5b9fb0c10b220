//! Lazy query pipelines
//!
//! This module provides the chainable query surface over a [`crate::table::Table`]:
//!
//! 1. **Construction**: every call validates its arguments, appends one
//!    tagged action, and returns a fresh immutable pipeline value
//! 2. **Evaluation**: a pull-based pass drives each row through the action
//!    list left to right, stopping early once a `take` bound is reached
//! 3. **Reduction**: named statistics fold in a single traversal, per
//!    stream on a scalar pipeline and per column on a row pipeline
//! 4. **Grouping**: `group_by` partitions the output into an ordered
//!    mapping of sub-pipelines that answers the same vocabulary
//!
//! ## Architecture
//!
//! ```text
//! Table ──► Pipeline | ScalarPipeline   (actions accumulate immutably)
//!     ──► Eval                          (single pass, pull-driven)
//!     ──► rows / values, fold results, or Flock of sub-pipelines
//! ```

mod action;
mod eval;
pub mod group;
pub mod pipeline;
pub mod reduce;

pub use group::Flock;
pub use pipeline::{Pipeline, ScalarPipeline};
pub use reduce::Stat;
