//! Bulk schema operations: init, clear, and flush.

mod bulk;

pub use bulk::{clear, flush, init, OpOptions, OpSummary, TableAction};
