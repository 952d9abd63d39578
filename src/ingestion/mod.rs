//! Reading tabular inputs and reporting on loads.
//!
//! Most callers should use [`open_table`] (from [`unified`]) which:
//!
//! - selects the parser from the declared MIME type
//! - returns the header row plus a lazy stream of data rows
//! - classifies every parser failure as a [`crate::LoadError`]
//!
//! [`observability`] holds the observer hooks the loader reports through.

mod csv;
mod excel;
pub mod observability;
pub mod unified;

pub use observability::{
    CompositeObserver, FileObserver, LoadContext, LoadObserver, LoadSeverity, LoadStats, NullObserver,
    StdErrObserver,
};
pub use unified::{open_delimited_reader, open_table, RowStream, TabularFormat, TabularSource};
