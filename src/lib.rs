//! `shift-loader` loads tabular files into a DuckDB table per resource, inferring a column schema
//! on the first load and reconciling it on every later one.
//!
//! The primary entrypoint is [`load::Loader::load`], or [`hooks::submit`] when upload hooks should
//! be consulted around the load.
//!
//! ## What you can load
//!
//! **Formats (selected from the declared MIME type, never from the file extension):**
//!
//! - **Delimited text**: CSV (`text/csv`, `csv`, ...) and TSV (`text/tab-separated-values`, `tsv`)
//! - **Spreadsheets**: `.xls`, `.xlsx`, `.xlsb`, `.ods` (first worksheet unless configured)
//!
//! **Column types:**
//!
//! Every data column is committed as one of [`types::CanonicalType`]: `text`, `numeric` or
//! `timestamp`. Types are inferred from a sample of leading rows; an existing column keeps its
//! physical type, and a stored override (see [`store::DuckDbStore::set_type_override`]) beats both.
//!
//! Each table also carries two system columns: `_id`, numbered in source order from a per-table
//! sequence, and `_full_text`, a tsvector-style index of the row's values.
//!
//! ## Quick example
//!
//! ```no_run
//! use shift_loader::config::LoaderConfig;
//! use shift_loader::ingestion::StdErrObserver;
//! use shift_loader::load::{LoadRequest, Loader};
//! use shift_loader::store::DuckDbStore;
//!
//! # fn main() -> Result<(), shift_loader::LoadError> {
//! let store = DuckDbStore::open("datastore.duckdb")?;
//! let loader = Loader::new(store, LoaderConfig::default())?;
//! let request = LoadRequest::new("simple.csv", "text/csv", "3b6d1a4e-simple");
//! let stats = loader.load(&request, &StdErrObserver)?;
//! println!("rows={} columns={}", stats.rows, stats.columns);
//! # Ok(())
//! # }
//! ```
//!
//! ## Failures
//!
//! Every operation returns [`LoadError`]; [`LoadError::kind`] tells which stage rejected the input
//! (format detection, field names, type coercion, destination write or I/O). A failed load is
//! rolled back, so the table keeps its previous contents.
//!
//! ## Modules
//!
//! - [`ingestion`]: format readers and load observers
//! - [`schema`]: header validation, type inference and reconciliation
//! - [`load`]: the bulk loader, value coercion and the full-text projection
//! - [`store`]: the DuckDB destination
//! - [`hooks`]: `can_upload` / `after_upload` extension points
//! - [`config`]: loader configuration
//! - [`error`]: the error type used across the crate

pub mod config;
pub mod error;
pub mod hooks;
pub mod ingestion;
pub mod load;
pub mod schema;
pub mod store;
pub mod types;
mod values;

pub use error::{LoadError, LoadErrorKind, LoadResult};
