//! Bulk loading of a tabular source into its destination table.
//!
//! A load runs the stages in order: header validation, type inference over a sample, schema
//! reconciliation against the existing table, DDL, then batched appends. Everything after
//! reconciliation happens inside one store transaction; a failed load leaves the table as it was.

pub mod coerce;
pub mod full_text;

use std::collections::BTreeMap;
use std::path::PathBuf;

use duckdb::types::Value;

use crate::config::LoaderConfig;
use crate::error::LoadResult;
use crate::ingestion::{open_table, LoadContext, LoadObserver, LoadSeverity, LoadStats, TabularFormat, TabularSource};
use crate::schema::{infer_types_with, reconcile, take_sample, validate_header};
use crate::store::DuckDbStore;
use crate::types::{ColumnOrigin, TargetSchema};

pub use coerce::{coerce, CellValue};
pub use full_text::to_tsvector;

/// One file to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub path: PathBuf,
    /// Declared MIME type (or short format name); selects the parser.
    pub mime_type: String,
    /// Destination table name.
    pub resource_id: String,
}

impl LoadRequest {
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
            resource_id: resource_id.into(),
        }
    }
}

/// Loads tabular files into a [`DuckDbStore`].
#[derive(Debug)]
pub struct Loader {
    store: DuckDbStore,
    config: LoaderConfig,
}

impl Loader {
    pub fn new(store: DuckDbStore, config: LoaderConfig) -> LoadResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &DuckDbStore {
        &self.store
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn into_store(self) -> DuckDbStore {
        self.store
    }

    /// Opens `request.path` as its declared format and loads it.
    ///
    /// The observer receives progress messages, then exactly one of `on_success` or `on_failure`
    /// (plus `on_alert` when the failure reaches `config.alert_at_or_above`).
    pub fn load(&self, request: &LoadRequest, observer: &dyn LoadObserver) -> LoadResult<LoadStats> {
        let ctx = LoadContext {
            resource_id: request.resource_id.clone(),
            path: Some(request.path.clone()),
            format: TabularFormat::from_mime(&request.mime_type),
        };
        let result = open_table(&request.path, &request.mime_type, &self.config)
            .and_then(|source| self.load_rows(source, &ctx, observer));
        self.report(&ctx, &result, observer);
        result
    }

    /// Loads an already-opened source, e.g. a delimited stream that has no path.
    pub fn load_source(
        &self,
        source: TabularSource,
        resource_id: &str,
        observer: &dyn LoadObserver,
    ) -> LoadResult<LoadStats> {
        let ctx = LoadContext {
            resource_id: resource_id.to_string(),
            path: None,
            format: Some(source.format),
        };
        let result = self.load_rows(source, &ctx, observer);
        self.report(&ctx, &result, observer);
        result
    }

    fn report(&self, ctx: &LoadContext, result: &LoadResult<LoadStats>, observer: &dyn LoadObserver) {
        match result {
            Ok(stats) => observer.on_success(ctx, *stats),
            Err(e) => {
                let sev = LoadSeverity::for_error(e);
                observer.on_failure(ctx, sev, e);
                if sev >= self.config.alert_at_or_above {
                    observer.on_alert(ctx, sev, e);
                }
            }
        }
    }

    fn load_rows(
        &self,
        source: TabularSource,
        ctx: &LoadContext,
        observer: &dyn LoadObserver,
    ) -> LoadResult<LoadStats> {
        let table = ctx.resource_id.as_str();
        let header = validate_header(&source.header, &self.store.field_name_rules())?;

        let options = self.config.inference_options();
        let (sample, rows) = take_sample(source.rows, options.sample_size)?;
        let inferred = infer_types_with(&header, &sample, &options);
        drop(sample);

        let existing = self.store.table_columns(table)?;
        let overrides: BTreeMap<_, _> = existing
            .iter()
            .filter_map(|c| c.info.type_override.map(|t| (c.name.clone(), t)))
            .collect();
        let schema = reconcile(&header, &inferred, &existing, &overrides);
        observer.on_message(ctx, LoadSeverity::Info, &describe_schema(&schema));

        let tx = self.store.begin()?;
        self.apply_schema(table, &schema, ctx, observer)?;

        let mut stats = LoadStats {
            columns: schema.columns.len(),
            added_columns: schema.added().count(),
            ..LoadStats::default()
        };
        let mut batch: Vec<Vec<Value>> = Vec::with_capacity(self.config.batch_size);

        for row in rows {
            let row = row?;
            let data_row = stats.rows + batch.len() + 1;

            let mut cells = vec![CellValue::Null; schema.columns.len()];
            for (position, raw) in row.iter().enumerate() {
                let Some(&idx) = schema.source_positions.get(position) else {
                    continue;
                };
                let column = &schema.columns[idx];
                cells[idx] = coerce(raw, column.column_type, data_row, &column.name)?;
            }

            // `_id` is drawn from the table sequence when the batch is flushed.
            let mut values = Vec::with_capacity(cells.len() + 2);
            values.push(Value::Null);
            values.push(Value::Text(to_tsvector(cells.iter().filter_map(CellValue::render))));
            values.extend(cells.into_iter().map(CellValue::into_sql));
            batch.push(values);

            if batch.len() >= self.config.batch_size {
                self.flush(table, &mut batch, &mut stats, ctx, observer)?;
            }
        }
        if !batch.is_empty() {
            self.flush(table, &mut batch, &mut stats, ctx, observer)?;
        }

        tx.commit()?;
        Ok(stats)
    }

    fn apply_schema(
        &self,
        table: &str,
        schema: &TargetSchema,
        ctx: &LoadContext,
        observer: &dyn LoadObserver,
    ) -> LoadResult<()> {
        if !schema.table_exists {
            self.store.create_table(table, &schema.columns)?;
            observer.on_message(ctx, LoadSeverity::Info, &format!("created table \"{table}\""));
            return Ok(());
        }
        self.store.ensure_id_sequence(table)?;
        for column in &schema.columns {
            match column.origin {
                ColumnOrigin::Added => {
                    self.store.add_column(table, column)?;
                    observer.on_message(
                        ctx,
                        LoadSeverity::Info,
                        &format!("added column \"{}\" {}", column.name, column.column_type),
                    );
                }
                ColumnOrigin::Retyped { from } => {
                    self.store.retype_column(table, column)?;
                    observer.on_message(
                        ctx,
                        LoadSeverity::Warning,
                        &format!("retyped column \"{}\" from {from} to {}", column.name, column.column_type),
                    );
                }
                ColumnOrigin::Existing => {}
            }
        }
        Ok(())
    }

    fn flush(
        &self,
        table: &str,
        batch: &mut Vec<Vec<Value>>,
        stats: &mut LoadStats,
        ctx: &LoadContext,
        observer: &dyn LoadObserver,
    ) -> LoadResult<()> {
        let rows = batch.len();
        let mut full = std::mem::replace(batch, Vec::with_capacity(self.config.batch_size));
        let ids = self.store.next_ids(table, rows)?;
        for (row, id) in full.iter_mut().zip(ids) {
            row[0] = Value::BigInt(id);
        }
        self.store.append_batch(table, full)?;
        stats.rows += rows;
        stats.batches += 1;
        observer.on_message(
            ctx,
            LoadSeverity::Info,
            &format!("batch {}: {rows} rows ({} total)", stats.batches, stats.rows),
        );
        Ok(())
    }
}

fn describe_schema(schema: &TargetSchema) -> String {
    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.column_type))
        .collect();
    format!(
        "schema: [{}] ({} added, {} retyped)",
        columns.join(", "),
        schema.added().count(),
        schema.retyped().count()
    )
}
