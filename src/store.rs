//! DuckDB-backed destination store.
//!
//! Every resource is one table named by its identifier. Besides the data columns each table carries
//! two system columns, `_id` and `_full_text`, and per-column metadata ([`ColumnInfo`]) stored as
//! JSON column comments.

use std::collections::BTreeMap;
use std::path::Path;

use duckdb::types::Value;
use duckdb::{appender_params_from_iter, Connection};

use crate::error::{LoadError, LoadResult};
use crate::schema::FieldNameRules;
use crate::types::{CanonicalType, ColumnInfo, PhysicalColumn, TargetColumn, FULL_TEXT_COLUMN, ID_COLUMN};

/// Quotes an identifier for DuckDB SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Name of the sequence generating `_id` values for `table`.
pub fn id_sequence(table: &str) -> String {
    format!("{table}{ID_COLUMN}_seq")
}

fn nextval(table: &str) -> String {
    format!("nextval({})", quote_literal(&quote_ident(&id_sequence(table))))
}

/// A relational store backed by one DuckDB connection.
pub struct DuckDbStore {
    conn: Connection,
}

impl std::fmt::Debug for DuckDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbStore").finish_non_exhaustive()
    }
}

impl DuckDbStore {
    /// DuckDB identifiers are case-insensitive; names longer than 63 characters are rejected to
    /// stay portable to PostgreSQL-compatible consumers.
    pub const FIELD_NAME_RULES: FieldNameRules = FieldNameRules {
        max_length: 63,
        case_sensitive: false,
    };

    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> LoadResult<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn open_in_memory() -> LoadResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Underlying connection, for ad-hoc queries against loaded tables.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn field_name_rules(&self) -> FieldNameRules {
        Self::FIELD_NAME_RULES
    }

    pub fn table_exists(&self, table: &str) -> LoadResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT count(*) FROM duckdb_tables() \
             WHERE database_name = current_database() AND schema_name = 'main' AND table_name = ?",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Columns of `table` in physical order, system columns included. Empty when the table does
    /// not exist.
    pub fn table_columns(&self, table: &str) -> LoadResult<Vec<PhysicalColumn>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name, data_type, comment FROM duckdb_columns() \
             WHERE database_name = current_database() AND schema_name = 'main' AND table_name = ? \
             ORDER BY column_index",
        )?;
        let rows = stmt.query_map([table], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut columns = Vec::new();
        for row in rows {
            let (name, data_type, comment) = row?;
            columns.push(PhysicalColumn {
                info: ColumnInfo::from_comment(comment.as_deref()),
                name,
                data_type,
            });
        }
        Ok(columns)
    }

    /// Type overrides recorded for `table`, keyed by column name.
    pub fn stored_overrides(&self, table: &str) -> LoadResult<BTreeMap<String, CanonicalType>> {
        Ok(self
            .table_columns(table)?
            .into_iter()
            .filter_map(|c| c.info.type_override.map(|t| (c.name, t)))
            .collect())
    }

    /// Records (or clears, with `None`) the type override of an existing column.
    ///
    /// The override takes effect on the next load; other keys of the column's metadata are kept.
    pub fn set_type_override(
        &self,
        table: &str,
        column: &str,
        type_override: Option<CanonicalType>,
    ) -> LoadResult<()> {
        let existing = self
            .table_columns(table)?
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(column) && !c.is_system())
            .ok_or_else(|| {
                LoadError::destination(format!("column \"{column}\" does not exist in table \"{table}\""))
            })?;
        let mut info = existing.info;
        info.type_override = type_override;
        self.write_column_info(table, &existing.name, &info)
    }

    fn write_column_info(&self, table: &str, column: &str, info: &ColumnInfo) -> LoadResult<()> {
        let comment = if info.is_empty() {
            "NULL".to_string()
        } else {
            let json = serde_json::to_string(info)
                .map_err(|e| LoadError::destination(format!("cannot encode column info: {e}")))?;
            quote_literal(&json)
        };
        self.conn.execute_batch(&format!(
            "COMMENT ON COLUMN {}.{} IS {comment}",
            quote_ident(table),
            quote_ident(column)
        ))?;
        Ok(())
    }

    pub fn row_count(&self, table: &str) -> LoadResult<u64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT count(*) FROM {}", quote_ident(table)), [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Starts a transaction that rolls back unless committed.
    pub fn begin(&self) -> LoadResult<StoreTransaction<'_>> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(StoreTransaction {
            conn: &self.conn,
            finished: false,
        })
    }

    /// Creates `table` with the system columns followed by `columns`.
    ///
    /// `_id` defaults to the next value of the table's own sequence (see [`id_sequence`]), so rows
    /// inserted outside the loader are numbered too.
    pub fn create_table(&self, table: &str, columns: &[TargetColumn]) -> LoadResult<()> {
        self.conn.execute_batch(&format!(
            "CREATE SEQUENCE {} START WITH 1",
            quote_ident(&id_sequence(table))
        ))?;
        let mut defs = vec![
            format!("{} BIGINT NOT NULL DEFAULT {}", quote_ident(ID_COLUMN), nextval(table)),
            format!("{} VARCHAR", quote_ident(FULL_TEXT_COLUMN)),
        ];
        defs.extend(
            columns
                .iter()
                .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_type())),
        );
        self.conn.execute_batch(&format!(
            "CREATE TABLE {} ({})",
            quote_ident(table),
            defs.join(", ")
        ))?;
        Ok(())
    }

    pub fn add_column(&self, table: &str, column: &TargetColumn) -> LoadResult<()> {
        self.conn.execute_batch(&format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_ident(table),
            quote_ident(&column.name),
            column.column_type.sql_type()
        ))?;
        Ok(())
    }

    /// Changes the physical type of an existing column, keeping its metadata.
    pub fn retype_column(&self, table: &str, column: &TargetColumn) -> LoadResult<()> {
        let info = self
            .table_columns(table)?
            .into_iter()
            .find(|c| c.name == column.name)
            .map(|c| c.info)
            .unwrap_or_default();
        self.conn.execute_batch(&format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
            quote_ident(table),
            quote_ident(&column.name),
            column.column_type.sql_type()
        ))?;
        if !info.is_empty() {
            self.write_column_info(table, &column.name, &info)?;
        }
        Ok(())
    }

    /// Creates the `_id` sequence of a table that predates it, continuing after the highest `_id`.
    pub fn ensure_id_sequence(&self, table: &str) -> LoadResult<()> {
        let start = self.max_id(table)? + 1;
        self.conn.execute_batch(&format!(
            "CREATE SEQUENCE IF NOT EXISTS {} START WITH {start}",
            quote_ident(&id_sequence(table))
        ))?;
        Ok(())
    }

    /// Draws `count` ids from the table's sequence, in increasing order.
    pub fn next_ids(&self, table: &str, count: usize) -> LoadResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM range({count})", nextval(table)))?;
        let mut ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids.sort_unstable();
        Ok(ids)
    }

    /// Highest `_id` in the table, 0 when empty.
    pub fn max_id(&self, table: &str) -> LoadResult<i64> {
        let id: i64 = self.conn.query_row(
            &format!(
                "SELECT COALESCE(MAX({}), 0) FROM {}",
                quote_ident(ID_COLUMN),
                quote_ident(table)
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Appends full rows (system columns first, then every data column in physical order).
    pub fn append_batch(&self, table: &str, batch: Vec<Vec<Value>>) -> LoadResult<()> {
        let mut appender = self.conn.appender(table)?;
        for row in batch {
            appender.append_row(appender_params_from_iter(row))?;
        }
        appender.flush()?;
        Ok(())
    }
}

/// Open transaction on a [`DuckDbStore`]; dropped without [`StoreTransaction::commit`] it rolls
/// back, DDL included.
pub struct StoreTransaction<'a> {
    conn: &'a Connection,
    finished: bool,
}

impl StoreTransaction<'_> {
    pub fn commit(mut self) -> LoadResult<()> {
        self.finished = true;
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn rollback(mut self) -> LoadResult<()> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for StoreTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}
