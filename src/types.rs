//! Core data model types shared by the reader, schema and load stages.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Name of the generated surrogate key column.
pub const ID_COLUMN: &str = "_id";
/// Name of the generated full-text projection column.
pub const FULL_TEXT_COLUMN: &str = "_full_text";

/// Fraction digits kept by numeric columns.
pub const NUMERIC_SCALE: usize = 10;
/// Integer digits available to numeric columns (`DECIMAL(38,10)` leaves 28).
pub const NUMERIC_INTEGER_DIGITS: usize = 38 - NUMERIC_SCALE;

/// Returns true for the columns the loader maintains itself.
pub fn is_system_column(name: &str) -> bool {
    name == ID_COLUMN || name == FULL_TEXT_COLUMN
}

/// The reduced type vocabulary committed to destination tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalType {
    /// Free text.
    Text,
    /// Integer or decimal number.
    Numeric,
    /// Date and time.
    Timestamp,
}

impl CanonicalType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Timestamp => "timestamp",
        }
    }

    /// Physical DuckDB type used for columns of this type.
    pub const fn sql_type(&self) -> &'static str {
        match self {
            Self::Text => "VARCHAR",
            Self::Numeric => "DECIMAL(38,10)",
            Self::Timestamp => "TIMESTAMP",
        }
    }

    /// Parses a user-supplied type name, accepting common aliases (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "TEXT" | "STRING" | "VARCHAR" => Some(Self::Text),
            "NUMERIC" | "NUMBER" | "DECIMAL" | "FLOAT" | "DOUBLE" | "INT" | "INTEGER" | "BIGINT" => {
                Some(Self::Numeric)
            }
            "TIMESTAMP" | "DATETIME" | "DATE" => Some(Self::Timestamp),
            _ => None,
        }
    }

    /// Maps a physical type name reported by the store back to the canonical vocabulary.
    pub fn from_physical(data_type: &str) -> Self {
        let upper = data_type.trim().to_ascii_uppercase();
        if upper.starts_with("TIMESTAMP") || upper == "DATE" {
            Self::Timestamp
        } else if upper.starts_with("DECIMAL")
            || matches!(
                upper.as_str(),
                "DOUBLE"
                    | "FLOAT"
                    | "REAL"
                    | "TINYINT"
                    | "SMALLINT"
                    | "INTEGER"
                    | "BIGINT"
                    | "HUGEINT"
                    | "UTINYINT"
                    | "USMALLINT"
                    | "UINTEGER"
                    | "UBIGINT"
                    | "UHUGEINT"
            )
        {
            Self::Numeric
        } else {
            Self::Text
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell as produced by a reader, before coercion.
///
/// Delimited text only ever produces [`RawValue::Empty`] and [`RawValue::Text`]; spreadsheets also
/// produce native numbers, datetimes and booleans.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
    Bool(bool),
}

impl RawValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Empty, or text made only of whitespace. Such cells carry no typed value.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used in diagnostics and for text-typed columns.
    pub fn render(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::DateTime(dt) => dt.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// A row aligned positionally with the header.
pub type SourceRow = Vec<RawValue>;

/// Per-file description of one header column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub inferred_type: CanonicalType,
    /// Always wins over `inferred_type` when present.
    pub override_type: Option<CanonicalType>,
    /// Zero-based position in the source header.
    pub position: usize,
}

impl ColumnDescriptor {
    pub fn effective_type(&self) -> CanonicalType {
        self.override_type.unwrap_or(self.inferred_type)
    }
}

/// How a column of the target schema relates to the table before this load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrigin {
    /// Appended by this load.
    Added,
    /// Already present with the committed type.
    Existing,
    /// Present, but an override changes its physical type.
    Retyped { from: CanonicalType },
}

/// One data column of the reconciled destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetColumn {
    pub name: String,
    pub column_type: CanonicalType,
    pub origin: ColumnOrigin,
}

/// Result of reconciling a file's header against the destination table.
///
/// `columns` lists every data column of the table in physical order (system columns excluded);
/// `source_positions[i]` is the index into `columns` fed by header position `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSchema {
    pub columns: Vec<TargetColumn>,
    pub source_positions: Vec<usize>,
    pub descriptors: Vec<ColumnDescriptor>,
    pub table_exists: bool,
}

impl TargetSchema {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn added(&self) -> impl Iterator<Item = &TargetColumn> {
        self.columns.iter().filter(|c| c.origin == ColumnOrigin::Added)
    }

    pub fn retyped(&self) -> impl Iterator<Item = &TargetColumn> {
        self.columns
            .iter()
            .filter(|c| matches!(c.origin, ColumnOrigin::Retyped { .. }))
    }

    /// True when loading requires no DDL against an existing table.
    pub fn is_schema_noop(&self) -> bool {
        self.table_exists && self.added().next().is_none() && self.retyped().next().is_none()
    }
}

/// Per-column metadata persisted next to the table (a JSON column comment in DuckDB).
///
/// Keys other than `type_override` belong to other tools (labels, notes) and are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_override: Option<CanonicalType>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ColumnInfo {
    /// Parses a stored comment; anything that is not a JSON object is treated as no metadata.
    pub fn from_comment(comment: Option<&str>) -> Self {
        comment
            .filter(|c| !c.trim().is_empty())
            .and_then(|c| serde_json::from_str(c).ok())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.type_override.is_none() && self.extra.is_empty()
    }
}

/// A column as it physically exists in the destination table.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalColumn {
    pub name: String,
    /// Type name as reported by the store (e.g. `VARCHAR`).
    pub data_type: String,
    pub info: ColumnInfo,
}

impl PhysicalColumn {
    pub fn canonical_type(&self) -> CanonicalType {
        CanonicalType::from_physical(&self.data_type)
    }

    pub fn is_system(&self) -> bool {
        is_system_column(&self.name)
    }
}
