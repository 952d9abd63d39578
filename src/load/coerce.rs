//! Conversion of raw cells into their column's committed type.

use chrono::NaiveDateTime;
use duckdb::types::{TimeUnit, Value};

use crate::error::{LoadError, LoadResult};
use crate::types::{CanonicalType, RawValue};
use crate::values::{decimal_from_f64, parse_decimal, parse_timestamp};

/// A cell after coercion, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    /// Canonical decimal text; bound as text so the store casts it without rounding.
    Numeric(String),
    Timestamp(NaiveDateTime),
}

impl CellValue {
    /// Text rendering of the committed value; `None` for NULL.
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(s.clone()),
            Self::Numeric(n) => Some(n.clone()),
            Self::Timestamp(dt) => Some(dt.to_string()),
        }
    }

    pub(crate) fn into_sql(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Text(s) => Value::Text(s),
            Self::Numeric(n) => Value::Text(n),
            Self::Timestamp(dt) => Value::Timestamp(TimeUnit::Microsecond, dt.and_utc().timestamp_micros()),
        }
    }
}

/// Coerces one cell; `row` is the 1-based data row and `column` the destination column name,
/// both used only for the error.
pub fn coerce(raw: &RawValue, target: CanonicalType, row: usize, column: &str) -> LoadResult<CellValue> {
    let fail = |message: &str| LoadError::TypeCoercion {
        row,
        column: column.to_string(),
        raw: raw.render(),
        target: target.to_string(),
        message: message.to_string(),
    };

    match (raw, target) {
        (RawValue::Empty, _) => Ok(CellValue::Null),

        (RawValue::Text(s), CanonicalType::Text) => Ok(CellValue::Text(s.clone())),
        (other, CanonicalType::Text) => Ok(CellValue::Text(other.render())),
        (RawValue::Text(s), _) if s.trim().is_empty() => Ok(CellValue::Null),

        (RawValue::Number(n), CanonicalType::Numeric) => decimal_from_f64(*n)
            .map(CellValue::Numeric)
            .ok_or_else(|| fail("number out of range for DECIMAL(38,10)")),
        (RawValue::Text(s), CanonicalType::Numeric) => parse_decimal(s)
            .map(CellValue::Numeric)
            .ok_or_else(|| fail("not a number that fits DECIMAL(38,10) exactly")),

        (RawValue::DateTime(dt), CanonicalType::Timestamp) => Ok(CellValue::Timestamp(*dt)),
        (RawValue::Text(s), CanonicalType::Timestamp) => parse_timestamp(s)
            .map(CellValue::Timestamp)
            .ok_or_else(|| fail("not a recognised date or date-time")),

        (RawValue::DateTime(_), CanonicalType::Numeric) => Err(fail("date-time cell in a numeric column")),
        (RawValue::Number(_), CanonicalType::Timestamp) => Err(fail("number cell in a timestamp column")),
        (RawValue::Bool(_), _) => Err(fail("boolean cell in a non-text column")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;
    use chrono::NaiveDate;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn empty_cells_are_null_for_every_type() {
        for target in [CanonicalType::Text, CanonicalType::Numeric, CanonicalType::Timestamp] {
            assert_eq!(coerce(&RawValue::Empty, target, 1, "c").unwrap(), CellValue::Null);
        }
    }

    #[test]
    fn text_parses_into_numbers_and_timestamps() {
        assert_eq!(
            coerce(&text("-1"), CanonicalType::Numeric, 1, "t").unwrap(),
            CellValue::Numeric("-1".to_string())
        );
        // Leading zeros still coerce when the column was committed as numeric.
        assert_eq!(
            coerce(&text("02124"), CanonicalType::Numeric, 1, "zip").unwrap(),
            CellValue::Numeric("2124".to_string())
        );
        let midnight = NaiveDate::from_ymd_opt(2011, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(
            coerce(&text("2011-01-01"), CanonicalType::Timestamp, 1, "date").unwrap(),
            CellValue::Timestamp(midnight)
        );
    }

    #[test]
    fn large_and_precise_numbers_are_kept_exactly() {
        assert_eq!(
            coerce(&text("12345678901234567891"), CanonicalType::Numeric, 1, "id").unwrap(),
            CellValue::Numeric("12345678901234567891".to_string())
        );
        assert_eq!(
            coerce(&RawValue::Number(42.288), CanonicalType::Numeric, 1, "lat").unwrap(),
            CellValue::Numeric("42.288".to_string())
        );
        let err = coerce(&text("0.123456789012"), CanonicalType::Numeric, 2, "x").unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::TypeCoercion);
        assert!(err.to_string().contains("DECIMAL(38,10)"));
    }

    #[test]
    fn whitespace_is_text_but_null_in_typed_columns() {
        assert_eq!(
            coerce(&text(" "), CanonicalType::Text, 1, "reason").unwrap(),
            CellValue::Text(" ".to_string())
        );
        assert_eq!(
            coerce(&text(" https://example.org/a.jpg"), CanonicalType::Text, 1, "photo").unwrap(),
            CellValue::Text(" https://example.org/a.jpg".to_string())
        );
        assert_eq!(coerce(&text("  "), CanonicalType::Numeric, 1, "n").unwrap(), CellValue::Null);
        assert_eq!(coerce(&text("\t"), CanonicalType::Timestamp, 1, "d").unwrap(), CellValue::Null);
    }

    #[test]
    fn spreadsheet_numbers_render_without_fraction_in_text_columns() {
        assert_eq!(
            coerce(&RawValue::Number(2124.0), CanonicalType::Text, 1, "zip").unwrap(),
            CellValue::Text("2124".to_string())
        );
        assert_eq!(
            coerce(&RawValue::Number(42.5), CanonicalType::Text, 1, "x").unwrap(),
            CellValue::Text("42.5".to_string())
        );
    }

    #[test]
    fn failures_name_row_column_value_and_target() {
        let err = coerce(&text("warm"), CanonicalType::Numeric, 7, "temperature").unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::TypeCoercion);
        let message = err.to_string();
        assert!(message.contains("row 7"));
        assert!(message.contains("'temperature'"));
        assert!(message.contains("numeric"));
        assert!(message.contains("raw='warm'"));

        assert!(coerce(&RawValue::Bool(true), CanonicalType::Numeric, 1, "b").is_err());
        assert_eq!(
            coerce(&RawValue::Bool(true), CanonicalType::Text, 1, "b").unwrap(),
            CellValue::Text("true".to_string())
        );
    }

    #[test]
    fn committed_values_render_for_full_text() {
        let dt = NaiveDate::from_ymd_opt(2011, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(CellValue::Timestamp(dt).render().as_deref(), Some("2011-01-02 00:00:00"));
        assert_eq!(CellValue::Numeric("1".to_string()).render().as_deref(), Some("1"));
        assert_eq!(CellValue::Null.render(), None);
    }
}
