//! Column type inference over a bounded sample of leading rows.

use crate::error::LoadResult;
use crate::ingestion::RowStream;
use crate::types::{CanonicalType, ColumnDescriptor, RawValue, SourceRow};
use crate::values::{decimal_from_f64, has_leading_zero, parse_decimal, parse_timestamp};

use super::field_names::ValidatedHeader;

/// Knobs of the inference pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceOptions {
    /// Non-empty values examined per column.
    pub sample_size: usize,
    /// Treat numbers written with a redundant leading zero (`07`, `02124`) as text, so codes
    /// such as ZIP codes keep their written form.
    pub leading_zero_codes_as_text: bool,
}

impl InferenceOptions {
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size,
            leading_zero_codes_as_text: false,
        }
    }
}

fn is_timestamp(value: &RawValue) -> bool {
    match value {
        RawValue::DateTime(_) => true,
        RawValue::Text(s) => parse_timestamp(s).is_some(),
        _ => false,
    }
}

fn is_numeric(value: &RawValue, options: &InferenceOptions) -> bool {
    match value {
        RawValue::Number(n) => decimal_from_f64(*n).is_some(),
        RawValue::Text(s) => {
            !(options.leading_zero_codes_as_text && has_leading_zero(s)) && parse_decimal(s).is_some()
        }
        _ => false,
    }
}

/// Infers one column from its first `sample_size` non-empty values.
///
/// The result is the first of Timestamp, Numeric, Text that every sampled value satisfies; a
/// column without any non-empty value is Text. Whitespace-only cells count as empty.
pub fn infer_column(column_index: usize, sample_rows: &[SourceRow], sample_size: usize) -> CanonicalType {
    infer_column_with(column_index, sample_rows, &InferenceOptions::new(sample_size))
}

pub fn infer_column_with(
    column_index: usize,
    sample_rows: &[SourceRow],
    options: &InferenceOptions,
) -> CanonicalType {
    let values: Vec<&RawValue> = sample_rows
        .iter()
        .filter_map(|row| row.get(column_index))
        .filter(|v| !v.is_blank())
        .take(options.sample_size)
        .collect();
    if values.is_empty() {
        return CanonicalType::Text;
    }
    if values.iter().all(|v| is_timestamp(v)) {
        CanonicalType::Timestamp
    } else if values.iter().all(|v| is_numeric(v, options)) {
        CanonicalType::Numeric
    } else {
        CanonicalType::Text
    }
}

/// Builds a descriptor per header column; overrides are filled in later by reconciliation.
pub fn infer_types(
    header: &ValidatedHeader,
    sample_rows: &[SourceRow],
    sample_size: usize,
) -> Vec<ColumnDescriptor> {
    infer_types_with(header, sample_rows, &InferenceOptions::new(sample_size))
}

pub fn infer_types_with(
    header: &ValidatedHeader,
    sample_rows: &[SourceRow],
    options: &InferenceOptions,
) -> Vec<ColumnDescriptor> {
    header
        .names()
        .iter()
        .enumerate()
        .map(|(position, name)| ColumnDescriptor {
            name: name.clone(),
            inferred_type: infer_column_with(position, sample_rows, options),
            override_type: None,
            position,
        })
        .collect()
}

/// Pulls up to `sample_size` rows off `rows` for inference.
///
/// Returns the buffered sample and a stream that replays it before continuing with the rest, so
/// the reader is consumed exactly once. A reader error inside the sample fails immediately.
pub fn take_sample(mut rows: RowStream, sample_size: usize) -> LoadResult<(Vec<SourceRow>, RowStream)> {
    let mut sample = Vec::new();
    while sample.len() < sample_size {
        match rows.next() {
            Some(row) => sample.push(row?),
            None => break,
        }
    }
    let replay: RowStream = Box::new(sample.clone().into_iter().map(Ok).chain(rows));
    Ok((sample, replay))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field_names::{validate_header, FieldNameRules};
    use chrono::NaiveDate;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn simple_rows() -> Vec<SourceRow> {
        vec![
            vec![text("2011-01-01"), text("1"), text("Galway")],
            vec![text("2011-01-02"), text("-1"), text("Galway")],
            vec![text("2011-01-03"), text("0"), text("Galway")],
            vec![text("2011-01-01"), text("6"), text("Berkeley")],
            vec![RawValue::Empty, text("8"), text("Berkeley")],
        ]
    }

    #[test]
    fn infers_timestamp_numeric_and_text() {
        let header = validate_header(
            &["date".to_string(), "temperature".to_string(), "place".to_string()],
            &FieldNameRules::default(),
        )
        .unwrap();
        let descriptors = infer_types(&header, &simple_rows(), 1_000);
        let types: Vec<CanonicalType> = descriptors.iter().map(|d| d.inferred_type).collect();
        assert_eq!(
            types,
            vec![CanonicalType::Timestamp, CanonicalType::Numeric, CanonicalType::Text]
        );
        assert_eq!(descriptors[2].position, 2);
        assert_eq!(descriptors[2].override_type, None);
    }

    #[test]
    fn one_outlier_in_the_sample_demotes_to_text() {
        let rows = vec![vec![text("1")], vec![text("2")], vec![text("n/a")]];
        assert_eq!(infer_column(0, &rows, 1_000), CanonicalType::Text);
        // Outside the sample the outlier is not seen.
        assert_eq!(infer_column(0, &rows, 2), CanonicalType::Numeric);
    }

    #[test]
    fn integers_with_leading_zeros_are_numeric_by_default() {
        let rows = vec![vec![text("07")], vec![text("09")]];
        assert_eq!(infer_column(0, &rows, 1_000), CanonicalType::Numeric);
    }

    #[test]
    fn leading_zero_codes_can_be_kept_as_text() {
        let options = InferenceOptions {
            leading_zero_codes_as_text: true,
            ..InferenceOptions::new(1_000)
        };
        let rows = vec![vec![text("02124"), text("0.5")], vec![text("02134"), text("0")]];
        assert_eq!(infer_column_with(0, &rows, &options), CanonicalType::Text);
        assert_eq!(infer_column_with(1, &rows, &options), CanonicalType::Numeric);
    }

    #[test]
    fn numbers_that_do_not_fit_exactly_stay_text() {
        let rows = vec![vec![text("12345678901234567891")], vec![text("1")]];
        assert_eq!(infer_column(0, &rows, 1_000), CanonicalType::Numeric);
        let rows = vec![vec![text("123456789012345678901234567890")]];
        assert_eq!(infer_column(0, &rows, 1_000), CanonicalType::Text);
    }

    #[test]
    fn whitespace_only_cells_do_not_influence_inference() {
        let rows = vec![vec![text(" ")], vec![text("3")], vec![text("  ")]];
        assert_eq!(infer_column(0, &rows, 1_000), CanonicalType::Numeric);
        let rows = vec![vec![text(" ")], vec![text(" ")]];
        assert_eq!(infer_column(0, &rows, 1_000), CanonicalType::Text);
    }

    #[test]
    fn empty_columns_are_text() {
        let rows = vec![vec![RawValue::Empty], vec![RawValue::Empty]];
        assert_eq!(infer_column(0, &rows, 1_000), CanonicalType::Text);
        assert_eq!(infer_column(3, &rows, 1_000), CanonicalType::Text);
    }

    #[test]
    fn native_spreadsheet_values_count() {
        let when = NaiveDate::from_ymd_opt(2011, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let rows = vec![
            vec![RawValue::DateTime(when), RawValue::Number(1.0), RawValue::Bool(true)],
            vec![text("2011-01-02"), text("2.5"), RawValue::Bool(false)],
        ];
        assert_eq!(infer_column(0, &rows, 1_000), CanonicalType::Timestamp);
        assert_eq!(infer_column(1, &rows, 1_000), CanonicalType::Numeric);
        assert_eq!(infer_column(2, &rows, 1_000), CanonicalType::Text);
    }

    #[test]
    fn sample_is_replayed_before_the_rest() {
        let rows: RowStream = Box::new((1..=5).map(|i| -> LoadResult<SourceRow> { Ok(vec![text(&i.to_string())]) }));
        let (sample, replay) = take_sample(rows, 2).unwrap();
        assert_eq!(sample.len(), 2);
        let all: Vec<SourceRow> = replay.collect::<LoadResult<_>>().unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0], vec![text("1")]);
        assert_eq!(all[4], vec![text("5")]);
    }
}
