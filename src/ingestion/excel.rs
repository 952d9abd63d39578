use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_from_rs, Data, DataType, Ods, Range, Reader, Sheets, Xls, Xlsb, Xlsx};

use crate::error::{LoadError, LoadResult};
use crate::types::{RawValue, SourceRow};
use crate::values::parse_timestamp;

use super::unified::{TabularFormat, TabularSource};

/// Open one worksheet of a spreadsheet as a [`TabularSource`].
///
/// Behavior:
/// - The container is opened as `format`; the file extension is ignored
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row, trimming trailing empty header cells
/// - Yields the remaining non-empty rows, cropped to the header width
pub fn open_spreadsheet(
    path: &Path,
    format: TabularFormat,
    sheet_name: Option<&str>,
) -> LoadResult<TabularSource> {
    let reader = BufReader::new(File::open(path)?);
    let mut workbook = open_workbook(reader, format)?;

    let sheet = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| LoadError::format(format!("{format} workbook has no sheets")))?,
    };
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| LoadError::format(format!("sheet '{sheet}': {e}")))?;

    let (header_row, header) = find_header(&range)
        .ok_or_else(|| LoadError::format(format!("sheet '{sheet}': no header row found")))?;

    let rows = SheetRows {
        width: header.len(),
        next_row: header_row + 1,
        range,
    };
    Ok(TabularSource {
        format,
        header,
        rows: Box::new(rows),
    })
}

fn open_workbook(reader: BufReader<File>, format: TabularFormat) -> LoadResult<Sheets<BufReader<File>>> {
    let not_a = |e: &dyn std::fmt::Display| {
        LoadError::format(format!("content is not a readable {format} workbook: {e}"))
    };
    let sheets = match format {
        TabularFormat::Xls => Sheets::Xls(open_workbook_from_rs::<Xls<_>, _>(reader).map_err(|e| not_a(&e))?),
        TabularFormat::Xlsx => Sheets::Xlsx(open_workbook_from_rs::<Xlsx<_>, _>(reader).map_err(|e| not_a(&e))?),
        TabularFormat::Xlsb => Sheets::Xlsb(open_workbook_from_rs::<Xlsb<_>, _>(reader).map_err(|e| not_a(&e))?),
        TabularFormat::Ods => Sheets::Ods(open_workbook_from_rs::<Ods<_>, _>(reader).map_err(|e| not_a(&e))?),
        TabularFormat::Csv | TabularFormat::Tsv => {
            return Err(LoadError::format(format!("{format} is not a spreadsheet format")));
        }
    };
    Ok(sheets)
}

fn find_header(range: &Range<Data>) -> Option<(usize, Vec<String>)> {
    for (idx0, row) in range.rows().enumerate() {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut header: Vec<String> = row.iter().map(cell_to_header_string).collect();
        while header.last().is_some_and(|h| h.is_empty()) {
            header.pop();
        }
        return Some((idx0, header));
    }
    None
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        Data::Error(_) | Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn convert_cell(c: &Data) -> RawValue {
    match c {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::Int(i) => RawValue::Number(*i as f64),
        Data::Float(f) => RawValue::Number(*f),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::DateTime(_) => match c.as_datetime() {
            Some(dt) => RawValue::DateTime(dt),
            None => RawValue::Text(c.to_string()),
        },
        Data::DateTimeIso(s) => match parse_timestamp(s) {
            Some(dt) => RawValue::DateTime(dt),
            None => RawValue::Text(s.clone()),
        },
        Data::String(s) | Data::DurationIso(s) => {
            if s.is_empty() {
                RawValue::Empty
            } else {
                RawValue::Text(s.clone())
            }
        }
    }
}

/// Lazily yields header-aligned rows from a worksheet range.
struct SheetRows {
    range: Range<Data>,
    next_row: usize,
    width: usize,
}

impl Iterator for SheetRows {
    type Item = LoadResult<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_row < self.range.height() {
            let r = self.next_row;
            self.next_row += 1;
            let row: SourceRow = (0..self.width)
                .map(|c| self.range.get((r, c)).map(convert_cell).unwrap_or(RawValue::Empty))
                .collect();
            if row.iter().all(RawValue::is_empty) {
                continue;
            }
            return Some(Ok(row));
        }
        None
    }
}
