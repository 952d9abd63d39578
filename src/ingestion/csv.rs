//! Delimited-text (CSV / TSV) reader.
//!
//! Rules:
//!
//! - The first non-blank record is the header; blank records are skipped.
//! - Fields are decoded as UTF-8, falling back to the configured legacy encoding per field.
//! - Header cells are trimmed; data cells are kept as written and only empty cells become
//!   [`RawValue::Empty`].
//! - A row with fewer cells than the header fails the load, as do non-empty cells past the
//!   header width. Either usually means a line break inside an unquoted field.
//! - A record split by a bare carriage return outside quotes fails the load.

use std::collections::BTreeSet;
use std::io::{self, Read};

use csv::{ByteRecord, ReaderBuilder};
use encoding_rs::Encoding;

use crate::error::{LoadError, LoadResult};
use crate::types::{RawValue, SourceRow};

use super::unified::{TabularFormat, TabularSource};

/// Longest header excerpt quoted in format-detection messages.
const HEADER_EXCERPT_CHARS: usize = 80;

/// Open a delimited stream: read the header eagerly, stream the rest.
pub fn open_delimited<R: Read + 'static>(
    reader: R,
    format: TabularFormat,
    fallback_encoding: &str,
) -> LoadResult<TabularSource> {
    let encoding = Encoding::for_label(fallback_encoding.as_bytes()).ok_or_else(|| {
        LoadError::format(format!("unknown fallback encoding '{fallback_encoding}'"))
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(format.delimiter())
        .from_reader(CarriageReturnTracker::new(reader));

    let mut record = ByteRecord::new();
    loop {
        if !reader.read_byte_record(&mut record)? {
            return Err(LoadError::format(format!("no header row found in {format} input")));
        }
        if !record.iter().all(|field| field.trim_ascii().is_empty()) {
            break;
        }
    }
    let header = decode_header(&record, encoding, format)?;

    let rows = DelimitedRows {
        header: header.clone(),
        width: header.len(),
        previous_width: record.len(),
        reader,
        record,
        encoding,
        done: false,
    };
    Ok(TabularSource {
        format,
        header,
        rows: Box::new(rows),
    })
}

fn decode_header(
    record: &ByteRecord,
    encoding: &'static Encoding,
    format: TabularFormat,
) -> LoadResult<Vec<String>> {
    let mut header: Vec<String> = record
        .iter()
        .map(|field| decode_field(field, encoding).trim().to_string())
        .collect();
    if let Some(first) = header.first_mut() {
        *first = first.trim_start_matches('\u{feff}').to_string();
    }

    // Binary payloads declared as text decode to control characters.
    let binary = header
        .iter()
        .any(|cell| cell.chars().any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r')));
    if binary {
        let separator = (format.delimiter() as char).to_string();
        let excerpt: String = header
            .join(&separator)
            .chars()
            .take(HEADER_EXCERPT_CHARS)
            .collect();
        return Err(LoadError::format(format!(
            "content does not look like {format} text; header begins with \"{}\"",
            excerpt.escape_debug()
        )));
    }
    Ok(header)
}

fn decode_field(bytes: &[u8], encoding: &'static Encoding) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
    }
}

fn is_blank(record: &ByteRecord) -> bool {
    record.iter().all(<[u8]>::is_empty)
}

/// Lazily decodes data records into header-aligned rows.
struct DelimitedRows<R: Read> {
    reader: csv::Reader<CarriageReturnTracker<R>>,
    header: Vec<String>,
    record: ByteRecord,
    encoding: &'static Encoding,
    width: usize,
    previous_width: usize,
    done: bool,
}

impl<R: Read> DelimitedRows<R> {
    fn decode_row(&self, line: u64) -> LoadResult<SourceRow> {
        let mut row: SourceRow = Vec::with_capacity(self.width);
        for (idx, field) in self.record.iter().enumerate() {
            if idx >= self.width {
                if field.trim_ascii().is_empty() {
                    continue;
                }
                return Err(LoadError::destination(format!(
                    "extra data after last expected column (line {line})"
                )));
            }
            row.push(if field.is_empty() {
                RawValue::Empty
            } else {
                RawValue::Text(decode_field(field, self.encoding))
            });
        }
        Ok(row)
    }

    /// Error for a record with fewer cells than the header.
    ///
    /// Reads one record ahead: when the short record ended at a bare carriage return the CR sat
    /// unquoted inside a field, which is the more useful diagnosis.
    fn short_row_error(&mut self, line: u64) -> LoadError {
        let mut next = ByteRecord::new();
        let ended_at_bare_cr = match self.reader.read_byte_record(&mut next) {
            Ok(true) => {
                let start = next.position().map(|p| p.byte()).unwrap_or(0);
                self.reader.get_mut().take_bare_cr_before(start)
            }
            _ => self.reader.get_mut().ends_with_bare_cr(),
        };
        if ended_at_bare_cr {
            return LoadError::destination(format!("unquoted carriage return found in data (line {line})"));
        }
        let missing = self.header.get(self.record.len()).map(String::as_str).unwrap_or_default();
        LoadError::destination(format!("missing data for column \"{missing}\" (line {line})"))
    }
}

impl<R: Read> Iterator for DelimitedRows<R> {
    type Item = LoadResult<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.reader.read_byte_record(&mut self.record) {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }

            let (start, line) = self
                .record
                .position()
                .map(|p| (p.byte(), p.line()))
                .unwrap_or((0, 0));
            let width = self.record.len();
            let previous_width = std::mem::replace(&mut self.previous_width, width);
            let after_bare_cr = self.reader.get_mut().take_bare_cr_before(start);
            // A quoted CR never terminates a record, so a record boundary at a bare CR that
            // breaks the column count means the CR sat unquoted inside a field.
            if after_bare_cr && (width != self.width || previous_width != self.width) {
                self.done = true;
                return Some(Err(LoadError::destination(format!(
                    "unquoted carriage return found in data (line {line})"
                ))));
            }

            if is_blank(&self.record) {
                continue;
            }
            if width < self.width {
                self.done = true;
                return Some(Err(self.short_row_error(line)));
            }
            return Some(self.decode_row(line));
        }
    }
}

/// Passes bytes through while remembering where bare carriage returns (a `\r` not followed by
/// `\n`) occur.
///
/// Offsets are pruned as the reader moves past them, so memory stays bounded by the parser's
/// read-ahead.
struct CarriageReturnTracker<R> {
    inner: R,
    offset: u64,
    pending_cr: Option<u64>,
    bare: BTreeSet<u64>,
}

impl<R> CarriageReturnTracker<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            pending_cr: None,
            bare: BTreeSet::new(),
        }
    }

    /// Whether the byte just before `start` was a bare CR; forgets offsets before `start`.
    fn take_bare_cr_before(&mut self, start: u64) -> bool {
        if start == 0 {
            return false;
        }
        let found = self.bare.contains(&(start - 1));
        self.bare = self.bare.split_off(&start);
        found
    }

    /// Whether the input read so far ends with a bare CR.
    fn ends_with_bare_cr(&self) -> bool {
        self.offset > 0 && self.bare.contains(&(self.offset - 1))
    }
}

impl<R: Read> Read for CarriageReturnTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            if let Some(at) = self.pending_cr.take() {
                self.bare.insert(at);
            }
            return Ok(0);
        }
        for (i, &byte) in buf[..n].iter().enumerate() {
            if let Some(cr) = self.pending_cr.take() {
                if byte != b'\n' {
                    self.bare.insert(cr);
                }
            }
            if byte == b'\r' {
                self.pending_cr = Some(self.offset + i as u64);
            }
        }
        self.offset += n as u64;
        Ok(n)
    }
}
