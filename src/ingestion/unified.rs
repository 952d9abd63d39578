//! Unified reader entrypoint.
//!
//! [`open_table`] turns a file plus a declared MIME type into a [`TabularSource`]: the header row
//! and a lazy stream of the remaining rows.
//!
//! - The concrete parser is selected from the declared MIME type, never from the file extension
//!   or by sniffing content.
//! - Content that does not fit the declared format still surfaces as a classified
//!   [`crate::LoadError`], either while opening or while rows are pulled.

use std::fmt;
use std::io::Read;
use std::path::Path;

use crate::config::{normalize_mime, LoaderConfig};
use crate::error::{LoadError, LoadResult};
use crate::types::SourceRow;

use super::{csv, excel};

/// Supported tabular formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabularFormat {
    /// Comma-separated values.
    Csv,
    /// Tab-separated values.
    Tsv,
    /// Legacy Excel (BIFF, `.xls`).
    Xls,
    /// Excel 2007+ (`.xlsx`, `.xlsm`).
    Xlsx,
    /// Excel binary workbook (`.xlsb`).
    Xlsb,
    /// OpenDocument spreadsheet (`.ods`).
    Ods,
}

impl TabularFormat {
    /// Select a format from a declared MIME type or short format name (case-insensitive,
    /// parameters ignored).
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match normalize_mime(mime_type).as_str() {
            "csv" | "text/csv" | "application/csv" | "text/comma-separated-values" => Some(Self::Csv),
            "tsv" | "text/tsv" | "text/tab-separated-values" => Some(Self::Tsv),
            "xls" | "application/vnd.ms-excel" => Some(Self::Xls),
            "xlsx"
            | "xlsm"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel.sheet.macroenabled.12" => Some(Self::Xlsx),
            "xlsb" | "application/vnd.ms-excel.sheet.binary.macroenabled.12" => Some(Self::Xlsb),
            "ods" | "application/vnd.oasis.opendocument.spreadsheet" => Some(Self::Ods),
            _ => None,
        }
    }

    /// Like [`Self::from_mime`], but unknown types become a format-detection failure.
    pub fn require(mime_type: &str) -> LoadResult<Self> {
        Self::from_mime(mime_type)
            .ok_or_else(|| LoadError::format(format!("unsupported format '{mime_type}'")))
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
            Self::Xlsb => "xlsb",
            Self::Ods => "ods",
        }
    }

    pub fn is_delimited(&self) -> bool {
        matches!(self, Self::Csv | Self::Tsv)
    }

    pub(crate) fn delimiter(&self) -> u8 {
        match self {
            Self::Tsv => b'\t',
            _ => b',',
        }
    }
}

impl fmt::Display for TabularFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forward-only stream of data rows; each item is aligned with the header.
pub type RowStream = Box<dyn Iterator<Item = LoadResult<SourceRow>>>;

/// An opened tabular input: the header row plus a lazy stream of data rows.
///
/// Dropping the source releases the underlying file handle.
pub struct TabularSource {
    pub format: TabularFormat,
    pub header: Vec<String>,
    pub rows: RowStream,
}

impl fmt::Debug for TabularSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabularSource")
            .field("format", &self.format)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

/// Open a file as the format named by `mime_type`.
///
/// # Examples
///
/// ```no_run
/// use shift_loader::config::LoaderConfig;
/// use shift_loader::ingestion::open_table;
///
/// # fn main() -> Result<(), shift_loader::LoadError> {
/// let source = open_table("simple.csv", "text/csv", &LoaderConfig::default())?;
/// println!("header={:?}", source.header);
/// for row in source.rows {
///     println!("{:?}", row?);
/// }
/// # Ok(())
/// # }
/// ```
pub fn open_table(
    path: impl AsRef<Path>,
    mime_type: &str,
    config: &LoaderConfig,
) -> LoadResult<TabularSource> {
    let format = TabularFormat::require(mime_type)?;
    let path = path.as_ref();
    if format.is_delimited() {
        let file = std::fs::File::open(path)?;
        csv::open_delimited(file, format, &config.fallback_encoding)
    } else {
        excel::open_spreadsheet(path, format, config.sheet_name.as_deref())
    }
}

/// Open a delimited-text stream (CSV or TSV) that is not backed by a file path.
pub fn open_delimited_reader<R: Read + 'static>(
    reader: R,
    mime_type: &str,
    config: &LoaderConfig,
) -> LoadResult<TabularSource> {
    let format = TabularFormat::require(mime_type)?;
    if !format.is_delimited() {
        return Err(LoadError::format(format!(
            "format '{format}' needs a seekable file; open it by path instead"
        )));
    }
    csv::open_delimited(reader, format, &config.fallback_encoding)
}

#[cfg(test)]
mod tests {
    use super::TabularFormat;

    #[test]
    fn mime_types_select_formats() {
        assert_eq!(TabularFormat::from_mime("text/csv"), Some(TabularFormat::Csv));
        assert_eq!(TabularFormat::from_mime("TEXT/CSV; charset=utf-8"), Some(TabularFormat::Csv));
        assert_eq!(TabularFormat::from_mime("xls"), Some(TabularFormat::Xls));
        assert_eq!(
            TabularFormat::from_mime("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            Some(TabularFormat::Xlsx)
        );
        assert_eq!(TabularFormat::from_mime("text/tab-separated-values"), Some(TabularFormat::Tsv));
        assert_eq!(TabularFormat::from_mime("application/geo+json"), None);
    }

    #[test]
    fn unknown_mime_is_a_format_error() {
        let err = TabularFormat::require("application/zip").unwrap_err();
        assert_eq!(err.kind(), crate::LoadErrorKind::FormatDetection);
        assert!(err.to_string().contains("application/zip"));
    }
}
