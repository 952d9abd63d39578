//! Loader configuration.
//!
//! Accepted formats, batch size and inference sample size live in [`LoaderConfig`], which is
//! handed to the [`Loader`](crate::load::Loader) at construction.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LoadResult};
use crate::ingestion::LoadSeverity;
use crate::schema::InferenceOptions;

/// MIME types (and short format names) accepted by default.
pub const DEFAULT_MIME_TYPES: &[&str] = &[
    "csv",
    "application/csv",
    "text/csv",
    "text/comma-separated-values",
    "tsv",
    "text/tab-separated-values",
    "xls",
    "application/vnd.ms-excel",
    "xlsx",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "ods",
    "application/vnd.oasis.opendocument.spreadsheet",
];

/// Options controlling a [`crate::load::Loader`].
///
/// Use [`Default`] for common cases; unknown JSON keys are rejected so typos surface early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Normalized MIME types (lower-case, no parameters) the loader will accept.
    pub accepted_mime_types: BTreeSet<String>,
    /// Leading non-empty values per column examined by type inference.
    pub inference_sample_size: usize,
    /// Infer numbers written with a redundant leading zero (`07`, `02124`) as text rather
    /// than numeric. Off by default.
    pub leading_zero_codes_as_text: bool,
    /// Rows appended to the destination per flush.
    pub batch_size: usize,
    /// Encoding label used for delimited-text fields that are not valid UTF-8.
    pub fallback_encoding: String,
    /// Worksheet to load from spreadsheets; the first sheet when `None`.
    pub sheet_name: Option<String>,
    /// Severity at which observers receive `on_alert`.
    pub alert_at_or_above: LoadSeverity,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            accepted_mime_types: DEFAULT_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            inference_sample_size: 1_000,
            leading_zero_codes_as_text: false,
            batch_size: 1_000,
            fallback_encoding: "windows-1252".to_string(),
            sheet_name: None,
            alert_at_or_above: LoadSeverity::Critical,
        }
    }
}

impl LoaderConfig {
    /// Parse a configuration document; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> LoadResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LoadError::format(format!("invalid loader configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> LoadResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> LoadResult<()> {
        if self.batch_size == 0 {
            return Err(LoadError::format("invalid loader configuration: batch_size must be > 0"));
        }
        if self.inference_sample_size == 0 {
            return Err(LoadError::format(
                "invalid loader configuration: inference_sample_size must be > 0",
            ));
        }
        if encoding_rs::Encoding::for_label(self.fallback_encoding.as_bytes()).is_none() {
            return Err(LoadError::format(format!(
                "invalid loader configuration: unknown encoding '{}'",
                self.fallback_encoding
            )));
        }
        Ok(())
    }

    pub fn inference_options(&self) -> InferenceOptions {
        InferenceOptions {
            sample_size: self.inference_sample_size,
            leading_zero_codes_as_text: self.leading_zero_codes_as_text,
        }
    }

    /// Whether the (possibly parameterized) MIME type is accepted.
    pub fn accepts(&self, mime_type: &str) -> bool {
        self.accepted_mime_types.contains(&normalize_mime(mime_type))
    }
}

/// Lower-cases a MIME type and drops parameters such as `; charset=utf-8`.
pub fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
