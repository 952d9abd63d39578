use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LoadErrorKind};

use super::unified::TabularFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoadSeverity {
    /// Informational progress message.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (load failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

impl LoadSeverity {
    /// Severity a failed load is reported with.
    pub fn for_error(error: &LoadError) -> Self {
        match error.kind() {
            LoadErrorKind::Io => Self::Critical,
            _ => Self::Error,
        }
    }
}

/// Context about a load attempt.
#[derive(Debug, Clone)]
pub struct LoadContext {
    /// Destination resource (table) identifier.
    pub resource_id: String,
    /// Source path, when loading from a file.
    pub path: Option<PathBuf>,
    /// Format selected from the declared MIME type; `None` when the type is not recognised.
    pub format: Option<TabularFormat>,
}

impl LoadContext {
    pub fn format_label(&self) -> &'static str {
        self.format.map_or("unknown", |f| f.as_str())
    }
}

/// Stats reported on a successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows appended by this load.
    pub rows: usize,
    /// Batches flushed to the destination.
    pub batches: usize,
    /// Data columns of the table after the load.
    pub columns: usize,
    /// Columns appended to the table by this load.
    pub added_columns: usize,
}

/// Logging sink for the load pipeline.
///
/// The loader never picks a log destination itself; callers inject an implementation.
/// Implementations must not block indefinitely.
pub trait LoadObserver: Send + Sync {
    /// Free-text progress or diagnostic message.
    fn on_message(&self, _ctx: &LoadContext, _severity: LoadSeverity, _message: &str) {}

    /// Called when a load succeeds.
    fn on_success(&self, _ctx: &LoadContext, _stats: LoadStats) {}

    /// Called when a load fails.
    fn on_failure(&self, _ctx: &LoadContext, _severity: LoadSeverity, _error: &LoadError) {}

    /// Called when a failure meets the configured alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl LoadObserver for NullObserver {}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn LoadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl LoadObserver for CompositeObserver {
    fn on_message(&self, ctx: &LoadContext, severity: LoadSeverity, message: &str) {
        for o in &self.observers {
            o.on_message(ctx, severity, message);
        }
    }

    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs load events to stderr. This is the console sink used when nothing else is configured.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl LoadObserver for StdErrObserver {
    fn on_message(&self, ctx: &LoadContext, severity: LoadSeverity, message: &str) {
        eprintln!("[load][{:?}] resource={} {}", severity, ctx.resource_id, message);
    }

    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        eprintln!(
            "[load][ok] format={} resource={} rows={} batches={} columns={}",
            ctx.format_label(), ctx.resource_id, stats.rows, stats.batches, stats.columns
        );
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        eprintln!(
            "[load][{:?}] format={} resource={} kind={:?} err={}",
            severity,
            ctx.format_label(),
            ctx.resource_id,
            error.kind(),
            error
        );
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        eprintln!(
            "[ALERT][load][{:?}] format={} resource={} kind={:?} err={}",
            severity,
            ctx.format_label(),
            ctx.resource_id,
            error.kind(),
            error
        );
    }
}

/// Appends load events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl LoadObserver for FileObserver {
    fn on_message(&self, ctx: &LoadContext, severity: LoadSeverity, message: &str) {
        self.append_line(&format!(
            "{} {:?} resource={} {}",
            unix_ts(),
            severity,
            ctx.resource_id,
            message
        ));
    }

    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        self.append_line(&format!(
            "{} ok format={} resource={} rows={} batches={}",
            unix_ts(),
            ctx.format_label(),
            ctx.resource_id,
            stats.rows,
            stats.batches
        ));
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        self.append_line(&format!(
            "{} fail severity={:?} format={} resource={} err={}",
            unix_ts(),
            severity,
            ctx.format_label(),
            ctx.resource_id,
            error
        ));
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} format={} resource={} err={}",
            unix_ts(),
            severity,
            ctx.format_label(),
            ctx.resource_id,
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
