//! Upload hooks and the [`submit`] entry point that runs them around a load.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::LoadResult;
use crate::ingestion::{LoadContext, LoadObserver, LoadSeverity, LoadStats, TabularFormat};
use crate::load::{LoadRequest, Loader};

/// What a hook learns about a finished load.
#[derive(Debug, Clone)]
pub struct UploadContext<'a> {
    pub request: &'a LoadRequest,
    pub stats: LoadStats,
}

/// Extension point consulted before a load and notified after a successful one.
pub trait UploadHook: Send + Sync {
    /// Returning `false` vetoes the load.
    fn can_upload(&self, _resource_id: &str) -> bool {
        true
    }

    /// Called once the resource has been loaded and committed.
    fn after_upload(&self, _context: &UploadContext<'_>, _resource: &Value, _dataset: &Value) {}
}

/// Hooks in registration order.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn UploadHook>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks_len", &self.hooks.len())
            .finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn UploadHook>) -> &mut Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// True unless some hook vetoes; stops at the first veto.
    pub fn can_upload(&self, resource_id: &str) -> bool {
        self.hooks.iter().all(|h| h.can_upload(resource_id))
    }

    pub fn after_upload(&self, context: &UploadContext<'_>, resource: &Value, dataset: &Value) {
        for hook in &self.hooks {
            hook.after_upload(context, resource, dataset);
        }
    }
}

/// A load plus the caller-owned descriptions handed to `after_upload`.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub load: LoadRequest,
    pub resource: Value,
    pub dataset: Value,
}

/// Why [`submit`] did not load anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The declared MIME type is not in the accepted list.
    UnsupportedFormat(String),
    /// A hook's `can_upload` returned false.
    Vetoed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat(mime) => write!(f, "format '{mime}' is not accepted"),
            Self::Vetoed => f.write_str("vetoed by an upload hook"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Loaded(LoadStats),
    Skipped(SkipReason),
}

/// Loads `request` unless its format is not accepted or a hook vetoes it.
///
/// Hooks are not consulted for unaccepted formats. `after_upload` runs only after a successful
/// load; load errors are returned unchanged.
pub fn submit(
    loader: &Loader,
    hooks: &HookRegistry,
    request: &SubmitRequest,
    observer: &dyn LoadObserver,
) -> LoadResult<SubmitOutcome> {
    let load = &request.load;
    let skip = if !loader.config().accepts(&load.mime_type) {
        Some(SkipReason::UnsupportedFormat(load.mime_type.clone()))
    } else if !hooks.can_upload(&load.resource_id) {
        Some(SkipReason::Vetoed)
    } else {
        None
    };

    if let Some(reason) = skip {
        let ctx = LoadContext {
            resource_id: load.resource_id.clone(),
            path: Some(load.path.clone()),
            format: TabularFormat::from_mime(&load.mime_type),
        };
        observer.on_message(&ctx, LoadSeverity::Info, &format!("skipped: {reason}"));
        return Ok(SubmitOutcome::Skipped(reason));
    }

    let stats = loader.load(load, observer)?;
    hooks.after_upload(&UploadContext { request: load, stats }, &request.resource, &request.dataset);
    Ok(SubmitOutcome::Loaded(stats))
}
