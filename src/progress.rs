//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through the batch. The front-end decides
//! how to present them (terminal progress bar, web widget, log file).
//!
//! Events for one run arrive in this order:
//!
//! ```text
//! on_batch_start(total)
//!   ┌ on_document_start(i, total, path)
//!   │ on_log_line(line)
//!   │ on_document_complete(result, processed, total)
//!   └ on_progress(processed / total)          × total
//! on_batch_complete(summary)
//! ```
//!
//! # Example
//!
//! ```rust
//! use pdf2xlsx::{BatchConfig, BatchProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder {
//!     fractions: Mutex<Vec<f64>>,
//! }
//!
//! impl BatchProgressCallback for Recorder {
//!     fn on_progress(&self, fraction: f64) {
//!         self.fractions.lock().unwrap().push(fraction);
//!     }
//! }
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(Arc::new(Recorder::default()))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{DocumentResult, RunSummary};
use std::sync::Arc;

/// Called by the batch orchestrator as it processes each document.
///
/// Documents are processed sequentially, so methods are never invoked
/// concurrently for one run. The trait is still `Send + Sync` because the
/// whole run may be moved to a blocking thread by
/// [`crate::convert::convert_archive_async`]. All methods have default
/// no-op implementations.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after discovery, before the first document.
    ///
    /// # Arguments
    /// * `total_documents` - number of documents that will be processed
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before a document is opened.
    ///
    /// # Arguments
    /// * `index`         - 1-indexed position in processing order
    /// * `total`         - total documents in the batch
    /// * `relative_path` - `/`-separated path relative to the archive root
    fn on_document_start(&self, index: usize, total: usize, relative_path: &str) {
        let _ = (index, total, relative_path);
    }

    /// Called once per document with its terminal outcome.
    ///
    /// # Arguments
    /// * `result`    - the document's outcome and timing
    /// * `processed` - documents finished so far, including this one
    /// * `total`     - total documents in the batch
    fn on_document_complete(&self, result: &DocumentResult, processed: usize, total: usize) {
        let _ = (result, processed, total);
    }

    /// Called after each document with `processed / total`.
    ///
    /// The sequence is non-decreasing and its last value is exactly `1.0`.
    /// An empty batch reports a single `1.0`.
    fn on_progress(&self, fraction: f64) {
        let _ = fraction;
    }

    /// Called with each human-readable log line as it is recorded in
    /// [`RunSummary::log_lines`].
    fn on_log_line(&self, line: &str) {
        let _ = line;
    }

    /// Called once after all documents have been attempted.
    fn on_batch_complete(&self, summary: &RunSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
