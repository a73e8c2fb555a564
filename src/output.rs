//! Result types produced by a batch run.
//!
//! [`ConversionOutcome`] is the terminal state of one document,
//! [`DocumentResult`] adds where it came from and where it went, and
//! [`RunSummary`] aggregates the whole batch. [`BatchOutput`] bundles the
//! packed output archive with both.

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};

/// Terminal classification of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// At least one table was found; a spreadsheet with `rows` rows was written.
    Success { rows: usize },
    /// The document opened fine but no table was detected. Nothing was written.
    NoTables,
    /// Opening, reading or writing failed.
    Error(DocumentError),
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ConversionOutcome::Error(_))
    }
}

/// Outcome of one document, in processing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    /// `/`-separated path of the PDF relative to the input root.
    pub relative_path: String,
    /// `/`-separated path of the written spreadsheet relative to the output
    /// root. `None` unless the outcome is `Success`.
    pub output_path: Option<String>,
    pub outcome: ConversionOutcome,
    /// Wall-clock time spent on this document (open + extract + write).
    pub duration_ms: u64,
}

/// Run-level statistics and the ordered human-readable log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Documents discovered and attempted.
    pub total: usize,
    /// Documents converted to a spreadsheet.
    pub success_count: usize,
    /// Documents whose conversion failed.
    pub fail_count: usize,
    /// Documents without any detected table.
    pub no_tables_count: usize,
    /// Seconds from pipeline start to the end of the document loop.
    pub elapsed_seconds: f64,
    /// One line per document describing its fate, in processing order.
    pub log_lines: Vec<String>,
}

impl RunSummary {
    /// Fold one document's outcome into the counters.
    pub(crate) fn record(&mut self, outcome: &ConversionOutcome) {
        self.total += 1;
        match outcome {
            ConversionOutcome::Success { .. } => self.success_count += 1,
            ConversionOutcome::NoTables => self.no_tables_count += 1,
            ConversionOutcome::Error(_) => self.fail_count += 1,
        }
    }
}

/// Everything a caller receives from [`crate::convert::convert_archive`].
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutput {
    /// The packed output ZIP archive.
    #[serde(skip)]
    pub archive: Vec<u8>,
    pub summary: RunSummary,
    pub documents: Vec<DocumentResult>,
}
