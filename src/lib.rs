//! # pdf2xlsx
//!
//! Convert a ZIP archive of PDFs, nested in any folder layout, into a ZIP
//! archive of Excel workbooks with the same layout.
//!
//! Every table found in a PDF is appended, in page order, to a single
//! worksheet. PDFs without tables produce no file; PDFs that fail to open
//! are reported and skipped. The run never stops for one bad document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ZIP bytes
//!  │
//!  ├─ 1. Unpack   into a scoped scratch tree, rejecting unsafe entries
//!  ├─ 2. Locate   every *.pdf, recursively, in name order
//!  ├─ 3. Extract  ruling-line tables per page via pdfium
//!  ├─ 4. Write    one .xlsx per PDF at the mirrored path
//!  ├─ 5. Pack     output tree into a deterministic ZIP
//!  └─ 6. Report   counts, elapsed time and one log line per PDF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2xlsx::{convert_archive, BatchConfig, PdfiumTableSource, TableSettings};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = PdfiumTableSource::new(None, TableSettings::default())?;
//!     let input = std::fs::read("rainfall.zip")?;
//!     let output = convert_archive(&input, &source, &BatchConfig::default())?;
//!     std::fs::write("rainfall_xlsx.zip", &output.archive)?;
//!     for line in &output.summary.log_lines {
//!         eprintln!("{line}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2xlsx` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2xlsx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ArchiveLimits, BatchConfig, BatchConfigBuilder, TableSettings};
pub use convert::{
    convert_archive, convert_archive_async, convert_archive_file, convert_directory, write_archive,
};
pub use error::{DocumentError, Pdf2XlsxError};
pub use output::{BatchOutput, ConversionOutcome, DocumentResult, RunSummary};
pub use pipeline::extract::{CombinedResult, RawTable, Row, TableSource};
pub use pipeline::pdfium::PdfiumTableSource;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
