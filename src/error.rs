//! Error types for the pdf2xlsx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2XlsxError`] is **fatal**: the batch cannot proceed at all (the
//!   input is not a valid or safe archive, the scratch tree cannot be
//!   created, the pdfium library cannot be bound). Returned as
//!   `Err(Pdf2XlsxError)` from the top-level `convert_*` functions. No
//!   partial output is produced.
//!
//! * [`DocumentError`] is **non-fatal**: a single PDF failed to open, parse
//!   or write, but every other document in the batch is unaffected. Stored
//!   inside [`crate::output::ConversionOutcome::Error`] and counted in
//!   [`crate::output::RunSummary::fail_count`].
//!
//! A document without any table is not an error at all; it is recorded as
//! [`crate::output::ConversionOutcome::NoTables`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2xlsx library.
///
/// Per-document failures use [`DocumentError`] and are stored in
/// [`crate::output::DocumentResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2XlsxError {
    // ── Archive errors ────────────────────────────────────────────────────
    /// The input stream is not a readable ZIP archive, or an entry could
    /// not be decompressed.
    #[error("Input is not a valid ZIP archive: {detail}")]
    InvalidArchive { detail: String },

    /// An entry would be written outside the extraction root (absolute
    /// path, `..` traversal) or is a symbolic link.
    #[error("Archive entry '{name}' is unsafe: {reason}")]
    UnsafeEntryPath { name: String, reason: String },

    /// The archive exceeds the configured entry-count or size limit.
    #[error("Archive exceeds limit: {detail}\nRaise the limit with --max-entries / --max-extracted-mb.")]
    ArchiveTooLarge { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Creating, filling or walking the scratch tree failed.
    #[error("Scratch directory error at '{path}': {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input archive file was not found or could not be read.
    #[error("Cannot read input archive '{path}': {source}")]
    InputNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output archive file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Place libpdfium next to the executable or in the working directory.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n\
  • Install a system-wide pdfium build.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2XlsxError {
    /// True for the archive-level failures (invalid, unsafe or oversized
    /// input archive).
    pub fn is_archive_error(&self) -> bool {
        matches!(
            self,
            Pdf2XlsxError::InvalidArchive { .. }
                | Pdf2XlsxError::UnsafeEntryPath { .. }
                | Pdf2XlsxError::ArchiveTooLarge { .. }
        )
    }

    pub(crate) fn scratch(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Pdf2XlsxError::Scratch {
            path: path.into(),
            source,
        }
    }
}

impl From<zip::result::ZipError> for Pdf2XlsxError {
    fn from(e: zip::result::ZipError) -> Self {
        Pdf2XlsxError::InvalidArchive {
            detail: e.to_string(),
        }
    }
}

/// A non-fatal error for a single document.
///
/// Stored in [`crate::output::ConversionOutcome::Error`]. The batch always
/// continues with the next document.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The PDF could not be opened (corrupt header/xref, not a PDF, I/O).
    #[error("cannot open PDF: {detail}")]
    Open { detail: String },

    /// The PDF is encrypted and no password was configured.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// A password was configured but it does not unlock the PDF.
    #[error("wrong password for encrypted PDF")]
    WrongPassword,

    /// A page could not be read.
    #[error("page {page}: {detail}")]
    Page { page: usize, detail: String },

    /// The extracted rows could not be written as a spreadsheet.
    #[error("cannot write spreadsheet '{path}': {detail}")]
    Write { path: PathBuf, detail: String },

    /// Another document in the same run already produced this output path,
    /// e.g. `report.pdf` next to `report.PDF`.
    #[error("output '{path}' already written by {claimed_by}")]
    OutputCollision { path: String, claimed_by: String },
}
