//! Configuration types for batch PDF-to-spreadsheet conversion.
//!
//! All batch behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. Table-detection tolerances live in
//! [`TableSettings`], which is consumed by
//! [`crate::pipeline::pdfium::PdfiumTableSource`].

use crate::error::Pdf2XlsxError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for one batch conversion.
///
/// Built via [`BatchConfig::builder()`] or using [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2xlsx::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .password("s3cret")
///     .max_entries(500)
///     .build()
///     .unwrap();
/// assert_eq!(config.output_extension, "xlsx");
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Extension (without dot) of the documents to convert, matched
    /// case-insensitively. Default: `"pdf"`.
    pub input_extension: String,

    /// Extension (without dot) given to every written spreadsheet. Default: `"xlsx"`.
    pub output_extension: String,

    /// Password tried for encrypted PDFs. Default: none.
    pub password: Option<String>,

    /// Safety limits applied while unpacking the input archive.
    pub limits: ArchiveLimits,

    /// Directory in which the scratch tree is created. Default: the system
    /// temp directory.
    pub scratch_parent: Option<PathBuf>,

    /// Receiver of per-document progress and log lines. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_extension: "pdf".to_string(),
            output_extension: "xlsx".to_string(),
            password: None,
            limits: ArchiveLimits::default(),
            scratch_parent: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("input_extension", &self.input_extension)
            .field("output_extension", &self.output_extension)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("limits", &self.limits)
            .field("scratch_parent", &self.scratch_parent)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn input_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.input_extension = strip_dot(ext.into());
        self
    }

    pub fn output_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.output_extension = strip_dot(ext.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn max_entries(mut self, n: usize) -> Self {
        self.config.limits.max_entries = n;
        self
    }

    pub fn max_extracted_bytes(mut self, n: u64) -> Self {
        self.config.limits.max_extracted_bytes = n;
        self
    }

    pub fn scratch_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_parent = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, Pdf2XlsxError> {
        let c = &self.config;
        validate_extension("input", &c.input_extension)?;
        validate_extension("output", &c.output_extension)?;
        if c.limits.max_entries == 0 {
            return Err(Pdf2XlsxError::InvalidConfig(
                "max_entries must be ≥ 1".into(),
            ));
        }
        if c.limits.max_extracted_bytes == 0 {
            return Err(Pdf2XlsxError::InvalidConfig(
                "max_extracted_bytes must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

fn strip_dot(ext: String) -> String {
    match ext.strip_prefix('.') {
        Some(rest) => rest.to_string(),
        None => ext,
    }
}

fn validate_extension(which: &str, ext: &str) -> Result<(), Pdf2XlsxError> {
    if ext.is_empty() {
        return Err(Pdf2XlsxError::InvalidConfig(format!(
            "{which} extension must not be empty"
        )));
    }
    if ext.contains(['/', '\\']) {
        return Err(Pdf2XlsxError::InvalidConfig(format!(
            "{which} extension '{ext}' must not contain a path separator"
        )));
    }
    Ok(())
}

/// Limits enforced while unpacking an input archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveLimits {
    /// Maximum number of entries (files and directories). Default: 100 000.
    pub max_entries: usize,

    /// Maximum total decompressed size in bytes. Default: 4 GiB.
    ///
    /// Counted on the bytes actually inflated, not on the sizes declared in
    /// the central directory.
    pub max_extracted_bytes: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            max_extracted_bytes: 4 * 1024 * 1024 * 1024,
        }
    }
}

/// Tolerances of the lattice (ruling-line) table finder, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    /// Parallel edges closer than this are snapped onto one line. Default: 3.0.
    pub snap_tolerance: f32,

    /// Collinear edges separated by a gap up to this are merged. Default: 3.0.
    pub join_tolerance: f32,

    /// Slack allowed when testing whether two edges cross. Default: 3.0.
    pub intersection_tolerance: f32,

    /// Edges shorter than this are ignored. Default: 3.0.
    pub min_edge_length: f32,

    /// Horizontal gap between characters that becomes a space. Default: 3.0.
    pub text_x_tolerance: f32,

    /// Vertical distance under which characters share a text line. Default: 3.0.
    pub text_y_tolerance: f32,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            intersection_tolerance: 3.0,
            min_edge_length: 3.0,
            text_x_tolerance: 3.0,
            text_y_tolerance: 3.0,
        }
    }
}

impl TableSettings {
    /// Reject negative or non-finite tolerances.
    pub fn validate(&self) -> Result<(), Pdf2XlsxError> {
        let fields = [
            ("snap_tolerance", self.snap_tolerance),
            ("join_tolerance", self.join_tolerance),
            ("intersection_tolerance", self.intersection_tolerance),
            ("min_edge_length", self.min_edge_length),
            ("text_x_tolerance", self.text_x_tolerance),
            ("text_y_tolerance", self.text_y_tolerance),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(Pdf2XlsxError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}
