//! Batch conversion entry points.
//!
//! Every entry point drives the same loop: discover documents, convert them
//! one after another, record one [`DocumentResult`] and one log line per
//! document, and report progress after each. A failing document is never
//! fatal; only archive and scratch-tree problems abort a run.
//!
//! | Function | Input | Output |
//! |----------|-------|--------|
//! | [`convert_archive`] | ZIP bytes | [`BatchOutput`] (ZIP bytes + summary) |
//! | [`convert_archive_file`] | ZIP file path | ZIP file (atomic) + [`RunSummary`] |
//! | [`convert_archive_async`] | ZIP bytes | [`BatchOutput`], on a blocking thread |
//! | [`convert_directory`] | extracted tree | spreadsheet tree + [`RunSummary`] |
//!
//! [`write_archive`] is the atomic file write behind [`convert_archive_file`].

use crate::config::BatchConfig;
use crate::error::{DocumentError, Pdf2XlsxError};
use crate::output::{BatchOutput, ConversionOutcome, DocumentResult, RunSummary};
use crate::pipeline::archive::{self, entry_name, ScratchTree};
use crate::pipeline::extract::{extract_tables, TableSource};
use crate::pipeline::locate::{DocumentLocator, DocumentRef};
use crate::pipeline::write::write_tabular;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every PDF inside a ZIP archive into a spreadsheet, returning a
/// ZIP archive that mirrors the input's folder layout.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input`  - Raw bytes of the input ZIP archive
/// * `source` - Table detection backend, usually
///   [`crate::pipeline::pdfium::PdfiumTableSource`]
/// * `config` - Batch configuration
///
/// # Returns
/// `Ok(BatchOutput)` even if some documents failed
/// (check `output.summary.fail_count`).
///
/// # Errors
/// Returns `Err(Pdf2XlsxError)` only for fatal errors:
/// - the input is not a ZIP, or holds an unsafe or oversized entry
/// - the scratch directory cannot be created, written or read
///
/// # Example
/// ```rust,no_run
/// use pdf2xlsx::{convert_archive, BatchConfig, PdfiumTableSource, TableSettings};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = PdfiumTableSource::new(None, TableSettings::default())?;
/// let bytes = std::fs::read("reports.zip")?;
/// let output = convert_archive(&bytes, &source, &BatchConfig::default())?;
/// std::fs::write("reports_xlsx.zip", &output.archive)?;
/// println!("{} of {} converted", output.summary.success_count, output.summary.total);
/// # Ok(())
/// # }
/// ```
pub fn convert_archive(
    input: &[u8],
    source: &dyn TableSource,
    config: &BatchConfig,
) -> Result<BatchOutput, Pdf2XlsxError> {
    let started = Instant::now();
    info!(
        "Starting batch: {} byte archive, backend '{}'",
        input.len(),
        source.backend_name()
    );

    // ── Step 1: Scratch tree (removed on every return path) ──────────────
    let scratch = ScratchTree::create(config.scratch_parent.as_deref())?;

    // ── Step 2: Unpack ───────────────────────────────────────────────────
    let input_root = archive::unpack(input, &scratch, &config.limits)?;

    // ── Step 3: Convert every document ───────────────────────────────────
    let (summary, documents) =
        run_batch(&input_root, scratch.output_root(), source, config, started)?;

    // ── Step 4: Pack the mirrored output tree ────────────────────────────
    let archive = archive::pack(scratch.output_root())?;

    Ok(BatchOutput {
        archive,
        summary,
        documents,
    })
}

/// Convert every PDF under `input_root`, writing spreadsheets under
/// `output_root` with the same relative folders.
///
/// No archive is involved; this is the loop [`convert_archive`] runs on its
/// scratch tree, exposed for callers that already have files on disk.
pub fn convert_directory(
    input_root: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    source: &dyn TableSource,
    config: &BatchConfig,
) -> Result<(RunSummary, Vec<DocumentResult>), Pdf2XlsxError> {
    let input_root = input_root.as_ref();
    if !input_root.is_dir() {
        return Err(Pdf2XlsxError::InputNotFound {
            path: input_root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }
    run_batch(
        input_root,
        output_root.as_ref(),
        source,
        config,
        Instant::now(),
    )
}

/// Convert a ZIP archive on disk and write the output archive to
/// `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub fn convert_archive_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    source: &dyn TableSource,
    config: &BatchConfig,
) -> Result<RunSummary, Pdf2XlsxError> {
    let input_path = input_path.as_ref();
    let bytes = std::fs::read(input_path).map_err(|e| Pdf2XlsxError::InputNotFound {
        path: input_path.to_path_buf(),
        source: e,
    })?;

    let output = convert_archive(&bytes, source, config)?;
    write_archive(output_path, &output.archive)?;
    Ok(output.summary)
}

/// Write a packed archive to `path` atomically (temp file + rename),
/// creating missing parent directories.
pub fn write_archive(path: impl AsRef<Path>, archive: &[u8]) -> Result<(), Pdf2XlsxError> {
    let path = path.as_ref();
    let write_failed = |e| Pdf2XlsxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("zip.tmp");
    std::fs::write(&tmp_path, archive).map_err(write_failed)?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        write_failed(e)
    })?;

    info!("Wrote {} ({} bytes)", path.display(), archive.len());
    Ok(())
}

/// Async wrapper around [`convert_archive`].
///
/// The whole run moves to `tokio::task::spawn_blocking`; pdfium and the
/// file-system work are blocking.
pub async fn convert_archive_async(
    input: Vec<u8>,
    source: Arc<dyn TableSource>,
    config: BatchConfig,
) -> Result<BatchOutput, Pdf2XlsxError> {
    tokio::task::spawn_blocking(move || convert_archive(&input, source.as_ref(), &config))
        .await
        .map_err(|e| Pdf2XlsxError::Internal(format!("Batch task panicked: {e}")))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// The per-document loop shared by all entry points.
fn run_batch(
    input_root: &Path,
    output_root: &Path,
    source: &dyn TableSource,
    config: &BatchConfig,
    started: Instant,
) -> Result<(RunSummary, Vec<DocumentResult>), Pdf2XlsxError> {
    let locator = DocumentLocator::new(input_root, config.input_extension.as_str());
    let callback = config.progress_callback.as_ref();

    // First walk only counts, so progress has a denominator.
    let mut total = 0usize;
    for doc in locator.documents() {
        doc?;
        total += 1;
    }
    info!("Found {} documents under {}", total, input_root.display());
    if let Some(cb) = callback {
        cb.on_batch_start(total);
    }

    let mut summary = RunSummary::default();
    let mut results = Vec::with_capacity(total);
    // Output path -> document that wrote it.
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();

    for (i, doc) in locator.documents().enumerate() {
        let doc = doc?;
        let index = i + 1;
        let relative = doc.display_path();
        if let Some(cb) = callback {
            cb.on_document_start(index, total, &relative);
        }

        let result = convert_document(&doc, output_root, source, config, &mut claimed);
        let line = log_line(&result);
        match result.outcome {
            ConversionOutcome::Error(_) => warn!("{}", line),
            _ => debug!("{} ({} ms)", line, result.duration_ms),
        }

        summary.record(&result.outcome);
        summary.log_lines.push(line);

        if let Some(cb) = callback {
            if let Some(line) = summary.log_lines.last() {
                cb.on_log_line(line);
            }
            cb.on_document_complete(&result, index, total);
            cb.on_progress((index as f64 / total as f64).min(1.0));
        }
        results.push(result);
    }

    if total == 0 {
        if let Some(cb) = callback {
            cb.on_progress(1.0);
        }
    }

    summary.elapsed_seconds = started.elapsed().as_secs_f64();
    info!(
        "Batch complete: {} documents, {} converted, {} without tables, {} failed in {:.2}s",
        summary.total,
        summary.success_count,
        summary.no_tables_count,
        summary.fail_count,
        summary.elapsed_seconds
    );
    if let Some(cb) = callback {
        cb.on_batch_complete(&summary);
    }

    Ok((summary, results))
}

/// Extract, write and classify one document. Never fails.
///
/// `claimed` maps each output path written so far in this run to the
/// document that produced it; a second document mapping to the same path
/// is refused instead of overwriting the first.
fn convert_document(
    doc: &DocumentRef,
    output_root: &Path,
    source: &dyn TableSource,
    config: &BatchConfig,
    claimed: &mut HashMap<PathBuf, String>,
) -> DocumentResult {
    let started = Instant::now();
    let output_path = doc.output_path(output_root, &config.output_extension);

    let outcome = match extract_tables(source, &doc.path, config.password.as_deref()) {
        Ok(combined) if combined.is_empty() => ConversionOutcome::NoTables,
        Ok(combined) => match claimed.get(&output_path) {
            Some(owner) => ConversionOutcome::Error(DocumentError::OutputCollision {
                path: relative_entry(&output_path, output_root),
                claimed_by: owner.clone(),
            }),
            None => match write_tabular(&combined.rows, &output_path) {
                Ok(()) => {
                    claimed.insert(output_path.clone(), doc.display_path());
                    ConversionOutcome::Success {
                        rows: combined.rows.len(),
                    }
                }
                Err(e) => ConversionOutcome::Error(e),
            },
        },
        Err(e) => ConversionOutcome::Error(e),
    };

    let relative_output = outcome
        .is_success()
        .then(|| relative_entry(&output_path, output_root));

    DocumentResult {
        relative_path: doc.display_path(),
        output_path: relative_output,
        outcome,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

fn relative_entry(path: &Path, root: &Path) -> String {
    entry_name(path.strip_prefix(root).unwrap_or(path))
}

/// The human-readable line recorded for one document.
fn log_line(result: &DocumentResult) -> String {
    let path = &result.relative_path;
    match &result.outcome {
        ConversionOutcome::Success { rows } => format!(
            "Converted {path} -> {} ({rows} rows)",
            result.output_path.as_deref().unwrap_or("?")
        ),
        ConversionOutcome::NoTables => format!("No tables found in {path}"),
        ConversionOutcome::Error(e) => format!("Error processing {path}: {e}"),
    }
}
