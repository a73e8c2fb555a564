//! CLI binary for pdf2xlsx.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `BatchConfig` and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2xlsx::{
    convert_archive_async, write_archive, BatchConfig, BatchProgressCallback, ConversionOutcome,
    DocumentResult, PdfiumTableSource, ProgressCallback, RunSummary, TableSettings, TableSource,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch and one printed line
/// per finished document.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// The bar starts as a spinner while the archive is unpacked; its length
    /// is set once the documents have been counted.
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Unpacking archive…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} PDFs  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_documents as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_documents} PDFs"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, relative_path: &str) {
        self.bar.set_message(relative_path.to_string());
    }

    fn on_document_complete(&self, result: &DocumentResult, _processed: usize, _total: usize) {
        let timing = dim(&format!("{:.1}s", result.duration_ms as f64 / 1000.0));
        let line = match &result.outcome {
            ConversionOutcome::Success { rows } => format!(
                "  {} {}  {}  {}",
                green("✓"),
                result.relative_path,
                dim(&format!("{rows} rows")),
                timing
            ),
            ConversionOutcome::NoTables => format!(
                "  {} {}  {}  {}",
                yellow("–"),
                result.relative_path,
                dim("no tables"),
                timing
            ),
            ConversionOutcome::Error(e) => format!(
                "  {} {}  {}  {}",
                red("✗"),
                result.relative_path,
                red(&e.to_string()),
                timing
            ),
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert, writing reports_xlsx.zip next to the input
  pdf2xlsx reports.zip

  # Choose the output file
  pdf2xlsx reports.zip -o converted_excels.zip

  # Encrypted PDFs
  pdf2xlsx --password s3cret reports.zip

  # Machine-readable summary
  pdf2xlsx --json reports.zip > summary.json

  # Looser line detection for scanned-then-vectorised tables
  pdf2xlsx --snap-tolerance 5 --join-tolerance 6 reports.zip

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  PDF2XLSX_OUTPUT         Default for --output
  PDF2XLSX_PASSWORD       Default for --password
  RUST_LOG                Tracing filter, overrides -v/-q

SETUP:
  pdf2xlsx needs the pdfium shared library. Place libpdfium next to the
  working directory, install it system-wide, or point PDFIUM_LIB_PATH at it.
"#;

/// Convert a ZIP of PDFs into a ZIP of Excel workbooks.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2xlsx",
    version,
    about = "Convert a ZIP of PDFs into a ZIP of Excel workbooks",
    long_about = "Extract the ruled tables of every PDF inside a ZIP archive and write one \
Excel workbook per PDF, at the same relative path, into a new ZIP archive. PDFs without \
tables are skipped; PDFs that fail to open are reported and skipped.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input ZIP archive.
    input: PathBuf,

    /// Output ZIP archive. Default: `<input stem>_xlsx.zip` next to the input.
    #[arg(short, long, env = "PDF2XLSX_OUTPUT")]
    output: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2XLSX_PASSWORD")]
    password: Option<String>,

    /// Path to the pdfium shared library, or a directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Maximum number of entries in the input archive.
    #[arg(long, env = "PDF2XLSX_MAX_ENTRIES", default_value_t = 100_000)]
    max_entries: usize,

    /// Maximum decompressed size of the input archive, in MiB.
    #[arg(long, env = "PDF2XLSX_MAX_EXTRACTED_MB", default_value_t = 4096)]
    max_extracted_mb: u64,

    /// Parallel ruling lines closer than this (points) are merged.
    #[arg(long, env = "PDF2XLSX_SNAP_TOLERANCE", default_value_t = 3.0)]
    snap_tolerance: f32,

    /// Collinear ruling lines with a gap up to this (points) are joined.
    #[arg(long, env = "PDF2XLSX_JOIN_TOLERANCE", default_value_t = 3.0)]
    join_tolerance: f32,

    /// Print the run summary and per-document results as JSON on stdout.
    #[arg(long, env = "PDF2XLSX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2XLSX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2XLSX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2XLSX_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Table source (fails fast without pdfium) ─────────────────────────
    let settings = TableSettings {
        snap_tolerance: cli.snap_tolerance,
        join_tolerance: cli.join_tolerance,
        ..TableSettings::default()
    };
    let source: Arc<dyn TableSource> = Arc::new(
        PdfiumTableSource::new(cli.pdfium_lib.clone(), settings)
            .context("Cannot initialise the PDF engine")?,
    );

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let input = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let output = convert_archive_async(input, source, config)
        .await
        .context("Conversion failed")?;

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));
    write_archive(&output_path, &output.archive)?;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        if !show_progress {
            for line in &output.summary.log_lines {
                eprintln!("{line}");
            }
        }
        print_summary(&output.summary, &output_path);
    }

    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .max_entries(cli.max_entries)
        .max_extracted_bytes(cli.max_extracted_mb.saturating_mul(1024 * 1024));

    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `reports.zip` → `reports_xlsx.zip` in the same directory.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "converted".to_string());
    input.with_file_name(format!("{stem}_xlsx.zip"))
}

fn print_summary(summary: &RunSummary, output_path: &Path) {
    let mark = if summary.fail_count == 0 {
        green("✔")
    } else if summary.success_count == 0 {
        red("✘")
    } else {
        cyan("⚠")
    };
    eprintln!(
        "{}  {}/{} PDFs converted  {}  {}  {:.1}s  →  {}",
        mark,
        bold(&summary.success_count.to_string()),
        summary.total,
        dim(&format!("{} without tables", summary.no_tables_count)),
        if summary.fail_count > 0 {
            red(&format!("{} failed", summary.fail_count))
        } else {
            dim("0 failed")
        },
        summary.elapsed_seconds,
        bold(&output_path.display().to_string()),
    );
}
