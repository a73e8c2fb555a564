//! End-to-end batch tests.
//!
//! These run the whole archive pipeline (unpack, locate, extract, write,
//! pack) against a fixture table source, so they need neither pdfium nor
//! real PDF files. A fixture "PDF" is a JSON file holding its tables as
//! `pages → tables → rows → cells`; anything else fails to open, like a
//! corrupt PDF would.
//!
//! Run with:
//!   cargo test --test batch

use pdf2xlsx::{
    convert_archive, convert_archive_async, convert_archive_file, convert_directory,
    BatchConfig, BatchProgressCallback, ConversionOutcome, DocumentError, DocumentResult,
    Pdf2XlsxError, RawTable, RunSummary, TableSource,
};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Reads tables from JSON. Content prefixed with `LOCKED:` needs password `pw`.
struct FixtureSource;

impl TableSource for FixtureSource {
    fn document_tables(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> Result<Vec<Vec<RawTable>>, DocumentError> {
        let text = std::fs::read_to_string(path).map_err(|e| DocumentError::Open {
            detail: e.to_string(),
        })?;
        let body = match text.strip_prefix("LOCKED:") {
            Some(rest) => match password {
                None => return Err(DocumentError::PasswordRequired),
                Some("pw") => rest,
                Some(_) => return Err(DocumentError::WrongPassword),
            },
            None => text.as_str(),
        };
        serde_json::from_str(body).map_err(|e| DocumentError::Open {
            detail: format!("no valid header: {e}"),
        })
    }

    fn backend_name(&self) -> &str {
        "fixture"
    }
}

fn table(rows: &[&[&str]]) -> RawTable {
    rows.iter()
        .map(|r| r.iter().map(|c| Some(c.to_string())).collect())
        .collect()
}

fn pdf(pages: &[Vec<RawTable>]) -> String {
    serde_json::to_string(pages).unwrap()
}

fn zip_of(entries: &[(&str, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, SimpleFileOptions::default())
                .unwrap();
        } else {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect::<Vec<_>>()
}

fn entry_bytes(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut out = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut out).unwrap();
    out
}

/// Number of `<row>` elements in the first worksheet of an xlsx file.
fn sheet_rows(xlsx: &[u8]) -> usize {
    let xml = String::from_utf8(entry_bytes(xlsx, "xl/worksheets/sheet1.xml")).unwrap();
    xml.matches("<row ").count()
}

/// The three-document archive used across most tests.
fn mixed_archive() -> Vec<u8> {
    let report = pdf(&[
        vec![table(&[&["Station", "mm"], &["North", "12"], &["South", "7"]])],
        vec![table(&[&["East", "3"], &["West", "0"]])],
    ]);
    zip_of(&[
        ("a/report.pdf", report),
        ("b/empty.pdf", pdf(&[vec![], vec![]])),
        ("c/bad.pdf", "%PDF-1.4 truncated garbage".to_string()),
    ])
}

#[derive(Default)]
struct Recorder {
    started: Mutex<Option<usize>>,
    fractions: Mutex<Vec<f64>>,
    lines: Mutex<Vec<String>>,
    completed: Mutex<Vec<(String, usize, usize)>>,
    finished: Mutex<Option<RunSummary>>,
}

impl BatchProgressCallback for Recorder {
    fn on_batch_start(&self, total_documents: usize) {
        *self.started.lock().unwrap() = Some(total_documents);
    }

    fn on_document_complete(&self, result: &DocumentResult, processed: usize, total: usize) {
        self.completed
            .lock()
            .unwrap()
            .push((result.relative_path.clone(), processed, total));
    }

    fn on_progress(&self, fraction: f64) {
        self.fractions.lock().unwrap().push(fraction);
    }

    fn on_log_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn on_batch_complete(&self, summary: &RunSummary) {
        *self.finished.lock().unwrap() = Some(summary.clone());
    }
}

// ── Core scenario ────────────────────────────────────────────────────────────

#[test]
fn test_mixed_archive_converts_only_documents_with_tables() {
    let output = convert_archive(&mixed_archive(), &FixtureSource, &BatchConfig::default())
        .expect("batch should not fail");

    assert_eq!(entry_names(&output.archive), vec!["a/report.xlsx"]);
    let xlsx = entry_bytes(&output.archive, "a/report.xlsx");
    assert_eq!(sheet_rows(&xlsx), 5);

    let summary = &output.summary;
    assert_eq!(summary.total, 3);
    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.fail_count, 1);
    assert_eq!(summary.no_tables_count, 1);
    assert!(summary.elapsed_seconds >= 0.0);

    assert_eq!(summary.log_lines.len(), 3);
    assert_eq!(
        summary.log_lines[0],
        "Converted a/report.pdf -> a/report.xlsx (5 rows)"
    );
    assert_eq!(summary.log_lines[1], "No tables found in b/empty.pdf");
    assert!(
        summary.log_lines[2].starts_with("Error processing c/bad.pdf: cannot open PDF"),
        "got {}",
        summary.log_lines[2]
    );

    let outcomes: Vec<_> = output.documents.iter().map(|d| d.outcome.clone()).collect();
    assert_eq!(outcomes[0], ConversionOutcome::Success { rows: 5 });
    assert_eq!(outcomes[1], ConversionOutcome::NoTables);
    assert!(matches!(outcomes[2], ConversionOutcome::Error(DocumentError::Open { .. })));
    assert_eq!(output.documents[0].output_path.as_deref(), Some("a/report.xlsx"));
    assert_eq!(output.documents[1].output_path, None);
}

#[test]
fn test_empty_archive() {
    let recorder = Arc::new(Recorder::default());
    let config = BatchConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let output = convert_archive(&zip_of(&[]), &FixtureSource, &config).unwrap();

    assert!(entry_names(&output.archive).is_empty());
    assert_eq!(output.summary.total, 0);
    assert_eq!(output.summary.success_count, 0);
    assert_eq!(output.summary.fail_count, 0);
    assert!(output.summary.log_lines.is_empty());
    assert_eq!(*recorder.started.lock().unwrap(), Some(0));
    assert_eq!(*recorder.fractions.lock().unwrap(), vec![1.0]);
}

#[test]
fn test_archive_without_pdfs() {
    let input = zip_of(&[
        ("docs/", String::new()),
        ("docs/readme.txt", "hello".into()),
        ("data.csv", "a,b".into()),
    ]);
    let output = convert_archive(&input, &FixtureSource, &BatchConfig::default()).unwrap();
    assert_eq!(output.summary.total, 0);
    assert!(entry_names(&output.archive).is_empty());
}

#[test]
fn test_progress_and_log_lines_reach_callback() {
    let recorder = Arc::new(Recorder::default());
    let config = BatchConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let output = convert_archive(&mixed_archive(), &FixtureSource, &config).unwrap();

    assert_eq!(*recorder.started.lock().unwrap(), Some(3));

    let fractions = recorder.fractions.lock().unwrap().clone();
    assert_eq!(fractions.len(), 3);
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{fractions:?}");
    assert_eq!(fractions.last().copied(), Some(1.0));
    assert!((fractions[0] - 1.0 / 3.0).abs() < 1e-9);

    assert_eq!(*recorder.lines.lock().unwrap(), output.summary.log_lines);

    let completed = recorder.completed.lock().unwrap().clone();
    assert_eq!(
        completed,
        vec![
            ("a/report.pdf".to_string(), 1, 3),
            ("b/empty.pdf".to_string(), 2, 3),
            ("c/bad.pdf".to_string(), 3, 3),
        ]
    );
    assert_eq!(
        recorder.finished.lock().unwrap().as_ref(),
        Some(&output.summary)
    );
}

// ── Layout & determinism ─────────────────────────────────────────────────────

#[test]
fn test_nested_layout_is_mirrored() {
    let one = pdf(&[vec![table(&[&["x"]])]]);
    let input = zip_of(&[
        ("2024/jan/week1/Station.PDF", one.clone()),
        ("2024/feb/summary.pdf", one.clone()),
        ("top.pdf", one),
    ]);
    let output = convert_archive(&input, &FixtureSource, &BatchConfig::default()).unwrap();
    assert_eq!(
        entry_names(&output.archive),
        vec![
            "2024/feb/summary.xlsx",
            "2024/jan/week1/Station.xlsx",
            "top.xlsx"
        ]
    );
    assert_eq!(output.summary.success_count, 3);
}

#[test]
fn test_case_variant_names_do_not_share_an_output() {
    let input = zip_of(&[
        ("a/report.pdf", pdf(&[vec![table(&[&["lower"]])]])),
        ("a/report.PDF", pdf(&[vec![table(&[&["upper"], &["case"]])]])),
    ]);
    let output = convert_archive(&input, &FixtureSource, &BatchConfig::default()).unwrap();

    // `report.PDF` sorts first, so it owns `report.xlsx`.
    let names = entry_names(&output.archive);
    assert_eq!(names, vec!["a/report.xlsx"]);
    assert_eq!(names.len(), output.summary.success_count);
    assert_eq!(output.summary.fail_count, 1);
    assert_eq!(sheet_rows(&entry_bytes(&output.archive, "a/report.xlsx")), 2);

    assert_eq!(output.documents[0].relative_path, "a/report.PDF");
    assert!(output.documents[1].output_path.is_none());
    assert!(matches!(
        &output.documents[1].outcome,
        ConversionOutcome::Error(DocumentError::OutputCollision { path, claimed_by })
            if path == "a/report.xlsx" && claimed_by == "a/report.PDF"
    ));
    assert!(output.summary.log_lines[1].starts_with("Error processing a/report.pdf: "));
}

#[test]
fn test_output_archive_is_deterministic() {
    let first = convert_archive(&mixed_archive(), &FixtureSource, &BatchConfig::default()).unwrap();
    let second =
        convert_archive(&mixed_archive(), &FixtureSource, &BatchConfig::default()).unwrap();
    assert_eq!(first.archive, second.archive);
}

#[test]
fn test_ragged_rows_are_written_as_is() {
    let doc = pdf(&[vec![vec![
        vec![Some("a".into()), Some("b".into()), Some("c".into())],
        vec![Some("only".into())],
        vec![None, Some("second".into())],
    ]]]);
    let input = zip_of(&[("ragged.pdf", doc)]);
    let output = convert_archive(&input, &FixtureSource, &BatchConfig::default()).unwrap();

    let xlsx = entry_bytes(&output.archive, "ragged.xlsx");
    assert_eq!(sheet_rows(&xlsx), 3);
    let xml = String::from_utf8(entry_bytes(&xlsx, "xl/worksheets/sheet1.xml")).unwrap();
    assert!(xml.contains(r#"r="C1""#));
    assert!(!xml.contains(r#"r="B2""#));
    assert!(!xml.contains(r#"r="A3""#));
    assert!(xml.contains(r#"r="B3""#));
}

// ── Passwords ────────────────────────────────────────────────────────────────

#[test]
fn test_password_is_forwarded_to_source() {
    let locked = format!("LOCKED:{}", pdf(&[vec![table(&[&["secret", "1"]])]]));
    let input = zip_of(&[("locked.pdf", locked)]);

    let output = convert_archive(&input, &FixtureSource, &BatchConfig::default()).unwrap();
    assert_eq!(
        output.documents[0].outcome,
        ConversionOutcome::Error(DocumentError::PasswordRequired)
    );

    let wrong = BatchConfig::builder().password("nope").build().unwrap();
    let output = convert_archive(&input, &FixtureSource, &wrong).unwrap();
    assert_eq!(
        output.documents[0].outcome,
        ConversionOutcome::Error(DocumentError::WrongPassword)
    );

    let right = BatchConfig::builder().password("pw").build().unwrap();
    let output = convert_archive(&input, &FixtureSource, &right).unwrap();
    assert_eq!(output.summary.success_count, 1);
}

// ── Fatal errors & scratch cleanup ───────────────────────────────────────────

#[test]
fn test_traversal_entry_aborts_and_cleans_scratch() {
    let scratch_parent = tempfile::tempdir().unwrap();
    let config = BatchConfig::builder()
        .scratch_parent(scratch_parent.path())
        .build()
        .unwrap();
    let input = zip_of(&[
        ("a/report.pdf", pdf(&[vec![table(&[&["x"]])]])),
        ("../../escape.pdf", pdf(&[])),
    ]);

    let err = convert_archive(&input, &FixtureSource, &config).unwrap_err();
    assert!(matches!(err, Pdf2XlsxError::UnsafeEntryPath { .. }), "got {err:?}");
    assert!(err.is_archive_error());
    assert_eq!(std::fs::read_dir(scratch_parent.path()).unwrap().count(), 0);
}

#[test]
fn test_invalid_archive_is_fatal() {
    let err = convert_archive(b"PK\x03\x04 not really", &FixtureSource, &BatchConfig::default())
        .unwrap_err();
    assert!(matches!(err, Pdf2XlsxError::InvalidArchive { .. }), "got {err:?}");
}

#[test]
fn test_scratch_removed_after_success() {
    let scratch_parent = tempfile::tempdir().unwrap();
    let config = BatchConfig::builder()
        .scratch_parent(scratch_parent.path())
        .build()
        .unwrap();
    convert_archive(&mixed_archive(), &FixtureSource, &config).unwrap();
    assert_eq!(std::fs::read_dir(scratch_parent.path()).unwrap().count(), 0);
}

// ── Other entry points ───────────────────────────────────────────────────────

#[test]
fn test_convert_archive_file_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.zip");
    let output = dir.path().join("out/converted.zip");
    std::fs::write(&input, mixed_archive()).unwrap();

    let summary =
        convert_archive_file(&input, &output, &FixtureSource, &BatchConfig::default()).unwrap();

    assert_eq!(summary.success_count, 1);
    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(entry_names(&bytes), vec!["a/report.xlsx"]);
    assert!(!output.with_extension("zip.tmp").exists());
}

#[test]
fn test_convert_archive_file_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert_archive_file(
        dir.path().join("missing.zip"),
        dir.path().join("out.zip"),
        &FixtureSource,
        &BatchConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Pdf2XlsxError::InputNotFound { .. }));
    assert!(!dir.path().join("out.zip").exists());
}

#[test]
fn test_convert_directory_without_archive() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(input.path().join("x/y")).unwrap();
    std::fs::write(
        input.path().join("x/y/doc.pdf"),
        pdf(&[vec![table(&[&["1"], &["2"]])]]),
    )
    .unwrap();

    let (summary, documents) = convert_directory(
        input.path(),
        output.path(),
        &FixtureSource,
        &BatchConfig::default(),
    )
    .unwrap();

    assert_eq!(summary.success_count, 1);
    assert_eq!(documents[0].relative_path, "x/y/doc.pdf");
    assert!(output.path().join("x/y/doc.xlsx").is_file());
}

#[test]
fn test_write_failure_is_isolated_to_its_document() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let doc = pdf(&[vec![table(&[&["1"]])]]);
    for folder in ["x", "y"] {
        std::fs::create_dir_all(input.path().join(folder)).unwrap();
        std::fs::write(input.path().join(folder).join("doc.pdf"), &doc).unwrap();
    }
    // A regular file where the `x/` output folder has to go.
    std::fs::write(output.path().join("x"), b"in the way").unwrap();

    let (summary, documents) = convert_directory(
        input.path(),
        output.path(),
        &FixtureSource,
        &BatchConfig::default(),
    )
    .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.fail_count, 1);
    assert_eq!(summary.success_count, 1);
    assert!(matches!(
        documents[0].outcome,
        ConversionOutcome::Error(DocumentError::Write { .. })
    ));
    assert!(summary.log_lines[0].starts_with("Error processing x/doc.pdf"));
    assert!(output.path().join("y/doc.xlsx").is_file());
}

#[tokio::test]
async fn test_async_wrapper_matches_sync() {
    let sync = convert_archive(&mixed_archive(), &FixtureSource, &BatchConfig::default()).unwrap();
    let source: Arc<dyn TableSource> = Arc::new(FixtureSource);
    let async_out = convert_archive_async(mixed_archive(), source, BatchConfig::default())
        .await
        .unwrap();

    assert_eq!(async_out.summary.total, sync.summary.total);
    assert_eq!(async_out.summary.log_lines, sync.summary.log_lines);
    assert_eq!(async_out.archive, sync.archive);
}

#[test]
fn test_summary_serialises_to_json() {
    let output = convert_archive(&mixed_archive(), &FixtureSource, &BatchConfig::default()).unwrap();
    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["summary"]["total"], 3);
    assert_eq!(json["documents"][0]["outcome"]["status"], "success");
    assert_eq!(json["documents"][1]["outcome"]["status"], "no_tables");
    assert_eq!(json["documents"][2]["outcome"]["status"], "error");
    assert!(json.get("archive").is_none());
}
