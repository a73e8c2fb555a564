//! Spreadsheet output: one single-sheet `.xlsx` workbook per document.
//!
//! Row `i` of the combined rows becomes sheet row `i`, cell `j` becomes
//! column `j`. There is no header row and no index column. `None` cells are
//! left blank; everything else is written as a string.
//!
//! The workbook is saved next to its final path and renamed into place, so
//! a failed write never leaves a truncated spreadsheet behind.

use crate::error::DocumentError;
use crate::pipeline::extract::Row;
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Workbook, XlsxError};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Largest sheet supported by the xlsx format.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Write `rows` to a new workbook at `path`, creating parent directories.
///
/// # Errors
/// [`DocumentError::Write`] when the rows do not fit on one sheet or the
/// file cannot be written.
pub fn write_tabular(rows: &[Row], path: &Path) -> Result<(), DocumentError> {
    let write_err = |detail: String| DocumentError::Write {
        path: path.to_path_buf(),
        detail,
    };

    if rows.len() > MAX_ROWS {
        return Err(write_err(format!(
            "{} rows exceed the sheet limit of {MAX_ROWS}",
            rows.len()
        )));
    }
    if let Some(wide) = rows.iter().map(Vec::len).max().filter(|&n| n > MAX_COLS) {
        return Err(write_err(format!(
            "{wide} columns exceed the sheet limit of {MAX_COLS}"
        )));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
    }

    let workbook = build_workbook(rows).map_err(|e| write_err(e.to_string()))?;

    // ── Atomic save: temp file in the same directory + rename ───────────
    let tmp = path.with_extension("xlsx.tmp");
    save(workbook, &tmp).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        write_err(e.to_string())
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        write_err(e.to_string())
    })?;

    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

fn build_workbook(rows: &[Row]) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    // Fixed creation date keeps identical input byte-identical on output.
    let created = ExcelDateTime::from_ymd(1980, 1, 1)?;
    workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));

    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let Some(text) = cell else {
                continue;
            };
            // Bounds were checked by the caller.
            sheet.write_string(r as u32, c as u16, text)?;
        }
    }
    Ok(workbook)
}

fn save(mut workbook: Workbook, path: &Path) -> Result<(), XlsxError> {
    workbook.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sheet_xml(path: &Path) -> String {
        let file = fs::File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut xml = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    fn shared_strings(path: &Path) -> String {
        let file = fs::File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut xml = String::new();
        archive
            .by_name("xl/sharedStrings.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn writes_rows_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/report.xlsx");
        let rows = vec![
            vec![Some("Name".to_string()), Some("Qty".to_string())],
            vec![Some("apple".to_string()), None, Some("extra".to_string())],
        ];
        write_tabular(&rows, &path).unwrap();

        assert!(path.is_file());
        assert!(!path.with_extension("xlsx.tmp").exists());

        let sheet = sheet_xml(&path);
        assert!(sheet.contains(r#"r="A1""#));
        assert!(sheet.contains(r#"r="C2""#));
        assert!(!sheet.contains(r#"r="B2""#), "None cell must stay blank");

        let strings = shared_strings(&path);
        for s in ["Name", "Qty", "apple", "extra"] {
            assert!(strings.contains(s), "missing {s}");
        }
    }

    #[test]
    fn identical_rows_give_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![vec![Some("x".to_string())]];
        let (a, b) = (dir.path().join("a.xlsx"), dir.path().join("b.xlsx"));
        write_tabular(&rows, &a).unwrap();
        write_tabular(&rows, &b).unwrap();
        assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
    }

    #[test]
    fn too_many_columns_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.xlsx");
        let rows = vec![vec![Some(String::new()); MAX_COLS + 1]];
        let err = write_tabular(&rows, &path).unwrap_err();
        assert!(matches!(err, DocumentError::Write { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_destination_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();
        let err = write_tabular(&[vec![Some("x".into())]], &blocker.join("out.xlsx")).unwrap_err();
        assert!(matches!(err, DocumentError::Write { .. }), "got {err:?}");
    }
}
