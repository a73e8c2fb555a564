//! Table extraction: turn a document into one flat sequence of rows.
//!
//! The actual table detection is behind [`TableSource`] so the orchestrator
//! does not care whether tables come from pdfium, a fixture, or anything
//! else. [`extract_tables`] applies the combination rules on top:
//!
//! - tables are visited page by page, then in the order the source returns
//!   them within a page
//! - a table with no rows contributes nothing
//! - rows keep their own length; shorter and longer rows are not padded
//!   or cut
//! - absent cells stay `None` so the writer can leave them blank

use crate::error::DocumentError;
use std::path::Path;
use tracing::debug;

/// One table row. `None` marks a cell slot with no content at all.
pub type Row = Vec<Option<String>>;

/// One detected table, rows in top-to-bottom order.
pub type RawTable = Vec<Row>;

/// Anything that can find the tables of a document.
///
/// Implementations are shared across a batch and must not keep state
/// between documents.
pub trait TableSource: Send + Sync {
    /// Open the document at `path` (unlocking it with `password` when
    /// given) and return its tables grouped by page, in page order.
    ///
    /// A document without tables returns one empty `Vec` per page (or no
    /// pages at all); that is not an error.
    fn document_tables(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> Result<Vec<Vec<RawTable>>, DocumentError>;

    /// Short name for log output.
    fn backend_name(&self) -> &str;
}

/// All rows of a document, concatenated across tables and pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedResult {
    pub rows: Vec<Row>,
    /// Number of tables that contributed at least one row.
    pub table_count: usize,
}

impl CombinedResult {
    pub fn is_empty(&self) -> bool {
        self.table_count == 0
    }
}

/// Extract and concatenate every table of the document at `path`.
///
/// # Errors
/// Whatever [`TableSource::document_tables`] reports; those are non-fatal
/// and become the document's `Error` outcome.
pub fn extract_tables(
    source: &dyn TableSource,
    path: &Path,
    password: Option<&str>,
) -> Result<CombinedResult, DocumentError> {
    let pages = source.document_tables(path, password)?;

    let mut combined = CombinedResult::default();
    for (page_idx, tables) in pages.into_iter().enumerate() {
        for table in tables {
            if table.is_empty() {
                continue;
            }
            debug!(
                "{}: page {} table with {} rows",
                path.display(),
                page_idx + 1,
                table.len()
            );
            combined.table_count += 1;
            combined.rows.extend(table);
        }
    }
    Ok(combined)
}
