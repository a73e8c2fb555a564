//! Document discovery: find every PDF under the extracted tree.
//!
//! The walk is lazy and restartable. Each call to
//! [`DocumentLocator::documents`] starts a fresh traversal, so the
//! orchestrator can count documents in one pass and process them in a
//! second without buffering the tree.
//!
//! Only regular files are yielded. Symbolic links are not followed, and
//! extensions are matched case-insensitively (`report.PDF` is found).

use crate::error::Pdf2XlsxError;
use crate::pipeline::archive::entry_name;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A discovered document, relative to the locator's root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Absolute (or root-joined) path to the file on disk.
    pub path: PathBuf,
    /// Folder containing the file, relative to the root. Empty for files
    /// at the root itself.
    pub relative_folder: PathBuf,
    /// File name including its extension.
    pub file_name: String,
}

impl DocumentRef {
    /// Where the converted file goes: same relative folder under
    /// `output_root`, same stem, extension replaced by `extension`.
    pub fn output_path(&self, output_root: &Path, extension: &str) -> PathBuf {
        output_root
            .join(&self.relative_folder)
            .join(&self.file_name)
            .with_extension(extension)
    }

    /// `/`-separated path relative to the root, used in log lines.
    pub fn display_path(&self) -> String {
        entry_name(&self.relative_folder.join(&self.file_name))
    }
}

/// Recursive finder of documents with a given extension.
#[derive(Debug, Clone)]
pub struct DocumentLocator {
    root: PathBuf,
    extension: String,
}

impl DocumentLocator {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a new traversal.
    ///
    /// Siblings are visited in file-name order, so two walks over the same
    /// tree yield the same sequence.
    pub fn documents(&self) -> impl Iterator<Item = Result<DocumentRef, Pdf2XlsxError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) if self.matches(&entry) => Some(self.to_document(entry)),
                Ok(_) => None,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    Some(Err(Pdf2XlsxError::scratch(
                        path,
                        std::io::Error::other(e.to_string()),
                    )))
                }
            })
    }

    fn matches(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }

    fn to_document(&self, entry: DirEntry) -> Result<DocumentRef, Pdf2XlsxError> {
        let relative = entry
            .path()
            .strip_prefix(&self.root)
            .map_err(|e| Pdf2XlsxError::Internal(format!("walk left the input root: {e}")))?;
        let relative_folder = relative
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let file_name = entry.file_name().to_string_lossy().into_owned();
        Ok(DocumentRef {
            path: entry.into_path(),
            relative_folder,
            file_name,
        })
    }
}
