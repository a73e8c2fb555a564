//! Pdfium-backed [`TableSource`]: read ruling lines and characters from
//! each page and hand them to the lattice finder.
//!
//! ## Coordinates
//!
//! PDF user space grows upwards from the bottom-left corner. Everything
//! handed to [`lattice`](crate::pipeline::lattice) is flipped to top-down
//! (`top = page_height - y`) so "row order" means reading order.
//!
//! ## Threading
//!
//! pdfium calls are synchronous and CPU-bound. The batch loop runs them
//! directly; [`crate::convert::convert_archive_async`] moves the whole batch
//! onto `spawn_blocking`.

use crate::config::TableSettings;
use crate::error::{DocumentError, Pdf2XlsxError};
use crate::pipeline::extract::{RawTable, TableSource};
use crate::pipeline::lattice::{find_tables, Edge, TextChar};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Table source reading PDFs through a dynamically bound pdfium library.
#[derive(Debug, Clone)]
pub struct PdfiumTableSource {
    library_path: Option<PathBuf>,
    settings: TableSettings,
}

impl PdfiumTableSource {
    /// Create a source bound to the pdfium library at `library_path` (a file,
    /// or a directory holding the platform library), or to the first
    /// library found in the working directory or on the system when `None`.
    ///
    /// Binds once up front so a missing library fails the run before any
    /// archive is unpacked.
    pub fn new(library_path: Option<PathBuf>, settings: TableSettings) -> Result<Self, Pdf2XlsxError> {
        settings.validate()?;
        let source = Self {
            library_path,
            settings,
        };
        source
            .bind()
            .map_err(|e| Pdf2XlsxError::PdfiumBindingFailed(format!("{e:?}")))?;
        info!(
            "pdfium bound ({})",
            source
                .library_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "default search".into())
        );
        Ok(source)
    }

    pub fn settings(&self) -> &TableSettings {
        &self.settings
    }

    fn bind(&self) -> Result<Pdfium, PdfiumError> {
        let bindings = match &self.library_path {
            Some(path) if path.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            }
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }?;
        Ok(Pdfium::new(bindings))
    }
}

impl TableSource for PdfiumTableSource {
    fn document_tables(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> Result<Vec<Vec<RawTable>>, DocumentError> {
        let pdfium = self.bind().map_err(|e| DocumentError::Open {
            detail: format!("pdfium unavailable: {e:?}"),
        })?;

        let document = pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| load_error(e, password))?;

        let pages = document.pages();
        debug!("{}: {} pages", path.display(), pages.len());

        let mut tables = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let height = page.height().value;
            let edges = page_edges(&page, height);
            let chars = page_chars(&page, height).map_err(|e| DocumentError::Page {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;
            let found = find_tables(&edges, &chars, &self.settings);
            debug!(
                "Page {}: {} edges, {} chars, {} tables",
                idx + 1,
                edges.len(),
                chars.len(),
                found.len()
            );
            tables.push(found);
        }
        Ok(tables)
    }

    fn backend_name(&self) -> &str {
        "pdfium"
    }
}

fn load_error(e: PdfiumError, password: Option<&str>) -> DocumentError {
    match e {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            if password.is_some() {
                DocumentError::WrongPassword
            } else {
                DocumentError::PasswordRequired
            }
        }
        other => DocumentError::Open {
            detail: format!("{other:?}"),
        },
    }
}

/// Axis-aligned strokes of every path object on the page, top-down.
fn page_edges(page: &PdfPage, height: f32) -> Vec<Edge> {
    let mut edges = Vec::new();
    let mut push = |from: (f32, f32), to: (f32, f32)| {
        if let Some(edge) = Edge::from_segment(from.0, height - from.1, to.0, height - to.1) {
            edges.push(edge);
        }
    };

    for object in page.objects().iter() {
        let Some(path) = object.as_path_object() else {
            continue;
        };
        let segments = match path.matrix() {
            Ok(matrix) => path.segments().transform(matrix),
            Err(e) => {
                debug!("Skipping path object without matrix: {e:?}");
                continue;
            }
        };

        let mut start: Option<(f32, f32)> = None;
        let mut current: Option<(f32, f32)> = None;
        for i in 0..segments.len() {
            let Ok(segment) = segments.get(i) else {
                continue;
            };
            let point = (segment.x().value, segment.y().value);
            match segment.segment_type() {
                PdfPathSegmentType::MoveTo => start = Some(point),
                PdfPathSegmentType::LineTo => {
                    if let Some(prev) = current {
                        push(prev, point);
                    }
                    start.get_or_insert(point);
                }
                _ => {}
            }
            current = Some(point);

            if segment.is_close() {
                if let Some(first) = start {
                    push(point, first);
                    current = Some(first);
                }
            }
        }
    }
    edges
}

/// Every character with a usable tight bounding box, top-down.
fn page_chars(page: &PdfPage, height: f32) -> Result<Vec<TextChar>, PdfiumError> {
    let text = page.text()?;
    let mut chars = Vec::new();
    for ch in text.chars().iter() {
        let Some(c) = ch.unicode_char() else {
            continue;
        };
        let Ok(bounds) = ch.tight_bounds() else {
            continue;
        };
        chars.push(TextChar {
            ch: c,
            x0: bounds.left().value,
            top: height - bounds.top().value,
            x1: bounds.right().value,
            bottom: height - bounds.bottom().value,
        });
    }
    Ok(chars)
}
