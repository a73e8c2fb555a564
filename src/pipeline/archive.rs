//! Archive ingestion and re-packaging around a scoped scratch tree.
//!
//! ```text
//! <scratch>/
//!   input.zip      the caller's bytes, written once
//!   unzipped/      extracted input tree (Document Locator root)
//!   output/        mirrored spreadsheets (packed at the end)
//! ```
//!
//! The scratch directory is a [`TempDir`]: it is removed recursively when
//! the [`ScratchTree`] is dropped, whichever way the invocation ends.
//!
//! Unpacking rejects any entry that would land outside `unzipped/`
//! instead of rewriting its path, so the mirrored output layout always
//! equals the archive's own layout.

use crate::config::ArchiveLimits;
use crate::error::Pdf2XlsxError;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

const INPUT_ARCHIVE: &str = "input.zip";
const INPUT_ROOT: &str = "unzipped";
const OUTPUT_ROOT: &str = "output";

/// Process-owned temporary directory for one pipeline invocation.
#[derive(Debug)]
pub struct ScratchTree {
    dir: TempDir,
    input_root: PathBuf,
    output_root: PathBuf,
}

impl ScratchTree {
    /// Allocate a fresh scratch tree inside `parent`, or inside the system
    /// temp directory when `parent` is `None`.
    pub fn create(parent: Option<&Path>) -> Result<Self, Pdf2XlsxError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdf2xlsx-");
        let dir = match parent {
            Some(p) => builder.tempdir_in(p),
            None => builder.tempdir(),
        }
        .map_err(|e| {
            Pdf2XlsxError::scratch(parent.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir), e)
        })?;

        let input_root = dir.path().join(INPUT_ROOT);
        let output_root = dir.path().join(OUTPUT_ROOT);
        for root in [&input_root, &output_root] {
            fs::create_dir_all(root).map_err(|e| Pdf2XlsxError::scratch(root, e))?;
        }
        debug!("Scratch tree at {}", dir.path().display());

        Ok(Self {
            dir,
            input_root,
            output_root,
        })
    }

    /// Root of the scratch directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory the input archive is extracted into.
    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    /// Directory the mirrored spreadsheets are written into.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }
}

/// Write `bytes` into the scratch tree and extract every entry under
/// [`ScratchTree::input_root`], returning that root.
///
/// # Errors
/// Fatal for the whole invocation:
/// - [`Pdf2XlsxError::InvalidArchive`]: not a ZIP, or an entry fails to inflate
/// - [`Pdf2XlsxError::UnsafeEntryPath`]: traversal, absolute path or symlink
/// - [`Pdf2XlsxError::ArchiveTooLarge`]: entry-count or size limit exceeded
pub fn unpack(
    bytes: &[u8],
    scratch: &ScratchTree,
    limits: &ArchiveLimits,
) -> Result<PathBuf, Pdf2XlsxError> {
    let archive_path = scratch.path().join(INPUT_ARCHIVE);
    fs::write(&archive_path, bytes).map_err(|e| Pdf2XlsxError::scratch(&archive_path, e))?;

    let file = File::open(&archive_path).map_err(|e| Pdf2XlsxError::scratch(&archive_path, e))?;
    let mut archive = ZipArchive::new(io::BufReader::new(file))?;

    if archive.len() > limits.max_entries {
        return Err(Pdf2XlsxError::ArchiveTooLarge {
            detail: format!(
                "{} entries (maximum {})",
                archive.len(),
                limits.max_entries
            ),
        });
    }

    let dest = scratch.input_root();
    let mut extracted: u64 = 0;
    let mut files = 0usize;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let relative = safe_relative_path(&name, entry.enclosed_name())?;

        if entry.is_symlink() {
            return Err(Pdf2XlsxError::UnsafeEntryPath {
                name,
                reason: "symbolic links are not allowed".into(),
            });
        }

        let target = dest.join(&relative);
        let place_failed = |path: &Path, e: io::Error| {
            if conflicts_with_earlier_entry(dest, &target) {
                Pdf2XlsxError::InvalidArchive {
                    detail: format!("entry '{name}' clashes with an earlier entry"),
                }
            } else {
                Pdf2XlsxError::scratch(path, e)
            }
        };
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| place_failed(&target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| place_failed(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| place_failed(&target, e))?;

        // One byte past the remaining budget is enough to detect overflow.
        let budget = limits.max_extracted_bytes - extracted;
        let written = io::copy(&mut (&mut entry).take(budget.saturating_add(1)), &mut out)
            .map_err(|e| Pdf2XlsxError::InvalidArchive {
                detail: format!("entry '{name}': {e}"),
            })?;
        if written > budget {
            return Err(Pdf2XlsxError::ArchiveTooLarge {
                detail: format!(
                    "more than {} bytes once decompressed",
                    limits.max_extracted_bytes
                ),
            });
        }
        extracted += written;
        files += 1;
    }

    info!(
        "Unpacked {} files ({} bytes) into {}",
        files,
        extracted,
        dest.display()
    );
    Ok(dest.to_path_buf())
}

/// Validate an entry name, returning the relative path it may be written to.
fn safe_relative_path(name: &str, enclosed: Option<PathBuf>) -> Result<PathBuf, Pdf2XlsxError> {
    let unsafe_entry = |reason: &str| Pdf2XlsxError::UnsafeEntryPath {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.starts_with('/') || name.starts_with('\\') || has_drive_prefix(name) {
        return Err(unsafe_entry("absolute paths are not allowed"));
    }
    let relative = enclosed.ok_or_else(|| unsafe_entry("path escapes the extraction root"))?;

    // Collapse `a/../b` so the mirrored folder never carries `..`.
    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !clean.pop() {
                    return Err(unsafe_entry("path escapes the extraction root"));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_entry("absolute paths are not allowed"));
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(unsafe_entry("empty entry name"));
    }
    Ok(clean)
}

fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// True when `target` cannot be placed because an earlier entry already
/// occupies it, or put a file where one of its folders goes.
fn conflicts_with_earlier_entry(dest: &Path, target: &Path) -> bool {
    target.exists()
        || target
            .ancestors()
            .skip(1)
            .take_while(|p| *p != dest && p.starts_with(dest))
            .any(|p| p.exists() && !p.is_dir())
}

/// Pack every regular file under `root` into a ZIP archive.
///
/// Entries are named by their `/`-separated path relative to `root` and
/// written in lexicographic order of that name. Directories (empty or not)
/// get no entry of their own. Timestamps and permissions are fixed, so the
/// same tree always packs to the same bytes.
pub fn pack(root: &Path) -> Result<Vec<u8>, Pdf2XlsxError> {
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            Pdf2XlsxError::scratch(path, io::Error::other(e.to_string()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Pdf2XlsxError::Internal(format!("walk left the output root: {e}")))?;
        files.push((entry_name(relative), entry.path().to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, path) in &files {
        let data = fs::read(path).map_err(|e| Pdf2XlsxError::scratch(path, e))?;
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| Pdf2XlsxError::Internal(format!("zip entry '{name}': {e}")))?;
        writer
            .write_all(&data)
            .map_err(|e| Pdf2XlsxError::Internal(format!("zip entry '{name}': {e}")))?;
    }
    let bytes = writer
        .finish()
        .map_err(|e| Pdf2XlsxError::Internal(format!("finalising zip: {e}")))?
        .into_inner();

    info!("Packed {} files ({} bytes)", files.len(), bytes.len());
    Ok(bytes)
}

/// `/`-joined form of a relative path, independent of the host separator.
pub fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
