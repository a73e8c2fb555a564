//! Pipeline stages for ZIP-of-PDFs to ZIP-of-spreadsheets conversion.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! bytes ──▶ archive::unpack ──▶ locate ──▶ extract ──▶ write ──▶ archive::pack
//! (zip)      (scratch tree)     (walk)     (tables)    (xlsx)     (zip)
//! ```
//!
//! 1. [`archive`] unpacks the input into a scoped scratch tree, rejecting
//!    unsafe entries, and packs the output tree back into deterministic bytes
//! 2. [`locate`] walks the extracted tree and yields every PDF with its
//!    folder relative to the root
//! 3. [`extract`] asks a [`extract::TableSource`] for the tables of every
//!    page and flattens them into one row sequence
//! 4. [`lattice`] is the ruling-line table finder used by [`pdfium`], the
//!    production `TableSource`; pdfium work is synchronous, callers that
//!    need async wrap it in `spawn_blocking`
//! 5. [`write`] serialises the rows as a single-sheet workbook

pub mod archive;
pub mod extract;
pub mod lattice;
pub mod locate;
pub mod pdfium;
pub mod write;
