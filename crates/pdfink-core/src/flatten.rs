//! The flatten pipeline entry points
//!
//! One flatten call is synchronous and self-contained: it opens the source
//! read-only, burns the record list into a new copy page by page, and either
//! produces exactly one output artifact or a single terminal error. Records
//! the pipeline cannot use are dropped along the way, never fatal.

use crate::compose::{compose, PageWarning};
use crate::error::FlattenError;
use crate::group::group_by_page;
use crate::naming::annotated_output_path;
use crate::record::AnnotationRecord;
use lopdf::Document;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of an in-memory flatten.
#[derive(Debug)]
pub struct FlattenedBytes {
    pub bytes: Vec<u8>,
    pub page_count: u32,
    pub annotated_pages: Vec<u32>,
    /// Pages whose annotations were abandoned; each was copied through
    /// unmodified instead of failing the call.
    pub skipped_pages: Vec<PageWarning>,
}

/// Result of a file-to-file flatten.
#[derive(Debug)]
pub struct FlattenOutcome {
    pub output_path: PathBuf,
    pub page_count: u32,
    pub annotated_pages: Vec<u32>,
    pub skipped_pages: Vec<PageWarning>,
}

/// Flatten `records` into a new copy of the document in `source`.
pub fn flatten_bytes(
    source: &[u8],
    records: &[AnnotationRecord],
) -> Result<FlattenedBytes, FlattenError> {
    let doc = Document::load_mem(source).map_err(|e| FlattenError::Open(e.to_string()))?;
    flatten_document(doc, records)
}

/// Flatten `records` into a sibling `-annotated` copy of the file at
/// `source_path`, written atomically. The source file is never modified; an
/// existing flattened copy from an earlier run is replaced.
pub fn flatten_to_file(
    source_path: &Path,
    records: &[AnnotationRecord],
) -> Result<FlattenOutcome, FlattenError> {
    let doc = Document::load(source_path)
        .map_err(|e| FlattenError::Open(format!("{}: {}", source_path.display(), e)))?;
    let flattened = flatten_document(doc, records)?;

    let output_path = annotated_output_path(source_path);
    let output_dir = output_path.parent().unwrap_or_else(|| Path::new("."));

    // Write to a scope-owned temp file in the target directory, then move
    // into place; a failure on any path drops the temp file instead of
    // leaving a half-written artifact at the output path.
    let mut tmp = tempfile::NamedTempFile::new_in(output_dir)
        .map_err(|e| FlattenError::Write(e.to_string()))?;
    tmp.write_all(&flattened.bytes)
        .map_err(|e| FlattenError::Write(e.to_string()))?;
    tmp.persist(&output_path)
        .map_err(|e| FlattenError::Write(e.to_string()))?;

    info!(output = %output_path.display(), "flatten complete");
    Ok(FlattenOutcome {
        output_path,
        page_count: flattened.page_count,
        annotated_pages: flattened.annotated_pages,
        skipped_pages: flattened.skipped_pages,
    })
}

fn flatten_document(
    doc: Document,
    records: &[AnnotationRecord],
) -> Result<FlattenedBytes, FlattenError> {
    let page_count = doc.get_pages().len() as u32;
    let groups = group_by_page(records, page_count);
    debug!(
        records = records.len(),
        pages_with_records = groups.len(),
        page_count,
        "grouped annotation records"
    );

    let composed = compose(&doc, &groups)?;

    let mut out = composed.doc;
    let mut bytes = Vec::new();
    out.save_to(&mut bytes)
        .map_err(|e| FlattenError::Write(e.to_string()))?;

    info!(
        page_count,
        annotated = composed.annotated_pages.len(),
        skipped = composed.skipped_pages.len(),
        "flattened document"
    );
    Ok(FlattenedBytes {
        bytes,
        page_count,
        annotated_pages: composed.annotated_pages,
        skipped_pages: composed.skipped_pages,
    })
}
