//! Boundary payloads exchanged with the bridge layer
//!
//! The capture surface sends one JSON payload per flatten call: the source
//! document's on-disk identity plus the annotation list. Annotation entries
//! are parsed one by one so a single garbled record cannot block the rest of
//! the batch.

use crate::compose::PageWarning;
use crate::error::FlattenError;
use crate::flatten::FlattenOutcome;
use crate::record::AnnotationRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct FlattenRequest {
    /// Path of the source document as the viewer currently knows it.
    pub source: PathBuf,
    /// Raw annotation entries, parsed tolerantly via [`Self::records`].
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
}

impl FlattenRequest {
    pub fn records(&self) -> Vec<AnnotationRecord> {
        parse_annotations(&self.annotations)
    }
}

/// Parse raw annotation entries, skipping anything unparseable.
pub fn parse_annotations(raw: &[serde_json::Value]) -> Vec<AnnotationRecord> {
    let mut records = Vec::with_capacity(raw.len());
    for (index, value) in raw.iter().enumerate() {
        match serde_json::from_value::<AnnotationRecord>(value.clone()) {
            Ok(record) => records.push(record),
            Err(e) => warn!(index, error = %e, "skipping unparseable annotation entry"),
        }
    }
    records
}

/// What the caller gets back: either the new artifact's path or a single
/// human-readable error, plus any per-page warnings on success.
#[derive(Debug, Clone, Serialize)]
pub struct FlattenReport {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
    pub page_count: Option<u32>,
    pub annotated_pages: Vec<u32>,
    pub skipped_pages: Vec<PageWarning>,
}

impl FlattenReport {
    pub fn from_result(result: &Result<FlattenOutcome, FlattenError>) -> Self {
        match result {
            Ok(outcome) => FlattenReport {
                success: true,
                output_path: Some(outcome.output_path.clone()),
                error: None,
                page_count: Some(outcome.page_count),
                annotated_pages: outcome.annotated_pages.clone(),
                skipped_pages: outcome.skipped_pages.clone(),
            },
            Err(e) => FlattenReport {
                success: false,
                output_path: None,
                error: Some(e.to_string()),
                page_count: None,
                annotated_pages: Vec::new(),
                skipped_pages: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes() {
        let json = r#"{
            "source": "/docs/lecture.pdf",
            "annotations": [
                {"type":"stroke","page":1,"points":[[0.1,0.1],[0.2,0.2]]},
                {"type":"text","page":2,"x":0.5,"y":0.5,"text":"note"}
            ]
        }"#;
        let request: FlattenRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.source, PathBuf::from("/docs/lecture.pdf"));
        assert_eq!(request.records().len(), 2);
    }

    #[test]
    fn test_request_without_annotations() {
        let json = r#"{"source": "/docs/lecture.pdf"}"#;
        let request: FlattenRequest = serde_json::from_str(json).unwrap();
        assert!(request.records().is_empty());
    }

    #[test]
    fn test_garbled_entries_are_skipped_not_fatal() {
        let json = r#"{
            "source": "/docs/lecture.pdf",
            "annotations": [
                {"type":"stroke","page":1,"points":[[0.1,0.1],[0.2,0.2]]},
                {"type":"scribble","page":1},
                {"page":3},
                "not even an object",
                {"type":"highlight","page":1,"position":{"x":0.1,"y":0.1,"width":0.2,"height":0.1}}
            ]
        }"#;
        let request: FlattenRequest = serde_json::from_str(json).unwrap();
        let records = request.records();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], AnnotationRecord::Stroke { .. }));
        assert!(matches!(records[1], AnnotationRecord::Highlight { .. }));
    }

    #[test]
    fn test_error_report_shape() {
        let result: Result<FlattenOutcome, FlattenError> =
            Err(FlattenError::Open("no such file".to_string()));
        let report = FlattenReport::from_result(&result);
        assert!(!report.success);
        assert!(report.output_path.is_none());
        assert!(report.error.unwrap().contains("no such file"));
    }

    #[test]
    fn test_success_report_serializes() {
        let result: Result<FlattenOutcome, FlattenError> = Ok(FlattenOutcome {
            output_path: PathBuf::from("/docs/lecture-annotated.pdf"),
            page_count: 3,
            annotated_pages: vec![1, 3],
            skipped_pages: vec![PageWarning {
                page: 2,
                reason: "Page has no MediaBox".to_string(),
            }],
        });
        let report = FlattenReport::from_result(&result);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("lecture-annotated.pdf"));
        assert!(json.contains("\"page\":2"));
    }
}
