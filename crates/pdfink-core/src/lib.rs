//! Annotation flattening for PDF study documents
//!
//! This crate burns interactively captured annotations (freehand strokes,
//! text labels, highlight regions) permanently into a new copy of a PDF,
//! page by page. The result is a standalone artifact: no viewer-side overlay
//! is needed to display the marks.
//!
//! The capture surface hands over page-relative fractional coordinates with a
//! top-left origin; each target page has its own point-based, bottom-left
//! origin space. The pipeline groups records per page, renders one overlay
//! per annotated page, and composes the output so that pages without
//! annotations are copied through byte-identical.

pub mod color;
pub mod compose;
pub mod coords;
pub mod error;
pub mod flatten;
pub mod group;
pub mod naming;
pub mod overlay;
pub mod record;
pub mod request;

pub use compose::PageWarning;
pub use error::FlattenError;
pub use flatten::{flatten_bytes, flatten_to_file, FlattenOutcome, FlattenedBytes};
pub use naming::annotated_output_path;
pub use record::{AnnotationRecord, HighlightRegion, RegionRect, StrokePoint};
pub use request::{parse_annotations, FlattenRequest, FlattenReport};
