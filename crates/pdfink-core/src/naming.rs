//! Output path derivation

use std::path::{Path, PathBuf};

const OUTPUT_SUFFIX: &str = "-annotated";

/// Derive the flattened document's path: a sibling of the source with the
/// stem suffixed (`notes.pdf` -> `notes-annotated.pdf`).
///
/// Pure and deterministic: the same source always maps to the same output, so
/// re-flattening replaces the previous flattened copy rather than piling up
/// numbered variants. The result can never equal the source path itself.
pub fn annotated_output_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{}{}", stem, OUTPUT_SUFFIX);
    if let Some(ext) = source.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    source.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffixes_the_stem() {
        assert_eq!(
            annotated_output_path(Path::new("/docs/lecture.pdf")),
            PathBuf::from("/docs/lecture-annotated.pdf")
        );
    }

    #[test]
    fn test_is_deterministic() {
        let source = Path::new("/docs/lecture.pdf");
        assert_eq!(annotated_output_path(source), annotated_output_path(source));
    }

    #[test]
    fn test_never_equals_source() {
        for raw in ["/docs/a.pdf", "/docs/a-annotated.pdf", "/docs/noext"] {
            let source = Path::new(raw);
            assert_ne!(annotated_output_path(source), source);
        }
    }

    #[test]
    fn test_no_extension() {
        assert_eq!(
            annotated_output_path(Path::new("/docs/scan")),
            PathBuf::from("/docs/scan-annotated")
        );
    }

    #[test]
    fn test_dotted_stem() {
        assert_eq!(
            annotated_output_path(Path::new("/docs/v1.2-notes.pdf")),
            PathBuf::from("/docs/v1.2-notes-annotated.pdf")
        );
    }
}
