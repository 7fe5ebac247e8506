//! Per-page grouping of the flat annotation list

use crate::record::AnnotationRecord;
use std::collections::BTreeMap;
use tracing::warn;

/// Partition a flat, arbitrarily-ordered record list into per-page batches.
///
/// Keys are 1-based page numbers. Within a page, records keep their input
/// order, since later marks must layer on top of earlier ones. Records with a
/// non-positive page or one beyond `page_count` are dropped, not errored;
/// pages with no records simply get no entry.
pub fn group_by_page(
    records: &[AnnotationRecord],
    page_count: u32,
) -> BTreeMap<u32, Vec<&AnnotationRecord>> {
    let mut groups: BTreeMap<u32, Vec<&AnnotationRecord>> = BTreeMap::new();

    for record in records {
        let page = record.page();
        if page <= 0 {
            warn!(page, "dropping annotation with non-positive page");
            continue;
        }
        let page = page as u64;
        if page > u64::from(page_count) {
            warn!(page, page_count, "dropping annotation beyond document length");
            continue;
        }
        groups.entry(page as u32).or_default().push(record);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StrokePoint;

    fn stroke(page: i64) -> AnnotationRecord {
        AnnotationRecord::Stroke {
            page,
            points: vec![
                StrokePoint { x: 0.1, y: 0.1 },
                StrokePoint { x: 0.2, y: 0.2 },
            ],
            width_frac: 0.003,
            color: "#ff2d55".to_string(),
        }
    }

    fn text(page: i64, text: &str) -> AnnotationRecord {
        AnnotationRecord::Text {
            page,
            x: 0.5,
            y: 0.5,
            text: text.to_string(),
            font_size_frac: 0.02,
            color: "#000000".to_string(),
        }
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        let groups = group_by_page(&[], 10);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_groups_by_page_preserving_in_page_order() {
        let records = vec![
            text(2, "first on 2"),
            stroke(1),
            text(2, "second on 2"),
            text(1, "after stroke"),
        ];
        let groups = group_by_page(&records, 3);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&1].len(), 2);
        assert_eq!(groups[&2].len(), 2);
        assert_eq!(groups[&1][0], &records[1]);
        assert_eq!(groups[&1][1], &records[3]);
        assert_eq!(groups[&2][0], &records[0]);
        assert_eq!(groups[&2][1], &records[2]);
    }

    #[test]
    fn test_drops_non_positive_and_out_of_range_pages() {
        let records = vec![stroke(0), stroke(-5), stroke(9999), stroke(2)];
        let groups = group_by_page(&records, 3);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&2].len(), 1);
    }

    #[test]
    fn test_page_without_records_has_no_entry() {
        let records = vec![stroke(1), text(3, "skip the middle")];
        let groups = group_by_page(&records, 3);

        assert!(groups.contains_key(&1));
        assert!(!groups.contains_key(&2));
        assert!(groups.contains_key(&3));
    }
}
