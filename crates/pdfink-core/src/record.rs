//! Annotation records captured by the viewer overlay
//!
//! This module defines the wire data model for the three annotation kinds a
//! capture surface produces. The payload is written by browser-side code and
//! is only loosely validated at the source, so deserialization leans
//! tolerant: missing fields take defaults, stroke points accept both object
//! and pair forms, and the highlight position is classified once into an
//! explicit fractional/absolute variant so nothing downstream has to inspect
//! number types.

use serde::{Deserialize, Deserializer};

fn default_stroke_width() -> f64 {
    0.003
}

fn default_stroke_color() -> String {
    "#ff2d55".to_string()
}

fn default_font_size() -> f64 {
    0.02
}

fn default_text_color() -> String {
    "#000000".to_string()
}

fn default_highlight_color() -> String {
    "yellow".to_string()
}

/// One sampled point of a freehand stroke, fractional, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
}

/// Accept both `{"x": .., "y": ..}` and `[x, y]` point encodings.
fn deserialize_points<'de, D>(deserializer: D) -> Result<Vec<StrokePoint>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPoint {
        Object { x: f64, y: f64 },
        Pair(f64, f64),
    }

    let raw = Vec::<RawPoint>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|p| match p {
            RawPoint::Object { x, y } => StrokePoint { x, y },
            RawPoint::Pair(x, y) => StrokePoint { x, y },
        })
        .collect())
}

/// An axis-aligned box in the capture surface's top-left-origin space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A highlight's bounding region, classified at the producer boundary.
///
/// The capture surface may report the region either as fractions of the page
/// size or as already-absolute page units (its text layer works in both).
/// The wire format is the same `{x, y, width, height}` object in both cases;
/// the distinction is made once, here, and carried as an explicit variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HighlightRegion {
    /// Fractions of the page width/height in `[0, 1]`, top-left origin.
    Fractional(RegionRect),
    /// Page units (points), top-left origin.
    Absolute(RegionRect),
}

impl<'de> Deserialize<'de> for HighlightRegion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawRegion {
            #[serde(default)]
            x: Option<serde_json::Number>,
            #[serde(default)]
            y: Option<serde_json::Number>,
            #[serde(default)]
            width: Option<serde_json::Number>,
            #[serde(default)]
            height: Option<serde_json::Number>,
        }

        let raw = RawRegion::deserialize(deserializer)?;
        let values = [&raw.x, &raw.y, &raw.width, &raw.height];

        // Integral values can only come from a producer working in whole page
        // units; fractions always arrive as floats. A float with magnitude
        // beyond 2.0 cannot be a fraction of a page either.
        let all_integral = values
            .iter()
            .all(|v| v.as_ref().map_or(true, |n| n.is_i64() || n.is_u64()));
        let as_f64 = |n: &Option<serde_json::Number>| {
            n.as_ref().and_then(|n| n.as_f64()).unwrap_or(0.0)
        };
        let rect = RegionRect {
            x: as_f64(&raw.x),
            y: as_f64(&raw.y),
            width: as_f64(&raw.width),
            height: as_f64(&raw.height),
        };
        let out_of_fraction_range = [rect.x, rect.y, rect.width, rect.height]
            .iter()
            .any(|v| v.abs() > 2.0);

        if all_integral || out_of_fraction_range {
            Ok(HighlightRegion::Absolute(rect))
        } else {
            Ok(HighlightRegion::Fractional(rect))
        }
    }
}

/// A single captured annotation, targeting one 1-based page.
///
/// `page` is kept as the raw signed value from the wire; the grouper drops
/// non-positive and out-of-range pages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationRecord {
    Stroke {
        #[serde(default)]
        page: i64,
        #[serde(default, deserialize_with = "deserialize_points")]
        points: Vec<StrokePoint>,
        /// Stroke thickness as a fraction of page height.
        #[serde(default = "default_stroke_width")]
        width_frac: f64,
        #[serde(default = "default_stroke_color")]
        color: String,
    },
    Text {
        #[serde(default)]
        page: i64,
        /// Anchor point, fractional, top-left origin.
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        #[serde(default)]
        text: String,
        /// Font size as a fraction of page height.
        #[serde(default = "default_font_size")]
        font_size_frac: f64,
        #[serde(default = "default_text_color")]
        color: String,
    },
    Highlight {
        #[serde(default)]
        page: i64,
        /// The highlighted string, informational only.
        #[serde(default)]
        text: String,
        #[serde(default)]
        position: Option<HighlightRegion>,
        /// Named highlighter color, resolved against the fixed table.
        #[serde(default = "default_highlight_color")]
        color: String,
    },
}

impl AnnotationRecord {
    pub fn page(&self) -> i64 {
        match self {
            AnnotationRecord::Stroke { page, .. } => *page,
            AnnotationRecord::Text { page, .. } => *page,
            AnnotationRecord::Highlight { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroke_deserializes_with_defaults() {
        let json = r#"{"type":"stroke","page":2,"points":[{"x":0.1,"y":0.2},{"x":0.3,"y":0.4}]}"#;
        let record: AnnotationRecord = serde_json::from_str(json).unwrap();
        match record {
            AnnotationRecord::Stroke {
                page,
                points,
                width_frac,
                color,
            } => {
                assert_eq!(page, 2);
                assert_eq!(points.len(), 2);
                assert_eq!(points[0], StrokePoint { x: 0.1, y: 0.2 });
                assert_eq!(width_frac, 0.003);
                assert_eq!(color, "#ff2d55");
            }
            other => panic!("Expected Stroke, got {:?}", other),
        }
    }

    #[test]
    fn test_stroke_accepts_pair_points() {
        let json = r#"{"type":"stroke","page":1,"points":[[0.1,0.2],[0.3,0.4]]}"#;
        let record: AnnotationRecord = serde_json::from_str(json).unwrap();
        match record {
            AnnotationRecord::Stroke { points, .. } => {
                assert_eq!(points[1], StrokePoint { x: 0.3, y: 0.4 });
            }
            other => panic!("Expected Stroke, got {:?}", other),
        }
    }

    #[test]
    fn test_text_deserializes_with_defaults() {
        let json = r#"{"type":"text","page":1,"x":0.5,"y":0.25,"text":"note"}"#;
        let record: AnnotationRecord = serde_json::from_str(json).unwrap();
        match record {
            AnnotationRecord::Text {
                font_size_frac,
                color,
                text,
                ..
            } => {
                assert_eq!(font_size_frac, 0.02);
                assert_eq!(color, "#000000");
                assert_eq!(text, "note");
            }
            other => panic!("Expected Text, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_page_defaults_to_zero() {
        let json = r#"{"type":"text","x":0.5,"y":0.5,"text":"orphan"}"#;
        let record: AnnotationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.page(), 0);
    }

    #[test]
    fn test_highlight_fractional_region() {
        let json = r#"{"type":"highlight","page":1,"text":"hi",
            "position":{"x":0.1,"y":0.1,"width":0.3,"height":0.05},"color":"green"}"#;
        let record: AnnotationRecord = serde_json::from_str(json).unwrap();
        match record {
            AnnotationRecord::Highlight { position, .. } => {
                assert_eq!(
                    position,
                    Some(HighlightRegion::Fractional(RegionRect {
                        x: 0.1,
                        y: 0.1,
                        width: 0.3,
                        height: 0.05,
                    }))
                );
            }
            other => panic!("Expected Highlight, got {:?}", other),
        }
    }

    #[test]
    fn test_highlight_integral_region_is_absolute() {
        let json = r#"{"type":"highlight","page":1,
            "position":{"x":61,"y":79,"width":183,"height":39}}"#;
        let record: AnnotationRecord = serde_json::from_str(json).unwrap();
        match record {
            AnnotationRecord::Highlight { position, color, .. } => {
                assert!(matches!(position, Some(HighlightRegion::Absolute(_))));
                assert_eq!(color, "yellow");
            }
            other => panic!("Expected Highlight, got {:?}", other),
        }
    }

    #[test]
    fn test_highlight_large_float_region_is_absolute() {
        // A "fraction" of 61.2 cannot exist; treat the rect as page units
        let json = r#"{"type":"highlight","page":1,
            "position":{"x":61.2,"y":79.0,"width":183.6,"height":39.6}}"#;
        let record: AnnotationRecord = serde_json::from_str(json).unwrap();
        match record {
            AnnotationRecord::Highlight { position, .. } => {
                assert!(matches!(position, Some(HighlightRegion::Absolute(_))));
            }
            other => panic!("Expected Highlight, got {:?}", other),
        }
    }

    #[test]
    fn test_highlight_without_position() {
        let json = r#"{"type":"highlight","page":3,"text":"floating"}"#;
        let record: AnnotationRecord = serde_json::from_str(json).unwrap();
        match record {
            AnnotationRecord::Highlight { position, .. } => assert!(position.is_none()),
            other => panic!("Expected Highlight, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_discriminant_is_an_error() {
        let json = r#"{"type":"scribble","page":1}"#;
        assert!(serde_json::from_str::<AnnotationRecord>(json).is_err());
    }
}
