//! Per-page overlay rendering
//!
//! Turns one page's record batch into drawable content: strokes and text
//! become PDF content-stream operations sized for that page's media box,
//! highlights become real `/Highlight` annotation dictionaries so downstream
//! viewers still recognize them as highlights rather than flattened ink.

use crate::color::{self, BLACK};
use crate::coords::{frac_to_page, region_to_page, PageRect};
use crate::record::AnnotationRecord;
use lopdf::content::Operation;
use lopdf::{Dictionary, Object, StringFormat};
use tracing::debug;

/// Resource name the compositor registers the overlay font under.
pub const OVERLAY_FONT_NAME: &[u8] = b"InkF0";

/// Floor for stroke width so hairline fractions stay visible in print.
const MIN_STROKE_WIDTH: f64 = 0.5;

/// Floor for text size so tiny fractions stay readable.
const MIN_FONT_SIZE: f64 = 6.0;

/// Drawn text is capped before rendering; the capture surface does not bound it.
const MAX_TEXT_CHARS: usize = 1000;

/// Highlight translucency, matching the capture surface's preview rendering.
const HIGHLIGHT_OPACITY: f32 = 0.4;

/// Everything one page's annotations produce.
///
/// `content` holds the drawing operations for strokes and text, each wrapped
/// in its own `q`/`Q` pair; `highlights` holds annotation dictionaries to be
/// attached to the page. Either may be empty.
#[derive(Debug, Default)]
pub struct PageOverlay {
    pub content: Vec<Operation>,
    pub uses_text: bool,
    pub highlights: Vec<Dictionary>,
}

impl PageOverlay {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.highlights.is_empty()
    }
}

/// Render one page's record batch against its media box
/// (`[x, y, width, height]`, the page's own dimensions).
///
/// Records are rendered in list order so later marks layer on top of earlier
/// ones. Malformed records (degenerate strokes, empty text, missing highlight
/// positions) are inert, never errors.
pub fn render_overlay(media_box: [f64; 4], records: &[&AnnotationRecord]) -> PageOverlay {
    let mut overlay = PageOverlay::default();
    let page_height = media_box[3];

    for record in records {
        match record {
            AnnotationRecord::Stroke {
                points,
                width_frac,
                color,
                ..
            } => {
                if points.len() < 2 {
                    debug!(count = points.len(), "skipping stroke with too few points");
                    continue;
                }
                let width = (page_height * width_frac).max(MIN_STROKE_WIDTH);
                let (r, g, b) = color::parse_hex_color(color, BLACK);

                overlay.content.push(Operation::new("q", vec![]));
                overlay
                    .content
                    .push(Operation::new("w", vec![Object::Real(width as f32)]));
                // Round caps and joins for a freehand look
                overlay
                    .content
                    .push(Operation::new("J", vec![Object::Integer(1)]));
                overlay
                    .content
                    .push(Operation::new("j", vec![Object::Integer(1)]));
                overlay.content.push(Operation::new(
                    "RG",
                    vec![Object::Real(r), Object::Real(g), Object::Real(b)],
                ));
                for (i, point) in points.iter().enumerate() {
                    let (x, y) = frac_to_page(point.x, point.y, media_box);
                    let operator = if i == 0 { "m" } else { "l" };
                    overlay.content.push(Operation::new(
                        operator,
                        vec![Object::Real(x as f32), Object::Real(y as f32)],
                    ));
                }
                overlay.content.push(Operation::new("S", vec![]));
                overlay.content.push(Operation::new("Q", vec![]));
            }

            AnnotationRecord::Text {
                x,
                y,
                text,
                font_size_frac,
                color,
                ..
            } => {
                let text = cap_text(text);
                if text.is_empty() {
                    continue;
                }
                let size = (page_height * font_size_frac).max(MIN_FONT_SIZE);
                let (r, g, b) = color::parse_hex_color(color, BLACK);
                let (anchor_x, anchor_y) = frac_to_page(*x, *y, media_box);

                overlay.content.push(Operation::new("q", vec![]));
                overlay.content.push(Operation::new("BT", vec![]));
                overlay.content.push(Operation::new(
                    "Tf",
                    vec![
                        Object::Name(OVERLAY_FONT_NAME.to_vec()),
                        Object::Real(size as f32),
                    ],
                ));
                overlay.content.push(Operation::new(
                    "rg",
                    vec![Object::Real(r), Object::Real(g), Object::Real(b)],
                ));
                overlay.content.push(Operation::new(
                    "Td",
                    vec![
                        Object::Real(anchor_x as f32),
                        Object::Real(anchor_y as f32),
                    ],
                ));
                overlay.content.push(Operation::new(
                    "Tj",
                    vec![Object::String(
                        encode_latin1_lossy(text),
                        StringFormat::Literal,
                    )],
                ));
                overlay.content.push(Operation::new("ET", vec![]));
                overlay.content.push(Operation::new("Q", vec![]));
                overlay.uses_text = true;
            }

            AnnotationRecord::Highlight {
                text,
                position,
                color,
                ..
            } => {
                let Some(region) = position else {
                    debug!("skipping highlight without position");
                    continue;
                };
                let rect = region_to_page(*region, media_box);
                if rect.is_degenerate() {
                    debug!("skipping highlight with degenerate region");
                    continue;
                }
                overlay
                    .highlights
                    .push(highlight_annotation(rect, color, text));
            }
        }
    }

    overlay
}

fn highlight_annotation(rect: PageRect, color: &str, text: &str) -> Dictionary {
    let (r, g, b) = color::highlight_color(color);

    let mut annot = Dictionary::new();
    annot.set("Type", Object::Name(b"Annot".to_vec()));
    annot.set("Subtype", Object::Name(b"Highlight".to_vec()));
    annot.set(
        "Rect",
        Object::Array(vec![
            Object::Real(rect.llx as f32),
            Object::Real(rect.lly as f32),
            Object::Real(rect.urx as f32),
            Object::Real(rect.ury as f32),
        ]),
    );
    // One quad covering the whole region: upper edge pair, then lower
    annot.set(
        "QuadPoints",
        Object::Array(vec![
            Object::Real(rect.llx as f32),
            Object::Real(rect.ury as f32),
            Object::Real(rect.urx as f32),
            Object::Real(rect.ury as f32),
            Object::Real(rect.llx as f32),
            Object::Real(rect.lly as f32),
            Object::Real(rect.urx as f32),
            Object::Real(rect.lly as f32),
        ]),
    );
    annot.set(
        "C",
        Object::Array(vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
    );
    annot.set("CA", Object::Real(HIGHLIGHT_OPACITY));
    if !text.is_empty() {
        annot.set(
            "Contents",
            Object::String(text.as_bytes().to_vec(), StringFormat::Literal),
        );
    }
    annot
}

/// Truncate on a char boundary; overflow is drawn as-is, never wrapped.
fn cap_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Standard-font text carries Latin-1 bytes; anything outside is replaced.
fn encode_latin1_lossy(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let cp = c as u32;
            if cp <= 0xFF {
                cp as u8
            } else {
                b'?'
            }
        })
        .collect()
}
