//! Color resolution for annotation rendering
//!
//! Colors come from an interactive capture surface and may be arbitrarily
//! malformed; resolution always degrades to a fallback instead of failing.

/// RGB channels in the 0-1 range.
pub type Rgb = (f32, f32, f32);

pub const BLACK: Rgb = (0.0, 0.0, 0.0);

/// Parse a hex color string (e.g., "#FF0000" or "FF0000") to RGB floats.
///
/// Any malformed input (wrong length, non-hex digits) yields the
/// caller-supplied fallback unchanged.
pub fn parse_hex_color(color: &str, fallback: Rgb) -> Rgb {
    let hex = color.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return fallback;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => (
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
        ),
        _ => fallback,
    }
}

/// Resolve a named highlighter color against the fixed table.
///
/// Unrecognized names fall back to yellow.
pub fn highlight_color(name: &str) -> Rgb {
    match name.to_lowercase().as_str() {
        "yellow" => (1.0, 0.92, 0.23),
        "green" => (0.30, 0.69, 0.31),
        "blue" => (0.13, 0.59, 0.95),
        "pink" => (1.0, 0.41, 0.71),
        "orange" => (1.0, 0.60, 0.0),
        "purple" => (0.61, 0.15, 0.69),
        "red" => (0.96, 0.26, 0.21),
        "cyan" => (0.0, 0.74, 0.83),
        _ => (1.0, 0.92, 0.23),
    }
}
