//! Coordinate transformation between capture and PDF coordinate systems
//!
//! The capture surface works in fractions of the page size with a top-left
//! origin; PDF pages use points with a bottom-left origin, and every page may
//! have its own media box. The transform here is the single place where the
//! vertical flip happens.

use crate::record::{HighlightRegion, RegionRect};

/// Convert a fractional capture point (top-left origin, `[0,1]` of the page
/// size) to PDF coordinates (bottom-left origin, points).
///
/// `media_box` is `[x, y, width, height]` of the target page.
pub fn frac_to_page(x_frac: f64, y_frac: f64, media_box: [f64; 4]) -> (f64, f64) {
    let [mb_x, mb_y, mb_width, mb_height] = media_box;

    let pdf_x = mb_x + (x_frac * mb_width);
    let pdf_y = mb_y + (mb_height - (y_frac * mb_height));

    (pdf_x, pdf_y)
}

/// An absolute rectangle in PDF page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl PageRect {
    pub fn is_degenerate(&self) -> bool {
        self.urx <= self.llx || self.ury <= self.lly
    }
}

/// Convert a highlight region to an absolute page rectangle.
///
/// Both variants describe a top-left-origin box; absolute regions are already
/// in page units while fractional ones scale with the media box. Either way
/// the same vertical flip applies.
pub fn region_to_page(region: HighlightRegion, media_box: [f64; 4]) -> PageRect {
    match region {
        HighlightRegion::Fractional(r) => {
            let (llx, ury) = frac_to_page(r.x, r.y, media_box);
            let (urx, lly) = frac_to_page(r.x + r.width, r.y + r.height, media_box);
            PageRect { llx, lly, urx, ury }
        }
        HighlightRegion::Absolute(r) => absolute_to_page(r, media_box),
    }
}

fn absolute_to_page(r: RegionRect, media_box: [f64; 4]) -> PageRect {
    let [mb_x, mb_y, _, mb_height] = media_box;
    PageRect {
        llx: mb_x + r.x,
        lly: mb_y + mb_height - (r.y + r.height),
        urx: mb_x + r.x + r.width,
        ury: mb_y + mb_height - r.y,
    }
}
