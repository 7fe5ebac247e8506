//! Page-by-page composition of the output document
//!
//! The output starts as a clone of the source, so pages with no annotations
//! keep their exact stream objects. An annotated page gets its overlay
//! mounted as a form XObject whose BBox is the page's own media box, invoked
//! through a `q` / `Q q ... Do Q` sandwich around the original content
//! streams: the originals are never rewritten, and graphics state cannot leak
//! between them and the overlay. Highlight annotations are appended to the
//! page's `Annots`.
//!
//! Each page runs inside its own error boundary. A page that cannot be
//! stamped (broken page dictionary, unparseable media box) stays an untouched
//! copy and is reported as a warning instead of failing the whole document.

use crate::error::FlattenError;
use crate::overlay::{render_overlay, PageOverlay, OVERLAY_FONT_NAME};
use crate::record::AnnotationRecord;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Resource name the overlay form XObject is registered under on the page.
const OVERLAY_XOBJECT_NAME: &[u8] = b"InkOv0";

/// Guard against reference cycles when walking Parent chains.
const PAGE_TREE_DEPTH_LIMIT: usize = 32;

/// A page whose annotations were abandoned; the page itself was copied
/// through unmodified.
#[derive(Debug, Clone, Serialize)]
pub struct PageWarning {
    pub page: u32,
    pub reason: String,
}

pub struct ComposedDocument {
    pub doc: Document,
    /// Pages that received an overlay and/or highlight annotations.
    pub annotated_pages: Vec<u32>,
    pub skipped_pages: Vec<PageWarning>,
}

/// Walk every page of the source in order, stamping the pages that have a
/// record batch and copying the rest through untouched.
///
/// The source document is never mutated; the caller may still be displaying
/// it live.
pub fn compose(
    source: &Document,
    groups: &BTreeMap<u32, Vec<&AnnotationRecord>>,
) -> Result<ComposedDocument, FlattenError> {
    let mut doc = source.clone();
    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();

    let mut overlay_font: Option<ObjectId> = None;
    let mut annotated_pages = Vec::new();
    let mut skipped_pages = Vec::new();

    for (page_num, page_id) in pages {
        let Some(records) = groups.get(&page_num) else {
            continue;
        };
        match stamp_page(&mut doc, page_id, records, &mut overlay_font) {
            Ok(true) => annotated_pages.push(page_num),
            Ok(false) => debug!(page = page_num, "all records inert, page left untouched"),
            Err(e) => {
                warn!(page = page_num, error = %e, "page overlay failed, copying page through");
                skipped_pages.push(PageWarning {
                    page: page_num,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(ComposedDocument {
        doc,
        annotated_pages,
        skipped_pages,
    })
}

/// Render and mount one page's overlay. Returns false when every record on
/// the page was inert and the page was left alone.
///
/// Fallible reads all happen before the first mutation of the page
/// dictionary, so a failure leaves the page exactly as the source had it.
fn stamp_page(
    doc: &mut Document,
    page_id: ObjectId,
    records: &[&AnnotationRecord],
    overlay_font: &mut Option<ObjectId>,
) -> Result<bool, FlattenError> {
    let media_box = page_media_box(doc, page_id)?;
    let PageOverlay {
        content,
        uses_text,
        highlights,
    } = render_overlay(media_box, records);

    if content.is_empty() && highlights.is_empty() {
        return Ok(false);
    }

    if !content.is_empty() {
        let form_bytes = encode_ops(content)?;
        let original_contents = content_stream_ids(doc, page_id)?;
        let mut resources = resolved_resources(doc, page_id);

        let [mb_x, mb_y, mb_w, mb_h] = media_box;
        let mut form_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => Object::Array(vec![
                Object::Real(mb_x as f32),
                Object::Real(mb_y as f32),
                Object::Real((mb_x + mb_w) as f32),
                Object::Real((mb_y + mb_h) as f32),
            ]),
        };
        if uses_text {
            let font_id = *overlay_font.get_or_insert_with(|| {
                doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                })
            });
            let mut fonts = Dictionary::new();
            fonts.set(OVERLAY_FONT_NAME, Object::Reference(font_id));
            let mut form_resources = Dictionary::new();
            form_resources.set("Font", Object::Dictionary(fonts));
            form_dict.set("Resources", Object::Dictionary(form_resources));
        }
        let form_id = doc.add_object(Stream::new(form_dict, form_bytes));

        let save_id = doc.add_object(Stream::new(
            Dictionary::new(),
            encode_ops(vec![Operation::new("q", vec![])])?,
        ));
        let restore_id = doc.add_object(Stream::new(
            Dictionary::new(),
            encode_ops(vec![
                Operation::new("Q", vec![]),
                Operation::new("q", vec![]),
                Operation::new("Do", vec![Object::Name(OVERLAY_XOBJECT_NAME.to_vec())]),
                Operation::new("Q", vec![]),
            ])?,
        ));

        // Inherited resources are cloned down onto the page before the
        // overlay name is added, so nothing the original content relies on
        // gets lost.
        let mut xobjects = match resources.get(b"XObject") {
            Ok(obj) => match resolve(doc, obj).as_dict() {
                Ok(existing) => existing.clone(),
                Err(_) => Dictionary::new(),
            },
            Err(_) => Dictionary::new(),
        };
        xobjects.set(OVERLAY_XOBJECT_NAME, Object::Reference(form_id));
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut contents = Vec::with_capacity(original_contents.len() + 2);
        contents.push(Object::Reference(save_id));
        contents.extend(original_contents.into_iter().map(Object::Reference));
        contents.push(Object::Reference(restore_id));

        let page = doc
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(op_err)?;
        page.set("Contents", Object::Array(contents));
        page.set("Resources", Object::Dictionary(resources));
    }

    for annot in highlights {
        let annot_id = doc.add_object(Object::Dictionary(annot));
        add_annotation_to_page(doc, page_id, annot_id)?;
    }

    Ok(true)
}

fn op_err(e: lopdf::Error) -> FlattenError {
    FlattenError::Operation(e.to_string())
}

fn encode_ops(operations: Vec<Operation>) -> Result<Vec<u8>, FlattenError> {
    Content { operations }
        .encode()
        .map_err(|e| FlattenError::Operation(format!("Content encoding failed: {}", e)))
}

/// Follow a reference one hop; non-references come back unchanged.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(v) => Some(*v as f64),
        Object::Real(v) => Some(*v as f64),
        _ => None,
    }
}

/// Resolve a page's media box as `[x, y, width, height]`, following the
/// Parent chain when the entry is inherited.
fn page_media_box(doc: &Document, page_id: ObjectId) -> Result<[f64; 4], FlattenError> {
    let mut current = page_id;
    for _ in 0..PAGE_TREE_DEPTH_LIMIT {
        let dict = doc
            .get_object(current)
            .and_then(|o| o.as_dict())
            .map_err(op_err)?;

        if let Ok(obj) = dict.get(b"MediaBox") {
            let corners = resolve(doc, obj).as_array().map_err(op_err)?;
            if corners.len() != 4 {
                return Err(FlattenError::Operation(format!(
                    "MediaBox has {} entries, expected 4",
                    corners.len()
                )));
            }
            let mut nums = [0.0f64; 4];
            for (i, corner) in corners.iter().enumerate() {
                nums[i] = number(resolve(doc, corner)).ok_or_else(|| {
                    FlattenError::Operation("MediaBox entry is not a number".into())
                })?;
            }
            let width = (nums[2] - nums[0]).abs();
            let height = (nums[3] - nums[1]).abs();
            if width <= 0.0 || height <= 0.0 {
                return Err(FlattenError::Operation("MediaBox is empty".into()));
            }
            return Ok([nums[0].min(nums[2]), nums[1].min(nums[3]), width, height]);
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(id)) => current = *id,
            _ => break,
        }
    }
    Err(FlattenError::Operation("Page has no MediaBox".into()))
}

/// Resolve the resources a page currently sees (own or inherited), cloned so
/// the caller can extend them on the page itself.
fn resolved_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = page_id;
    for _ in 0..PAGE_TREE_DEPTH_LIMIT {
        let Ok(dict) = doc.get_object(current).and_then(|o| o.as_dict()) else {
            break;
        };
        if let Ok(obj) = dict.get(b"Resources") {
            if let Ok(res) = resolve(doc, obj).as_dict() {
                return res.clone();
            }
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(id)) => current = *id,
            _ => break,
        }
    }
    Dictionary::new()
}

/// Collect the page's content stream ids, in order.
fn content_stream_ids(doc: &Document, page_id: ObjectId) -> Result<Vec<ObjectId>, FlattenError> {
    let dict = doc
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .map_err(op_err)?;

    match dict.get(b"Contents") {
        Ok(Object::Reference(id)) => Ok(vec![*id]),
        Ok(Object::Array(items)) => items
            .iter()
            .map(|o| o.as_reference().map_err(op_err))
            .collect(),
        Ok(other) => Err(FlattenError::Operation(format!(
            "Unexpected Contents object: {:?}",
            other
        ))),
        Err(_) => Ok(Vec::new()),
    }
}

fn add_annotation_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    annot_id: ObjectId,
) -> Result<(), FlattenError> {
    // Annots may live behind a reference; resolve before deciding where to push
    let annots_ref = {
        let dict = doc
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map_err(op_err)?;
        match dict.get(b"Annots") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };
    if let Some(array_id) = annots_ref {
        if let Ok(Object::Array(arr)) = doc.get_object_mut(array_id) {
            arr.push(Object::Reference(annot_id));
            return Ok(());
        }
    }

    let page = doc.get_object_mut(page_id).map_err(op_err)?;
    if let Object::Dictionary(ref mut page_dict) = page {
        if let Ok(Object::Array(ref mut arr)) = page_dict.get_mut(b"Annots") {
            arr.push(Object::Reference(annot_id));
        } else {
            page_dict.set("Annots", Object::Array(vec![Object::Reference(annot_id)]));
        }
    }
    Ok(())
}
