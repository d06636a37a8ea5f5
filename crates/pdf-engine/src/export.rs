//! Serializing the edited page list back to PDF bytes
//!
//! Each output page reuses its source page's content untouched. Edits are
//! drawn in an appended overlay stream, and the original content is wrapped
//! in `q`/`Q` so its graphics state cannot leak into the overlay. Pages with
//! nothing to draw keep their original content array as-is.

use crate::error::ExportError;
use crate::fonts::{encode_win_ansi, StandardFont};
use crate::raster::add_image_xobject;
use crate::source::{inherited_attribute, resolve, SourceDocument};
use doc_model::{
    Annotation, AnnotationKind, Color, Page, PageGeometry, PageSource, PdfPoint, Rect, Stroke,
    TextEdit, TextStyle,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Catalog entries that point into the replaced page tree
const STALE_CATALOG_KEYS: [&[u8]; 4] = [b"Outlines", b"StructTreeRoot", b"OpenAction", b"PageLabels"];

/// Line spacing of multi-line text, as a multiple of the font size
const LINE_SPACING: f32 = 1.2;

/// Vertical padding of the cover drawn over replaced text, as a share of its height
const TEXT_COVER_PADDING: f32 = 0.25;

/// Bezier control-point distance for a quarter ellipse
const KAPPA: f32 = 0.552_284_8;

/// ZapfDingbats codes for the check and cross marks
const CHECK_GLYPH: u8 = b'4';
const CROSS_GLYPH: u8 = b'8';

/// Serialize `pages` against `source`, calling `on_page(completed, total)` after each page
pub fn export_document(
    source: &SourceDocument,
    pages: &[Page],
    on_page: &mut dyn FnMut(usize, usize),
) -> Result<Vec<u8>, ExportError> {
    if pages.is_empty() {
        return Err(ExportError::NoPages);
    }

    let mut document = source.document().clone();
    let pages_id = document.new_object_id();
    let mut writer = OverlayWriter::default();
    let mut kids = Vec::with_capacity(pages.len());

    for (index, page) in pages.iter().enumerate() {
        let (mut dict, base) = match page.source {
            PageSource::Source(source_index) => source_page_dict(source, source_index)?,
            PageSource::Blank => (blank_page_dict(), PageGeometry::blank()),
        };
        dict.set("Parent", Object::Reference(pages_id));
        dict.set("Rotate", i64::from(base.rotation.add(page.rotation_delta).degrees()));

        if page.has_overlay() {
            writer.paint(&mut document, &mut dict, page, &base)?;
            log::debug!("painted overlay for output page {index}");
        }

        kids.push(Object::Reference(document.add_object(dict)));
        on_page(index + 1, pages.len());
    }

    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );

    let root_id = document.trailer.get(b"Root").and_then(Object::as_reference)?;
    let catalog = document.get_object_mut(root_id).and_then(Object::as_dict_mut)?;
    catalog.set("Pages", Object::Reference(pages_id));
    for key in STALE_CATALOG_KEYS {
        catalog.remove(key);
    }

    document.prune_objects();
    document.renumber_objects();

    let mut bytes = Vec::new();
    document.save_to(&mut bytes)?;
    log::info!("exported {} pages ({} bytes)", pages.len(), bytes.len());
    Ok(bytes)
}

/// Copy of a source page dictionary with inherited attributes made explicit
fn source_page_dict(source: &SourceDocument, index: usize) -> Result<(Dictionary, PageGeometry), ExportError> {
    let page = source
        .page(index)
        .ok_or(ExportError::PageOutOfRange { page: index, page_count: source.page_count() })?;
    let document = source.document();

    let mut dict = document.get_dictionary(page.object_id)?.clone();
    for key in INHERITABLE {
        if !dict.has(key) {
            if let Some(value) = inherited_attribute(document, page.object_id, key) {
                dict.set(key.to_vec(), value.clone());
            }
        }
    }
    Ok((dict, page.geometry))
}

fn blank_page_dict() -> Dictionary {
    let geometry = PageGeometry::blank();
    dictionary! {
        "Type" => "Page",
        "MediaBox" => reals(&[0.0, 0.0, geometry.width, geometry.height]),
        "Resources" => dictionary! {},
    }
}

/// Document-wide resources shared by all overlays
#[derive(Default)]
struct OverlayWriter {
    fonts: BTreeMap<StandardFont, ObjectId>,
    opacity_states: BTreeMap<u8, ObjectId>,
    images: HashMap<String, ObjectId>,
    save_state: Option<ObjectId>,
}

/// Resources and annotations one overlay refers to
#[derive(Default)]
struct PageResources {
    fonts: BTreeSet<StandardFont>,
    opacity_states: BTreeSet<u8>,
    images: Vec<(String, ObjectId)>,
    links: Vec<Dictionary>,
}

impl OverlayWriter {
    fn paint(
        &mut self,
        document: &mut Document,
        dict: &mut Dictionary,
        page: &Page,
        base: &PageGeometry,
    ) -> Result<(), ExportError> {
        let mut resources = PageResources::default();
        let mut ops = vec![
            Operation::new("q", vec![]),
            Operation::new("cm", reals(&[1.0, 0.0, 0.0, 1.0, base.origin_x, base.origin_y])),
        ];

        for edit in page.text_edits.values().filter(|edit| edit.is_modified()) {
            text_edit_ops(&mut ops, &mut resources, edit);
        }
        for annotation in &page.annotations {
            self.annotation_ops(document, &mut ops, &mut resources, annotation, base)?;
        }
        ops.push(Operation::new("Q", vec![]));

        let original = dict.remove(b"Contents");
        let mut contents = Vec::new();
        if let Some(original) = original {
            contents.push(Object::Reference(self.save_state_stream(document)));
            match original {
                Object::Array(items) => contents.extend(items),
                other => contents.push(other),
            }
            ops.insert(0, Operation::new("Q", vec![]));
        }
        let overlay = Content { operations: ops }.encode()?;
        contents.push(Object::Reference(document.add_object(Stream::new(dictionary! {}, overlay))));
        dict.set("Contents", contents);

        self.merge_resources(document, dict, resources)?;
        Ok(())
    }

    fn save_state_stream(&mut self, document: &mut Document) -> ObjectId {
        *self
            .save_state
            .get_or_insert_with(|| document.add_object(Stream::new(dictionary! {}, b"q\n".to_vec())))
    }

    fn font(&mut self, document: &mut Document, font: StandardFont) -> ObjectId {
        *self.fonts.entry(font).or_insert_with(|| {
            let mut dict = dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_name(),
            };
            if font.uses_win_ansi() {
                dict.set("Encoding", "WinAnsiEncoding");
            }
            document.add_object(dict)
        })
    }

    fn annotation_ops(
        &mut self,
        document: &mut Document,
        ops: &mut Vec<Operation>,
        resources: &mut PageResources,
        annotation: &Annotation,
        base: &PageGeometry,
    ) -> Result<(), ExportError> {
        let rect = annotation.rect;
        ops.push(Operation::new("q", vec![]));
        if let Some(degrees) = annotation.rotation.filter(|degrees| *degrees % 360.0 != 0.0) {
            let center = rect.center();
            let (sin, cos) = degrees.to_radians().sin_cos();
            ops.push(Operation::new("cm", reals(&[1.0, 0.0, 0.0, 1.0, center.x, center.y])));
            ops.push(Operation::new("cm", reals(&[cos, -sin, sin, cos, 0.0, 0.0])));
            ops.push(Operation::new("cm", reals(&[1.0, 0.0, 0.0, 1.0, -center.x, -center.y])));
        }

        match &annotation.kind {
            AnnotationKind::Text { content, style } => {
                text_block_ops(ops, resources, content, style, &rect);
            }
            AnnotationKind::Link { url, label, style } => {
                let label = if label.trim().is_empty() { url } else { label };
                text_block_ops(ops, resources, label, style, &rect);
                resources.links.push(link_annotation(url, &rect, base));
            }
            AnnotationKind::Image { data_url, .. } => {
                let image_id = match self.images.get(data_url.as_ref()) {
                    Some(id) => *id,
                    None => {
                        let id = add_image_xobject(document, data_url)?;
                        self.images.insert(data_url.to_string(), id);
                        id
                    }
                };
                let name = format!("EdIm{}", resources.images.len() + 1);
                ops.push(Operation::new("cm", reals(&[rect.width, 0.0, 0.0, rect.height, rect.x, rect.y])));
                ops.push(Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]));
                resources.images.push((name, image_id));
            }
            AnnotationKind::Whiteout => fill_rect_ops(ops, &rect, Color::WHITE),
            AnnotationKind::FreehandPath { points, stroke } | AnnotationKind::Line { points, stroke } => {
                polyline_ops(ops, points, stroke);
            }
            AnnotationKind::Highlight { points, stroke, opacity } => {
                let level = (opacity.clamp(0.0, 1.0) * 100.0).round() as u8;
                if level < 100 {
                    ops.push(Operation::new("gs", vec![Object::Name(opacity_state_name(level).into_bytes())]));
                    resources.opacity_states.insert(level);
                }
                polyline_ops(ops, points, stroke);
            }
            AnnotationKind::Rectangle { stroke } => {
                stroke_style_ops(ops, stroke);
                ops.push(Operation::new("re", reals(&[rect.x, rect.y, rect.width, rect.height])));
                ops.push(Operation::new("S", vec![]));
            }
            AnnotationKind::Circle { stroke } => {
                stroke_style_ops(ops, stroke);
                ellipse_ops(ops, &rect);
                ops.push(Operation::new("S", vec![]));
            }
            AnnotationKind::Checkmark { color } => mark_ops(ops, resources, &rect, *color, CHECK_GLYPH),
            AnnotationKind::Cross { color } => mark_ops(ops, resources, &rect, *color, CROSS_GLYPH),
        }

        ops.push(Operation::new("Q", vec![]));
        Ok(())
    }

    fn merge_resources(
        &mut self,
        document: &mut Document,
        dict: &mut Dictionary,
        resources: PageResources,
    ) -> Result<(), ExportError> {
        let mut page_resources = match dict.get(b"Resources") {
            Ok(object) => resolve(document, object).as_dict().cloned().unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };

        if !resources.fonts.is_empty() {
            let mut fonts = sub_dictionary(document, &page_resources, b"Font");
            for font in resources.fonts {
                let id = self.font(document, font);
                fonts.set(font.resource_name(), Object::Reference(id));
            }
            page_resources.set("Font", fonts);
        }

        if !resources.images.is_empty() {
            let mut xobjects = sub_dictionary(document, &page_resources, b"XObject");
            for (name, id) in resources.images {
                xobjects.set(name, Object::Reference(id));
            }
            page_resources.set("XObject", xobjects);
        }

        if !resources.opacity_states.is_empty() {
            let mut states = sub_dictionary(document, &page_resources, b"ExtGState");
            for level in resources.opacity_states {
                let id = *self.opacity_states.entry(level).or_insert_with(|| {
                    let alpha = f32::from(level) / 100.0;
                    document.add_object(dictionary! {
                        "Type" => "ExtGState",
                        "CA" => alpha,
                        "ca" => alpha,
                    })
                });
                states.set(opacity_state_name(level), Object::Reference(id));
            }
            page_resources.set("ExtGState", states);
        }

        dict.set("Resources", page_resources);

        if !resources.links.is_empty() {
            let mut annots = match dict.get(b"Annots") {
                Ok(object) => resolve(document, object).as_array().cloned().unwrap_or_default(),
                Err(_) => Vec::new(),
            };
            for link in resources.links {
                annots.push(Object::Reference(document.add_object(link)));
            }
            dict.set("Annots", annots);
        }
        Ok(())
    }
}

fn sub_dictionary(document: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|object| resolve(document, object).as_dict().ok())
        .cloned()
        .unwrap_or_default()
}

fn opacity_state_name(level: u8) -> String {
    format!("EdGs{level}")
}

/// Real rounded to three decimals so output does not carry float noise
fn real(value: f32) -> Object {
    let rounded = if value.is_finite() { (value * 1000.0).round() / 1000.0 } else { 0.0 };
    // normalizes -0.0
    Object::Real(if rounded == 0.0 { 0.0 } else { rounded })
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().copied().map(real).collect()
}

fn fill_color_op(color: Color) -> Operation {
    let (r, g, b, _) = color.to_normalized();
    Operation::new("rg", reals(&[r, g, b]))
}

fn fill_rect_ops(ops: &mut Vec<Operation>, rect: &Rect, color: Color) {
    ops.push(fill_color_op(color));
    ops.push(Operation::new("re", reals(&[rect.x, rect.y, rect.width, rect.height])));
    ops.push(Operation::new("f", vec![]));
}

fn stroke_style_ops(ops: &mut Vec<Operation>, stroke: &Stroke) {
    let (r, g, b, _) = stroke.color.to_normalized();
    ops.push(Operation::new("RG", reals(&[r, g, b])));
    ops.push(Operation::new("w", reals(&[stroke.width])));
    ops.push(Operation::new("J", vec![Object::Integer(1)]));
    ops.push(Operation::new("j", vec![Object::Integer(1)]));
}

fn polyline_ops(ops: &mut Vec<Operation>, points: &[PdfPoint], stroke: &Stroke) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    stroke_style_ops(ops, stroke);
    ops.push(Operation::new("m", reals(&[first.x, first.y])));
    for point in rest {
        ops.push(Operation::new("l", reals(&[point.x, point.y])));
    }
    ops.push(Operation::new("S", vec![]));
}

fn ellipse_ops(ops: &mut Vec<Operation>, rect: &Rect) {
    let center = rect.center();
    let (rx, ry) = (rect.width / 2.0, rect.height / 2.0);
    let (kx, ky) = (rx * KAPPA, ry * KAPPA);
    let (cx, cy) = (center.x, center.y);

    ops.push(Operation::new("m", reals(&[cx + rx, cy])));
    ops.push(Operation::new("c", reals(&[cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry])));
    ops.push(Operation::new("c", reals(&[cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy])));
    ops.push(Operation::new("c", reals(&[cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry])));
    ops.push(Operation::new("c", reals(&[cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy])));
    ops.push(Operation::new("h", vec![]));
}

fn encoded_string(text: &str, font: StandardFont) -> Object {
    let encoded = encode_win_ansi(text);
    if encoded.replaced > 0 {
        log::warn!(
            "{} character(s) cannot be encoded in {} and were replaced",
            encoded.replaced,
            font.base_name()
        );
    }
    Object::String(encoded.bytes, StringFormat::Hexadecimal)
}

/// Text lines stacked downward from a first baseline, using `orientation` for the glyph axes
fn text_lines_ops(
    ops: &mut Vec<Operation>,
    resources: &mut PageResources,
    text: &str,
    style: &TextStyle,
    orientation: [f32; 4],
    baseline: PdfPoint,
) {
    let font = StandardFont::select(style);
    resources.fonts.insert(font);

    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.resource_name().as_bytes().to_vec()), real(style.font_size)],
    ));
    ops.push(fill_color_op(style.color));
    let [a, b, c, d] = orientation;
    ops.push(Operation::new("Tm", reals(&[a, b, c, d, baseline.x, baseline.y])));
    ops.push(Operation::new("TL", reals(&[style.font_size * LINE_SPACING])));
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            ops.push(Operation::new("T*", vec![]));
        }
        ops.push(Operation::new("Tj", vec![encoded_string(line, font)]));
    }
    ops.push(Operation::new("ET", vec![]));
}

/// Free text whose first line hangs from the top of `rect`
fn text_block_ops(ops: &mut Vec<Operation>, resources: &mut PageResources, text: &str, style: &TextStyle, rect: &Rect) {
    if text.is_empty() {
        return;
    }
    let baseline = PdfPoint::new(rect.x, rect.top() - style.font_size);
    text_lines_ops(ops, resources, text, style, [1.0, 0.0, 0.0, 1.0], baseline);
}

/// Cover the original fragment, then draw its replacement on the same baseline
fn text_edit_ops(ops: &mut Vec<Operation>, resources: &mut PageResources, edit: &TextEdit) {
    // cover in the fragment's own text frame
    let pad = edit.height * TEXT_COVER_PADDING;
    let [a, b, c, d] = edit.transform.orientation();
    let origin = edit.position();
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("cm", reals(&[a, b, c, d, origin.x, origin.y])));
    fill_rect_ops(ops, &Rect::new(0.0, 0.0, edit.width, edit.height).expand(pad.min(1.0), pad), Color::WHITE);
    ops.push(Operation::new("Q", vec![]));

    if !edit.is_deleted() {
        text_lines_ops(ops, resources, &edit.new_text, &edit.style, edit.transform.orientation(), edit.position());
    }
}

fn mark_ops(ops: &mut Vec<Operation>, resources: &mut PageResources, rect: &Rect, color: Color, glyph: u8) {
    let font = StandardFont::ZapfDingbats;
    resources.fonts.insert(font);
    let size = rect.height.max(1.0);

    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.resource_name().as_bytes().to_vec()), real(size)],
    ));
    ops.push(fill_color_op(color));
    ops.push(Operation::new("Td", reals(&[rect.x, rect.y + size * 0.15])));
    ops.push(Operation::new("Tj", vec![Object::String(vec![glyph], StringFormat::Hexadecimal)]));
    ops.push(Operation::new("ET", vec![]));
}

fn link_annotation(url: &str, rect: &Rect, base: &PageGeometry) -> Dictionary {
    let x = rect.x + base.origin_x;
    let y = rect.y + base.origin_y;
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => reals(&[x, y, x + rect.width, y + rect.height]),
        "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
        "A" => dictionary! {
            "S" => "URI",
            "URI" => Object::string_literal(url),
        },
    }
}
