//! Text fragment extraction from page content streams
//!
//! Tracks the graphics and text state closely enough to place each shown
//! string. Glyph widths are not read from font programs; advances use an
//! average glyph width, which is adequate for hit-testing and search boxes.

use crate::fonts::decode_win_ansi;
use crate::source::{page_resources, resolve, SourceDocument, SourcePage};
use doc_model::{FragmentId, TextFragment, TextTransform};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::collections::HashMap;

/// Average advance of a glyph, in text space units per unit of font size
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// `TJ` adjustments (thousandths of an em) wider than this read as a space
const TJ_SPACE_THRESHOLD: f32 = 250.0;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Produces the text fragments of one source page
pub trait TextExtractor {
    fn extract(&self, source: &SourceDocument, page_index: usize) -> Vec<TextFragment>;
}

/// Default extractor that interprets the page's content stream operators
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentStreamExtractor;

impl TextExtractor for ContentStreamExtractor {
    fn extract(&self, source: &SourceDocument, page_index: usize) -> Vec<TextFragment> {
        let Some(page) = source.page(page_index) else {
            return Vec::new();
        };
        extract_page(source.document(), page, page_index as u32)
    }
}

/// Fragments already produced elsewhere, indexed by source page
#[derive(Debug, Default, Clone)]
pub struct PrecomputedFragments(pub Vec<Vec<TextFragment>>);

impl TextExtractor for PrecomputedFragments {
    fn extract(&self, _source: &SourceDocument, page_index: usize) -> Vec<TextFragment> {
        self.0.get(page_index).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct FontInfo {
    base_name: Option<String>,
    composite: bool,
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<FontInfo>,
    font_size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 0.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
        }
    }
}

fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

fn number(operands: &[Object], index: usize) -> Option<f32> {
    operands.get(index)?.as_float().ok()
}

fn matrix(operands: &[Object]) -> Option<Matrix> {
    let mut m = IDENTITY;
    for (index, value) in m.iter_mut().enumerate() {
        *value = number(operands, index)?;
    }
    Some(m)
}

fn page_fonts(document: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, FontInfo> {
    let mut fonts = HashMap::new();
    let Some(font_dict) = page_resources(document, page_id)
        .and_then(|resources| resources.get(b"Font").ok())
        .and_then(|object| resolve(document, object).as_dict().ok())
    else {
        return fonts;
    };

    for (key, value) in font_dict.iter() {
        let Ok(font) = resolve(document, value).as_dict() else {
            continue;
        };
        let base_name = font
            .get(b"BaseFont")
            .and_then(Object::as_name)
            .ok()
            .map(|name| String::from_utf8_lossy(name).into_owned());
        let composite = font.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Type0".as_slice());
        fonts.insert(key.clone(), FontInfo { base_name, composite });
    }
    fonts
}

struct PageScanner {
    source_page: u32,
    fonts: HashMap<Vec<u8>, FontInfo>,
    ctm: Matrix,
    text_matrix: Matrix,
    line_matrix: Matrix,
    state: TextState,
    saved: Vec<(Matrix, TextState)>,
    fragments: Vec<TextFragment>,
}

impl PageScanner {
    fn new(source_page: u32, fonts: HashMap<Vec<u8>, FontInfo>, ctm: Matrix) -> Self {
        Self {
            source_page,
            fonts,
            ctm,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            state: TextState::default(),
            saved: Vec::new(),
            fragments: Vec::new(),
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&translation(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.state.leading);
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.saved.push((self.ctm, self.state.clone())),
            "Q" => {
                if let Some((ctm, state)) = self.saved.pop() {
                    self.ctm = ctm;
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = matrix(operands) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }
            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Tf" => {
                let key = operands.first().and_then(|object| object.as_name().ok());
                self.state.font = key.and_then(|key| self.fonts.get(key)).cloned();
                if let Some(size) = number(operands, 1) {
                    self.state.font_size = size;
                }
            }
            "TL" => self.state.leading = number(operands, 0).unwrap_or(self.state.leading),
            "Tc" => self.state.char_spacing = number(operands, 0).unwrap_or(0.0),
            "Tw" => self.state.word_spacing = number(operands, 0).unwrap_or(0.0),
            "Tz" => self.state.horizontal_scale = number(operands, 0).unwrap_or(100.0) / 100.0,
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                    if operator == "TD" {
                        self.state.leading = -ty;
                    }
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = matrix(operands) {
                    self.line_matrix = m;
                    self.text_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => self.show(operands.get(..1).unwrap_or_default()),
            "TJ" => {
                if let Some(Ok(parts)) = operands.first().map(Object::as_array) {
                    self.show(parts);
                }
            }
            "'" => {
                self.next_line();
                self.show(operands.get(..1).unwrap_or_default());
            }
            "\"" => {
                self.state.word_spacing = number(operands, 0).unwrap_or(self.state.word_spacing);
                self.state.char_spacing = number(operands, 1).unwrap_or(self.state.char_spacing);
                self.next_line();
                self.show(operands.get(2..3).unwrap_or_default());
            }
            _ => {}
        }
    }

    fn show(&mut self, parts: &[Object]) {
        let font_size = self.state.font_size;
        let scale = self.state.horizontal_scale;
        let start = self.text_matrix;
        let mut text = String::new();
        let mut advance = 0.0f32;

        for part in parts {
            match part {
                Object::String(bytes, _) => {
                    for &byte in bytes {
                        text.push(decode_win_ansi(byte));
                        let mut glyph = AVG_GLYPH_WIDTH * font_size + self.state.char_spacing;
                        if byte == b' ' {
                            glyph += self.state.word_spacing;
                        }
                        advance += glyph * scale;
                    }
                }
                Object::Integer(_) | Object::Real(_) => {
                    let adjustment = part.as_float().unwrap_or(0.0);
                    advance -= adjustment / 1000.0 * font_size * scale;
                    if adjustment < -TJ_SPACE_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
                _ => {}
            }
        }

        self.text_matrix = multiply(&translation(advance, 0.0), &self.text_matrix);

        let composite = self.state.font.as_ref().is_some_and(|font| font.composite);
        if composite {
            log::debug!("skipping text shown with a composite font on page {}", self.source_page);
            return;
        }
        if text.trim().is_empty() || font_size == 0.0 {
            return;
        }

        let user = multiply(&start, &self.ctm);
        let rendering = multiply(&[font_size, 0.0, 0.0, font_size, 0.0, 0.0], &user);
        let width = advance * user[0].hypot(user[1]);

        let id = FragmentId::new(self.source_page, self.fragments.len() as u32);
        let mut fragment = TextFragment::new(id, text, TextTransform(rendering), width.abs());
        fragment.font_name = self.state.font.as_ref().and_then(|font| font.base_name.clone());
        self.fragments.push(fragment);
    }
}

/// Extract the fragments of one page, relative to its media box origin
///
/// Unreadable content yields no fragments.
pub fn extract_page(document: &Document, page: &SourcePage, source_page: u32) -> Vec<TextFragment> {
    let page_id = page.object_id;
    let content = match document.get_page_content(page_id).and_then(|bytes| Content::decode(&bytes)) {
        Ok(content) => content,
        Err(err) => {
            log::warn!("cannot read content stream of page {source_page}: {err}");
            return Vec::new();
        }
    };

    let origin = translation(-page.geometry.origin_x, -page.geometry.origin_y);
    let mut scanner = PageScanner::new(source_page, page_fonts(document, page_id), origin);
    for operation in &content.operations {
        scanner.apply(&operation.operator, &operation.operands);
    }
    scanner.fragments
}
