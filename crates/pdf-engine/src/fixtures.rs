//! Small in-memory PDFs for tests
//!
//! Pages carry base-14 text drawn with `Tj` so extraction and serialization
//! can be exercised without binary fixture files.

use base64::Engine as _;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::io::Cursor;

/// A run of text drawn at a fixed baseline origin
#[derive(Debug, Clone)]
pub struct FixtureText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub font: String,
}

#[derive(Debug, Clone)]
pub struct FixturePage {
    media_box: Option<[f32; 4]>,
    rotate: i64,
    texts: Vec<FixtureText>,
    raw_content: Option<Vec<u8>>,
}

impl FixturePage {
    pub fn new(width: f32, height: f32) -> Self {
        Self { media_box: Some([0.0, 0.0, width, height]), rotate: 0, texts: Vec::new(), raw_content: None }
    }

    /// Page without its own MediaBox
    pub fn inheriting() -> Self {
        Self { media_box: None, rotate: 0, texts: Vec::new(), raw_content: None }
    }

    pub fn rotated(mut self, degrees: i64) -> Self {
        self.rotate = degrees;
        self
    }

    pub fn with_origin(mut self, x: f32, y: f32) -> Self {
        if let Some([x0, y0, x1, y1]) = self.media_box {
            self.media_box = Some([x, y, x + (x1 - x0), y + (y1 - y0)]);
        }
        self
    }

    pub fn text(self, text: &str, x: f32, y: f32, size: f32) -> Self {
        self.text_in_font(text, x, y, size, "Helvetica")
    }

    pub fn text_in_font(mut self, text: &str, x: f32, y: f32, size: f32, font: &str) -> Self {
        self.texts.push(FixtureText { text: text.to_string(), x, y, size, font: font.to_string() });
        self
    }

    /// Use `content` verbatim as the page's content stream; fonts are still declared
    pub fn raw_content(mut self, content: &[u8]) -> Self {
        self.raw_content = Some(content.to_vec());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfBuilder {
    pages: Vec<FixturePage>,
    inherited_media_box: Option<[f32; 4]>,
    with_outline: bool,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: FixturePage) -> Self {
        self.pages.push(page);
        self
    }

    /// MediaBox set on the page tree root instead of each page
    pub fn inherit_media_box(mut self, width: f32, height: f32) -> Self {
        self.inherited_media_box = Some([0.0, 0.0, width, height]);
        self
    }

    /// Adds a one-entry outline pointing at the first page
    pub fn with_outline(mut self) -> Self {
        self.with_outline = true;
        self
    }

    pub fn build(&self) -> lopdf::Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        let mut font_names: Vec<String> = Vec::new();
        for text in self.pages.iter().flat_map(|page| &page.texts) {
            if !font_names.contains(&text.font) {
                font_names.push(text.font.clone());
            }
        }
        if font_names.is_empty() {
            font_names.push("Helvetica".to_string());
        }
        for (index, name) in font_names.iter().enumerate() {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => Object::Name(name.as_bytes().to_vec()),
            });
            fonts.set(format!("F{}", index + 1), font_id);
        }
        let resources_id = doc.add_object(dictionary! { "Font" => fonts });

        let mut kids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let content = match &page.raw_content {
                Some(raw) => raw.clone(),
                None => text_content(&page.texts, &font_names).encode()?,
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));

            let mut dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            };
            if let Some(media_box) = page.media_box {
                dict.set("MediaBox", media_box.iter().map(|v| Object::Real(*v)).collect::<Vec<_>>());
            }
            if page.rotate != 0 {
                dict.set("Rotate", page.rotate);
            }
            kids.push(Object::Reference(doc.add_object(dict)));
        }

        let first_page = kids.first().cloned();
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        };
        if let Some(media_box) = self.inherited_media_box {
            pages.set("MediaBox", media_box.iter().map(|v| Object::Real(*v)).collect::<Vec<_>>());
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if let (true, Some(first_page)) = (self.with_outline, first_page) {
            let outlines_id = doc.new_object_id();
            let item_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal("Start"),
                "Parent" => outlines_id,
                "Dest" => vec![first_page, "Fit".into()],
            });
            doc.objects.insert(
                outlines_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Outlines",
                    "First" => item_id,
                    "Last" => item_id,
                    "Count" => 1i64,
                }),
            );
            catalog.set("Outlines", outlines_id);
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

fn text_content(texts: &[FixtureText], font_names: &[String]) -> Content {
    let mut operations = Vec::new();
    for text in texts {
        let font_index = font_names.iter().position(|name| *name == text.font).unwrap_or(0);
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(format!("F{}", font_index + 1).into_bytes()), text.size.into()],
        ));
        operations.push(Operation::new("Td", vec![text.x.into(), text.y.into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(text.text.as_str())]));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

/// Solid-color PNG encoded as a `data:` URL
pub fn png_data_url(width: u32, height: u32, rgba: [u8; 4]) -> image::ImageResult<String> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, image::ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png.into_inner())
    ))
}
