//! Raster image payloads turned into PDF image XObjects

use crate::error::ExportError;
use base64::Engine as _;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

/// Split a `data:` URL into its format and decoded bytes
pub fn parse_data_url(url: &str) -> Result<(ImageFormat, Vec<u8>), ExportError> {
    let (header, payload) = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| ExportError::InvalidImage("not a data URL".to_owned()))?;

    let mut parts = header.split(';');
    let mime = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let format = match mime.as_str() {
        "image/png" => ImageFormat::Png,
        "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
        _ => return Err(ExportError::UnsupportedImage(mime)),
    };
    if !parts.any(|part| part.trim().eq_ignore_ascii_case("base64")) {
        return Err(ExportError::InvalidImage("payload is not base64 encoded".to_owned()));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|err| ExportError::InvalidImage(err.to_string()))?;
    Ok((format, bytes))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Add the image behind `data_url` to `document` and return its XObject id
pub fn add_image_xobject(document: &mut Document, data_url: &str) -> Result<ObjectId, ExportError> {
    let (format, bytes) = parse_data_url(data_url)?;
    match format {
        ImageFormat::Png => add_png(document, &bytes),
        ImageFormat::Jpeg => add_jpeg(document, bytes),
    }
}

fn add_png(document: &mut Document, bytes: &[u8]) -> Result<ObjectId, ExportError> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|err| ExportError::InvalidImage(err.to_string()))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();

    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in decoded.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8i64,
        "Filter" => "FlateDecode",
    };

    if alpha.iter().any(|value| *value < u8::MAX) {
        let mask = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8i64,
            "Filter" => "FlateDecode",
        };
        let mask_id = document.add_object(Stream::new(mask, deflate(&alpha)?));
        dict.set("SMask", Object::Reference(mask_id));
    }

    Ok(document.add_object(Stream::new(dict, deflate(&rgb)?)))
}

/// Frame header of a baseline or progressive JPEG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegFrame {
    width: u16,
    height: u16,
    components: u8,
    bits: u8,
    /// Adobe APP14 segment present; its CMYK samples are stored inverted
    adobe: bool,
}

impl JpegFrame {
    fn color_space(&self) -> Result<&'static str, ExportError> {
        match self.components {
            1 => Ok("DeviceGray"),
            3 => Ok("DeviceRGB"),
            4 => Ok("DeviceCMYK"),
            other => Err(ExportError::InvalidImage(format!("unsupported JPEG component count {other}"))),
        }
    }
}

fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

/// Walk the marker segments up to the scan data
fn read_jpeg_frame(bytes: &[u8]) -> Result<JpegFrame, ExportError> {
    let invalid = |reason: &str| ExportError::InvalidImage(format!("JPEG {reason}"));
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return Err(invalid("is missing its start marker"));
    }

    let mut frame: Option<JpegFrame> = None;
    let mut adobe = false;
    let mut pos = 2;
    loop {
        if bytes.get(pos) != Some(&0xFF) {
            return Err(invalid("marker expected"));
        }
        while bytes.get(pos) == Some(&0xFF) {
            pos += 1;
        }
        let marker = *bytes.get(pos).ok_or_else(|| invalid("is truncated"))?;
        pos += 1;

        match marker {
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => break,
            _ => {}
        }

        let length = match bytes.get(pos..pos + 2) {
            Some(&[high, low]) => usize::from(u16::from_be_bytes([high, low])),
            _ => return Err(invalid("is truncated")),
        };
        let segment = length
            .checked_sub(2)
            .and_then(|body| bytes.get(pos + 2..pos + 2 + body))
            .ok_or_else(|| invalid("segment overruns the data"))?;

        if is_start_of_frame(marker) {
            let &[bits, h0, h1, w0, w1, components, ..] = segment else {
                return Err(invalid("frame header is too short"));
            };
            frame = Some(JpegFrame {
                width: u16::from_be_bytes([w0, w1]),
                height: u16::from_be_bytes([h0, h1]),
                components,
                bits,
                adobe: false,
            });
        } else if marker == 0xEE && segment.starts_with(b"Adobe") {
            adobe = true;
        }
        pos += 2 + segment.len();
    }

    let frame = frame.ok_or_else(|| invalid("has no frame header"))?;
    if frame.width == 0 || frame.height == 0 {
        return Err(invalid("has an empty frame"));
    }
    Ok(JpegFrame { adobe, ..frame })
}

fn add_jpeg(document: &mut Document, bytes: Vec<u8>) -> Result<ObjectId, ExportError> {
    let frame = read_jpeg_frame(&bytes)?;

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(frame.width),
        "Height" => i64::from(frame.height),
        "ColorSpace" => frame.color_space()?,
        "BitsPerComponent" => i64::from(frame.bits),
        "Filter" => "DCTDecode",
    };
    if frame.components == 4 && frame.adobe {
        dict.set("Decode", Object::Array([1, 0, 1, 0, 1, 0, 1, 0].into_iter().map(Object::Integer).collect()));
    }
    log::debug!(
        "embedding {}x{} JPEG with {} components",
        frame.width,
        frame.height,
        frame.components
    );

    // DCT data is embedded as-is
    let mut stream = Stream::new(dict, bytes);
    stream.allows_compression = false;
    Ok(document.add_object(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::png_data_url;

    #[test]
    fn parses_png_data_url() {
        let url = png_data_url(2, 3, [255, 0, 0, 255]).expect("png");
        let (format, bytes) = parse_data_url(&url).expect("parse");
        assert_eq!(format, ImageFormat::Png);
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn rejects_unsupported_mime_type() {
        let err = parse_data_url("data:image/gif;base64,R0lGODlh").expect_err("gif");
        assert!(matches!(err, ExportError::UnsupportedImage(mime) if mime == "image/gif"));
    }

    #[test]
    fn rejects_non_base64_and_malformed_urls() {
        assert!(matches!(
            parse_data_url("data:image/png,rawbytes"),
            Err(ExportError::InvalidImage(_))
        ));
        assert!(matches!(parse_data_url("https://example.com/a.png"), Err(ExportError::InvalidImage(_))));
        assert!(matches!(
            parse_data_url("data:image/png;base64,@@@"),
            Err(ExportError::InvalidImage(_))
        ));
    }

    #[test]
    fn opaque_png_has_no_soft_mask() {
        let mut document = Document::with_version("1.5");
        let url = png_data_url(4, 4, [10, 20, 30, 255]).expect("png");
        let id = add_image_xobject(&mut document, &url).expect("embed");

        let stream = document.get_object(id).and_then(Object::as_stream).expect("stream");
        assert_eq!(stream.dict.get(b"Width").and_then(Object::as_i64).expect("width"), 4);
        assert!(!stream.dict.has(b"SMask"));
    }

    #[test]
    fn translucent_png_gets_soft_mask() {
        let mut document = Document::with_version("1.5");
        let url = png_data_url(2, 2, [10, 20, 30, 128]).expect("png");
        let id = add_image_xobject(&mut document, &url).expect("embed");

        let stream = document.get_object(id).and_then(Object::as_stream).expect("stream");
        let mask = stream.dict.get(b"SMask").and_then(Object::as_reference).expect("mask ref");
        assert!(document.get_object(mask).is_ok());
    }

    fn jpeg_data_url(bytes: &[u8]) -> String {
        format!("data:image/jpeg;base64,{}", base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    /// Marker segments of a 3x2 JPEG: optional Adobe APP14, SOF0, then SOS/EOI
    fn jpeg_header(components: u8, adobe: bool) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        if adobe {
            bytes.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
            bytes.extend_from_slice(b"Adobe");
            bytes.extend_from_slice(&[0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x02]);
        }
        let length = 8 + 3 * u16::from(components);
        bytes.extend_from_slice(&[0xFF, 0xC0]);
        bytes.extend_from_slice(&length.to_be_bytes());
        bytes.extend_from_slice(&[8, 0x00, 0x02, 0x00, 0x03, components]);
        for id in 1..=components {
            bytes.extend_from_slice(&[id, 0x11, 0x00]);
        }
        bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9]);
        bytes
    }

    fn embedded(bytes: &[u8]) -> (Document, ObjectId) {
        let mut document = Document::with_version("1.5");
        let id = add_image_xobject(&mut document, &jpeg_data_url(bytes)).expect("embed");
        (document, id)
    }

    #[test]
    fn adobe_cmyk_jpeg_keeps_its_color_space() {
        let (document, id) = embedded(&jpeg_header(4, true));
        let stream = document.get_object(id).and_then(Object::as_stream).expect("stream");

        assert_eq!(stream.dict.get(b"ColorSpace").and_then(Object::as_name).expect("color space"), b"DeviceCMYK");
        assert_eq!(stream.dict.get(b"Width").and_then(Object::as_i64).expect("width"), 3);
        assert_eq!(stream.dict.get(b"Height").and_then(Object::as_i64).expect("height"), 2);
        let decode: Vec<i64> = stream
            .dict
            .get(b"Decode")
            .and_then(Object::as_array)
            .expect("decode")
            .iter()
            .filter_map(|value| value.as_i64().ok())
            .collect();
        assert_eq!(decode, vec![1, 0, 1, 0, 1, 0, 1, 0]);
        assert_eq!(stream.content, jpeg_header(4, true));
    }

    #[test]
    fn plain_cmyk_jpeg_is_not_inverted() {
        let (document, id) = embedded(&jpeg_header(4, false));
        let stream = document.get_object(id).and_then(Object::as_stream).expect("stream");
        assert_eq!(stream.dict.get(b"ColorSpace").and_then(Object::as_name).expect("color space"), b"DeviceCMYK");
        assert!(!stream.dict.has(b"Decode"));
    }

    #[test]
    fn encoded_jpegs_map_components_to_color_spaces() {
        let mut rgb = Vec::new();
        image::codecs::jpeg::JpegEncoder::new(&mut rgb)
            .encode(&[200u8; 4 * 4 * 3], 4, 4, image::ExtendedColorType::Rgb8)
            .expect("encode rgb");
        let mut gray = Vec::new();
        image::codecs::jpeg::JpegEncoder::new(&mut gray)
            .encode(&[90u8; 4 * 4], 4, 4, image::ExtendedColorType::L8)
            .expect("encode gray");

        for (bytes, expected) in [(rgb, b"DeviceRGB".as_slice()), (gray, b"DeviceGray".as_slice())] {
            let (document, id) = embedded(&bytes);
            let stream = document.get_object(id).and_then(Object::as_stream).expect("stream");
            assert_eq!(stream.dict.get(b"ColorSpace").and_then(Object::as_name).expect("color space"), expected);
            assert_eq!(stream.dict.get(b"Width").and_then(Object::as_i64).expect("width"), 4);
        }
    }

    #[test]
    fn truncated_jpeg_is_rejected() {
        let mut bytes = jpeg_header(3, false);
        bytes.truncate(8);
        let mut document = Document::with_version("1.5");
        assert!(matches!(add_image_xobject(&mut document, &jpeg_data_url(&bytes)), Err(ExportError::InvalidImage(_))));
        assert!(matches!(
            add_image_xobject(&mut document, &jpeg_data_url(b"not a jpeg")),
            Err(ExportError::InvalidImage(_))
        ));
    }
}
