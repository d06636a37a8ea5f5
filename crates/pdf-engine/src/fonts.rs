//! Standard font selection and WinAnsi text encoding

use doc_model::TextStyle;

/// Families offered by the style editor, in cycling order
pub const FONT_FAMILIES: [&str; 3] = ["Helvetica", "Times", "Courier"];

/// Base-14 fonts the serializer can reference without embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    ZapfDingbats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Helvetica,
    Times,
    Courier,
}

impl Family {
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "helvetica" | "helv" | "arial" | "sans" | "sans-serif" => Some(Self::Helvetica),
            "times" | "times-roman" | "times new roman" | "serif" | "georgia" => Some(Self::Times),
            "courier" | "courier new" | "mono" | "monospace" => Some(Self::Courier),
            _ => None,
        }
    }
}

impl StandardFont {
    /// Variant for a text style; unknown families fall back to regular Helvetica
    pub fn select(style: &TextStyle) -> Self {
        let Some(family) = Family::parse(&style.font_family) else {
            return Self::Helvetica;
        };
        match (family, style.bold, style.italic) {
            (Family::Helvetica, false, false) => Self::Helvetica,
            (Family::Helvetica, true, false) => Self::HelveticaBold,
            (Family::Helvetica, false, true) => Self::HelveticaOblique,
            (Family::Helvetica, true, true) => Self::HelveticaBoldOblique,
            (Family::Times, false, false) => Self::TimesRoman,
            (Family::Times, true, false) => Self::TimesBold,
            (Family::Times, false, true) => Self::TimesItalic,
            (Family::Times, true, true) => Self::TimesBoldItalic,
            (Family::Courier, false, false) => Self::Courier,
            (Family::Courier, true, false) => Self::CourierBold,
            (Family::Courier, false, true) => Self::CourierOblique,
            (Family::Courier, true, true) => Self::CourierBoldOblique,
        }
    }

    pub fn base_name(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
            Self::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Resource name used in page `/Font` dictionaries
    pub fn resource_name(self) -> &'static str {
        match self {
            Self::Helvetica => "EdHelv",
            Self::HelveticaBold => "EdHelvB",
            Self::HelveticaOblique => "EdHelvI",
            Self::HelveticaBoldOblique => "EdHelvBI",
            Self::TimesRoman => "EdTimes",
            Self::TimesBold => "EdTimesB",
            Self::TimesItalic => "EdTimesI",
            Self::TimesBoldItalic => "EdTimesBI",
            Self::Courier => "EdCour",
            Self::CourierBold => "EdCourB",
            Self::CourierOblique => "EdCourI",
            Self::CourierBoldOblique => "EdCourBI",
            Self::ZapfDingbats => "EdZapf",
        }
    }

    /// Symbol fonts use their built-in encoding
    pub fn uses_win_ansi(self) -> bool {
        self != Self::ZapfDingbats
    }
}

/// Code points 0x80..=0x9F of WinAnsiEncoding; `None` marks unused slots
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// Encoded bytes plus the number of characters replaced by `?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub bytes: Vec<u8>,
    pub replaced: usize,
}

pub fn encode_win_ansi(text: &str) -> EncodedText {
    let mut bytes = Vec::with_capacity(text.len());
    let mut replaced = 0;

    for ch in text.chars() {
        let byte = match ch {
            '\t' => Some(b' '),
            ' '..='~' => Some(ch as u8),
            '\u{A0}'..='\u{FF}' => Some(ch as u32 as u8),
            _ => WIN_ANSI_HIGH
                .iter()
                .position(|slot| *slot == Some(ch))
                .map(|offset| 0x80 + offset as u8),
        };
        match byte {
            Some(byte) => bytes.push(byte),
            None => {
                bytes.push(b'?');
                replaced += 1;
            }
        }
    }

    EncodedText { bytes, replaced }
}

/// Best-effort decoding of a single-byte string code
pub fn decode_win_ansi(byte: u8) -> char {
    match byte {
        0x80..=0x9F => WIN_ANSI_HIGH[(byte - 0x80) as usize].unwrap_or('\u{FFFD}'),
        _ => byte as char,
    }
}
