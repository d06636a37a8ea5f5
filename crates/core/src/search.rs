//! Case-insensitive search over page text, and match replacement

use crate::overlay::overlay_items;
use doc_model::{Annotation, AnnotationKind, FragmentId, Page, Rect, TextFragment, TextStyle};
use serde::{Deserialize, Serialize};

/// Approximate advance of a replacement glyph, as a share of the font size
const REPLACEMENT_GLYPH_WIDTH: f32 = 0.5;

/// One occurrence of the search term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Output page index
    pub page: usize,
    pub fragment: FragmentId,
    /// Matched text as it appears on the page
    pub text: String,
    /// Character offset within the fragment
    pub offset: usize,
    /// Approximate box, assuming every character has the same width
    pub bbox: Rect,
}

fn chars_match(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Character offsets of non-overlapping, case-insensitive occurrences of `term`
pub fn find_occurrences(haystack: &str, term: &str) -> Vec<usize> {
    let haystack: Vec<char> = haystack.chars().collect();
    let needle: Vec<char> = term.chars().collect();
    let mut offsets = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return offsets;
    }

    let mut start = 0;
    while start + needle.len() <= haystack.len() {
        let window = &haystack[start..start + needle.len()];
        if window.iter().zip(&needle).all(|(a, b)| chars_match(*a, *b)) {
            offsets.push(start);
            start += needle.len();
        } else {
            start += 1;
        }
    }
    offsets
}

/// Matches on one page, skipping any hidden under a whiteout
pub fn search_page(page_index: usize, page: &Page, fragments: &[TextFragment], term: &str) -> Vec<SearchMatch> {
    let whiteouts: Vec<Rect> = page
        .annotations
        .iter()
        .filter(|annotation| matches!(annotation.kind, AnnotationKind::Whiteout))
        .map(|annotation| annotation.rect)
        .collect();

    let mut matches = Vec::new();
    for item in overlay_items(page, fragments) {
        let text = item.text();
        let offsets = find_occurrences(text, term);
        if offsets.is_empty() {
            continue;
        }

        let chars: Vec<char> = text.chars().collect();
        let term_len = term.chars().count();

        for offset in offsets {
            let match_box = item.span_bbox(offset, term_len);
            if whiteouts.iter().any(|cover| cover.contains_rect(&match_box)) {
                continue;
            }
            matches.push(SearchMatch {
                page: page_index,
                fragment: item.id(),
                text: chars[offset..offset + term_len].iter().collect(),
                offset,
                bbox: match_box,
            });
        }
    }
    matches
}

/// Whiteout over the match followed by the replacement text on the same baseline
pub fn replacement_annotations(
    found: &SearchMatch,
    replacement: &str,
    mut style: TextStyle,
    padding: f32,
) -> [Annotation; 2] {
    let cover = Annotation::new(found.bbox.expand(padding, padding), AnnotationKind::Whiteout);

    style.font_size = found.bbox.height;
    let estimated = replacement.chars().count() as f32 * REPLACEMENT_GLYPH_WIDTH * style.font_size;
    let rect = Rect::new(found.bbox.x, found.bbox.y, found.bbox.width.max(estimated), found.bbox.height);
    let text = Annotation::new(rect, AnnotationKind::Text { content: replacement.to_string(), style });

    [cover, text]
}

/// Live search results and the cursor over them
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    query: String,
    matches: Vec<SearchMatch>,
    cursor: Option<usize>,
}

impl SearchState {
    pub fn set_results(&mut self, query: &str, matches: Vec<SearchMatch>) {
        self.query = query.to_string();
        self.cursor = if matches.is_empty() { None } else { Some(0) };
        self.matches = matches;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&SearchMatch> {
        self.matches.get(self.cursor?)
    }

    /// Advance the cursor, wrapping past the last match
    pub fn next(&mut self) -> Option<&SearchMatch> {
        let len = self.matches.len();
        self.cursor = self.cursor.map(|cursor| (cursor + 1) % len.max(1));
        self.current()
    }

    /// Move the cursor back, wrapping before the first match
    pub fn previous(&mut self) -> Option<&SearchMatch> {
        let len = self.matches.len();
        self.cursor = self.cursor.map(|cursor| (cursor + len.max(1) - 1) % len.max(1));
        self.current()
    }

    /// Drop one match; the cursor keeps pointing at the same match, or the one after a removed current
    pub fn remove(&mut self, index: usize) -> Option<SearchMatch> {
        if index >= self.matches.len() {
            return None;
        }
        let removed = self.matches.remove(index);
        self.cursor = match self.matches.len() {
            0 => None,
            len => self.cursor.map(|cursor| {
                let cursor = if index < cursor { cursor - 1 } else { cursor };
                cursor.min(len - 1)
            }),
        };
        Some(removed)
    }

    /// Take every match, leaving the query in place
    pub fn take_all(&mut self) -> Vec<SearchMatch> {
        self.cursor = None;
        std::mem::take(&mut self.matches)
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{PdfPoint, TextEdit, TextTransform};

    fn fragment(index: u32, text: &str, y: f32) -> TextFragment {
        let width = text.chars().count() as f32 * 5.0;
        TextFragment::new(
            FragmentId::new(0, index),
            text,
            TextTransform::upright(PdfPoint::new(100.0, y), 10.0),
            width,
        )
    }

    #[test]
    fn occurrences_are_case_insensitive_and_non_overlapping() {
        assert_eq!(find_occurrences("PDF pdf PdF", "pdf"), vec![0, 4, 8]);
        assert_eq!(find_occurrences("aaaa", "aa"), vec![0, 2]);
        assert!(find_occurrences("abc", "").is_empty());
        assert!(find_occurrences("ab", "abc").is_empty());
        assert_eq!(find_occurrences("ÉCOLE école", "école"), vec![0, 6]);
    }

    #[test]
    fn match_boxes_split_width_evenly() {
        let fragments = vec![fragment(0, "the PDF file", 700.0)];
        let matches = search_page(2, &Page::blank(), &fragments, "pdf");

        assert_eq!(matches.len(), 1);
        let found = &matches[0];
        assert_eq!(found.page, 2);
        assert_eq!(found.text, "PDF");
        assert_eq!(found.offset, 4);
        assert_eq!(found.bbox, Rect::new(120.0, 700.0, 15.0, 10.0));
    }

    #[test]
    fn edited_fragments_are_searched_by_their_new_text() {
        let fragments = vec![fragment(0, "old words", 700.0)];
        let mut page = Page::blank();
        let mut edit = TextEdit::from_fragment(&fragments[0]);
        edit.new_text = "new PDF words".to_string();
        page.text_edits.insert(edit.id, edit);

        assert!(search_page(0, &page, &fragments, "old").is_empty());
        assert_eq!(search_page(0, &page, &fragments, "pdf").len(), 1);
    }

    #[test]
    fn matches_under_a_whiteout_are_skipped() {
        let fragments = vec![fragment(0, "PDF", 700.0), fragment(1, "PDF", 600.0)];
        let mut page = Page::blank();
        page.annotations.push(Annotation::new(Rect::new(90.0, 690.0, 40.0, 30.0), AnnotationKind::Whiteout));

        let matches = search_page(0, &page, &fragments, "pdf");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].fragment, FragmentId::new(0, 1));
    }

    #[test]
    fn replacement_covers_match_and_keeps_baseline() {
        let found = SearchMatch {
            page: 0,
            fragment: FragmentId::new(0, 0),
            text: "PDF".to_string(),
            offset: 0,
            bbox: Rect::new(100.0, 700.0, 15.0, 10.0),
        };

        let [cover, text] = replacement_annotations(&found, "DOCUMENT", TextStyle::default(), 1.5);
        assert!(cover.rect.contains_rect(&found.bbox));
        assert_eq!((text.rect.x, text.rect.y), (100.0, 700.0));
        assert_eq!(text.text(), Some("DOCUMENT"));
        assert_eq!(text.text_style().map(|s| s.font_size), Some(10.0));
        assert_eq!(text.rect.width, 40.0);
    }

    #[test]
    fn cursor_wraps_and_clamps() {
        let found = |offset| SearchMatch {
            page: 0,
            fragment: FragmentId::new(0, 0),
            text: "x".to_string(),
            offset,
            bbox: Rect::default(),
        };
        let mut state = SearchState::default();
        state.set_results("x", vec![found(0), found(1), found(2)]);

        assert_eq!(state.previous().map(|m| m.offset), Some(2));
        assert_eq!(state.next().map(|m| m.offset), Some(0));
        state.previous();
        state.remove(2);
        assert_eq!(state.cursor(), Some(1));
        state.remove(0);
        state.remove(0);
        assert_eq!(state.cursor(), None);
        assert!(state.next().is_none());
    }

    #[test]
    fn removing_an_earlier_match_keeps_the_current_one() {
        let found = |offset| SearchMatch {
            page: 0,
            fragment: FragmentId::new(0, 0),
            text: "x".to_string(),
            offset,
            bbox: Rect::default(),
        };
        let mut state = SearchState::default();
        state.set_results("x", vec![found(0), found(1), found(2), found(3)]);
        state.next();
        state.next();
        assert_eq!(state.current().map(|m| m.offset), Some(2));

        state.remove(0);
        assert_eq!(state.current().map(|m| m.offset), Some(2));
        state.remove(1);
        assert_eq!(state.current().map(|m| m.offset), Some(3));
    }

    #[test]
    fn vertical_matches_are_boxed_along_the_baseline() {
        let vertical = TextFragment::new(
            FragmentId::new(0, 0),
            "the PDF file",
            TextTransform([0.0, 10.0, -10.0, 0.0, 100.0, 100.0]),
            60.0,
        );
        let matches = search_page(0, &Page::blank(), &[vertical], "pdf");

        assert_eq!(matches[0].bbox, Rect::new(90.0, 120.0, 10.0, 15.0));
    }
}
