//! The editing session: one object owning the page model and all editor state
//!
//! Every authoring path goes through here: pointer events run the tool state
//! machine, style actions mutate the selected element, and commit points push
//! a deep copy of the page list onto the history. Nothing in this module
//! renders or touches the screen.

use crate::config::EditorConfig;
use crate::error::{EditorError, SaveError};
use crate::history::History;
use crate::interaction::{self, InteractionState, PendingImage, PointerEvent};
use crate::overlay::{self, OverlayItem};
use crate::search::{self, SearchMatch, SearchState};
use crate::selection::{self, ElementId, Selection, StyleAction};
use crate::task::{ignore_progress, CancellationToken, Progress, ProgressCallback};
use crate::tool::{Gesture, Tool};
use doc_model::{
    AnnotationId, AnnotationKind, FragmentId, Page, PageSource, PageTransform, PdfPoint, Rect, Rotation,
    TextFragment, TextStyle,
};
use pdf_engine::{export_document, ContentStreamExtractor, LoadError, SourceDocument, TextExtractor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Headless editing session over one source document
#[derive(Debug)]
pub struct EditorSession {
    source: Arc<SourceDocument>,
    /// Extracted fragments, indexed by source page
    fragments: Vec<Vec<TextFragment>>,
    pages: Vec<Page>,
    config: EditorConfig,
    tool: Tool,
    interaction: InteractionState,
    selection: Option<Selection>,
    /// Style changes made since the selection was last committed
    style_dirty: bool,
    history: History<Vec<Page>>,
    search: SearchState,
    pending_image: Option<PendingImage>,
    pending_link_url: Option<String>,
    scroll: (f32, f32),
    saving: Arc<AtomicBool>,
}

impl EditorSession {
    /// Open `bytes` with the built-in text extractor
    pub fn open(bytes: &[u8], config: EditorConfig) -> Result<Self, LoadError> {
        Self::open_with(bytes, config, &ContentStreamExtractor, &mut ignore_progress, &CancellationToken::new())
    }

    pub fn open_with(
        bytes: &[u8],
        config: EditorConfig,
        extractor: &dyn TextExtractor,
        progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> Result<Self, LoadError> {
        let source = SourceDocument::load(bytes)?;
        Self::from_source(Arc::new(source), config, extractor, progress, cancel)
    }

    /// Build a session over an already loaded source, extracting text page by page
    pub fn from_source(
        source: Arc<SourceDocument>,
        config: EditorConfig,
        extractor: &dyn TextExtractor,
        progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> Result<Self, LoadError> {
        let total = source.page_count();
        let mut fragments = Vec::with_capacity(total);
        for index in 0..total {
            if cancel.is_cancelled() {
                log::debug!("load cancelled after {index} of {total} pages");
                return Err(LoadError::Cancelled);
            }
            fragments.push(extractor.extract(&source, index));
            progress(Progress::new(index + 1, total));
        }

        let pages: Vec<Page> = source
            .pages()
            .iter()
            .enumerate()
            .map(|(index, page)| Page::from_source(index, page.geometry))
            .collect();

        log::info!(
            "opened document: {} pages, {} text fragments",
            pages.len(),
            fragments.iter().map(Vec::len).sum::<usize>()
        );

        Ok(Self {
            history: History::with_capacity(pages.clone(), config.history_capacity),
            source,
            fragments,
            pages,
            config,
            tool: Tool::default(),
            interaction: InteractionState::default(),
            selection: None,
            style_dirty: false,
            search: SearchState::default(),
            pending_image: None,
            pending_link_url: None,
            scroll: (0.0, 0.0),
            saving: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn source(&self) -> &SourceDocument {
        &self.source
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Result<&Page, EditorError> {
        self.pages.get(index).ok_or(EditorError::PageOutOfRange { page: index, page_count: self.pages.len() })
    }

    fn page_mut(&mut self, index: usize) -> Result<&mut Page, EditorError> {
        let page_count = self.pages.len();
        self.pages.get_mut(index).ok_or(EditorError::PageOutOfRange { page: index, page_count })
    }

    fn fragments_of(&self, page: &Page) -> &[TextFragment] {
        match page.source {
            PageSource::Source(index) => self.fragments.get(index).map(Vec::as_slice).unwrap_or_default(),
            PageSource::Blank => &[],
        }
    }

    /// Source text fragments behind an output page
    pub fn fragments(&self, page: usize) -> Result<&[TextFragment], EditorError> {
        Ok(self.fragments_of(self.page(page)?))
    }

    /// Text regions of a page with edits shown in place of their originals
    pub fn overlay(&self, page: usize) -> Result<Vec<OverlayItem<'_>>, EditorError> {
        let page = self.page(page)?;
        Ok(overlay::overlay_items(page, self.fragments_of(page)))
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Replace the configuration; applies to elements created from now on
    pub fn set_config(&mut self, config: EditorConfig) {
        self.config = config;
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools, ending any open edit session and abandoning any gesture
    pub fn set_tool(&mut self, tool: Tool) {
        self.finish_pending();
        self.interaction = InteractionState::Idle;
        self.tool = tool;
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn scroll_offset(&self) -> (f32, f32) {
        self.scroll
    }

    pub fn set_scroll_offset(&mut self, x: f32, y: f32) {
        self.scroll = (x, y);
    }

    /// Image placed by the next image-tool click
    pub fn set_pending_image(&mut self, image: Option<PendingImage>) {
        self.pending_image = image;
    }

    pub fn pending_image(&self) -> Option<&PendingImage> {
        self.pending_image.as_ref()
    }

    /// URL given to the next link region
    pub fn set_pending_link_url(&mut self, url: Option<String>) {
        self.pending_link_url = url;
    }

    pub fn history_index(&self) -> usize {
        self.history.index()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn set_zoom(&mut self, page: usize, zoom: f32) -> Result<(), EditorError> {
        self.page_mut(page)?.view_zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
        Ok(())
    }

    pub fn set_zoom_all(&mut self, zoom: f32) {
        let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
        for page in &mut self.pages {
            page.view_zoom = zoom;
        }
    }

    pub fn page_transform(&self, page: usize) -> Result<PageTransform, EditorError> {
        Ok(self.page(page)?.transform())
    }

    fn to_pdf(&self, event: &PointerEvent) -> Result<PdfPoint, EditorError> {
        Ok(self.page(event.page)?.transform().view_to_pdf(event.position))
    }

    fn commit(&mut self) {
        self.history.commit(&self.pages);
    }

    fn commit_if_changed(&mut self) -> bool {
        if *self.history.current() == self.pages {
            return false;
        }
        self.commit();
        true
    }

    /// End the inline text session, committing its result
    pub fn commit_text(&mut self) {
        let Some((page_index, element)) = self.interaction.editing() else {
            return;
        };
        self.interaction = InteractionState::Idle;

        if let Some(page) = self.pages.get_mut(page_index) {
            match element {
                ElementId::TextEdit(id) => {
                    if let Err(err) = overlay::close_edit(page, id) {
                        log::warn!("closing text edit: {err}");
                    }
                }
                ElementId::Annotation(id) => {
                    let emptied = page
                        .annotation(id)
                        .is_some_and(|a| matches!(&a.kind, AnnotationKind::Text { content, .. } if content.is_empty()));
                    if emptied {
                        page.remove_annotation(id);
                        if self.selection.is_some_and(|s| s.element == element) {
                            self.selection = None;
                        }
                    }
                }
            }
        }

        if self.commit_if_changed() {
            log::debug!("committed text edit on page {page_index}");
        }
    }

    fn commit_style(&mut self) {
        if std::mem::take(&mut self.style_dirty) && self.commit_if_changed() {
            log::debug!("committed style changes");
        }
    }

    /// Close the open text session and flush pending style changes
    fn finish_pending(&mut self) {
        self.commit_text();
        self.commit_style();
    }

    // Selection

    fn check_element(&self, page: usize, element: ElementId) -> Result<(), EditorError> {
        let page = self.page(page)?;
        match element {
            ElementId::Annotation(id) => {
                page.annotation(id).ok_or(EditorError::UnknownAnnotation(id))?;
            }
            ElementId::TextEdit(id) => {
                page.text_edits.get(&id).ok_or(EditorError::UnknownFragment(id))?;
            }
        }
        Ok(())
    }

    pub fn select(&mut self, page: usize, element: ElementId) -> Result<(), EditorError> {
        self.check_element(page, element)?;
        let selection = Selection { page, element };
        if self.selection != Some(selection) {
            self.finish_pending();
        }
        self.selection = Some(selection);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.finish_pending();
        self.selection = None;
    }

    // Text editing

    /// Open a source fragment for inline editing, creating its edit on first use
    pub fn edit_fragment(&mut self, page: usize, fragment: FragmentId) -> Result<(), EditorError> {
        let source = self.page(page)?;
        let fragment = self
            .fragments_of(source)
            .iter()
            .find(|candidate| candidate.id == fragment)
            .cloned()
            .ok_or(EditorError::UnknownFragment(fragment))?;
        self.begin_fragment_edit(page, &fragment);
        Ok(())
    }

    fn begin_fragment_edit(&mut self, page: usize, fragment: &TextFragment) {
        let element = ElementId::TextEdit(fragment.id);
        if self.interaction.editing() == Some((page, element)) {
            return;
        }
        self.finish_pending();
        if let Some(target) = self.pages.get_mut(page) {
            if overlay::open_edit(target, fragment) {
                log::debug!("created text edit {} on page {page}", fragment.id);
            }
            self.selection = Some(Selection { page, element });
            self.interaction = InteractionState::EditingText { page, element };
        }
    }

    /// Open a text or link annotation for inline editing
    pub fn edit_annotation_text(&mut self, page: usize, id: AnnotationId) -> Result<(), EditorError> {
        let element = ElementId::Annotation(id);
        self.check_element(page, element)?;
        if self.interaction.editing() != Some((page, element)) {
            self.finish_pending();
        }
        self.selection = Some(Selection { page, element });
        self.interaction = InteractionState::EditingText { page, element };
        Ok(())
    }

    /// Replace the text of the element being edited; never a commit point
    pub fn set_text(&mut self, text: &str) -> Result<(), EditorError> {
        let (page, element) = self.interaction.editing().ok_or(EditorError::NothingSelected)?;
        let target = self.page_mut(page)?;
        match element {
            ElementId::TextEdit(id) => overlay::set_edit_text(target, id, text),
            ElementId::Annotation(id) => {
                let annotation = target.annotation_mut(id).ok_or(EditorError::UnknownAnnotation(id))?;
                annotation.set_text(text);
                Ok(())
            }
        }
    }

    // Pointer input

    pub fn pointer_down(&mut self, event: PointerEvent) -> Result<(), EditorError> {
        let point = self.to_pdf(&event)?;
        match self.tool.gesture() {
            Gesture::Pan => {
                self.interaction = InteractionState::Panning { origin: event.screen, scroll_at_start: self.scroll };
            }
            Gesture::Select => self.select_at(event.page, point),
            Gesture::Place => self.place_at(event.page, point),
            Gesture::Drag => {
                self.finish_pending();
                self.interaction = InteractionState::Dragging { page: event.page, anchor: point, current: point };
            }
            Gesture::Path => {
                self.finish_pending();
                self.interaction = InteractionState::Pathing { page: event.page, points: vec![point] };
            }
        }
        Ok(())
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> Result<(), EditorError> {
        let point = self.to_pdf(&event)?;
        match &mut self.interaction {
            InteractionState::Dragging { page, current, .. } if *page == event.page => *current = point,
            InteractionState::Pathing { page, points } if *page == event.page => points.push(point),
            InteractionState::Panning { origin, scroll_at_start } => {
                self.scroll = (
                    scroll_at_start.0 - (event.screen.x - origin.x),
                    scroll_at_start.1 - (event.screen.y - origin.y),
                );
            }
            _ => {}
        }
        Ok(())
    }

    pub fn pointer_up(&mut self, event: PointerEvent) -> Result<(), EditorError> {
        let point = self.to_pdf(&event)?;
        match std::mem::take(&mut self.interaction) {
            InteractionState::Dragging { page, anchor, current } => {
                let current = if page == event.page { point } else { current };
                let link_url = self.pending_link_url.as_deref();
                match interaction::dragged_annotation(self.tool, anchor, current, &self.config, link_url) {
                    Some(annotation) => self.add_committed(page, annotation),
                    None => log::debug!("discarded {:?} drag below threshold", self.tool),
                }
            }
            InteractionState::Pathing { page, points } => {
                match interaction::path_annotation(self.tool, points, &self.config) {
                    Some(annotation) => self.add_committed(page, annotation),
                    None => log::debug!("discarded {:?} path with too few points", self.tool),
                }
            }
            InteractionState::Panning { .. } => {}
            other => self.interaction = other,
        }
        Ok(())
    }

    /// Abandon the gesture in progress without committing anything
    pub fn pointer_cancel(&mut self) {
        if !matches!(self.interaction, InteractionState::EditingText { .. }) {
            self.interaction = InteractionState::Idle;
        }
    }

    /// Live box of the drag in progress
    pub fn drag_preview(&self) -> Option<(usize, Rect)> {
        match &self.interaction {
            InteractionState::Dragging { page, anchor, current } => Some((*page, Rect::from_corners(*anchor, *current))),
            _ => None,
        }
    }

    /// Points of the freehand path in progress
    pub fn path_preview(&self) -> Option<(usize, &[PdfPoint])> {
        match &self.interaction {
            InteractionState::Pathing { page, points } => Some((*page, points.as_slice())),
            _ => None,
        }
    }

    fn add_committed(&mut self, page: usize, annotation: doc_model::Annotation) {
        let id = annotation.id;
        let kind = annotation.kind_name();
        if let Some(target) = self.pages.get_mut(page) {
            target.annotations.push(annotation);
            self.commit();
            self.selection = Some(Selection { page, element: ElementId::Annotation(id) });
            log::debug!("added {kind} annotation on page {page}");
        }
    }

    fn select_at(&mut self, page: usize, point: PdfPoint) {
        let Some(target) = self.pages.get(page) else {
            return;
        };
        let tolerance = self.config.hit_tolerance;

        if let Some(id) = target.annotations.iter().rev().find(|a| a.hit_test(&point, tolerance)).map(|a| a.id) {
            let element = ElementId::Annotation(id);
            if self.interaction.editing() != Some((page, element)) {
                // indices were just checked
                let _ = self.select(page, element);
            }
            return;
        }

        if let Some(fragment) = overlay::fragment_at(self.fragments_of(target), &point, 0.0).cloned() {
            self.begin_fragment_edit(page, &fragment);
            return;
        }

        self.clear_selection();
    }

    fn place_at(&mut self, page: usize, point: PdfPoint) {
        self.finish_pending();
        let Some(annotation) =
            interaction::placed_annotation(self.tool, point, &self.config, self.pending_image.as_ref())
        else {
            log::debug!("ignored {:?} click without a pending payload", self.tool);
            return;
        };

        if self.tool == Tool::Image {
            self.pending_image = None;
        }
        self.tool = Tool::Cursor;

        // An empty text box only lands in history once its text session commits
        if let AnnotationKind::Text { .. } = annotation.kind {
            let element = ElementId::Annotation(annotation.id);
            if let Some(target) = self.pages.get_mut(page) {
                target.annotations.push(annotation);
                self.selection = Some(Selection { page, element });
                self.interaction = InteractionState::EditingText { page, element };
            }
            return;
        }
        self.add_committed(page, annotation);
    }

    // Selection & style

    /// Apply a style action to the selection; committed when the selection ends
    pub fn apply_style(&mut self, action: StyleAction) -> Result<bool, EditorError> {
        let selection = self.selection.ok_or(EditorError::NothingSelected)?;
        let page_count = self.pages.len();
        let page = self
            .pages
            .get_mut(selection.page)
            .ok_or(EditorError::PageOutOfRange { page: selection.page, page_count })?;
        let changed = selection::apply_style(page, selection.element, &action, &self.config)?;
        self.style_dirty |= changed;
        Ok(changed)
    }

    /// Style of the selected text-bearing element
    pub fn selected_text_style(&self) -> Option<&TextStyle> {
        let selection = self.selection?;
        let page = self.pages.get(selection.page)?;
        match selection.element {
            ElementId::TextEdit(id) => page.text_edits.get(&id).map(|edit| &edit.style),
            ElementId::Annotation(id) => page.annotation(id)?.text_style(),
        }
    }

    /// Delete the selected element and commit
    pub fn delete_selected(&mut self) -> Result<(), EditorError> {
        let selected = self.selection.ok_or(EditorError::NothingSelected)?;
        if self.interaction.editing() == Some((selected.page, selected.element)) {
            self.interaction = InteractionState::Idle;
        } else {
            self.commit_text();
        }
        self.style_dirty = false;

        selection::delete_element(self.page_mut(selected.page)?, selected.element)?;
        self.selection = None;
        // a never-committed element leaves nothing to record
        if self.commit_if_changed() {
            log::debug!("deleted {:?} on page {}", selected.element, selected.page);
        }
        Ok(())
    }

    /// Duplicate the selected element, select the copy and commit
    pub fn duplicate_selected(&mut self) -> Result<AnnotationId, EditorError> {
        let selected = self.selection.ok_or(EditorError::NothingSelected)?;
        self.finish_pending();
        let offset = self.config.duplicate_offset;
        let copy = selection::duplicate_element(self.page_mut(selected.page)?, selected.element, offset)?;
        self.selection = Some(Selection { page: selected.page, element: ElementId::Annotation(copy) });
        self.commit();
        Ok(copy)
    }

    /// Move the selected annotation by a PDF-space offset and commit
    pub fn move_selected(&mut self, dx: f32, dy: f32) -> Result<bool, EditorError> {
        let selected = self.selection.ok_or(EditorError::NothingSelected)?;
        self.finish_pending();
        let moved = selection::move_element(self.page_mut(selected.page)?, selected.element, dx, dy)?;
        if moved {
            self.commit();
        }
        Ok(moved)
    }

    // History

    pub fn undo(&mut self) -> bool {
        self.finish_pending();
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    pub fn redo(&mut self) -> bool {
        self.finish_pending();
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    fn restore(&mut self, mut pages: Vec<Page>) {
        for (index, page) in pages.iter_mut().enumerate() {
            page.view_zoom = self.pages.get(index).map_or(1.0, |current| current.view_zoom);
        }
        self.pages = pages;
        self.selection = None;
        self.interaction = InteractionState::Idle;
        self.search.take_all();
        log::debug!("restored history index {}", self.history.index());
    }

    // Page operations

    pub fn rotate_page(&mut self, page: usize, delta: Rotation) -> Result<(), EditorError> {
        self.finish_pending();
        self.page_mut(page)?.rotate(delta);
        self.commit();
        Ok(())
    }

    /// Insert a blank page so that it ends up at index `at`
    pub fn insert_blank_page(&mut self, at: usize) -> Result<(), EditorError> {
        if at > self.pages.len() {
            return Err(EditorError::PageOutOfRange { page: at, page_count: self.pages.len() });
        }
        self.finish_pending();
        self.pages.insert(at, Page::blank());
        self.commit();
        Ok(())
    }

    pub fn delete_page(&mut self, page: usize) -> Result<(), EditorError> {
        self.page(page)?;
        if self.pages.len() == 1 {
            return Err(EditorError::LastPage);
        }
        self.finish_pending();
        self.pages.remove(page);
        self.selection = None;
        self.commit();
        Ok(())
    }

    pub fn move_page(&mut self, from: usize, to: usize) -> Result<(), EditorError> {
        self.page(from)?;
        self.page(to)?;
        self.finish_pending();
        let moved = self.pages.remove(from);
        self.pages.insert(to, moved);
        self.selection = None;
        self.commit();
        Ok(())
    }

    /// Insert a copy of a page right after it; copied annotations get fresh ids
    pub fn duplicate_page(&mut self, page: usize) -> Result<(), EditorError> {
        let mut copy = self.page(page)?.clone();
        for annotation in &mut copy.annotations {
            *annotation = annotation.duplicate(0.0, 0.0);
        }
        self.finish_pending();
        self.pages.insert(page + 1, copy);
        self.commit();
        Ok(())
    }

    /// Replace the whole page model, e.g. with one loaded from JSON, and commit
    pub fn replace_pages(&mut self, mut pages: Vec<Page>) -> Result<(), EditorError> {
        if pages.is_empty() {
            return Err(EditorError::LastPage);
        }
        for page in &mut pages {
            if let PageSource::Source(index) = page.source {
                let source_page = self
                    .source
                    .page(index)
                    .ok_or(EditorError::PageOutOfRange { page: index, page_count: self.source.page_count() })?;
                page.geometry = source_page.geometry;
            }
        }
        self.finish_pending();
        self.restore(pages);
        self.commit();
        Ok(())
    }

    // Search & replace

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    pub fn search_results(&self) -> &[SearchMatch] {
        self.search.matches()
    }

    /// Search every page and return the number of matches
    pub fn search(&mut self, term: &str) -> usize {
        match self.search_with(term, &mut ignore_progress, &CancellationToken::new()) {
            Ok(count) => count,
            Err(err) => {
                log::warn!("search failed: {err}");
                0
            }
        }
    }

    pub fn search_with(
        &mut self,
        term: &str,
        progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> Result<usize, EditorError> {
        let total = self.pages.len();
        let mut matches = Vec::new();
        for (index, page) in self.pages.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(EditorError::Cancelled);
            }
            matches.extend(search::search_page(index, page, self.fragments_of(page), term));
            progress(Progress::new(index + 1, total));
        }

        log::debug!("search for {term:?} found {} matches", matches.len());
        let count = matches.len();
        self.search.set_results(term, matches);
        Ok(count)
    }

    pub fn next_match(&mut self) -> Option<&SearchMatch> {
        self.search.next()
    }

    pub fn previous_match(&mut self) -> Option<&SearchMatch> {
        self.search.previous()
    }

    fn replacement_style(&self, found: &SearchMatch) -> TextStyle {
        let height = found.bbox.height;
        let Some(page) = self.pages.get(found.page) else {
            return TextStyle::infer_from_font_name(None, height);
        };
        if let Some(edit) = page.text_edits.get(&found.fragment) {
            return edit.style.clone();
        }
        let font_name = self
            .fragments_of(page)
            .iter()
            .find(|fragment| fragment.id == found.fragment)
            .and_then(|fragment| fragment.font_name.as_deref());
        TextStyle::infer_from_font_name(font_name, height)
    }

    fn apply_replacement(&mut self, found: &SearchMatch, replacement: &str) -> Result<(), EditorError> {
        let style = self.replacement_style(found);
        let padding = self.config.replace_padding;
        let page = self.page_mut(found.page)?;
        page.annotations.extend(search::replacement_annotations(found, replacement, style, padding));
        Ok(())
    }

    /// Replace one match, drop it from the results and commit
    pub fn replace_one(&mut self, index: usize, replacement: &str) -> Result<(), EditorError> {
        self.finish_pending();
        let len = self.search.matches().len();
        let found = self.search.remove(index).ok_or(EditorError::MatchOutOfRange { index, len })?;
        self.apply_replacement(&found, replacement)?;
        self.commit();
        Ok(())
    }

    /// Replace every match with a single commit; the result set is cleared
    pub fn replace_all(&mut self, replacement: &str) -> Result<usize, EditorError> {
        self.finish_pending();
        let matches = self.search.take_all();
        if matches.is_empty() {
            return Ok(0);
        }
        for found in &matches {
            self.apply_replacement(found, replacement)?;
        }
        self.commit();
        log::debug!("replaced {} matches", matches.len());
        Ok(matches.len())
    }

    // Saving

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    /// Snapshot the model for serialization
    ///
    /// Fails with [`SaveError::InProgress`] while another job from this session is alive.
    pub fn begin_save(&mut self) -> Result<SaveJob, SaveError> {
        self.finish_pending();
        if self.saving.swap(true, Ordering::AcqRel) {
            return Err(SaveError::InProgress);
        }
        Ok(SaveJob {
            source: Arc::clone(&self.source),
            pages: self.pages.clone(),
            _guard: SaveGuard(Arc::clone(&self.saving)),
        })
    }

    /// Serialize the current model on this thread
    pub fn save(&mut self, progress: ProgressCallback<'_>) -> Result<Vec<u8>, SaveError> {
        self.begin_save()?.run(progress)
    }
}

/// Clears the session's saving flag when the job ends
#[derive(Debug)]
struct SaveGuard(Arc<AtomicBool>);

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A detached save: model snapshot plus shared source
#[derive(Debug)]
pub struct SaveJob {
    source: Arc<SourceDocument>,
    pages: Vec<Page>,
    _guard: SaveGuard,
}

impl SaveJob {
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn run(self, progress: ProgressCallback<'_>) -> Result<Vec<u8>, SaveError> {
        let bytes = export_document(&self.source, &self.pages, &mut |completed, total| {
            progress(Progress::new(completed, total))
        })?;
        log::debug!("save job finished for {} pages", self.pages.len());
        Ok(bytes)
    }
}
