//! Editor controller
//!
//! [`Editor`] owns the session, the loaded document and its collaborators
//! (canvas, input collector, page store, status sink) and runs every user
//! gesture to completion: picking, calibration, measurement, dimension
//! annotation, free text, removal, page switching and export.
//!
//! Every failure is reported to the status sink, returns the picking state
//! machine to idle and leaves the page and its scale untouched.

use crate::annotation::{Annotation, AnnotationAnchor, AnnotationId, AnnotationKind, Color};
use crate::config::EngineConfig;
use crate::document::{Document, DocumentError, Page};
use crate::export::{export_page, ExportError, ExportFormat};
use crate::geometry::{distance, is_too_short, CanvasPoint, ScreenPoint};
use crate::input::{InputCollector, InputError};
use crate::marker::{build_marker, build_text, format_meters, MarkerStyle};
use crate::persistence::PageStore;
use crate::scale::ScaleError;
use crate::scale_detection::{best_scale_notation, DetectedScale};
use crate::scene::Canvas;
use crate::session::{Mode, Session};
use crate::source::PageSource;
use crate::status::{Severity, StatusSink};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Errors surfaced by editor operations
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("gesture of {distance:.1} px is shorter than {minimum:.1} px")]
    GestureTooShort { distance: f32, minimum: f32 },
    #[error("input cancelled")]
    InputCancelled,
    #[error("no scale has been set for this page")]
    ScaleNotSet,
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
    #[error("another prompt is already open")]
    PromptBusy,
    #[error("no document is loaded")]
    NoDocument,
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

impl From<InputError> for EditorError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::Busy => EditorError::PromptBusy,
        }
    }
}

impl From<ScaleError> for EditorError {
    fn from(err: ScaleError) -> Self {
        match err {
            ScaleError::InvalidCalibration(reason) => EditorError::InvalidCalibration(reason),
            ScaleError::ScaleNotSet => EditorError::ScaleNotSet,
        }
    }
}

impl EditorError {
    /// Severity used when reporting this error to the user
    pub fn severity(&self) -> Severity {
        match self {
            EditorError::GestureTooShort { .. }
            | EditorError::InputCancelled
            | EditorError::InvalidCalibration(_)
            | EditorError::PromptBusy => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;

/// Top-level controller of an editing session
pub struct Editor<C, I, S, N> {
    config: EngineConfig,
    session: Session,
    document: Option<Document>,
    canvas: C,
    input: I,
    store: S,
    status: N,
    last_pointer: Option<CanvasPoint>,
}

impl<C, I, S, N> Editor<C, I, S, N>
where
    C: Canvas,
    I: InputCollector,
    S: PageStore,
    N: StatusSink,
{
    pub fn new(config: EngineConfig, canvas: C, input: I, store: S, status: N) -> Self {
        let color = Color::from_hex(&config.default_color).unwrap_or_else(|| {
            warn!(color = %config.default_color, "invalid default color, using red");
            Color::RED
        });
        Self {
            config,
            session: Session::new(color),
            document: None,
            canvas,
            input,
            store,
            status,
            last_pointer: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn status(&self) -> &N {
        &self.status
    }

    /// The page currently shown
    pub fn current_page(&self) -> Option<&Page> {
        let index = self.session.current_page?;
        self.document.as_ref()?.page(index).ok()
    }

    // ---- document lifecycle ----

    /// Replace the loaded document and show its first page
    pub fn load_document(&mut self, pages: Vec<Page>) -> EditorResult<()> {
        let document = Document::new(pages)?;
        self.close_document();

        let first = document.first_index();
        info!(pages = document.page_count(), "document loaded");
        self.document = Some(document);
        if let Some(index) = first {
            self.show_page(index)?;
        }
        Ok(())
    }

    /// Discard the document, its canvas objects and any gesture
    pub fn close_document(&mut self) {
        self.session.picking.reset(&mut self.canvas);
        self.hide_current_page();
        self.document = None;
        self.session.current_page = None;
        self.session.scale.clear();
        self.session.mode = Mode::Pan;
        self.last_pointer = None;
    }

    /// Show another page, keeping each page's own scale
    pub fn switch_page(&mut self, index: usize) -> EditorResult<()> {
        let document = self.document.as_ref().ok_or(EditorError::NoDocument)?;
        document.page(index)?;
        if self.session.current_page == Some(index) {
            return Ok(());
        }

        self.session.picking.reset(&mut self.canvas);
        self.sync_from_canvas();
        let outgoing_scale = self.session.scale;
        if let Ok(page) = self.current_page_mut() {
            page.set_scale(outgoing_scale);
        }
        self.hide_current_page();
        self.show_page(index)?;
        debug!(page = index, "page switched");
        Ok(())
    }

    fn show_page(&mut self, index: usize) -> EditorResult<()> {
        let document = self.document.as_ref().ok_or(EditorError::NoDocument)?;
        let page = document.page(index)?;
        for annotation in page.annotations() {
            self.canvas.add(annotation.object().clone());
        }
        self.session.scale = *page.scale();
        self.session.current_page = Some(index);
        self.canvas.request_render();
        Ok(())
    }

    fn hide_current_page(&mut self) {
        let Some(page) = self.current_page() else {
            return;
        };
        let ids: Vec<AnnotationId> = page.annotations().iter().map(|a| a.id()).collect();
        for id in ids {
            self.canvas.remove(id);
        }
        self.canvas.discard_selection();
        self.canvas.request_render();
    }

    // ---- modes and pointer ----

    /// Change the interaction mode, abandoning any gesture
    pub fn set_mode(&mut self, mode: Mode) {
        self.session.picking.reset(&mut self.canvas);
        if self.session.mode != mode {
            debug!(from = self.session.mode.name(), to = mode.name(), "mode changed");
        }
        self.session.mode = mode;
    }

    pub fn set_color(&mut self, color: Color) {
        self.session.color = color;
    }

    /// Escape: drop the gesture and its preview
    pub fn escape(&mut self) {
        self.session.picking.reset(&mut self.canvas);
    }

    fn preview_style(&self) -> MarkerStyle {
        match self.session.mode {
            Mode::SetScale => MarkerStyle::calibration(&self.config),
            _ => MarkerStyle::measurement(&self.config, self.session.color),
        }
    }

    /// Start a segment gesture
    ///
    /// Returns true when a gesture was armed.
    pub fn pointer_down(&mut self, at: ScreenPoint) -> bool {
        if !self.session.mode.is_segment_mode()
            || self.session.current_page.is_none()
            || self.session.picking.in_progress()
        {
            return false;
        }
        let start = self.canvas.screen_to_canvas(at);
        let style = self.preview_style();
        self.session.picking.arm(&mut self.canvas, start, &style);
        self.last_pointer = Some(start);
        true
    }

    /// Track the pointer while a gesture is armed
    pub fn pointer_move(&mut self, at: ScreenPoint) -> bool {
        let point = self.canvas.screen_to_canvas(at);
        self.last_pointer = Some(point);
        self.session.picking.track(&mut self.canvas, point)
    }

    /// Release the pointer, finalizing an armed gesture
    ///
    /// Returns `Ok(None)` when no gesture was armed.
    pub async fn pointer_up(&mut self, at: ScreenPoint) -> EditorResult<Option<AnnotationId>> {
        let end = self.canvas.screen_to_canvas(at);
        self.last_pointer = Some(end);
        self.complete_gesture(end).await
    }

    /// Confirm the end point at the last tracked pointer position
    pub async fn confirm_end(&mut self) -> EditorResult<Option<AnnotationId>> {
        let Some(end) = self.last_pointer.or(self.session.picking.start()) else {
            return Ok(None);
        };
        self.complete_gesture(end).await
    }

    async fn complete_gesture(&mut self, end: CanvasPoint) -> EditorResult<Option<AnnotationId>> {
        let Some((start, end)) = self.session.picking.finish(&mut self.canvas, end) else {
            return Ok(None);
        };
        let result = match self.session.mode {
            Mode::SetScale => self.finalize_calibration(start, end).await.map(Some),
            Mode::Measure => self.finalize_measurement(start, end).map(Some),
            Mode::AnnotateLine => self.finalize_dimension(start, end).await.map(Some),
            Mode::Pan | Mode::Text => Ok(None),
        };
        self.session.picking.reset(&mut self.canvas);
        result
    }

    /// Click in text mode places free text
    pub async fn click(&mut self, at: ScreenPoint) -> EditorResult<Option<AnnotationId>> {
        if self.session.mode != Mode::Text {
            return Ok(None);
        }
        let point = self.canvas.screen_to_canvas(at);
        self.place_text(point).await.map(Some)
    }

    // ---- finalize routines ----

    fn check_length(&self, p1: &CanvasPoint, p2: &CanvasPoint) -> EditorResult<f32> {
        let length = distance(p1, p2);
        let zoom = self.canvas.zoom();
        if is_too_short(length, zoom, self.config.min_gesture_px) {
            let zoom = if zoom > 0.0 { zoom } else { 1.0 };
            return Err(EditorError::GestureTooShort {
                distance: length,
                minimum: self.config.min_gesture_px / zoom,
            });
        }
        Ok(length)
    }

    /// Report a failure and return the state machine to idle
    fn fail<T>(&mut self, message: &str, err: EditorError) -> EditorResult<T> {
        self.session.picking.reset(&mut self.canvas);
        debug!(error = %err, "gesture rejected");
        self.status.notify(message, err.severity());
        Err(err)
    }

    fn require_page(&self) -> EditorResult<usize> {
        self.current_page()
            .map(|p| p.index())
            .ok_or(EditorError::NoDocument)
    }

    /// Turn a traced segment of known length into the page scale
    ///
    /// On success the calibration line replaces any previous one, the mode
    /// switches to [`Mode::Measure`] and the page is saved.
    pub async fn finalize_calibration(
        &mut self,
        p1: CanvasPoint,
        p2: CanvasPoint,
    ) -> EditorResult<AnnotationId> {
        if let Err(err) = self.require_page() {
            return self.fail("No page loaded", err);
        }
        let length = match self.check_length(&p1, &p2) {
            Ok(length) => length,
            Err(err) => return self.fail("Distance too short", err),
        };

        let answer = self
            .input
            .collect_number(
                "Calibration",
                "Real distance in meters?",
                &self.config.default_calibration_meters,
            )
            .await;
        let meters = match answer {
            Ok(Some(meters)) => meters,
            Ok(None) => return self.fail("Calibration cancelled", EditorError::InputCancelled),
            Err(err) => return self.fail("Another prompt is already open", err.into()),
        };

        let mut scale = self.session.scale;
        if let Err(err) =
            scale.set_from_calibration(length, meters, self.canvas.zoom(), self.config.min_gesture_px)
        {
            return self.fail("Calibration rejected", err.into());
        }
        self.session.scale = scale;

        let previous = self.current_page().and_then(|p| p.calibration_line()).map(|a| a.id());
        if let Some(id) = previous {
            self.canvas.remove(id);
            if let Ok(page) = self.current_page_mut() {
                page.remove_annotation(id);
            }
        }

        let label = format_meters(meters);
        let object = build_marker(
            p1,
            p2,
            &label,
            &MarkerStyle::calibration(&self.config),
            self.canvas.zoom(),
            &self.config,
        );
        let annotation = Annotation::new(
            AnnotationKind::Calibration { meters },
            AnnotationAnchor::Segment { start: p1, end: p2 },
            Color::SLATE,
            label,
            object,
        );
        let id = self.commit(annotation);

        self.set_mode(Mode::Measure);
        let ppm = scale.pixels_per_meter().unwrap_or_default();
        let message = match scale.drawing_ratio(self.config.render_scale) {
            Some(ratio) => format!("Scale set: 1 m = {ppm:.0} px (~1:{ratio:.0})"),
            None => format!("Scale set: 1 m = {ppm:.0} px"),
        };
        info!(pixels_per_meter = ppm, "calibrated");
        self.status.notify(&message, Severity::Success);
        Ok(id)
    }

    /// Measure a segment with the current scale
    ///
    /// Without a scale the mode is forced back to [`Mode::SetScale`].
    pub fn finalize_measurement(
        &mut self,
        p1: CanvasPoint,
        p2: CanvasPoint,
    ) -> EditorResult<AnnotationId> {
        if let Err(err) = self.require_page() {
            return self.fail("No page loaded", err);
        }
        let length = match self.check_length(&p1, &p2) {
            Ok(length) => length,
            Err(err) => return self.fail("Distance too short", err),
        };
        let meters = match self.session.scale.to_meters(length) {
            Ok(meters) => meters,
            Err(err) => {
                self.set_mode(Mode::SetScale);
                return self.fail("No scale set", err.into());
            }
        };

        let label = format_meters(meters);
        let color = self.session.color;
        let object = build_marker(
            p1,
            p2,
            &label,
            &MarkerStyle::measurement(&self.config, color),
            self.canvas.zoom(),
            &self.config,
        );
        let annotation = Annotation::new(
            AnnotationKind::Measurement { meters },
            AnnotationAnchor::Segment { start: p1, end: p2 },
            color,
            label.clone(),
            object,
        );
        let id = self.commit(annotation);
        self.status.notify(&format!("Measurement: {label}"), Severity::Success);
        Ok(id)
    }

    /// Draw a segment labelled with a value typed by the user
    pub async fn finalize_dimension(
        &mut self,
        p1: CanvasPoint,
        p2: CanvasPoint,
    ) -> EditorResult<AnnotationId> {
        if let Err(err) = self.require_page() {
            return self.fail("No page loaded", err);
        }
        if let Err(err) = self.check_length(&p1, &p2) {
            return self.fail("Distance too short", err);
        }

        let answer = self
            .input
            .collect_number("Dimension", "Dimension value in meters", "")
            .await;
        let value = match answer {
            Ok(Some(value)) => value,
            Ok(None) => return self.fail("Dimension cancelled", EditorError::InputCancelled),
            Err(err) => return self.fail("Another prompt is already open", err.into()),
        };

        let label = format_meters(value);
        let color = self.session.color;
        let object = build_marker(
            p1,
            p2,
            &label,
            &MarkerStyle::dimension(&self.config, color),
            self.canvas.zoom(),
            &self.config,
        );
        let annotation = Annotation::new(
            AnnotationKind::Dimension { value },
            AnnotationAnchor::Segment { start: p1, end: p2 },
            color,
            label.clone(),
            object,
        );
        let id = self.commit(annotation);
        self.status.notify(&format!("Dimension added: {label}"), Severity::Success);
        Ok(id)
    }

    /// Prompt for text and place it centered on `point`
    pub async fn place_text(&mut self, point: CanvasPoint) -> EditorResult<AnnotationId> {
        if let Err(err) = self.require_page() {
            return self.fail("No page loaded", err);
        }
        let text = match self.input.collect_text("Text", "Label content").await {
            Ok(Some(text)) => text,
            Ok(None) => return self.fail("Text cancelled", EditorError::InputCancelled),
            Err(err) => return self.fail("Another prompt is already open", err.into()),
        };

        let color = self.session.color;
        let object = build_text(point, &text, color, self.canvas.zoom(), &self.config);
        let annotation = Annotation::new(
            AnnotationKind::FreeText,
            AnnotationAnchor::Point(point),
            color,
            text,
            object,
        );
        let id = self.commit(annotation);
        self.status.notify("Text added", Severity::Success);
        Ok(id)
    }

    /// Add an annotation to the current page and canvas, select it and save
    fn commit(&mut self, annotation: Annotation) -> AnnotationId {
        let id = annotation.id();
        let tag = annotation.kind().tag();
        self.canvas.add(annotation.object().clone());
        if let Ok(page) = self.current_page_mut() {
            page.add_annotation(annotation);
        }
        self.canvas.set_active(id);
        self.canvas.request_render();
        debug!(%id, kind = tag, "annotation committed");
        self.save_current_page();
        id
    }

    /// Remove an annotation from the current page
    ///
    /// Returns false for unknown ids. The page scale is kept even when the
    /// calibration line is removed.
    pub fn remove_annotation(&mut self, id: AnnotationId) -> bool {
        let removed = match self.current_page_mut() {
            Ok(page) => page.remove_annotation(id).is_some(),
            Err(_) => false,
        };
        if !removed {
            return false;
        }
        self.canvas.remove(id);
        self.canvas.request_render();
        self.save_current_page();
        true
    }

    // ---- scale detection ----

    /// Apply a `1:N` notation found in the page text
    ///
    /// A manual calibration is never overridden.
    pub fn apply_detected_scale(&mut self, text: &str) -> Option<DetectedScale> {
        self.current_page()?;
        if self.session.scale.source() == Some(crate::scale::ScaleSource::Manual) {
            return None;
        }
        let detected = best_scale_notation(text)?;

        let mut scale = self.session.scale;
        if scale.set_detected(detected.ratio, self.config.render_scale).is_err() {
            return None;
        }
        self.session.scale = scale;
        if let Ok(page) = self.current_page_mut() {
            page.set_scale(scale);
        }
        self.save_current_page();
        self.status.notify(
            &format!("Detected scale {}", detected.source_text),
            Severity::Info,
        );
        Some(detected)
    }

    // ---- persistence ----

    fn current_page_mut(&mut self) -> EditorResult<&mut Page> {
        let index = self.session.current_page.ok_or(EditorError::NoDocument)?;
        let document = self.document.as_mut().ok_or(EditorError::NoDocument)?;
        Ok(document.page_mut(index)?)
    }

    /// Pull live canvas geometry (moved objects) back into the page
    fn sync_from_canvas(&mut self) {
        let Some(index) = self.session.current_page else {
            return;
        };
        let Some(page) = self.document.as_mut().and_then(|d| d.page_mut(index).ok()) else {
            return;
        };
        let ids: Vec<AnnotationId> = page.annotations().iter().map(|a| a.id()).collect();
        for id in ids {
            if let (Some(object), Some(annotation)) = (self.canvas.get(id), page.annotation_mut(id)) {
                annotation.sync_object(object);
            }
        }
    }

    /// Save the current page; failures are logged only
    pub fn save_current_page(&mut self) {
        self.sync_from_canvas();
        let scale = self.session.scale;
        let Some(index) = self.session.current_page else {
            return;
        };
        let Some(page) = self.document.as_mut().and_then(|d| d.page_mut(index).ok()) else {
            return;
        };
        page.set_scale(scale);
        if let Err(err) = self.store.save_page(page) {
            warn!(page = index, error = %err, "failed to save page");
        }
    }

    // ---- export ----

    /// Export the current page as `<prefix>-page-<index>.<ext>` under `dir`
    pub fn export(
        &mut self,
        source: &dyn PageSource,
        format: ExportFormat,
        dir: &Path,
    ) -> EditorResult<PathBuf> {
        self.canvas.discard_selection();
        self.canvas.request_render();
        self.sync_from_canvas();

        let Some(page) = self.current_page() else {
            let err = EditorError::NoDocument;
            self.status.notify("Export failed: no page loaded", err.severity());
            return Err(err);
        };
        match export_page(
            page,
            source,
            format,
            dir,
            &self.config.artifact_prefix,
            self.config.export_dpi,
        ) {
            Ok(path) => {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                self.status.notify(
                    &format!("Exported {}", name.unwrap_or_default()),
                    Severity::Success,
                );
                Ok(path)
            }
            Err(err) => {
                warn!(error = %err, "export failed");
                self.status.notify(&format!("Export failed: {err}"), Severity::Error);
                Err(err.into())
            }
        }
    }

    pub fn export_png(&mut self, source: &dyn PageSource, dir: &Path) -> EditorResult<PathBuf> {
        self.export(source, ExportFormat::Png, dir)
    }

    pub fn export_pdf(&mut self, source: &dyn PageSource, dir: &Path) -> EditorResult<PathBuf> {
        self.export(source, ExportFormat::Pdf, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PageBackground;
    use crate::input::{parse_number, parse_text, InputResult, ModalInput};
    use crate::persistence::StoreResult;
    use crate::scale::{ScaleModel, ScaleSource};
    use crate::scene::Scene;
    use crate::source::BlankPageSource;
    use crate::status::RecordingStatus;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Answers prompts from a queue; an exhausted queue cancels
    #[derive(Default)]
    struct ScriptedInput {
        answers: RefCell<VecDeque<Option<String>>>,
        titles: RefCell<Vec<String>>,
    }

    impl ScriptedInput {
        fn answering(answers: &[Option<&str>]) -> Self {
            Self {
                answers: RefCell::new(answers.iter().map(|a| a.map(str::to_string)).collect()),
                titles: RefCell::default(),
            }
        }

        fn next(&self, title: &str) -> Option<String> {
            self.titles.borrow_mut().push(title.to_string());
            self.answers.borrow_mut().pop_front().flatten()
        }
    }

    #[async_trait(?Send)]
    impl InputCollector for ScriptedInput {
        async fn collect_number(
            &self,
            title: &str,
            _label: &str,
            _default: &str,
        ) -> InputResult<Option<f32>> {
            Ok(self.next(title).as_deref().and_then(parse_number))
        }

        async fn collect_text(&self, title: &str, _label: &str) -> InputResult<Option<String>> {
            Ok(self.next(title).as_deref().and_then(parse_text))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingStore {
        saves: Rc<RefCell<Vec<Page>>>,
    }

    impl PageStore for RecordingStore {
        fn save_page(&mut self, page: &Page) -> StoreResult<()> {
            self.saves.borrow_mut().push(page.clone());
            Ok(())
        }
    }

    type TestEditor<I> = Editor<Scene, I, RecordingStore, RecordingStatus>;

    fn editor_with<I: InputCollector>(input: I) -> TestEditor<I> {
        let mut editor = Editor::new(
            EngineConfig::default(),
            Scene::new(),
            input,
            RecordingStore::default(),
            RecordingStatus::new(),
        );
        editor
            .load_document(vec![
                Page::new(0, PageBackground::native(800, 600)),
                Page::new(1, PageBackground::native(800, 600)),
            ])
            .unwrap();
        editor
    }

    fn editor(answers: &[Option<&str>]) -> TestEditor<ScriptedInput> {
        editor_with(ScriptedInput::answering(answers))
    }

    async fn drag<I: InputCollector>(
        editor: &mut TestEditor<I>,
        from: (f32, f32),
        to: (f32, f32),
    ) -> EditorResult<Option<AnnotationId>> {
        assert!(editor.pointer_down(ScreenPoint::new(from.0, from.1)));
        editor.pointer_move(ScreenPoint::new(to.0, to.1));
        editor.pointer_up(ScreenPoint::new(to.0, to.1)).await
    }

    fn saves(editor: &TestEditor<impl InputCollector>) -> usize {
        editor.store().saves.borrow().len()
    }

    #[tokio::test]
    async fn test_measure_without_scale_switches_to_set_scale() {
        let mut editor = editor(&[]);
        editor.set_mode(Mode::Measure);

        let result = drag(&mut editor, (100.0, 100.0), (250.0, 100.0)).await;

        assert!(matches!(result, Err(EditorError::ScaleNotSet)));
        assert_eq!(editor.session().mode(), Mode::SetScale);
        assert!(editor.canvas().objects().is_empty());
        assert!(editor.session().picking().is_idle());
        assert_eq!(
            editor.status().last(),
            Some(("No scale set".to_string(), Severity::Error))
        );
        assert_eq!(saves(&editor), 0);
    }

    #[tokio::test]
    async fn test_calibrate_then_measure() {
        let mut editor = editor(&[Some("2.00")]);
        editor.set_mode(Mode::SetScale);

        let calibration = drag(&mut editor, (100.0, 100.0), (300.0, 100.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(editor.session().scale().pixels_per_meter(), Some(100.0));
        assert_eq!(editor.session().mode(), Mode::Measure);
        assert_eq!(
            editor.status().last(),
            Some(("Scale set: 1 m = 100 px (~1:85)".to_string(), Severity::Success))
        );

        let measurement = drag(&mut editor, (0.0, 0.0), (0.0, 150.0)).await.unwrap().unwrap();
        let page = editor.current_page().unwrap();
        let annotation = page.annotation(measurement).unwrap();
        assert_eq!(annotation.label(), "1.50 m");
        assert_eq!(annotation.kind(), &AnnotationKind::Measurement { meters: 1.5 });
        assert!(page.annotation(calibration).unwrap().is_calibration());

        // calibration line and measurement, no preview left behind
        assert_eq!(editor.canvas().objects().len(), 2);
        assert_eq!(editor.canvas().active(), Some(measurement));
        assert_eq!(saves(&editor), 2);
        assert!(editor.session().is_consistent());
    }

    #[tokio::test]
    async fn test_measurement_follows_zoom() {
        let mut editor = editor(&[Some("1")]);
        editor.canvas_mut().set_zoom(2.0);
        editor.set_mode(Mode::SetScale);

        // 200 screen px at zoom 2 is 100 canvas px
        drag(&mut editor, (0.0, 0.0), (200.0, 0.0)).await.unwrap();
        assert_eq!(editor.session().scale().pixels_per_meter(), Some(100.0));

        let id = drag(&mut editor, (0.0, 0.0), (0.0, 100.0)).await.unwrap().unwrap();
        assert_eq!(editor.current_page().unwrap().annotation(id).unwrap().label(), "0.50 m");
    }

    #[tokio::test]
    async fn test_recalibration_replaces_calibration_line() {
        let mut editor = editor(&[Some("1"), Some("4")]);
        editor.set_mode(Mode::SetScale);
        let first = drag(&mut editor, (0.0, 0.0), (100.0, 0.0)).await.unwrap().unwrap();

        editor.set_mode(Mode::SetScale);
        let second = drag(&mut editor, (0.0, 0.0), (200.0, 0.0)).await.unwrap().unwrap();

        let page = editor.current_page().unwrap();
        assert!(page.annotation(first).is_none());
        assert_eq!(page.calibration_line().map(|a| a.id()), Some(second));
        assert!(editor.canvas().get(first).is_none());
        assert_eq!(editor.session().scale().pixels_per_meter(), Some(50.0));
    }

    #[tokio::test]
    async fn test_calibration_accepts_comma_and_rejects_garbage() {
        let mut editor = editor(&[Some("abc"), Some("2,5")]);
        editor.set_mode(Mode::SetScale);

        let cancelled = drag(&mut editor, (0.0, 0.0), (250.0, 0.0)).await;
        assert!(matches!(cancelled, Err(EditorError::InputCancelled)));
        assert!(!editor.session().scale().has_scale());
        assert_eq!(editor.session().mode(), Mode::SetScale);

        drag(&mut editor, (0.0, 0.0), (250.0, 0.0)).await.unwrap();
        assert_eq!(editor.session().scale().pixels_per_meter(), Some(100.0));
    }

    #[tokio::test]
    async fn test_short_gesture_is_rejected_without_prompt() {
        let mut editor = editor(&[Some("1")]);
        editor.set_mode(Mode::SetScale);

        let result = drag(&mut editor, (10.0, 10.0), (14.0, 12.0)).await;

        assert!(matches!(result, Err(EditorError::GestureTooShort { .. })));
        assert!(editor.input().titles.borrow().is_empty());
        assert!(editor.canvas().objects().is_empty());
        assert!(!editor.session().scale().has_scale());
        assert_eq!(editor.status().last().map(|(_, s)| s), Some(Severity::Warning));
    }

    #[tokio::test]
    async fn test_cancelled_recalibration_keeps_previous_scale() {
        let mut editor = editor(&[Some("1"), None]);
        editor.set_mode(Mode::SetScale);
        let line = drag(&mut editor, (0.0, 0.0), (100.0, 0.0)).await.unwrap().unwrap();

        editor.set_mode(Mode::SetScale);
        let result = drag(&mut editor, (0.0, 0.0), (300.0, 0.0)).await;

        assert!(matches!(result, Err(EditorError::InputCancelled)));
        assert_eq!(editor.session().scale().pixels_per_meter(), Some(100.0));
        let page = editor.current_page().unwrap();
        assert_eq!(page.calibration_line().map(|a| a.id()), Some(line));
        assert_eq!(page.annotations().len(), 1);
        assert_eq!(editor.canvas().objects().len(), 1);
        assert!(editor.canvas().get(line).is_some());
        assert_eq!(saves(&editor), 1);
        assert!(editor.session().picking().is_idle());
    }

    #[tokio::test]
    async fn test_dimension_cancel_leaves_page_untouched() {
        let mut editor = editor(&[None]);
        editor.set_mode(Mode::AnnotateLine);

        let result = drag(&mut editor, (0.0, 0.0), (120.0, 40.0)).await;

        assert!(matches!(result, Err(EditorError::InputCancelled)));
        assert_eq!(editor.input().titles.borrow().as_slice(), ["Dimension"]);
        assert!(editor.canvas().objects().is_empty());
        assert!(editor.current_page().unwrap().annotations().is_empty());
        assert_eq!(saves(&editor), 0);
        assert_eq!(editor.session().mode(), Mode::AnnotateLine);
    }

    #[tokio::test]
    async fn test_dimension_uses_typed_value() {
        let mut editor = editor(&[Some("3,2")]);
        editor.set_mode(Mode::AnnotateLine);

        let id = drag(&mut editor, (0.0, 0.0), (120.0, 40.0)).await.unwrap().unwrap();

        let annotation = editor.current_page().unwrap().annotation(id).unwrap().clone();
        assert_eq!(annotation.label(), "3.20 m");
        assert_eq!(annotation.kind().tag(), "dimension");
        assert!(!editor.session().scale().has_scale());
    }

    #[tokio::test]
    async fn test_confirm_end_uses_last_pointer() {
        let mut editor = editor(&[Some("1")]);
        editor.set_mode(Mode::SetScale);

        assert!(editor.pointer_down(ScreenPoint::new(0.0, 0.0)));
        assert!(editor.pointer_move(ScreenPoint::new(0.0, 80.0)));
        editor.confirm_end().await.unwrap();

        assert_eq!(editor.session().scale().pixels_per_meter(), Some(80.0));
    }

    #[tokio::test]
    async fn test_pointer_ignored_outside_segment_modes() {
        let mut editor = editor(&[]);
        assert!(!editor.pointer_down(ScreenPoint::new(0.0, 0.0)));
        assert!(!editor.pointer_move(ScreenPoint::new(50.0, 0.0)));
        assert_eq!(editor.pointer_up(ScreenPoint::new(50.0, 0.0)).await.unwrap(), None);
        assert_eq!(editor.click(ScreenPoint::new(5.0, 5.0)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_escape_and_mode_change_drop_preview() {
        let mut editor = editor(&[]);
        editor.set_mode(Mode::Measure);

        editor.pointer_down(ScreenPoint::new(0.0, 0.0));
        editor.pointer_move(ScreenPoint::new(40.0, 0.0));
        assert_eq!(editor.canvas().objects().len(), 1);
        editor.escape();
        assert!(editor.canvas().objects().is_empty());
        assert!(editor.session().picking().is_idle());

        editor.pointer_down(ScreenPoint::new(0.0, 0.0));
        editor.set_mode(Mode::Pan);
        assert!(editor.canvas().objects().is_empty());
        assert!(editor.session().is_consistent());
    }

    #[tokio::test]
    async fn test_text_placement_keeps_mode() {
        let mut editor = editor(&[Some("  Regard EP  "), None]);
        editor.set_mode(Mode::Text);

        let id = editor.click(ScreenPoint::new(40.0, 60.0)).await.unwrap().unwrap();
        let annotation = editor.current_page().unwrap().annotation(id).unwrap().clone();
        assert_eq!(annotation.label(), "Regard EP");
        assert_eq!(annotation.anchor(), &AnnotationAnchor::Point(CanvasPoint::new(40.0, 60.0)));
        assert_eq!(editor.session().mode(), Mode::Text);

        let cancelled = editor.click(ScreenPoint::new(10.0, 10.0)).await;
        assert!(matches!(cancelled, Err(EditorError::InputCancelled)));
        assert_eq!(editor.canvas().objects().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_annotation() {
        let mut editor = editor(&[Some("1")]);
        editor.set_mode(Mode::SetScale);
        let id = drag(&mut editor, (0.0, 0.0), (100.0, 0.0)).await.unwrap().unwrap();

        assert!(editor.remove_annotation(id));
        assert!(editor.canvas().objects().is_empty());
        assert!(editor.current_page().unwrap().annotations().is_empty());
        // the scale outlives its calibration line
        assert!(editor.session().scale().has_scale());
        assert!(!editor.remove_annotation(id));
    }

    #[tokio::test]
    async fn test_switch_page_keeps_per_page_scale() {
        let mut editor = editor(&[Some("1")]);
        editor.set_mode(Mode::SetScale);
        drag(&mut editor, (0.0, 0.0), (100.0, 0.0)).await.unwrap();
        assert_eq!(editor.canvas().objects().len(), 1);

        editor.switch_page(1).unwrap();
        assert_eq!(editor.session().current_page(), Some(1));
        assert!(!editor.session().scale().has_scale());
        assert!(editor.canvas().objects().is_empty());

        editor.switch_page(0).unwrap();
        assert_eq!(editor.session().scale().pixels_per_meter(), Some(100.0));
        assert_eq!(editor.canvas().objects().len(), 1);

        assert!(matches!(
            editor.switch_page(7),
            Err(EditorError::Document(DocumentError::NoPage(7)))
        ));
    }

    #[tokio::test]
    async fn test_moved_object_is_saved() {
        let mut editor = editor(&[Some("1")]);
        editor.set_mode(Mode::SetScale);
        let id = drag(&mut editor, (0.0, 0.0), (100.0, 0.0)).await.unwrap().unwrap();

        editor.canvas_mut().get_mut(id).unwrap().position = CanvasPoint::new(75.0, 20.0);
        editor.save_current_page();

        let saved = editor.store().saves.borrow().last().cloned().unwrap();
        let object = saved.annotation(id).unwrap().object();
        assert_eq!(object.position, CanvasPoint::new(75.0, 20.0));
        assert_eq!(
            saved.annotation(id).unwrap().anchor(),
            &AnnotationAnchor::Segment {
                start: CanvasPoint::new(25.0, 20.0),
                end: CanvasPoint::new(125.0, 20.0),
            }
        );
        assert_eq!(saved.scale().pixels_per_meter(), Some(100.0));
    }

    #[tokio::test]
    async fn test_close_document_clears_everything() {
        let mut editor = editor(&[Some("1")]);
        editor.set_mode(Mode::SetScale);
        drag(&mut editor, (0.0, 0.0), (100.0, 0.0)).await.unwrap();

        editor.close_document();

        assert!(editor.document().is_none());
        assert!(editor.current_page().is_none());
        assert!(editor.canvas().objects().is_empty());
        assert!(!editor.session().scale().has_scale());
        assert_eq!(editor.session().mode(), Mode::Pan);
        assert!(matches!(editor.switch_page(0), Err(EditorError::NoDocument)));
    }

    #[tokio::test]
    async fn test_load_document_restores_saved_scale() {
        let mut page = Page::new(3, PageBackground::native(400, 300));
        let mut scale = ScaleModel::new();
        scale.set_from_calibration(250.0, 5.0, 1.0, 10.0).unwrap();
        page.set_scale(scale);

        let mut editor = editor(&[]);
        editor.load_document(vec![page]).unwrap();

        assert_eq!(editor.session().current_page(), Some(3));
        assert_eq!(editor.session().scale().pixels_per_meter(), Some(50.0));
    }

    #[test]
    fn test_detected_scale_never_overrides_manual() {
        let mut editor = editor(&[]);

        let detected = editor.apply_detected_scale("PLAN MASSE - Echelle 1:200").unwrap();
        assert_eq!(detected.ratio, 200.0);
        assert_eq!(editor.session().scale().source(), Some(ScaleSource::Detected));
        let ppm = editor.session().scale().pixels_per_meter().unwrap();
        assert!((ppm - 72.0 * 3.0 / (0.0254 * 200.0)).abs() < 1e-3);

        let mut manual = ScaleModel::new();
        manual.set_from_calibration(100.0, 1.0, 1.0, 10.0).unwrap();
        editor.session.scale = manual;
        assert!(editor.apply_detected_scale("1:500").is_none());
        assert_eq!(editor.session().scale().pixels_per_meter(), Some(100.0));
    }

    #[tokio::test]
    async fn test_export_writes_artifact_and_clears_selection() {
        let mut editor = editor(&[Some("1")]);
        editor.set_mode(Mode::SetScale);
        drag(&mut editor, (0.0, 0.0), (100.0, 0.0)).await.unwrap();
        assert!(editor.canvas().active().is_some());

        let dir = tempfile::tempdir().unwrap();
        let path = editor.export_png(&BlankPageSource, dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "mesures-terrain-page-0.png");
        assert!(path.exists());
        assert!(editor.canvas().active().is_none());
        assert_eq!(
            editor.status().last(),
            Some(("Exported mesures-terrain-page-0.png".to_string(), Severity::Success))
        );

        let pdf = editor.export_pdf(&BlankPageSource, dir.path()).unwrap();
        assert!(std::fs::read(pdf).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_export_without_document_fails() {
        let mut editor = editor(&[]);
        editor.close_document();
        let dir = tempfile::tempdir().unwrap();

        let result = editor.export_png(&BlankPageSource, dir.path());
        assert!(matches!(result, Err(EditorError::NoDocument)));
        assert_eq!(editor.status().last().map(|(_, s)| s), Some(Severity::Error));
    }

    #[tokio::test]
    async fn test_modal_prompt_drives_calibration() {
        let input = ModalInput::new();
        let handle = input.clone();
        let mut editor = editor_with(input);
        editor.set_mode(Mode::SetScale);
        assert!(editor.pointer_down(ScreenPoint::new(0.0, 0.0)));

        let user = async {
            while !handle.is_open() {
                tokio::task::yield_now().await;
            }
            let prompt = handle.prompt().unwrap();
            assert_eq!(prompt.title, "Calibration");
            assert_eq!(prompt.default, "1.00");
            assert!(handle.submit("0,5"));
        };
        let (result, ()) = tokio::join!(editor.pointer_up(ScreenPoint::new(0.0, 100.0)), user);

        assert!(result.unwrap().is_some());
        assert!(!handle.is_open());
        assert_eq!(editor.session().scale().pixels_per_meter(), Some(200.0));
    }

    #[test]
    fn test_invalid_default_color_falls_back_to_red() {
        let editor = Editor::new(
            EngineConfig::default().with_default_color("rouge"),
            Scene::new(),
            ScriptedInput::default(),
            RecordingStore::default(),
            RecordingStatus::new(),
        );
        assert_eq!(editor.session().color(), Color::RED);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_sub_threshold_segments_commit_nothing(
            zoom in 0.25f32..4.0,
            fraction in 0.0f32..0.95,
            heading in -3.1f32..3.1,
            x in -500.0f32..500.0,
            y in -500.0f32..500.0,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let mut editor = editor(&[Some("1"), Some("1")]);
                editor.canvas_mut().set_zoom(zoom);
                let mut scale = ScaleModel::new();
                scale.set_from_calibration(100.0, 1.0, 1.0, 10.0).unwrap();
                editor.session.scale = scale;

                let length = fraction * editor.config().min_gesture_px / zoom;
                let p1 = CanvasPoint::new(x, y);
                let p2 = p1.offset(length * heading.cos(), length * heading.sin());

                let calibration = editor.finalize_calibration(p1, p2).await;
                let measurement = editor.finalize_measurement(p1, p2);
                let dimension = editor.finalize_dimension(p1, p2).await;

                for result in [calibration, measurement, dimension] {
                    assert!(matches!(result, Err(EditorError::GestureTooShort { .. })));
                }
                assert!(editor.input().titles.borrow().is_empty());
                assert!(editor.canvas().objects().is_empty());
                assert!(editor.current_page().unwrap().annotations().is_empty());
                assert_eq!(saves(&editor), 0);
                assert_eq!(editor.session().scale().pixels_per_meter(), Some(100.0));
            });
        }
    }
}
