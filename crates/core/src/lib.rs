//! Field Plan Core Library
//!
//! Plan calibration and measurement engine: scale model, segment picking,
//! dimension markers, prompt collection and export compositing.

pub mod annotation;
pub mod config;
pub mod document;
pub mod editor;
pub mod export;
pub mod geometry;
pub mod input;
pub mod marker;
pub mod pdf_export;
pub mod persistence;
pub mod picking;
pub mod scale;
pub mod scale_detection;
pub mod scene;
pub mod session;
pub mod source;
pub mod status;

pub use annotation::{Annotation, AnnotationAnchor, AnnotationId, AnnotationKind, Color};
pub use config::{ConfigError, EngineConfig};
pub use document::{Document, DocumentError, DocumentResult, Page, PageBackground};
pub use editor::{Editor, EditorError, EditorResult};
pub use export::{export_page, render_page, ExportError, ExportFormat, ExportResult};
pub use geometry::{distance, CanvasPoint, ScreenPoint};
pub use input::{InputCollector, InputError, InputResult, ModalInput, Prompt, PromptKind};
pub use marker::{build_marker, build_text, format_meters, MarkerStyle};
pub use persistence::{load_page_file, JsonPageStore, NullPageStore, PageStore, StoreError};
pub use picking::PickingState;
pub use scale::{ScaleError, ScaleModel, ScaleResult, ScaleSource};
pub use scale_detection::{best_scale_notation, detect_scale_notation, DetectedScale};
pub use scene::{Canvas, ObjectId, Scene, SceneObject, Shape, StrokeSpec};
pub use session::{Mode, Session};
pub use source::{BlankPageSource, ImagePageSource, PageSource, SourceError};
pub use status::{LogStatus, RecordingStatus, Severity, StatusSink};
