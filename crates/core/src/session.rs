//! Session state
//!
//! One [`Session`] exists per editing session. It is owned by the
//! [`Editor`](crate::editor::Editor) and passed explicitly to whatever needs
//! it.

use crate::annotation::Color;
use crate::picking::PickingState;
use crate::scale::ScaleModel;

/// Interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Pointer drags the view
    #[default]
    Pan,
    /// Next gesture traces the calibration segment
    SetScale,
    /// Next gesture measures a distance with the current scale
    Measure,
    /// Next gesture draws a manually declared dimension
    AnnotateLine,
    /// Next click places free text
    Text,
}

impl Mode {
    /// Modes whose gesture is a two-point segment
    pub fn is_segment_mode(&self) -> bool {
        matches!(self, Mode::SetScale | Mode::Measure | Mode::AnnotateLine)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Pan => "pan",
            Mode::SetScale => "set_scale",
            Mode::Measure => "measure",
            Mode::AnnotateLine => "annotate_line",
            Mode::Text => "text",
        }
    }
}

/// Mutable state of an editing session
///
/// A gesture in progress implies a segment mode; [`Session::set_mode`] is
/// only reachable through the editor, which resets picking on every mode
/// change.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) mode: Mode,
    pub(crate) color: Color,
    pub(crate) current_page: Option<usize>,
    pub(crate) scale: ScaleModel,
    pub(crate) picking: PickingState,
}

impl Session {
    pub fn new(color: Color) -> Self {
        Self {
            mode: Mode::Pan,
            color,
            current_page: None,
            scale: ScaleModel::new(),
            picking: PickingState::Idle,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn current_page(&self) -> Option<usize> {
        self.current_page
    }

    /// Scale of the current page
    pub fn scale(&self) -> &ScaleModel {
        &self.scale
    }

    pub fn picking(&self) -> &PickingState {
        &self.picking
    }

    /// Whether the session invariants hold
    pub fn is_consistent(&self) -> bool {
        let scale_ok = self.scale.pixels_per_meter().map_or(true, |ppm| ppm > 0.0);
        let picking_ok = self.picking.is_idle() || self.mode.is_segment_mode();
        scale_ok && picking_ok
    }
}
