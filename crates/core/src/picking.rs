//! Two-point picking state machine
//!
//! Tracks a segment gesture from the first pointer-down to the moment its
//! finalize routine completes. While armed, a single preview segment follows
//! the pointer; it is removed when the gesture completes or is reset.

use crate::geometry::CanvasPoint;
use crate::marker::{build_preview, update_preview, MarkerStyle};
use crate::scene::{Canvas, ObjectId};
use tracing::debug;

/// Progress of the current gesture
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PickingState {
    /// No gesture in progress
    #[default]
    Idle,
    /// First point captured, preview tracking the pointer
    Armed {
        start: CanvasPoint,
        preview: ObjectId,
    },
    /// Both points captured, finalize routine running
    Finalizing {
        start: CanvasPoint,
        end: CanvasPoint,
        preview: ObjectId,
    },
}

impl PickingState {
    pub fn is_idle(&self) -> bool {
        matches!(self, PickingState::Idle)
    }

    /// Whether a gesture has started and not yet completed
    pub fn in_progress(&self) -> bool {
        !self.is_idle()
    }

    /// First point of the current gesture
    pub fn start(&self) -> Option<CanvasPoint> {
        match self {
            PickingState::Idle => None,
            PickingState::Armed { start, .. } | PickingState::Finalizing { start, .. } => {
                Some(*start)
            }
        }
    }

    /// Id of the live preview segment
    pub fn preview(&self) -> Option<ObjectId> {
        match self {
            PickingState::Idle => None,
            PickingState::Armed { preview, .. } | PickingState::Finalizing { preview, .. } => {
                Some(*preview)
            }
        }
    }

    /// Capture the first point and show a preview
    ///
    /// Any previous gesture is reset first so its preview never leaks.
    pub fn arm<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        start: CanvasPoint,
        style: &MarkerStyle,
    ) {
        self.reset(canvas);
        let preview = build_preview(start, start, style, canvas.zoom());
        let id = preview.id;
        canvas.add(preview);
        canvas.request_render();
        debug!(x = start.x, y = start.y, "picking armed");
        *self = PickingState::Armed { start, preview: id };
    }

    /// Move the preview's free end; never commits anything
    ///
    /// Returns false when no gesture is armed.
    pub fn track<C: Canvas + ?Sized>(&mut self, canvas: &mut C, point: CanvasPoint) -> bool {
        let PickingState::Armed { preview, .. } = *self else {
            return false;
        };
        if let Some(object) = canvas.get_mut(preview) {
            update_preview(object, point);
        }
        canvas.request_render();
        true
    }

    /// Capture the second point and enter finalizing
    ///
    /// Returns both points, or `None` when no gesture is armed.
    pub fn finish<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        end: CanvasPoint,
    ) -> Option<(CanvasPoint, CanvasPoint)> {
        let PickingState::Armed { start, preview } = *self else {
            return None;
        };
        if let Some(object) = canvas.get_mut(preview) {
            update_preview(object, end);
        }
        *self = PickingState::Finalizing { start, end, preview };
        Some((start, end))
    }

    /// Drop the preview and any captured point, returning to idle
    pub fn reset<C: Canvas + ?Sized>(&mut self, canvas: &mut C) {
        if let Some(preview) = self.preview() {
            canvas.remove(preview);
            canvas.request_render();
            debug!("picking reset");
        }
        *self = PickingState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Color;
    use crate::config::EngineConfig;
    use crate::scene::{Scene, Shape};

    fn style() -> MarkerStyle {
        MarkerStyle::measurement(&EngineConfig::default(), Color::RED)
    }

    #[test]
    fn test_full_gesture() {
        let mut scene = Scene::new();
        let mut picking = PickingState::default();

        picking.arm(&mut scene, CanvasPoint::new(10.0, 10.0), &style());
        assert_eq!(scene.objects().len(), 1);
        assert!(!scene.objects()[0].selectable);
        assert_eq!(picking.start(), Some(CanvasPoint::new(10.0, 10.0)));

        assert!(picking.track(&mut scene, CanvasPoint::new(50.0, 10.0)));
        let preview = &scene.objects()[0];
        match &preview.shapes[0] {
            Shape::Segment { end, .. } => {
                assert_eq!(preview.to_canvas(*end), CanvasPoint::new(50.0, 10.0));
            }
            other => panic!("unexpected shape {other:?}"),
        }

        let points = picking.finish(&mut scene, CanvasPoint::new(60.0, 10.0)).unwrap();
        assert_eq!(points, (CanvasPoint::new(10.0, 10.0), CanvasPoint::new(60.0, 10.0)));
        assert!(matches!(picking, PickingState::Finalizing { .. }));
        assert!(!picking.track(&mut scene, CanvasPoint::new(0.0, 0.0)));

        picking.reset(&mut scene);
        assert!(picking.is_idle());
        assert!(scene.objects().is_empty());
    }

    #[test]
    fn test_rearming_does_not_leak_preview() {
        let mut scene = Scene::new();
        let mut picking = PickingState::default();
        picking.arm(&mut scene, CanvasPoint::new(0.0, 0.0), &style());
        picking.arm(&mut scene, CanvasPoint::new(5.0, 5.0), &style());
        assert_eq!(scene.objects().len(), 1);
        assert_eq!(picking.preview(), Some(scene.objects()[0].id));
    }

    #[test]
    fn test_finish_requires_armed() {
        let mut scene = Scene::new();
        let mut picking = PickingState::default();
        assert!(picking.finish(&mut scene, CanvasPoint::new(1.0, 1.0)).is_none());
        assert!(!picking.track(&mut scene, CanvasPoint::new(1.0, 1.0)));
        picking.reset(&mut scene);
        assert_eq!(scene.render_requests(), 0);
    }
}
