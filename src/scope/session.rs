//! Render-loop side of the scope: input handling and one frame per tick.

use std::sync::Arc;

use crate::capture::{CaptureReport, CaptureState};
use crate::config::DisplayConfig;

use super::history::PointHistory;
use super::input::{InputEvent, InputOutcome};
use super::origin::OriginController;
use super::point::Point;
use super::render::{DrawSurface, Renderer, Rgb, TextRect};
use super::view::ViewState;

const STATUS_COLOR: Rgb = Rgb(185, 207, 212);
const DEGRADED_COLOR: Rgb = Rgb(255, 60, 60);

/// Height of the status line in surface pixels (one terminal row of braille).
const STATUS_HEIGHT: u32 = 4;

/// Everything the render loop owns: origin easing, renderer and snapshot buffer.
///
/// The point history and view are shared with the capture thread.
pub struct ScopeSession {
    history: Arc<PointHistory>,
    view: Arc<ViewState>,
    origin: OriginController,
    renderer: Renderer,
    exponent_step: f64,
    snapshot: Vec<Point>,
    frames: u64,
}

impl ScopeSession {
    pub fn new(history: Arc<PointHistory>, view: Arc<ViewState>, display: &DisplayConfig) -> Self {
        let origin = OriginController::new(&view, display.origin_smoothing);
        let snapshot = Vec::with_capacity(history.capacity());
        Self {
            history,
            view,
            origin,
            renderer: Renderer::new(
                display.render_mode,
                display.bands,
                display.slew_damping,
                Rgb::from(display.color),
            ),
            exponent_step: display.exponent_step,
            snapshot,
            frames: 0,
        }
    }

    pub fn handle(&mut self, event: InputEvent) -> InputOutcome {
        match event {
            InputEvent::PointerDown { x, y } => self.origin.pointer_down(x, y),
            InputEvent::PointerMove { x, y } => self.origin.pointer_move(x, y),
            InputEvent::PointerUp => self.origin.pointer_up(),
            InputEvent::SecondaryDown => self.origin.secondary_down(&self.view),
            InputEvent::ToggleAlignment => {
                let aligned = self.view.toggle_align_vertical();
                tracing::debug!("Vertical alignment {}", if aligned { "on" } else { "off" });
            }
            InputEvent::IncreaseFalloff => {
                let exponent = self.view.adjust_exponent(self.exponent_step);
                tracing::debug!("Brightness exponent: {exponent}");
            }
            InputEvent::DecreaseFalloff => {
                let exponent = self.view.adjust_exponent(-self.exponent_step);
                tracing::debug!("Brightness exponent: {exponent}");
            }
            InputEvent::ToggleRenderMode => {
                let mode = self.renderer.toggle_mode();
                tracing::debug!("Render mode: {mode}");
            }
            InputEvent::ClearTrail => {
                self.history.clear();
                tracing::debug!("Trail cleared");
            }
            InputEvent::Resize { width, height } => {
                self.view.resize(width, height);
                self.origin.resize(&self.view);
                tracing::debug!("Surface resized to {width}x{height}px");
            }
            InputEvent::Quit => return InputOutcome::Quit,
        }
        InputOutcome::Continue
    }

    /// Draws one frame: eases the origin, snapshots the history, renders the trace and
    /// the status line, then presents.
    ///
    /// # Errors
    /// - If the surface fails to present the frame
    pub fn tick(&mut self, surface: &mut dyn DrawSurface, capture: &CaptureReport) -> anyhow::Result<()> {
        self.origin.update(&self.view);

        // The lock is held only while copying.
        self.history.snapshot_into(&mut self.snapshot);

        surface.begin_frame();
        self.renderer
            .render(&self.snapshot, self.view.brightness_exponent(), surface);

        let (width, _) = self.view.size();
        let rect = TextRect {
            x: 0,
            y: 0,
            width,
            height: STATUS_HEIGHT,
        };
        let color = if capture.is_degraded() {
            DEGRADED_COLOR
        } else {
            STATUS_COLOR
        };
        surface.draw_text(&self.status_line(capture), rect, color);

        surface.present()?;
        self.frames += 1;
        Ok(())
    }

    /// One-line summary of the trail and capture health.
    pub fn status_line(&self, capture: &CaptureReport) -> String {
        let last = match self.snapshot.last() {
            Some(point) => format!("({}, {})", point.x, point.y),
            None => "-".to_string(),
        };
        let trail = format!(
            "{}/{} pts · {} total · last {} · falloff {:.1} · {} · align {}",
            self.snapshot.len(),
            self.history.capacity(),
            self.history.total_pushed(),
            last,
            self.view.brightness_exponent(),
            self.renderer.mode(),
            if self.view.align_vertical() { "on" } else { "off" },
        );

        let health = match (&capture.fault, capture.state) {
            (Some(fault), _) => format!("capture stopped: {fault}"),
            (None, CaptureState::Capturing) => capture
                .source
                .clone()
                .unwrap_or_else(|| "capturing".to_string()),
            (None, state) => state.to_string(),
        };

        format!("{trail} · {health}")
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
impl ScopeSession {
    fn origin(&self) -> &OriginController {
        &self.origin
    }
}
