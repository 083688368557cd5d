//! Eased drawing origin that follows the user's pointer.

use super::view::ViewState;

/// Moves the drawing origin a fixed fraction toward the cursor target every render tick.
///
/// Owned by the render loop. The capture thread only sees the result through
/// [`ViewState::origin`].
#[derive(Debug, Clone)]
pub struct OriginController {
    origin: (f64, f64),
    target: (f64, f64),
    smoothing: f64,
    dragging: bool,
}

impl OriginController {
    /// Starts at rest on the view's current origin. `smoothing` is clamped to `(0, 1]`.
    pub fn new(view: &ViewState, smoothing: f64) -> Self {
        let origin = view.origin();
        Self {
            origin,
            target: origin,
            smoothing: smoothing.clamp(f64::EPSILON, 1.0),
            dragging: false,
        }
    }

    /// Advances one tick and publishes the new origin. Call before rendering the tick.
    pub fn update(&mut self, view: &ViewState) {
        let f = self.smoothing;
        self.origin = (
            self.origin.0 * (1.0 - f) + self.target.0 * f,
            self.origin.1 * (1.0 - f) + self.target.1 * f,
        );
        view.set_origin(self.origin);
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.dragging = true;
        self.target = (x, y);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if self.dragging {
            self.target = (x, y);
        }
    }

    /// Ends the drag. The target stays where the pointer was last seen.
    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    /// Sends the target back to the centre of the surface.
    pub fn secondary_down(&mut self, view: &ViewState) {
        self.target = view.center();
    }

    /// Keeps origin and target inside the surface after it changed size.
    pub fn resize(&mut self, view: &ViewState) {
        let (width, height) = view.size();
        let clamp = |(x, y): (f64, f64)| {
            (
                x.clamp(0.0, f64::from(width)),
                y.clamp(0.0, f64::from(height)),
            )
        };
        self.origin = clamp(self.origin);
        self.target = clamp(self.target);
        view.set_origin(self.origin);
    }
}

#[cfg(test)]
impl OriginController {
    fn origin(&self) -> (f64, f64) {
        self.origin
    }

    pub(crate) fn target(&self) -> (f64, f64) {
        self.target
    }
}
