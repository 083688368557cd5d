//! Stereo sample to screen point mapping.
//!
//! Left drives the horizontal axis, the negated right channel drives the vertical
//! axis (screen y grows downward, so a positive right sample moves the trace up).

/// A point in draw-surface pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point, in pixels.
    pub fn distance(self, other: Point) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}

/// One stereo sample pair, conceptually in `[-1, 1]` per channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleFrame {
    pub left: f32,
    pub right: f32,
}

impl SampleFrame {
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

/// View parameters consumed by [`transform`], read from the shared view once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub origin: (f64, f64),
    /// Sample units per pixel. Always positive.
    pub scale: f64,
    /// Cancels the common-mode signal so correlated content collapses to a vertical line.
    pub align_vertical: bool,
}

/// Maps one stereo frame to a surface point.
pub fn transform(frame: SampleFrame, params: &TransformParams) -> Point {
    let left = f64::from(frame.left);
    let right = f64::from(frame.right);

    let (dx, dy) = if params.align_vertical {
        (left - right, -right - left)
    } else {
        (left, -right)
    };

    let x = params.origin.0 + dx / params.scale;
    let y = params.origin.1 + dy / params.scale;

    // `as` saturates, NaN maps to 0
    Point::new(x.round() as i32, y.round() as i32)
}
