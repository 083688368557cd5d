//! View parameters shared between the render loop and the capture thread.
//!
//! Every field is an independent atomic. The capture thread may observe a slightly
//! stale origin or a scale from before a resize; these are value toggles, not
//! composite invariants, so `Relaxed` loads are enough.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use super::point::TransformParams;

pub const MIN_EXPONENT: f64 = 0.0;
pub const MAX_EXPONENT: f64 = 50.0;

/// `f64` stored as its bit pattern.
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Scale for a surface: `k / max(1, min(width, height))`.
pub fn scale_for(scale_constant: f64, width: u32, height: u32) -> f64 {
    scale_constant / f64::from(width.min(height).max(1))
}

pub struct ViewState {
    origin_x: AtomicF64,
    origin_y: AtomicF64,
    scale: AtomicF64,
    scale_constant: f64,
    align_vertical: AtomicBool,
    brightness_exponent: AtomicF64,
    width: AtomicU32,
    height: AtomicU32,
}

impl ViewState {
    /// Creates a view for a `width` x `height` pixel surface with the origin at its centre.
    pub fn new(
        width: u32,
        height: u32,
        scale_constant: f64,
        brightness_exponent: f64,
        align_vertical: bool,
    ) -> Self {
        Self {
            origin_x: AtomicF64::new(f64::from(width) / 2.0),
            origin_y: AtomicF64::new(f64::from(height) / 2.0),
            scale: AtomicF64::new(scale_for(scale_constant, width, height)),
            scale_constant,
            align_vertical: AtomicBool::new(align_vertical),
            brightness_exponent: AtomicF64::new(
                brightness_exponent.clamp(MIN_EXPONENT, MAX_EXPONENT),
            ),
            width: AtomicU32::new(width),
            height: AtomicU32::new(height),
        }
    }

    /// Parameters for transforming the next sample frame.
    pub fn transform_params(&self) -> TransformParams {
        TransformParams {
            origin: self.origin(),
            scale: self.scale(),
            align_vertical: self.align_vertical(),
        }
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.origin_x.load(), self.origin_y.load())
    }

    pub fn set_origin(&self, origin: (f64, f64)) {
        self.origin_x.store(origin.0);
        self.origin_y.store(origin.1);
    }

    pub fn scale(&self) -> f64 {
        self.scale.load()
    }

    pub fn size(&self) -> (u32, u32) {
        (
            self.width.load(Ordering::Relaxed),
            self.height.load(Ordering::Relaxed),
        )
    }

    pub fn center(&self) -> (f64, f64) {
        let (width, height) = self.size();
        (f64::from(width) / 2.0, f64::from(height) / 2.0)
    }

    /// Records a new surface size and recomputes the scale. Zero dimensions are allowed.
    pub fn resize(&self, width: u32, height: u32) {
        self.width.store(width, Ordering::Relaxed);
        self.height.store(height, Ordering::Relaxed);
        self.scale
            .store(scale_for(self.scale_constant, width, height));
    }

    pub fn align_vertical(&self) -> bool {
        self.align_vertical.load(Ordering::Relaxed)
    }

    /// Flips the alignment mode and returns the new value.
    pub fn toggle_align_vertical(&self) -> bool {
        !self.align_vertical.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn brightness_exponent(&self) -> f64 {
        self.brightness_exponent.load()
    }

    /// Adds `delta` to the falloff exponent, clamped to `[0, 50]`. Returns the new value.
    pub fn adjust_exponent(&self, delta: f64) -> f64 {
        let next = (self.brightness_exponent() + delta).clamp(MIN_EXPONENT, MAX_EXPONENT);
        self.brightness_exponent.store(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_origin_is_center() {
        let view = ViewState::new(200, 100, 2.0, 6.0, false);
        assert_eq!(view.origin(), (100.0, 50.0));
        assert_eq!(view.center(), (100.0, 50.0));
        assert_eq!(view.scale(), 0.02);
    }

    #[test]
    fn test_resize_to_zero_does_not_divide_by_zero() {
        let view = ViewState::new(200, 100, 2.0, 6.0, false);

        view.resize(0, 480);
        assert_eq!(view.scale(), 2.0);
        assert!(view.scale().is_finite());

        view.resize(640, 0);
        assert_eq!(view.scale(), 2.0);

        view.resize(640, 480);
        assert_eq!(view.scale(), 2.0 / 480.0);
        assert_eq!(view.size(), (640, 480));
    }

    #[test]
    fn test_full_scale_reaches_inverse_constant_of_shorter_side() {
        use crate::scope::point::{transform, SampleFrame};

        // Shorter side 400: k = 4 reaches 100 px, k = 2 reaches 200 px
        let view = ViewState::new(800, 400, 4.0, 6.0, false);
        let p = transform(SampleFrame::new(1.0, 0.0), &view.transform_params());
        assert_eq!(p.x - 400, 100);

        let view = ViewState::new(800, 400, 2.0, 6.0, false);
        let p = transform(SampleFrame::new(0.0, -1.0), &view.transform_params());
        assert_eq!(p.y - 200, 200);
    }

    #[test]
    fn test_exponent_is_clamped() {
        let view = ViewState::new(10, 10, 2.0, 49.5, false);
        assert_eq!(view.adjust_exponent(1.0), 50.0);
        assert_eq!(view.adjust_exponent(1.0), 50.0);

        let view = ViewState::new(10, 10, 2.0, 0.5, false);
        assert_eq!(view.adjust_exponent(-1.0), 0.0);

        let view = ViewState::new(10, 10, 2.0, 80.0, false);
        assert_eq!(view.brightness_exponent(), 50.0);
    }

    #[test]
    fn test_toggle_alignment_reaches_transform_params() {
        let view = ViewState::new(10, 10, 2.0, 6.0, false);
        assert!(!view.transform_params().align_vertical);
        assert!(view.toggle_align_vertical());
        assert!(view.transform_params().align_vertical);
        assert!(!view.toggle_align_vertical());
    }
}
