//! Draw-surface abstraction and the phosphor trace renderer.
//!
//! The renderer turns an ordered snapshot (oldest first) into colored polylines and
//! pixels. Two strategies are available:
//!
//! - **Banded**: a fixed number of contiguous age bands, one polyline per band in one
//!   color. Few draw calls, piecewise-constant brightness.
//! - **Segments**: one segment per consecutive pair with its own brightness, dimmed
//!   further by the jump length. Exact brightness, one draw call per point.

use crate::config::RenderMode;

use super::brightness::{age, brightness, is_visible, slew_attenuation};
use super::point::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Scales every channel linearly by `factor` in `[0, 1]`.
    pub fn scaled(self, factor: f64) -> Rgb {
        let factor = factor.clamp(0.0, 1.0);
        let channel = |c: u8| (f64::from(c) * factor).round() as u8;
        Rgb(channel(self.0), channel(self.1), channel(self.2))
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(c: [u8; 3]) -> Self {
        Rgb(c[0], c[1], c[2])
    }
}

/// Placement of a text overlay, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Anything that can display one frame of colored primitives.
///
/// A frame is bracketed by [`begin_frame`](Self::begin_frame), which clears the
/// background, and [`present`](Self::present).
pub trait DrawSurface {
    fn begin_frame(&mut self);
    fn draw_polyline(&mut self, points: &[Point], color: Rgb);
    fn draw_segment(&mut self, from: Point, to: Point, color: Rgb);
    fn draw_pixel(&mut self, point: Point, color: Rgb);
    fn draw_text(&mut self, text: &str, rect: TextRect, color: Rgb);
    fn present(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Polyline { points: Vec<Point>, color: Rgb },
    Segment { from: Point, to: Point, color: Rgb },
    Pixel { point: Point, color: Rgb },
    Text { text: String, rect: TextRect, color: Rgb },
}

/// Surface that keeps the primitives of the current frame in memory.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub primitives: Vec<Primitive>,
    pub frames_presented: u64,
}

impl DrawSurface for RecordingSurface {
    fn begin_frame(&mut self) {
        self.primitives.clear();
    }

    fn draw_polyline(&mut self, points: &[Point], color: Rgb) {
        self.primitives.push(Primitive::Polyline {
            points: points.to_vec(),
            color,
        });
    }

    fn draw_segment(&mut self, from: Point, to: Point, color: Rgb) {
        self.primitives.push(Primitive::Segment { from, to, color });
    }

    fn draw_pixel(&mut self, point: Point, color: Rgb) {
        self.primitives.push(Primitive::Pixel { point, color });
    }

    fn draw_text(&mut self, text: &str, rect: TextRect, color: Rgb) {
        self.primitives.push(Primitive::Text {
            text: text.to_string(),
            rect,
            color,
        });
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.frames_presented += 1;
        Ok(())
    }
}

/// Renders point snapshots with an age-based brightness falloff.
#[derive(Debug, Clone)]
pub struct Renderer {
    mode: RenderMode,
    bands: usize,
    slew_damping: f64,
    color: Rgb,
}

impl Renderer {
    pub fn new(mode: RenderMode, bands: usize, slew_damping: f64, color: Rgb) -> Self {
        Self {
            mode,
            bands: bands.max(1),
            slew_damping,
            color,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Switches between banded and per-segment drawing. Returns the new mode.
    pub fn toggle_mode(&mut self) -> RenderMode {
        self.mode = match self.mode {
            RenderMode::Banded => RenderMode::Segments,
            RenderMode::Segments => RenderMode::Banded,
        };
        self.mode
    }

    /// Draws `points` (oldest first) onto `surface`. Returns the number of primitives drawn.
    ///
    /// Does not begin or present the frame; the caller brackets it so overlays can
    /// share the frame.
    pub fn render(&self, points: &[Point], exponent: f64, surface: &mut dyn DrawSurface) -> usize {
        match points {
            [] => 0,
            [only] => {
                surface.draw_pixel(*only, self.color);
                1
            }
            _ => match self.mode {
                RenderMode::Banded => self.render_banded(points, exponent, surface),
                RenderMode::Segments => self.render_segments(points, exponent, surface),
            },
        }
    }

    fn render_banded(&self, points: &[Point], exponent: f64, surface: &mut dyn DrawSurface) -> usize {
        let count = points.len();
        let bands = self.bands.min(count);
        let mut drawn = 0;

        for band in 0..bands {
            let start = band * count / bands;
            let end = (band + 1) * count / bands;

            // Brightness of the band's newest point; older bands come first and are dimmer.
            let level = brightness(age(end - 1, count), exponent);
            if !is_visible(level) {
                continue;
            }
            let color = self.color.scaled(level);

            // Start on the previous band's last point so the trace has no gaps.
            let slice = &points[start.saturating_sub(1)..end];
            if slice.len() == 1 {
                surface.draw_pixel(slice[0], color);
            } else {
                surface.draw_polyline(slice, color);
            }
            drawn += 1;
        }

        drawn
    }

    fn render_segments(&self, points: &[Point], exponent: f64, surface: &mut dyn DrawSurface) -> usize {
        let count = points.len();
        let mut drawn = 0;

        for (i, pair) in points.windows(2).enumerate() {
            let (from, to) = (pair[0], pair[1]);
            let level = brightness(age(i + 1, count), exponent)
                * slew_attenuation(from.distance(to), self.slew_damping);
            if !is_visible(level) {
                continue;
            }
            let color = self.color.scaled(level);

            if from == to {
                surface.draw_pixel(to, color);
            } else {
                surface.draw_segment(from, to, color);
            }
            drawn += 1;
        }

        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Rgb = Rgb(255, 35, 200);

    fn line(n: i32) -> Vec<Point> {
        (0..n).map(|i| Point::new(i, 0)).collect()
    }

    fn colors(surface: &RecordingSurface) -> Vec<Rgb> {
        surface
            .primitives
            .iter()
            .map(|p| match p {
                Primitive::Polyline { color, .. }
                | Primitive::Segment { color, .. }
                | Primitive::Pixel { color, .. }
                | Primitive::Text { color, .. } => *color,
            })
            .collect()
    }

    #[test]
    fn test_scaled_color() {
        assert_eq!(BASE.scaled(1.0), BASE);
        assert_eq!(BASE.scaled(0.0), Rgb(0, 0, 0));
        assert_eq!(Rgb(200, 100, 50).scaled(0.5), Rgb(100, 50, 25));
        assert_eq!(BASE.scaled(7.0), BASE);
    }

    #[test]
    fn test_empty_and_single_point() {
        let renderer = Renderer::new(RenderMode::Banded, 256, 24.0, BASE);
        let mut surface = RecordingSurface::default();
        assert_eq!(renderer.render(&[], 6.0, &mut surface), 0);
        assert!(surface.primitives.is_empty());

        assert_eq!(renderer.render(&[Point::new(4, 5)], 6.0, &mut surface), 1);
        assert_eq!(
            surface.primitives,
            vec![Primitive::Pixel {
                point: Point::new(4, 5),
                color: BASE
            }]
        );
    }

    #[test]
    fn test_banded_covers_every_point_contiguously() {
        let renderer = Renderer::new(RenderMode::Banded, 4, 0.0, BASE);
        let points = line(10);
        let mut surface = RecordingSurface::default();
        let drawn = renderer.render(&points, 0.0, &mut surface);
        assert_eq!(drawn, 4);

        let mut covered = Vec::new();
        for primitive in &surface.primitives {
            match primitive {
                Primitive::Polyline { points, .. } => {
                    if let Some(last) = covered.last() {
                        assert_eq!(points.first(), Some(last), "band is not joined");
                        covered.extend_from_slice(&points[1..]);
                    } else {
                        covered.extend_from_slice(points);
                    }
                }
                other => panic!("unexpected primitive {other:?}"),
            }
        }
        assert_eq!(covered, points);
    }

    #[test]
    fn test_banded_newest_band_is_brightest() {
        let renderer = Renderer::new(RenderMode::Banded, 8, 0.0, BASE);
        let mut surface = RecordingSurface::default();
        renderer.render(&line(64), 2.0, &mut surface);

        let colors = colors(&surface);
        assert_eq!(*colors.last().unwrap(), BASE);
        for pair in colors.windows(2) {
            assert!(pair[0].0 <= pair[1].0);
        }
    }

    #[test]
    fn test_banded_caps_band_count_at_point_count() {
        let renderer = Renderer::new(RenderMode::Banded, 256, 0.0, BASE);
        let mut surface = RecordingSurface::default();
        assert_eq!(renderer.render(&line(5), 0.0, &mut surface), 5);
        assert!(matches!(surface.primitives[0], Primitive::Pixel { .. }));
    }

    #[test]
    fn test_high_exponent_hides_old_bands() {
        let renderer = Renderer::new(RenderMode::Banded, 16, 0.0, BASE);
        let mut surface = RecordingSurface::default();
        let drawn = renderer.render(&line(1600), 50.0, &mut surface);
        assert!(drawn >= 1);
        assert!(drawn < 16);
    }

    #[test]
    fn test_segments_draw_one_primitive_per_pair() {
        let renderer = Renderer::new(RenderMode::Segments, 256, 0.0, BASE);
        let mut surface = RecordingSurface::default();
        let drawn = renderer.render(&line(6), 0.0, &mut surface);
        assert_eq!(drawn, 5);
        assert_eq!(
            surface.primitives[4],
            Primitive::Segment {
                from: Point::new(4, 0),
                to: Point::new(5, 0),
                color: BASE
            }
        );
        assert!(surface
            .primitives
            .iter()
            .all(|p| matches!(p, Primitive::Segment { .. })));
    }

    #[test]
    fn test_segments_repeated_point_is_a_pixel() {
        let renderer = Renderer::new(RenderMode::Segments, 256, 0.0, BASE);
        let mut surface = RecordingSurface::default();
        renderer.render(&[Point::new(1, 1), Point::new(1, 1)], 0.0, &mut surface);
        assert_eq!(
            surface.primitives,
            vec![Primitive::Pixel {
                point: Point::new(1, 1),
                color: BASE
            }]
        );
    }

    #[test]
    fn test_segments_dampen_long_jumps() {
        let renderer = Renderer::new(RenderMode::Segments, 256, 10.0, BASE);
        let mut surface = RecordingSurface::default();
        let points = [Point::new(0, 0), Point::new(1, 0), Point::new(500, 0)];
        let drawn = renderer.render(&points, 0.0, &mut surface);

        // exp(-499 / 10) is far below the visibility threshold
        assert_eq!(drawn, 1);
        assert_eq!(colors(&surface), vec![BASE.scaled((-0.1f64).exp())]);
    }

    #[test]
    fn test_toggle_mode() {
        let mut renderer = Renderer::new(RenderMode::Banded, 256, 0.0, BASE);
        assert_eq!(renderer.toggle_mode(), RenderMode::Segments);
        assert_eq!(renderer.mode(), RenderMode::Segments);
        assert_eq!(renderer.toggle_mode(), RenderMode::Banded);
    }

    #[test]
    fn test_recording_surface_frame_bracketing() {
        let mut surface = RecordingSurface::default();
        surface.draw_pixel(Point::new(0, 0), BASE);
        surface.begin_frame();
        assert!(surface.primitives.is_empty());
        surface.present().unwrap();
        assert_eq!(surface.frames_presented, 1);
    }
}
