//! Terminal draw surface: the trace drawn with braille sub-cell pixels.
//!
//! Every terminal cell holds a 2x4 braille pixel grid, so a surface of `cols x rows`
//! cells is `cols * 2` by `rows * 4` pixels. A braille cell can only carry one color;
//! the last primitive drawn into a cell wins, which is the newest part of the trace.

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Paragraph,
    },
};
use std::io::{self, Stdout};
use std::time::Duration;

use crate::scope::{DrawSurface, InputEvent, Point, Primitive, RecordingSurface, Rgb, TextRect};

const BG: Color = Color::Rgb(0, 0, 0);

/// Braille pixels per cell, horizontally and vertically.
const CELL_PX: (u32, u32) = (2, 4);

/// Pixel size of a `cols x rows` cell area.
pub fn pixels_for(cols: u16, rows: u16) -> (u32, u32) {
    (u32::from(cols) * CELL_PX.0, u32::from(rows) * CELL_PX.1)
}

/// Pixel at the middle of a cell.
pub fn cell_center(col: u16, row: u16) -> (f64, f64) {
    (
        f64::from(u32::from(col) * CELL_PX.0 + CELL_PX.0 / 2),
        f64::from(u32::from(row) * CELL_PX.1 + CELL_PX.1 / 2),
    )
}

/// Translates a crossterm event into a scope input event. Unbound events yield `None`.
pub fn translate(event: &Event) -> Option<InputEvent> {
    match event {
        Event::Key(key) => translate_key(key),
        Event::Mouse(mouse) => translate_mouse(mouse),
        Event::Resize(cols, rows) => {
            let (width, height) = pixels_for(*cols, *rows);
            Some(InputEvent::Resize { width, height })
        }
        _ => None,
    }
}

fn translate_key(key: &KeyEvent) -> Option<InputEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    Some(match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => InputEvent::Quit,
        KeyCode::Char('q') | KeyCode::Esc => InputEvent::Quit,
        KeyCode::Char('a') => InputEvent::ToggleAlignment,
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => InputEvent::IncreaseFalloff,
        KeyCode::Char('-') | KeyCode::Down => InputEvent::DecreaseFalloff,
        KeyCode::Char('m') => InputEvent::ToggleRenderMode,
        KeyCode::Char('c') => InputEvent::ClearTrail,
        _ => return None,
    })
}

fn translate_mouse(mouse: &MouseEvent) -> Option<InputEvent> {
    let (x, y) = cell_center(mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(InputEvent::PointerDown { x, y }),
        MouseEventKind::Drag(MouseButton::Left) => Some(InputEvent::PointerMove { x, y }),
        MouseEventKind::Up(MouseButton::Left) => Some(InputEvent::PointerUp),
        MouseEventKind::Down(MouseButton::Right) => Some(InputEvent::SecondaryDown),
        _ => None,
    }
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

/// Full-screen terminal surface with mouse capture.
///
/// Primitives are collected into a [`RecordingSurface`] and drawn in one pass on
/// [`present`](DrawSurface::present).
pub struct TerminalSurface {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    frame: RecordingSurface,
    active: bool,
}

impl TerminalSurface {
    /// Enters raw mode and the alternate screen.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled
    /// - If the alternate screen or mouse capture cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;

        Ok(Self {
            terminal,
            frame: RecordingSurface::default(),
            active: true,
        })
    }

    /// Current surface size in braille pixels.
    ///
    /// # Errors
    /// - If the terminal size cannot be queried
    pub fn pixel_size(&self) -> anyhow::Result<(u32, u32)> {
        let size = self.terminal.size()?;
        Ok(pixels_for(size.width, size.height))
    }

    /// Appends every pending input event to `out` without blocking.
    ///
    /// # Errors
    /// - If reading terminal events fails
    pub fn poll_events(&mut self, out: &mut Vec<InputEvent>) -> anyhow::Result<()> {
        while event::poll(Duration::ZERO)? {
            let event = event::read()?;
            if let Some(input) = translate(&event) {
                out.push(input);
            }
        }
        Ok(())
    }

    /// Restores the terminal. Safe to call more than once.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl DrawSurface for TerminalSurface {
    fn begin_frame(&mut self) {
        self.frame.begin_frame();
    }

    fn draw_polyline(&mut self, points: &[Point], color: Rgb) {
        self.frame.draw_polyline(points, color);
    }

    fn draw_segment(&mut self, from: Point, to: Point, color: Rgb) {
        self.frame.draw_segment(from, to, color);
    }

    fn draw_pixel(&mut self, point: Point, color: Rgb) {
        self.frame.draw_pixel(point, color);
    }

    fn draw_text(&mut self, text: &str, rect: TextRect, color: Rgb) {
        self.frame.draw_text(text, rect, color);
    }

    fn present(&mut self) -> anyhow::Result<()> {
        let primitives = &self.frame.primitives;

        self.terminal.draw(|frame| {
            let area = frame.area();
            let (width, height) = pixels_for(area.width, area.height);
            // Canvas y grows upward, surface y grows downward.
            let top = f64::from(height.saturating_sub(1));
            let flip = |p: &Point| (f64::from(p.x), top - f64::from(p.y));

            let canvas = Canvas::default()
                .marker(Marker::Braille)
                .background_color(BG)
                .x_bounds([0.0, f64::from(width.saturating_sub(1))])
                .y_bounds([0.0, top])
                .paint(|ctx| {
                    for primitive in primitives {
                        match primitive {
                            Primitive::Polyline { points, color: rgb } => {
                                for pair in points.windows(2) {
                                    let (x1, y1) = flip(&pair[0]);
                                    let (x2, y2) = flip(&pair[1]);
                                    ctx.draw(&CanvasLine::new(x1, y1, x2, y2, color(*rgb)));
                                }
                            }
                            Primitive::Segment {
                                from,
                                to,
                                color: rgb,
                            } => {
                                let (x1, y1) = flip(from);
                                let (x2, y2) = flip(to);
                                ctx.draw(&CanvasLine::new(x1, y1, x2, y2, color(*rgb)));
                            }
                            Primitive::Pixel { point, color: rgb } => {
                                ctx.draw(&Points {
                                    coords: &[flip(point)],
                                    color: color(*rgb),
                                });
                            }
                            Primitive::Text { .. } => {}
                        }
                    }
                });
            frame.render_widget(canvas, area);

            for primitive in primitives {
                if let Primitive::Text {
                    text,
                    rect,
                    color: rgb,
                } = primitive
                {
                    let cells = Rect {
                        x: (rect.x / CELL_PX.0) as u16,
                        y: (rect.y / CELL_PX.1) as u16,
                        width: (rect.width / CELL_PX.0).max(1) as u16,
                        height: (rect.height / CELL_PX.1).max(1) as u16,
                    }
                    .intersection(area);
                    let paragraph = Paragraph::new(text.as_str())
                        .style(Style::default().fg(color(*rgb)).bg(BG));
                    frame.render_widget(paragraph, cells);
                }
            }
        })?;

        self.frame.present()
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(translate(&key(KeyCode::Char('q'))), Some(InputEvent::Quit));
        assert_eq!(translate(&key(KeyCode::Esc)), Some(InputEvent::Quit));
        assert_eq!(
            translate(&Event::Key(KeyEvent::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL
            ))),
            Some(InputEvent::Quit)
        );
        assert_eq!(translate(&key(KeyCode::Char('c'))), Some(InputEvent::ClearTrail));
        assert_eq!(translate(&key(KeyCode::Char('a'))), Some(InputEvent::ToggleAlignment));
        assert_eq!(translate(&key(KeyCode::Char('m'))), Some(InputEvent::ToggleRenderMode));
        for code in [KeyCode::Char('+'), KeyCode::Char('='), KeyCode::Up] {
            assert_eq!(translate(&key(code)), Some(InputEvent::IncreaseFalloff));
        }
        for code in [KeyCode::Char('-'), KeyCode::Down] {
            assert_eq!(translate(&key(code)), Some(InputEvent::DecreaseFalloff));
        }
        assert_eq!(translate(&key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(translate(&release), None);
    }

    #[test]
    fn test_mouse_maps_to_cell_centre() {
        assert_eq!(
            translate(&mouse(MouseEventKind::Down(MouseButton::Left), 10, 5)),
            Some(InputEvent::PointerDown { x: 21.0, y: 22.0 })
        );
        assert_eq!(
            translate(&mouse(MouseEventKind::Drag(MouseButton::Left), 0, 0)),
            Some(InputEvent::PointerMove { x: 1.0, y: 2.0 })
        );
        assert_eq!(
            translate(&mouse(MouseEventKind::Up(MouseButton::Left), 3, 3)),
            Some(InputEvent::PointerUp)
        );
        assert_eq!(
            translate(&mouse(MouseEventKind::Down(MouseButton::Right), 3, 3)),
            Some(InputEvent::SecondaryDown)
        );
        assert_eq!(translate(&mouse(MouseEventKind::Moved, 3, 3)), None);
    }

    #[test]
    fn test_resize_in_pixels() {
        assert_eq!(
            translate(&Event::Resize(80, 24)),
            Some(InputEvent::Resize {
                width: 160,
                height: 96
            })
        );
        assert_eq!(pixels_for(0, 0), (0, 0));
    }
}
