//! Full-screen error display for failures that happen before the scope starts.

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::time::Duration;

const ERROR_BG: Color = Color::Rgb(120, 0, 40);
const ERROR_FG: Color = Color::Rgb(255, 255, 255);
const HINT_FG: Color = Color::Rgb(255, 170, 210);

/// Builds the lines shown on the error screen: title, blank line, message, hint.
fn error_lines<'a>(title: &'a str, message: &'a str) -> Vec<Line<'a>> {
    let mut lines = vec![
        Line::from(Span::styled(title, Style::default().fg(ERROR_FG).bold())),
        Line::default(),
    ];
    lines.extend(message.lines().map(|l| Line::from(Span::raw(l))));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Press any key to exit",
        Style::default().fg(HINT_FG),
    )));
    lines
}

/// Error screen with centered text on a solid background.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl ErrorScreen {
    /// Creates a new error screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(ErrorScreen { terminal })
    }

    /// Shows `title` and `message` until a key is pressed.
    ///
    /// # Errors
    /// - If terminal rendering or event polling fails
    pub fn show(&mut self, title: &str, message: &str) -> anyhow::Result<()> {
        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();
                frame.render_widget(Block::default().style(Style::default().bg(ERROR_BG)), area);

                let lines = error_lines(title, message);
                let text_height = (lines.len() as u16).min(area.height);
                let text_area = Rect {
                    x: area.x + area.width / 10,
                    y: area.y + area.height.saturating_sub(text_height) / 2,
                    width: area.width * 8 / 10,
                    height: area.height - area.height.saturating_sub(text_height) / 2,
                };

                let paragraph = Paragraph::new(lines)
                    .style(Style::default().fg(ERROR_FG).bg(ERROR_BG))
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, text_area);
            })?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Restores the terminal.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_lines_layout() {
        let lines = error_lines("Configuration Error", "line one\nline two");
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0].to_string(), "Configuration Error");
        assert_eq!(lines[2].to_string(), "line one");
        assert_eq!(lines[3].to_string(), "line two");
        assert_eq!(lines[5].to_string(), "Press any key to exit");
    }
}
