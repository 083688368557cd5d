//! Terminal front end: the braille scope surface and the error screen.

pub mod error;
pub mod terminal;

pub use error::ErrorScreen;
pub use terminal::TerminalSurface;
