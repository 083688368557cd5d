//! The sample-to-trace pipeline: point transform, bounded history, view state and
//! the age-faded renderer.
//!
//! # Data flow
//! - capture thread: frame → [`transform`] → [`PointHistory::extend`]
//! - render loop: [`OriginController::update`] → [`PointHistory::snapshot_into`] →
//!   [`Renderer::render`] → [`DrawSurface::present`]

pub mod brightness;
pub mod history;
pub mod input;
pub mod origin;
pub mod point;
pub mod render;
pub mod session;
pub mod view;

pub use history::PointHistory;
pub use input::{InputEvent, InputOutcome};
pub use origin::OriginController;
pub use point::{transform, Point, SampleFrame, TransformParams};
pub use render::{DrawSurface, Primitive, RecordingSurface, Renderer, Rgb, TextRect};
pub use session::ScopeSession;
pub use view::ViewState;
