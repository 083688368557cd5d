//! User input, independent of the terminal backend that produced it.

/// A user action, with positions in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Primary button pressed: start dragging the origin target
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    /// Secondary button pressed: recentre the origin target
    SecondaryDown,
    ToggleAlignment,
    IncreaseFalloff,
    DecreaseFalloff,
    ToggleRenderMode,
    ClearTrail,
    Quit,
    /// New surface size in pixels
    Resize { width: u32, height: u32 },
}

/// What the render loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Continue,
    Quit,
}
