//! Render resolution management.
//!
//! Tracks the canvas size and device pixel ratio, and lowers the pixel ratio
//! while the camera is being dragged so interaction stays smooth.

/// Interaction-driven pixel ratio state machine with a debounced restore.
pub mod adaptive;

/// Offscreen image sized by the viewport's physical size.
pub mod render_target;

/// Viewport size resource and resize handling.
pub mod viewport;
