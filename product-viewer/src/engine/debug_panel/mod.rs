//! Developer panel for live tuning of the post-processing chain.
//!
//! Hidden by default. Shown with F1 on native builds, through the frontend
//! bridge in the browser, or from the scene manifest.

/// Static table binding panel controls to pass parameters.
pub mod bindings;

/// Panel state, visibility toggles and the egui window.
pub mod panel;

pub use panel::DebugPanel;
