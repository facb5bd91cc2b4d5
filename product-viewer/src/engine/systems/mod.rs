//! Runtime diagnostics.
//!
//! Frame rate reporting to the host page and the native FPS overlay.

/// FPS tracking and notification systems for performance monitoring.
///
/// Sends frame rate updates to frontend via RPC and updates native UI overlays.
pub mod fps_tracking;
