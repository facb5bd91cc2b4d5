//! Viewer camera and orbit navigation.
//!
//! The camera orbits a pivot with damped mouse controls and is re-aimed at a
//! fixed subject point after every control update.

/// Damped orbit controller, gesture events and the mouse input system.
pub mod orbit_controls;

/// Camera spawning and the per-frame re-aim.
pub mod viewport_camera;
