//! Post-processing chain for the product view.
//!
//! Bevy's built-in screen-space passes are driven from parameter resources;
//! the stylistic passes are custom fullscreen nodes between the main pass and
//! tone mapping.

/// Fixed-order pass list with runtime enablement.
pub mod pass_chain;

/// Key/value parameter resources for every tunable pass.
pub mod parameters;

/// Mirrors the chain and parameters onto the viewer camera each frame.
pub mod pipeline_sync;

/// Generic fullscreen effect node shared by the stylistic passes.
pub mod post_effect;

/// Dot screen, glitch and RGB shift effects.
pub mod stylistic;
