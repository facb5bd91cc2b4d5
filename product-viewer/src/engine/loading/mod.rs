//! Asset loading for the product scene.
//!
//! The manifest is read first; it names the model and the environment map,
//! which then load in parallel. Every tracked load settles exactly once into
//! a [`progress::LoadStatus`] and is announced with an
//! [`progress::AssetLoadFinished`] event.

/// Tracked asset handles and the mapping from engine load state to status.
pub mod asset_request;

/// Environment map loading and cubemap installation on the camera.
pub mod environment_loader;

/// Scene manifest loading with fallback to the built-in scene.
pub mod manifest_loader;

/// glTF model loading and scene spawning.
pub mod model_loader;

/// Per-asset load status and completion events.
pub mod progress;
