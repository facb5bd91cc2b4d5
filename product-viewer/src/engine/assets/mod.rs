//! Asset descriptions for the product scene.
//!
//! Holds the JSON scene manifest and the handles of everything the viewer
//! loads at startup.

/// Scene manifest naming the model, environment map and start-up options.
pub mod scene_manifest;

/// Handles for the manifest, model and environment map.
pub mod viewer_assets;
