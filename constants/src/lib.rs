//! Compile-time defaults shared by the product viewer.
//!
//! Runtime overrides come from the scene manifest; everything here is the
//! fallback used when the manifest is missing or omits a field.

/// Asset locations relative to the asset root.
pub mod assets;

/// Camera placement and orbit limits.
pub mod camera;

/// Adaptive resolution limits.
pub mod quality;

/// Post-processing and material defaults.
pub mod render_settings;
