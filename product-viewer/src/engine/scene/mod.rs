//! Scene lighting and model presentation.
//!
//! Image-based lighting comes from an equirectangular HDR converted to
//! cubemaps on load; the loaded model's materials are normalized once after
//! the scene is instanced.

/// Equirectangular to cubemap conversion for image-based lighting.
pub mod environment_map;

/// Post-instancing material normalization and environment intensity sync.
pub mod materials;
