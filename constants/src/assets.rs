/// Scene manifest served next to the model and environment map.
pub const MANIFEST_PATH: &str = "scene.viewer.json";

/// Compressed product model (glTF binary).
pub const MODEL_PATH: &str = "pot.glb";

/// Equirectangular HDR image used for image-based lighting.
pub const ENVIRONMENT_MAP_PATH: &str = "env-metal-1.hdr";

/// Uniform scale applied to the model root.
pub const MODEL_SCALE: f32 = 0.1;
