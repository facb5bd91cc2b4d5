use bevy::prelude::*;
use constants::assets::{ENVIRONMENT_MAP_PATH, MODEL_PATH, MODEL_SCALE};
use serde::{Deserialize, Serialize};

/// Scene manifest as a Bevy asset. Missing fields fall back to the built-in
/// product scene.
#[derive(Asset, Resource, Debug, Clone, PartialEq, Serialize, Deserialize, TypePath)]
#[serde(default)]
pub struct SceneManifest {
    /// glTF binary, relative to the asset root.
    pub model: String,
    /// Equirectangular HDR image, relative to the asset root.
    pub environment: String,
    pub model_scale: f32,
    /// Show the debug panel from the first frame.
    pub debug_panel: bool,
}

impl Default for SceneManifest {
    fn default() -> Self {
        Self {
            model: MODEL_PATH.to_string(),
            environment: ENVIRONMENT_MAP_PATH.to_string(),
            model_scale: MODEL_SCALE,
            debug_panel: false,
        }
    }
}

impl SceneManifest {
    /// Non-positive or non-finite scales would collapse the model.
    pub fn model_scale(&self) -> f32 {
        if self.model_scale.is_finite() && self.model_scale > 0.0 {
            self.model_scale
        } else {
            MODEL_SCALE
        }
    }
}
