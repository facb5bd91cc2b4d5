use bevy::gltf::Gltf;
use bevy::prelude::*;

use crate::engine::assets::scene_manifest::SceneManifest;
use crate::engine::loading::asset_request::AssetRequest;

/// Every asset the viewer waits on before it starts running.
#[derive(Resource, Default)]
pub struct ViewerAssets {
    pub manifest: Option<AssetRequest<SceneManifest>>,
    pub model: Option<AssetRequest<Gltf>>,
    pub environment: Option<AssetRequest<Image>>,
    /// Cubemaps generated from the environment image.
    pub environment_maps: Vec<Handle<Image>>,
}

impl ViewerAssets {
    /// Drop every strong handle so the asset server can free the data.
    pub fn release(&mut self) {
        *self = Self::default();
    }
}
