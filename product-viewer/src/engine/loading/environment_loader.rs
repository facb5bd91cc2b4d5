use bevy::prelude::*;
use constants::render_settings::{DIFFUSE_CUBEMAP_SIZE, SPECULAR_CUBEMAP_SIZE};

use crate::engine::assets::viewer_assets::ViewerAssets;
use crate::engine::camera::viewport_camera::ViewerCamera;
use crate::engine::loading::asset_request::ViewerLoadError;
use crate::engine::loading::progress::{
    AssetLoadFinished, LoadStatus, LoadingProgress, TrackedAsset,
};
use crate::engine::scene::environment_map::build_environment_maps;

/// Convert the loaded HDR into cubemaps and light the camera with them.
pub fn poll_environment_load(
    mut commands: Commands,
    mut progress: ResMut<LoadingProgress>,
    mut finished: EventWriter<AssetLoadFinished>,
    mut assets: ResMut<ViewerAssets>,
    mut images: ResMut<Assets<Image>>,
    asset_server: Res<AssetServer>,
    cameras: Query<Entity, With<ViewerCamera>>,
) {
    if progress.environment.is_settled() {
        return;
    }
    let Some(request) = assets.environment.clone() else {
        return;
    };

    let status = match request.poll(&asset_server) {
        LoadStatus::Pending => return,
        LoadStatus::Loaded => {
            let converted = images
                .get(request.handle())
                .ok_or_else(|| ViewerLoadError::Missing {
                    path: request.path().to_string(),
                })
                .and_then(|source| {
                    build_environment_maps(source, SPECULAR_CUBEMAP_SIZE, DIFFUSE_CUBEMAP_SIZE)
                        .map_err(|error| ViewerLoadError::Environment {
                            path: request.path().to_string(),
                            reason: error.to_string(),
                        })
                });

            match converted {
                Ok(maps) => {
                    let specular_map = images.add(maps.specular);
                    let diffuse_map = images.add(maps.diffuse);
                    for camera in &cameras {
                        commands.entity(camera).insert(EnvironmentMapLight {
                            diffuse_map: diffuse_map.clone(),
                            specular_map: specular_map.clone(),
                            ..default()
                        });
                    }
                    assets.environment_maps = vec![specular_map, diffuse_map];
                    LoadStatus::Loaded
                }
                Err(error) => LoadStatus::Failed(error),
            }
        }
        failed => failed,
    };

    if let Some(event) = progress.settle(TrackedAsset::Environment, status) {
        finished.write(event);
    }
}

/// Detach image-based lighting and drop the generated cubemaps.
pub fn release_environment(
    mut commands: Commands,
    mut assets: ResMut<ViewerAssets>,
    mut images: ResMut<Assets<Image>>,
    cameras: Query<Entity, With<EnvironmentMapLight>>,
) {
    for camera in &cameras {
        commands.entity(camera).remove::<EnvironmentMapLight>();
    }
    for handle in assets.environment_maps.drain(..) {
        images.remove(&handle);
    }
    assets.release();
}
