use bevy::gltf::Gltf;
use bevy::prelude::*;

use crate::engine::assets::scene_manifest::SceneManifest;
use crate::engine::assets::viewer_assets::ViewerAssets;
use crate::engine::loading::asset_request::ViewerLoadError;
use crate::engine::loading::progress::{
    AssetLoadFinished, LoadStatus, LoadingProgress, TrackedAsset,
};

/// Root of the spawned product model.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct LoadedModel;

/// Spawn the first scene of the model once the glTF has loaded.
///
/// Material normalization runs when the scene instance is ready.
pub fn poll_model_load(
    mut commands: Commands,
    mut progress: ResMut<LoadingProgress>,
    mut finished: EventWriter<AssetLoadFinished>,
    assets: Res<ViewerAssets>,
    manifest: Res<SceneManifest>,
    asset_server: Res<AssetServer>,
    gltfs: Res<Assets<Gltf>>,
) {
    if progress.model.is_settled() {
        return;
    }
    let Some(request) = &assets.model else {
        return;
    };

    let status = match request.poll(&asset_server) {
        LoadStatus::Pending => return,
        LoadStatus::Loaded => match gltfs.get(request.handle()) {
            None => LoadStatus::Failed(ViewerLoadError::Missing {
                path: request.path().to_string(),
            }),
            Some(gltf) => match gltf.scenes.first() {
                None => LoadStatus::Failed(ViewerLoadError::NoScene {
                    path: request.path().to_string(),
                }),
                Some(scene) => {
                    spawn_model(&mut commands, scene.clone(), manifest.model_scale());
                    LoadStatus::Loaded
                }
            },
        },
        LoadStatus::Failed(error) => LoadStatus::Failed(error.into_model_error()),
    };

    if let Some(event) = progress.settle(TrackedAsset::Model, status) {
        finished.write(event);
    }
}

fn spawn_model(commands: &mut Commands, scene: Handle<Scene>, scale: f32) {
    commands.spawn((
        Name::new("ProductModel"),
        SceneRoot(scene),
        Transform::from_scale(Vec3::splat(scale)),
        LoadedModel,
    ));
    info!("Model scene spawned at scale {scale}");
}

/// Despawn the model subtree.
pub fn despawn_model(mut commands: Commands, models: Query<Entity, With<LoadedModel>>) {
    for model in &models {
        commands.entity(model).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::loading::asset_request::AssetRequest;
    use approx::assert_relative_eq;
    use constants::assets::MODEL_SCALE;
    use std::time::Duration;

    fn gltf_with_scenes(scenes: Vec<Handle<Scene>>) -> Gltf {
        Gltf {
            scenes,
            named_scenes: default(),
            meshes: Vec::new(),
            named_meshes: default(),
            materials: Vec::new(),
            named_materials: default(),
            nodes: Vec::new(),
            named_nodes: default(),
            skins: Vec::new(),
            named_skins: default(),
            default_scene: None,
            animations: Vec::new(),
            named_animations: default(),
            source: None,
        }
    }

    fn model_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Gltf>()
            .init_resource::<LoadingProgress>()
            .init_resource::<ViewerAssets>()
            .insert_resource(SceneManifest::default())
            .add_event::<AssetLoadFinished>()
            .add_systems(Update, poll_model_load);
        app
    }

    fn track(app: &mut App, request: AssetRequest<Gltf>) {
        app.world_mut().resource_mut::<ViewerAssets>().model = Some(request);
    }

    /// Run frames until the model load settles; file loads finish on the IO pool.
    fn settle(app: &mut App) -> Vec<AssetLoadFinished> {
        for _ in 0..500 {
            app.update();
            if app.world().resource::<LoadingProgress>().model.is_settled() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        app.world_mut()
            .resource_mut::<Events<AssetLoadFinished>>()
            .drain()
            .collect()
    }

    #[test]
    fn first_scene_is_spawned_at_model_scale() {
        let mut app = model_app();
        let scene = Handle::<Scene>::weak_from_u128(0x706f74);
        let handle = app
            .world()
            .resource::<AssetServer>()
            .add(gltf_with_scenes(vec![scene.clone()]));
        track(&mut app, AssetRequest::tracked("pot.glb", handle));

        let finished = settle(&mut app);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].result, Ok(()));

        let mut models = app
            .world_mut()
            .query_filtered::<(&SceneRoot, &Transform), With<LoadedModel>>();
        let (root, transform) = models.single(app.world()).expect("one model root");
        assert_eq!(root.0, scene);
        assert_relative_eq!(transform.scale.x, MODEL_SCALE);
        assert_relative_eq!(transform.scale.y, MODEL_SCALE);
        assert_relative_eq!(transform.scale.z, MODEL_SCALE);
    }

    #[test]
    fn model_without_scenes_fails() {
        let mut app = model_app();
        let handle = app
            .world()
            .resource::<AssetServer>()
            .add(gltf_with_scenes(Vec::new()));
        track(&mut app, AssetRequest::tracked("empty.glb", handle));

        let finished = settle(&mut app);
        assert_eq!(
            finished[0].result,
            Err(ViewerLoadError::NoScene {
                path: "empty.glb".to_string()
            })
        );
        let mut models = app.world_mut().query_filtered::<(), With<LoadedModel>>();
        assert_eq!(models.iter(app.world()).count(), 0);
    }

    #[test]
    fn failed_load_settles_once_without_spawning() {
        let mut app = model_app();
        let request = {
            let asset_server = app.world().resource::<AssetServer>();
            AssetRequest::<Gltf>::load(asset_server, "missing-model.glb")
        };
        track(&mut app, request);

        let finished = settle(&mut app);
        assert_eq!(finished.len(), 1);
        assert!(matches!(
            &finished[0].result,
            Err(ViewerLoadError::Asset { path, .. }) if path == "missing-model.glb"
        ));

        // Later frames never retry or emit again.
        app.update();
        assert!(app.world().resource::<Events<AssetLoadFinished>>().is_empty());
        let mut models = app.world_mut().query_filtered::<(), With<LoadedModel>>();
        assert_eq!(models.iter(app.world()).count(), 0);
    }
}
