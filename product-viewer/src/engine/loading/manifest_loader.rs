use bevy::prelude::*;
use constants::assets::MANIFEST_PATH;

use crate::engine::assets::scene_manifest::SceneManifest;
use crate::engine::assets::viewer_assets::ViewerAssets;
use crate::engine::loading::asset_request::{AssetRequest, ViewerLoadError};
use crate::engine::loading::progress::{
    AssetLoadFinished, LoadStatus, LoadingProgress, TrackedAsset,
};

// Start the loading process
pub fn start_loading(mut assets: ResMut<ViewerAssets>, asset_server: Res<AssetServer>) {
    assets.manifest = Some(AssetRequest::load(&asset_server, MANIFEST_PATH));
}

/// Settle the manifest and kick off the model and environment loads it names.
///
/// A missing or malformed manifest is not fatal; the built-in scene is used.
pub fn resolve_manifest(
    mut commands: Commands,
    mut assets: ResMut<ViewerAssets>,
    mut progress: ResMut<LoadingProgress>,
    mut finished: EventWriter<AssetLoadFinished>,
    asset_server: Res<AssetServer>,
    manifests: Res<Assets<SceneManifest>>,
) {
    if progress.manifest.is_settled() {
        return;
    }
    let Some(request) = &assets.manifest else {
        return;
    };

    let status = request.poll(&asset_server);
    let manifest = match &status {
        LoadStatus::Pending => return,
        LoadStatus::Loaded => manifests.get(request.handle()).cloned(),
        LoadStatus::Failed(_) => None,
    };

    // A loaded handle that is not in the store is treated as a failure.
    let status = if status == LoadStatus::Loaded && manifest.is_none() {
        LoadStatus::Failed(ViewerLoadError::Missing {
            path: request.path().to_string(),
        })
    } else {
        status
    };
    let manifest = manifest.unwrap_or_default();

    info!(
        "Scene manifest resolved: model `{}`, environment `{}`",
        manifest.model, manifest.environment
    );

    assets.model = Some(AssetRequest::load(&asset_server, manifest.model.clone()));
    assets.environment = Some(AssetRequest::load(
        &asset_server,
        manifest.environment.clone(),
    ));

    if let Some(event) = progress.settle(TrackedAsset::Manifest, status) {
        finished.write(event);
    }
    commands.insert_resource(manifest);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::gltf::Gltf;
    use constants::assets::{ENVIRONMENT_MAP_PATH, MODEL_PATH};
    use std::time::Duration;

    fn manifest_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<SceneManifest>()
            .init_asset::<Gltf>()
            .init_asset::<Image>()
            .init_resource::<LoadingProgress>()
            .init_resource::<ViewerAssets>()
            .add_event::<AssetLoadFinished>()
            .add_systems(Update, resolve_manifest);
        app
    }

    fn settle(app: &mut App) -> Vec<AssetLoadFinished> {
        for _ in 0..500 {
            app.update();
            if app.world().resource::<LoadingProgress>().manifest.is_settled() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        app.world_mut()
            .resource_mut::<Events<AssetLoadFinished>>()
            .drain()
            .collect()
    }

    fn requested_paths(app: &App) -> (String, String) {
        let assets = app.world().resource::<ViewerAssets>();
        (
            assets.model.as_ref().expect("model requested").path().to_string(),
            assets
                .environment
                .as_ref()
                .expect("environment requested")
                .path()
                .to_string(),
        )
    }

    #[test]
    fn missing_manifest_falls_back_to_built_in_scene() {
        let mut app = manifest_app();
        let request = AssetRequest::load(
            app.world().resource::<AssetServer>(),
            "missing.viewer.json",
        );
        app.world_mut().resource_mut::<ViewerAssets>().manifest = Some(request);

        let finished = settle(&mut app);
        assert_eq!(finished.len(), 1);
        assert!(finished[0].result.is_err());
        assert!(matches!(
            app.world().resource::<LoadingProgress>().manifest,
            LoadStatus::Failed(_)
        ));

        assert_eq!(*app.world().resource::<SceneManifest>(), SceneManifest::default());
        assert_eq!(
            requested_paths(&app),
            (MODEL_PATH.to_string(), ENVIRONMENT_MAP_PATH.to_string())
        );
    }

    #[test]
    fn loaded_manifest_names_the_assets() {
        let mut app = manifest_app();
        let manifest = SceneManifest {
            model: "vase.glb".to_string(),
            environment: "studio.hdr".to_string(),
            ..default()
        };
        let handle = app.world().resource::<AssetServer>().add(manifest.clone());
        app.world_mut().resource_mut::<ViewerAssets>().manifest =
            Some(AssetRequest::tracked(MANIFEST_PATH, handle));

        let finished = settle(&mut app);
        assert_eq!(finished[0].result, Ok(()));
        assert_eq!(*app.world().resource::<SceneManifest>(), manifest);
        assert_eq!(
            requested_paths(&app),
            ("vase.glb".to_string(), "studio.hdr".to_string())
        );
    }
}
