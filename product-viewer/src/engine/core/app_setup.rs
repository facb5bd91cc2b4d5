// Standard library and external crates
use bevy::asset::AssetMetaCheck;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::pbr::DefaultOpaqueRendererMethod;
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;
use bevy_egui::{EguiGlobalSettings, EguiPlugin, EguiPrimaryContextPass};
use constants::render_settings::BACKGROUND_COLOUR;

// Crate engine modules
use crate::engine::assets::scene_manifest::SceneManifest;
use crate::engine::assets::viewer_assets::ViewerAssets;
use crate::engine::camera::orbit_controls::{
    OrbitInteraction, orbit_input_system, update_orbit_controls,
};
use crate::engine::camera::viewport_camera::{
    create_presentation_camera, create_viewer_camera, reaim_camera,
};
use crate::engine::core::app_state::{AppState, transition_to_running};
use crate::engine::core::window_config::create_window_config;
use crate::engine::debug_panel::DebugPanel;
use crate::engine::debug_panel::panel::{apply_manifest_panel_flag, debug_panel_ui};
use crate::engine::loading::environment_loader::{poll_environment_load, release_environment};
use crate::engine::loading::manifest_loader::{resolve_manifest, start_loading};
use crate::engine::loading::model_loader::{despawn_model, poll_model_load};
use crate::engine::loading::progress::{AssetLoadFinished, LoadingProgress, log_load_results};
use crate::engine::quality::adaptive::{
    AdaptiveQuality, QualityChanged, adaptive_quality_system, cancel_pending_restore,
};
use crate::engine::quality::render_target::{create_render_target, resize_render_target};
use crate::engine::quality::viewport::{Viewport, handle_viewport_resize, initialise_viewport};
use crate::engine::render::parameters::init_pass_parameters;
use crate::engine::render::pass_chain::{PassChain, init_pass_chain};
use crate::engine::render::pipeline_sync::{animate_glitch, sync_camera_passes};
use crate::engine::render::stylistic::StylisticPassesPlugin;
use crate::engine::scene::materials::{
    MaterialNormalization, on_model_instanced, sync_environment_intensity,
};
use crate::engine::systems::fps_tracking::fps_notification_system;

// Create Web RPC modules
use crate::rpc::web_rpc::WebRpcPlugin;

#[cfg(not(target_arch = "wasm32"))]
use crate::engine::core::app_state::FpsText;
#[cfg(not(target_arch = "wasm32"))]
use crate::engine::debug_panel::panel::toggle_debug_panel;
#[cfg(not(target_arch = "wasm32"))]
use crate::engine::systems::fps_tracking::fps_text_update_system;

/// Per-frame ordering of the viewer's own work. The render app runs the
/// graph after `Update` has finished.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerSet {
    /// Window, mouse and keyboard input.
    Input,
    /// Adaptive pixel ratio and the render target size that follows it.
    Quality,
    /// Damped orbit update.
    Controls,
    /// Fixed look-at after the orbit update.
    Aim,
}

pub fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        // Registers SceneManifest as a loadable asset type from JSON files.
        .add_plugins(JsonAssetPlugin::<SceneManifest>::new(&["viewer.json"]))
        // The panel belongs to the presentation camera, not the offscreen one.
        .insert_resource(EguiGlobalSettings {
            auto_create_primary_context: false,
            ..default()
        })
        .add_plugins(EguiPlugin::default())
        .add_plugins(ViewerPlugin);

    app
}

/// Installs every viewer subsystem. The order of the helpers below is the
/// construction order: configuration, loading, scene, camera, render
/// pipeline, quality, debug panel, RPC.
pub struct ViewerPlugin;

impl Plugin for ViewerPlugin {
    fn build(&self, app: &mut App) {
        configure(app);
        add_loading(app);
        add_scene(app);
        add_camera(app);
        add_render_pipeline(app);
        add_quality(app);
        add_debug_panel(app);
        add_rpc(app);
        add_teardown(app);
    }
}

fn configure(app: &mut App) {
    app.init_state::<AppState>()
        .insert_resource(ClearColor(BACKGROUND_COLOUR))
        // Screen-space reflections only run on deferred materials.
        .insert_resource(DefaultOpaqueRendererMethod::deferred())
        .init_resource::<Viewport>();
    configure_frame_sets(app);
}

fn configure_frame_sets(app: &mut App) {
    app.configure_sets(
        Update,
        (
            ViewerSet::Input,
            ViewerSet::Quality,
            ViewerSet::Controls,
            ViewerSet::Aim,
        )
            .chain(),
    );
}

fn add_loading(app: &mut App) {
    app.init_resource::<LoadingProgress>()
        .init_resource::<ViewerAssets>()
        .add_event::<AssetLoadFinished>()
        .add_systems(Startup, start_loading)
        .add_systems(
            Update,
            (
                resolve_manifest,
                poll_model_load.run_if(resource_exists::<SceneManifest>),
                poll_environment_load,
                transition_to_running,
            )
                .chain()
                .run_if(in_state(AppState::Loading)),
        )
        .add_systems(Update, log_load_results);
}

fn add_scene(app: &mut App) {
    app.init_resource::<MaterialNormalization>()
        .add_observer(on_model_instanced)
        .add_systems(Update, sync_environment_intensity);
}

fn add_camera(app: &mut App) {
    app.add_event::<OrbitInteraction>()
        .add_systems(
            Startup,
            (
                initialise_viewport,
                create_render_target,
                init_pass_chain,
                create_viewer_camera,
                create_presentation_camera,
            )
                .chain(),
        )
        .add_systems(Update, orbit_input_system.in_set(ViewerSet::Input))
        .add_systems(Update, update_orbit_controls.in_set(ViewerSet::Controls))
        .add_systems(Update, reaim_camera.in_set(ViewerSet::Aim));
}

fn add_render_pipeline(app: &mut App) {
    init_pass_parameters(app);
    app.init_resource::<PassChain>()
        .add_plugins(StylisticPassesPlugin)
        .add_systems(
            Update,
            (sync_camera_passes, animate_glitch)
                .chain()
                .after(ViewerSet::Aim),
        );
}

fn add_quality(app: &mut App) {
    app.init_resource::<AdaptiveQuality>()
        .add_event::<QualityChanged>()
        .add_systems(Update, handle_viewport_resize.in_set(ViewerSet::Input))
        .add_systems(
            Update,
            (adaptive_quality_system, resize_render_target)
                .chain()
                .in_set(ViewerSet::Quality),
        );
}

fn add_debug_panel(app: &mut App) {
    app.init_resource::<DebugPanel>()
        .add_systems(
            Update,
            apply_manifest_panel_flag.run_if(resource_added::<SceneManifest>),
        )
        .add_systems(EguiPrimaryContextPass, debug_panel_ui);

    #[cfg(not(target_arch = "wasm32"))]
    {
        app.add_systems(Update, toggle_debug_panel.in_set(ViewerSet::Input));
    }
}

fn add_rpc(app: &mut App) {
    app.add_plugins(WebRpcPlugin)
        .add_systems(Update, fps_notification_system);

    // Add the FPS overlay only for native builds.
    #[cfg(not(target_arch = "wasm32"))]
    {
        app.add_systems(Startup, create_native_overlays)
            .add_systems(Update, fps_text_update_system);
    }
}

/// Release everything the viewer holds once the app is asked to exit.
fn add_teardown(app: &mut App) {
    app.add_systems(
        Last,
        (cancel_pending_restore, despawn_model, release_environment)
            .chain()
            .run_if(on_event::<AppExit>),
    );
}

#[cfg(not(target_arch = "wasm32"))]
fn create_native_overlays(mut commands: Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new("FPS: "),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::srgb(1., 0., 0.)),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    right: Val::Px(12.0),
                    ..default()
                },
                FpsText,
            ));
        });
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_sets_run_in_order() {
        #[derive(Resource, Default)]
        struct Trace(Vec<ViewerSet>);

        let mut app = App::new();
        configure_frame_sets(&mut app);
        // Registered out of order on purpose.
        app.init_resource::<Trace>()
            .add_systems(
                Update,
                (
                    (|mut trace: ResMut<Trace>| trace.0.push(ViewerSet::Aim))
                        .in_set(ViewerSet::Aim),
                    (|mut trace: ResMut<Trace>| trace.0.push(ViewerSet::Controls))
                        .in_set(ViewerSet::Controls),
                    (|mut trace: ResMut<Trace>| trace.0.push(ViewerSet::Input))
                        .in_set(ViewerSet::Input),
                    (|mut trace: ResMut<Trace>| trace.0.push(ViewerSet::Quality))
                        .in_set(ViewerSet::Quality),
                ),
            );
        app.update();

        assert_eq!(
            app.world().resource::<Trace>().0,
            vec![
                ViewerSet::Input,
                ViewerSet::Quality,
                ViewerSet::Controls,
                ViewerSet::Aim
            ]
        );
    }
}
