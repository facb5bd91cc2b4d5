use bevy::core_pipeline::smaa::Smaa;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::ecs::system::EntityCommands;
use bevy::pbr::{ScreenSpaceAmbientOcclusion, ScreenSpaceReflections};
use bevy::prelude::*;
use bevy::render::camera::Exposure;

use crate::engine::camera::viewport_camera::ViewerCamera;
use crate::engine::render::parameters::{
    AmbientOcclusionParameters, GlitchControls, ReflectionParameters, ToneMappingParameters,
};
use crate::engine::render::pass_chain::{PassChain, PassKind};
use crate::engine::render::stylistic::{
    DotScreenSettings, GlitchGenerator, GlitchSettings, RgbShiftSettings,
};

fn toggle<C: Component>(entity: &mut EntityCommands, enabled: bool, component: impl FnOnce() -> C) {
    if enabled {
        entity.insert(component());
    } else {
        entity.remove::<C>();
    }
}

/// Mirror the pass chain and parameter resources onto the viewer camera.
///
/// Each pass is re-synced only when the chain or its own parameters changed,
/// or when the camera is new.
pub fn sync_camera_passes(
    mut commands: Commands,
    chain: Res<PassChain>,
    reflections: Res<ReflectionParameters>,
    ambient_occlusion: Res<AmbientOcclusionParameters>,
    dot_screen: Res<DotScreenSettings>,
    rgb_shift: Res<RgbShiftSettings>,
    tone_mapping: Res<ToneMappingParameters>,
    cameras: Query<(Entity, Ref<ViewerCamera>)>,
) {
    for (camera, marker) in &cameras {
        let fresh = marker.is_added() || chain.is_changed();
        let mut entity = commands.entity(camera);

        if fresh || reflections.is_changed() {
            toggle(&mut entity, chain.is_enabled(PassKind::Reflections), || {
                reflections.to_component()
            });
        }
        if fresh || ambient_occlusion.is_changed() {
            toggle(
                &mut entity,
                chain.is_enabled(PassKind::AmbientOcclusion),
                || ambient_occlusion.to_component(),
            );
        }
        if fresh || dot_screen.is_changed() {
            toggle(&mut entity, chain.is_enabled(PassKind::DotScreen), || {
                *dot_screen
            });
        }
        if fresh || rgb_shift.is_changed() {
            toggle(&mut entity, chain.is_enabled(PassKind::RgbShift), || {
                *rgb_shift
            });
        }
        if fresh {
            // Uniforms are filled in by the animator.
            toggle(
                &mut entity,
                chain.is_enabled(PassKind::Glitch),
                GlitchSettings::default,
            );
            toggle(&mut entity, chain.is_enabled(PassKind::Antialias), Smaa::default);
        }
        if fresh || tone_mapping.is_changed() {
            if chain.is_enabled(PassKind::ToneMapping) {
                entity.insert((ToneMappingParameters::OPERATOR, tone_mapping.to_exposure()));
            } else {
                entity.insert((Tonemapping::None, Exposure::default()));
            }
        }
    }
}

/// Regenerate the glitch uniforms for every camera running the glitch pass.
pub fn animate_glitch(
    controls: Res<GlitchControls>,
    mut generator: ResMut<GlitchGenerator>,
    mut cameras: Query<&mut GlitchSettings, With<ViewerCamera>>,
) {
    for mut settings in &mut cameras {
        *settings = generator.next_frame(controls.go_wild);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;
    use crate::engine::render::parameters::{ParameterValue, PassParameters, init_pass_parameters};

    fn pipeline_app() -> (App, Entity) {
        let mut app = App::new();
        init_pass_parameters(&mut app);
        app.init_resource::<PassChain>()
            .init_resource::<GlitchGenerator>()
            .add_systems(Update, (sync_camera_passes, animate_glitch).chain());
        let camera = app.world_mut().spawn(ViewerCamera).id();
        app.update();
        (app, camera)
    }

    #[test]
    fn default_chain_attaches_default_passes() {
        let (app, camera) = pipeline_app();
        let entity = app.world().entity(camera);

        assert!(entity.contains::<ScreenSpaceReflections>());
        assert!(entity.contains::<ScreenSpaceAmbientOcclusion>());
        assert!(!entity.contains::<DotScreenSettings>());
        assert!(!entity.contains::<GlitchSettings>());
        assert!(!entity.contains::<RgbShiftSettings>());
        assert!(!entity.contains::<Smaa>());
        assert_eq!(entity.get::<Tonemapping>(), Some(&Tonemapping::AcesFitted));
    }

    #[test]
    fn disabling_a_pass_removes_its_component_next_frame() {
        let (mut app, camera) = pipeline_app();

        app.world_mut()
            .resource_mut::<PassChain>()
            .set_enabled(PassKind::Reflections, false)
            .expect("reflections are toggleable");
        app.update();

        assert!(!app.world().entity(camera).contains::<ScreenSpaceReflections>());
        assert!(app.world().entity(camera).contains::<ScreenSpaceAmbientOcclusion>());
    }

    #[test]
    fn antialias_toggles_smaa() {
        let (mut app, camera) = pipeline_app();

        app.world_mut()
            .resource_mut::<PassChain>()
            .set_enabled(PassKind::Antialias, true)
            .expect("antialias is toggleable");
        app.update();
        assert!(app.world().entity(camera).contains::<Smaa>());

        app.world_mut()
            .resource_mut::<PassChain>()
            .set_enabled(PassKind::Antialias, false)
            .expect("antialias is toggleable");
        app.update();
        assert!(!app.world().entity(camera).contains::<Smaa>());
    }

    #[test]
    fn parameter_change_resyncs_only_that_pass() {
        let (mut app, camera) = pipeline_app();

        // Detach AO by hand; an unrelated parameter write must not restore it.
        app.world_mut()
            .entity_mut(camera)
            .remove::<ScreenSpaceAmbientOcclusion>();

        app.world_mut()
            .run_system_once(|mut params: PassParameters| {
                params.set(PassKind::Reflections, "thickness", ParameterValue::Number(0.05))
            })
            .expect("system runs")
            .expect("known parameter");
        app.update();

        let entity = app.world().entity(camera);
        let reflections = entity
            .get::<ScreenSpaceReflections>()
            .expect("reflections attached");
        assert_eq!(reflections.thickness, 0.05);
        assert!(!entity.contains::<ScreenSpaceAmbientOcclusion>());
    }

    #[test]
    fn enabled_glitch_is_animated_each_frame() {
        let (mut app, camera) = pipeline_app();
        app.world_mut()
            .resource_mut::<PassChain>()
            .set_enabled(PassKind::Glitch, true)
            .expect("glitch is toggleable");
        app.update();

        // The generator opens every interval with a strong glitch.
        let settings = app
            .world()
            .entity(camera)
            .get::<GlitchSettings>()
            .copied()
            .expect("glitch attached");
        assert_eq!(settings.bypass, 0);
    }
}
