use bevy::core_pipeline::prepass::{DeferredPrepass, DepthPrepass, NormalPrepass};
use bevy::prelude::*;
use bevy::render::camera::RenderTarget;
use bevy::ui::IsDefaultUiCamera;
use bevy_egui::PrimaryEguiContext;
use constants::camera::{FAR, FOV_DEGREES, INITIAL_POSITION, LOOK_AT_TARGET, NEAR};

use crate::engine::camera::orbit_controls::OrbitControls;
use crate::engine::quality::render_target::ViewerRenderTarget;
use crate::engine::quality::viewport::Viewport;

/// Marks the single camera the viewer renders through.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct ViewerCamera;

/// Camera that draws the render target, the overlays and the debug panel
/// onto the window.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct PresentationCamera;

pub fn create_viewer_camera(
    mut commands: Commands,
    viewport: Res<Viewport>,
    target: Res<ViewerRenderTarget>,
) {
    commands.spawn((
        Name::new("ViewerCamera"),
        Camera3d::default(),
        Camera {
            hdr: true,
            target: RenderTarget::Image(target.0.clone().into()),
            ..default()
        },
        // Screen-space passes read the prepass buffers, which need MSAA off.
        Msaa::Off,
        DepthPrepass,
        NormalPrepass,
        DeferredPrepass,
        Projection::Perspective(PerspectiveProjection {
            fov: FOV_DEGREES.to_radians(),
            aspect_ratio: viewport.aspect_ratio(),
            near: NEAR,
            far: FAR,
            ..default()
        }),
        Transform::from_translation(INITIAL_POSITION).looking_at(LOOK_AT_TARGET, Vec3::Y),
        OrbitControls::default(),
        ViewerCamera,
    ));
}

/// Stretch the render target over the whole window. The target may be
/// smaller than the window while quality is reduced.
pub fn create_presentation_camera(mut commands: Commands, target: Res<ViewerRenderTarget>) {
    commands.spawn((
        Name::new("PresentationCamera"),
        Camera2d,
        Camera {
            order: 1,
            ..default()
        },
        IsDefaultUiCamera,
        PrimaryEguiContext,
        PresentationCamera,
    ));

    commands.spawn((
        Name::new("ViewerImage"),
        ImageNode::new(target.0.clone()),
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        },
        GlobalZIndex(-1),
    ));
}

/// Aim the camera at the fixed subject, overriding any drift from the
/// orbit update.
pub fn reaim_camera(mut cameras: Query<&mut Transform, With<ViewerCamera>>) {
    for mut transform in &mut cameras {
        transform.look_at(LOOK_AT_TARGET, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::camera::orbit_controls::update_orbit_controls;
    use approx::assert_relative_eq;
    use bevy::ecs::system::RunSystemOnce;

    fn assert_aimed_at_target(transform: &Transform) {
        let expected = (LOOK_AT_TARGET - transform.translation).normalize();
        let forward = transform.forward();
        assert_relative_eq!(forward.x, expected.x, epsilon = 1e-4);
        assert_relative_eq!(forward.y, expected.y, epsilon = 1e-4);
        assert_relative_eq!(forward.z, expected.z, epsilon = 1e-4);
    }

    #[test]
    fn viewer_renders_offscreen_and_presentation_owns_the_window() {
        let mut world = World::new();
        world.init_resource::<Viewport>();
        let handle = Handle::<Image>::weak_from_u128(0x7669_6577_6572);
        world.insert_resource(ViewerRenderTarget(handle.clone()));

        world
            .run_system_once(create_viewer_camera)
            .expect("viewer camera spawns");
        world
            .run_system_once(create_presentation_camera)
            .expect("presentation camera spawns");

        let mut viewer = world.query_filtered::<&Camera, With<ViewerCamera>>();
        let camera = viewer.single(&world).expect("one viewer camera");
        assert!(matches!(
            &camera.target,
            RenderTarget::Image(image) if image.handle == handle
        ));

        let mut presentation =
            world.query_filtered::<&Camera, (With<PresentationCamera>, With<PrimaryEguiContext>)>();
        let camera = presentation.single(&world).expect("one presentation camera");
        assert!(matches!(camera.target, RenderTarget::Window(_)));
        assert_eq!(camera.order, 1);

        let mut nodes = world.query::<&ImageNode>();
        let node = nodes.single(&world).expect("one presented image");
        assert_eq!(node.image, handle);
    }

    #[test]
    fn camera_stays_aimed_at_target_across_updates() {
        let mut world = World::new();
        let mut controls = OrbitControls::default();
        controls.rotate(1.3, -0.4);
        controls.zoom(3.0);

        let camera = world
            .spawn((
                Transform::from_translation(INITIAL_POSITION),
                controls,
                ViewerCamera,
            ))
            .id();

        for frame in 0..120 {
            if frame == 60 {
                world
                    .get_mut::<OrbitControls>(camera)
                    .expect("camera has controls")
                    .rotate(-2.0, 0.3);
            }
            world
                .run_system_once(update_orbit_controls)
                .expect("orbit update runs");
            world.run_system_once(reaim_camera).expect("re-aim runs");

            let transform = world.get::<Transform>(camera).expect("camera has transform");
            assert_aimed_at_target(transform);
        }
    }
}
