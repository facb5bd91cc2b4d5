use bevy::pbr::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;
use bevy::scene::SceneInstanceReady;
use constants::render_settings::{ENVIRONMENT_BASE_LUMINANCE, ENVIRONMENT_INTENSITY};

use crate::engine::camera::viewport_camera::ViewerCamera;
use crate::engine::loading::model_loader::LoadedModel;

/// Environment contribution recorded on a normalized mesh.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct NormalizedMaterial {
    pub environment_intensity: f32,
}

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct MaterialNormalization {
    pub environment_intensity: f32,
}

impl Default for MaterialNormalization {
    fn default() -> Self {
        Self {
            environment_intensity: ENVIRONMENT_INTENSITY,
        }
    }
}

pub fn on_model_instanced(
    trigger: Trigger<SceneInstanceReady>,
    models: Query<(), With<LoadedModel>>,
    mut commands: Commands,
) {
    let root = trigger.target();
    if models.contains(root) {
        commands.run_system_cached_with(normalize_model_materials, root);
    }
}

/// Make every standard-material mesh under `root` cast and receive shadows
/// and take the configured environment intensity.
pub fn normalize_model_materials(
    In(root): In<Entity>,
    mut commands: Commands,
    children: Query<&Children>,
    meshes: Query<&MeshMaterial3d<StandardMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    normalization: Res<MaterialNormalization>,
) {
    let mut normalized = 0;
    for entity in children.iter_descendants(root) {
        let Ok(material) = meshes.get(entity) else {
            continue;
        };

        commands
            .entity(entity)
            .remove::<(NotShadowCaster, NotShadowReceiver)>()
            .insert(NormalizedMaterial {
                environment_intensity: normalization.environment_intensity,
            });

        // Touching the asset re-uploads it with the updated lighting.
        if materials.get_mut(&material.0).is_some() {
            normalized += 1;
        }
    }

    info!("Normalized {normalized} model materials");
}

/// The camera's environment light is scaled by the intensity the model's
/// materials ask for; before normalization it uses the base luminance.
pub fn sync_environment_intensity(
    materials: Query<&NormalizedMaterial>,
    mut lights: Query<&mut EnvironmentMapLight, With<ViewerCamera>>,
) {
    let scale = materials
        .iter()
        .map(|material| material.environment_intensity)
        .reduce(f32::max)
        .unwrap_or(1.0);
    let intensity = ENVIRONMENT_BASE_LUMINANCE * scale;

    for mut light in &mut lights {
        if light.intensity != intensity {
            light.intensity = intensity;
        }
    }
}
