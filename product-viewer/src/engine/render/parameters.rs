use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::ecs::system::SystemParam;
use bevy::pbr::{
    ScreenSpaceAmbientOcclusion, ScreenSpaceAmbientOcclusionQualityLevel, ScreenSpaceReflections,
};
use bevy::prelude::*;
use bevy::render::camera::Exposure;
use constants::render_settings::{
    AO_OBJECT_THICKNESS, AO_SAMPLES_PER_SLICE_SIDE, AO_SLICE_COUNT, REFLECTION_BISECTION_STEPS,
    REFLECTION_LINEAR_MARCH_EXPONENT, REFLECTION_LINEAR_STEPS, REFLECTION_ROUGHNESS_THRESHOLD,
    REFLECTION_THICKNESS, TONE_MAPPING_EXPOSURE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::render::pass_chain::PassKind;
use crate::engine::render::stylistic::{DotScreenSettings, RgbShiftSettings};

/// Exposure multipliers at or below this are treated as black.
const MIN_EXPOSURE: f32 = 1e-3;

/// A single tunable value as seen by the debug panel and the frontend bridge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Flag(bool),
    Number(f32),
}

impl ParameterValue {
    pub fn as_number(self, name: &str) -> Result<f32, ParameterError> {
        match self {
            ParameterValue::Number(value) if value.is_finite() => Ok(value),
            _ => Err(ParameterError::TypeMismatch {
                name: name.to_string(),
                expected: "finite number",
            }),
        }
    }

    pub fn as_flag(self, name: &str) -> Result<bool, ParameterError> {
        match self {
            ParameterValue::Flag(value) => Ok(value),
            ParameterValue::Number(_) => Err(ParameterError::TypeMismatch {
                name: name.to_string(),
                expected: "boolean",
            }),
        }
    }

    /// Step counts arrive as numbers; negative values floor at zero.
    pub fn as_count(self, name: &str) -> Result<u32, ParameterError> {
        self.as_number(name).map(|value| value.round().max(0.0) as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("the {0} pass has no tunable parameters")]
    NoParameters(PassKind),
    #[error("unknown parameter `{0}`")]
    Unknown(String),
    #[error("parameter `{name}` expects a {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

/// Key/value view over one pass's parameters.
pub trait ParameterSet {
    fn names(&self) -> &'static [&'static str];

    fn get(&self, name: &str) -> Option<ParameterValue>;

    fn set(&mut self, name: &str, value: ParameterValue) -> Result<(), ParameterError>;

    fn values(&self) -> Vec<(&'static str, ParameterValue)> {
        self.names()
            .iter()
            .filter_map(|&name| self.get(name).map(|value| (name, value)))
            .collect()
    }
}

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct ReflectionParameters {
    pub thickness: f32,
    pub perceptual_roughness_threshold: f32,
    pub linear_steps: u32,
    pub linear_march_exponent: f32,
    pub bisection_steps: u32,
    pub use_secant: bool,
}

impl Default for ReflectionParameters {
    fn default() -> Self {
        Self {
            thickness: REFLECTION_THICKNESS,
            perceptual_roughness_threshold: REFLECTION_ROUGHNESS_THRESHOLD,
            linear_steps: REFLECTION_LINEAR_STEPS,
            linear_march_exponent: REFLECTION_LINEAR_MARCH_EXPONENT,
            bisection_steps: REFLECTION_BISECTION_STEPS,
            use_secant: true,
        }
    }
}

impl ReflectionParameters {
    pub fn to_component(&self) -> ScreenSpaceReflections {
        ScreenSpaceReflections {
            perceptual_roughness_threshold: self.perceptual_roughness_threshold,
            thickness: self.thickness,
            linear_steps: self.linear_steps.max(1),
            linear_march_exponent: self.linear_march_exponent,
            bisection_steps: self.bisection_steps,
            use_secant: self.use_secant,
        }
    }
}

impl ParameterSet for ReflectionParameters {
    fn names(&self) -> &'static [&'static str] {
        &[
            "thickness",
            "perceptual_roughness_threshold",
            "linear_steps",
            "linear_march_exponent",
            "bisection_steps",
            "use_secant",
        ]
    }

    fn get(&self, name: &str) -> Option<ParameterValue> {
        Some(match name {
            "thickness" => ParameterValue::Number(self.thickness),
            "perceptual_roughness_threshold" => {
                ParameterValue::Number(self.perceptual_roughness_threshold)
            }
            "linear_steps" => ParameterValue::Number(self.linear_steps as f32),
            "linear_march_exponent" => ParameterValue::Number(self.linear_march_exponent),
            "bisection_steps" => ParameterValue::Number(self.bisection_steps as f32),
            "use_secant" => ParameterValue::Flag(self.use_secant),
            _ => return None,
        })
    }

    fn set(&mut self, name: &str, value: ParameterValue) -> Result<(), ParameterError> {
        match name {
            "thickness" => self.thickness = value.as_number(name)?,
            "perceptual_roughness_threshold" => {
                self.perceptual_roughness_threshold = value.as_number(name)?
            }
            "linear_steps" => self.linear_steps = value.as_count(name)?,
            "linear_march_exponent" => self.linear_march_exponent = value.as_number(name)?,
            "bisection_steps" => self.bisection_steps = value.as_count(name)?,
            "use_secant" => self.use_secant = value.as_flag(name)?,
            _ => return Err(ParameterError::Unknown(name.to_string())),
        }
        Ok(())
    }
}

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct AmbientOcclusionParameters {
    pub slice_count: u32,
    pub samples_per_slice_side: u32,
    pub constant_object_thickness: f32,
}

impl Default for AmbientOcclusionParameters {
    fn default() -> Self {
        Self {
            slice_count: AO_SLICE_COUNT,
            samples_per_slice_side: AO_SAMPLES_PER_SLICE_SIDE,
            constant_object_thickness: AO_OBJECT_THICKNESS,
        }
    }
}

impl AmbientOcclusionParameters {
    pub fn to_component(&self) -> ScreenSpaceAmbientOcclusion {
        ScreenSpaceAmbientOcclusion {
            quality_level: ScreenSpaceAmbientOcclusionQualityLevel::Custom {
                slice_count: self.slice_count.max(1),
                samples_per_slice_side: self.samples_per_slice_side.max(1),
            },
            constant_object_thickness: self.constant_object_thickness,
        }
    }
}

impl ParameterSet for AmbientOcclusionParameters {
    fn names(&self) -> &'static [&'static str] {
        &[
            "slice_count",
            "samples_per_slice_side",
            "constant_object_thickness",
        ]
    }

    fn get(&self, name: &str) -> Option<ParameterValue> {
        Some(match name {
            "slice_count" => ParameterValue::Number(self.slice_count as f32),
            "samples_per_slice_side" => ParameterValue::Number(self.samples_per_slice_side as f32),
            "constant_object_thickness" => ParameterValue::Number(self.constant_object_thickness),
            _ => return None,
        })
    }

    fn set(&mut self, name: &str, value: ParameterValue) -> Result<(), ParameterError> {
        match name {
            "slice_count" => self.slice_count = value.as_count(name)?,
            "samples_per_slice_side" => self.samples_per_slice_side = value.as_count(name)?,
            "constant_object_thickness" => {
                self.constant_object_thickness = value.as_number(name)?
            }
            _ => return Err(ParameterError::Unknown(name.to_string())),
        }
        Ok(())
    }
}

/// Stylistic glitch switches; the per-frame distortion itself is generated
/// by the glitch animator.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlitchControls {
    pub go_wild: bool,
}

impl ParameterSet for GlitchControls {
    fn names(&self) -> &'static [&'static str] {
        &["go_wild"]
    }

    fn get(&self, name: &str) -> Option<ParameterValue> {
        (name == "go_wild").then_some(ParameterValue::Flag(self.go_wild))
    }

    fn set(&mut self, name: &str, value: ParameterValue) -> Result<(), ParameterError> {
        match name {
            "go_wild" => self.go_wild = value.as_flag(name)?,
            _ => return Err(ParameterError::Unknown(name.to_string())),
        }
        Ok(())
    }
}

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct ToneMappingParameters {
    /// Linear multiplier applied before the ACES curve.
    pub exposure: f32,
}

impl Default for ToneMappingParameters {
    fn default() -> Self {
        Self {
            exposure: TONE_MAPPING_EXPOSURE,
        }
    }
}

impl ToneMappingParameters {
    pub const OPERATOR: Tonemapping = Tonemapping::AcesFitted;

    /// Scaling linear exposure by `k` shifts EV100 down by `log2(k)`.
    pub fn to_exposure(&self) -> Exposure {
        Exposure {
            ev100: Exposure::EV100_BLENDER - self.exposure.max(MIN_EXPOSURE).log2(),
        }
    }
}

impl ParameterSet for ToneMappingParameters {
    fn names(&self) -> &'static [&'static str] {
        &["exposure"]
    }

    fn get(&self, name: &str) -> Option<ParameterValue> {
        (name == "exposure").then_some(ParameterValue::Number(self.exposure))
    }

    fn set(&mut self, name: &str, value: ParameterValue) -> Result<(), ParameterError> {
        match name {
            "exposure" => self.exposure = value.as_number(name)?,
            _ => return Err(ParameterError::Unknown(name.to_string())),
        }
        Ok(())
    }
}

/// Write `value` into a parameter resource, flagging it changed only when the
/// stored value actually moved.
fn write_parameter<T: ParameterSet + Resource>(
    resource: &mut ResMut<T>,
    name: &str,
    value: ParameterValue,
) -> Result<bool, ParameterError> {
    let before = resource.get(name);
    resource.bypass_change_detection().set(name, value)?;
    let changed = resource.get(name) != before;
    if changed {
        resource.set_changed();
    }
    Ok(changed)
}

/// All pass parameter resources, addressed by [`PassKind`].
#[derive(SystemParam)]
pub struct PassParameters<'w> {
    reflections: ResMut<'w, ReflectionParameters>,
    ambient_occlusion: ResMut<'w, AmbientOcclusionParameters>,
    dot_screen: ResMut<'w, DotScreenSettings>,
    glitch: ResMut<'w, GlitchControls>,
    rgb_shift: ResMut<'w, RgbShiftSettings>,
    tone_mapping: ResMut<'w, ToneMappingParameters>,
}

impl PassParameters<'_> {
    pub fn get(&self, pass: PassKind) -> Result<&dyn ParameterSet, ParameterError> {
        Ok(match pass {
            PassKind::Reflections => &*self.reflections,
            PassKind::AmbientOcclusion => &*self.ambient_occlusion,
            PassKind::DotScreen => &*self.dot_screen,
            PassKind::Glitch => &*self.glitch,
            PassKind::RgbShift => &*self.rgb_shift,
            PassKind::ToneMapping => &*self.tone_mapping,
            PassKind::Render | PassKind::GammaCorrection | PassKind::Antialias => {
                return Err(ParameterError::NoParameters(pass));
            }
        })
    }

    pub fn snapshot(
        &self,
        pass: PassKind,
    ) -> Result<Vec<(&'static str, ParameterValue)>, ParameterError> {
        self.get(pass).map(|set| set.values())
    }

    /// Returns whether the value changed. Only the owning resource is marked
    /// changed, so only that pass re-syncs.
    pub fn set(
        &mut self,
        pass: PassKind,
        name: &str,
        value: ParameterValue,
    ) -> Result<bool, ParameterError> {
        match pass {
            PassKind::Reflections => write_parameter(&mut self.reflections, name, value),
            PassKind::AmbientOcclusion => write_parameter(&mut self.ambient_occlusion, name, value),
            PassKind::DotScreen => write_parameter(&mut self.dot_screen, name, value),
            PassKind::Glitch => write_parameter(&mut self.glitch, name, value),
            PassKind::RgbShift => write_parameter(&mut self.rgb_shift, name, value),
            PassKind::ToneMapping => write_parameter(&mut self.tone_mapping, name, value),
            PassKind::Render | PassKind::GammaCorrection | PassKind::Antialias => {
                Err(ParameterError::NoParameters(pass))
            }
        }
    }
}

pub fn init_pass_parameters(app: &mut App) {
    app.init_resource::<ReflectionParameters>()
        .init_resource::<AmbientOcclusionParameters>()
        .init_resource::<DotScreenSettings>()
        .init_resource::<GlitchControls>()
        .init_resource::<RgbShiftSettings>()
        .init_resource::<ToneMappingParameters>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bevy::ecs::system::RunSystemOnce;

    #[test]
    fn reflection_parameters_round_trip_by_name() {
        let mut params = ReflectionParameters::default();
        params
            .set("linear_steps", ParameterValue::Number(31.6))
            .expect("known parameter");
        params
            .set("use_secant", ParameterValue::Flag(false))
            .expect("known parameter");

        assert_eq!(params.get("linear_steps"), Some(ParameterValue::Number(32.0)));
        let component = params.to_component();
        assert_eq!(component.linear_steps, 32);
        assert!(!component.use_secant);
    }

    #[test]
    fn reflections_start_with_a_thin_surface() {
        let component = ReflectionParameters::default().to_component();
        assert_relative_eq!(component.thickness, 0.001);
        assert_relative_eq!(component.perceptual_roughness_threshold, 0.1);
    }

    #[test]
    fn unknown_and_mistyped_parameters_are_rejected() {
        let mut params = AmbientOcclusionParameters::default();
        assert_eq!(
            params.set("radius", ParameterValue::Number(1.0)),
            Err(ParameterError::Unknown("radius".to_string()))
        );
        assert!(matches!(
            params.set("slice_count", ParameterValue::Flag(true)),
            Err(ParameterError::TypeMismatch { .. })
        ));
        assert!(matches!(
            params.set("constant_object_thickness", ParameterValue::Number(f32::NAN)),
            Err(ParameterError::TypeMismatch { .. })
        ));
        assert_eq!(params, AmbientOcclusionParameters::default());
    }

    #[test]
    fn exposure_shifts_ev100() {
        let unit = ToneMappingParameters { exposure: 1.0 }.to_exposure();
        assert_relative_eq!(unit.ev100, Exposure::EV100_BLENDER);

        let doubled = ToneMappingParameters { exposure: 2.0 }.to_exposure();
        assert_relative_eq!(doubled.ev100, Exposure::EV100_BLENDER - 1.0);

        let black = ToneMappingParameters { exposure: 0.0 }.to_exposure();
        assert!(black.ev100.is_finite());
    }

    #[test]
    fn values_list_every_parameter() {
        let names: Vec<_> = ReflectionParameters::default()
            .values()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ReflectionParameters::default().names().to_vec());
    }

    #[test]
    fn setting_marks_only_the_owning_resource_changed() {
        let mut app = App::new();
        init_pass_parameters(&mut app);
        let world = app.world_mut();
        world.clear_trackers();

        let changed = world
            .run_system_once(|mut params: PassParameters| {
                params.set(PassKind::RgbShift, "amount", ParameterValue::Number(0.02))
            })
            .expect("system runs");
        assert_eq!(changed, Ok(true));

        assert!(world.is_resource_changed::<RgbShiftSettings>());
        assert!(!world.is_resource_changed::<ReflectionParameters>());
        assert!(!world.is_resource_changed::<ToneMappingParameters>());
    }

    #[test]
    fn passes_without_parameters_report_it() {
        let mut app = App::new();
        init_pass_parameters(&mut app);

        let result = app
            .world_mut()
            .run_system_once(|params: PassParameters| {
                params.snapshot(PassKind::Antialias).map(|values| values.len())
            })
            .expect("system runs");
        assert_eq!(result, Err(ParameterError::NoParameters(PassKind::Antialias)));
    }
}
