use std::f32::consts::TAU;

use crate::engine::render::parameters::{ParameterError, ParameterValue, PassParameters};
use crate::engine::render::pass_chain::PassKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Slider { min: f32, max: f32, step: f32 },
    Checkbox,
}

impl Control {
    /// Clamp to range and snap to step. Checkboxes only accept flags.
    pub fn constrain(&self, name: &str, value: ParameterValue) -> Result<ParameterValue, ParameterError> {
        match *self {
            Control::Slider { min, max, step } => {
                let value = value.as_number(name)?.clamp(min, max);
                let snapped = if step > 0.0 {
                    min + ((value - min) / step).round() * step
                } else {
                    value
                };
                Ok(ParameterValue::Number(snapped.clamp(min, max)))
            }
            Control::Checkbox => value.as_flag(name).map(ParameterValue::Flag),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    pub pass: PassKind,
    pub field: &'static str,
    pub control: Control,
}

const fn slider(pass: PassKind, field: &'static str, min: f32, max: f32, step: f32) -> Binding {
    Binding {
        pass,
        field,
        control: Control::Slider { min, max, step },
    }
}

const fn checkbox(pass: PassKind, field: &'static str) -> Binding {
    Binding {
        pass,
        field,
        control: Control::Checkbox,
    }
}

pub const BINDINGS: &[Binding] = &[
    slider(PassKind::Reflections, "thickness", 0.0, 0.1, 0.0001),
    slider(PassKind::Reflections, "perceptual_roughness_threshold", 0.0, 1.0, 0.01),
    slider(PassKind::Reflections, "linear_steps", 1.0, 64.0, 1.0),
    slider(PassKind::Reflections, "linear_march_exponent", 0.5, 4.0, 0.1),
    slider(PassKind::Reflections, "bisection_steps", 0.0, 16.0, 1.0),
    checkbox(PassKind::Reflections, "use_secant"),
    slider(PassKind::AmbientOcclusion, "slice_count", 1.0, 9.0, 1.0),
    slider(PassKind::AmbientOcclusion, "samples_per_slice_side", 1.0, 8.0, 1.0),
    slider(PassKind::AmbientOcclusion, "constant_object_thickness", 0.01, 1.0, 0.01),
    slider(PassKind::DotScreen, "scale", 0.1, 4.0, 0.01),
    slider(PassKind::DotScreen, "angle", 0.0, TAU, 0.01),
    checkbox(PassKind::Glitch, "go_wild"),
    slider(PassKind::RgbShift, "amount", 0.0, 0.05, 0.0005),
    slider(PassKind::RgbShift, "angle", 0.0, TAU, 0.01),
    slider(PassKind::ToneMapping, "exposure", 0.0, 4.0, 0.01),
];

pub fn bindings_for(pass: PassKind) -> impl Iterator<Item = &'static Binding> {
    BINDINGS.iter().filter(move |binding| binding.pass == pass)
}

pub fn find_binding(pass: PassKind, field: &str) -> Option<&'static Binding> {
    bindings_for(pass).find(|binding| binding.field == field)
}

/// Constrain `value` by the binding's control and write it to the owning pass.
pub fn write_binding(
    params: &mut PassParameters,
    binding: &Binding,
    value: ParameterValue,
) -> Result<bool, ParameterError> {
    let value = binding.control.constrain(binding.field, value)?;
    params.set(binding.pass, binding.field, value)
}
