use bevy::color::Color;

pub const BACKGROUND_COLOUR: Color = Color::WHITE;

/// Environment contribution applied to every normalized model material.
pub const ENVIRONMENT_INTENSITY: f32 = 3.5;

/// Luminance (cd/m²) of an environment map texel with value 1.0 before the
/// per-material intensity is applied.
pub const ENVIRONMENT_BASE_LUMINANCE: f32 = 1000.0;

pub const SPECULAR_CUBEMAP_SIZE: u32 = 256;
pub const DIFFUSE_CUBEMAP_SIZE: u32 = 16;

/// Linear exposure multiplier on top of the camera's default EV100.
pub const TONE_MAPPING_EXPOSURE: f32 = 1.5;

pub const REFLECTION_THICKNESS: f32 = 0.001;
pub const REFLECTION_ROUGHNESS_THRESHOLD: f32 = 0.1;
pub const REFLECTION_LINEAR_STEPS: u32 = 16;
pub const REFLECTION_LINEAR_MARCH_EXPONENT: f32 = 1.0;
pub const REFLECTION_BISECTION_STEPS: u32 = 4;

pub const AO_SLICE_COUNT: u32 = 3;
pub const AO_SAMPLES_PER_SLICE_SIDE: u32 = 3;
pub const AO_OBJECT_THICKNESS: f32 = 0.05;

pub const DOT_SCREEN_SCALE: f32 = 1.0;
pub const DOT_SCREEN_ANGLE: f32 = 1.57;

pub const RGB_SHIFT_AMOUNT: f32 = 0.005;
pub const RGB_SHIFT_ANGLE: f32 = 0.0;

/// Frames between strong glitches are drawn from this half-open range.
pub const GLITCH_TRIGGER_MIN_FRAMES: u32 = 120;
pub const GLITCH_TRIGGER_MAX_FRAMES: u32 = 240;
pub const GLITCH_SEED: u64 = 0x5EED_F00D;
