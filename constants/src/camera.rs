use bevy::math::Vec3;

/// Vertical field of view in degrees.
pub const FOV_DEGREES: f32 = 35.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 15.0;

pub const INITIAL_POSITION: Vec3 = Vec3::new(1.0, 0.59, 0.0);

/// Point the camera is re-aimed at after every control update.
pub const LOOK_AT_TARGET: Vec3 = Vec3::new(0.0, 0.15, 0.0);

/// Centre the orbit controls rotate around.
pub const ORBIT_PIVOT: Vec3 = Vec3::ZERO;

pub const DAMPING_FACTOR: f32 = 0.05;
pub const MIN_DISTANCE: f32 = 0.0;
pub const MAX_DISTANCE: f32 = 2.0;
pub const MIN_POLAR_ANGLE: f32 = 0.0;
pub const MAX_POLAR_ANGLE: f32 = std::f32::consts::PI / 2.5;

pub const ROTATE_SPEED: f32 = 1.0;

/// Per-notch dolly scale before exponentiation by the zoom speed.
pub const ZOOM_BASE: f32 = 0.95;
pub const ZOOM_SPEED: f32 = 1.0;
