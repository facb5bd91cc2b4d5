use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use constants::camera::{
    DAMPING_FACTOR, MAX_DISTANCE, MAX_POLAR_ANGLE, MIN_DISTANCE, MIN_POLAR_ANGLE, ORBIT_PIVOT,
    ROTATE_SPEED, ZOOM_BASE, ZOOM_SPEED,
};
use std::f32::consts::TAU;

use crate::engine::debug_panel::DebugPanel;

/// Keeps the polar angle off the poles so the orbit basis stays defined.
const POLAR_EPSILON: f32 = 1e-6;

/// Pixel-unit wheel deltas are divided by this to approximate line notches.
const PIXELS_PER_NOTCH: f32 = 100.0;

/// Begin/end of a user gesture on the orbit controls.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitInteraction {
    Started,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitSettings {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_rotate: bool,
    pub enable_zoom: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: DAMPING_FACTOR,
            enable_rotate: true,
            enable_zoom: true,
            rotate_speed: ROTATE_SPEED,
            zoom_speed: ZOOM_SPEED,
            min_distance: MIN_DISTANCE,
            max_distance: MAX_DISTANCE,
            min_polar_angle: MIN_POLAR_ANGLE,
            max_polar_angle: MAX_POLAR_ANGLE,
        }
    }
}

/// Spherical coordinates around the pivot. `polar` is measured from +Y,
/// `azimuth` around +Y starting at +Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub polar: f32,
    pub azimuth: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return Self {
                radius: 0.0,
                polar: 0.0,
                azimuth: 0.0,
            };
        }
        Self {
            radius,
            polar: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            azimuth: offset.x.atan2(offset.z),
        }
    }

    pub fn to_offset(self) -> Vec3 {
        let sin_polar = self.polar.sin();
        Vec3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        )
    }
}

/// Damped orbit controller attached to the viewer camera.
///
/// Input accumulates into `pending_*`; `update` consumes a damped share of it
/// each frame and returns the new camera position.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub pivot: Vec3,
    pub settings: OrbitSettings,
    pending_azimuth: f32,
    pending_polar: f32,
    pending_scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(ORBIT_PIVOT, OrbitSettings::default())
    }
}

impl OrbitControls {
    pub fn new(pivot: Vec3, settings: OrbitSettings) -> Self {
        Self {
            pivot,
            settings,
            pending_azimuth: 0.0,
            pending_polar: 0.0,
            pending_scale: 1.0,
        }
    }

    /// Queue a rotation in radians. Positive `left` spins the camera to the
    /// left around the pivot, positive `up` raises it.
    pub fn rotate(&mut self, left: f32, up: f32) {
        if !self.settings.enable_rotate {
            return;
        }
        self.pending_azimuth -= left;
        self.pending_polar -= up;
    }

    /// Queue a drag of `delta` pixels on a viewport `viewport_height` pixels tall.
    pub fn rotate_by_pixels(&mut self, delta: Vec2, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let speed = TAU * self.settings.rotate_speed / viewport_height;
        self.rotate(delta.x * speed, delta.y * speed);
    }

    /// Queue a zoom of `notches` wheel steps; positive moves toward the pivot.
    pub fn zoom(&mut self, notches: f32) {
        if !self.settings.enable_zoom || notches == 0.0 {
            return;
        }
        let step = ZOOM_BASE.powf(self.settings.zoom_speed);
        self.pending_scale *= step.powf(notches);
    }

    pub fn has_pending_motion(&self) -> bool {
        self.pending_azimuth.abs() > f32::EPSILON
            || self.pending_polar.abs() > f32::EPSILON
            || (self.pending_scale - 1.0).abs() > f32::EPSILON
    }

    /// Advance one frame from `position` and return the new camera position.
    pub fn update(&mut self, position: Vec3) -> Vec3 {
        let settings = self.settings;
        let mut spherical = Spherical::from_offset(position - self.pivot);

        let share = if settings.enable_damping {
            settings.damping_factor
        } else {
            1.0
        };
        spherical.azimuth += self.pending_azimuth * share;
        spherical.polar += self.pending_polar * share;

        spherical.polar = spherical
            .polar
            .clamp(settings.min_polar_angle, settings.max_polar_angle)
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);

        spherical.radius = (spherical.radius * self.pending_scale)
            .clamp(settings.min_distance, settings.max_distance);

        if settings.enable_damping {
            self.pending_azimuth *= 1.0 - settings.damping_factor;
            self.pending_polar *= 1.0 - settings.damping_factor;
        } else {
            self.pending_azimuth = 0.0;
            self.pending_polar = 0.0;
        }
        self.pending_scale = 1.0;

        self.pivot + spherical.to_offset()
    }
}

/// Translate mouse input into orbit motion and gesture events.
pub fn orbit_input_system(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut scroll_events: EventReader<MouseWheel>,
    windows: Query<&Window, With<PrimaryWindow>>,
    panel: Res<DebugPanel>,
    mut controls: Query<&mut OrbitControls>,
    mut interactions: EventWriter<OrbitInteraction>,
    mut dragging: Local<bool>,
) {
    let mouse_delta: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    let scroll_notches: f32 = scroll_events
        .read()
        .map(|event| match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y / PIXELS_PER_NOTCH,
        })
        .sum();

    let Ok(mut controls) = controls.single_mut() else {
        return;
    };

    if *dragging {
        if mouse_button.pressed(MouseButton::Left) && mouse_delta != Vec2::ZERO {
            let height = windows.single().map(|w| w.height()).unwrap_or(1.0);
            controls.rotate_by_pixels(mouse_delta, height);
        }
        if !mouse_button.pressed(MouseButton::Left) {
            *dragging = false;
            interactions.write(OrbitInteraction::Ended);
        }
        return;
    }

    // The panel owns the pointer while it is hovered or being dragged.
    if panel.pointer_captured {
        return;
    }

    if mouse_button.just_pressed(MouseButton::Left) && controls.settings.enable_rotate {
        *dragging = true;
        interactions.write(OrbitInteraction::Started);
    }

    if scroll_notches.abs() > f32::EPSILON && controls.settings.enable_zoom {
        interactions.write(OrbitInteraction::Started);
        controls.zoom(scroll_notches);
        interactions.write(OrbitInteraction::Ended);
    }
}

/// Apply one damped control step to every orbiting camera.
pub fn update_orbit_controls(mut cameras: Query<(&mut Transform, &mut OrbitControls)>) {
    for (mut transform, mut controls) in &mut cameras {
        transform.translation = controls.update(transform.translation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const START: Vec3 = Vec3::new(1.0, 0.59, 0.0);

    #[test]
    fn spherical_round_trips_offsets() {
        let offset = Vec3::new(0.3, 0.8, -0.4);
        let back = Spherical::from_offset(offset).to_offset();
        assert_relative_eq!(back.x, offset.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, offset.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, offset.z, epsilon = 1e-5);
    }

    #[test]
    fn idle_update_keeps_position() {
        let mut controls = OrbitControls::default();
        let next = controls.update(START);
        assert_relative_eq!(next.distance(START), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn damping_spreads_rotation_over_frames() {
        let mut controls = OrbitControls::default();
        controls.rotate(0.5, 0.0);

        let first = controls.update(START);
        let first_step = Spherical::from_offset(first).azimuth - Spherical::from_offset(START).azimuth;
        assert_relative_eq!(first_step, -0.5 * DAMPING_FACTOR, epsilon = 1e-5);
        assert!(controls.has_pending_motion());

        let mut position = first;
        for _ in 0..400 {
            position = controls.update(position);
        }
        let total = Spherical::from_offset(position).azimuth - Spherical::from_offset(START).azimuth;
        assert_relative_eq!(total, -0.5, epsilon = 1e-3);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut controls = OrbitControls::default();
        controls.rotate(0.0, -10.0);
        let mut position = START;
        for _ in 0..200 {
            position = controls.update(position);
        }
        let polar = Spherical::from_offset(position).polar;
        assert!(polar <= MAX_POLAR_ANGLE + 1e-5);
        assert!(polar >= MAX_POLAR_ANGLE - 1e-3);
    }

    #[test]
    fn zoom_is_clamped_to_max_distance() {
        let mut controls = OrbitControls::default();
        controls.zoom(-200.0);
        let position = controls.update(START);
        assert_relative_eq!(position.length(), MAX_DISTANCE, epsilon = 1e-5);
    }

    #[test]
    fn zoom_in_shrinks_radius() {
        let mut controls = OrbitControls::default();
        controls.zoom(1.0);
        let position = controls.update(START);
        assert_relative_eq!(position.length(), START.length() * ZOOM_BASE, epsilon = 1e-5);
    }

    #[test]
    fn disabled_rotate_ignores_input() {
        let mut controls = OrbitControls::new(
            Vec3::ZERO,
            OrbitSettings {
                enable_rotate: false,
                ..default()
            },
        );
        controls.rotate(1.0, 1.0);
        assert!(!controls.has_pending_motion());
    }
}
