use std::time::Duration;

use bevy::prelude::*;
use constants::quality::{REDUCED_PIXEL_RATIO_FACTOR, RESTORE_DELAY_MS};

use crate::engine::camera::orbit_controls::OrbitInteraction;
use crate::engine::quality::viewport::{Viewport, cap_pixel_ratio};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveQualitySettings {
    pub reduced_factor: f32,
    pub restore_delay: Duration,
}

impl Default for AdaptiveQualitySettings {
    fn default() -> Self {
        Self {
            reduced_factor: REDUCED_PIXEL_RATIO_FACTOR,
            restore_delay: Duration::from_millis(RESTORE_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityState {
    Normal,
    /// Lowered resolution. `restore_at` is armed once the interaction ends.
    Reduced { restore_at: Option<Duration> },
}

/// Lowers the render resolution while the camera is being manipulated and
/// restores it after a quiet period.
///
/// The controller never reads a clock itself; callers pass the current time
/// so the debounce can be driven by a virtual clock in tests.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct AdaptiveQuality {
    state: QualityState,
    settings: AdaptiveQualitySettings,
}

impl Default for AdaptiveQuality {
    fn default() -> Self {
        Self::new(AdaptiveQualitySettings::default())
    }
}

impl AdaptiveQuality {
    pub fn new(settings: AdaptiveQualitySettings) -> Self {
        Self {
            state: QualityState::Normal,
            settings,
        }
    }

    pub fn state(&self) -> QualityState {
        self.state
    }

    pub fn is_reduced(&self) -> bool {
        matches!(self.state, QualityState::Reduced { .. })
    }

    /// Drop to reduced resolution, cancelling any pending restore.
    pub fn interaction_started(&mut self) {
        self.state = QualityState::Reduced { restore_at: None };
    }

    /// Arm (or re-arm) the restore deadline.
    pub fn interaction_ended(&mut self, now: Duration) {
        if let QualityState::Reduced { restore_at } = &mut self.state {
            *restore_at = Some(now + self.settings.restore_delay);
        }
    }

    /// Fire the restore if its deadline has passed. Returns true on transition.
    pub fn advance(&mut self, now: Duration) -> bool {
        match self.state {
            QualityState::Reduced {
                restore_at: Some(deadline),
            } if now >= deadline => {
                self.state = QualityState::Normal;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_restore(&mut self) {
        if let QualityState::Reduced { restore_at } = &mut self.state {
            *restore_at = None;
        }
    }

    /// Effective pixel ratio for the given device pixel ratio in the current state.
    pub fn pixel_ratio(&self, device_pixel_ratio: f32) -> f32 {
        match self.state {
            QualityState::Normal => cap_pixel_ratio(device_pixel_ratio),
            QualityState::Reduced { .. } => {
                cap_pixel_ratio(device_pixel_ratio * self.settings.reduced_factor)
            }
        }
    }
}

/// Sent whenever the adaptive controller changes the render pixel ratio.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct QualityChanged {
    pub reduced: bool,
    pub pixel_ratio: f32,
}

pub fn adaptive_quality_system(
    mut interactions: EventReader<OrbitInteraction>,
    time: Res<Time<Real>>,
    mut quality: ResMut<AdaptiveQuality>,
    mut viewport: ResMut<Viewport>,
    mut changes: EventWriter<QualityChanged>,
) {
    let now = time.elapsed();
    let was_reduced = quality.is_reduced();

    for interaction in interactions.read() {
        match interaction {
            OrbitInteraction::Started => quality.interaction_started(),
            OrbitInteraction::Ended => quality.interaction_ended(now),
        }
    }
    quality.advance(now);

    let pixel_ratio = quality.pixel_ratio(viewport.device_pixel_ratio);
    if (viewport.pixel_ratio - pixel_ratio).abs() > f32::EPSILON {
        viewport.set_pixel_ratio(pixel_ratio);
    }

    if quality.is_reduced() != was_reduced {
        debug!(
            "Adaptive quality {} (pixel ratio {:.2})",
            if quality.is_reduced() { "reduced" } else { "restored" },
            pixel_ratio
        );
        changes.write(QualityChanged {
            reduced: quality.is_reduced(),
            pixel_ratio,
        });
    }
}

/// Teardown: a restore must not fire after the viewer has shut down.
pub fn cancel_pending_restore(mut quality: ResMut<AdaptiveQuality>) {
    quality.cancel_restore();
}
