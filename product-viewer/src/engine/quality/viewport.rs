use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowBackendScaleFactorChanged, WindowResized};
use constants::quality::MAX_PIXEL_RATIO;

use crate::engine::camera::viewport_camera::ViewerCamera;
use crate::engine::quality::adaptive::AdaptiveQuality;

/// Smallest pixel ratio the render target is ever sized with.
const MIN_PIXEL_RATIO: f32 = 0.1;

/// Clamp a requested pixel ratio into the supported range.
pub fn cap_pixel_ratio(ratio: f32) -> f32 {
    if !ratio.is_finite() {
        return 1.0;
    }
    ratio.clamp(MIN_PIXEL_RATIO, MAX_PIXEL_RATIO)
}

/// Logical canvas size plus the pixel ratios used to size render targets.
///
/// `width` and `height` are CSS/logical pixels. `device_pixel_ratio` is what
/// the platform reports; `pixel_ratio` is what rendering actually uses.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
            pixel_ratio: cap_pixel_ratio(device_pixel_ratio),
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 && self.width > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    pub fn resize(&mut self, width: f32, height: f32, device_pixel_ratio: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.device_pixel_ratio = device_pixel_ratio;
    }

    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = cap_pixel_ratio(ratio);
    }

    /// Render target size the pipeline should allocate at the current ratio.
    pub fn physical_size(&self) -> UVec2 {
        UVec2::new(
            ((self.width * self.pixel_ratio).round() as u32).max(1),
            ((self.height * self.pixel_ratio).round() as u32).max(1),
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0, 1.0)
    }
}

/// Point a perspective projection at the viewport's aspect ratio.
pub fn sync_projection(projection: &mut Projection, viewport: &Viewport) {
    if let Projection::Perspective(perspective) = projection {
        perspective.aspect_ratio = viewport.aspect_ratio();
    }
}

/// Seed the viewport from the primary window once it exists.
pub fn initialise_viewport(
    windows: Query<&Window, With<PrimaryWindow>>,
    quality: Res<AdaptiveQuality>,
    mut viewport: ResMut<Viewport>,
) {
    let Ok(window) = windows.single() else {
        return;
    };

    let device_pixel_ratio = window.resolution.base_scale_factor();
    let mut next = *viewport;
    next.resize(window.width(), window.height(), device_pixel_ratio);
    next.set_pixel_ratio(quality.pixel_ratio(device_pixel_ratio));
    viewport.set_if_neq(next);

    info!(
        "Viewport {}x{} at device pixel ratio {:.2}, rendering at {:.2}",
        next.width, next.height, next.device_pixel_ratio, next.pixel_ratio
    );
}

/// Keep viewport size, device pixel ratio and camera aspect in step with the window.
pub fn handle_viewport_resize(
    mut resized: EventReader<WindowResized>,
    mut scale_changed: EventReader<WindowBackendScaleFactorChanged>,
    windows: Query<&Window, With<PrimaryWindow>>,
    quality: Res<AdaptiveQuality>,
    mut viewport: ResMut<Viewport>,
    mut cameras: Query<&mut Projection, With<ViewerCamera>>,
) {
    let resize_seen = resized.read().count() > 0;
    let scale_seen = scale_changed.read().count() > 0;
    if !resize_seen && !scale_seen {
        return;
    }

    let Ok(window) = windows.single() else {
        return;
    };

    let device_pixel_ratio = window.resolution.base_scale_factor();
    let mut next = *viewport;
    next.resize(window.width(), window.height(), device_pixel_ratio);
    next.set_pixel_ratio(quality.pixel_ratio(device_pixel_ratio));

    if viewport.set_if_neq(next) {
        debug!(
            "Viewport resized to {}x{} (physical {:?})",
            next.width,
            next.height,
            next.physical_size()
        );
    }

    for mut projection in &mut cameras {
        sync_projection(&mut projection, &next);
    }
}
