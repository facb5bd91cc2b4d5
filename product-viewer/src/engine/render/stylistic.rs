use std::f32::consts::PI;

use bevy::core_pipeline::core_3d::graph::{Core3d, Node3d};
use bevy::prelude::*;
use bevy::render::{
    RenderApp, extract_component::ExtractComponent, render_graph::RenderGraphApp,
    render_resource::ShaderType,
};
use constants::render_settings::{
    DOT_SCREEN_ANGLE, DOT_SCREEN_SCALE, GLITCH_SEED, GLITCH_TRIGGER_MAX_FRAMES,
    GLITCH_TRIGGER_MIN_FRAMES, RGB_SHIFT_AMOUNT, RGB_SHIFT_ANGLE,
};
use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::engine::render::parameters::{ParameterError, ParameterSet, ParameterValue};
use crate::engine::render::post_effect::{PostEffect, PostEffectPlugin, StylisticPassLabel};

/// Halftone dot pattern over the luminance of the frame.
#[derive(Resource, Component, Debug, Clone, Copy, PartialEq, ExtractComponent, ShaderType)]
pub struct DotScreenSettings {
    /// Pattern origin in pattern-space pixels.
    pub center: Vec2,
    pub angle: f32,
    pub scale: f32,
}

impl Default for DotScreenSettings {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            angle: DOT_SCREEN_ANGLE,
            scale: DOT_SCREEN_SCALE,
        }
    }
}

impl PostEffect for DotScreenSettings {
    const SHADER_PATH: &'static str = "shaders/dot_screen.wgsl";
    const LABEL: StylisticPassLabel = StylisticPassLabel::DotScreen;
    const NAME: &'static str = "dot_screen_pass";
}

impl ParameterSet for DotScreenSettings {
    fn names(&self) -> &'static [&'static str] {
        &["scale", "angle"]
    }

    fn get(&self, name: &str) -> Option<ParameterValue> {
        match name {
            "scale" => Some(ParameterValue::Number(self.scale)),
            "angle" => Some(ParameterValue::Number(self.angle)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: ParameterValue) -> Result<(), ParameterError> {
        match name {
            "scale" => self.scale = value.as_number(name)?,
            "angle" => self.angle = value.as_number(name)?,
            _ => return Err(ParameterError::Unknown(name.to_string())),
        }
        Ok(())
    }
}

/// Splits the red and blue channels apart along `angle`.
#[derive(Resource, Component, Debug, Clone, Copy, PartialEq, ExtractComponent, ShaderType)]
pub struct RgbShiftSettings {
    /// Offset in UV units.
    pub amount: f32,
    pub angle: f32,
}

impl Default for RgbShiftSettings {
    fn default() -> Self {
        Self {
            amount: RGB_SHIFT_AMOUNT,
            angle: RGB_SHIFT_ANGLE,
        }
    }
}

impl PostEffect for RgbShiftSettings {
    const SHADER_PATH: &'static str = "shaders/rgb_shift.wgsl";
    const LABEL: StylisticPassLabel = StylisticPassLabel::RgbShift;
    const NAME: &'static str = "rgb_shift_pass";
}

impl ParameterSet for RgbShiftSettings {
    fn names(&self) -> &'static [&'static str] {
        &["amount", "angle"]
    }

    fn get(&self, name: &str) -> Option<ParameterValue> {
        match name {
            "amount" => Some(ParameterValue::Number(self.amount)),
            "angle" => Some(ParameterValue::Number(self.angle)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: ParameterValue) -> Result<(), ParameterError> {
        match name {
            "amount" => self.amount = value.as_number(name)?,
            "angle" => self.angle = value.as_number(name)?,
            _ => return Err(ParameterError::Unknown(name.to_string())),
        }
        Ok(())
    }
}

/// Per-frame glitch uniforms. Regenerated every frame while the pass is on.
#[derive(Component, Debug, Clone, Copy, PartialEq, ExtractComponent, ShaderType)]
pub struct GlitchSettings {
    pub amount: f32,
    pub angle: f32,
    pub seed: f32,
    pub seed_x: f32,
    pub seed_y: f32,
    pub distortion_x: f32,
    pub distortion_y: f32,
    pub column_scale: f32,
    /// Non-zero passes the frame through untouched.
    pub bypass: u32,
}

impl Default for GlitchSettings {
    fn default() -> Self {
        Self {
            amount: 0.0,
            angle: 0.0,
            seed: 0.0,
            seed_x: 0.0,
            seed_y: 0.0,
            distortion_x: 0.0,
            distortion_y: 0.0,
            column_scale: 0.05,
            bypass: 1,
        }
    }
}

impl PostEffect for GlitchSettings {
    const SHADER_PATH: &'static str = "shaders/glitch.wgsl";
    const LABEL: StylisticPassLabel = StylisticPassLabel::Glitch;
    const NAME: &'static str = "glitch_pass";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlitchStrength {
    Strong,
    Weak,
    Bypass,
}

/// Frame-counting glitch scheduler.
///
/// A strong glitch fires every `trigger` frames (every frame when going
/// wild), after which a new interval is drawn. The first fifth of each
/// interval carries a weak glitch; the rest of the time the pass bypasses.
#[derive(Resource, Debug, Clone)]
pub struct GlitchGenerator {
    rng: SmallRng,
    frame: u32,
    trigger: u32,
}

impl Default for GlitchGenerator {
    fn default() -> Self {
        Self::new(GLITCH_SEED)
    }
}

impl GlitchGenerator {
    pub fn new(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let trigger = draw_trigger(&mut rng);
        Self {
            rng,
            frame: 0,
            trigger,
        }
    }

    pub fn trigger(&self) -> u32 {
        self.trigger
    }

    pub fn strength(&self, go_wild: bool) -> GlitchStrength {
        let phase = self.frame % self.trigger;
        if phase == 0 || go_wild {
            GlitchStrength::Strong
        } else if (phase as f32) < self.trigger as f32 / 5.0 {
            GlitchStrength::Weak
        } else {
            GlitchStrength::Bypass
        }
    }

    /// Produce the uniforms for the next frame.
    pub fn next_frame(&mut self, go_wild: bool) -> GlitchSettings {
        let mut settings = GlitchSettings {
            seed: self.rng.r#gen::<f32>(),
            bypass: 0,
            ..default()
        };

        match self.strength(go_wild) {
            GlitchStrength::Strong => {
                settings.amount = self.rng.r#gen::<f32>() / 30.0;
                settings.angle = self.rng.gen_range(-PI..PI);
                settings.seed_x = self.rng.gen_range(-1.0..1.0);
                settings.seed_y = self.rng.gen_range(-1.0..1.0);
                settings.distortion_x = self.rng.gen_range(0.0..1.0);
                settings.distortion_y = self.rng.gen_range(0.0..1.0);
                self.frame = 0;
                self.trigger = draw_trigger(&mut self.rng);
            }
            GlitchStrength::Weak => {
                settings.amount = self.rng.r#gen::<f32>() / 90.0;
                settings.angle = self.rng.gen_range(-PI..PI);
                settings.distortion_x = self.rng.gen_range(0.0..1.0);
                settings.distortion_y = self.rng.gen_range(0.0..1.0);
                settings.seed_x = self.rng.gen_range(-0.3..0.3);
                settings.seed_y = self.rng.gen_range(-0.3..0.3);
            }
            GlitchStrength::Bypass => settings.bypass = 1,
        }

        self.frame += 1;
        settings
    }
}

fn draw_trigger(rng: &mut SmallRng) -> u32 {
    rng.gen_range(GLITCH_TRIGGER_MIN_FRAMES..GLITCH_TRIGGER_MAX_FRAMES)
}

/// Dot screen, glitch and RGB shift, chained between the main pass and
/// tone mapping.
pub struct StylisticPassesPlugin;

impl Plugin for StylisticPassesPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            PostEffectPlugin::<DotScreenSettings>::default(),
            PostEffectPlugin::<GlitchSettings>::default(),
            PostEffectPlugin::<RgbShiftSettings>::default(),
        ))
        .init_resource::<GlitchGenerator>();

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.add_render_graph_edges(
            Core3d,
            (
                Node3d::EndMainPass,
                StylisticPassLabel::DotScreen,
                StylisticPassLabel::Glitch,
                StylisticPassLabel::RgbShift,
                Node3d::Tonemapping,
            ),
        );
    }
}
