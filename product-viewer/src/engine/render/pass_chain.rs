use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::quality::viewport::Viewport;

/// One stage of the post-processing chain, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Render,
    Reflections,
    AmbientOcclusion,
    DotScreen,
    Glitch,
    RgbShift,
    ToneMapping,
    GammaCorrection,
    Antialias,
}

impl PassKind {
    pub const ORDER: [PassKind; 9] = [
        PassKind::Render,
        PassKind::Reflections,
        PassKind::AmbientOcclusion,
        PassKind::DotScreen,
        PassKind::Glitch,
        PassKind::RgbShift,
        PassKind::ToneMapping,
        PassKind::GammaCorrection,
        PassKind::Antialias,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PassKind::Render => "Render",
            PassKind::Reflections => "Reflections",
            PassKind::AmbientOcclusion => "Ambient occlusion",
            PassKind::DotScreen => "Dot screen",
            PassKind::Glitch => "Glitch",
            PassKind::RgbShift => "RGB shift",
            PassKind::ToneMapping => "Tone mapping",
            PassKind::GammaCorrection => "Gamma correction",
            PassKind::Antialias => "Antialias",
        }
    }

    /// The base render and the sRGB gamma encode always run.
    pub fn is_toggleable(self) -> bool {
        !matches!(self, PassKind::Render | PassKind::GammaCorrection)
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassChainError {
    #[error("the {0} pass cannot be disabled")]
    Fixed(PassKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassSlot {
    pub kind: PassKind,
    pub enabled: bool,
}

/// Fixed-order list of passes with their enablement.
///
/// The order mirrors the render graph; only the enabled flags change at runtime.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct PassChain {
    slots: Vec<PassSlot>,
}

impl Default for PassChain {
    fn default() -> Self {
        Self::with_antialias(false)
    }
}

impl PassChain {
    pub fn with_antialias(antialias: bool) -> Self {
        let slots = PassKind::ORDER
            .iter()
            .map(|&kind| PassSlot {
                kind,
                enabled: match kind {
                    PassKind::DotScreen | PassKind::Glitch | PassKind::RgbShift => false,
                    PassKind::Antialias => antialias,
                    _ => true,
                },
            })
            .collect();
        Self { slots }
    }

    pub fn slots(&self) -> &[PassSlot] {
        &self.slots
    }

    pub fn is_enabled(&self, kind: PassKind) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.kind == kind && slot.enabled)
    }

    /// Returns whether the flag actually changed.
    pub fn set_enabled(&mut self, kind: PassKind, enabled: bool) -> Result<bool, PassChainError> {
        if !kind.is_toggleable() {
            return if enabled {
                Ok(false)
            } else {
                Err(PassChainError::Fixed(kind))
            };
        }

        let mut changed = false;
        for slot in self.slots.iter_mut().filter(|slot| slot.kind == kind) {
            changed |= slot.enabled != enabled;
            slot.enabled = enabled;
        }
        Ok(changed)
    }

    pub fn enabled_passes(&self) -> impl Iterator<Item = PassKind> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.enabled)
            .map(|slot| slot.kind)
    }
}

/// Install the startup chain. Antialiasing starts enabled only at a pixel
/// ratio of exactly 1.
pub fn init_pass_chain(mut commands: Commands, viewport: Res<Viewport>) {
    let antialias = viewport.pixel_ratio == 1.0;
    info!(
        "Pass chain initialised (antialias {})",
        if antialias { "on" } else { "off" }
    );
    commands.insert_resource(PassChain::with_antialias(antialias));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_matches_scene_setup() {
        let chain = PassChain::default();
        let enabled: Vec<_> = chain.enabled_passes().collect();
        assert_eq!(
            enabled,
            vec![
                PassKind::Render,
                PassKind::Reflections,
                PassKind::AmbientOcclusion,
                PassKind::ToneMapping,
                PassKind::GammaCorrection,
            ]
        );
        assert!(PassChain::with_antialias(true).is_enabled(PassKind::Antialias));
    }

    #[test]
    fn toggling_keeps_order() {
        let mut chain = PassChain::default();
        assert_eq!(chain.set_enabled(PassKind::RgbShift, true), Ok(true));
        assert_eq!(chain.set_enabled(PassKind::RgbShift, true), Ok(false));
        assert_eq!(chain.set_enabled(PassKind::Reflections, false), Ok(true));

        let order: Vec<_> = chain.slots().iter().map(|slot| slot.kind).collect();
        assert_eq!(order, PassKind::ORDER.to_vec());
        assert!(chain.is_enabled(PassKind::RgbShift));
        assert!(!chain.is_enabled(PassKind::Reflections));
    }

    #[test]
    fn fixed_passes_cannot_be_disabled() {
        let mut chain = PassChain::default();
        assert_eq!(
            chain.set_enabled(PassKind::GammaCorrection, false),
            Err(PassChainError::Fixed(PassKind::GammaCorrection))
        );
        assert_eq!(chain.set_enabled(PassKind::Render, true), Ok(false));
        assert!(chain.is_enabled(PassKind::Render));
    }

    #[test]
    fn pass_names_parse_from_snake_case() {
        let kind: PassKind = serde_json::from_str("\"ambient_occlusion\"").expect("valid name");
        assert_eq!(kind, PassKind::AmbientOcclusion);
    }
}
