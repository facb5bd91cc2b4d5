use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use crate::engine::assets::scene_manifest::SceneManifest;
use crate::engine::debug_panel::bindings::{Binding, Control, bindings_for, write_binding};
use crate::engine::render::parameters::{ParameterValue, PassParameters};
use crate::engine::render::pass_chain::{PassChain, PassKind};

#[derive(Resource, Debug, Default, Clone, PartialEq, Eq)]
pub struct DebugPanel {
    pub visible: bool,
    /// The panel is hovered or being dragged; camera input is suppressed.
    pub pointer_captured: bool,
}

/// F1 flips panel visibility on native builds.
pub fn toggle_debug_panel(keys: Res<ButtonInput<KeyCode>>, mut panel: ResMut<DebugPanel>) {
    if keys.just_pressed(KeyCode::F1) {
        panel.visible = !panel.visible;
        info!("Debug panel {}", if panel.visible { "shown" } else { "hidden" });
    }
}

pub fn apply_manifest_panel_flag(manifest: Res<SceneManifest>, mut panel: ResMut<DebugPanel>) {
    if manifest.debug_panel {
        panel.visible = true;
    }
}

pub fn debug_panel_ui(
    mut contexts: EguiContexts,
    mut panel: ResMut<DebugPanel>,
    mut chain: ResMut<PassChain>,
    mut params: PassParameters,
) -> Result {
    let ctx = contexts.ctx_mut()?;

    let captured = panel.visible && (ctx.wants_pointer_input() || ctx.is_pointer_over_area());
    if panel.pointer_captured != captured {
        panel.pointer_captured = captured;
    }
    if !panel.visible {
        return Ok(());
    }

    egui::Window::new("Debug")
        .default_width(300.0)
        .resizable(false)
        .show(ctx, |ui| {
            ui.collapsing("Passes", |ui| {
                let slots = chain.slots().to_vec();
                for slot in slots.into_iter().filter(|slot| slot.kind.is_toggleable()) {
                    let mut enabled = slot.enabled;
                    if ui.checkbox(&mut enabled, slot.kind.label()).changed() {
                        if let Err(error) = chain.set_enabled(slot.kind, enabled) {
                            warn!("Pass toggle rejected: {error}");
                        }
                    }
                }
            });

            for pass in PassKind::ORDER {
                let bindings: Vec<&Binding> = bindings_for(pass).collect();
                if bindings.is_empty() {
                    continue;
                }
                ui.collapsing(pass.label(), |ui| {
                    for binding in bindings {
                        draw_binding(ui, &mut params, binding);
                    }
                });
            }
        });

    Ok(())
}

fn draw_binding(ui: &mut egui::Ui, params: &mut PassParameters, binding: &Binding) {
    let Some(current) = params
        .get(binding.pass)
        .ok()
        .and_then(|set| set.get(binding.field))
    else {
        return;
    };

    let edited = match (binding.control, current) {
        (Control::Slider { min, max, step }, ParameterValue::Number(mut value)) => ui
            .add(
                egui::Slider::new(&mut value, min..=max)
                    .step_by(step as f64)
                    .text(binding.field),
            )
            .changed()
            .then_some(ParameterValue::Number(value)),
        (Control::Checkbox, ParameterValue::Flag(mut value)) => ui
            .checkbox(&mut value, binding.field)
            .changed()
            .then_some(ParameterValue::Flag(value)),
        _ => None,
    };

    if let Some(value) = edited {
        if let Err(error) = write_binding(params, binding, value) {
            warn!("{} {}: {error}", binding.pass, binding.field);
        }
    }
}
