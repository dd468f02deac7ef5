// src/ui/panel.rs
//! Debug panel for the shared material.
//!
//! Widgets are generated from [`BINDINGS`]: one collapsible header per
//! folder, one widget per field. Every change is routed through
//! [`apply_edit`], so the panel itself never writes a field directly.

use imgui::TreeNodeFlags;

use super::bindings::{apply_edit, read_field, FieldValue, Folder, Widget, BINDINGS};
use crate::animation::PlaybackState;
use crate::gfx::resources::material::{Color, PhysicalMaterial};

/// Draws the material panel in the top right corner.
pub fn material_panel(ui: &imgui::Ui, material: &mut PhysicalMaterial) {
    let display_size = ui.io().display_size;
    // Guard against invalid display size that could cause crashes
    if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
        return;
    }
    let panel_width = (display_size[0] * 0.3).clamp(320.0, 420.0);

    ui.window("Debug")
        .size([panel_width, display_size[1] * 0.8], imgui::Condition::FirstUseEver)
        .position(
            [display_size[0] - panel_width - 10.0, 10.0],
            imgui::Condition::FirstUseEver,
        )
        .collapsible(true)
        .build(|| {
            for folder in Folder::ALL {
                if ui.collapsing_header(folder.label(), TreeNodeFlags::DEFAULT_OPEN) {
                    render_folder(ui, folder, material);
                }
            }
        });
}

/// Bottom-left hint showing whether the clip is playing.
pub fn playback_hint(ui: &imgui::Ui, playback: PlaybackState) {
    let display_size = ui.io().display_size;
    let label = match playback {
        PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
    };
    ui.window("Playback")
        .position([10.0, display_size[1] - 40.0], imgui::Condition::Always)
        .always_auto_resize(true)
        .no_decoration()
        .no_inputs()
        .bg_alpha(0.35)
        .build(|| ui.text(format!("{label}, click the desktop to toggle")));
}

fn render_folder(ui: &imgui::Ui, folder: Folder, material: &mut PhysicalMaterial) {
    for binding in BINDINGS.iter().filter(|binding| binding.folder == folder) {
        let edited = match (binding.widget, read_field(material, binding.field)) {
            (Widget::Checkbox, FieldValue::Bool(mut value)) => ui
                .checkbox(binding.label, &mut value)
                .then_some(FieldValue::Bool(value)),
            (Widget::Slider { min, max, .. }, FieldValue::Number(mut value)) => ui
                .slider(binding.label, min, max, &mut value)
                .then_some(FieldValue::Number(value)),
            (Widget::Choice(options), FieldValue::Choice(index)) => {
                let mut selected = index as usize;
                ui.combo_simple_string(binding.label, &mut selected, options)
                    .then_some(FieldValue::Choice(selected as u32))
            }
            (Widget::Color, FieldValue::Hex(hex)) => {
                let mut rgb = Color::parse_hex(&hex).unwrap_or(Color::BLACK).to_array();
                ui.color_edit3(binding.label, &mut rgb)
                    .then(|| FieldValue::Hex(Color::from_array(rgb).hex_string()))
            }
            (widget, value) => {
                log::debug!("no widget for {:?} showing {value:?}", widget);
                None
            }
        };

        if let Some(value) = edited {
            if let Err(err) = apply_edit(material, binding.field, value) {
                log::warn!("rejected edit of {}: {err}", binding.label);
            }
        }
    }
}
