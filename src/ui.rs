//! Egui control panel.
//!
//! Sliders are generated from [`ParamSpec`](crate::params::ParamSpec)
//! metadata, one collapsible section per [`ParamGroup`]. Grid size and
//! density are edited as a draft and applied together, since changing them
//! reallocates the simulation.

use crate::input::Command;
use crate::params::{ParamGroup, ParamInput};
use crate::session::{Session, Transition};
use crate::settings::{SystemSettings, DENSITY_RANGE, SIM_SIZE_RANGE, ZOOM_RANGE};

/// Panel state that outlives a single frame.
pub struct PanelState {
    draft: SystemSettings,
    save_title: String,
    pub open: bool,
}

impl PanelState {
    pub fn new(settings: &SystemSettings) -> Self {
        Self {
            draft: settings.clone(),
            save_title: String::new(),
            open: true,
        }
    }
}

/// Draw the panel. Viewer-level actions (saving a frame, fullscreen,
/// zoom) are handed back as commands.
pub fn panel(ctx: &egui::Context, session: &mut Session, state: &mut PanelState) -> Vec<Command> {
    let mut commands = Vec::new();
    if !state.open {
        return commands;
    }

    egui::Window::new("Physarum")
        .default_width(320.0)
        .resizable(true)
        .show(ctx, |ui| {
            presets_section(ui, session, state);
            ui.separator();

            ui.horizontal(|ui| {
                let paused = session.sim().is_paused();
                if ui.button(if paused { "Resume" } else { "Pause" }).clicked() {
                    commands.push(Command::TogglePause);
                }
                if ui.button("Freeze").clicked() {
                    commands.push(Command::Freeze);
                }
                if ui.button("Randomize").clicked() {
                    commands.push(Command::Randomize);
                }
                if ui.button("Reset").clicked() {
                    commands.push(Command::Reset);
                }
                if ui.button("Save PNG").clicked() {
                    commands.push(Command::SaveFrame);
                }
            });

            let interp = session.sim().interpolator();
            ui.add(egui::ProgressBar::new(interp.progress()).text(format!("transition {:.0}%", interp.progress() * 100.0)));

            egui::ScrollArea::vertical().max_height(480.0).show(ui, |ui| {
                for group in ParamGroup::ALL {
                    param_section(ui, session, group);
                }
                settings_section(ui, session, state);
            });
        });

    commands
}

fn presets_section(ui: &mut egui::Ui, session: &mut Session, state: &mut PanelState) {
    let selected_title = session
        .selected_preset()
        .map(|p| p.title.clone())
        .unwrap_or_else(|| "custom".to_string());

    let mut choice = None;
    egui::ComboBox::from_label("Preset")
        .selected_text(selected_title)
        .height(400.0)
        .show_ui(ui, |ui| {
            for (i, preset) in session.presets().iter().enumerate() {
                if ui
                    .selectable_label(session.selected() == Some(i), &preset.title)
                    .clicked()
                {
                    choice = Some(i);
                }
            }
        });
    if let Some(i) = choice {
        session.select_preset(i);
    }

    ui.horizontal(|ui| {
        ui.text_edit_singleline(&mut state.save_title);
        let title = state.save_title.trim().to_string();
        if ui.add_enabled(!title.is_empty(), egui::Button::new("Save preset")).clicked() {
            match session.save_current_as(&title, "") {
                Ok(preset) => {
                    tracing::info!(title = %preset.title, "preset saved");
                    state.save_title.clear();
                }
                Err(e) => tracing::warn!("failed to save preset: {}", e),
            }
        }
    });
}

fn param_section(ui: &mut egui::Ui, session: &mut Session, group: ParamGroup) {
    egui::CollapsingHeader::new(group.name())
        .default_open(group == ParamGroup::Sensing)
        .show(ui, |ui| {
            for id in group.members() {
                let spec = id.spec();
                let mut value = session.param(id);
                let changed = match spec.input {
                    ParamInput::Switch => {
                        let mut on = value >= 0.5;
                        let response = ui.checkbox(&mut on, spec.label);
                        value = if on { 1.0 } else { 0.0 };
                        response.changed()
                    }
                    ParamInput::Slider => ui
                        .add(
                            egui::Slider::new(&mut value, spec.min..=spec.max)
                                .step_by(spec.step as f64)
                                .text(spec.label),
                        )
                        .on_hover_text(spec.description)
                        .changed(),
                };
                if changed {
                    session.set_param(id, value);
                }
            }
        });
}

fn settings_section(ui: &mut egui::Ui, session: &mut Session, state: &mut PanelState) {
    egui::CollapsingHeader::new("system").show(ui, |ui| {
        let mut rate = session.sim().settings().convergence_rate;
        if ui
            .add(
                egui::Slider::new(&mut rate, 1e-4..=1.0)
                    .logarithmic(true)
                    .text("Convergence rate"),
            )
            .changed()
        {
            session.sim_mut().set_convergence_rate(rate);
        }

        let mut live = session.sim().settings().clone();
        let mut live_changed = ui
            .checkbox(&mut live.display_particles, "Display particles")
            .changed();
        live_changed |= ui
            .add(egui::Slider::new(&mut live.canvas_zoom, ZOOM_RANGE.0..=ZOOM_RANGE.1).text("Canvas zoom"))
            .changed();
        if live_changed {
            if let Err(e) = session.sim_mut().resize(live.clone()) {
                tracing::warn!("rejected settings: {}", e);
            }
            state.draft.display_particles = live.display_particles;
            state.draft.canvas_zoom = live.canvas_zoom;
        }

        ui.separator();
        ui.add(
            egui::Slider::new(&mut state.draft.sim_size, SIM_SIZE_RANGE.0..=SIM_SIZE_RANGE.1)
                .logarithmic(true)
                .text("Grid size"),
        );
        ui.add(
            egui::Slider::new(&mut state.draft.particle_density, DENSITY_RANGE.0..=DENSITY_RANGE.1)
                .text("Particle density"),
        );
        ui.label(format!("{} agents", state.draft.agent_count()));
        if ui.button("Apply").clicked() {
            let mut next = session.sim().settings().clone();
            next.sim_size = state.draft.sim_size;
            next.particle_density = state.draft.particle_density;
            if let Err(e) = session.sim_mut().resize(next) {
                tracing::warn!("rejected settings: {}", e);
            }
        }

        ui.separator();
        if ui.button("Reload selected preset").clicked() && !session.reset_to_selected() {
            tracing::warn!("no preset selected");
        }
        if ui.button("Snap to target").clicked() {
            let target = *session.sim().interpolator().target();
            if let Err(e) = session.apply(target, Transition::Instant) {
                tracing::warn!("rejected parameters: {}", e);
            }
        }
    });
}
