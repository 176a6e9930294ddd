//! Preset selection and parameter editing on top of a running simulation.
//!
//! A [`Session`] ties a [`SimulationState`] to a [`PresetRepository`]. It
//! keeps a snapshot of the repository's presets, tracks which one is
//! selected and turns user intents (switch preset, blend two presets,
//! randomize, edit a slot) into parameter transitions.
//!
//! Repository failures never stop the simulation: a preset that cannot be
//! found or loaded is logged and the current parameters stay in effect.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigError, PresetError, StateError};
use crate::params::{ParamGroup, ParamId, ParamInput, ParameterVector};
use crate::presets::{Preset, PresetRepository, DEFAULT_PRESET_INDEX};
use crate::simulation::{FrameView, SimulationState};

/// How a new parameter vector takes effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Blend from the current parameters over the following frames.
    Smooth,
    /// Replace the parameters before the next frame.
    Instant,
}

/// What the current target vector came from.
#[derive(Clone, Debug, PartialEq)]
enum Origin {
    Preset(usize),
    Interpolant { from: usize, to: usize, amount: f32 },
    Custom,
}

/// A preset whose value for some slot is close to the current one.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarPreset {
    pub index: usize,
    pub title: String,
    pub value: f32,
    pub difference: f32,
}

/// Distribution of one slot across all presets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub median: f32,
    pub range: f32,
}

/// Presets sharing an extreme value of one slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Extreme {
    pub value: f32,
    pub presets: Vec<(usize, String)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Extremes {
    pub min: Extreme,
    pub max: Extreme,
}

/// Persisted "last state": the live parameters and the selected preset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastState {
    pub parameters: ParameterVector,
    pub selected_preset_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

/// A simulation driven by presets from a repository.
pub struct Session {
    sim: SimulationState,
    repository: Box<dyn PresetRepository>,
    presets: Vec<Preset>,
    selected: Option<usize>,
    origin: Origin,
}

impl Session {
    /// Load the presets and start on the default one, without a transition.
    pub fn new(sim: SimulationState, repository: impl PresetRepository + 'static) -> Result<Self, PresetError> {
        let presets = repository.load_all()?;
        let mut session = Self {
            sim,
            repository: Box::new(repository),
            presets,
            selected: None,
            origin: Origin::Custom,
        };
        if let Some(preset) = session.presets.get(DEFAULT_PRESET_INDEX) {
            let params = preset.parameters;
            session.sim.interpolator_mut().set_immediate(params);
            session.selected = Some(DEFAULT_PRESET_INDEX);
            session.origin = Origin::Preset(DEFAULT_PRESET_INDEX);
        }
        Ok(session)
    }

    pub fn sim(&self) -> &SimulationState {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut SimulationState {
        &mut self.sim
    }

    pub fn repository(&self) -> &dyn PresetRepository {
        self.repository.as_ref()
    }

    /// Presets as of the last load from the repository.
    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_preset(&self) -> Option<&Preset> {
        self.selected.and_then(|i| self.presets.get(i))
    }

    /// Run one frame.
    pub fn step(&mut self) -> FrameView<'_> {
        self.sim.step()
    }

    /// Reload the preset snapshot from the repository. On failure the old
    /// snapshot is kept.
    pub fn reload_presets(&mut self) -> Result<(), PresetError> {
        let selected_id = self.selected_preset().map(|p| p.id);
        self.presets = self.repository.load_all()?;
        self.selected = selected_id.and_then(|id| self.presets.iter().position(|p| p.id == id));
        Ok(())
    }

    // ========== Preset selection ==========

    /// Begin a transition to the preset at `index`. A missing index is
    /// logged and ignored.
    pub fn select_preset(&mut self, index: usize) -> bool {
        let Some(preset) = self.presets.get(index) else {
            tracing::warn!(index, count = self.presets.len(), "no preset at index");
            return false;
        };
        let params = preset.parameters;
        tracing::info!("Point {:02} ({})", index + 1, preset.title);
        self.sim.interpolator_mut().switch_to(params);
        self.selected = Some(index);
        self.origin = Origin::Preset(index);
        true
    }

    pub fn select_preset_by_id(&mut self, id: Uuid) -> bool {
        match self.presets.iter().position(|p| p.id == id) {
            Some(index) => self.select_preset(index),
            None => {
                tracing::warn!(%id, "no preset with id");
                false
            }
        }
    }

    pub fn select_preset_by_title(&mut self, title: &str) -> bool {
        match self.presets.iter().position(|p| p.title == title) {
            Some(index) => self.select_preset(index),
            None => {
                tracing::warn!(title, "no preset with title");
                false
            }
        }
    }

    /// Switch to a preset other than the selected one, chosen uniformly.
    pub fn select_random_preset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let count = self.presets.len();
        let candidates = match self.selected {
            Some(_) if count > 1 => count - 1,
            Some(_) => return None,
            None if count > 0 => count,
            None => return None,
        };
        let mut index = rng.gen_range(0..candidates);
        if let Some(selected) = self.selected {
            if index >= selected {
                index += 1;
            }
        }
        self.select_preset(index);
        Some(index)
    }

    /// Head toward the linear blend of two presets.
    pub fn interpolate_between(&mut self, from: usize, to: usize, amount: f32) -> bool {
        let (Some(a), Some(b)) = (self.presets.get(from), self.presets.get(to)) else {
            tracing::warn!(from, to, amount, "invalid interpolation presets");
            return false;
        };
        let amount = if amount.is_finite() { amount.clamp(0.0, 1.0) } else { 0.0 };
        let target = a.parameters.lerp(&b.parameters, amount);
        tracing::info!(
            "Interpolation from Point {} to Point {} with amount {}",
            from + 1,
            to + 1,
            amount
        );
        self.sim.interpolator_mut().switch_to(target);
        self.origin = Origin::Interpolant { from, to, amount };
        true
    }

    /// Blend the current target toward `target` by `amount`.
    pub fn interpolate_with(&mut self, target: &ParameterVector, amount: f32) -> Result<(), ConfigError> {
        target.validate()?;
        let amount = if amount.is_finite() { amount.clamp(0.0, 1.0) } else { 0.0 };
        let blended = self.sim.interpolator().target().lerp(target, amount);
        self.retarget(blended, Transition::Smooth);
        Ok(())
    }

    /// Blend the current target toward the preset at `index`.
    pub fn interpolate_with_preset(&mut self, index: usize, amount: f32) -> bool {
        match self.presets.get(index) {
            Some(preset) => {
                let amount = if amount.is_finite() { amount.clamp(0.0, 1.0) } else { 0.0 };
                let blended = self.sim.interpolator().target().lerp(&preset.parameters, amount);
                self.retarget(blended, Transition::Smooth);
                true
            }
            None => {
                tracing::warn!(index, "no preset at index");
                false
            }
        }
    }

    /// Perturb every slot by up to `variance` of its own value, floored at
    /// zero and kept inside the slot's stored range. Switch slots are left
    /// alone.
    pub fn randomize<R: Rng + ?Sized>(&mut self, variance: f32, rng: &mut R) {
        let v = variance.abs();
        let mut params = *self.sim.interpolator().target();
        for id in ParamId::ALL {
            if id.spec().input == ParamInput::Switch {
                continue;
            }
            let spec = id.spec();
            let p = params.get(id);
            let variation = rng.gen_range(-v..=v);
            params.set(id, (p + p * variation).max(0.0).clamp(spec.min, spec.limit));
        }
        tracing::info!(variance = v, "parameters randomized");
        self.retarget(params, Transition::Smooth);
    }

    /// Stop the running transition where it is.
    pub fn freeze(&mut self) {
        self.sim.interpolator_mut().freeze();
        self.origin = Origin::Custom;
        tracing::info!("Frozen!");
    }

    /// Make `params` the new target. A vector that fails validation is
    /// rejected and the running transition is left alone.
    pub fn apply(&mut self, params: ParameterVector, transition: Transition) -> Result<(), ConfigError> {
        params.validate()?;
        self.retarget(params, transition);
        Ok(())
    }

    fn retarget(&mut self, params: ParameterVector, transition: Transition) {
        match transition {
            Transition::Smooth => self.sim.interpolator_mut().switch_to(params),
            Transition::Instant => self.sim.interpolator_mut().set_immediate(params),
        }
        self.origin = Origin::Custom;
    }

    /// Smoothly return to the selected preset's stored vector.
    pub fn reset_to_selected(&mut self) -> bool {
        match self.selected {
            Some(index) => self.select_preset(index),
            None => false,
        }
    }

    // ========== Direct edits ==========

    /// The target value of one slot.
    pub fn param(&self, id: ParamId) -> f32 {
        self.sim.interpolator().target().get(id)
    }

    /// Edit one slot, clamped to its range. Returns the stored value.
    pub fn set_param(&mut self, id: ParamId, value: f32) -> f32 {
        self.origin = Origin::Custom;
        self.sim.set_param(id, value)
    }

    /// Edit a slot by any of its names.
    pub fn set_param_by_name(&mut self, name: &str, value: f32) -> Result<f32, ConfigError> {
        let id: ParamId = name.parse()?;
        Ok(self.set_param(id, value))
    }

    pub fn set_params(&mut self, updates: &[(ParamId, f32)]) {
        for &(id, value) in updates {
            self.set_param(id, value);
        }
    }

    /// Edit several slots of one group. Nothing is written if any id lies
    /// outside `group`.
    pub fn set_group(&mut self, group: ParamGroup, updates: &[(ParamId, f32)]) -> Result<(), ConfigError> {
        if let Some((id, _)) = updates.iter().find(|(id, _)| id.spec().group != group) {
            return Err(ConfigError::WrongGroup {
                param: id.name(),
                group: group.name(),
            });
        }
        self.set_params(updates);
        Ok(())
    }

    // ========== Exploration ==========

    /// Presets other than the selected one whose value of `id` lies within
    /// `tolerance` of the current value, closest first.
    pub fn find_similar(&self, id: ParamId, tolerance: f32) -> Vec<SimilarPreset> {
        let current = self.param(id);
        let mut similar: Vec<SimilarPreset> = self
            .presets
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != self.selected)
            .filter_map(|(index, preset)| {
                let value = preset.parameters.get(id);
                let difference = (value - current).abs();
                (difference <= tolerance).then(|| SimilarPreset {
                    index,
                    title: preset.title.clone(),
                    value,
                    difference,
                })
            })
            .collect();
        similar.sort_by(|a, b| a.difference.total_cmp(&b.difference));
        similar
    }

    /// Statistics of `id` over every preset.
    pub fn parameter_stats(&self, id: ParamId) -> Option<ParamStats> {
        let mut values: Vec<f32> = self.presets.iter().map(|p| p.parameters.get(id)).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f32::total_cmp);
        let min = values[0];
        let max = values[values.len() - 1];
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
        Some(ParamStats {
            min,
            max,
            mean: mean as f32,
            median: values[values.len() / 2],
            range: max - min,
        })
    }

    /// Presets holding the smallest and the largest value of `id`.
    pub fn find_extremes(&self, id: ParamId) -> Option<Extremes> {
        let stats = self.parameter_stats(id)?;
        let holders = |target: f32| -> Vec<(usize, String)> {
            self.presets
                .iter()
                .enumerate()
                .filter(|(_, p)| p.parameters.get(id) == target)
                .map(|(i, p)| (i, p.title.clone()))
                .collect()
        };
        Some(Extremes {
            min: Extreme {
                value: stats.min,
                presets: holders(stats.min),
            },
            max: Extreme {
                value: stats.max,
                presets: holders(stats.max),
            },
        })
    }

    // ========== State hash ==========

    /// Short label of the current target: `"NN_title"` for a preset,
    /// `"interpolant_a_b_amount"` for a blend (1-based indices).
    pub fn state_hash(&self) -> Option<String> {
        match &self.origin {
            Origin::Preset(index) => self
                .presets
                .get(*index)
                .map(|p| format!("{:02}_{}", index + 1, p.title)),
            Origin::Interpolant { from, to, amount } => {
                Some(format!("interpolant_{}_{}_{}", from + 1, to + 1, amount))
            }
            Origin::Custom => None,
        }
    }

    /// Restore the target described by a [`state_hash`](Self::state_hash)
    /// label. Returns false for a label that names nothing.
    pub fn apply_state_hash(&mut self, hash: &str) -> bool {
        let hash = hash.trim_start_matches('#');
        if let Some(rest) = hash.strip_prefix("interpolant_") {
            let parts: Vec<&str> = rest.split('_').collect();
            if let [from, to, amount] = parts.as_slice() {
                if let (Ok(from), Ok(to), Ok(amount)) =
                    (from.parse::<usize>(), to.parse::<usize>(), amount.parse::<f32>())
                {
                    if from > 0 && to > 0 {
                        return self.interpolate_between(from - 1, to - 1, amount);
                    }
                }
            }
            tracing::warn!(hash, "malformed interpolation hash");
            return false;
        }

        let digits: String = hash.chars().take_while(|c| c.is_ascii_digit()).collect();
        match digits.parse::<usize>() {
            Ok(number) if number > 0 => {
                if self.selected == Some(number - 1) && self.origin == Origin::Preset(number - 1) {
                    return true;
                }
                self.select_preset(number - 1)
            }
            _ => {
                tracing::warn!(hash, "hash names no preset");
                false
            }
        }
    }

    // ========== Repository ==========

    /// Store the current target as a new user preset.
    pub fn save_current_as(&mut self, title: &str, description: &str) -> Result<Preset, PresetError> {
        let params = *self.sim.interpolator().target();
        let preset = self.repository.create(title, description, params)?;
        self.reload_presets()?;
        tracing::info!(title = %preset.title, id = %preset.id, "preset saved");
        Ok(preset)
    }

    /// Restore the built-in presets in the repository and reload them.
    pub fn reset_defaults(&mut self) -> Result<usize, PresetError> {
        let count = self.repository.reset_defaults()?;
        self.reload_presets()?;
        if let Some(index) = self.selected {
            if self.presets.get(index).is_some_and(|p| p.is_default) {
                self.select_preset(index);
            }
        }
        tracing::info!(count, "reset default presets to original values");
        Ok(count)
    }

    // ========== Last state ==========

    pub fn last_state(&self) -> LastState {
        LastState {
            parameters: *self.sim.params(),
            selected_preset_id: self.selected_preset().map(|p| p.id),
            timestamp: Utc::now(),
        }
    }

    /// Write the live parameters and selection as JSON.
    pub fn save_last_state(&self, path: impl AsRef<Path>) -> Result<(), StateError> {
        let text = serde_json::to_string_pretty(&self.last_state())?;
        fs::write(path.as_ref(), text)?;
        tracing::info!(path = %path.as_ref().display(), "saved last state");
        Ok(())
    }

    /// Resume from a file written by [`save_last_state`](Self::save_last_state).
    pub fn restore_last_state(&mut self, path: impl AsRef<Path>) -> Result<LastState, StateError> {
        let text = fs::read_to_string(path.as_ref())?;
        let state: LastState = serde_json::from_str(&text)?;
        self.apply(state.parameters, Transition::Instant)?;
        self.selected = state
            .selected_preset_id
            .and_then(|id| self.presets.iter().position(|p| p.id == id));
        self.origin = Origin::Custom;
        tracing::info!(
            path = %path.as_ref().display(),
            saved = %state.timestamp.to_rfc3339(),
            "restored last state"
        );
        Ok(state)
    }
}
