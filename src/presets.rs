//! Named parameter vectors and the stores that hold them.
//!
//! A [`PresetRepository`] is a small CRUD store: built-in presets ship with
//! the crate and can be edited but not deleted, user presets come and go.
//! Every built-in keeps its authored vector in `original_parameters` so
//! [`PresetRepository::reset_defaults`] can undo edits.
//!
//! Two stores are provided. [`MemoryPresetStore`] lives for one run;
//! [`JsonPresetStore`] writes the whole collection to a JSON file after each
//! change.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PresetError;
use crate::params::{ParameterVector, LEGACY_PARAM_COUNT};

/// Index of the preset selected at startup.
pub const DEFAULT_PRESET_INDEX: usize = 5;

/// Version tag written into exported presets.
pub const EXPORT_VERSION: u32 = 1;

/// One stored configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub parameters: ParameterVector,
    /// Authored vector of a built-in preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_parameters: Option<ParameterVector>,
    pub is_default: bool,
    pub order: usize,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Preset {
    /// A new user preset.
    pub fn new(title: &str, description: &str, parameters: ParameterVector) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            parameters,
            original_parameters: None,
            is_default: false,
            order: usize::MAX,
            created: now,
            modified: now,
        }
    }

    /// The portable form written by [`PresetRepository::export_json`].
    pub fn to_export(&self) -> PresetExport {
        PresetExport {
            id: Some(self.id),
            title: self.title.clone(),
            description: self.description.clone(),
            parameters: self.parameters.as_slice().to_vec(),
            exported: Some(Utc::now()),
            version: EXPORT_VERSION,
        }
    }
}

/// Exchange format for a single preset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresetExport {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<f32>,
    #[serde(default)]
    pub exported: Option<DateTime<Utc>>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    EXPORT_VERSION
}

impl PresetExport {
    /// Check the title, the parameter arity and every slot value.
    pub fn validate(&self) -> Result<ParameterVector, PresetError> {
        if self.title.trim().is_empty() {
            return Err(PresetError::InvalidImport("missing title".into()));
        }
        ParameterVector::from_slice(&self.parameters)
            .map_err(|e| PresetError::InvalidImport(e.to_string()))
    }
}

/// Built-in presets in the legacy 26-slot layout, in display order.
const BUILTIN: [(&str, [f32; LEGACY_PARAM_COUNT]); 43] = [
    ("pure_multiscale", [
        0.0, 4.0, 0.3, 0.1, 51.32, 20.0, 0.41, 4.0, 0.0,
        0.1, 6.0, 0.1, 0.0, 0.0, 0.4, 0.705, 1.0, 0.3, 0.25,
        8.0, 0.2, 0.8, 0.7, 0.3, 0.6, 0.0,
    ]),
    ("hex_hole_open", [
        0.0, 28.04, 14.53, 0.09, 1.0, 0.0, 0.01, 1.4, 1.12,
        0.83, 0.0, 0.0, 0.57, 0.03, 0.07, 0.986, 1.0, 0.23, 0.166,
        6.0, 0.5, 1.2, 0.8, 0.5, 0.6, 0.0,
    ]),
    ("vertebrata", [
        17.92, 0.0, 0.0, 0.52, 0.0, 0.0, 0.18, 0.0, 0.0,
        0.1, 6.05, 0.17, 0.0, 0.0, 0.04, 0.973, 1.0, 0.53, 0.455,
        16.0, 0.0, 0.6, 0.9, 0.2, 0.6, 0.0,
    ]),
    ("traffic_many_lanes", [
        3.0, 0.0, 0.0, 0.35, 0.0, 0.0, 0.0, 0.57, 2.0,
        0.01, 4.0, 0.02, 0.3, 0.0, 0.11, 0.945, 1.0, 0.18, 0.248,
        16.0, 0.1, 1.0, 0.6, 0.4, 0.6, 0.0,
    ]),
    ("tactile_extreme", [
        13.95, 7.46, 0.11, 4.04, 5.0, 0.52, 0.49, 0.58, 0.18,
        7.59, 3.04, 0.16, 4.76, 0.0, 0.61, 0.975, 1.0, 0.348, 0.172,
        5.0, 0.8, 0.4, 0.75, 0.6, 0.6, 0.0,
    ]),
    ("star_network", [
        3.0, 10.17, 0.4, 1.03, 2.3, 2.0, 1.42, 20.0, 0.75,
        0.83, 1.56, 0.11, 1.07, 0.0, 0.2, 0.951, 10.0, 0.15, 0.248,
        16.0, 0.3, 1.5, 0.85, 0.35, 0.6, 0.0,
    ]),
    ("enmeshed_singularities", [
        0.0, 8.51, 0.19, 0.61, 0.0, 0.0, 3.35, 0.0, 0.0,
        0.75, 12.62, 0.06, 0.0, 0.0, 0.27, 0.904, 1.0, 0.06, 0.042,
        7.0, 0.6, 0.8, 0.9, 0.3, 0.6, 0.0,
    ]),
    ("waves_upturn", [
        0.0, 0.82, 0.03, 0.18, 0.0, 0.0, 0.26, 0.0, 0.0,
        0.0, 20.0, 0.65, 0.2, 0.9, 0.14, 0.939, 1.0, 0.47, 0.43,
        10.0, 0.15, 0.9, 0.7, 0.8, 0.6, 0.0,
    ]),
    ("turing", [
        0.0, 8.44, 0.08, 4.82, 0.0, 0.0, 1.19, 0.0, 0.0,
        0.0, 0.33, 0.01, 0.0, 0.0, 0.04, 0.98, 1.0, 0.32, 0.172,
        7.0, 0.25, 1.1, 0.65, 0.7, 0.6, 0.0,
    ]),
    ("petri_worms", [
        1.66, 19.26, 0.06, 1.26, 0.0, 0.0, 1.65, 0.0, 0.0,
        0.06, 5.74, 0.08, 0.0, 3.04, 0.11, 0.988, 3.0, 0.134, 0.221,
        19.0, 0.4, 0.7, 0.8, 0.4, 0.6, 0.0,
    ]),
    ("a_rooting", [
        0.0, 17.54, 0.08, 0.64, 0.0, 0.0, 1.8, 0.0, 0.0,
        0.1, 20.0, 0.06, 0.4, 0.0, 0.2, 0.939, 1.0, 0.2, 0.283,
        14.0, 0.7, 0.5, 0.75, 0.5, 0.6, 0.0,
    ]),
    ("more_individuals", [
        1.5, 1.94, 0.28, 1.73, 1.12, 0.71, 0.18, 2.22, 0.85,
        0.5, 4.13, 0.11, 1.12, 0.0, 0.02, 0.85, 1.0, 0.14, 0.234,
        11.0, 0.35, 1.3, 0.6, 0.9, 0.6, 0.0,
    ]),
    ("slow_metastructure", [
        8.34, 3.86, 0.03, 1.21, 1.4, 0.3, 1.13, 5.5, 0.39,
        17.85, 8.51, 0.96, 0.0, 7.14, 0.02, 0.781, 1.0, 0.2, 0.166,
        16.0, 0.9, 0.6, 0.85, 0.3, 0.6, 0.0,
    ]),
    ("sloppy_bucky", [
        2.87, 3.04, 0.28, 0.09, 0.0, 0.0, 0.44, 0.85, 0.0,
        0.0, 2.22, 0.14, 0.3, 0.85, 0.02, 0.891, 1.0, 0.14, 0.166,
        21.0, 0.45, 0.8, 0.7, 0.6, 0.6, 0.0,
    ]),
    ("massive_structure", [
        0.14, 1.12, 0.19, 0.27, 1.4, 0.0, 1.13, 2.0, 0.39,
        0.75, 2.22, 0.19, 0.0, 7.14, 0.21, 0.795, 1.0, 0.12, 0.166,
        19.0, 0.55, 1.0, 0.9, 0.4, 0.6, 0.0,
    ]),
    ("speed_modulation", [
        0.001, 2.54, 0.08, 0.0, 0.0, 0.0, 3.35, 0.0, 0.0,
        0.1, 12.62, 0.06, 0.0, 0.0, 0.27, 0.877, 1.0, 0.25, 0.344,
        5.0, 0.65, 0.9, 0.8, 0.5, 0.6, 0.0,
    ]),
    ("emergent_hex_waves", [
        0.0, 20.0, 0.08, 5.28, 0.0, 0.0, 5.2, 0.0, 0.0,
        1.44, 1.56, 0.06, 1.81, 0.0, 0.05, 0.987, 1.0, 0.28, 0.172,
        16.0, 0.75, 0.7, 0.6, 0.8, 0.6, 0.0,
    ]),
    ("formalisms", [
        0.0, 17.26, 0.28, 0.35, 1.12, 0.66, 1.47, 0.57, 1.02,
        0.75, 19.18, 0.39, 0.0, 1.94, 0.13, 0.959, 1.0, 0.11, 0.135,
        21.0, 0.1, 1.4, 0.95, 0.25, 0.6, 0.0,
    ]),
    ("growing_on_a_sea_of_sand", [
        0.0, 89.6, 20.0, 1.3, 0.0, 0.0, 1.3, 1.4, 1.07,
        0.75, 69.08, 2.22, 0.3, 0.0, 0.08, 0.959, 1.0, 0.16, 0.332,
        10.0, 0.85, 0.5, 0.7, 0.7, 0.6, 0.0,
    ]),
    ("grid_of_sorts", [
        4.24, 75.92, 0.0, 4.39, 0.0, 0.0, 1.3, 171.7, 20.0,
        6.22, 7.52, 1.12, 0.0, 0.0, 0.06, 0.877, 5.0, 0.23, 0.166,
        11.0, 0.95, 1.2, 0.8, 0.4, 0.6, 0.0,
    ]),
    ("negotiation_of_highways", [
        17.92, 89.6, 3.04, 2.67, 34.88, 10.7, 0.35, 294.8, 0.0,
        0.001, 82.76, 20.0, 0.0, 0.0, 0.005, 0.999, 1.0, 0.33, 0.289,
        6.0, 0.2, 0.8, 0.9, 0.6, 0.6, 0.0,
    ]),
    ("transmission_tower", [
        0.0, 28.04, 20.0, 0.18, 26.74, 20.0, 0.01, 1.4, 1.12,
        0.83, 0.0, 0.0, 2.54, 0.0, 0.12, 0.959, 1.0, 0.23, 0.166,
        5.0, 0.6, 1.1, 0.75, 0.5, 0.6, 0.0,
    ]),
    ("sacred_network_nodules", [
        2.0, 28.04, 0.0, 0.09, 1.0, 0.0, 0.8, 2.08, 0.0,
        0.0, 2.0, 0.03, 0.82, 0.0, 0.05, 0.889, 1.0, 0.2, 0.394,
        16.0, 0.4, 0.9, 0.65, 0.75, 0.6, 0.0,
    ]),
    ("positive_negative_space", [
        0.0, 0.85, 0.01, 0.35, 1.4, 0.0, 1.81, 0.57, 1.45,
        0.01, 4.0, 0.02, 0.3, 0.0, 0.11, 0.945, 1.0, 0.07, 0.049,
        16.0, 0.3, 1.3, 0.8, 0.35, 0.6, 0.0,
    ]),
    ("circular_consolidation", [
        1.66, 20.0, 33.19, 1.03, 39.03, 2.54, 2.65, 364.8, 8.2,
        0.05, 2.15, 2.54, 0.0, 0.0, 0.001, 0.975, 1.0, 0.16, 0.115,
        14.0, 0.5, 1.6, 0.7, 0.65, 0.6, 0.0,
    ]),
    ("radiative_nexus", [
        0.0, 9.0, 2000.0, 1.03, 39.03, 2.54, 2.65, 174.3, 8.2,
        6.36, 5.0, 20.0, 0.0, 0.0, 0.001, 0.975, 1.0, 0.08, 0.115,
        14.0, 0.8, 0.7, 0.85, 0.55, 0.6, 0.0,
    ]),
    ("unfold_time_but_only_in_a_line", [
        17.92, 89.6, 3.04, 2.67, 34.88, 10.7, 3.35, 294.8, 0.0,
        0.001, 69.76, 116.4, 0.0, 0.0, 0.005, 0.999, 1.0, 0.33, 0.289,
        10.0, 0.15, 1.5, 0.9, 0.3, 0.6, 0.0,
    ]),
    ("ink_on_white", [
        0.0, 20.0, 3.0, 0.26, 2.15, 4.76, 0.41, 6.6, 12.62,
        0.3, 6.6, 0.037, 0.4, 0.04, 0.03, 0.926, 1.0, 0.45, 0.459,
        10.0, 0.0, 0.0, 0.0, 1.0, 0.6, 0.0,
    ]),
    ("network_time", [
        0.0, 89.6, 20.0, 1.3, 0.0, 0.0, 0.18, 1.4, 1.07,
        0.75, 69.08, 2.22, 0.3, 0.0, 0.08, 0.96, 1.0, 0.16, 0.332,
        7.0, 0.35, 1.1, 0.8, 0.4, 0.6, 0.0,
    ]),
    ("inverse_network", [
        0.0, 0.8, 0.02, 0.1, 1.0, 0.0, 0.26, 0.1, 2.79,
        0.83, 32.88, 37.74, 0.09, 0.33, 0.1, 0.939, 1.0, 0.43, 0.262,
        3.0, 0.75, 0.6, 0.95, 0.7, 0.6, 0.0,
    ]),
    ("vanishing_points", [
        27.5, 2.0, 2.54, 0.88, 26.74, 0.0, 0.09, 267.4, 1.4,
        0.1, 5.0, 7.41, 1.4, 14.25, 0.14, 0.754, 1.0, 0.6, 0.627,
        11.0, 0.9, 1.2, 0.6, 0.8, 0.6, 0.0,
    ]),
    ("neuron_cluster", [
        5.35, 6.0, 0.0, 0.1, 1.0, 0.0, 0.18, 1.0, 0.0,
        0.0, 2.15, 0.33, 0.0, 0.0, 0.1, 0.84, 2.0, 0.23, 0.164,
        16.0, 0.25, 1.4, 0.75, 0.6, 0.6, 0.0,
    ]),
    ("scaling_nodule_emergence", [
        0.0, 6.0, 100.0, 0.157, 1.0, 1.07, 0.0, 1.0, 5.0,
        0.83, 5.0, 20.0, 0.4, 0.0, 0.003, 0.914, 1.0, 0.25, 0.361,
        6.0, 0.45, 0.8, 0.7, 0.9, 0.6, 0.0,
    ]),
    ("probe_emergence_from_line", [
        0.005, 6.0, 205.3, 0.0, 1.0, 1.0, 0.18, 2.2, 20.0,
        0.83, 3.0, 1.32, 0.4, 0.0, 0.001, 0.939, 1.0, 0.15, 0.361,
        6.0, 0.65, 1.0, 0.85, 0.5, 0.6, 0.0,
    ]),
    ("hyp_offset", [
        0.0, 15.0, 8.6, 0.03, 1.0, 0.0, 0.34, 2.0, 1.07,
        0.22, 15.0, 0.1, 2.3, 0.82, 1.0, 0.705, 1.0, 0.42, 0.373,
        8.0, 0.1, 1.8, 0.6, 0.75, 0.6, 0.0,
    ]),
    ("noise", [
        0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.23, 0.166,
        4.0, 0.5, 0.5, 0.5, 0.5, 0.6, 0.0,
    ]),
    ("strike", [
        0.0, 32.88, 402.0, 0.41, 3.0, 0.0, 0.1, 0.0, 0.0,
        0.3, 6.0, 0.0, 0.0, 0.0, 0.09, 0.914, 1.0, 0.46, 0.29,
        6.0, 0.85, 0.9, 0.7, 0.4, 0.6, 0.0,
    ]),
    ("suture", [
        5.35, 2.15, 0.0, 0.34, 20.59, 0.0, 0.49, 0.1, 2.79,
        0.83, 125.1, 45.11, 0.09, 0.0, 0.19, 0.975, 1.0, 0.55, 0.213,
        6.0, 0.7, 1.3, 0.8, 0.6, 0.6, 0.0,
    ]),
    ("surface_tension_sharp", [
        0.0, 100.5, 20.0, 0.18, 14.44, 0.0, 1.26, 0.0, 0.0,
        0.83, 75.91, 0.86, 0.3, 0.0, 0.39, 0.975, 2.0, 0.25, 0.25,
        11.0, 0.55, 0.7, 0.9, 0.8, 0.6, 0.0,
    ]),
    ("pincushion", [
        0.0, 0.8, 0.02, 0.34, 20.59, 0.0, 0.26, 0.1, 2.79,
        0.83, 125.1, 45.11, 0.58, 0.33, 0.19, 0.975, 1.0, 0.52, 0.238,
        5.0, 0.3, 1.1, 0.65, 0.95, 0.6, 0.0,
    ]),
    ("clear_spaghetti", [
        0.0, 0.8, 0.02, 5.2, 1.0, 0.0, 0.26, 0.1, 2.79,
        0.83, 32.88, 37.74, 0.09, 0.33, 0.1, 0.939, 1.0, 0.45, 0.189,
        6.0, 0.8, 0.8, 0.75, 0.7, 0.6, 0.0,
    ]),
    ("negotiation_of_zoning", [
        17.92, 89.6, 3.04, 2.67, 34.88, 10.7, 5.77, 294.8, 0.0,
        0.001, 82.76, 20.0, 0.0, 0.0, 0.005, 0.999, 1.0, 0.33, 0.289,
        10.0, 0.95, 1.6, 0.55, 0.65, 0.6, 0.0,
    ]),
    ("hexa1833", [
        1.829, 23.65, 0.029, 0.674, 0.5, 0.0, 1.224, 1.039, 0.0,
        0.029, 3.869, 0.054, 0.409, 1.519, 0.08, 0.938, 2.0, 0.065, 0.307,
        18.0, 0.6, 1.0, 0.8, 0.35, 0.6, 0.0,
    ]),
];

/// Names of the built-in presets, in display order.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}

/// Fresh copies of every built-in preset.
pub fn builtin_presets() -> Vec<Preset> {
    let now = Utc::now();
    BUILTIN
        .iter()
        .enumerate()
        .map(|(order, (name, values))| {
            let parameters = ParameterVector::from_legacy(values);
            Preset {
                id: Uuid::new_v4(),
                title: (*name).to_string(),
                description: format!("Default preset {}", order + 1),
                parameters,
                original_parameters: Some(parameters),
                is_default: true,
                order,
                created: now,
                modified: now,
            }
        })
        .collect()
}

/// Storage for presets.
///
/// `load_all` returns presets sorted by `order`. Implementors provide the
/// primitive operations; creation, update, import and export are built on
/// them.
pub trait PresetRepository {
    fn load_all(&self) -> Result<Vec<Preset>, PresetError>;

    fn get(&self, id: Uuid) -> Result<Preset, PresetError>;

    /// Insert `preset`, or replace the stored preset with the same id.
    fn save(&mut self, preset: Preset) -> Result<Preset, PresetError>;

    /// Remove a user preset.
    fn delete(&mut self, id: Uuid) -> Result<(), PresetError>;

    /// Move a preset to position `index` in the display order.
    fn move_to(&mut self, id: Uuid, index: usize) -> Result<(), PresetError>;

    /// Restore every built-in preset to its authored vector. Returns how
    /// many were reset.
    fn reset_defaults(&mut self) -> Result<usize, PresetError>;

    /// Store a new user preset at the end of the order.
    fn create(&mut self, title: &str, description: &str, parameters: ParameterVector) -> Result<Preset, PresetError> {
        parameters.validate()?;
        self.save(Preset::new(title, description, parameters))
    }

    /// Change the title, description and vector of an existing preset.
    fn update(
        &mut self,
        id: Uuid,
        title: &str,
        description: &str,
        parameters: ParameterVector,
    ) -> Result<Preset, PresetError> {
        parameters.validate()?;
        let mut preset = self.get(id)?;
        preset.title = title.trim().to_string();
        preset.description = description.trim().to_string();
        preset.parameters = parameters;
        preset.modified = Utc::now();
        self.save(preset)
    }

    /// Preset by title, first match in display order.
    fn find_by_title(&self, title: &str) -> Result<Option<Preset>, PresetError> {
        Ok(self.load_all()?.into_iter().find(|p| p.title == title))
    }

    /// Serialize one preset in the exchange format.
    fn export_json(&self, id: Uuid) -> Result<String, PresetError> {
        let preset = self.get(id)?;
        Ok(serde_json::to_string_pretty(&preset.to_export())?)
    }

    /// Import one preset from the exchange format. A known id updates that
    /// preset; anything else becomes a new user preset.
    fn import_json(&mut self, json: &str) -> Result<Preset, PresetError> {
        let data: PresetExport =
            serde_json::from_str(json).map_err(|e| PresetError::InvalidImport(e.to_string()))?;
        let parameters = data.validate()?;

        match data.id {
            Some(id) => match self.get(id) {
                Ok(_) => self.update(id, &data.title, &data.description, parameters),
                Err(PresetError::NotFound(_)) => {
                    let mut preset = Preset::new(&data.title, &data.description, parameters);
                    preset.id = id;
                    self.save(preset)
                }
                Err(e) => Err(e),
            },
            None => self.create(&data.title, &data.description, parameters),
        }
    }
}

/// In-memory preset store.
#[derive(Clone, Debug)]
pub struct MemoryPresetStore {
    presets: Vec<Preset>,
}

impl Default for MemoryPresetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPresetStore {
    /// Store holding the built-in presets.
    pub fn new() -> Self {
        Self {
            presets: builtin_presets(),
        }
    }

    /// Store holding exactly `presets`.
    pub fn from_presets(mut presets: Vec<Preset>) -> Self {
        presets.sort_by_key(|p| p.order);
        let mut store = Self { presets };
        store.renumber();
        store
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    fn position(&self, id: Uuid) -> Result<usize, PresetError> {
        self.presets
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PresetError::NotFound(id.to_string()))
    }

    fn renumber(&mut self) {
        for (order, preset) in self.presets.iter_mut().enumerate() {
            preset.order = order;
        }
    }
}

impl PresetRepository for MemoryPresetStore {
    fn load_all(&self) -> Result<Vec<Preset>, PresetError> {
        Ok(self.presets.clone())
    }

    fn get(&self, id: Uuid) -> Result<Preset, PresetError> {
        Ok(self.presets[self.position(id)?].clone())
    }

    fn save(&mut self, preset: Preset) -> Result<Preset, PresetError> {
        let index = match self.position(preset.id) {
            Ok(index) => {
                self.presets[index] = preset;
                index
            }
            Err(_) => {
                self.presets.push(preset);
                self.presets.len() - 1
            }
        };
        self.renumber();
        Ok(self.presets[index].clone())
    }

    fn delete(&mut self, id: Uuid) -> Result<(), PresetError> {
        let index = self.position(id)?;
        if self.presets[index].is_default {
            return Err(PresetError::DefaultUndeletable(self.presets[index].title.clone()));
        }
        self.presets.remove(index);
        self.renumber();
        Ok(())
    }

    fn move_to(&mut self, id: Uuid, index: usize) -> Result<(), PresetError> {
        let from = self.position(id)?;
        let preset = self.presets.remove(from);
        let to = index.min(self.presets.len());
        self.presets.insert(to, preset);
        self.renumber();
        Ok(())
    }

    fn reset_defaults(&mut self) -> Result<usize, PresetError> {
        let now = Utc::now();
        let mut count = 0;
        for preset in self.presets.iter_mut().filter(|p| p.is_default) {
            if let Some(original) = preset.original_parameters {
                preset.parameters = original;
                preset.modified = now;
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Preset store persisted as a JSON array.
#[derive(Debug)]
pub struct JsonPresetStore {
    path: PathBuf,
    inner: MemoryPresetStore,
}

impl JsonPresetStore {
    /// Open the store at `path`. A missing file is created with the
    /// built-in presets.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        let path = path.as_ref().to_path_buf();
        let inner = if path.exists() {
            let text = fs::read_to_string(&path)?;
            let presets: Vec<Preset> = serde_json::from_str(&text)?;
            tracing::info!(path = %path.display(), count = presets.len(), "loaded presets");
            MemoryPresetStore::from_presets(presets)
        } else {
            tracing::info!(path = %path.display(), "seeding preset store with built-in presets");
            MemoryPresetStore::new()
        };
        let store = Self { path, inner };
        store.flush()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), PresetError> {
        write_presets(&self.path, &self.inner.presets)
    }

    /// Run `edit` on a copy of the presets and write the copy out before it
    /// replaces the live set. A failed edit or write leaves the store as it
    /// was.
    fn commit<T>(
        &mut self,
        edit: impl FnOnce(&mut MemoryPresetStore) -> Result<T, PresetError>,
    ) -> Result<T, PresetError> {
        let mut next = self.inner.clone();
        let out = edit(&mut next)?;
        write_presets(&self.path, &next.presets)?;
        self.inner = next;
        Ok(out)
    }
}

fn write_presets(path: &Path, presets: &[Preset]) -> Result<(), PresetError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let text = serde_json::to_string_pretty(presets)?;
    fs::write(path, text)?;
    Ok(())
}

impl PresetRepository for JsonPresetStore {
    fn load_all(&self) -> Result<Vec<Preset>, PresetError> {
        self.inner.load_all()
    }

    fn get(&self, id: Uuid) -> Result<Preset, PresetError> {
        self.inner.get(id)
    }

    fn save(&mut self, preset: Preset) -> Result<Preset, PresetError> {
        self.commit(|presets| presets.save(preset))
    }

    fn delete(&mut self, id: Uuid) -> Result<(), PresetError> {
        self.commit(|presets| presets.delete(id))
    }

    fn move_to(&mut self, id: Uuid, index: usize) -> Result<(), PresetError> {
        self.commit(|presets| presets.move_to(id, index))
    }

    fn reset_defaults(&mut self) -> Result<usize, PresetError> {
        self.commit(|presets| presets.reset_defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamId;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("physarum-{}-{}-{}.json", name, std::process::id(), Uuid::new_v4()))
    }

    // ========== Built-in Tests ==========

    #[test]
    fn test_builtin_table() {
        let presets = builtin_presets();
        assert_eq!(presets.len(), 43);
        assert_eq!(presets[DEFAULT_PRESET_INDEX].title, "star_network");
        assert_eq!(presets[DEFAULT_PRESET_INDEX].parameters, ParameterVector::default());
        assert!(presets.iter().all(|p| p.is_default && p.parameters.is_finite()));
        for (i, preset) in presets.iter().enumerate() {
            assert_eq!(preset.order, i);
            assert_eq!(preset.parameters.get(ParamId::ContrastBase), 1.0);
            let decay = preset.parameters.get(ParamId::DecayFactor);
            assert!(decay > 0.0 && decay < 1.0, "{}", preset.title);
        }
        assert_eq!(builtin_names().last(), Some("hexa1833"));
    }

    // ========== Memory Store Tests ==========

    #[test]
    fn test_defaults_cannot_be_deleted() {
        let mut store = MemoryPresetStore::new();
        let id = store.load_all().unwrap()[0].id;
        assert!(matches!(store.delete(id), Err(PresetError::DefaultUndeletable(_))));
        assert_eq!(store.len(), 43);
    }

    #[test]
    fn test_create_and_delete_user_preset() {
        let mut store = MemoryPresetStore::new();
        let preset = store.create("  mine ", "", ParameterVector::default()).unwrap();
        assert_eq!(preset.title, "mine");
        assert_eq!(preset.order, 43);
        store.delete(preset.id).unwrap();
        assert!(matches!(store.get(preset.id), Err(PresetError::NotFound(_))));
    }

    #[test]
    fn test_update_unknown_is_not_found() {
        let mut store = MemoryPresetStore::new();
        let result = store.update(Uuid::new_v4(), "x", "", ParameterVector::default());
        assert!(matches!(result, Err(PresetError::NotFound(_))));
    }

    #[test]
    fn test_move_to_reorders() {
        let mut store = MemoryPresetStore::new();
        let all = store.load_all().unwrap();
        store.move_to(all[10].id, 0).unwrap();
        let moved = store.load_all().unwrap();
        assert_eq!(moved[0].id, all[10].id);
        assert_eq!(moved[1].id, all[0].id);
        assert!(moved.iter().enumerate().all(|(i, p)| p.order == i));

        store.move_to(all[0].id, 999).unwrap();
        assert_eq!(store.load_all().unwrap().last().map(|p| p.id), Some(all[0].id));
    }

    #[test]
    fn test_reset_defaults_restores_original() {
        let mut store = MemoryPresetStore::new();
        let preset = store.load_all().unwrap()[3].clone();
        let edited = preset.parameters.with(ParamId::DecayFactor, 0.6);
        store.update(preset.id, &preset.title, "", edited).unwrap();
        assert_eq!(store.get(preset.id).unwrap().parameters, edited);
        assert_eq!(store.reset_defaults().unwrap(), 43);
        assert_eq!(store.get(preset.id).unwrap().parameters, preset.parameters);
    }

    // ========== Import/Export Tests ==========

    #[test]
    fn test_export_then_import_updates_existing() {
        let mut store = MemoryPresetStore::new();
        let id = store.load_all().unwrap()[0].id;
        let json = store.export_json(id).unwrap();
        assert!(json.contains("\"version\": 1"));
        let imported = store.import_json(&json).unwrap();
        assert_eq!(imported.id, id);
        assert_eq!(store.len(), 43);
    }

    #[test]
    fn test_import_legacy_and_new() {
        let mut store = MemoryPresetStore::new();
        let legacy = serde_json::json!({
            "title": "legacy",
            "parameters": vec![0.5f32; 26],
        });
        let preset = store.import_json(&legacy.to_string()).unwrap();
        assert!(!preset.is_default);
        assert_eq!(preset.parameters.get(ParamId::PointSize), 1.0);
        assert_eq!(store.len(), 44);
    }

    #[test]
    fn test_import_rejects_bad_data() {
        let mut store = MemoryPresetStore::new();
        let no_title = serde_json::json!({ "parameters": vec![0.0f32; 32] });
        assert!(matches!(
            store.import_json(&no_title.to_string()),
            Err(PresetError::InvalidImport(_))
        ));
        let short = serde_json::json!({ "title": "x", "parameters": vec![0.0f32; 24] });
        assert!(matches!(
            store.import_json(&short.to_string()),
            Err(PresetError::InvalidImport(_))
        ));
        assert!(matches!(store.import_json("not json"), Err(PresetError::InvalidImport(_))));
    }

    #[test]
    fn test_import_rejects_out_of_range_values() {
        let mut store = MemoryPresetStore::new();
        let mut values = ParameterVector::default().as_slice().to_vec();
        values[ParamId::SensorDistanceExponent.index()] = -5.0;
        let hostile = serde_json::json!({ "title": "hostile", "parameters": values });
        assert!(matches!(
            store.import_json(&hostile.to_string()),
            Err(PresetError::InvalidImport(_))
        ));
        assert_eq!(store.len(), 43);

        let nan = ParameterVector::default().with(ParamId::DecayFactor, f32::NAN);
        assert!(matches!(store.create("nan", "", nan), Err(PresetError::Config(_))));
        assert_eq!(store.len(), 43);
    }

    #[test]
    fn test_builtin_presets_validate() {
        for preset in builtin_presets() {
            assert!(preset.parameters.validate().is_ok(), "{}", preset.title);
        }
    }

    // ========== JSON Store Tests ==========

    #[test]
    fn test_json_store_persists() {
        let path = temp_path("store");
        let id = {
            let mut store = JsonPresetStore::open(&path).unwrap();
            assert!(path.exists());
            store.create("kept", "across runs", ParameterVector::default()).unwrap().id
        };
        let store = JsonPresetStore::open(&path).unwrap();
        let preset = store.get(id).unwrap();
        assert_eq!(preset.description, "across runs");
        assert_eq!(store.load_all().unwrap().len(), 44);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_failed_write_leaves_store_unchanged() {
        let path = temp_path("unwritable");
        let mut store = JsonPresetStore::open(&path).unwrap();
        let id = store.create("kept", "", ParameterVector::default()).unwrap().id;

        // A directory at the store path makes every write fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(matches!(store.delete(id), Err(PresetError::Io(_))));
        assert!(store.get(id).is_ok());
        assert!(store.create("lost", "", ParameterVector::default()).is_err());
        assert!(store.find_by_title("lost").unwrap().is_none());
        assert!(store.move_to(id, 0).is_err());
        assert_eq!(store.get(id).unwrap().order, 43);
        assert_eq!(store.load_all().unwrap().len(), 44);

        fs::remove_dir(&path).ok();
    }
}
