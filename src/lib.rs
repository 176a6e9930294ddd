//! # Physarum
//!
//! A slime-mold transport-network simulation: a population of agents senses
//! a shared trail field ahead of itself, turns toward the stronger signal,
//! moves, and deposits into the field, which then diffuses and decays. With
//! hundreds of thousands of agents the trail organizes into vein-like
//! networks whose character depends on a 32-slot parameter vector.
//!
//! ## Quick Start
//!
//! ```ignore
//! use physarum::prelude::*;
//!
//! let settings = SystemSettings::new().with_sim_size(256).with_seed(7);
//! let sim = SimulationState::new(settings, ParameterVector::default())?;
//! let mut session = Session::new(sim, MemoryPresetStore::new())?;
//!
//! session.select_preset_by_title("turing");
//! let mut compositor = Compositor::new(512)?;
//! for _ in 0..300 {
//!     let view = session.step();
//!     compositor.render(&view);
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Parameters
//!
//! [`ParameterVector`] holds every tunable constant. Slots are named by
//! [`ParamId`], whose [`ParamSpec`](params::ParamSpec) carries range,
//! group and interpolation law. Sensor distance, sensor angle, rotation and
//! move distance each respond to the sensed trail as
//! `base + multiplier * sensed^exponent`.
//!
//! ### Frames
//!
//! [`SimulationState::step`] runs one frame: advance the preset transition,
//! update every agent against the current field, deposit into the other
//! field, then blur and decay. The result is read through a [`FrameView`].
//!
//! ### Presets and transitions
//!
//! Switching presets never jumps: a [`PresetInterpolator`] blends from
//! wherever the parameters are to the new target at a configurable rate.
//! A [`Session`] adds the preset repository, selection, randomization and
//! state persistence on top.
//!
//! ## Feature Overview
//!
//! | Area | Items |
//! |------|-------|
//! | Simulation | [`SimulationState`], [`AgentPool`], [`FieldBuffer`] |
//! | Parameters | [`ParameterVector`], [`ParamId`], [`ParamGroup`] |
//! | Transitions | [`PresetInterpolator`], [`Convergence`] |
//! | Presets | [`PresetRepository`], [`MemoryPresetStore`], [`JsonPresetStore`] |
//! | Output | [`Compositor`], [`Viewer`] |

extern crate self as physarum;

pub mod agent;
pub mod buffer;
pub mod compositor;
pub mod error;
pub mod field;
pub mod gpu;
pub mod input;
pub mod interpolate;
pub mod noise;
pub mod parallel;
pub mod params;
pub mod pointer;
pub mod presets;
pub mod session;
pub mod settings;
pub mod simulation;
#[cfg(feature = "egui")]
pub mod ui;
pub mod viewer;

pub use agent::{Agent, AgentPool};
pub use compositor::Compositor;
pub use error::{ConfigError, PresetError, ResourceInitError, SimulationError, StateError};
pub use field::FieldBuffer;
pub use glam::Vec2;
pub use interpolate::{Convergence, PresetInterpolator};
pub use params::{ParamGroup, ParamId, ParameterVector};
pub use physarum_derive::ParamTable;
pub use pointer::PointerState;
pub use presets::{JsonPresetStore, MemoryPresetStore, Preset, PresetRepository};
pub use session::{Session, Transition};
pub use settings::SystemSettings;
pub use simulation::{FrameView, SimulationState};
pub use viewer::Viewer;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use physarum::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agent::{Agent, AgentPool};
    pub use crate::compositor::Compositor;
    pub use crate::error::{ConfigError, PresetError, SimulationError};
    pub use crate::field::FieldBuffer;
    pub use crate::input::{Command, Input};
    pub use crate::interpolate::{Convergence, PresetInterpolator};
    pub use crate::params::{ParamGroup, ParamId, ParameterVector};
    pub use crate::presets::{JsonPresetStore, MemoryPresetStore, Preset, PresetRepository};
    pub use crate::session::{Session, Transition};
    pub use crate::settings::SystemSettings;
    pub use crate::simulation::{FrameView, SimulationState};
    pub use crate::viewer::Viewer;
    pub use crate::Vec2;
    pub use physarum_derive::ParamTable;
    #[cfg(feature = "egui")]
    pub use egui;
}
