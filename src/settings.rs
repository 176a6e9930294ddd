//! System-level settings: grid and render resolution, population density,
//! transition speed.
//!
//! Settings are plain data with `with_*` builders and a JSON form. Nothing
//! here allocates; [`SystemSettings::validate`] is called before any buffer
//! is sized from them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agent::agent_count;
use crate::error::ConfigError;
use crate::interpolate::Convergence;

pub const SIM_SIZE_RANGE: (u32, u32) = (8, 4096);
pub const RENDER_SIZE_RANGE: (u32, u32) = (64, 4096);
pub const DENSITY_RANGE: (f32, f32) = (0.1, 10.0);
pub const ZOOM_RANGE: (f32, f32) = (0.1, 3.0);

/// Smallest convergence rate "slower" will go to.
pub const MIN_CONVERGENCE_RATE: f32 = 1e-15;

/// Settings that shape the simulation and the display rather than the
/// pattern itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// Side length of the trail field in cells.
    pub sim_size: u32,
    /// Side length of the composed image in pixels.
    pub render_size: u32,
    /// Agents per field cell.
    pub particle_density: f32,
    pub canvas_zoom: f32,
    /// Per-frame progress rate of preset transitions, in `(0, 1]`.
    pub convergence_rate: f32,
    pub convergence: Convergence,
    /// Draw agents; otherwise the trail field is shown directly.
    pub display_particles: bool,
    /// Seed for agent placement. `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Worker threads for the parallel phases. `None` uses every core.
    pub threads: Option<usize>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            sim_size: 512,
            render_size: 1080,
            particle_density: 2.7,
            canvas_zoom: 1.0,
            convergence_rate: 0.05,
            convergence: Convergence::Linear,
            display_particles: true,
            seed: None,
            threads: None,
        }
    }
}

fn check_range<T: Into<f64> + Copy>(name: &'static str, value: T, (min, max): (T, T)) -> Result<(), ConfigError> {
    let (v, lo, hi) = (value.into(), min.into(), max.into());
    if v.is_finite() && v >= lo && v <= hi {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value: v,
            min: lo,
            max: hi,
        })
    }
}

impl SystemSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sim_size(mut self, size: u32) -> Self {
        self.sim_size = size;
        self
    }

    pub fn with_render_size(mut self, size: u32) -> Self {
        self.render_size = size;
        self
    }

    pub fn with_particle_density(mut self, density: f32) -> Self {
        self.particle_density = density;
        self
    }

    pub fn with_canvas_zoom(mut self, zoom: f32) -> Self {
        self.canvas_zoom = zoom;
        self
    }

    pub fn with_convergence_rate(mut self, rate: f32) -> Self {
        self.convergence_rate = rate;
        self
    }

    pub fn with_convergence(mut self, convergence: Convergence) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn with_display_particles(mut self, display: bool) -> Self {
        self.display_particles = display;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Check every setting against its supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("sim_size", self.sim_size, SIM_SIZE_RANGE)?;
        check_range("render_size", self.render_size, RENDER_SIZE_RANGE)?;
        check_range("particle_density", self.particle_density, DENSITY_RANGE)?;
        check_range("canvas_zoom", self.canvas_zoom, ZOOM_RANGE)?;
        let rate = self.convergence_rate as f64;
        if !(rate.is_finite() && rate > 0.0 && rate <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "convergence_rate",
                value: rate,
                min: 0.0,
                max: 1.0,
            });
        }
        if let Convergence::Eased { floor } = self.convergence {
            check_range("convergence floor", floor, (0.0, 1.0))?;
        }
        Ok(())
    }

    /// Agents a simulation built from these settings holds.
    pub fn agent_count(&self) -> usize {
        agent_count(self.sim_size, self.particle_density)
    }

    /// Whether moving from `self` to `other` needs new field and agent buffers.
    pub fn needs_realloc(&self, other: &SystemSettings) -> bool {
        self.sim_size != other.sim_size || self.agent_count() != other.agent_count()
    }

    /// Double the convergence rate, up to 1.
    pub fn faster(&mut self) -> f32 {
        self.convergence_rate = (self.convergence_rate * 2.0).min(1.0);
        self.convergence_rate
    }

    /// Halve the convergence rate, down to [`MIN_CONVERGENCE_RATE`].
    pub fn slower(&mut self) -> f32 {
        self.convergence_rate = (self.convergence_rate / 2.0).max(MIN_CONVERGENCE_RATE);
        self.convergence_rate
    }

    /// Read settings from a JSON file and validate them.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let settings: SystemSettings = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}
