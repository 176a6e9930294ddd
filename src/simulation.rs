//! The per-frame simulation pipeline.
//!
//! [`SimulationState`] owns everything that changes from frame to frame: the
//! agent pool, the two trail fields, the parameter transition and the
//! pointer. [`SimulationState::step`] runs one frame in a fixed order:
//!
//! 1. advance the parameter transition and take the blended vector
//! 2. update every agent against the current field
//! 3. deposit the updated agents into the other field, then swap
//! 4. diffuse and decay, ping-ponging once per pass
//!
//! and hands the result to the compositor as a [`FrameView`].

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::agent::{Agent, AgentPool, Kernel};
use crate::buffer::DoubleBuffer;
use crate::error::{ResourceInitError, SimulationError};
use crate::field::{deposit, diffuse_and_decay, FieldBuffer};
use crate::interpolate::PresetInterpolator;
use crate::parallel::Executor;
use crate::params::{ParamId, ParameterVector};
use crate::pointer::PointerState;
use crate::settings::SystemSettings;

/// Read-only view of one completed frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub field: &'a FieldBuffer,
    pub agents: &'a [Agent],
    pub params: &'a ParameterVector,
    pub display_particles: bool,
    pub frame: u64,
    pub interpolating: bool,
}

/// Everything the frame pipeline reads and writes.
pub struct SimulationState {
    settings: SystemSettings,
    executor: Executor,
    interpolator: PresetInterpolator,
    agents: AgentPool,
    field: DoubleBuffer<FieldBuffer>,
    pointer: PointerState,
    rng: StdRng,
    paused: bool,
    frame: u64,
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn allocate(settings: &SystemSettings, rng: &mut StdRng) -> Result<(AgentPool, DoubleBuffer<FieldBuffer>), ResourceInitError> {
    let size = settings.sim_size as usize;
    let field = DoubleBuffer::new(FieldBuffer::try_new(size)?, FieldBuffer::try_new(size)?);
    let agents = AgentPool::spawn(settings.agent_count(), rng)?;
    Ok((agents, field))
}

impl SimulationState {
    /// Validate `settings` and `params`, allocate buffers and spawn the agents.
    pub fn new(settings: SystemSettings, params: ParameterVector) -> Result<Self, SimulationError> {
        settings.validate()?;
        params.validate()?;
        let executor = Executor::with_threads(settings.threads)?;
        let mut rng = seeded_rng(settings.seed);
        let (agents, field) = allocate(&settings, &mut rng)?;
        let interpolator = PresetInterpolator::new(params, settings.convergence_rate, settings.convergence);

        tracing::info!(
            sim_size = settings.sim_size,
            agents = agents.len(),
            threads = executor.threads(),
            "simulation initialized"
        );

        Ok(Self {
            settings,
            executor,
            interpolator,
            agents,
            field,
            pointer: PointerState::new(),
            rng,
            paused: false,
            frame: 0,
        })
    }

    pub fn settings(&self) -> &SystemSettings {
        &self.settings
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn interpolator(&self) -> &PresetInterpolator {
        &self.interpolator
    }

    pub fn interpolator_mut(&mut self) -> &mut PresetInterpolator {
        &mut self.interpolator
    }

    /// Parameters the last frame ran with.
    pub fn params(&self) -> &ParameterVector {
        self.interpolator.current()
    }

    pub fn agents(&self) -> &[Agent] {
        self.agents.current()
    }

    pub fn field(&self) -> &FieldBuffer {
        self.field.current()
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn pointer_mut(&mut self) -> &mut PointerState {
        &mut self.pointer
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Flip the pause state; returns the new state.
    pub fn toggle_paused(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Direct edit of one slot, clamped to its range. Takes effect without a
    /// transition.
    pub fn set_param(&mut self, id: ParamId, value: f32) -> f32 {
        let clamped = id.spec().clamp(value);
        self.interpolator.edit(id, clamped);
        clamped
    }

    /// Change the transition rate, keeping it inside `(0, 1]`.
    pub fn set_convergence_rate(&mut self, rate: f32) {
        let rate = rate.clamp(crate::settings::MIN_CONVERGENCE_RATE, 1.0);
        self.settings.convergence_rate = rate;
        self.interpolator.set_rate(rate);
    }

    /// Double the transition rate.
    pub fn converge_faster(&mut self) -> f32 {
        let rate = self.settings.faster();
        self.interpolator.set_rate(rate);
        rate
    }

    /// Halve the transition rate.
    pub fn converge_slower(&mut self) -> f32 {
        let rate = self.settings.slower();
        self.interpolator.set_rate(rate);
        rate
    }

    /// Run one frame unless paused, and return what should be displayed.
    pub fn step(&mut self) -> FrameView<'_> {
        if !self.paused {
            self.advance();
        }
        self.view()
    }

    /// Run one frame regardless of the pause state.
    pub fn advance(&mut self) {
        let params = *self.interpolator.advance();
        let interpolating = self.interpolator.is_interpolating();
        self.pointer.advance();

        let kernel = Kernel::new(
            &params,
            self.settings.sim_size as usize,
            self.pointer.is_pressed(),
            interpolating,
        );
        self.agents
            .update(&self.executor, self.field.current(), &kernel, &self.pointer);

        deposit(&mut self.field, self.agents.current(), &params);
        let passes = diffuse_and_decay(&self.executor, &mut self.field, &params);

        self.frame += 1;
        tracing::trace!(frame = self.frame, passes, interpolating, "frame complete");
    }

    /// The state as of the last completed frame.
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            field: self.field.current(),
            agents: self.agents.current(),
            params: self.interpolator.current(),
            display_particles: self.settings.display_particles,
            frame: self.frame,
            interpolating: self.interpolator.is_interpolating(),
        }
    }

    /// Respawn every agent and clear the trail.
    pub fn reset(&mut self) -> Result<(), ResourceInitError> {
        self.agents = AgentPool::spawn(self.settings.agent_count(), &mut self.rng)?;
        self.field.for_each_mut(FieldBuffer::clear);
        tracing::info!(agents = self.agents.len(), "simulation reset");
        Ok(())
    }

    /// Apply new system settings.
    ///
    /// Settings are validated and any new buffers allocated before anything
    /// is replaced; on error the simulation keeps running as it was.
    pub fn resize(&mut self, settings: SystemSettings) -> Result<(), SimulationError> {
        settings.validate()?;

        let executor = if settings.threads != self.settings.threads {
            Some(Executor::with_threads(settings.threads)?)
        } else {
            None
        };

        if self.settings.needs_realloc(&settings) {
            let mut rng = if settings.seed != self.settings.seed {
                seeded_rng(settings.seed)
            } else {
                self.rng.clone()
            };
            let (agents, field) = allocate(&settings, &mut rng)?;
            self.agents = agents;
            self.field = field;
            self.rng = rng;
            tracing::info!(
                sim_size = settings.sim_size,
                agents = self.agents.len(),
                "simulation buffers reallocated"
            );
        }

        if let Some(executor) = executor {
            self.executor = executor;
        }
        self.interpolator.set_rate(settings.convergence_rate);
        self.interpolator.set_convergence(settings.convergence);
        self.settings = settings;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    fn small_settings() -> SystemSettings {
        SystemSettings::new()
            .with_sim_size(16)
            .with_particle_density(1.0)
            .with_seed(3)
            .with_threads(1)
    }

    // ========== Construction Tests ==========

    #[test]
    fn test_new_sizes_buffers() {
        let sim = SimulationState::new(small_settings(), ParameterVector::default()).unwrap();
        assert_eq!(sim.agents().len(), 256);
        assert_eq!(sim.field().size(), 16);
        assert_eq!(sim.frame_count(), 0);
    }

    #[test]
    fn test_new_rejects_bad_settings() {
        let result = SimulationState::new(small_settings().with_sim_size(2), ParameterVector::default());
        assert!(matches!(result, Err(SimulationError::Config(_))));
    }

    #[test]
    fn test_new_rejects_invalid_params() {
        let params = ParameterVector::default().with(ParamId::SensorDistanceExponent, -5.0);
        let result = SimulationState::new(small_settings(), params);
        assert!(matches!(result, Err(SimulationError::Config(ConfigError::OutOfRange { .. }))));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = SimulationState::new(small_settings(), ParameterVector::default()).unwrap();
        let b = SimulationState::new(small_settings(), ParameterVector::default()).unwrap();
        assert_eq!(a.agents(), b.agents());
    }

    // ========== Frame Tests ==========

    #[test]
    fn test_step_advances_and_deposits() {
        let mut sim = SimulationState::new(small_settings(), ParameterVector::default()).unwrap();
        let view = sim.step();
        assert_eq!(view.frame, 1);
        assert!(view.field.sum() > 0.0);
        assert!(view.agents.iter().all(|a| a.position.is_finite()));
    }

    #[test]
    fn test_pause_freezes_state() {
        let mut sim = SimulationState::new(small_settings(), ParameterVector::default()).unwrap();
        sim.step();
        assert!(sim.toggle_paused());
        let before = sim.agents().to_vec();
        let view = sim.step();
        assert_eq!(view.frame, 1);
        assert_eq!(view.agents, before.as_slice());
    }

    #[test]
    fn test_set_param_clamps() {
        let mut sim = SimulationState::new(small_settings(), ParameterVector::default()).unwrap();
        assert_eq!(sim.set_param(ParamId::DecayFactor, 3.0), 0.999);
        assert_eq!(sim.params().get(ParamId::DecayFactor), 0.999);
    }

    // ========== Resize Tests ==========

    #[test]
    fn test_resize_reallocates() {
        let mut sim = SimulationState::new(small_settings(), ParameterVector::default()).unwrap();
        sim.step();
        sim.resize(small_settings().with_sim_size(8)).unwrap();
        assert_eq!(sim.agents().len(), 64);
        assert_eq!(sim.field().size(), 8);
        assert_eq!(sim.field().sum(), 0.0);
    }

    #[test]
    fn test_rejected_resize_keeps_buffers() {
        let mut sim = SimulationState::new(small_settings(), ParameterVector::default()).unwrap();
        sim.step();
        let agents = sim.agents().to_vec();
        let field = sim.field().clone();
        assert!(sim.resize(small_settings().with_particle_density(50.0)).is_err());
        assert_eq!(sim.agents(), agents.as_slice());
        assert_eq!(*sim.field(), field);
        assert_eq!(sim.settings().particle_density, 1.0);
    }

    #[test]
    fn test_reset_clears_field() {
        let mut sim = SimulationState::new(small_settings(), ParameterVector::default()).unwrap();
        sim.step();
        sim.reset().unwrap();
        assert_eq!(sim.field().sum(), 0.0);
        assert_eq!(sim.agents().len(), 256);
    }

    #[test]
    fn test_convergence_rate_controls() {
        let mut sim = SimulationState::new(small_settings(), ParameterVector::default()).unwrap();
        assert_eq!(sim.converge_faster(), 0.1);
        assert_eq!(sim.interpolator().rate(), 0.1);
        assert_eq!(sim.converge_slower(), 0.05);
    }
}
