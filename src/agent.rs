//! Agents and the per-frame sensing, steering and movement rule.
//!
//! Each agent samples the trail under itself, derives its probe distance,
//! probe angle, turn angle and step length from that sample, reads three
//! probes and turns toward the strongest. The update of one agent depends only
//! on its own previous state, the field snapshot and the parameters, so the
//! whole pool is updated with a [`ParallelMap`] into the other half of a
//! [`DoubleBuffer`].

use std::f32::consts::TAU;

use bytemuck::Zeroable;
use glam::Vec2;
use rand::Rng;

use crate::buffer::DoubleBuffer;
use crate::error::ResourceInitError;
use crate::field::{to_texture_space, FieldBuffer};
use crate::noise::{hash_noise, NoiseStream};
use crate::parallel::ParallelMap;
use crate::params::{ParamId, ParameterVector};
use crate::pointer::PointerState;

/// Fraction of the population respawned along the pointer path per frame;
/// also the age increment per frame.
pub const SPAWN_SEGMENT: f32 = 0.005;

/// Scale applied to the trail-dependent part of probe and step distances.
pub const DISTANCE_SCALE: f32 = 250.0;

/// Floor for the sensed trail before exponentiation.
pub const MIN_SENSED: f32 = 1e-9;

/// Largest scatter of an agent spawned on the pointer path.
pub const SPAWN_JITTER: f32 = 0.05;

/// A single agent.
#[derive(Clone, Copy, Debug, PartialEq, Zeroable)]
pub struct Agent {
    /// Position in `[-1, 1)²`.
    pub position: Vec2,
    /// Cyclic spawn phase in `[0, 1)`.
    pub age: f32,
    /// Heading in radians; unbounded.
    pub heading: f32,
}

/// Wrap a position into `[-1, 1)²`.
#[inline]
pub fn wrap_position(p: Vec2) -> Vec2 {
    let s = to_texture_space(p);
    Vec2::new(unit_fract(s.x), unit_fract(s.y)) * 2.0 - Vec2::ONE
}

#[inline]
fn unit_fract(v: f32) -> f32 {
    let f = v - v.floor();
    // Tiny negative inputs can round up to exactly 1.0.
    if f >= 1.0 {
        0.0
    } else {
        f
    }
}

/// Number of agents for a grid size and density.
pub fn agent_count(sim_size: u32, density: f32) -> usize {
    let cells = sim_size as f64 * sim_size as f64;
    (cells * density as f64).round().max(0.0) as usize
}

/// Steering decision given the three probe readings.
///
/// `coin` is only consulted when both side probes beat the forward probe.
#[inline]
pub fn steer(forward: f32, left: f32, right: f32, heading: f32, rotation: f32, coin: impl FnOnce() -> f32) -> f32 {
    if forward >= left && forward >= right {
        heading
    } else if forward < left && forward < right {
        if coin() > 0.5 {
            heading + rotation
        } else {
            heading - rotation
        }
    } else if left < right {
        heading - rotation
    } else if left > right {
        heading + rotation
    } else {
        heading
    }
}

/// Per-frame constants of the agent rule, derived once from the parameters.
#[derive(Clone, Copy, Debug)]
pub struct Kernel {
    half_dim: f32,
    sensor_distance: [f32; 3],
    sensor_angle: [f32; 3],
    rotation_angle: [f32; 3],
    move_distance: [f32; 3],
    offset_y: f32,
    offset_heading: f32,
    pointer_down: bool,
    jitter: bool,
}

fn triple(params: &ParameterVector, base: ParamId, exponent: ParamId, multiplier: ParamId) -> [f32; 3] {
    [params.get(base), params.get(exponent), params.get(multiplier)]
}

#[inline]
fn response([base, exponent, multiplier]: [f32; 3], sensed: f32) -> (f32, f32) {
    (base, multiplier * sensed.powf(exponent))
}

impl Kernel {
    pub fn new(params: &ParameterVector, sim_size: usize, pointer_down: bool, interpolating: bool) -> Self {
        use ParamId::*;
        Self {
            half_dim: sim_size as f32 / 2.0,
            sensor_distance: triple(params, SensorDistanceBase, SensorDistanceExponent, SensorDistanceMultiplier),
            sensor_angle: triple(params, SensorAngleBase, SensorAngleExponent, SensorAngleMultiplier),
            rotation_angle: triple(params, RotationAngleBase, RotationAngleExponent, RotationAngleMultiplier),
            move_distance: triple(params, MoveDistanceBase, MoveDistanceExponent, MoveDistanceMultiplier),
            offset_y: params.get(PositionOffsetY),
            offset_heading: params.get(PositionOffsetHeading),
            pointer_down,
            jitter: !interpolating,
        }
    }

    fn distance(&self, triple: [f32; 3], sensed: f32) -> f32 {
        let (base, scaled) = response(triple, sensed);
        base / self.half_dim + scaled * DISTANCE_SCALE / self.half_dim
    }

    fn angle(&self, triple: [f32; 3], sensed: f32) -> f32 {
        let (base, scaled) = response(triple, sensed);
        base + scaled
    }

    /// Advance one agent by one frame.
    pub fn step(&self, agent: &Agent, field: &FieldBuffer, pointer: &PointerState) -> Agent {
        let heading = agent.heading;
        let dir = Vec2::from_angle(heading);
        let uv = to_texture_space(agent.position);

        let probe_origin = uv
            + dir * (self.offset_heading / self.half_dim)
            + Vec2::new(0.0, self.offset_y / self.half_dim);
        let sensed = field.sample(probe_origin).max(MIN_SENSED);

        let sensor_distance = self.distance(self.sensor_distance, sensed);
        let move_distance = self.distance(self.move_distance, sensed);
        let sensor_angle = self.angle(self.sensor_angle, sensed);
        let rotation = self.angle(self.rotation_angle, sensed);

        let forward = field.sample(uv + dir * sensor_distance);
        let left = field.sample(uv + Vec2::from_angle(heading + sensor_angle) * sensor_distance);
        let right = field.sample(uv + Vec2::from_angle(heading - sensor_angle) * sensor_distance);

        let new_heading = steer(forward, left, right, heading, rotation, || {
            hash_noise(agent.position.x, agent.position.y, heading, NoiseStream::Steering)
        });
        let new_dir = Vec2::from_angle(new_heading);
        let mut position = agent.position + new_dir * move_distance;

        if agent.age < SPAWN_SEGMENT && self.pointer_down {
            position = pointer.spline(agent.age / SPAWN_SEGMENT) * 2.0 - Vec2::ONE;
            if self.jitter {
                let n = hash_noise(agent.position.x, agent.position.y, heading, NoiseStream::SpawnJitter);
                position += new_dir * n.powf(1.2) * SPAWN_JITTER;
            }
        }

        let next = Agent {
            position: wrap_position(position),
            age: unit_fract(agent.age + SPAWN_SEGMENT),
            heading: new_heading,
        };
        debug_assert!(
            next.position.is_finite() && next.heading.is_finite(),
            "non-finite agent state from {:?} (sensed {})",
            agent,
            sensed
        );
        next
    }
}

/// Fixed-size population of agents, double-buffered.
#[derive(Clone, Debug)]
pub struct AgentPool {
    agents: DoubleBuffer<Vec<Agent>>,
}

impl AgentPool {
    /// Spawn `count` agents: uniform positions and headings, ages evenly
    /// staggered over `[0, 1)`.
    pub fn spawn<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Result<Self, ResourceInitError> {
        let mut agents = Vec::new();
        agents
            .try_reserve_exact(count)
            .map_err(|_| ResourceInitError::Allocation { what: "agent pool", len: count })?;
        agents.extend((0..count).map(|i| Agent {
            position: Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)),
            age: i as f32 / count as f32,
            heading: rng.gen_range(0.0..TAU),
        }));

        let mut back = Vec::new();
        back.try_reserve_exact(count)
            .map_err(|_| ResourceInitError::Allocation { what: "agent pool", len: count })?;
        back.resize(count, Agent::zeroed());

        Ok(Self {
            agents: DoubleBuffer::new(agents, back),
        })
    }

    /// Pool holding exactly `agents`.
    pub fn from_agents(agents: Vec<Agent>) -> Self {
        let back = vec![Agent::zeroed(); agents.len()];
        Self {
            agents: DoubleBuffer::new(agents, back),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Agents as of the last completed update.
    pub fn current(&self) -> &[Agent] {
        self.agents.current()
    }

    /// Compute every agent's next state from the current snapshot into the
    /// back buffer, then make it current.
    pub fn update<E: ParallelMap>(&mut self, exec: &E, field: &FieldBuffer, kernel: &Kernel, pointer: &PointerState) {
        let (src, dst) = self.agents.split();
        exec.map_into(src, dst, |_, agent| kernel.step(agent, field, pointer));
        self.agents.swap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::Executor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn still_params() -> ParameterVector {
        let mut p = ParameterVector::new([0.0; 32]);
        p.set(ParamId::MoveDistanceBase, 1.0);
        p.set(ParamId::SensorDistanceBase, 2.0);
        p.set(ParamId::SensorAngleBase, 0.5);
        p.set(ParamId::RotationAngleBase, 0.3);
        p
    }

    // ========== Wrap Tests ==========

    #[test]
    fn test_wrap_period_two() {
        for &(x, y) in &[(0.3f32, -0.4f32), (-0.999, 0.999), (0.0, 0.0), (0.75, -1.0)] {
            let p = Vec2::new(x, y);
            let a = wrap_position(p);
            let b = wrap_position(p + Vec2::new(2.0, 0.0));
            let c = wrap_position(p + Vec2::new(0.0, -4.0));
            assert!((a - b).length() < 1e-5);
            assert!((a - c).length() < 1e-5);
        }
    }

    #[test]
    fn test_wrap_range() {
        for i in -50..50 {
            let v = i as f32 * 0.137;
            let w = wrap_position(Vec2::new(v, -v));
            assert!(w.x >= -1.0 && w.x < 1.0);
            assert!(w.y >= -1.0 && w.y < 1.0);
        }
        assert_eq!(wrap_position(Vec2::new(1.0, -1.0)), Vec2::new(-1.0, -1.0));
        let tiny = wrap_position(Vec2::new(-1.0 - 1e-9, 0.0));
        assert!(tiny.x >= -1.0 && tiny.x < 1.0);
    }

    #[test]
    fn test_agent_count_rounds() {
        assert_eq!(agent_count(8, 1.0), 64);
        assert_eq!(agent_count(10, 0.25), 25);
        assert_eq!(agent_count(3, 0.5), 5);
        assert_eq!(agent_count(512, 2.7), 707789);
    }

    // ========== Steering Tests ==========

    #[test]
    fn test_forward_strongest_keeps_heading() {
        for rotation in [0.0, 0.1, 1.0, 10.0] {
            let h = steer(0.9, 0.2, 0.3, 1.25, rotation, || panic!("coin not needed"));
            assert_eq!(h, 1.25);
        }
    }

    #[test]
    fn test_forward_tie_keeps_heading() {
        assert_eq!(steer(0.5, 0.5, 0.1, 0.0, 1.0, || 0.0), 0.0);
    }

    #[test]
    fn test_trough_uses_coin() {
        assert_eq!(steer(0.1, 0.5, 0.6, 0.0, 1.0, || 0.9), 1.0);
        assert_eq!(steer(0.1, 0.5, 0.6, 0.0, 1.0, || 0.2), -1.0);
    }

    #[test]
    fn test_turn_toward_stronger_side() {
        // Right stronger: turn right (heading decreases)
        assert_eq!(steer(0.3, 0.1, 0.5, 0.0, 0.5, || 0.0), -0.5);
        // Left stronger: turn left
        assert_eq!(steer(0.3, 0.5, 0.1, 0.0, 0.5, || 0.0), 0.5);
    }

    // ========== Kernel Tests ==========

    #[test]
    fn test_empty_field_moves_straight() {
        let field = FieldBuffer::try_new(16).unwrap();
        let kernel = Kernel::new(&still_params(), 16, false, false);
        let agent = Agent {
            position: Vec2::new(0.0, 0.0),
            age: 0.5,
            heading: 0.0,
        };
        let next = kernel.step(&agent, &field, &PointerState::new());
        // forward == left == right on an empty field
        assert_eq!(next.heading, 0.0);
        // base / half_dim = 1 / 8
        assert!((next.position.x - 0.125).abs() < 1e-6);
        assert!((next.age - 0.505).abs() < 1e-6);
    }

    #[test]
    fn test_age_wraps() {
        let field = FieldBuffer::try_new(8).unwrap();
        let kernel = Kernel::new(&still_params(), 8, false, false);
        let agent = Agent {
            position: Vec2::ZERO,
            age: 0.998,
            heading: 0.0,
        };
        let next = kernel.step(&agent, &field, &PointerState::new());
        assert!(next.age < 0.01);
    }

    #[test]
    fn test_turns_toward_trail() {
        let size = 32;
        let mut field = FieldBuffer::try_new(size).unwrap();
        // Bright band above the agent, so the left probe (heading + angle) wins.
        for x in 0..size {
            for y in 17..20 {
                field.cells_mut()[y * size + x] = 1.0;
            }
        }
        let kernel = Kernel::new(&still_params(), size, false, false);
        let agent = Agent {
            position: Vec2::new(0.0, 0.0),
            age: 0.5,
            heading: 0.0,
        };
        let next = kernel.step(&agent, &field, &PointerState::new());
        assert!((next.heading - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_pointer_override_places_young_agents() {
        let field = FieldBuffer::try_new(8).unwrap();
        let mut pointer = PointerState::new();
        pointer.set_cursor(0.75, 0.25);
        for _ in 0..4 {
            pointer.advance();
        }
        pointer.set_pressed(true);

        // Jitter disabled while interpolating
        let kernel = Kernel::new(&still_params(), 8, true, true);
        let young = Agent {
            position: Vec2::new(-0.5, 0.5),
            age: 0.001,
            heading: 2.0,
        };
        let next = kernel.step(&young, &field, &pointer);
        assert!((next.position - Vec2::new(0.5, -0.5)).length() < 1e-5);

        let old = Agent { age: 0.3, ..young };
        let next = kernel.step(&old, &field, &pointer);
        assert!((next.position - Vec2::new(0.5, -0.5)).length() > 0.1);
    }

    #[test]
    fn test_spawn_jitter_is_bounded() {
        let field = FieldBuffer::try_new(8).unwrap();
        let mut pointer = PointerState::new();
        pointer.set_cursor(0.5, 0.5);
        pointer.set_pressed(true);
        pointer.advance();
        let kernel = Kernel::new(&still_params(), 8, true, false);
        for i in 0..20 {
            let agent = Agent {
                position: Vec2::new(i as f32 * 0.05 - 0.5, 0.1),
                age: 0.0,
                heading: i as f32,
            };
            let next = kernel.step(&agent, &field, &pointer);
            assert!(next.position.length() <= SPAWN_JITTER + 1e-5);
        }
    }

    #[test]
    fn test_extreme_exponents_stay_finite() {
        let mut field = FieldBuffer::try_new(16).unwrap();
        field.cells_mut().fill(1.0);
        let mut params = still_params();
        params.set(ParamId::SensorDistanceExponent, 400.0);
        params.set(ParamId::SensorDistanceMultiplier, 2000.0);
        params.set(ParamId::RotationAngleExponent, 0.0);
        params.set(ParamId::RotationAngleMultiplier, 200.0);
        let kernel = Kernel::new(&params, 16, false, false);
        let agent = Agent {
            position: Vec2::new(0.2, 0.2),
            age: 0.5,
            heading: 0.7,
        };
        let next = kernel.step(&agent, &field, &PointerState::new());
        assert!(next.position.is_finite());
        assert!(next.heading.is_finite());

        let empty = FieldBuffer::try_new(16).unwrap();
        let next = kernel.step(&agent, &empty, &PointerState::new());
        assert!(next.position.is_finite());
    }

    // ========== Pool Tests ==========

    #[test]
    fn test_spawn_layout() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = AgentPool::spawn(200, &mut rng).unwrap();
        assert_eq!(pool.len(), 200);
        for (i, agent) in pool.current().iter().enumerate() {
            assert!((agent.age - i as f32 / 200.0).abs() < 1e-6);
            assert!(agent.position.x >= -1.0 && agent.position.x < 1.0);
            assert!(agent.heading >= 0.0 && agent.heading < TAU);
        }
    }

    #[test]
    fn test_update_reads_snapshot_only() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut field = FieldBuffer::try_new(16).unwrap();
        for (i, c) in field.cells_mut().iter_mut().enumerate() {
            *c = ((i * 37) % 11) as f32 / 11.0;
        }
        let kernel = Kernel::new(&ParameterVector::default(), 16, false, false);
        let pointer = PointerState::new();

        let mut serial = AgentPool::spawn(300, &mut rng).unwrap();
        let mut parallel = serial.clone();
        let expected: Vec<Agent> = serial
            .current()
            .iter()
            .map(|a| kernel.step(a, &field, &pointer))
            .collect();

        serial.update(&Executor::Serial, &field, &kernel, &pointer);
        parallel.update(&Executor::Global, &field, &kernel, &pointer);
        assert_eq!(serial.current(), expected.as_slice());
        assert_eq!(parallel.current(), expected.as_slice());
    }
}
