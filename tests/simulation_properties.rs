//! Behavioural properties of the simulation, checked through the public API.

use physarum::agent::{agent_count, steer, wrap_position};
use physarum::buffer::DoubleBuffer;
use physarum::field::{deposit, diffuse_and_decay, FieldBuffer};
use physarum::interpolate::{blend, lerp_params, Convergence, PresetInterpolator};
use physarum::params::{InterpLaw, ParamId, ParameterVector};
use physarum::parallel::Executor;
use physarum::presets::{MemoryPresetStore, PresetRepository};
use physarum::session::Session;
use physarum::settings::SystemSettings;
use physarum::simulation::SimulationState;
use physarum::Vec2;

fn settings(size: u32, density: f32) -> SystemSettings {
    SystemSettings::new()
        .with_sim_size(size)
        .with_particle_density(density)
        .with_seed(11)
        .with_threads(1)
}

fn trail_params(decay: f32, blur: f32, deposit: f32) -> ParameterVector {
    ParameterVector::default()
        .with(ParamId::DecayFactor, decay)
        .with(ParamId::BlurIterations, blur)
        .with(ParamId::DepositAmount, deposit)
}

// ============================================================================
// Toroidal Wrap
// ============================================================================

#[test]
fn test_wrap_is_periodic_over_two_units() {
    let points = [
        Vec2::new(0.3, -0.7),
        Vec2::new(-0.99, 0.99),
        Vec2::new(0.0, 0.0),
        Vec2::new(0.5, 0.25),
    ];
    for p in points {
        let a = wrap_position(p);
        let b = wrap_position(p + Vec2::new(2.0, 0.0));
        let c = wrap_position(p + Vec2::new(0.0, -2.0));
        assert!((a - b).length() < 1e-5, "{:?} vs {:?}", a, b);
        assert!((a - c).length() < 1e-5, "{:?} vs {:?}", a, c);
        assert!(a.x >= -1.0 && a.x < 1.0 && a.y >= -1.0 && a.y < 1.0);
    }
}

#[test]
fn test_field_sampling_wraps_by_grid_size() {
    let n = 8;
    let cells: Vec<f32> = (0..n * n).map(|i| i as f32 / (n * n) as f32).collect();
    let field = FieldBuffer::from_cells(n, cells);
    for &(x, y) in &[(0.25f32, 3.5f32), (6.75, 0.0), (7.5, 7.5)] {
        let here = field.sample_grid(x, y);
        let shifted = field.sample_grid(x + n as f32, y);
        let shifted_y = field.sample_grid(x, y - n as f32);
        assert!((here - shifted).abs() < 1e-5);
        assert!((here - shifted_y).abs() < 1e-5);
    }
}

// ============================================================================
// Agent Count
// ============================================================================

#[test]
fn test_agent_count_matches_settings_through_frames_and_resize() {
    let mut sim = SimulationState::new(settings(16, 1.5), ParameterVector::default()).unwrap();
    assert_eq!(sim.agents().len(), agent_count(16, 1.5));

    for _ in 0..5 {
        sim.step();
        assert_eq!(sim.agents().len(), 384);
    }

    sim.resize(settings(32, 0.5)).unwrap();
    assert_eq!(sim.agents().len(), agent_count(32, 0.5));
    assert_eq!(sim.field().size(), 32);
    sim.step();
    assert_eq!(sim.agents().len(), 512);
}

#[test]
fn test_rejected_resize_keeps_running_state() {
    let mut sim = SimulationState::new(settings(16, 1.0), ParameterVector::default()).unwrap();
    sim.step();
    let before = sim.agents().len();
    assert!(sim.resize(settings(0, 1.0)).is_err());
    assert_eq!(sim.agents().len(), before);
    assert_eq!(sim.field().size(), 16);
}

// ============================================================================
// Interpolation
// ============================================================================

#[test]
fn test_interpolation_endpoints_for_every_law() {
    for law in [InterpLaw::Linear, InterpLaw::Geometric, InterpLaw::EasedGeometric] {
        for &(a, b) in &[(0.5f32, 8.0f32), (3.0, 0.25), (-1.0, 4.0), (0.0, 2.0)] {
            assert!((blend(law, a, b, 0.0) - a).abs() < 1e-5, "{:?} t=0", law);
            assert!((blend(law, a, b, 1.0) - b).abs() < 1e-5, "{:?} t=1", law);
        }
    }
}

#[test]
fn test_geometric_blend_never_produces_nan() {
    for law in [InterpLaw::Geometric, InterpLaw::EasedGeometric] {
        for &(a, b) in &[(0.0f32, 5.0f32), (5.0, 0.0), (-2.0, 3.0), (2.0, -3.0), (0.0, 0.0)] {
            for i in 0..=10 {
                let t = i as f32 / 10.0;
                assert!(blend(law, a, b, t).is_finite(), "{:?} {} {} {}", law, a, b, t);
            }
        }
    }
}

#[test]
fn test_lerp_params_endpoints() {
    let a = ParameterVector::default();
    let b = ParameterVector::default()
        .with(ParamId::SensorDistanceBase, 30.0)
        .with(ParamId::DepositAmount, 2.0)
        .with(ParamId::DecayFactor, 0.6);
    assert_eq!(lerp_params(&a, &b, 0.0), a);
    let end = lerp_params(&a, &b, 1.0);
    for id in ParamId::ALL {
        assert!((end.get(id) - b.get(id)).abs() < 1e-4, "{}", id.name());
    }
}

#[test]
fn test_preset_switch_starts_from_current_blend() {
    let a = ParameterVector::default();
    let b = a.with(ParamId::SensorAngleBase, 1.5).with(ParamId::DecayFactor, 0.7);
    let c = a.with(ParamId::SensorAngleBase, 0.1).with(ParamId::DecayFactor, 0.9);

    let mut interp = PresetInterpolator::new(a, 0.1, Convergence::Linear);
    interp.switch_to(b);
    for _ in 0..4 {
        interp.advance();
    }
    let mid = *interp.current();

    interp.switch_to(c);
    assert_eq!(interp.progress(), 0.0);
    assert_eq!(*interp.past(), mid);
    assert_eq!(lerp_params(interp.past(), interp.target(), 0.0), mid);
}

#[test]
fn test_session_preset_switch_has_no_jump() {
    let sim = SimulationState::new(settings(8, 1.0), ParameterVector::default()).unwrap();
    let mut session = Session::new(sim, MemoryPresetStore::new()).unwrap();

    assert!(session.select_preset(0));
    for _ in 0..3 {
        session.step();
    }
    let before = *session.sim().params();

    assert!(session.select_preset(1));
    let interp = session.sim().interpolator();
    assert_eq!(interp.progress(), 0.0);
    assert_eq!(lerp_params(interp.past(), interp.target(), 0.0), before);
}

// ============================================================================
// Diffusion And Decay
// ============================================================================

fn seeded_field(size: usize) -> DoubleBuffer<FieldBuffer> {
    let cells: Vec<f32> = (0..size * size).map(|i| ((i * 7) % 11) as f32 / 11.0).collect();
    let field = FieldBuffer::from_cells(size, cells);
    DoubleBuffer::new(field.clone(), field)
}

#[test]
fn test_sum_decreases_without_deposit() {
    let exec = Executor::with_threads(Some(1)).unwrap();
    let params = trail_params(0.9, 1.0, 0.0);
    let mut field = seeded_field(8);

    let mut previous = field.current().sum();
    assert!(previous > 0.0);
    for _ in 0..10 {
        deposit(&mut field, &[], &params);
        let passes = diffuse_and_decay(&exec, &mut field, &params);
        assert_eq!(passes, 1);
        let sum = field.current().sum();
        assert!(sum < previous, "{} should be below {}", sum, previous);
        assert!((sum - previous * 0.9).abs() < 1e-3);
        previous = sum;
    }
}

#[test]
fn test_zero_blur_leaves_field_unchanged() {
    let exec = Executor::with_threads(Some(1)).unwrap();
    let params = trail_params(0.5, 0.0, 0.0);
    let mut field = seeded_field(8);
    let before = field.current().cells().to_vec();

    deposit(&mut field, &[], &params);
    assert_eq!(diffuse_and_decay(&exec, &mut field, &params), 0);
    assert_eq!(field.current().cells(), &before[..]);
}

#[test]
fn test_deposit_amount_sets_trail_density() {
    let exec = Executor::with_threads(Some(1)).unwrap();
    let agents: Vec<_> = (0..64)
        .map(|i| physarum::agent::Agent {
            position: Vec2::new((i as f32 * 0.173).sin(), (i as f32 * 0.311).cos()),
            age: 0.0,
            heading: 0.0,
        })
        .collect();
    let run = |amount: f32| {
        let params = trail_params(0.951, 1.0, amount);
        let mut field = DoubleBuffer::from_value(FieldBuffer::try_new(32).unwrap());
        for _ in 0..60 {
            deposit(&mut field, &agents, &params);
            diffuse_and_decay(&exec, &mut field, &params);
        }
        let field = field.current();
        assert!(field.max_value() < 1.0);
        field.sum() / field.cells().len() as f64
    };

    let (faint, medium, strong) = (run(0.5), run(4.0), run(16.0));
    assert!(medium > faint * 2.0, "{} vs {}", medium, faint);
    assert!(strong > medium * 1.3, "{} vs {}", strong, medium);
}

#[test]
fn test_zero_blur_frames_keep_trail() {
    let mut sim = SimulationState::new(settings(8, 1.0), trail_params(0.5, 0.0, 10.0)).unwrap();
    sim.step();
    assert!(sim.field().sum() > 0.0);

    sim.set_param(ParamId::DepositAmount, 0.0);
    let before = sim.field().cells().to_vec();
    sim.step();
    assert_eq!(sim.field().cells(), &before[..]);
}

// ============================================================================
// Steering
// ============================================================================

#[test]
fn test_forward_probe_keeps_heading_for_any_rotation() {
    for &rotation in &[0.0f32, 0.1, -0.7, 3.0, 100.0] {
        for &(l, r) in &[(0.2f32, 0.3f32), (0.5, 0.5), (0.0, 0.99)] {
            let heading = steer(1.0, l, r, 0.42, rotation, || panic!("coin flipped"));
            assert_eq!(heading, 0.42);
        }
    }
}

#[test]
fn test_stronger_side_wins() {
    assert_eq!(steer(0.1, 0.9, 0.2, 1.0, 0.25, || 0.0), 1.25);
    assert_eq!(steer(0.1, 0.2, 0.9, 1.0, 0.25, || 0.0), 0.75);
    assert_eq!(steer(0.1, 0.9, 0.9, 1.0, 0.25, || 0.9), 1.25);
    assert_eq!(steer(0.1, 0.9, 0.9, 1.0, 0.25, || 0.1), 0.75);
}

// ============================================================================
// Hostile Presets
// ============================================================================

fn preset_json(title: &str, params: &[f32]) -> String {
    serde_json::json!({ "title": title, "parameters": params }).to_string()
}

#[test]
fn test_hostile_preset_is_rejected_before_it_can_run() {
    let mut store = MemoryPresetStore::new();
    let mut values = ParameterVector::default().as_slice().to_vec();
    values[ParamId::SensorDistanceExponent.index()] = -5.0;
    assert!(store.import_json(&preset_json("hostile", &values)).is_err());

    let sim = SimulationState::new(settings(16, 1.0), ParameterVector::default()).unwrap();
    let mut session = Session::new(sim, store).unwrap();
    assert!(!session.select_preset_by_title("hostile"));
    for _ in 0..5 {
        session.step();
    }
    assert!(session.sim().field().cells().iter().all(|c| c.is_finite()));
}

#[test]
fn test_extreme_valid_preset_steps_cleanly() {
    let mut extreme = ParameterVector::default();
    for id in ParamId::ALL {
        let spec = id.spec();
        extreme.set(id, if id.name().ends_with("Exponent") { spec.min } else { spec.limit });
    }
    let mut store = MemoryPresetStore::new();
    store.import_json(&preset_json("extreme", extreme.as_slice())).unwrap();

    let sim = SimulationState::new(settings(16, 1.0), ParameterVector::default()).unwrap();
    let mut session = Session::new(sim, store).unwrap();
    assert!(session.select_preset_by_title("extreme"));
    session.sim_mut().set_convergence_rate(1.0);
    session.sim_mut().pointer_mut().push(0.5, 0.5);
    for _ in 0..20 {
        session.step();
    }

    let sim = session.sim();
    assert!(sim.field().cells().iter().all(|c| c.is_finite() && (0.0..=1.0).contains(c)));
    assert!(sim.agents().iter().all(|a| {
        a.heading.is_finite() && a.position.x >= -1.0 && a.position.x < 1.0 && a.position.y >= -1.0 && a.position.y < 1.0
    }));
}

// ============================================================================
// End To End
// ============================================================================

#[test]
fn test_small_grid_runs_stably() {
    let mut sim = SimulationState::new(settings(8, 1.0), trail_params(0.9, 1.0, 10.0)).unwrap();
    assert_eq!(sim.agents().len(), 64);

    for _ in 0..100 {
        sim.step();
    }
    let sum = sim.field().sum();
    assert!(sum.is_finite());
    assert!(sum > 0.0);
    assert!(sum <= 100.0 * 64.0 * 10.0);
    assert!(sim.field().cells().iter().all(|c| c.is_finite() && *c >= 0.0));
    assert!(sim
        .agents()
        .iter()
        .all(|a| a.position.x >= -1.0 && a.position.x < 1.0 && a.position.y >= -1.0 && a.position.y < 1.0));
    assert_eq!(sim.frame_count(), 100);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let run = || {
        let mut sim = SimulationState::new(settings(16, 1.0), ParameterVector::default()).unwrap();
        for _ in 0..20 {
            sim.step();
        }
        sim.field().cells().to_vec()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_paused_simulation_holds_still() {
    let mut sim = SimulationState::new(settings(8, 1.0), ParameterVector::default()).unwrap();
    sim.step();
    sim.set_paused(true);
    let before = sim.field().cells().to_vec();
    let frame = sim.frame_count();
    for _ in 0..3 {
        sim.step();
    }
    assert_eq!(sim.field().cells(), &before[..]);
    assert_eq!(sim.frame_count(), frame);
}
