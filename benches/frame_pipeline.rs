//! Benchmarks for the per-frame CPU pipeline.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use physarum::buffer::DoubleBuffer;
use physarum::compositor::Compositor;
use physarum::field::{deposit, diffuse_and_decay, FieldBuffer};
use physarum::interpolate::{lerp_params, Convergence, PresetInterpolator};
use physarum::params::{ParamId, ParameterVector};
use physarum::parallel::Executor;
use physarum::settings::SystemSettings;
use physarum::simulation::SimulationState;

fn bench_settings(size: u32) -> SystemSettings {
    SystemSettings::new()
        .with_sim_size(size)
        .with_particle_density(1.0)
        .with_seed(1)
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    group.sample_size(20);

    for size in [128u32, 256, 512] {
        group.bench_with_input(BenchmarkId::new("advance", size), &size, |b, &size| {
            let mut sim = SimulationState::new(bench_settings(size), ParameterVector::default()).expect("simulation");
            b.iter(|| {
                sim.advance();
                black_box(sim.frame_count())
            })
        });
    }

    group.finish();
}

fn bench_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("field");
    let exec = Executor::with_threads(None).expect("thread pool");

    for passes in [1.0f32, 5.0, 10.0] {
        group.bench_with_input(BenchmarkId::new("diffuse_and_decay", passes as u32), &passes, |b, &passes| {
            let params = ParameterVector::default().with(ParamId::BlurIterations, passes);
            let size = 256;
            let cells: Vec<f32> = (0..size * size).map(|i| (i % 97) as f32 / 97.0).collect();
            let seed = FieldBuffer::from_cells(size, cells);
            let mut field = DoubleBuffer::new(seed.clone(), seed);
            b.iter(|| black_box(diffuse_and_decay(&exec, &mut field, &params)))
        });
    }

    group.bench_function("deposit_65k", |b| {
        let sim = SimulationState::new(bench_settings(256), ParameterVector::default()).expect("simulation");
        let params = *sim.params();
        let mut field = DoubleBuffer::from_value(FieldBuffer::try_new(256).expect("field"));
        b.iter(|| deposit(&mut field, black_box(sim.agents()), &params))
    });

    group.finish();
}

fn bench_compositor(c: &mut Criterion) {
    let mut group = c.benchmark_group("compositor");
    group.sample_size(20);

    for particles in [false, true] {
        let name = if particles { "particles" } else { "field" };
        group.bench_function(name, |b| {
            let settings = bench_settings(256).with_display_particles(particles);
            let mut sim = SimulationState::new(settings, ParameterVector::default()).expect("simulation");
            for _ in 0..10 {
                sim.advance();
            }
            let mut compositor = Compositor::new(512).expect("compositor");
            b.iter(|| black_box(compositor.render(&sim.view())))
        });
    }

    group.finish();
}

fn bench_interpolation(c: &mut Criterion) {
    let a = ParameterVector::default();
    let b_params = a
        .with(ParamId::SensorDistanceMultiplier, 40.0)
        .with(ParamId::DepositAmount, 3.0);

    c.bench_function("lerp_params", |b| b.iter(|| black_box(lerp_params(&a, &b_params, black_box(0.37)))));

    c.bench_function("interpolator_advance", |b| {
        let mut interp = PresetInterpolator::new(a, 1e-6, Convergence::Linear);
        interp.switch_to(b_params);
        b.iter(|| black_box(*interp.advance()))
    });
}

criterion_group!(benches, bench_frame, bench_field, bench_compositor, bench_interpolation);
criterion_main!(benches);
