//! Physarum viewer and headless renderer.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use physarum::compositor::{save_png, Compositor};
use physarum::interpolate::Convergence;
use physarum::params::ParameterVector;
use physarum::presets::{JsonPresetStore, MemoryPresetStore, PresetExport, PresetRepository};
use physarum::session::Session;
use physarum::settings::SystemSettings;
use physarum::simulation::SimulationState;
use physarum::viewer::Viewer;

#[derive(Parser)]
#[command(name = "physarum")]
#[command(about = "Physarum transport-network simulation with smooth preset transitions")]
struct Cli {
    /// System settings file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preset store (JSON); created with the built-in presets if missing
    #[arg(long)]
    presets: Option<PathBuf>,

    /// Last-state file, restored on start and written on exit
    #[arg(long)]
    state: Option<PathBuf>,

    /// Preset to start on, by 1-based index or title
    #[arg(long)]
    preset: Option<String>,

    /// Trail field side length in cells
    #[arg(long)]
    sim_size: Option<u32>,

    /// Agents per field cell
    #[arg(long)]
    density: Option<f32>,

    /// Seed for agent placement
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads for the parallel phases
    #[arg(long)]
    threads: Option<usize>,

    /// Transition progress per frame, in (0, 1]
    #[arg(long)]
    convergence_rate: Option<f32>,

    /// Ease transitions out instead of advancing them linearly
    #[arg(long)]
    eased: bool,

    /// Run without a window and write the last frame as PNG
    #[arg(long)]
    headless: bool,

    /// Frames to simulate in headless mode
    #[arg(long, default_value = "600")]
    frames: u64,

    /// Output image for headless mode
    #[arg(long, short, default_value = "physarum.png")]
    output: PathBuf,

    /// Write every preset in the exchange format and exit
    #[arg(long)]
    export_presets: Option<PathBuf>,

    /// Import presets in the exchange format before starting
    #[arg(long)]
    import_presets: Option<PathBuf>,

    /// Directory for PNG snapshots taken in the viewer
    #[arg(long, default_value = ".")]
    snapshot_dir: PathBuf,
}

fn load_settings(cli: &Cli) -> Result<SystemSettings> {
    let mut settings = match &cli.config {
        Some(path) => SystemSettings::load(path).with_context(|| format!("loading settings from {}", path.display()))?,
        None => SystemSettings::default(),
    };
    if let Some(size) = cli.sim_size {
        settings.sim_size = size;
    }
    if let Some(density) = cli.density {
        settings.particle_density = density;
    }
    if cli.seed.is_some() {
        settings.seed = cli.seed;
    }
    if cli.threads.is_some() {
        settings.threads = cli.threads;
    }
    if let Some(rate) = cli.convergence_rate {
        settings.convergence_rate = rate;
    }
    if cli.eased {
        settings.convergence = Convergence::eased();
    }
    settings.validate().context("invalid settings")?;
    Ok(settings)
}

fn import_presets(repository: &mut impl PresetRepository, path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };
    let mut count = 0;
    for item in items {
        let preset = repository
            .import_json(&item.to_string())
            .with_context(|| format!("importing preset from {}", path.display()))?;
        info!(title = %preset.title, "imported preset");
        count += 1;
    }
    Ok(count)
}

fn export_presets(repository: &impl PresetRepository, path: &Path) -> Result<usize> {
    let exports: Vec<PresetExport> = repository.load_all()?.iter().map(|p| p.to_export()).collect();
    let text = serde_json::to_string_pretty(&exports)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(exports.len())
}

fn select_start_preset(session: &mut Session, choice: &str) -> Result<()> {
    let found = match choice.parse::<usize>() {
        Ok(0) => false,
        Ok(index) => session.select_preset(index - 1),
        Err(_) => session.select_preset_by_title(choice),
    };
    if !found {
        bail!("no preset matches '{}'", choice);
    }
    Ok(())
}

fn run_headless(mut session: Session, frames: u64, output: &Path) -> Result<()> {
    let mut compositor = Compositor::new(session.sim().settings().render_size)?;
    let mut image = compositor.render(&session.sim().view());
    for _ in 0..frames {
        let view = session.step();
        image = compositor.render(&view);
    }
    save_png(&image, output).with_context(|| format!("writing {}", output.display()))?;
    info!(frames, path = %output.display(), "headless run complete");
    Ok(())
}

fn run<R: PresetRepository + 'static>(cli: &Cli, settings: SystemSettings, mut repository: R) -> Result<()> {
    if let Some(path) = &cli.import_presets {
        let count = import_presets(&mut repository, path)?;
        info!(count, "presets imported");
    }
    if let Some(path) = &cli.export_presets {
        let count = export_presets(&repository, path)?;
        info!(count, path = %path.display(), "presets exported");
        return Ok(());
    }

    let sim = SimulationState::new(settings, ParameterVector::default()).context("starting simulation")?;
    let mut session = Session::new(sim, repository).context("loading presets")?;

    if let Some(path) = &cli.state {
        if path.exists() {
            if let Err(e) = session.restore_last_state(path) {
                warn!("ignoring last state: {}", e);
            }
        }
    }
    if let Some(choice) = &cli.preset {
        select_start_preset(&mut session, choice)?;
    }

    if cli.headless {
        return run_headless(session, cli.frames, &cli.output);
    }

    let mut viewer = Viewer::new(session)
        .context("viewer setup failed")?
        .with_snapshot_dir(&cli.snapshot_dir);
    if let Some(path) = &cli.state {
        viewer = viewer.with_state_path(path);
    }
    viewer.run().context("viewer failed")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_settings(&cli)?;
    match &cli.presets {
        Some(path) => {
            let store = JsonPresetStore::open(path).with_context(|| format!("opening preset store {}", path.display()))?;
            run(&cli, settings, store)
        }
        None => run(&cli, settings, MemoryPresetStore::new()),
    }
}
