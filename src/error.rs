//! Error types for the simulation, its collaborators and the viewer.
//!
//! Configuration problems are reported before any buffer is touched, so a
//! rejected request always leaves the running simulation as it was.

use thiserror::Error;

/// A parameter vector or system setting was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Parameter vectors hold exactly 32 slots (26 for legacy imports).
    #[error("parameter vector must have 32 values (or 26 for a legacy import), got {0}")]
    Arity(usize),
    /// A system setting or parameter value is outside its supported range.
    #[error("{name} = {value} is outside the supported range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// No parameter answers to this name.
    #[error("unknown parameter '{0}'")]
    UnknownAlias(String),
    /// A grouped setter was handed a parameter from another group.
    #[error("parameter {param} is not part of the {group} group")]
    WrongGroup {
        param: &'static str,
        group: &'static str,
    },
    /// Failed to read a settings file.
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse a settings file.
    #[error("failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// A compute or render resource could not be brought up.
#[derive(Debug, Error)]
pub enum ResourceInitError {
    /// The worker pool for parallel updates could not be built.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// A grid was requested with no cells.
    #[error("{what} needs at least one cell per side")]
    ZeroSize { what: &'static str },
    /// Field or agent storage could not be allocated.
    #[error("failed to allocate {what} ({len} elements)")]
    Allocation { what: &'static str, len: usize },
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; ensure your system has Vulkan, Metal or DX12 support")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The surface reports no usable texture format or alpha mode.
    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,
}

/// Errors raised by a preset repository.
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset '{0}' not found")]
    NotFound(String),
    #[error("preset '{0}' is a built-in preset and cannot be deleted")]
    DefaultUndeletable(String),
    #[error("invalid preset import: {0}")]
    InvalidImport(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("preset store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("preset store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while saving or restoring the last session state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors that can occur when running the interactive viewer.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Failed to create event loop.
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// A compute or GPU resource failed to initialize.
    #[error(transparent)]
    Resource(#[from] ResourceInitError),
    /// Settings were rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Writing a snapshot failed.
    #[error("failed to write snapshot: {0}")]
    Image(#[from] image::ImageError),
}
