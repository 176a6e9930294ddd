//! The toroidal trail field.
//!
//! Agents read the trail to steer and write into it as they move. The field is
//! an `N×N` grid of scalar intensities with periodic boundaries: every lookup
//! wraps modulo `N`, so opposite edges are neighbours.
//!
//! # Per-frame phases
//!
//! - **Deposit**: every agent splats its contribution bilinearly into the four
//!   cells around it. Each share `m` is blended over the cell as
//!   `c + (1 - c) * (1 - e^-m)`, so the cell approaches [`FIELD_CEILING`]
//!   without reaching it and stays additive for small shares. The blend is a
//!   product in `1 - c`, so agent order does not matter.
//! - **Diffuse and decay**: `round(blurIterations)` passes, each replacing a
//!   cell by the mean of its 3×3 neighbourhood times `decayFactor`. Decay only
//!   happens inside a pass, so zero passes leave the field untouched.
//!
//! Both phases read [`DoubleBuffer::current`] and write
//! [`DoubleBuffer::next`], then swap.
//!
//! # Coordinates
//!
//! Agents live in `[-1, 1)²`. The field is addressed in texture space
//! `[0, 1)²` with cell centres at `(i + 0.5) / N`, the same convention as a
//! linearly filtered, repeating texture.

use glam::Vec2;

use crate::agent::Agent;
use crate::buffer::DoubleBuffer;
use crate::error::ResourceInitError;
use crate::parallel::ParallelStencil;
use crate::params::{ParamId, ParameterVector};

/// Value a trail cell approaches under repeated deposits.
pub const FIELD_CEILING: f32 = 1.0;

/// Square toroidal grid of trail intensities, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldBuffer {
    size: usize,
    cells: Vec<f32>,
}

impl FieldBuffer {
    /// Zeroed `size × size` field.
    ///
    /// Allocation failure is reported instead of aborting so a resize can
    /// fall back to the buffers already running.
    pub fn try_new(size: usize) -> Result<Self, ResourceInitError> {
        if size == 0 {
            return Err(ResourceInitError::ZeroSize { what: "trail field" });
        }
        let len = size
            .checked_mul(size)
            .ok_or(ResourceInitError::Allocation { what: "trail field", len: usize::MAX })?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| ResourceInitError::Allocation { what: "trail field", len })?;
        cells.resize(len, 0.0);
        Ok(Self { size, cells })
    }

    /// Field built from explicit cell values.
    ///
    /// # Panics
    ///
    /// Panics if `cells.len() != size * size`.
    pub fn from_cells(size: usize, cells: Vec<f32>) -> Self {
        assert_eq!(cells.len(), size * size, "cell count must be size²");
        Self { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [f32] {
        &mut self.cells
    }

    pub fn clear(&mut self) {
        self.cells.fill(0.0);
    }

    /// Total intensity over all cells.
    pub fn sum(&self) -> f64 {
        self.cells.iter().map(|&v| v as f64).sum()
    }

    pub fn max_value(&self) -> f32 {
        self.cells.iter().copied().fold(0.0, f32::max)
    }

    #[inline]
    fn wrap(&self, i: i64) -> usize {
        i.rem_euclid(self.size as i64) as usize
    }

    /// Cell value at integer grid coordinates, wrapped.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> f32 {
        self.cells[self.wrap(y) * self.size + self.wrap(x)]
    }

    /// Bilinear sample in grid units, where cell `(i, j)` is centred on
    /// `(i, j)`. Wraps on both axes. Non-finite coordinates read as zero.
    #[inline]
    pub fn sample_grid(&self, gx: f32, gy: f32) -> f32 {
        if !(gx.is_finite() && gy.is_finite()) {
            return 0.0;
        }
        let n = self.size as f32;
        let (gx, gy) = (gx.rem_euclid(n), gy.rem_euclid(n));
        let x0 = gx.floor();
        let y0 = gy.floor();
        let fx = gx - x0;
        let fy = gy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let a = self.get(x0, y0);
        let b = self.get(x0 + 1, y0);
        let c = self.get(x0, y0 + 1);
        let d = self.get(x0 + 1, y0 + 1);

        let top = a + (b - a) * fx;
        let bottom = c + (d - c) * fx;
        top + (bottom - top) * fy
    }

    /// Bilinear sample at a texture-space coordinate (`[0, 1)` per axis,
    /// wrapped outside it).
    #[inline]
    pub fn sample(&self, uv: Vec2) -> f32 {
        let n = self.size as f32;
        self.sample_grid(uv.x * n - 0.5, uv.y * n - 0.5)
    }
}

/// Texture-space coordinate of an agent position in `[-1, 1)²`.
#[inline]
pub fn to_texture_space(position: Vec2) -> Vec2 {
    position * 0.5 + Vec2::splat(0.5)
}

/// Mass one agent adds to the field this frame.
pub fn deposit_mass(params: &ParameterVector) -> f32 {
    let mass = params.get(ParamId::DepositAmount) * params.get(ParamId::TrailSenseScale);
    if mass.is_finite() {
        mass.max(0.0)
    } else {
        0.0
    }
}

/// Write `src` with every agent's splat blended over it into `dst`.
pub fn deposit_into(src: &FieldBuffer, dst: &mut FieldBuffer, agents: &[Agent], mass: f32) {
    debug_assert_eq!(src.size, dst.size);
    dst.cells.copy_from_slice(&src.cells);
    if mass <= 0.0 {
        return;
    }

    let n = dst.size as f32;
    for agent in agents {
        let uv = to_texture_space(agent.position);
        let gx = uv.x * n - 0.5;
        let gy = uv.y * n - 0.5;
        let x0 = gx.floor();
        let y0 = gy.floor();
        let fx = gx - x0;
        let fy = gy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let splat = [
            (x0, y0, (1.0 - fx) * (1.0 - fy)),
            (x0 + 1, y0, fx * (1.0 - fy)),
            (x0, y0 + 1, (1.0 - fx) * fy),
            (x0 + 1, y0 + 1, fx * fy),
        ];
        for (x, y, w) in splat {
            let idx = dst.wrap(y) * dst.size + dst.wrap(x);
            let cell = &mut dst.cells[idx];
            let alpha = -(-mass * w).exp_m1();
            *cell += (FIELD_CEILING - *cell) * alpha;
        }
    }
}

/// Deposit phase: the splatted field becomes current.
pub fn deposit(field: &mut DoubleBuffer<FieldBuffer>, agents: &[Agent], params: &ParameterVector) {
    let mass = deposit_mass(params);
    let (src, dst) = field.split();
    deposit_into(src, dst, agents, mass);
    field.swap();
}

/// One 3×3 mean-and-decay pass from `src` into `dst`.
pub fn blur_pass<E: ParallelStencil>(exec: &E, src: &FieldBuffer, dst: &mut FieldBuffer, decay: f32) {
    debug_assert_eq!(src.size, dst.size);
    let n = src.size;
    let cells = &src.cells;
    let scale = decay / 9.0;

    exec.fill_grid(n, &mut dst.cells, |x, y| {
        let xm = (x + n - 1) % n;
        let xp = (x + 1) % n;
        let rows = [(y + n - 1) % n, y, (y + 1) % n];
        let mut total = 0.0;
        for row in rows {
            let base = row * n;
            total += cells[base + xm] + cells[base + x] + cells[base + xp];
        }
        total * scale
    });
}

/// Diffusion phase: `round(blurIterations)` ping-pong passes, decay inside
/// each. Returns the number of passes run.
pub fn diffuse_and_decay<E: ParallelStencil>(
    exec: &E,
    field: &mut DoubleBuffer<FieldBuffer>,
    params: &ParameterVector,
) -> u32 {
    let passes = params.blur_passes();
    let decay = params.get(ParamId::DecayFactor);
    for _ in 0..passes {
        let (src, dst) = field.split();
        blur_pass(exec, src, dst, decay);
        field.swap();
    }
    passes
}
