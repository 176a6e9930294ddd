//! Data-parallel execution of the per-agent and per-cell phases.
//!
//! Both the agent update and a diffusion pass compute every output element
//! from a read-only snapshot, never from a sibling's new value. The two
//! traits here capture exactly that shape, and [`Executor`] realizes them on
//! rayon or on the calling thread.

use std::sync::Arc;

use rayon::prelude::*;

use crate::error::ResourceInitError;

/// Element-wise map from one slice into another of the same length.
pub trait ParallelMap {
    /// Set `output[i] = f(i, &input[i])` for every `i`.
    ///
    /// # Panics
    ///
    /// Panics if the slices differ in length.
    fn map_into<T, U, F>(&self, input: &[T], output: &mut [U], f: F)
    where
        T: Sync,
        U: Send,
        F: Fn(usize, &T) -> U + Sync + Send;
}

/// Grid fill where each cell is computed independently.
pub trait ParallelStencil {
    /// Set every cell of the row-major `output` grid (`width` columns) to
    /// `f(x, y)`.
    fn fill_grid<F>(&self, width: usize, output: &mut [f32], f: F)
    where
        F: Fn(usize, usize) -> f32 + Sync + Send;
}

/// Where the parallel phases run.
#[derive(Clone, Debug, Default)]
pub enum Executor {
    /// Calling thread only.
    Serial,
    /// The global rayon pool.
    #[default]
    Global,
    /// A dedicated rayon pool.
    Pool(Arc<rayon::ThreadPool>),
}

impl Executor {
    /// Build an executor with a dedicated pool of `threads` workers.
    ///
    /// `Some(1)` runs serially; `None` uses the global pool.
    pub fn with_threads(threads: Option<usize>) -> Result<Self, ResourceInitError> {
        match threads {
            None => Ok(Executor::Global),
            Some(0) | Some(1) => Ok(Executor::Serial),
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("physarum-worker-{i}"))
                    .build()?;
                Ok(Executor::Pool(Arc::new(pool)))
            }
        }
    }

    /// Number of worker threads this executor spreads work over.
    pub fn threads(&self) -> usize {
        match self {
            Executor::Serial => 1,
            Executor::Global => rayon::current_num_threads(),
            Executor::Pool(pool) => pool.current_num_threads(),
        }
    }

    fn run<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match self {
            Executor::Pool(pool) => pool.install(op),
            _ => op(),
        }
    }
}

impl ParallelMap for Executor {
    fn map_into<T, U, F>(&self, input: &[T], output: &mut [U], f: F)
    where
        T: Sync,
        U: Send,
        F: Fn(usize, &T) -> U + Sync + Send,
    {
        assert_eq!(input.len(), output.len(), "map_into needs equal lengths");
        match self {
            Executor::Serial => {
                for (i, (out, item)) in output.iter_mut().zip(input).enumerate() {
                    *out = f(i, item);
                }
            }
            _ => self.run(|| {
                output
                    .par_iter_mut()
                    .zip(input.par_iter())
                    .enumerate()
                    .for_each(|(i, (out, item))| *out = f(i, item));
            }),
        }
    }
}

impl ParallelStencil for Executor {
    fn fill_grid<F>(&self, width: usize, output: &mut [f32], f: F)
    where
        F: Fn(usize, usize) -> f32 + Sync + Send,
    {
        if width == 0 {
            return;
        }
        match self {
            Executor::Serial => {
                for (y, row) in output.chunks_mut(width).enumerate() {
                    for (x, cell) in row.iter_mut().enumerate() {
                        *cell = f(x, y);
                    }
                }
            }
            _ => self.run(|| {
                output
                    .par_chunks_mut(width)
                    .enumerate()
                    .for_each(|(y, row)| {
                        for (x, cell) in row.iter_mut().enumerate() {
                            *cell = f(x, y);
                        }
                    });
            }),
        }
    }
}
