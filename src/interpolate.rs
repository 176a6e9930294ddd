//! Smooth transitions between parameter vectors.
//!
//! A [`PresetInterpolator`] holds the vector a transition starts from
//! (`past`), the vector it heads to (`target`) and the progress `t`. Each
//! frame [`advance`](PresetInterpolator::advance) moves `t` toward 1 under the
//! configured [`Convergence`] law and returns the blended vector. Every slot
//! blends by its own [`InterpLaw`].

use serde::{Deserialize, Serialize};

use crate::params::{InterpLaw, ParamId, ParameterVector, PARAM_COUNT};

/// Exponent applied to `t` for eased-geometric slots.
pub const EASE_POWER: i32 = 10;

/// Default minimum step of the eased convergence law.
pub const DEFAULT_EASED_FLOOR: f32 = 0.001;

/// How the transition progress advances each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "law", rename_all = "snake_case")]
pub enum Convergence {
    /// `t += rate`
    #[default]
    Linear,
    /// `t += max((1 - t) * rate, floor)`
    Eased { floor: f32 },
}

impl Convergence {
    /// Eased convergence with the default floor.
    pub fn eased() -> Self {
        Convergence::Eased {
            floor: DEFAULT_EASED_FLOOR,
        }
    }

    /// Progress after one frame, clamped to `[0, 1]`.
    pub fn step(self, t: f32, rate: f32) -> f32 {
        let next = match self {
            Convergence::Linear => t + rate,
            Convergence::Eased { floor } => t + ((1.0 - t) * rate).max(floor),
        };
        next.clamp(0.0, 1.0)
    }
}

/// Blend one slot value under `law`.
pub fn blend(law: InterpLaw, a: f32, b: f32, t: f32) -> f32 {
    match law {
        InterpLaw::Linear => linear(a, b, t),
        InterpLaw::Geometric => geometric(a, b, t),
        InterpLaw::EasedGeometric => geometric(a, b, t.powi(EASE_POWER)),
    }
}

#[inline]
fn linear(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

#[inline]
fn geometric(a: f32, b: f32, t: f32) -> f32 {
    if a <= 0.0 || b <= 0.0 {
        return linear(a, b, t);
    }
    if t <= 0.0 {
        return a;
    }
    if t >= 1.0 {
        return b;
    }
    a.powf(1.0 - t) * b.powf(t)
}

/// Blend two whole vectors slot by slot.
pub fn lerp_params(past: &ParameterVector, target: &ParameterVector, t: f32) -> ParameterVector {
    let mut out = [0.0; PARAM_COUNT];
    for id in ParamId::ALL {
        let i = id.index();
        out[i] = blend(id.spec().law, past.get(id), target.get(id), t);
    }
    ParameterVector::new(out)
}

/// Transition state between two parameter vectors.
#[derive(Clone, Debug, PartialEq)]
pub struct PresetInterpolator {
    past: ParameterVector,
    target: ParameterVector,
    lerped: ParameterVector,
    t: f32,
    rate: f32,
    convergence: Convergence,
}

impl PresetInterpolator {
    /// Interpolator resting on `params`.
    pub fn new(params: ParameterVector, rate: f32, convergence: Convergence) -> Self {
        Self {
            past: params,
            target: params,
            lerped: params,
            t: 1.0,
            rate,
            convergence,
        }
    }

    pub fn progress(&self) -> f32 {
        self.t
    }

    /// True while `t < 1`.
    pub fn is_interpolating(&self) -> bool {
        self.t < 1.0
    }

    pub fn past(&self) -> &ParameterVector {
        &self.past
    }

    pub fn target(&self) -> &ParameterVector {
        &self.target
    }

    /// The blended vector as of the last [`advance`](Self::advance).
    pub fn current(&self) -> &ParameterVector {
        &self.lerped
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    pub fn convergence(&self) -> Convergence {
        self.convergence
    }

    pub fn set_convergence(&mut self, convergence: Convergence) {
        self.convergence = convergence;
    }

    /// Advance `t` by one frame and recompute the blended vector.
    pub fn advance(&mut self) -> &ParameterVector {
        if self.is_interpolating() {
            self.t = self.convergence.step(self.t, self.rate);
            self.lerped = lerp_params(&self.past, &self.target, self.t);
        }
        &self.lerped
    }

    /// Start a transition toward `target` from wherever the blend is now.
    pub fn switch_to(&mut self, target: ParameterVector) {
        self.past = self.lerped;
        self.target = target;
        self.t = 0.0;
    }

    /// Jump straight to `params` with no transition.
    pub fn set_immediate(&mut self, params: ParameterVector) {
        self.past = params;
        self.target = params;
        self.lerped = params;
        self.t = 1.0;
    }

    /// Stop the transition where it is.
    pub fn freeze(&mut self) {
        self.past = self.lerped;
        self.target = self.lerped;
        self.t = 1.0;
    }

    /// Overwrite one slot in the target, past and blended vectors alike.
    pub fn edit(&mut self, id: ParamId, value: f32) {
        self.past.set(id, value);
        self.target.set(id, value);
        self.lerped.set(id, value);
    }
}
