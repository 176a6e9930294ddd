//! The 32-slot parameter vector and its static slot table.
//!
//! Every tunable constant of the simulation and of the compositor lives in a
//! [`ParameterVector`]. Slots are addressed by [`ParamId`]; the derive on that
//! enum generates the index, naming and range tables, so the enum below is
//! the single place the layout is defined.
//!
//! Sensing and movement quantities come in triples evaluated as
//!
//! ```text
//! value = base + multiplier * sensed^exponent
//! ```
//!
//! and the slots of each triple are stored in that order: base, exponent,
//! multiplier.
//!
//! # Aliases
//!
//! [`ParamId::lookup`] resolves the camelCase name of a slot, its legacy
//! names, `paramN` for every slot and `pN` for the first twenty slots.

use std::collections::HashMap;
use std::f32::consts::{PI, TAU};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use physarum_derive::ParamTable;

/// Number of slots in a [`ParameterVector`].
pub const PARAM_COUNT: usize = 32;

/// Number of slots in the legacy preset layout.
pub const LEGACY_PARAM_COUNT: usize = 26;

/// Semantic group of a parameter, used to lay out control panels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamGroup {
    Sensing,
    Movement,
    Trail,
    Visual,
    Color,
    Advanced,
}

impl ParamGroup {
    /// All groups in panel order.
    pub const ALL: [ParamGroup; 6] = [
        ParamGroup::Sensing,
        ParamGroup::Movement,
        ParamGroup::Trail,
        ParamGroup::Visual,
        ParamGroup::Color,
        ParamGroup::Advanced,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamGroup::Sensing => "sensing",
            ParamGroup::Movement => "movement",
            ParamGroup::Trail => "trail",
            ParamGroup::Visual => "visual",
            ParamGroup::Color => "color",
            ParamGroup::Advanced => "advanced",
        }
    }

    /// Parameters belonging to this group, in slot order.
    pub fn members(self) -> impl Iterator<Item = ParamId> {
        ParamId::ALL.into_iter().filter(move |id| id.spec().group == self)
    }
}

impl fmt::Display for ParamGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a slot blends between two parameter vectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterpLaw {
    /// `(1 - t) * a + t * b`
    Linear,
    /// `a^(1 - t) * b^t`, linear when either endpoint is not positive.
    Geometric,
    /// Geometric with `t^10` in place of `t`.
    EasedGeometric,
}

/// Control kind a slot is edited with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamInput {
    Slider,
    Switch,
}

/// Static metadata for one slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamSpec {
    pub id: ParamId,
    pub label: &'static str,
    pub description: &'static str,
    pub group: ParamGroup,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
    /// Largest value a stored vector may hold. Never below `max`.
    pub limit: f32,
    pub law: InterpLaw,
    pub input: ParamInput,
}

impl ParamSpec {
    /// Clamp `value` into this slot's range. Switches snap to 0 or 1.
    pub fn clamp(&self, value: f32) -> f32 {
        match self.input {
            ParamInput::Switch => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ParamInput::Slider => value.clamp(self.min, self.max),
        }
    }

    /// Check a value read from a preset or state file.
    ///
    /// Stored vectors may go past the slider range up to `limit`, but never
    /// below `min` and never to a non-finite value.
    pub fn check(&self, value: f32) -> Result<(), ConfigError> {
        if value.is_finite() && value >= self.min && value <= self.limit {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                name: self.id.name(),
                value: value as f64,
                min: self.min as f64,
                max: self.limit as f64,
            })
        }
    }
}

/// Named slots of the parameter vector.
#[derive(ParamTable, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamId {
    /// How far ahead agents probe the trail.
    #[param(name = "sensorDistanceBase", label = "Sensor Distance Base", group = Sensing,
            min = 0.0, max = 100.0, step = 0.1, default = 3.0)]
    SensorDistanceBase,
    /// Non-linear response of the probe distance to the sensed trail.
    #[param(name = "sensorDistanceExponent", label = "Sensor Distance Exponent", group = Sensing,
            min = 0.0, max = 400.0, step = 0.01, default = 10.17)]
    SensorDistanceExponent,
    /// Scales the probe distance by the sensed trail.
    #[param(name = "sensorDistanceMultiplier", label = "Sensor Distance Multiplier", group = Sensing,
            min = 0.0, max = 2000.0, step = 0.01, default = 0.4, law = Geometric)]
    SensorDistanceMultiplier,
    /// Angle between the forward probe and the side probes.
    #[param(name = "sensorAngleBase", label = "Sensor Angle Base", group = Sensing,
            min = 0.0, max = PI, limit = TAU, step = 0.01, default = 1.03)]
    SensorAngleBase,
    /// Non-linear response of the probe angle to the sensed trail.
    #[param(name = "sensorAngleExponent", label = "Sensor Angle Exponent", group = Sensing,
            min = 0.0, max = 400.0, step = 0.01, default = 2.3)]
    SensorAngleExponent,
    /// Scales the probe angle by the sensed trail.
    #[param(name = "sensorAngleMultiplier", label = "Sensor Angle Multiplier", group = Sensing,
            min = 0.0, max = 200.0, step = 0.01, default = 2.0, law = Geometric)]
    SensorAngleMultiplier,
    /// How much agents turn per step.
    #[param(name = "rotationAngleBase", label = "Rotation Angle Base", group = Movement,
            min = 0.0, max = PI, limit = TAU, step = 0.01, default = 1.42)]
    RotationAngleBase,
    /// Non-linear response of turning to the sensed trail.
    #[param(name = "rotationAngleExponent", label = "Rotation Angle Exponent", group = Movement,
            min = 0.0, max = 400.0, step = 0.01, default = 20.0)]
    RotationAngleExponent,
    /// Scales turning by the sensed trail.
    #[param(name = "rotationAngleMultiplier", label = "Rotation Angle Multiplier", group = Movement,
            min = 0.0, max = 200.0, step = 0.01, default = 0.75, law = Geometric)]
    RotationAngleMultiplier,
    /// How far agents move per step.
    #[param(name = "moveDistanceBase", label = "Move Distance Base", group = Movement,
            min = 0.0, max = 20.0, step = 0.01, default = 0.83)]
    MoveDistanceBase,
    /// Non-linear response of movement to the sensed trail.
    #[param(name = "moveDistanceExponent", label = "Move Distance Exponent", group = Movement,
            min = 0.0, max = 400.0, step = 0.01, default = 1.56)]
    MoveDistanceExponent,
    /// Scales movement by the sensed trail.
    #[param(name = "moveDistanceMultiplier", label = "Move Distance Multiplier", group = Movement,
            min = 0.0, max = 200.0, step = 0.01, default = 0.11, law = Geometric)]
    MoveDistanceMultiplier,
    /// Vertical offset of the point where the trail under an agent is read.
    #[param(name = "positionOffsetY", label = "Position Offset Y", group = Advanced,
            min = -20.0, max = 20.0, step = 0.01, default = 1.07)]
    PositionOffsetY,
    /// Forward offset of the point where the trail under an agent is read.
    #[param(name = "positionOffsetHeading", label = "Position Offset Heading", group = Advanced,
            min = -20.0, max = 20.0, step = 0.01, default = 0.0)]
    PositionOffsetHeading,
    /// Strength of each agent's deposit.
    #[param(name = "trailSenseScale", label = "Trail Sense Scale", group = Trail,
            min = 0.0, max = 2.0, step = 0.01, default = 0.2)]
    TrailSenseScale,
    /// Fraction of the trail kept per diffusion pass.
    #[param(name = "decayFactor", label = "Decay Factor", group = Trail,
            min = 0.5, max = 0.999, step = 0.001, default = 0.951)]
    DecayFactor,
    /// Diffusion passes per frame; decay is applied once per pass.
    #[param(name = "blurIterations", label = "Blur Iterations", group = Trail,
            min = 0.0, max = 20.0, step = 1.0, default = 10.0)]
    BlurIterations,
    /// Opacity of agent points on the display.
    #[param(name = "drawOpacity", label = "Draw Opacity", group = Visual,
            min = 0.0, max = 1.0, step = 0.001, default = 0.15)]
    DrawOpacity,
    /// How quickly the display fades to black.
    #[param(name = "fillOpacity", label = "Fill Opacity", group = Visual,
            min = 0.0, max = 1.0, step = 0.001, default = 0.248)]
    FillOpacity,
    /// How much trail each agent deposits.
    #[param(name = "depositAmount", label = "Deposit Amount", group = Trail,
            min = 0.0, max = 50.0, step = 0.1, default = 16.0, law = EasedGeometric)]
    DepositAmount,
    #[param(name = "hueBase", label = "Hue Base", group = Color,
            min = 0.0, max = 1.0, step = 0.01, default = 0.3)]
    HueBase,
    #[param(name = "hueMultiplier", label = "Hue Multiplier", group = Color,
            min = 0.0, max = 2.0, step = 0.01, default = 1.5)]
    HueMultiplier,
    #[param(name = "saturationBase", label = "Saturation Base", group = Color,
            min = 0.0, max = 1.0, step = 0.01, default = 0.85)]
    SaturationBase,
    #[param(name = "saturationMultiplier", label = "Saturation Multiplier", group = Color,
            min = 0.0, max = 2.0, step = 0.01, default = 0.35)]
    SaturationMultiplier,
    #[param(name = "lightnessBase", label = "Lightness Base", group = Color,
            min = 0.0, max = 1.0, step = 0.01, default = 0.6)]
    LightnessBase,
    #[param(name = "lightnessMultiplier", label = "Lightness Multiplier", group = Color,
            min = 0.0, max = 2.0, step = 0.01, default = 0.0)]
    LightnessMultiplier,
    #[param(name = "contrastBase", label = "Contrast Base", group = Color,
            min = 0.0, max = 2.0, step = 0.01, default = 1.0)]
    ContrastBase,
    #[param(name = "contrastMultiplier", label = "Contrast Multiplier", group = Color,
            min = 0.0, max = 2.0, step = 0.01, default = 0.0)]
    ContrastMultiplier,
    /// Radial colour fringing strength.
    #[param(name = "chromaticAberrationStrength", label = "Chromatic Aberration Strength",
            group = Color, min = 0.0, max = 0.05, step = 0.001, default = 0.0)]
    ChromaticAberrationStrength,
    #[param(name = "chromaticAberrationOffset", label = "Chromatic Aberration Offset",
            group = Color, min = 0.0, max = 0.5, step = 0.01, default = 0.0)]
    ChromaticAberrationOffset,
    /// Agent point size in display pixels.
    #[param(name = "pointSize", label = "Draw Point Size", group = Visual,
            min = 0.01, max = 5.0, step = 0.01, default = 1.0, legacy = "drawPointsize")]
    PointSize,
    #[param(name = "invert", label = "Invert", group = Visual,
            min = 0.0, max = 1.0, step = 1.0, default = 0.0, switch)]
    Invert,
}

fn alias_table() -> &'static HashMap<String, ParamId> {
    static TABLE: OnceLock<HashMap<String, ParamId>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = HashMap::new();
        for id in ParamId::ALL {
            let index = id.index();
            table.insert(id.name().to_string(), id);
            table.insert(format!("param{index}"), id);
            if index < 20 {
                table.insert(format!("p{index}"), id);
            }
            for legacy in id.legacy_names() {
                table.insert((*legacy).to_string(), id);
            }
        }
        table
    })
}

impl ParamId {
    /// Resolve a parameter by any of its names.
    pub fn lookup(alias: &str) -> Option<ParamId> {
        alias_table().get(alias).copied()
    }
}

impl FromStr for ParamId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamId::lookup(s).ok_or_else(|| ConfigError::UnknownAlias(s.to_string()))
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All tunable constants of one simulation configuration.
///
/// Serialized as a plain array. Deserializing accepts the 26-slot legacy
/// layout and fills the trailing slots with their defaults.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct ParameterVector([f32; PARAM_COUNT]);

impl ParameterVector {
    pub const fn new(values: [f32; PARAM_COUNT]) -> Self {
        Self(values)
    }

    /// Build a vector from a slice of 32 values, or 26 legacy values.
    ///
    /// Every slot must pass [`ParamSpec::check`].
    pub fn from_slice(values: &[f32]) -> Result<Self, ConfigError> {
        let out = match values.len() {
            PARAM_COUNT => {
                let mut out = [0.0; PARAM_COUNT];
                out.copy_from_slice(values);
                Self(out)
            }
            LEGACY_PARAM_COUNT => {
                let mut legacy = [0.0; LEGACY_PARAM_COUNT];
                legacy.copy_from_slice(values);
                Self::from_legacy(&legacy)
            }
            n => return Err(ConfigError::Arity(n)),
        };
        out.validate()?;
        Ok(out)
    }

    /// Reject the vector if any slot is non-finite, below its minimum or
    /// above its limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.iter().try_for_each(|(id, value)| id.spec().check(value))
    }

    /// Expand a 26-slot legacy vector; the trailing slots take their defaults.
    pub fn from_legacy(values: &[f32; LEGACY_PARAM_COUNT]) -> Self {
        let mut out = Self::default();
        out.0[..LEGACY_PARAM_COUNT].copy_from_slice(values);
        for id in &ParamId::ALL[LEGACY_PARAM_COUNT..] {
            out.0[id.index()] = id.spec().default;
        }
        out
    }

    pub fn get(&self, id: ParamId) -> f32 {
        self.0[id.index()]
    }

    pub fn set(&mut self, id: ParamId, value: f32) {
        self.0[id.index()] = value;
    }

    /// Builder-style setter.
    pub fn with(mut self, id: ParamId, value: f32) -> Self {
        self.set(id, value);
        self
    }

    pub fn as_array(&self) -> &[f32; PARAM_COUNT] {
        &self.0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, f32)> + '_ {
        ParamId::ALL.iter().map(move |&id| (id, self.0[id.index()]))
    }

    /// Diffusion passes per frame, rounded to the nearest integer.
    pub fn blur_passes(&self) -> u32 {
        let blur = self.get(ParamId::BlurIterations);
        if blur.is_finite() && blur > 0.0 {
            blur.round() as u32
        } else {
            0
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.get(ParamId::Invert) >= 0.5
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Element-wise linear blend, used for preset mixing.
    pub fn lerp(&self, other: &ParameterVector, amount: f32) -> ParameterVector {
        let mut out = [0.0; PARAM_COUNT];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.0[i] + (other.0[i] - self.0[i]) * amount;
        }
        ParameterVector(out)
    }
}

impl Default for ParameterVector {
    fn default() -> Self {
        let mut out = [0.0; PARAM_COUNT];
        for id in ParamId::ALL {
            out[id.index()] = id.spec().default;
        }
        ParameterVector(out)
    }
}

impl Index<ParamId> for ParameterVector {
    type Output = f32;

    fn index(&self, id: ParamId) -> &f32 {
        &self.0[id.index()]
    }
}

impl IndexMut<ParamId> for ParameterVector {
    fn index_mut(&mut self, id: ParamId) -> &mut f32 {
        &mut self.0[id.index()]
    }
}

impl TryFrom<Vec<f32>> for ParameterVector {
    type Error = ConfigError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        ParameterVector::from_slice(&values)
    }
}

impl From<ParameterVector> for Vec<f32> {
    fn from(params: ParameterVector) -> Vec<f32> {
        params.0.to_vec()
    }
}

impl From<[f32; PARAM_COUNT]> for ParameterVector {
    fn from(values: [f32; PARAM_COUNT]) -> Self {
        ParameterVector(values)
    }
}
