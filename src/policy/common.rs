//! Building blocks shared by all three policies

use std::fmt;

use rand::distr::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{LayerRef, ModelAccess, Parameters};
use crate::tensor::{map_elements, mutate_flat, Tensor};

/// Number of epochs a policy stays active
///
/// Serialized as an integer where `-1` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Cutoff {
    #[default]
    Unbounded,
    Epochs(usize),
}

impl Cutoff {
    /// Whether mutation runs after `epochs_completed` prior calls
    pub fn allows(self, epochs_completed: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Epochs(n) => epochs_completed < n,
        }
    }
}

impl TryFrom<i64> for Cutoff {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(Self::Unbounded),
            n if n >= 0 => Ok(Self::Epochs(n as usize)),
            n => Err(Error::InvalidConfig(format!("cutoff ({n}) must be -1 or non-negative"))),
        }
    }
}

impl From<Cutoff> for i64 {
    fn from(cutoff: Cutoff) -> Self {
        match cutoff {
            Cutoff::Unbounded => -1,
            Cutoff::Epochs(n) => n as i64,
        }
    }
}

/// Source of replacement values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Replacement {
    Fixed(f32),
    /// Uniform draw from an inclusive range
    Uniform(Uniform<f32>),
}

impl Replacement {
    /// `set_value` wins over the random range when present.
    ///
    /// Fails if the range cannot be sampled.
    pub fn from_options(set_value: Option<f32>, low: f32, high: f32) -> Result<Self> {
        match set_value {
            Some(v) => Ok(Self::Fixed(v)),
            None => uniform("low_bound", low, "high_bound", high).map(Self::Uniform),
        }
    }

    pub fn draw<R: Rng>(&self, rng: &mut R) -> f32 {
        match self {
            Self::Fixed(v) => *v,
            Self::Uniform(dist) => dist.sample(rng),
        }
    }
}

/// Build the sampler for `[low, high]`.
///
/// Rejects inverted ranges and spans that overflow `f32`.
pub(crate) fn uniform(
    low_name: &str,
    low: f32,
    high_name: &str,
    high: f32,
) -> Result<Uniform<f32>> {
    ensure_range(low_name, low, high_name, high)?;
    Uniform::new_inclusive(low, high).map_err(|e| {
        Error::InvalidConfig(format!("[{low_name}, {high_name}] = [{low}, {high}]: {e}"))
    })
}

/// Which tensor of a layer is being mutated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TensorKind {
    Weights,
    Biases,
}

impl fmt::Display for TensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weights => write!(f, "weights"),
            Self::Biases => write!(f, "biases"),
        }
    }
}

/// Epoch counter plus cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EpochGate {
    cutoff: Cutoff,
    epochs_completed: usize,
}

impl EpochGate {
    pub fn new(cutoff: Cutoff) -> Self {
        Self { cutoff, epochs_completed: 0 }
    }

    pub fn is_open(&self) -> bool {
        self.cutoff.allows(self.epochs_completed)
    }

    pub fn advance(&mut self) {
        self.epochs_completed += 1;
    }

    pub fn epochs_completed(&self) -> usize {
        self.epochs_completed
    }
}

pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

pub(crate) fn ensure_finite(name: &str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("{name} ({value}) must be finite")))
    }
}

/// Check `low <= high`, both finite
pub(crate) fn ensure_range(low_name: &str, low: f32, high_name: &str, high: f32) -> Result<()> {
    ensure_finite(low_name, low)?;
    ensure_finite(high_name, high)?;
    if low > high {
        return Err(Error::InvalidConfig(format!(
            "{low_name} ({low}) must not exceed {high_name} ({high})"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_non_empty_layers(layers: &[LayerRef]) -> Result<()> {
    if layers.is_empty() {
        return Err(Error::InvalidConfig("layers must name at least one layer".to_string()));
    }
    Ok(())
}

/// Replace every element in `[min, max]` with `next()`.
///
/// Returns the mutated tensor and the number of replaced elements.
pub(crate) fn replace_in_band<F>(
    tensor: &Tensor,
    min: f32,
    max: f32,
    mut next: F,
) -> Result<(Tensor, usize)>
where
    F: FnMut() -> f32,
{
    let mut replaced = 0;
    let out = map_elements(tensor, |v| {
        if min <= v && v <= max {
            replaced += 1;
            next()
        } else {
            v
        }
    })?;
    Ok((out, replaced))
}

/// Overwrite `floor(len * ratio)` uniformly chosen positions, with replacement.
///
/// Returns the mutated tensor and the number of overwrites performed.
pub(crate) fn strike<R: Rng>(
    tensor: &Tensor,
    ratio: f64,
    replacement: &Replacement,
    rng: &mut R,
) -> Result<(Tensor, usize)> {
    let strikes = (tensor.len() as f64 * ratio) as usize;
    let out = mutate_flat(tensor, |flat| {
        for _ in 0..strikes {
            let i = rng.random_range(0..flat.len());
            flat[i] = replacement.draw(rng);
        }
    })?;
    Ok((out, strikes))
}

/// Tensors a policy is allowed to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Targets {
    pub weights: bool,
    pub biases: bool,
}

/// Read, mutate, and commit the targeted tensors of each layer.
///
/// Absent or empty tensors are skipped, as is any tensor whose `mutate`
/// call fails (logged at `warn`); the other tensor of the layer is still
/// committed. Host commit errors propagate.
pub(crate) fn mutate_layers<F>(
    policy: &'static str,
    model: &mut dyn ModelAccess,
    layers: &[LayerRef],
    targets: Targets,
    mut mutate: F,
) -> Result<usize>
where
    F: FnMut(&Tensor) -> Result<(Tensor, usize)>,
{
    let mut total = 0;
    for layer in layers {
        let mut params = Parameters::default();

        if targets.weights {
            if let Some((t, n)) =
                mutate_tensor(policy, layer, TensorKind::Weights, model.weights(layer), &mut mutate)
            {
                params.weights = Some(t);
                total += n;
            }
        }
        if targets.biases {
            if let Some((t, n)) =
                mutate_tensor(policy, layer, TensorKind::Biases, model.biases(layer), &mut mutate)
            {
                params.biases = Some(t);
                total += n;
            }
        }

        if !params.is_empty() {
            model.set_parameters(layer, params)?;
        }
    }
    Ok(total)
}

fn mutate_tensor<F>(
    policy: &'static str,
    layer: &LayerRef,
    kind: TensorKind,
    tensor: Option<Tensor>,
    mutate: &mut F,
) -> Option<(Tensor, usize)>
where
    F: FnMut(&Tensor) -> Result<(Tensor, usize)>,
{
    let Some(tensor) = tensor else {
        debug!(policy, %layer, %kind, "tensor absent, skipping");
        return None;
    };
    if tensor.is_empty() {
        return None;
    }
    match mutate(&tensor) {
        Ok((out, n)) => {
            debug!(policy, %layer, %kind, elements = tensor.len(), mutated = n, "tensor mutated");
            Some((out, n))
        }
        Err(e) => {
            warn!(policy, %layer, %kind, error = %e, "tensor skipped");
            None
        }
    }
}
