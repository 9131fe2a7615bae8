//! Stroke: re-initialize a random fraction of weights every epoch
//!
//! Unlike NeuroPlast and Pruning, selection ignores the current value.
//! `floor(len * volatility_ratio)` flat indices are drawn uniformly with
//! replacement and overwritten, so the number of distinct elements hit can
//! be lower than the number of strikes. The ratio may decay each epoch.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::common::{
    ensure_finite, ensure_non_empty_layers, make_rng, mutate_layers, strike, uniform, Cutoff,
    EpochGate, Replacement, Targets,
};
use crate::callback::{CallbackContext, TrainingPolicy};
use crate::error::{Error, Result};
use crate::model::{LayerRef, ModelAccess};
use crate::tensor::Tensor;

/// Decay never moves the volatility ratio to or below this value.
pub const MIN_VOLATILITY: f64 = 0.01;

/// Decay never moves the volatility ratio to or above this value.
pub const MAX_VOLATILITY: f64 = 1.0;

/// Configuration for [`Stroke`].
///
/// # Example
///
/// ```
/// use entrenar_stroke::policy::{Stroke, StrokeConfig};
///
/// let stroke = Stroke::new(StrokeConfig::default().with_volatility_ratio(0.1).with_decay(0.9))?;
/// assert_eq!(stroke.volatility_ratio(), 0.1);
///
/// assert!(Stroke::new(StrokeConfig::default().with_volatility_ratio(1.0)).is_err());
/// # Ok::<(), entrenar_stroke::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    /// Fixed replacement value; random when unset
    #[serde(alias = "set_value")]
    pub value: Option<f32>,
    pub low_bound: f32,
    pub high_bound: f32,
    /// Fraction of elements struck per epoch, in `[0.0, 1.0)`
    pub volatility_ratio: f64,
    pub cutoff: Cutoff,
    /// Per-epoch multiplier for the volatility ratio
    pub decay: Option<f64>,
    pub do_weights: bool,
    pub do_biases: bool,
    #[serde(alias = "indices")]
    pub layers: Vec<LayerRef>,
    pub seed: Option<u64>,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            value: None,
            low_bound: -0.05,
            high_bound: 0.05,
            volatility_ratio: 0.05,
            cutoff: Cutoff::Unbounded,
            decay: None,
            do_weights: true,
            do_biases: false,
            layers: vec![LayerRef::Model],
            seed: None,
        }
    }
}

impl StrokeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: f32) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_bounds(mut self, low_bound: f32, high_bound: f32) -> Self {
        self.low_bound = low_bound;
        self.high_bound = high_bound;
        self
    }

    pub fn with_volatility_ratio(mut self, ratio: f64) -> Self {
        self.volatility_ratio = ratio;
        self
    }

    pub fn with_cutoff(mut self, cutoff: Cutoff) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = Some(decay);
        self
    }

    pub fn with_weights(mut self, enabled: bool) -> Self {
        self.do_weights = enabled;
        self
    }

    pub fn with_biases(mut self, enabled: bool) -> Self {
        self.do_biases = enabled;
        self
    }

    pub fn with_layers(mut self, layers: Vec<LayerRef>) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn replacement(&self) -> Result<Replacement> {
        Replacement::from_options(self.value, self.low_bound, self.high_bound)
    }

    /// Validate the configuration.
    ///
    /// The ratio is rejected, never clamped.
    pub fn validate(&self) -> Result<()> {
        let ratio = self.volatility_ratio;
        if !(0.0..MAX_VOLATILITY).contains(&ratio) {
            return Err(Error::InvalidConfig(format!(
                "volatility_ratio ({ratio}) must be in [0.0, 1.0)"
            )));
        }
        if let Some(decay) = self.decay {
            if !decay.is_finite() || decay <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "decay ({decay}) must be finite and positive"
                )));
            }
        }
        uniform("low_bound", self.low_bound, "high_bound", self.high_bound)?;
        if let Some(v) = self.value {
            ensure_finite("value", v)?;
        }
        ensure_non_empty_layers(&self.layers)
    }
}

/// Epoch-end policy that re-initializes a random fraction of weights.
#[derive(Debug)]
pub struct Stroke {
    config: StrokeConfig,
    replacement: Replacement,
    gate: EpochGate,
    rng: StdRng,
    v_ratio: f64,
    elements_struck: usize,
    last_epoch_strikes: usize,
}

impl Stroke {
    pub fn new(config: StrokeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            replacement: config.replacement()?,
            gate: EpochGate::new(config.cutoff),
            rng: make_rng(config.seed),
            v_ratio: config.volatility_ratio,
            config,
            elements_struck: 0,
            last_epoch_strikes: 0,
        })
    }

    pub fn config(&self) -> &StrokeConfig {
        &self.config
    }

    /// Current (possibly decayed) volatility ratio.
    pub fn volatility_ratio(&self) -> f64 {
        self.v_ratio
    }

    /// Total strikes performed over the run.
    pub fn elements_struck(&self) -> usize {
        self.elements_struck
    }

    /// Strikes performed by the most recent epoch-end call.
    pub fn last_epoch_strikes(&self) -> usize {
        self.last_epoch_strikes
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_open()
    }

    /// Strike a single tensor at the current ratio.
    pub fn apply(&mut self, tensor: &Tensor) -> Result<(Tensor, usize)> {
        strike(tensor, self.v_ratio, &self.replacement, &mut self.rng)
    }

    /// Multiply the ratio by `decay` unless that leaves `(0.01, 1.0)`.
    fn decay_ratio(&mut self) {
        let Some(decay) = self.config.decay else {
            return;
        };
        let next = self.v_ratio * decay;
        if next > MIN_VOLATILITY && next < MAX_VOLATILITY {
            trace!(from = self.v_ratio, to = next, "volatility ratio decayed");
            self.v_ratio = next;
        }
    }
}

impl TrainingPolicy for Stroke {
    fn on_epoch_end(&mut self, ctx: &CallbackContext, model: &mut dyn ModelAccess) -> Result<()> {
        self.last_epoch_strikes = 0;
        let struck = if self.gate.is_open() {
            let name = self.name();
            let ratio = self.v_ratio;
            let replacement = self.replacement;
            let rng = &mut self.rng;
            let targets =
                Targets { weights: self.config.do_weights, biases: self.config.do_biases };
            mutate_layers(name, model, &self.config.layers, targets, |t| {
                strike(t, ratio, &replacement, rng)
            })
        } else {
            debug!(epoch = ctx.epoch, "Stroke past cutoff, skipping");
            Ok(0)
        };
        self.gate.advance();
        self.decay_ratio();

        self.last_epoch_strikes = struck?;
        self.elements_struck += self.last_epoch_strikes;
        Ok(())
    }

    fn epochs_completed(&self) -> usize {
        self.gate.epochs_completed()
    }

    fn name(&self) -> &'static str {
        "Stroke"
    }
}
