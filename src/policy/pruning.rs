//! Band pruning: collapse small weights to a fixed value
//!
//! Every weight inside `[min_value, max_value]` is overwritten with
//! `set_value` (zero unless configured otherwise), inducing exact sparsity.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::common::{
    ensure_finite, ensure_non_empty_layers, ensure_range, mutate_layers, replace_in_band, Cutoff,
    EpochGate, Targets,
};
use crate::callback::{CallbackContext, TrainingPolicy};
use crate::error::Result;
use crate::model::{LayerRef, ModelAccess};
use crate::tensor::Tensor;

/// Configuration for [`Pruning`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningConfig {
    /// Value pruned weights are set to
    pub set_value: f32,
    /// Lowest value pruned (inclusive)
    pub min_value: f32,
    /// Highest value pruned (inclusive)
    pub max_value: f32,
    pub cutoff: Cutoff,
    pub do_weights: bool,
    pub do_biases: bool,
    pub layers: Vec<LayerRef>,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            set_value: 0.0,
            min_value: -0.2,
            max_value: 0.2,
            cutoff: Cutoff::Unbounded,
            do_weights: true,
            do_biases: false,
            layers: vec![LayerRef::Model],
        }
    }
}

impl PruningConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set_value(mut self, value: f32) -> Self {
        self.set_value = value;
        self
    }

    /// Set the pruned value band.
    pub fn with_band(mut self, min_value: f32, max_value: f32) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    pub fn with_cutoff(mut self, cutoff: Cutoff) -> Self {
        self.cutoff = cutoff;
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

    pub fn validate(&self) -> Result<()> {
        ensure_range("min_value", self.min_value, "max_value", self.max_value)?;
        ensure_finite("set_value", self.set_value)?;
        ensure_non_empty_layers(&self.layers)
    }
}

/// Epoch-end policy that sets in-band weights to a fixed value.
///
/// Deterministic: no random draws are involved.
///
/// # Example
///
/// ```
/// use entrenar_stroke::policy::{Pruning, PruningConfig};
/// use ndarray::arr1;
///
/// let pruning = Pruning::new(PruningConfig::default().with_band(-0.1, 0.1))?;
/// let (pruned, n) = pruning.apply(&arr1(&[0.05_f32, -0.5, 0.0]).into_dyn())?;
/// assert_eq!(pruned, arr1(&[0.0_f32, -0.5, 0.0]).into_dyn());
/// assert_eq!(n, 2);
/// # Ok::<(), entrenar_stroke::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pruning {
    config: PruningConfig,
    gate: EpochGate,
    parameters_pruned: usize,
    last_epoch_pruned: usize,
}

impl Pruning {
    pub fn new(config: PruningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gate: EpochGate::new(config.cutoff),
            config,
            parameters_pruned: 0,
            last_epoch_pruned: 0,
        })
    }

    pub fn config(&self) -> &PruningConfig {
        &self.config
    }

    /// Total overwrites performed over the run.
    ///
    /// Elements already equal to `set_value` still count when in band.
    pub fn parameters_pruned(&self) -> usize {
        self.parameters_pruned
    }

    pub fn last_epoch_pruned(&self) -> usize {
        self.last_epoch_pruned
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_open()
    }

    /// Prune a single tensor, returning it with the number of overwrites.
    pub fn apply(&self, tensor: &Tensor) -> Result<(Tensor, usize)> {
        let value = self.config.set_value;
        replace_in_band(tensor, self.config.min_value, self.config.max_value, || value)
    }
}

impl TrainingPolicy for Pruning {
    fn on_epoch_end(&mut self, ctx: &CallbackContext, model: &mut dyn ModelAccess) -> Result<()> {
        self.last_epoch_pruned = 0;
        if self.gate.is_open() {
            let targets =
                Targets { weights: self.config.do_weights, biases: self.config.do_biases };
            let pruned =
                mutate_layers(self.name(), model, &self.config.layers, targets, |t| self.apply(t));
            self.gate.advance();
            self.last_epoch_pruned = pruned?;
            self.parameters_pruned += self.last_epoch_pruned;
        } else {
            debug!(epoch = ctx.epoch, "Pruning past cutoff, skipping");
            self.gate.advance();
        }
        Ok(())
    }

    fn epochs_completed(&self) -> usize {
        self.gate.epochs_completed()
    }

    fn name(&self) -> &'static str {
        "Pruning"
    }
}
