//! NeuroPlast: re-initialize near-zero weights
//!
//! Weights that have collapsed into a small band around zero contribute
//! little to the model. NeuroPlast gives them a fresh value at the end of
//! each epoch so the layer keeps operating at full capacity.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::common::{
    ensure_finite, ensure_non_empty_layers, ensure_range, make_rng, mutate_layers,
    replace_in_band, uniform, Cutoff, EpochGate, Replacement, Targets,
};
use crate::callback::{CallbackContext, TrainingPolicy};
use crate::error::Result;
use crate::model::{LayerRef, ModelAccess};
use crate::tensor::Tensor;

/// Configuration for [`NeuroPlast`].
///
/// # Example
///
/// ```
/// use entrenar_stroke::policy::{Cutoff, NeuroPlastConfig};
///
/// let config = NeuroPlastConfig::default()
///     .with_band(-0.02, 0.02)
///     .with_bounds(-0.1, 0.1)
///     .with_cutoff(Cutoff::Epochs(10))
///     .with_biases(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuroPlastConfig {
    /// Fixed replacement value; random when unset
    pub set_value: Option<f32>,
    /// Lowest value operated on (inclusive)
    pub min_value: f32,
    /// Highest value operated on (inclusive)
    pub max_value: f32,
    /// Low bound for random re-initialization
    pub low_bound: f32,
    /// High bound for random re-initialization
    pub high_bound: f32,
    pub cutoff: Cutoff,
    pub do_weights: bool,
    pub do_biases: bool,
    /// Layers to operate on
    pub layers: Vec<LayerRef>,
    /// RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for NeuroPlastConfig {
    fn default() -> Self {
        Self {
            set_value: None,
            min_value: -0.01,
            max_value: 0.01,
            low_bound: -0.05,
            high_bound: 0.05,
            cutoff: Cutoff::Unbounded,
            do_weights: true,
            do_biases: false,
            layers: vec![LayerRef::Model],
            seed: None,
        }
    }
}

impl NeuroPlastConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace with a fixed value instead of a random draw.
    pub fn with_set_value(mut self, value: f32) -> Self {
        self.set_value = Some(value);
        self
    }

    /// Set the value band selected for re-initialization.
    pub fn with_band(mut self, min_value: f32, max_value: f32) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    /// Set the random re-initialization range.
    pub fn with_bounds(mut self, low_bound: f32, high_bound: f32) -> Self {
        self.low_bound = low_bound;
        self.high_bound = high_bound;
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

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replacement rule implied by the configuration.
    pub fn replacement(&self) -> Result<Replacement> {
        Replacement::from_options(self.set_value, self.low_bound, self.high_bound)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        ensure_range("min_value", self.min_value, "max_value", self.max_value)?;
        uniform("low_bound", self.low_bound, "high_bound", self.high_bound)?;
        if let Some(v) = self.set_value {
            ensure_finite("set_value", v)?;
        }
        ensure_non_empty_layers(&self.layers)
    }
}

/// Epoch-end policy that re-initializes weights inside a value band.
#[derive(Debug)]
pub struct NeuroPlast {
    config: NeuroPlastConfig,
    replacement: Replacement,
    gate: EpochGate,
    rng: StdRng,
    elements_mutated: usize,
    last_epoch_mutations: usize,
}

impl NeuroPlast {
    /// Create the policy; fails on an invalid configuration.
    pub fn new(config: NeuroPlastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            replacement: config.replacement()?,
            gate: EpochGate::new(config.cutoff),
            rng: make_rng(config.seed),
            config,
            elements_mutated: 0,
            last_epoch_mutations: 0,
        })
    }

    pub fn config(&self) -> &NeuroPlastConfig {
        &self.config
    }

    /// Total elements re-initialized over the run.
    pub fn elements_mutated(&self) -> usize {
        self.elements_mutated
    }

    /// Elements re-initialized by the most recent epoch-end call.
    pub fn last_epoch_mutations(&self) -> usize {
        self.last_epoch_mutations
    }

    /// Whether the next epoch-end call will mutate.
    pub fn is_active(&self) -> bool {
        self.gate.is_open()
    }

    /// Re-initialize in-band elements of a single tensor.
    ///
    /// Returns the new tensor and the number of replaced elements.
    pub fn apply(&mut self, tensor: &Tensor) -> Result<(Tensor, usize)> {
        let replacement = self.replacement;
        let rng = &mut self.rng;
        replace_in_band(tensor, self.config.min_value, self.config.max_value, || {
            replacement.draw(rng)
        })
    }
}

impl TrainingPolicy for NeuroPlast {
    fn on_epoch_end(&mut self, ctx: &CallbackContext, model: &mut dyn ModelAccess) -> Result<()> {
        self.last_epoch_mutations = 0;
        if self.gate.is_open() {
            let name = self.name();
            let (min, max) = (self.config.min_value, self.config.max_value);
            let replacement = self.replacement;
            let rng = &mut self.rng;
            let targets =
                Targets { weights: self.config.do_weights, biases: self.config.do_biases };
            let mutated = mutate_layers(name, model, &self.config.layers, targets, |t| {
                replace_in_band(t, min, max, || replacement.draw(rng))
            });
            self.gate.advance();
            self.last_epoch_mutations = mutated?;
            self.elements_mutated += self.last_epoch_mutations;
        } else {
            debug!(epoch = ctx.epoch, "NeuroPlast past cutoff, skipping");
            self.gate.advance();
        }
        Ok(())
    }

    fn epochs_completed(&self) -> usize {
        self.gate.epochs_completed()
    }

    fn name(&self) -> &'static str {
        "NeuroPlast"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{DenseLayer, DenseModel};
    use ndarray::{arr1, arr2};

    fn model_with_biases() -> DenseModel {
        DenseModel::new().with_layer(
            DenseLayer::new("dense", arr2(&[[0.001_f32, 0.5], [-0.3, 0.0]]).into_dyn())
                .with_biases(arr1(&[0.0_f32, 0.2]).into_dyn()),
        )
    }

    #[test]
    fn test_default_config() {
        let config = NeuroPlastConfig::default();
        assert_eq!(config.min_value, -0.01);
        assert_eq!(config.max_value, 0.01);
        assert_eq!(config.low_bound, -0.05);
        assert_eq!(config.high_bound, 0.05);
        assert_eq!(config.cutoff, Cutoff::Unbounded);
        assert!(config.do_weights);
        assert!(!config.do_biases);
        assert_eq!(config.layers, vec![LayerRef::Model]);
    }

    #[test]
    fn test_new_rejects_inverted_bounds() {
        let err =
            NeuroPlast::new(NeuroPlastConfig::default().with_bounds(0.1, -0.1)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = NeuroPlast::new(NeuroPlastConfig::default().with_bounds(-f32::MAX, f32::MAX))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = NeuroPlast::new(NeuroPlastConfig::default().with_band(0.1, -0.1)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = NeuroPlast::new(NeuroPlastConfig::default().with_layers(vec![])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_only_in_band_weights_reinitialized() {
        let mut policy = NeuroPlast::new(NeuroPlastConfig::default().with_seed(42)).unwrap();
        let mut model = model_with_biases();
        policy.on_epoch_end(&CallbackContext::new(0), &mut model).unwrap();

        let w = model.weights(&LayerRef::Model).unwrap();
        assert_eq!(w.shape(), &[2, 2]);
        assert_eq!(w[[0, 1]], 0.5);
        assert_eq!(w[[1, 0]], -0.3);
        assert!((-0.05..=0.05).contains(&w[[0, 0]]));
        assert!((-0.05..=0.05).contains(&w[[1, 1]]));
        assert_eq!(policy.last_epoch_mutations(), 2);

        // Biases disabled by default
        assert_eq!(model.biases(&LayerRef::Model).unwrap(), arr1(&[0.0_f32, 0.2]).into_dyn());
    }

    #[test]
    fn test_biases_checked_against_their_own_values() {
        let config =
            NeuroPlastConfig::default().with_weights(false).with_biases(true).with_set_value(0.04);
        let mut policy = NeuroPlast::new(config).unwrap();
        let mut model = model_with_biases();
        policy.on_epoch_end(&CallbackContext::new(0), &mut model).unwrap();

        assert_eq!(model.biases(&LayerRef::Model).unwrap(), arr1(&[0.04_f32, 0.2]).into_dyn());
        assert_eq!(
            model.weights(&LayerRef::Model).unwrap(),
            arr2(&[[0.001_f32, 0.5], [-0.3, 0.0]]).into_dyn()
        );
    }

    #[test]
    fn test_set_value_zero_is_used() {
        let config = NeuroPlastConfig::default().with_set_value(0.0).with_band(-1.0, 1.0);
        let mut policy = NeuroPlast::new(config).unwrap();
        let (out, n) = policy.apply(&arr1(&[0.5_f32, -0.5, 2.0]).into_dyn()).unwrap();
        assert_eq!(n, 2);
        assert_eq!(out, arr1(&[0.0_f32, 0.0, 2.0]).into_dyn());
    }

    #[test]
    fn test_cutoff_gating_counts_every_call() {
        let config =
            NeuroPlastConfig::default().with_set_value(0.03).with_cutoff(Cutoff::Epochs(1));
        let mut policy = NeuroPlast::new(config).unwrap();
        let mut model = model_with_biases();

        policy.on_epoch_end(&CallbackContext::new(0), &mut model).unwrap();
        assert_eq!(policy.last_epoch_mutations(), 2);
        assert!(!policy.is_active());

        // Put a near-zero weight back; it must survive the gated call
        let mut params = crate::model::Parameters::default();
        params.weights = Some(arr2(&[[0.0_f32, 0.5], [-0.3, 0.0]]).into_dyn());
        model.set_parameters(&LayerRef::Model, params).unwrap();

        policy.on_epoch_end(&CallbackContext::new(1), &mut model).unwrap();
        assert_eq!(policy.last_epoch_mutations(), 0);
        assert_eq!(policy.epochs_completed(), 2);
        assert_eq!(model.weights(&LayerRef::Model).unwrap()[[0, 0]], 0.0);
        assert_eq!(policy.elements_mutated(), 2);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = || {
            let mut policy = NeuroPlast::new(NeuroPlastConfig::default().with_seed(9)).unwrap();
            let mut model = model_with_biases();
            policy.on_epoch_end(&CallbackContext::new(0), &mut model).unwrap();
            model.weights(&LayerRef::Model).unwrap()
        };
        assert_eq!(run(), run());
    }
}
