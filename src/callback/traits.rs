//! Core types for the policy hook
//!
//! - `CallbackContext` - epoch state handed to policies
//! - `TrainingPolicy` - the trait every policy implements

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::ModelAccess;

/// Context passed to policies at the end of an epoch
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallbackContext {
    /// Epoch that just finished (0-indexed)
    pub epoch: usize,
    /// Total epochs planned
    pub max_epochs: usize,
    /// Training loss for the epoch
    pub loss: f32,
    /// Validation loss (if available)
    pub val_loss: Option<f32>,
    /// Any other metrics the host reports
    pub metrics: BTreeMap<String, f32>,
}

impl CallbackContext {
    pub fn new(epoch: usize) -> Self {
        Self { epoch, ..Self::default() }
    }

    pub fn with_loss(mut self, loss: f32) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_val_loss(mut self, val_loss: f32) -> Self {
        self.val_loss = Some(val_loss);
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f32) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }
}

/// Trait for epoch-end weight mutation policies
///
/// A policy receives the host model as an explicit capability on every
/// call. It must behave correctly whatever earlier policies did to the
/// tensors in the same epoch.
pub trait TrainingPolicy: Send {
    /// Called once after each completed epoch
    ///
    /// Host accessor errors are returned unchanged; the policy does not
    /// retry.
    fn on_epoch_end(&mut self, ctx: &CallbackContext, model: &mut dyn ModelAccess) -> Result<()>;

    /// Number of epoch-end calls seen so far, gated or not
    fn epochs_completed(&self) -> usize;

    /// Policy name for logging
    fn name(&self) -> &'static str {
        "TrainingPolicy"
    }
}
