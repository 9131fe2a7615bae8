//! Epoch-end weight mutation policies
//!
//! - **NeuroPlast**: re-initialize weights inside a near-zero band
//! - **Pruning**: set weights inside a band to a fixed value
//! - **Stroke**: re-initialize a random fraction of all weights
//!
//! All three read copies of the targeted tensors from the host model,
//! rewrite them elementwise with the shape preserved, and commit them
//! back. Each stops mutating once its cutoff is reached but keeps
//! counting epochs.
//!
//! # Example
//!
//! ```
//! use entrenar_stroke::policy::load_policies_yaml;
//!
//! let policies = load_policies_yaml(
//!     r#"
//! policies:
//!   - type: pruning
//!     min_value: -0.05
//!     max_value: 0.05
//!   - type: stroke
//!     volatility_ratio: 0.1
//!     decay: 0.95
//!     cutoff: 20
//! "#,
//! )?;
//! assert_eq!(policies.len(), 2);
//! # Ok::<(), entrenar_stroke::Error>(())
//! ```

mod common;
mod loader;
mod neuroplast;
mod pruning;
mod stroke;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::callback::{CallbackContext, TrainingPolicy};
use crate::error::Result;
use crate::model::ModelAccess;

pub use common::{Cutoff, EpochGate, Replacement};
pub use loader::{load_policies_file, load_policies_yaml, PolicySet};
pub use neuroplast::{NeuroPlast, NeuroPlastConfig};
pub use pruning::{Pruning, PruningConfig};
pub use stroke::{Stroke, StrokeConfig, MAX_VOLATILITY, MIN_VOLATILITY};

/// Configuration for any policy, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    #[serde(rename = "neuroplast")]
    NeuroPlast(NeuroPlastConfig),
    Pruning(PruningConfig),
    Stroke(StrokeConfig),
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::NeuroPlast(c) => c.validate(),
            Self::Pruning(c) => c.validate(),
            Self::Stroke(c) => c.validate(),
        }
    }

    /// Construct the configured policy
    pub fn build(self) -> Result<Policy> {
        Ok(match self {
            Self::NeuroPlast(c) => Policy::NeuroPlast(NeuroPlast::new(c)?),
            Self::Pruning(c) => Policy::Pruning(Pruning::new(c)?),
            Self::Stroke(c) => Policy::Stroke(Stroke::new(c)?),
        })
    }
}

/// One of the three mutation policies
#[derive(Debug)]
pub enum Policy {
    NeuroPlast(NeuroPlast),
    Pruning(Pruning),
    Stroke(Stroke),
}

impl From<NeuroPlast> for Policy {
    fn from(p: NeuroPlast) -> Self {
        Self::NeuroPlast(p)
    }
}

impl From<Pruning> for Policy {
    fn from(p: Pruning) -> Self {
        Self::Pruning(p)
    }
}

impl From<Stroke> for Policy {
    fn from(p: Stroke) -> Self {
        Self::Stroke(p)
    }
}

impl TrainingPolicy for Policy {
    fn on_epoch_end(&mut self, ctx: &CallbackContext, model: &mut dyn ModelAccess) -> Result<()> {
        match self {
            Self::NeuroPlast(p) => p.on_epoch_end(ctx, model),
            Self::Pruning(p) => p.on_epoch_end(ctx, model),
            Self::Stroke(p) => p.on_epoch_end(ctx, model),
        }
    }

    fn epochs_completed(&self) -> usize {
        match self {
            Self::NeuroPlast(p) => p.epochs_completed(),
            Self::Pruning(p) => p.epochs_completed(),
            Self::Stroke(p) => p.epochs_completed(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::NeuroPlast(p) => p.name(),
            Self::Pruning(p) => p.name(),
            Self::Stroke(p) => p.name(),
        }
    }
}
