//! Epoch-end hook interface between a training loop and mutation policies
//!
//! The host loop owns the model and calls each attached policy once per
//! completed epoch:
//!
//! ```rust
//! use entrenar_stroke::callback::{CallbackContext, PolicyManager};
//! use entrenar_stroke::model::{DenseLayer, DenseModel};
//! use entrenar_stroke::policy::{Pruning, PruningConfig};
//! use ndarray::arr2;
//!
//! let mut model = DenseModel::new()
//!     .with_layer(DenseLayer::new("dense", arr2(&[[0.1_f32, 0.5]]).into_dyn()));
//!
//! let mut manager = PolicyManager::new();
//! manager.add(Pruning::new(PruningConfig::default())?);
//!
//! for epoch in 0..3 {
//!     // ... train one epoch ...
//!     manager.on_epoch_end(&CallbackContext::new(epoch), &mut model)?;
//! }
//! # Ok::<(), entrenar_stroke::Error>(())
//! ```

mod manager;
mod traits;

pub use manager::PolicyManager;
pub use traits::{CallbackContext, TrainingPolicy};
