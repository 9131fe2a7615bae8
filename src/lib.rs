//! Epoch-end weight mutation policies for neural network training
//!
//! Three policies rewrite a model's weight and bias tensors between
//! epochs to improve generalization:
//!
//! - [`NeuroPlast`](policy::NeuroPlast) re-initializes near-zero weights
//! - [`Pruning`](policy::Pruning) collapses a value band to a fixed value
//! - [`Stroke`](policy::Stroke) re-initializes a random fraction of weights
//!
//! The training loop stays in charge of the model. It passes a
//! [`ModelAccess`](model::ModelAccess) handle to each policy through
//! [`TrainingPolicy::on_epoch_end`](callback::TrainingPolicy::on_epoch_end).
//!
//! # Example
//!
//! ```
//! use entrenar_stroke::callback::{CallbackContext, TrainingPolicy};
//! use entrenar_stroke::model::{DenseLayer, DenseModel, LayerRef, ModelAccess};
//! use entrenar_stroke::policy::{Stroke, StrokeConfig};
//! use ndarray::Array2;
//!
//! let mut model = DenseModel::new()
//!     .with_layer(DenseLayer::new("dense", Array2::<f32>::ones((8, 8)).into_dyn()));
//!
//! let mut stroke = Stroke::new(StrokeConfig::default().with_volatility_ratio(0.25).with_seed(0))?;
//! stroke.on_epoch_end(&CallbackContext::new(0), &mut model)?;
//!
//! assert_eq!(stroke.last_epoch_strikes(), 16);
//! assert_eq!(model.weights(&LayerRef::Model).unwrap().shape(), &[8, 8]);
//! # Ok::<(), entrenar_stroke::Error>(())
//! ```

pub mod callback;
pub mod error;
pub mod model;
pub mod policy;
pub mod tensor;

pub use callback::{CallbackContext, PolicyManager, TrainingPolicy};
pub use error::{Error, Result};
pub use model::{DenseLayer, DenseModel, LayerRef, ModelAccess, Parameters};
pub use policy::{
    Cutoff, NeuroPlast, NeuroPlastConfig, Policy, PolicyConfig, Pruning, PruningConfig, Stroke,
    StrokeConfig,
};
pub use tensor::Tensor;
