//! Host model access
//!
//! Policies never own the model. The training loop hands them a
//! [`ModelAccess`] handle at every epoch boundary; a policy reads copies
//! of the weight and bias tensors, mutates the copies, and commits them
//! back through [`ModelAccess::set_parameters`].
//!
//! [`DenseModel`] is a small in-memory host for loops that keep their
//! parameters as plain `ndarray` tensors.

mod dense;


use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;
use crate::tensor::Tensor;

pub use dense::{DenseLayer, DenseModel};

/// Address of a weight/bias pair inside a host model
///
/// Written as `model`, `{index: N}` or `{name: NAME}`; the map form stays
/// readable when nested inside a `type`-tagged policy config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayerRef {
    /// The model-level pair (first parameterized layer)
    #[default]
    Model,
    /// Layer by position
    Index(usize),
    /// Layer by name
    Name(String),
}

impl Serialize for LayerRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Model => serializer.serialize_str("model"),
            Self::Index(i) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("index", i)?;
                map.end()
            }
            Self::Name(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("name", name)?;
                map.end()
            }
        }
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Index(i) => write!(f, "layer[{i}]"),
            Self::Name(name) => write!(f, "layer '{name}'"),
        }
    }
}

impl From<usize> for LayerRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for LayerRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Replacement tensors for one layer
///
/// A `None` field leaves the host's tensor untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    pub weights: Option<Tensor>,
    pub biases: Option<Tensor>,
}

impl Parameters {
    /// True when there is nothing to commit
    pub fn is_empty(&self) -> bool {
        self.weights.is_none() && self.biases.is_none()
    }
}

/// Capability a host model exposes to mutation policies
pub trait ModelAccess {
    /// Copy of the weight tensor at `layer`, if it has one
    fn weights(&self, layer: &LayerRef) -> Option<Tensor>;

    /// Copy of the bias tensor at `layer`, if it has one
    fn biases(&self, layer: &LayerRef) -> Option<Tensor>;

    /// Replace the tensors at `layer` wholesale
    fn set_parameters(&mut self, layer: &LayerRef, params: Parameters) -> Result<()>;
}
