//! In-memory host model built from dense layers

use crate::error::{Error, Result};
use crate::tensor::Tensor;

use super::{LayerRef, ModelAccess, Parameters};

/// A named layer holding a weight tensor and an optional bias tensor
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    pub name: String,
    pub weights: Tensor,
    pub biases: Option<Tensor>,
}

impl DenseLayer {
    pub fn new(name: impl Into<String>, weights: Tensor) -> Self {
        Self { name: name.into(), weights, biases: None }
    }

    pub fn with_biases(mut self, biases: Tensor) -> Self {
        self.biases = Some(biases);
        self
    }

    /// Number of scalar parameters in this layer
    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.as_ref().map_or(0, Tensor::len)
    }
}

/// Ordered stack of dense layers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DenseModel {
    layers: Vec<DenseLayer>,
}

impl DenseModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer
    pub fn push(&mut self, layer: DenseLayer) {
        self.layers.push(layer);
    }

    /// Builder form of [`push`](Self::push)
    pub fn with_layer(mut self, layer: DenseLayer) -> Self {
        self.push(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Total scalar parameters across all layers
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(DenseLayer::parameter_count).sum()
    }

    fn position(&self, layer: &LayerRef) -> Option<usize> {
        match layer {
            LayerRef::Model => (!self.layers.is_empty()).then_some(0),
            LayerRef::Index(i) => (*i < self.layers.len()).then_some(*i),
            LayerRef::Name(name) => self.layers.iter().position(|l| &l.name == name),
        }
    }

    pub fn layer(&self, layer: &LayerRef) -> Option<&DenseLayer> {
        let i = self.position(layer)?;
        Some(&self.layers[i])
    }

    pub fn layer_mut(&mut self, layer: &LayerRef) -> Option<&mut DenseLayer> {
        let i = self.position(layer)?;
        Some(&mut self.layers[i])
    }
}

fn check_shape(current: &Tensor, replacement: &Tensor) -> Result<()> {
    if current.shape() != replacement.shape() {
        return Err(Error::ShapeMismatch {
            expected: current.shape().to_vec(),
            actual: replacement.shape().to_vec(),
        });
    }
    Ok(())
}

impl ModelAccess for DenseModel {
    fn weights(&self, layer: &LayerRef) -> Option<Tensor> {
        self.layer(layer).map(|l| l.weights.clone())
    }

    fn biases(&self, layer: &LayerRef) -> Option<Tensor> {
        self.layer(layer).and_then(|l| l.biases.clone())
    }

    fn set_parameters(&mut self, layer: &LayerRef, params: Parameters) -> Result<()> {
        let target =
            self.layer_mut(layer).ok_or_else(|| Error::UnknownLayer(layer.to_string()))?;

        // Validate both tensors before touching either
        if let Some(w) = &params.weights {
            check_shape(&target.weights, w)?;
        }
        if let Some(b) = &params.biases {
            match &target.biases {
                Some(current) => check_shape(current, b)?,
                None => {
                    return Err(Error::Host(format!("{layer} has no bias tensor to replace")));
                }
            }
        }

        if let Some(w) = params.weights {
            target.weights = w;
        }
        if let Some(b) = params.biases {
            target.biases = Some(b);
        }
        Ok(())
    }
}
