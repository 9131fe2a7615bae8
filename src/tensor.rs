//! Shape-preserving elementwise tensor mutation
//!
//! Every policy rewrites tensors the same way: flatten to a row-major
//! buffer, mutate the buffer, reshape back to the original dimensions.
//! The helpers here implement that round-trip once.

use ndarray::{ArrayD, IxDyn};

use crate::error::{Error, Result};

/// Dense tensor type used for weights and biases
pub type Tensor = ArrayD<f32>;

/// Flatten a tensor into a row-major buffer.
///
/// Element order follows the logical layout, independent of the
/// tensor's memory strides.
pub fn flatten(tensor: &Tensor) -> Vec<f32> {
    tensor.iter().copied().collect()
}

/// Rebuild a tensor of `shape` from a row-major buffer.
pub fn reshape(shape: &[usize], flat: Vec<f32>) -> Result<Tensor> {
    let expected: usize = shape.iter().product();
    if flat.len() != expected {
        return Err(Error::ShapeMismatch { expected: shape.to_vec(), actual: vec![flat.len()] });
    }
    ArrayD::from_shape_vec(IxDyn(shape), flat)
        .map_err(|_| Error::ShapeMismatch { expected: shape.to_vec(), actual: vec![expected] })
}

/// Apply `f` to every element, preserving shape and element order.
pub fn map_elements<F>(tensor: &Tensor, mut f: F) -> Result<Tensor>
where
    F: FnMut(f32) -> f32,
{
    mutate_flat(tensor, |flat| {
        for value in flat.iter_mut() {
            *value = f(*value);
        }
    })
}

/// Hand the flattened buffer to `f` for index-based mutation, then reshape.
///
/// Empty tensors are returned unchanged without invoking `f`.
pub fn mutate_flat<F>(tensor: &Tensor, f: F) -> Result<Tensor>
where
    F: FnOnce(&mut [f32]),
{
    if tensor.is_empty() {
        return Ok(tensor.clone());
    }
    let shape = tensor.shape().to_vec();
    let mut flat = flatten(tensor);
    f(&mut flat);
    reshape(&shape, flat)
}
