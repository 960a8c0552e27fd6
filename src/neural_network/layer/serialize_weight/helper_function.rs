use crate::error::IoError;
use ndarray::{Array, Array2, Dimension, IxDyn};

pub(super) fn vec2_to_array2(vec: &[Vec<f32>]) -> Result<Array2<f32>, IoError> {
    let rows = vec.len();
    let cols = vec.first().map_or(0, Vec::len);
    if vec.iter().any(|row| row.len() != cols) {
        return Err(IoError::invalid_data("Rows of a stored matrix differ in length"));
    }
    let flat: Vec<f32> = vec.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows, cols), flat).map_err(|e| IoError::invalid_data(e.to_string()))
}

/// Rebuilds an array of static dimension `D` from a stored shape and row-major values.
pub(super) fn flat_to_array<D: Dimension>(
    shape: &[usize],
    values: &[f32],
) -> Result<Array<f32, D>, IoError> {
    Array::from_shape_vec(IxDyn(shape), values.to_vec())
        .map_err(|e| IoError::invalid_data(e.to_string()))?
        .into_dimensionality::<D>()
        .map_err(|e| IoError::invalid_data(e.to_string()))
}

/// Maps a rejected `set_weights` call onto the I/O error of a failed load.
pub(super) fn shape_mismatch(error: crate::error::ModelError) -> IoError {
    IoError::invalid_data(error.to_string())
}
