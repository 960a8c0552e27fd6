use super::*;

/// Validates the filters parameter.
///
/// # Errors
///
/// Returns `ModelError::InputValidationError` if filters is 0.
pub(super) fn validate_filters(filters: usize) -> Result<(), ModelError> {
    if filters == 0 {
        return Err(ModelError::InputValidationError(
            "Number of filters must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates that every kernel or stride dimension is positive.
///
/// # Errors
///
/// Returns `ModelError::InputValidationError` if any dimension is 0.
pub(super) fn validate_positive_dims(dims: &[usize], name: &str) -> Result<(), ModelError> {
    if dims.iter().any(|&d| d == 0) {
        return Err(ModelError::InputValidationError(format!(
            "{} must be greater than 0 in every dimension, got {:?}",
            name, dims
        )));
    }
    Ok(())
}

/// Validates the declared input shape `[batch_size, channels, ...spatial]` of a convolutional layer.
///
/// # Errors
///
/// Returns `ModelError::InputValidationError` if:
/// - The shape does not have `2 + spatial_rank` dimensions
/// - Any dimension other than the batch size is 0
/// - The spatial dimensions cannot hold the kernel with the given padding
pub(super) fn validate_input_shape(
    input_shape: &[usize],
    kernel: &[usize],
    strides: &[usize],
    padding: PaddingType,
) -> Result<(), ModelError> {
    let spatial_rank = kernel.len();
    if input_shape.len() != 2 + spatial_rank {
        return Err(ModelError::InputValidationError(format!(
            "Input shape must be {}D: [batch_size, channels, {} spatial dims], got {:?}",
            2 + spatial_rank,
            spatial_rank,
            input_shape
        )));
    }
    if input_shape[1..].iter().any(|&d| d == 0) {
        return Err(ModelError::InputValidationError(format!(
            "Channels and spatial dimensions must be greater than 0, got {:?}",
            input_shape
        )));
    }
    ConvGeometry::new(&input_shape[2..], kernel, strides, padding).map(|_| ())
}

/// Validates a tensor handed to `forward`: rank and channel count must match the layer.
///
/// The batch size and the spatial extent may differ from the declared input shape.
pub(super) fn validate_forward_input(
    input: &Tensor,
    channels: usize,
    spatial_rank: usize,
) -> Result<(), ModelError> {
    if input.ndim() != 2 + spatial_rank || input.shape()[1] != channels {
        return Err(ModelError::InputValidationError(format!(
            "Expected input of shape [batch_size, {}, {} spatial dims], got {:?}",
            channels,
            spatial_rank,
            input.shape()
        )));
    }
    Ok(())
}
