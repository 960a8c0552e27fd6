use super::*;

/// Helper function to format the output shape for activation layers.
///
/// Returns a formatted string representing the shape of the cached tensor,
/// or "Unknown" if no tensor has been cached yet.
fn format_output_shape(cached_tensor: &Option<Tensor>) -> String {
    match cached_tensor {
        Some(tensor) => format_shape(tensor.shape()),
        None => "Unknown".to_string(),
    }
}

/// Numerically stable logistic function.
///
/// Inputs are clipped to \[-500, 500\] before exponentiation so `exp` never overflows.
pub(crate) fn stable_sigmoid(x: f32) -> f32 {
    let x = x.clamp(-500.0, 500.0);
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Checks that an activation input is non-empty and finite.
fn validate_activation_input(input: &Tensor) -> Result<(), ModelError> {
    if input.is_empty() {
        return Err(ModelError::InputValidationError(
            "Input tensor is empty".to_string(),
        ));
    }
    if input.iter().any(|x| !x.is_finite()) {
        return Err(ModelError::InputValidationError(
            "Input tensor contains NaN or infinite values".to_string(),
        ));
    }
    Ok(())
}

/// Checks that a gradient matches the cached tensor of the forward pass.
fn validate_activation_grad(grad_output: &Tensor, cached: &Tensor) -> Result<(), ModelError> {
    if grad_output.shape() != cached.shape() {
        return Err(ModelError::ProcessingError(format!(
            "Gradient output shape {:?} doesn't match input shape {:?}",
            grad_output.shape(),
            cached.shape()
        )));
    }
    Ok(())
}

/// Linear (Identity) activation layer.
pub mod linear;
/// ReLU (Rectified Linear Unit) activation layer
pub mod relu;
/// Sigmoid activation layer
pub mod sigmoid;

pub use linear::*;
pub use relu::*;
pub use sigmoid::*;

#[cfg(test)]
mod tests {
    use super::stable_sigmoid;

    #[test]
    fn stable_sigmoid_is_symmetric_and_saturates() {
        assert!((stable_sigmoid(0.0) - 0.5).abs() < 1e-7);
        assert!((stable_sigmoid(2.0) + stable_sigmoid(-2.0) - 1.0).abs() < 1e-6);
        assert_eq!(stable_sigmoid(1e4), 1.0);
        assert!(stable_sigmoid(-1e4) >= 0.0);
    }
}
