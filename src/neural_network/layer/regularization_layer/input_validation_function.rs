use crate::error::ModelError;

/// Validates that the data-set size is positive.
pub(super) fn validate_n_data(n_data: usize) -> Result<(), ModelError> {
    if n_data == 0 {
        return Err(ModelError::InputValidationError(
            "n_data must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Validates the range of initial dropout probabilities: `0 < p_min <= p_max < 1`.
pub(super) fn validate_prob_init(prob_init: (f32, f32)) -> Result<(), ModelError> {
    let (p_min, p_max) = prob_init;
    if !(p_min > 0.0 && p_max < 1.0) {
        return Err(ModelError::InputValidationError(format!(
            "prob_init bounds must lie in (0, 1), got ({}, {})",
            p_min, p_max
        )));
    }
    if p_min > p_max {
        return Err(ModelError::InputValidationError(format!(
            "prob_init lower bound {} is greater than upper bound {}",
            p_min, p_max
        )));
    }
    Ok(())
}

/// Validates that a value is finite and not negative.
pub(super) fn validate_non_negative_finite(value: f32, param_name: &str) -> Result<(), ModelError> {
    if !(value >= 0.0 && value.is_finite()) {
        return Err(ModelError::InputValidationError(format!(
            "{} must be finite and non-negative, got {}",
            param_name, value
        )));
    }
    Ok(())
}

/// Validates that a value is finite and strictly positive.
pub(super) fn validate_positive_finite(value: f32, param_name: &str) -> Result<(), ModelError> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(ModelError::InputValidationError(format!(
            "{} must be positive and finite, got {}",
            param_name, value
        )));
    }
    Ok(())
}
