use super::input_validation_function::{validate_decay_rate, validate_epsilon, validate_learning_rate};
use crate::error::ModelError;
use crate::neural_network::{Layer, Optimizer};
use ndarray::{Array, Dimension, Zip};

/// RMSprop optimizer implementation.
///
/// An optimization algorithm that adapts the learning rate for each parameter
/// using a moving average of squared gradients.
///
/// # Fields
///
/// - `learning_rate` - Learning rate controlling the size of parameter updates
/// - `rho` - Decay rate for the moving average of squared gradients
/// - `epsilon` - Small constant added for numerical stability
#[derive(Debug, Clone)]
pub struct RMSprop {
    learning_rate: f32,
    rho: f32,
    epsilon: f32,
}

impl RMSprop {
    /// Creates a new RMSprop optimizer with the specified parameters.
    ///
    /// # Parameters
    ///
    /// - `learning_rate` - Step size for parameter updates
    /// - `rho` - Decay rate for the moving average (typically 0.9)
    /// - `epsilon` - Small constant for numerical stability (typically 1e-7)
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - A new RMSprop optimizer instance
    /// - `Err(ModelError::InputValidationError)` - If any hyperparameter is out of range
    pub fn new(learning_rate: f32, rho: f32, epsilon: f32) -> Result<Self, ModelError> {
        validate_learning_rate(learning_rate)?;
        validate_decay_rate(rho, "rho")?;
        validate_epsilon(epsilon)?;

        Ok(Self {
            learning_rate,
            rho,
            epsilon,
        })
    }
}

impl Optimizer for RMSprop {
    fn update(&mut self, layer: &mut dyn Layer) {
        layer.update_parameters_rmsprop(self.learning_rate, self.rho, self.epsilon);
    }
}

/// Moving average of squared gradients for one parameter tensor.
#[derive(Debug, Clone)]
pub struct RMSpropCache<D: Dimension> {
    pub cache: Array<f32, D>,
}

impl<D: Dimension> RMSpropCache<D> {
    /// Creates a zeroed cache for a parameter of shape `dim`.
    pub fn new(dim: D) -> Self {
        Self {
            cache: Array::zeros(dim),
        }
    }

    /// Updates the moving average with `grad` and applies the scaled step to `param`.
    ///
    /// # Parameters
    ///
    /// - `param` - Parameter tensor updated in place
    /// - `grad` - Gradient of the parameter
    /// - `rho` - Decay rate for the moving average
    /// - `lr` - Learning rate
    /// - `epsilon` - Small constant added for numerical stability
    pub fn update_parameter(
        &mut self,
        param: &mut Array<f32, D>,
        grad: &Array<f32, D>,
        rho: f32,
        lr: f32,
        epsilon: f32,
    ) {
        Zip::from(param)
            .and(&mut self.cache)
            .and(grad)
            .par_for_each(|p, c, &g| {
                *c = rho * *c + (1.0 - rho) * g * g;
                *p -= lr * g / (c.sqrt() + epsilon);
            });
    }
}
