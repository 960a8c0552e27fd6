use super::input_validation_function::validate_learning_rate;
use crate::error::ModelError;
use crate::neural_network::{Layer, Optimizer};
use ndarray::{Array, Array2, Dimension, Zip};

/// Stochastic Gradient Descent (SGD) optimizer.
///
/// A simple optimization algorithm that updates parameters in the direction
/// of the negative gradient, scaled by the learning rate.
///
/// # Fields
///
/// * `learning_rate` - Learning rate controlling the size of parameter updates
#[derive(Debug, Clone)]
pub struct SGD {
    learning_rate: f32,
}

impl SGD {
    /// Creates a new SGD optimizer with the specified learning rate.
    ///
    /// # Parameters
    ///
    /// * `learning_rate` - Step size for parameter updates
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - A new SGD optimizer instance
    /// - `Err(ModelError::InputValidationError)` - If the learning rate is not positive and finite
    pub fn new(learning_rate: f32) -> Result<Self, ModelError> {
        validate_learning_rate(learning_rate)?;
        Ok(Self { learning_rate })
    }

    /// Returns the learning rate.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Updates a single parameter tensor: `param -= lr * grad`.
    pub fn update_parameter<D: Dimension>(param: &mut Array<f32, D>, grad: &Array<f32, D>, lr: f32) {
        Zip::from(param).and(grad).par_for_each(|p, &g| {
            *p -= g * lr;
        });
    }

    /// Simultaneously update a kernel and its bias in parallel
    ///
    /// # Parameters
    ///
    /// - `weights` - Mutable reference to weights array to be updated
    /// - `weight_grads` - Reference to weight gradients array
    /// - `bias` - Mutable reference to bias array to be updated
    /// - `bias_grads` - Reference to bias gradients array
    /// - `lr` - Learning rate
    pub fn update_sgd_parameters<D: Dimension>(
        weights: &mut Array<f32, D>,
        weight_grads: &Array<f32, D>,
        bias: &mut Array2<f32>,
        bias_grads: &Array2<f32>,
        lr: f32,
    ) {
        rayon::join(
            || Self::update_parameter(weights, weight_grads, lr),
            || Self::update_parameter(bias, bias_grads, lr),
        );
    }
}

impl Optimizer for SGD {
    fn update(&mut self, layer: &mut dyn Layer) {
        layer.update_parameters_sgd(self.learning_rate);
    }
}
