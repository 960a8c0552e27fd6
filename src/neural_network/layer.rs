use crate::error::{IoError, ModelError};
use crate::neural_network::Tensor;
use crate::neural_network::neural_network_trait::*;
use crate::neural_network::optimizer::*;
use ndarray::prelude::*;
use ndarray::Zip;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;

/// Number of parameters a layer reports in the model summary.
///
/// # Variants
///
/// - `Trainable` - Parameters updated by the optimizer
/// - `NonTrainable` - Parameters that are stored but never updated
/// - `NoTrainable` - The layer has no parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingParameters {
    Trainable(usize),
    NonTrainable(usize),
    NoTrainable,
}

impl TrainingParameters {
    /// Returns the number of trainable parameters, zero for the other variants.
    pub fn trainable(&self) -> usize {
        match self {
            TrainingParameters::Trainable(count) => *count,
            _ => 0,
        }
    }
}

/// A macro that generates the `Layer` functions of a layer without trainable parameters.
macro_rules! no_trainable_parameters_layer_functions {
    () => {
        fn param_count(&self) -> TrainingParameters {
            TrainingParameters::NoTrainable
        }

        fn update_parameters_sgd(&mut self, _lr: f32) {}

        fn update_parameters_adam(
            &mut self,
            _lr: f32,
            _beta1: f32,
            _beta2: f32,
            _epsilon: f32,
            _t: u64,
        ) {
        }

        fn update_parameters_rmsprop(&mut self, _lr: f32, _rho: f32, _epsilon: f32) {}

        fn get_weights(&self) -> LayerWeight<'_> {
            LayerWeight::Empty
        }
    };
}

/// A macro that generates the optimizer update functions of a layer with a kernel and a bias.
///
/// The layer must have the fields `weights`, `bias`, `weight_gradients`, `bias_gradients`
/// and `optimizer_cache: OptimizerCache<D>`. Nothing is updated until a backward pass
/// has stored both gradients.
macro_rules! update_kernel_and_bias {
    () => {
        fn update_parameters_sgd(&mut self, lr: f32) {
            if let (Some(weight_grads), Some(bias_grads)) =
                (&self.weight_gradients, &self.bias_gradients)
            {
                SGD::update_sgd_parameters(
                    &mut self.weights,
                    weight_grads,
                    &mut self.bias,
                    bias_grads,
                    lr,
                );
            }
        }

        fn update_parameters_adam(&mut self, lr: f32, beta1: f32, beta2: f32, epsilon: f32, t: u64) {
            if let (Some(weight_grads), Some(bias_grads)) =
                (&self.weight_gradients, &self.bias_gradients)
            {
                self.optimizer_cache.weights.adam_step(
                    &mut self.weights,
                    weight_grads,
                    lr,
                    beta1,
                    beta2,
                    epsilon,
                    t,
                );
                self.optimizer_cache
                    .bias
                    .adam_step(&mut self.bias, bias_grads, lr, beta1, beta2, epsilon, t);
            }
        }

        fn update_parameters_rmsprop(&mut self, lr: f32, rho: f32, epsilon: f32) {
            if let (Some(weight_grads), Some(bias_grads)) =
                (&self.weight_gradients, &self.bias_gradients)
            {
                self.optimizer_cache
                    .weights
                    .rmsprop_step(&mut self.weights, weight_grads, rho, lr, epsilon);
                self.optimizer_cache
                    .bias
                    .rmsprop_step(&mut self.bias, bias_grads, rho, lr, epsilon);
            }
        }
    };
}

/// A macro that generates `kernel` and `add_kernel_gradient` for a layer whose kernel field is `weights`.
macro_rules! kernel_access_functions {
    () => {
        fn kernel(&self) -> ArrayViewD<'_, f32> {
            self.weights.view().into_dyn()
        }

        fn add_kernel_gradient(&mut self, coefficient: f32) {
            if let Some(weight_grads) = &mut self.weight_gradients {
                weight_grads.scaled_add(coefficient, &self.weights);
            }
        }
    };
}

/// Formats a shape as `(d0, d1, ...)`.
fn format_shape(shape: &[usize]) -> String {
    format!(
        "({})",
        shape
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

/// Activation layers (Linear, ReLU, Sigmoid)
pub mod activation_layer;
/// Convolutional layers (Conv1D, Conv2D, Conv3D)
pub mod convolution_layer;
/// Dense (fully connected) layer
pub mod dense;
/// Shared numeric helpers for convolutional layers
mod helper_functions;
/// Borrowed views over the weights of each layer type
pub mod layer_weight;
/// Padding modes for convolutional layers
pub mod padding_type;
/// Regularization layers (Concrete Dropout)
pub mod regularization_layer;
/// Serializable weight containers used to save and load models
pub mod serialize_weight;

pub use activation_layer::*;
pub use convolution_layer::*;
pub use dense::*;
pub use layer_weight::*;
pub use padding_type::*;
pub use regularization_layer::{
    ConcreteDropout, ConcreteDropoutConfig, DEFAULT_LENGTH_SCALE, DEFAULT_MODEL_PRECISION,
    DEFAULT_PROB_INIT, DEFAULT_TEMPERATURE, EntropyScale, LogitInit,
};
pub use serialize_weight::*;
