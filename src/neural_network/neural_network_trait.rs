use crate::error::{IoError, ModelError};
use crate::neural_network::Tensor;
use crate::neural_network::layer::TrainingParameters;
use crate::neural_network::layer::layer_weight::LayerWeight;
use crate::neural_network::layer::serialize_weight::SerializableLayerWeight;
use ndarray::ArrayViewD;

/// Defines the interface for neural network layers.
///
/// This trait provides the core functionality that all neural network layers must implement,
/// including forward and backward propagation, parameter updates for different optimization
/// algorithms, and the auxiliary losses a layer contributes to the model's total loss.
pub trait Layer: std::any::Any + Send + Sync {
    /// Performs forward propagation through the layer.
    ///
    /// # Parameters
    ///
    /// - `input` - The input tensor to the layer
    ///
    /// # Returns
    ///
    /// - `Ok(Tensor)` - The output tensor after forward computation
    /// - `Err(ModelError)` - If the input does not fit the layer
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError>;

    /// Performs backward propagation through the layer.
    ///
    /// # Parameters
    ///
    /// - `grad_output` - The gradient tensor from the next layer
    ///
    /// # Returns
    ///
    /// - `Ok(Tensor)` - The gradient tensor to be passed to the previous layer
    /// - `Err(ModelError)` - If the layer encountered an error during processing
    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError>;

    /// Returns the type name of the layer (e.g. "Dense").
    fn layer_type(&self) -> &str {
        "Unknown"
    }

    /// Returns a description of the output shape of the layer.
    fn output_shape(&self) -> String {
        "Unknown".to_string()
    }

    /// Returns the total number of trainable parameters in the layer.
    ///
    /// # Returns
    ///
    /// - `TrainingParameters` - The count of parameters as an enum variant
    fn param_count(&self) -> TrainingParameters;

    /// Updates the layer parameters using Stochastic Gradient Descent.
    ///
    /// # Parameters
    ///
    /// - `_lr` - Learning rate for parameter updates
    fn update_parameters_sgd(&mut self, _lr: f32);

    /// Updates the layer parameters using Adam optimizer.
    ///
    /// # Parameters
    ///
    /// - `_lr` - Learning rate for parameter updates
    /// - `_beta1` - Exponential decay rate for the first moment estimates
    /// - `_beta2` - Exponential decay rate for the second moment estimates
    /// - `_epsilon` - Small constant for numerical stability
    /// - `_t` - Current training iteration
    fn update_parameters_adam(
        &mut self,
        _lr: f32,
        _beta1: f32,
        _beta2: f32,
        _epsilon: f32,
        _t: u64,
    );

    /// Updates the layer parameters using RMSprop optimizer.
    ///
    /// # Parameters
    ///
    /// - `_lr` - Learning rate for parameter updates
    /// - `_rho` - Decay rate for moving average of squared gradients
    /// - `_epsilon` - Small constant for numerical stability
    fn update_parameters_rmsprop(&mut self, _lr: f32, _rho: f32, _epsilon: f32);

    /// Returns a reference to all weights in the layer.
    ///
    /// # Returns
    ///
    /// - `LayerWeight<'_>` - An enum containing references to layer weights:
    ///     - `LayerWeight::Dense` for Dense layers with weight and bias
    ///     - `LayerWeight::Conv1D`, `LayerWeight::Conv2D`, `LayerWeight::Conv3D` for convolutional layers
    ///     - `LayerWeight::ConcreteDropout` for a wrapped layer plus its dropout logit
    ///     - `LayerWeight::Empty` for layers with no trainable parameters
    fn get_weights(&self) -> LayerWeight<'_>;

    /// Sets the training mode if the layer is mode-dependent.
    ///
    /// Layers that don't depend on training mode can use the default no-op implementation.
    ///
    /// # Parameters
    ///
    /// - `_is_training` - `true` for training mode, `false` for inference mode
    fn set_training_if_mode_dependent(&mut self, _is_training: bool) {}

    /// Returns the auxiliary losses this layer adds to the model's total loss.
    ///
    /// Each entry is one registered loss term computed from the current parameter values,
    /// so the result does not depend on the batch that was last seen.
    fn losses(&self) -> Vec<f32> {
        Vec::new()
    }

    /// Applies deserialized weights to this layer.
    ///
    /// The default implementation accepts only `SerializableLayerWeight::Empty`, which is
    /// right for layers without trainable parameters.
    ///
    /// # Errors
    ///
    /// - `IoError::StdIoError` - The stored weights belong to another layer type or have the wrong shape
    fn load_weights(&mut self, weights: &SerializableLayerWeight) -> Result<(), IoError> {
        match weights {
            SerializableLayerWeight::Empty => Ok(()),
            _ => Err(IoError::invalid_data(format!(
                "{} layer has no trainable weights to load",
                self.layer_type()
            ))),
        }
    }

    /// Drops cached activations, gradients and optimizer state.
    ///
    /// Parameters are left untouched. Used to tear a model down between independent runs.
    fn reset_state(&mut self) {}
}

/// Shape of the input a kernel layer consumes, as far as dropout is concerned.
///
/// # Variants
///
/// - `Flat` - Feature vectors `[batch_size, features]`
/// - `Spatial` - Channels-first spatial data `[batch_size, channels, ...spatial]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayout {
    Flat { features: usize },
    Spatial { channels: usize, spatial_rank: usize },
}

impl InputLayout {
    /// Number of dimensions (batch axis included) an input must have.
    pub fn ndim(&self) -> usize {
        match self {
            InputLayout::Flat { .. } => 2,
            InputLayout::Spatial { spatial_rank, .. } => 2 + spatial_rank,
        }
    }

    /// Number of units a dropout mask covers for one sample: features or channels.
    pub fn units(&self) -> usize {
        match self {
            InputLayout::Flat { features } => *features,
            InputLayout::Spatial { channels, .. } => *channels,
        }
    }
}

/// Capability of a trainable layer that owns a kernel and can be wrapped by a regularizer.
///
/// The wrapper only needs to read the kernel, push an extra gradient term into it and
/// know the layout of the input it will be masking.
pub trait KernelLayer: Layer {
    /// Returns a view of the kernel (the weight tensor without bias).
    fn kernel(&self) -> ArrayViewD<'_, f32>;

    /// Returns `sum(W^2)` over the kernel.
    fn kernel_sum_of_squares(&self) -> f32 {
        self.kernel().iter().map(|w| w * w).sum()
    }

    /// Adds `coefficient * W` to the stored kernel gradient.
    ///
    /// Does nothing when no backward pass has produced a gradient yet.
    fn add_kernel_gradient(&mut self, coefficient: f32);

    /// Returns the layout of the input this layer expects.
    fn input_layout(&self) -> InputLayout;
}

/// Defines the interface for loss functions used in neural network training.
pub trait LossFunction {
    /// Computes the loss between true and predicted values.
    fn compute_loss(&self, y_true: &Tensor, y_pred: &Tensor) -> f32;

    /// Computes the gradient of the loss with respect to the predictions.
    fn compute_grad(&self, y_true: &Tensor, y_pred: &Tensor) -> Tensor;
}

/// Defines the interface for optimization algorithms.
pub trait Optimizer {
    /// Updates the parameters of a layer according to the optimization algorithm.
    ///
    /// # Parameters
    ///
    /// - `layer` - The layer whose parameters should be updated
    fn update(&mut self, layer: &mut dyn Layer);
}

/// Trait for applying serialized weights to a specific layer type.
///
/// # Type Parameters
///
/// - `L` - The layer type that these weights can be applied to
pub trait ApplyWeights<L> {
    /// Applies the serialized weights to a layer instance.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Weights were successfully applied
    /// - `Err(IoError)` - Weight shape mismatch or conversion error
    fn apply_to_layer(&self, layer: &mut L) -> Result<(), IoError>;
}

/// A marker trait for activation layers in neural networks.
///
/// Activation layers apply element-wise transformations, have no trainable parameters
/// and preserve the input shape. They are used as the activation of Dense and convolutional layers.
pub trait ActivationLayer: Layer {}
