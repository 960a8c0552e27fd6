use super::*;

/// Dense (Fully Connected) layer implementation for neural networks.
///
/// This layer performs a linear transformation of the input data using a weight matrix and bias vector,
/// followed by an activation layer: `output = activation(input · weights + bias)`.
///
/// Weights are drawn from `U(-0.05, 0.05)` and biases start at zero. During training the layer keeps
/// the input and the gradients of its parameters so that any of the optimizers can update it, and an
/// enclosing regularizer can add its own kernel gradient term through [`KernelLayer`].
///
/// # Dimensions
///
/// - Input shape: (batch_size, input_dim)
/// - Output shape: (batch_size, output_dim)
///
/// # Fields
///
/// - `input_dim` - Input dimension size
/// - `output_dim` - Output dimension size
/// - `weights` - Weight matrix with shape (input_dim, output_dim)
/// - `bias` - Bias vector with shape (1, output_dim)
/// - `activation` - Activation layer applied after the affine transformation
/// - `input_cache` - Input from the forward pass, used in the backward pass
/// - `weight_gradients` - Stored weight gradients
/// - `bias_gradients` - Stored bias gradients
/// - `optimizer_cache` - Optimizer state for the weights and the bias
///
/// # Example
/// ```rust
/// use concrete_dropout::prelude::*;
/// use ndarray::Array;
///
/// let x = Array::ones((2, 4)).into_dyn();
/// let y = Array::ones((2, 1)).into_dyn();
///
/// let mut model = Sequential::new();
/// model
///     .add(Dense::new(4, 3, ReLU::new()).unwrap())
///     .add(Dense::new(3, 1, Linear::new()).unwrap());
/// model.compile(SGD::new(0.01).unwrap(), MeanSquaredError::new());
///
/// model.summary();
/// model.fit(&x, &y, 3).unwrap();
///
/// let prediction = model.predict(&x).unwrap();
/// assert_eq!(prediction.shape(), &[2, 1]);
/// ```
pub struct Dense<T: ActivationLayer> {
    input_dim: usize,
    output_dim: usize,
    weights: Array2<f32>,
    bias: Array2<f32>,
    activation: T,
    input_cache: Option<Array2<f32>>,
    weight_gradients: Option<Array2<f32>>,
    bias_gradients: Option<Array2<f32>>,
    optimizer_cache: OptimizerCache<Ix2>,
}

impl<T: ActivationLayer> Dense<T> {
    /// Creates a new dense layer.
    ///
    /// # Parameters
    ///
    /// - `input_dim` - Number of input features
    /// - `output_dim` - Number of output units
    /// - `activation` - Activation layer applied to the affine output
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - A new Dense layer with randomly initialized weights
    /// - `Err(ModelError::InputValidationError)` - If either dimension is zero
    pub fn new(input_dim: usize, output_dim: usize, activation: T) -> Result<Self, ModelError> {
        if input_dim == 0 || output_dim == 0 {
            return Err(ModelError::InputValidationError(format!(
                "Dense dimensions must be positive, got input_dim={}, output_dim={}",
                input_dim, output_dim
            )));
        }

        let weights = Array2::random((input_dim, output_dim), Uniform::new(-0.05f32, 0.05));
        let bias = Array2::zeros((1, output_dim));

        Ok(Self {
            input_dim,
            output_dim,
            weights,
            bias,
            activation,
            input_cache: None,
            weight_gradients: None,
            bias_gradients: None,
            optimizer_cache: OptimizerCache::default(),
        })
    }

    /// Number of input features.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Number of output units.
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Sets the weights and bias for this layer.
    ///
    /// # Parameters
    ///
    /// - `weights` - Weight matrix with shape (input_dim, output_dim)
    /// - `bias` - Bias with shape (1, output_dim)
    ///
    /// # Returns
    ///
    /// - `Ok(())` - The parameters were replaced
    /// - `Err(ModelError::InputValidationError)` - If a shape does not match the layer
    pub fn set_weights(&mut self, weights: Array2<f32>, bias: Array2<f32>) -> Result<(), ModelError> {
        if weights.dim() != (self.input_dim, self.output_dim) || bias.dim() != (1, self.output_dim) {
            return Err(ModelError::InputValidationError(format!(
                "Dense expects weights {:?} and bias {:?}, got {:?} and {:?}",
                (self.input_dim, self.output_dim),
                (1, self.output_dim),
                weights.dim(),
                bias.dim()
            )));
        }
        self.weights = weights;
        self.bias = bias;
        Ok(())
    }
}

impl<T: ActivationLayer> Layer for Dense<T> {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        if input.ndim() != 2 || input.shape()[1] != self.input_dim {
            return Err(ModelError::InputValidationError(format!(
                "Dense expects input of shape [batch_size, {}], got {:?}",
                self.input_dim,
                input.shape()
            )));
        }

        let input_2d = input
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|e| ModelError::ProcessingError(e.to_string()))?
            .to_owned();

        let z = input_2d.dot(&self.weights) + &self.bias;
        self.input_cache = Some(input_2d);

        self.activation.forward(&z.into_dyn())
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let grad_z = self.activation.backward(grad_output)?;

        let input = self.input_cache.as_ref().ok_or_else(|| {
            ModelError::ProcessingError("Forward pass has not been run yet".to_string())
        })?;

        let grad_z = grad_z
            .into_dimensionality::<Ix2>()
            .map_err(|e| ModelError::ProcessingError(e.to_string()))?;

        let (grad_w, grad_b) = rayon::join(
            || input.t().dot(&grad_z),
            || grad_z.sum_axis(Axis(0)).insert_axis(Axis(0)),
        );
        let grad_input = grad_z.dot(&self.weights.t());

        self.weight_gradients = Some(grad_w);
        self.bias_gradients = Some(grad_b);

        Ok(grad_input.into_dyn())
    }

    fn layer_type(&self) -> &str {
        "Dense"
    }

    fn output_shape(&self) -> String {
        format!("(None, {})", self.output_dim)
    }

    fn param_count(&self) -> TrainingParameters {
        TrainingParameters::Trainable(self.weights.len() + self.bias.len())
    }

    update_kernel_and_bias!();

    fn get_weights(&self) -> LayerWeight<'_> {
        LayerWeight::Dense(DenseLayerWeight {
            weight: &self.weights,
            bias: &self.bias,
        })
    }

    fn load_weights(&mut self, weights: &SerializableLayerWeight) -> Result<(), IoError> {
        match weights {
            SerializableLayerWeight::Dense(dense) => dense.apply_to_layer(self),
            _ => Err(IoError::invalid_data(format!(
                "Cannot load {} weights into a Dense layer",
                weights.type_name()
            ))),
        }
    }

    fn reset_state(&mut self) {
        self.input_cache = None;
        self.weight_gradients = None;
        self.bias_gradients = None;
        self.optimizer_cache.clear();
        self.activation.reset_state();
    }
}

impl<T: ActivationLayer> KernelLayer for Dense<T> {
    kernel_access_functions!();

    fn input_layout(&self) -> InputLayout {
        InputLayout::Flat {
            features: self.input_dim,
        }
    }
}
