use super::*;

/// 1D convolution over channels-first sequences.
///
/// # Fields
///
/// - `filters` - Number of convolution filters (output channels).
/// - `kernel_size` - Size of the convolution kernel.
/// - `stride` - Stride value for the convolution operation.
/// - `padding` - Type of padding to apply (`Valid` or `Same`).
/// - `weights` - 3D array of filter weights with shape \[filters, channels, kernel_size\].
/// - `bias` - 2D array of bias values with shape \[1, filters\].
/// - `activation` - Activation layer from activation_layer module.
/// - `input_shape` - Declared shape of the input tensor.
/// - `input_cache` - Padded input from the forward pass, used during backpropagation.
/// - `geometry_cache` - Padding and output geometry of the last forward pass.
/// - `weight_gradients` - Gradients for the weights, computed during backpropagation.
/// - `bias_gradients` - Gradients for the biases, computed during backpropagation.
/// - `optimizer_cache` - Cache for optimizer-specific state (e.g., moment estimates for Adam).
///
/// # Shape Information
///
/// Input shape: \[batch_size, channels, length\]
/// Output shape: \[batch_size, filters, output_length\]
///
/// # Example
/// ```rust
/// use concrete_dropout::prelude::*;
/// use ndarray::Array3;
///
/// let x = Array3::ones((2, 1, 10)).into_dyn();
/// let y = Array3::ones((2, 3, 8)).into_dyn();
///
/// let mut model = Sequential::new();
/// model
///     .add(Conv1D::new(3, 3, vec![2, 1, 10], 1, PaddingType::Valid, ReLU::new()).unwrap())
///     .compile(RMSprop::new(0.001, 0.9, 1e-8).unwrap(), MeanSquaredError::new());
///
/// model.fit(&x, &y, 3).unwrap();
///
/// let prediction = model.predict(&x).unwrap();
/// assert_eq!(prediction.shape(), &[2, 3, 8]);
/// ```
pub struct Conv1D<T: ActivationLayer> {
    filters: usize,
    kernel_size: usize,
    stride: usize,
    padding: PaddingType,
    weights: Array3<f32>,
    bias: Array2<f32>,
    activation: T,
    input_shape: Vec<usize>,
    input_cache: Option<Tensor>,
    geometry_cache: Option<ConvGeometry>,
    weight_gradients: Option<Array3<f32>>,
    bias_gradients: Option<Array2<f32>>,
    optimizer_cache: OptimizerCache<Ix3>,
}

impl<T: ActivationLayer> Conv1D<T> {
    /// Creates a new Conv1D layer.
    ///
    /// # Parameters
    ///
    /// - `filters` - Number of output filters (channels)
    /// - `kernel_size` - Size of the convolution kernel
    /// - `input_shape` - Shape of input tensor \[batch_size, channels, length\]
    /// - `stride` - Stride for the convolution operation
    /// - `padding` - Padding type (Valid or Same)
    /// - `activation` - Activation layer from activation_layer module
    ///
    /// # Returns
    ///
    /// - `Ok(Conv1D)` - A new layer with Xavier-initialized weights and zero biases
    /// - `Err(ModelError::InputValidationError)` - If any argument is out of range
    pub fn new(
        filters: usize,
        kernel_size: usize,
        input_shape: Vec<usize>,
        stride: usize,
        padding: PaddingType,
        activation: T,
    ) -> Result<Self, ModelError> {
        validate_filters(filters)?;
        validate_positive_dims(&[kernel_size], "kernel_size")?;
        validate_positive_dims(&[stride], "stride")?;
        validate_input_shape(&input_shape, &[kernel_size], &[stride], padding)?;

        let channels = input_shape[1];
        let weights = xavier_uniform((filters, channels, kernel_size), filters, channels, kernel_size);

        Ok(Conv1D {
            filters,
            kernel_size,
            stride,
            padding,
            weights,
            bias: Array2::zeros((1, filters)),
            activation,
            input_shape,
            input_cache: None,
            geometry_cache: None,
            weight_gradients: None,
            bias_gradients: None,
            optimizer_cache: OptimizerCache::default(),
        })
    }

    fn kernel_dims(&self) -> Vec<usize> {
        vec![self.kernel_size]
    }

    fn stride_dims(&self) -> Vec<usize> {
        vec![self.stride]
    }

    /// Sets the weights and bias for this layer.
    ///
    /// # Parameters
    ///
    /// - `weights` - 3D array of filter weights with shape \[filters, channels, kernel_size\]
    /// - `bias` - 2D array of bias values with shape \[1, filters\]
    pub fn set_weights(&mut self, weights: Array3<f32>, bias: Array2<f32>) -> Result<(), ModelError> {
        validate_weight_shapes(
            "Conv1D",
            self.weights.shape(),
            weights.shape(),
            self.filters,
            bias.shape(),
        )?;
        self.weights = weights;
        self.bias = bias;
        Ok(())
    }
}

impl<T: ActivationLayer> Layer for Conv1D<T> {
    convolution_layer_functions!(Conv1D, Conv1DLayerWeight, Ix3);
}

convolution_kernel_layer!(Conv1D);
