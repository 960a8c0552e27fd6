use super::*;

/// 2D convolution over channels-first images.
///
/// Wrapping it in `ConcreteDropout` drops whole input channels, one decision per
/// (sample, channel) pair shared across the height and width of the image.
///
/// # Fields
///
/// - `filters` - Number of convolution filters (output channels).
/// - `kernel_size` - Size of the convolution kernel as (height, width).
/// - `strides` - Stride values for the convolution operation as (vertical, horizontal).
/// - `padding` - Type of padding to apply (`Valid` or `Same`).
/// - `weights` - 4D array of filter weights with shape \[filters, channels, kernel_height, kernel_width\].
/// - `bias` - 2D array of bias values with shape \[1, filters\].
/// - `activation` - Activation layer from activation_layer module
/// - `input_shape` - Declared shape of the input tensor.
/// - `input_cache` - Padded input from the forward pass, used during backpropagation.
/// - `geometry_cache` - Padding and output geometry of the last forward pass.
/// - `weight_gradients` - Gradients for the weights, computed during backpropagation.
/// - `bias_gradients` - Gradients for the biases, computed during backpropagation.
/// - `optimizer_cache` - Cache for optimizer-specific state (e.g., moment estimates for Adam).
///
/// # Shape Information
///
/// Input shape: \[batch_size, channels, height, width\]
/// Output shape: \[batch_size, filters, output_height, output_width\]
/// with `output = ceil(input / stride)` under `Same` padding and
/// `output = (input - kernel) / stride + 1` under `Valid` padding.
///
/// # Example
/// ```rust
/// use concrete_dropout::prelude::*;
/// use ndarray::Array4;
///
/// // two 5x5 single-channel images
/// let x = Array4::ones((2, 1, 5, 5)).into_dyn();
/// let y = Array4::ones((2, 3, 3, 3)).into_dyn();
///
/// let mut model = Sequential::new();
/// model
///     .add(
///         Conv2D::new(3, (3, 3), vec![2, 1, 5, 5], (1, 1), PaddingType::Valid, ReLU::new())
///             .unwrap(),
///     )
///     .compile(RMSprop::new(0.001, 0.9, 1e-8).unwrap(), MeanSquaredError::new());
///
/// model.summary();
/// model.fit(&x, &y, 3).unwrap();
///
/// let prediction = model.predict(&x).unwrap();
/// assert_eq!(prediction.shape(), &[2, 3, 3, 3]);
/// ```
pub struct Conv2D<T: ActivationLayer> {
    filters: usize,
    kernel_size: (usize, usize),
    strides: (usize, usize),
    padding: PaddingType,
    weights: Array4<f32>,
    bias: Array2<f32>,
    activation: T,
    input_shape: Vec<usize>,
    input_cache: Option<Tensor>,
    geometry_cache: Option<ConvGeometry>,
    weight_gradients: Option<Array4<f32>>,
    bias_gradients: Option<Array2<f32>>,
    optimizer_cache: OptimizerCache<Ix4>,
}

impl<T: ActivationLayer> Conv2D<T> {
    /// Creates a new 2D convolutional layer with the specified parameters.
    ///
    /// # Parameters
    ///
    /// - `filters` - Number of convolution filters (output channels).
    /// - `kernel_size` - Size of the convolution kernel as (height, width).
    /// - `input_shape` - Shape of the input tensor as \[batch_size, channels, height, width\].
    /// - `strides` - Stride values for the convolution operation as (vertical, horizontal).
    /// - `padding` - Type of padding to apply (`Valid` or `Same`).
    /// - `activation` - Activation layer from activation_layer module
    ///
    /// # Returns
    ///
    /// - `Ok(Conv2D)` - A new layer with Xavier-initialized weights and zero biases
    /// - `Err(ModelError::InputValidationError)` - If any argument is out of range
    pub fn new(
        filters: usize,
        kernel_size: (usize, usize),
        input_shape: Vec<usize>,
        strides: (usize, usize),
        padding: PaddingType,
        activation: T,
    ) -> Result<Self, ModelError> {
        let kernel = [kernel_size.0, kernel_size.1];
        let stride = [strides.0, strides.1];
        validate_filters(filters)?;
        validate_positive_dims(&kernel, "kernel_size")?;
        validate_positive_dims(&stride, "strides")?;
        validate_input_shape(&input_shape, &kernel, &stride, padding)?;

        let channels = input_shape[1];
        let weights = xavier_uniform(
            (filters, channels, kernel_size.0, kernel_size.1),
            filters,
            channels,
            kernel_size.0 * kernel_size.1,
        );

        Ok(Conv2D {
            filters,
            kernel_size,
            strides,
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
        vec![self.kernel_size.0, self.kernel_size.1]
    }

    fn stride_dims(&self) -> Vec<usize> {
        vec![self.strides.0, self.strides.1]
    }

    /// Sets the weights and bias for this layer.
    ///
    /// # Parameters
    ///
    /// - `weights` - 4D array of filter weights with shape \[filters, channels, kernel_height, kernel_width\]
    /// - `bias` - 2D array of bias values with shape \[1, filters\]
    pub fn set_weights(&mut self, weights: Array4<f32>, bias: Array2<f32>) -> Result<(), ModelError> {
        validate_weight_shapes(
            "Conv2D",
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

impl<T: ActivationLayer> Layer for Conv2D<T> {
    convolution_layer_functions!(Conv2D, Conv2DLayerWeight, Ix4);
}

convolution_kernel_layer!(Conv2D);
