use super::*;

/// 3D Convolutional layer for volumetric data.
///
/// Slides `[depth, height, width]` kernels over channels-first volumes, as used for video
/// clips or medical scans.
///
/// # Fields
///
/// - `filters` - Number of output filters
/// - `kernel_size` - Kernel extent as (depth, height, width)
/// - `strides` - Strides as (depth, height, width)
/// - `padding` - `Valid` or `Same`
/// - `weights` - 5D kernel with shape \[filters, channels, kernel_depth, kernel_height, kernel_width\]
/// - `bias` - Bias with shape \[1, filters\]
/// - `activation` - Activation layer applied to the convolution output
///
/// # Shape Information
///
/// Input shape: \[batch_size, channels, depth, height, width\]
/// Output shape: \[batch_size, filters, output_depth, output_height, output_width\]
///
/// # Example
/// ```rust
/// use concrete_dropout::prelude::*;
/// use ndarray::Array5;
///
/// let x = Array5::ones((1, 2, 4, 4, 4)).into_dyn();
///
/// let mut layer = Conv3D::new(
///     3,
///     (2, 2, 2),
///     vec![1, 2, 4, 4, 4],
///     (2, 2, 2),
///     PaddingType::Valid,
///     Linear::new(),
/// )
/// .unwrap();
///
/// let output = layer.forward(&x).unwrap();
/// assert_eq!(output.shape(), &[1, 3, 2, 2, 2]);
/// ```
pub struct Conv3D<T: ActivationLayer> {
    filters: usize,
    kernel_size: (usize, usize, usize),
    strides: (usize, usize, usize),
    padding: PaddingType,
    weights: Array5<f32>,
    bias: Array2<f32>,
    activation: T,
    input_shape: Vec<usize>,
    input_cache: Option<Tensor>,
    geometry_cache: Option<ConvGeometry>,
    weight_gradients: Option<Array5<f32>>,
    bias_gradients: Option<Array2<f32>>,
    optimizer_cache: OptimizerCache<Ix5>,
}

impl<T: ActivationLayer> Conv3D<T> {
    /// Creates a new Conv3D layer.
    ///
    /// # Parameters
    ///
    /// - `filters` - Number of output filters
    /// - `kernel_size` - Kernel extent as (depth, height, width)
    /// - `input_shape` - Shape of the input as \[batch_size, channels, depth, height, width\]
    /// - `strides` - Strides as (depth, height, width)
    /// - `padding` - `Valid` or `Same`
    /// - `activation` - Activation layer applied to the convolution output
    ///
    /// # Returns
    ///
    /// - `Ok(Conv3D)` - A new layer with Xavier-initialized weights and zero biases
    /// - `Err(ModelError::InputValidationError)` - If any argument is out of range
    pub fn new(
        filters: usize,
        kernel_size: (usize, usize, usize),
        input_shape: Vec<usize>,
        strides: (usize, usize, usize),
        padding: PaddingType,
        activation: T,
    ) -> Result<Self, ModelError> {
        let kernel = [kernel_size.0, kernel_size.1, kernel_size.2];
        let stride = [strides.0, strides.1, strides.2];
        validate_filters(filters)?;
        validate_positive_dims(&kernel, "kernel_size")?;
        validate_positive_dims(&stride, "strides")?;
        validate_input_shape(&input_shape, &kernel, &stride, padding)?;

        let channels = input_shape[1];
        let weights = xavier_uniform(
            (filters, channels, kernel_size.0, kernel_size.1, kernel_size.2),
            filters,
            channels,
            kernel.iter().product(),
        );

        Ok(Conv3D {
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
        vec![self.kernel_size.0, self.kernel_size.1, self.kernel_size.2]
    }

    fn stride_dims(&self) -> Vec<usize> {
        vec![self.strides.0, self.strides.1, self.strides.2]
    }

    /// Sets the weights and bias for this layer.
    pub fn set_weights(&mut self, weights: Array5<f32>, bias: Array2<f32>) -> Result<(), ModelError> {
        validate_weight_shapes(
            "Conv3D",
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

impl<T: ActivationLayer> Layer for Conv3D<T> {
    convolution_layer_functions!(Conv3D, Conv3DLayerWeight, Ix5);
}

convolution_kernel_layer!(Conv3D);
