use super::helper_functions::{
    ConvGeometry, convolve_backward, convolve_forward, pad_input, strip_padding,
};
use super::*;
use input_validation_function::*;

/// A macro that generates the `Layer` functions shared by the convolutional layers.
///
/// The layer must have the fields `filters`, `padding`, `weights`, `bias`, `activation`,
/// `input_shape`, `input_cache`, `geometry_cache`, `weight_gradients`, `bias_gradients` and
/// `optimizer_cache`, and the methods `kernel_dims` and `stride_dims`.
///
/// # Parameters
///
/// - `$variant` - Name of the layer, also the `LayerWeight` and `SerializableLayerWeight` variant
/// - `$weight` - Borrowed weight struct used by `get_weights`
/// - `$dim` - Dimension type of the kernel
macro_rules! convolution_layer_functions {
    ($variant:ident, $weight:ident, $dim:ty) => {
        fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
            validate_forward_input(input, self.weights.shape()[1], self.kernel_dims().len())?;

            let geometry = ConvGeometry::new(
                &input.shape()[2..],
                &self.kernel_dims(),
                &self.stride_dims(),
                self.padding,
            )?;
            let padded = pad_input(input, &geometry);
            let z = convolve_forward(&padded, self.weights.view().into_dyn(), &self.bias, &geometry);

            self.input_cache = Some(padded);
            self.geometry_cache = Some(geometry);

            self.activation.forward(&z)
        }

        fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
            let grad_z = self.activation.backward(grad_output)?;

            let (padded, geometry) = match (&self.input_cache, &self.geometry_cache) {
                (Some(padded), Some(geometry)) => (padded, geometry),
                _ => {
                    return Err(ModelError::ProcessingError(
                        "Forward pass has not been run yet".to_string(),
                    ));
                }
            };

            let expected = geometry.output_shape(padded.shape()[0], self.filters);
            if grad_z.shape() != expected.as_slice() {
                return Err(ModelError::ProcessingError(format!(
                    "Gradient shape {:?} does not match output shape {:?}",
                    grad_z.shape(),
                    expected
                )));
            }

            let (grad_padded, grad_w, grad_b) =
                convolve_backward(padded, self.weights.view().into_dyn(), &grad_z, geometry);
            let grad_w = grad_w
                .into_dimensionality::<$dim>()
                .map_err(|e| ModelError::ProcessingError(e.to_string()))?;
            let grad_input = strip_padding(grad_padded, geometry);

            self.weight_gradients = Some(grad_w);
            self.bias_gradients = Some(grad_b);

            Ok(grad_input)
        }

        fn layer_type(&self) -> &str {
            stringify!($variant)
        }

        fn output_shape(&self) -> String {
            match ConvGeometry::new(
                &self.input_shape[2..],
                &self.kernel_dims(),
                &self.stride_dims(),
                self.padding,
            ) {
                Ok(geometry) => {
                    let mut shape = vec!["None".to_string(), self.filters.to_string()];
                    shape.extend(geometry.output_spatial.iter().map(|d| d.to_string()));
                    format!("({})", shape.join(", "))
                }
                Err(_) => "Unknown".to_string(),
            }
        }

        fn param_count(&self) -> TrainingParameters {
            TrainingParameters::Trainable(self.weights.len() + self.bias.len())
        }

        update_kernel_and_bias!();

        fn get_weights(&self) -> LayerWeight<'_> {
            LayerWeight::$variant($weight {
                weight: &self.weights,
                bias: &self.bias,
            })
        }

        fn load_weights(&mut self, weights: &SerializableLayerWeight) -> Result<(), IoError> {
            match weights {
                SerializableLayerWeight::$variant(conv) => conv.apply_to_layer(self),
                _ => Err(IoError::invalid_data(format!(
                    "Cannot load {} weights into a {} layer",
                    weights.type_name(),
                    stringify!($variant)
                ))),
            }
        }

        fn reset_state(&mut self) {
            self.input_cache = None;
            self.geometry_cache = None;
            self.weight_gradients = None;
            self.bias_gradients = None;
            self.optimizer_cache.clear();
            self.activation.reset_state();
        }
    };
}

/// A macro that generates the `KernelLayer` implementation of a convolutional layer.
macro_rules! convolution_kernel_layer {
    ($layer:ident) => {
        impl<T: ActivationLayer> KernelLayer for $layer<T> {
            kernel_access_functions!();

            fn input_layout(&self) -> InputLayout {
                InputLayout::Spatial {
                    channels: self.weights.shape()[1],
                    spatial_rank: self.kernel_dims().len(),
                }
            }
        }
    };
}

/// Xavier (Glorot) uniform initialization for a kernel of shape `[filters, channels, ...kernel]`.
///
/// Bound: `sqrt(6 / (channels * kernel_area + filters * kernel_area))`.
fn xavier_uniform<Sh: ShapeBuilder<Dim = D>, D: Dimension>(
    shape: Sh,
    filters: usize,
    channels: usize,
    kernel_area: usize,
) -> Array<f32, D> {
    let fan_in = channels * kernel_area;
    let fan_out = filters * kernel_area;
    let bound = (6.0 / (fan_in + fan_out) as f32).sqrt();
    Array::random(shape, Uniform::new_inclusive(-bound, bound))
}

/// Checks the shapes passed to `set_weights` of a convolutional layer.
fn validate_weight_shapes(
    layer: &str,
    expected_weight: &[usize],
    weight: &[usize],
    filters: usize,
    bias: &[usize],
) -> Result<(), ModelError> {
    if weight != expected_weight || bias != [1, filters] {
        return Err(ModelError::InputValidationError(format!(
            "{} expects weights {:?} and bias {:?}, got {:?} and {:?}",
            layer,
            expected_weight,
            [1, filters],
            weight,
            bias
        )));
    }
    Ok(())
}

/// 1D Convolutional Layer
pub mod conv_1d;
/// 2D Convolutional Layer
pub mod conv_2d;
/// 3D Convolutional Layer
pub mod conv_3d;
/// Constructor argument checks for the convolutional layers
mod input_validation_function;

pub use conv_1d::*;
pub use conv_2d::*;
pub use conv_3d::*;
