use super::*;

/// Linear (Identity) activation layer.
///
/// Applies the identity function `f(x) = x` element-wise, preserving the input shape.
/// This is the activation to use when a Dense or convolutional layer should stay purely affine.
///
/// # Fields
///
/// - `input_cache` - Cached input tensor from the forward pass, used during backpropagation
///
/// # Examples
///
/// ```rust
/// use concrete_dropout::prelude::*;
/// use ndarray::Array2;
///
/// let x = Array2::from_shape_vec((2, 3), vec![-1.0, 2.0, -3.0, 4.0, -5.0, 6.0])
///     .unwrap()
///     .into_dyn();
///
/// let mut model = Sequential::new();
/// model
///     .add(Linear::new())
///     .compile(SGD::new(0.01).unwrap(), MeanSquaredError::new());
///
/// let output = model.predict(&x).unwrap();
/// assert_eq!(output, x);
/// ```
pub struct Linear {
    input_cache: Option<Tensor>,
}

impl Linear {
    /// Creates a new Linear activation layer.
    pub fn new() -> Self {
        Linear { input_cache: None }
    }
}

impl Layer for Linear {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        validate_activation_input(input)?;

        self.input_cache = Some(input.clone());
        Ok(input.clone())
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        match &self.input_cache {
            Some(input) => {
                validate_activation_grad(grad_output, input)?;
                // Derivative is 1, gradient passes through unchanged
                Ok(grad_output.clone())
            }
            None => Err(ModelError::ProcessingError(
                "Forward pass has not been run yet".to_string(),
            )),
        }
    }

    fn layer_type(&self) -> &str {
        "Linear"
    }

    fn output_shape(&self) -> String {
        format_output_shape(&self.input_cache)
    }

    no_trainable_parameters_layer_functions!();

    fn reset_state(&mut self) {
        self.input_cache = None;
    }
}

impl ActivationLayer for Linear {}
