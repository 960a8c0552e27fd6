use super::*;

/// Threshold for using parallel computation (number of elements)
const SIGMOID_PARALLEL_THRESHOLD: usize = 1000;

/// Sigmoid activation layer.
///
/// Applies `1 / (1 + e^(-x))` element-wise to the input tensor, squashing values to (0, 1)
/// while preserving the input shape.
///
/// # Fields
///
/// - `output_cache` - Cached output tensor from the forward pass, used during backpropagation
pub struct Sigmoid {
    output_cache: Option<Tensor>,
}

impl Sigmoid {
    /// Creates a new Sigmoid activation layer.
    pub fn new() -> Self {
        Sigmoid { output_cache: None }
    }
}

impl Layer for Sigmoid {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        validate_activation_input(input)?;

        let mut output = input.clone();
        if output.len() >= SIGMOID_PARALLEL_THRESHOLD {
            output.par_mapv_inplace(stable_sigmoid);
        } else {
            output.mapv_inplace(stable_sigmoid);
        }

        self.output_cache = Some(output.clone());
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let output = match &self.output_cache {
            Some(output) => output,
            None => {
                return Err(ModelError::ProcessingError(
                    "Forward pass has not been run yet".to_string(),
                ));
            }
        };
        validate_activation_grad(grad_output, output)?;

        // d(sigmoid)/dx = s * (1 - s)
        let mut grad_input = grad_output.clone();
        Zip::from(&mut grad_input)
            .and(output)
            .for_each(|grad, &s| *grad *= s * (1.0 - s));

        Ok(grad_input)
    }

    fn layer_type(&self) -> &str {
        "Sigmoid"
    }

    fn output_shape(&self) -> String {
        format_output_shape(&self.output_cache)
    }

    no_trainable_parameters_layer_functions!();

    fn reset_state(&mut self) {
        self.output_cache = None;
    }
}

impl ActivationLayer for Sigmoid {}
