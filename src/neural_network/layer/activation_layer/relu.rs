use super::*;

/// Threshold for parallel computation (in number of elements)
/// For tensors with fewer elements, sequential computation is faster due to overhead
const RELU_PARALLEL_THRESHOLD: usize = 10_000;

/// ReLU (Rectified Linear Unit) activation layer.
///
/// Applies `max(0, x)` element-wise to the input tensor, keeping the original shape.
///
/// # Fields
///
/// - `input_cache` - Cached input tensor from the forward pass, used during backpropagation
pub struct ReLU {
    input_cache: Option<Tensor>,
}

impl ReLU {
    /// Creates a new ReLU activation layer.
    pub fn new() -> Self {
        ReLU { input_cache: None }
    }
}

impl Layer for ReLU {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        validate_activation_input(input)?;

        self.input_cache = Some(input.clone());

        let mut output = input.clone();
        if input.len() >= RELU_PARALLEL_THRESHOLD {
            output.par_mapv_inplace(|x| x.max(0.0));
        } else {
            output.mapv_inplace(|x| x.max(0.0));
        }

        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let input = match &self.input_cache {
            Some(input) => input,
            None => {
                return Err(ModelError::ProcessingError(
                    "Forward pass has not been run yet".to_string(),
                ));
            }
        };
        validate_activation_grad(grad_output, input)?;

        // ReLU derivative is 1 for x > 0, and 0 for x <= 0
        let mut grad_input = grad_output.clone();
        if input.len() >= RELU_PARALLEL_THRESHOLD {
            Zip::from(&mut grad_input)
                .and(input)
                .par_for_each(|grad, &inp| {
                    if inp <= 0.0 {
                        *grad = 0.0;
                    }
                });
        } else {
            Zip::from(&mut grad_input).and(input).for_each(|grad, &inp| {
                if inp <= 0.0 {
                    *grad = 0.0;
                }
            });
        }

        Ok(grad_input)
    }

    fn layer_type(&self) -> &str {
        "ReLU"
    }

    fn output_shape(&self) -> String {
        format_output_shape(&self.input_cache)
    }

    no_trainable_parameters_layer_functions!();

    fn reset_state(&mut self) {
        self.input_cache = None;
    }
}

impl ActivationLayer for ReLU {}
