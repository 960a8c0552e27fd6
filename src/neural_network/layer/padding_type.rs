use crate::error::ModelError;

/// Defines the padding method used in convolutional layers.
///
/// The padding type determines how the input is padded before applying convolution:
/// - `Valid`: No padding is applied, which reduces the output dimensions.
/// - `Same`: Zero padding is added so that the output length is `ceil(input / stride)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingType {
    /// No padding is applied. The convolution is only computed where the filter
    /// fully overlaps with the input, resulting in an output with reduced dimensions.
    Valid,

    /// Padding is added around the input to ensure that the output has the same
    /// spatial dimensions as the input (when stride is 1). When the total padding
    /// along an axis is odd, the extra zero goes after the input.
    Same,
}

impl PaddingType {
    /// Computes the output length and the padding placed before the input along one axis.
    ///
    /// # Parameters
    ///
    /// - `input` - Input length along the axis
    /// - `kernel` - Kernel length along the axis
    /// - `stride` - Stride along the axis
    ///
    /// # Returns
    ///
    /// - `Ok((output, pad_before, padded))` - Output length, zeros before the input, padded input length
    /// - `Err(ModelError::InputValidationError)` - If `Valid` padding is used with an input shorter than the kernel
    pub fn axis_geometry(
        &self,
        input: usize,
        kernel: usize,
        stride: usize,
    ) -> Result<(usize, usize, usize), ModelError> {
        match self {
            PaddingType::Valid => {
                if input < kernel {
                    return Err(ModelError::InputValidationError(format!(
                        "Input length {} is smaller than kernel length {} with Valid padding",
                        input, kernel
                    )));
                }
                Ok(((input - kernel) / stride + 1, 0, input))
            }
            PaddingType::Same => {
                let output = input.div_ceil(stride);
                let pad_total = ((output.max(1) - 1) * stride + kernel).saturating_sub(input);
                Ok((output, pad_total / 2, input + pad_total))
            }
        }
    }
}
