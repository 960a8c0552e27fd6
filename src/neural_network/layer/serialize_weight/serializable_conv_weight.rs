use super::*;

/// Serializable representation of Conv1D, Conv2D and Conv3D weights.
///
/// # Fields
///
/// - `weight_shape` - Kernel shape `[filters, channels, ...kernel]` used to rebuild the array
/// - `weight` - Kernel values flattened in row-major order
/// - `bias` - Bias values, one per filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableConvWeight {
    pub weight_shape: Vec<usize>,
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
}

impl SerializableConvWeight {
    pub(super) fn from_arrays<D: Dimension>(weight: &Array<f32, D>, bias: &Array2<f32>) -> Self {
        Self {
            weight_shape: weight.shape().to_vec(),
            weight: weight.iter().copied().collect(),
            bias: bias.iter().copied().collect(),
        }
    }

    fn bias_array(&self) -> Result<Array2<f32>, IoError> {
        flat_to_array(&[1, self.bias.len()], &self.bias)
    }
}

impl<T: ActivationLayer> ApplyWeights<Conv1D<T>> for SerializableConvWeight {
    fn apply_to_layer(&self, layer: &mut Conv1D<T>) -> Result<(), IoError> {
        let weight = flat_to_array::<Ix3>(&self.weight_shape, &self.weight)?;
        layer
            .set_weights(weight, self.bias_array()?)
            .map_err(shape_mismatch)
    }
}

impl<T: ActivationLayer> ApplyWeights<Conv2D<T>> for SerializableConvWeight {
    fn apply_to_layer(&self, layer: &mut Conv2D<T>) -> Result<(), IoError> {
        let weight = flat_to_array::<Ix4>(&self.weight_shape, &self.weight)?;
        layer
            .set_weights(weight, self.bias_array()?)
            .map_err(shape_mismatch)
    }
}

impl<T: ActivationLayer> ApplyWeights<Conv3D<T>> for SerializableConvWeight {
    fn apply_to_layer(&self, layer: &mut Conv3D<T>) -> Result<(), IoError> {
        let weight = flat_to_array::<Ix5>(&self.weight_shape, &self.weight)?;
        layer
            .set_weights(weight, self.bias_array()?)
            .map_err(shape_mismatch)
    }
}
