use super::regularization_layer::ConcreteDropoutConfig;
use ndarray::{Array1, Array2, Array3, Array4, Array5, ArrayViewD};

/// Container for different types of neural network layer weights
///
/// This enum serves as a polymorphic container for borrowed weights of the
/// supported layer types. Each variant corresponds to a specific layer type
/// and contains the appropriate weight structure for that layer.
///
/// # Variants
///
/// - `Dense` - Contains weights for dense (fully connected) layers
/// - `Conv1D` - Contains weights for 1D convolutional layers
/// - `Conv2D` - Contains weights for 2D convolutional layers
/// - `Conv3D` - Contains weights for 3D convolutional layers
/// - `ConcreteDropout` - Contains the wrapped layer's weights plus the dropout logit
/// - `Empty` - Represents a layer with no trainable parameters
pub enum LayerWeight<'a> {
    Dense(DenseLayerWeight<'a>),
    Conv1D(Conv1DLayerWeight<'a>),
    Conv2D(Conv2DLayerWeight<'a>),
    Conv3D(Conv3DLayerWeight<'a>),
    ConcreteDropout(ConcreteDropoutLayerWeight<'a>),
    Empty,
}

impl<'a> LayerWeight<'a> {
    /// Returns the weight tensors of the layer in their canonical order.
    ///
    /// Kernel layers list `[kernel, bias]`. A Concrete Dropout wrapper lists the tensors of
    /// the layer it wraps followed by its dropout logit, so the logit is always the third entry
    /// for a wrapped Dense or convolutional layer.
    pub fn tensors(&self) -> Vec<ArrayViewD<'a, f32>> {
        match self {
            LayerWeight::Dense(w) => vec![w.weight.view().into_dyn(), w.bias.view().into_dyn()],
            LayerWeight::Conv1D(w) => vec![w.weight.view().into_dyn(), w.bias.view().into_dyn()],
            LayerWeight::Conv2D(w) => vec![w.weight.view().into_dyn(), w.bias.view().into_dyn()],
            LayerWeight::Conv3D(w) => vec![w.weight.view().into_dyn(), w.bias.view().into_dyn()],
            LayerWeight::ConcreteDropout(w) => {
                let mut tensors = w.layer.tensors();
                tensors.push(w.p_logit.view().into_dyn());
                tensors
            }
            LayerWeight::Empty => Vec::new(),
        }
    }
}

/// Weights for a dense (fully connected) neural network layer
///
/// # Fields
///
/// - `weight` - Weight matrix with shape (input_features, output_features)
/// - `bias` - Bias vector with shape (1, output_features)
pub struct DenseLayerWeight<'a> {
    pub weight: &'a Array2<f32>,
    pub bias: &'a Array2<f32>,
}

/// Weights for a 1D convolutional layer
///
/// # Fields
///
/// - `weight` - Kernel with shape (filters, channels, kernel_size)
/// - `bias` - Bias with shape (1, filters)
pub struct Conv1DLayerWeight<'a> {
    pub weight: &'a Array3<f32>,
    pub bias: &'a Array2<f32>,
}

/// Weights for a 2D convolutional layer
///
/// # Fields
///
/// - `weight` - Kernel with shape (filters, channels, kernel_height, kernel_width)
/// - `bias` - Bias with shape (1, filters)
pub struct Conv2DLayerWeight<'a> {
    pub weight: &'a Array4<f32>,
    pub bias: &'a Array2<f32>,
}

/// Weights for a 3D convolutional layer
///
/// # Fields
///
/// - `weight` - Kernel with shape (filters, channels, kernel_depth, kernel_height, kernel_width)
/// - `bias` - Bias with shape (1, filters)
pub struct Conv3DLayerWeight<'a> {
    pub weight: &'a Array5<f32>,
    pub bias: &'a Array2<f32>,
}

/// Weights of a Concrete Dropout wrapper
///
/// # Fields
///
/// - `layer` - Weights of the wrapped layer
/// - `p_logit` - The learnable dropout logit, a single-element array
/// - `config` - Hyperparameters of the wrapper, stored alongside the weights when saving
pub struct ConcreteDropoutLayerWeight<'a> {
    pub layer: Box<LayerWeight<'a>>,
    pub p_logit: &'a Array1<f32>,
    pub config: &'a ConcreteDropoutConfig,
}
