use super::*;
use serde::{Deserialize, Serialize};

/// Serializable weight container for all supported layer types.
///
/// Stored as internally tagged JSON: `{"type": "Dense", ...}`.
///
/// # Variants
///
/// - `Dense` - Weights for a Dense layer
/// - `Conv1D` - Weights for a Conv1D layer
/// - `Conv2D` - Weights for a Conv2D layer
/// - `Conv3D` - Weights for a Conv3D layer
/// - `ConcreteDropout` - Wrapped layer weights, dropout logit and hyperparameters
/// - `Empty` - No weights for layers without parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SerializableLayerWeight {
    Dense(SerializableDenseWeight),
    Conv1D(SerializableConvWeight),
    Conv2D(SerializableConvWeight),
    Conv3D(SerializableConvWeight),
    ConcreteDropout(SerializableConcreteDropoutWeight),
    Empty,
}

impl SerializableLayerWeight {
    /// Converts a `LayerWeight` reference into an owned serializable weight.
    ///
    /// # Parameters
    ///
    /// - `weight` - Layer weights to convert into a serializable form
    ///
    /// # Returns
    ///
    /// - `SerializableLayerWeight` - Serializable representation of the provided weights
    pub fn from_layer_weight(weight: &LayerWeight) -> Self {
        match weight {
            LayerWeight::Empty => SerializableLayerWeight::Empty,

            LayerWeight::Dense(w) => SerializableLayerWeight::Dense(SerializableDenseWeight {
                weight: w.weight.outer_iter().map(|row| row.to_vec()).collect(),
                bias: w.bias.outer_iter().map(|row| row.to_vec()).collect(),
            }),
            LayerWeight::Conv1D(w) => SerializableLayerWeight::Conv1D(
                SerializableConvWeight::from_arrays(w.weight, w.bias),
            ),
            LayerWeight::Conv2D(w) => SerializableLayerWeight::Conv2D(
                SerializableConvWeight::from_arrays(w.weight, w.bias),
            ),
            LayerWeight::Conv3D(w) => SerializableLayerWeight::Conv3D(
                SerializableConvWeight::from_arrays(w.weight, w.bias),
            ),
            LayerWeight::ConcreteDropout(w) => {
                SerializableLayerWeight::ConcreteDropout(SerializableConcreteDropoutWeight {
                    config: w.config.clone(),
                    p_logit: w.p_logit.to_vec(),
                    layer: Box::new(Self::from_layer_weight(&w.layer)),
                })
            }
        }
    }

    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            SerializableLayerWeight::Dense(_) => "Dense",
            SerializableLayerWeight::Conv1D(_) => "Conv1D",
            SerializableLayerWeight::Conv2D(_) => "Conv2D",
            SerializableLayerWeight::Conv3D(_) => "Conv3D",
            SerializableLayerWeight::ConcreteDropout(_) => "ConcreteDropout",
            SerializableLayerWeight::Empty => "Empty",
        }
    }
}

/// Serializable layer metadata.
///
/// # Fields
///
/// - `layer_type` - Layer type name
/// - `output_shape` - Layer output shape description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerInfo {
    pub layer_type: String,
    pub output_shape: String,
}

/// Serializable layer with metadata and weights.
///
/// # Fields
///
/// - `info` - Layer metadata describing type and output shape
/// - `weights` - Layer weights in a serializable format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableLayer {
    pub info: LayerInfo,
    pub weights: SerializableLayerWeight,
}

/// Serializable representation of a Sequential model.
///
/// # Fields
///
/// - `layers` - Ordered list of layers with metadata and weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableSequential {
    pub layers: Vec<SerializableLayer>,
}

/// Helper functions used by multiple weight types
mod helper_function;
/// Serializable representation of a Concrete Dropout wrapper
pub mod serializable_concrete_dropout_weight;
/// Serializable representation of the convolutional layers' weights
pub mod serializable_conv_weight;
/// Serializable representation of a Dense layer's weights
pub mod serializable_dense_weight;

use helper_function::*;
pub use serializable_concrete_dropout_weight::*;
pub use serializable_conv_weight::*;
pub use serializable_dense_weight::*;
