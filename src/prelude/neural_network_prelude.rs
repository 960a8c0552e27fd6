pub use crate::neural_network::Tensor;
pub use crate::neural_network::layer::activation_layer::*;
pub use crate::neural_network::layer::convolution_layer::*;
pub use crate::neural_network::layer::layer_weight::*;
pub use crate::neural_network::layer::regularization_layer::{
    ConcreteDropout, ConcreteDropoutConfig, EntropyScale, LogitInit,
};
pub use crate::neural_network::layer::{Dense, PaddingType, TrainingParameters};
pub use crate::neural_network::loss_function::*;
pub use crate::neural_network::neural_network_trait::*;
pub use crate::neural_network::optimizer::*;
pub use crate::neural_network::sequential::Sequential;
