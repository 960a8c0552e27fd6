/// Module that contains neural network layer implementations
pub mod layer;
/// Module that contains loss function implementations
pub mod loss_function;
/// Module that contains the traits shared by layers, losses and optimizers
pub mod neural_network_trait;
/// Module that contains optimization algorithms for neural network training
pub mod optimizer;
/// Module that contains implementations for sequential model architecture
pub mod sequential;

pub use layer::*;
pub use loss_function::*;
pub use neural_network_trait::*;
pub use optimizer::*;
pub use sequential::*;

pub use crate::error::{IoError, ModelError};
use ndarray::ArrayD;

/// Type alias for n-dimensional arrays used as tensors in the neural network
pub type Tensor = ArrayD<f32>;
