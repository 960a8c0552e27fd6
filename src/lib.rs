//! Concrete Dropout for ndarray neural networks.
//!
//! The crate provides [`ConcreteDropout`](neural_network::layer::regularization_layer::ConcreteDropout),
//! a wrapper that learns the dropout rate of the layer it wraps through a continuous relaxation of
//! the Bernoulli mask, together with the dense and convolutional layers it can wrap, a sequential
//! model that collects auxiliary regularization losses, and the usual optimizers.
//!
//! # Example
//! ```rust
//! use concrete_dropout::prelude::*;
//! use ndarray::Array2;
//!
//! let dense = Dense::new(20, 1, Linear::new()).unwrap();
//! let config = ConcreteDropoutConfig::from_data_size(20)
//!     .unwrap()
//!     .with_prob_init(0.1, 0.1);
//! let wrapper = ConcreteDropout::with_config(dense, config).unwrap();
//!
//! let mut model = Sequential::new();
//! model
//!     .add(wrapper)
//!     .compile_without_loss(RMSprop::new(0.001, 0.9, 1e-7).unwrap());
//!
//! let x = Array2::<f32>::ones((1, 20)).into_dyn();
//! assert_eq!(model.losses().len(), 1);
//! let loss = model.evaluate(&x, None).unwrap();
//! assert!(loss.is_finite());
//! ```

/// Module that contains error types
pub mod error;

pub use error::{IoError, ModelError};

/// Module that contains the neural network building blocks
#[cfg(feature = "neural_network")]
pub mod neural_network;

/// Convenience re-exports
pub mod prelude;
