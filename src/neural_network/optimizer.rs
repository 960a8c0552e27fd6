use ndarray::{Array, Dimension, Ix2};

/// Adam optimizer and its per-parameter moment estimates
pub mod adam;
/// Hyperparameter checks shared by the optimizer constructors
mod input_validation_function;
/// RMSprop optimizer and its per-parameter squared-gradient average
pub mod rms_prop;
/// Stochastic gradient descent
pub mod sgd;

pub use adam::*;
pub use rms_prop::*;
pub use sgd::*;

/// Optimizer state attached to a single parameter tensor.
///
/// The state for a given algorithm is created lazily on its first step, so a layer trained
/// with SGD never allocates moment buffers. A stored state whose shape no longer matches
/// the parameter (after `set_weights` with a new shape, for example) is rebuilt from zeros.
///
/// # Fields
///
/// - `adam` - First and second moment estimates, present once Adam has stepped this parameter
/// - `rmsprop` - Moving average of squared gradients, present once RMSprop has stepped this parameter
#[derive(Debug, Clone)]
pub struct ParameterState<D: Dimension> {
    adam: Option<AdamStates<D>>,
    rmsprop: Option<RMSpropCache<D>>,
}

impl<D: Dimension> Default for ParameterState<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dimension> ParameterState<D> {
    pub fn new() -> Self {
        Self {
            adam: None,
            rmsprop: None,
        }
    }

    /// Applies one Adam step to `param` in place.
    pub fn adam_step(
        &mut self,
        param: &mut Array<f32, D>,
        grad: &Array<f32, D>,
        lr: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
        t: u64,
    ) {
        if self
            .adam
            .as_ref()
            .is_none_or(|states| states.m.raw_dim() != param.raw_dim())
        {
            self.adam = Some(AdamStates::new(param.raw_dim()));
        }
        if let Some(states) = &mut self.adam {
            states.update_parameter(param, grad, beta1, beta2, epsilon, t, lr);
        }
    }

    /// Applies one RMSprop step to `param` in place.
    pub fn rmsprop_step(
        &mut self,
        param: &mut Array<f32, D>,
        grad: &Array<f32, D>,
        rho: f32,
        lr: f32,
        epsilon: f32,
    ) {
        if self
            .rmsprop
            .as_ref()
            .is_none_or(|cache| cache.cache.raw_dim() != param.raw_dim())
        {
            self.rmsprop = Some(RMSpropCache::new(param.raw_dim()));
        }
        if let Some(cache) = &mut self.rmsprop {
            cache.update_parameter(param, grad, rho, lr, epsilon);
        }
    }

    /// Returns `true` if no optimizer has stepped this parameter since the last `clear`.
    pub fn is_empty(&self) -> bool {
        self.adam.is_none() && self.rmsprop.is_none()
    }

    /// Drops all accumulated optimizer state.
    pub fn clear(&mut self) {
        self.adam = None;
        self.rmsprop = None;
    }
}

/// Optimizer state of a layer with a kernel of dimension `D` and a `[1, units]` bias.
#[derive(Debug, Clone)]
pub struct OptimizerCache<D: Dimension> {
    pub weights: ParameterState<D>,
    pub bias: ParameterState<Ix2>,
}

impl<D: Dimension> Default for OptimizerCache<D> {
    fn default() -> Self {
        Self {
            weights: ParameterState::new(),
            bias: ParameterState::new(),
        }
    }
}

impl<D: Dimension> OptimizerCache<D> {
    pub fn clear(&mut self) {
        self.weights.clear();
        self.bias.clear();
    }
}
