use super::input_validation_function::{validate_decay_rate, validate_epsilon, validate_learning_rate};
use crate::error::ModelError;
use crate::neural_network::{Layer, Optimizer};
use ndarray::{Array, Dimension, Zip};

/// Adam optimizer implementation.
///
/// An optimization algorithm that computes individual adaptive learning
/// rates for different parameters from estimates of first and second moments
/// of the gradients.
///
/// # Fields
///
/// - `learning_rate` - Learning rate controlling the size of parameter updates
/// - `beta1` - Exponential decay rate for the first moment estimates
/// - `beta2` - Exponential decay rate for the second moment estimates
/// - `epsilon` - Small constant added for numerical stability
/// - `t` - Current timestep, incremented with each layer update
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
}

impl Adam {
    /// Creates a new Adam optimizer with the specified parameters.
    ///
    /// # Parameters
    ///
    /// - `learning_rate` - Step size for parameter updates
    /// - `beta1` - Decay rate for the first moment estimates (typically 0.9)
    /// - `beta2` - Decay rate for the second moment estimates (typically 0.999)
    /// - `epsilon` - Small constant for numerical stability (typically 1e-8)
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - A new Adam optimizer instance
    /// - `Err(ModelError::InputValidationError)` - If any hyperparameter is out of range
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Result<Self, ModelError> {
        validate_learning_rate(learning_rate)?;
        validate_decay_rate(beta1, "beta1")?;
        validate_decay_rate(beta2, "beta2")?;
        validate_epsilon(epsilon)?;

        Ok(Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
        })
    }

    /// Returns the number of updates performed so far.
    pub fn timestep(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn update(&mut self, layer: &mut dyn Layer) {
        self.t += 1;
        layer.update_parameters_adam(
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            self.t,
        );
    }
}

/// First and second moment estimates of one parameter tensor.
///
/// # Fields
///
/// - `m` - Moving average of gradients
/// - `v` - Moving average of squared gradients
#[derive(Debug, Clone)]
pub struct AdamStates<D: Dimension> {
    pub m: Array<f32, D>,
    pub v: Array<f32, D>,
}

impl<D: Dimension> AdamStates<D> {
    /// Creates zeroed moment estimates for a parameter of shape `dim`.
    pub fn new(dim: D) -> Self {
        Self {
            m: Array::zeros(dim.clone()),
            v: Array::zeros(dim),
        }
    }

    /// Updates the moment estimates with `grad` and applies the bias-corrected step to `param`.
    ///
    /// # Parameters
    ///
    /// - `param` - Parameter tensor updated in place
    /// - `grad` - Gradient of the parameter
    /// - `beta1` - Exponential decay rate for first moment estimates
    /// - `beta2` - Exponential decay rate for second moment estimates
    /// - `epsilon` - Small constant added for numerical stability
    /// - `t` - Current timestep, starting at 1
    /// - `lr` - Learning rate
    pub fn update_parameter(
        &mut self,
        param: &mut Array<f32, D>,
        grad: &Array<f32, D>,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
        t: u64,
        lr: f32,
    ) {
        let t = t.max(1).min(i32::MAX as u64) as i32;
        let m_correction = 1.0 - beta1.powi(t);
        let v_correction = 1.0 - beta2.powi(t);

        Zip::from(param)
            .and(&mut self.m)
            .and(&mut self.v)
            .and(grad)
            .par_for_each(|p, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / m_correction;
                let v_hat = *v / v_correction;
                *p -= lr * m_hat / (v_hat.sqrt() + epsilon);
            });
    }
}
