use crate::neural_network::{LossFunction, Tensor};

/// Mean Absolute Error loss function
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAbsoluteError;

impl MeanAbsoluteError {
    /// Creates a new instance of MeanAbsoluteError
    pub fn new() -> Self {
        Self
    }
}

impl LossFunction for MeanAbsoluteError {
    fn compute_loss(&self, y_true: &Tensor, y_pred: &Tensor) -> f32 {
        if y_pred.is_empty() {
            return 0.0;
        }
        let mut diff = y_pred - y_true;
        diff.par_mapv_inplace(f32::abs);
        diff.sum() / diff.len() as f32
    }

    fn compute_grad(&self, y_true: &Tensor, y_pred: &Tensor) -> Tensor {
        let n = y_pred.len().max(1) as f32;
        let mut result = y_pred - y_true;
        // the subgradient at zero is taken as 0
        result.par_mapv_inplace(|x| x.signum() * f32::from(x != 0.0) / n);
        result
    }
}
