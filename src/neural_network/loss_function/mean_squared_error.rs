use crate::neural_network::Tensor;
use crate::neural_network::neural_network_trait::LossFunction;

/// Mean Squared Error loss function
///
/// `loss = mean((y_pred - y_true)^2)` over every element of the batch.
///
/// # Example
///
/// ```rust
/// use concrete_dropout::neural_network::loss_function::*;
/// use concrete_dropout::neural_network::LossFunction;
/// use ndarray::ArrayD;
///
/// let mse = MeanSquaredError::new();
///
/// let y_true = ArrayD::from_shape_vec(vec![3, 1], vec![1.0, 2.0, 3.0]).unwrap();
/// let y_pred = ArrayD::from_shape_vec(vec![3, 1], vec![1.0, 2.0, 5.0]).unwrap();
///
/// let loss = mse.compute_loss(&y_true, &y_pred);
/// assert!((loss - 4.0 / 3.0).abs() < 1e-6);
///
/// let gradients = mse.compute_grad(&y_true, &y_pred);
/// assert_eq!(gradients.shape(), &[3, 1]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSquaredError;

impl MeanSquaredError {
    /// Creates a new instance of MeanSquaredError
    pub fn new() -> Self {
        Self
    }
}

impl LossFunction for MeanSquaredError {
    fn compute_loss(&self, y_true: &Tensor, y_pred: &Tensor) -> f32 {
        if y_pred.is_empty() {
            return 0.0;
        }
        let mut squared_diff = y_pred - y_true;
        squared_diff.par_mapv_inplace(|x| x * x);
        squared_diff.sum() / squared_diff.len() as f32
    }

    fn compute_grad(&self, y_true: &Tensor, y_pred: &Tensor) -> Tensor {
        let n = y_pred.len().max(1) as f32;
        let mut result = y_pred - y_true;
        result.par_mapv_inplace(|x| 2.0 * x / n);
        result
    }
}
