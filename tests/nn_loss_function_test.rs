#![cfg(feature = "neural_network")]

use approx::assert_abs_diff_eq;
use concrete_dropout::neural_network::loss_function::mean_absolute_error::MeanAbsoluteError;
use concrete_dropout::neural_network::loss_function::mean_squared_error::MeanSquaredError;
use concrete_dropout::neural_network::neural_network_trait::LossFunction;
use concrete_dropout::neural_network::Tensor;
use ndarray::{Array, IxDyn, array};

#[test]
fn test_mse_loss_and_gradient() {
    let y_true = array![[1.0f32, 2.0], [3.0, 4.0]].into_dyn();
    let y_pred = array![[1.5f32, 2.0], [2.0, 6.0]].into_dyn();
    let mse = MeanSquaredError::new();

    // (0.25 + 0 + 1 + 4) / 4
    assert_abs_diff_eq!(mse.compute_loss(&y_true, &y_pred), 1.3125, epsilon = 1e-6);

    let grad = mse.compute_grad(&y_true, &y_pred);
    assert_eq!(grad.shape(), &[2, 2]);
    assert_abs_diff_eq!(grad[[0, 0]], 0.25, epsilon = 1e-6);
    assert_abs_diff_eq!(grad[[0, 1]], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(grad[[1, 0]], -0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(grad[[1, 1]], 1.0, epsilon = 1e-6);
    println!("MSE gradient: {:?}", grad);
}

#[test]
fn test_mae_loss_and_gradient() {
    let y_true = array![[1.0f32, 2.0], [3.0, 4.0]].into_dyn();
    let y_pred = array![[1.5f32, 2.0], [2.0, 6.0]].into_dyn();
    let mae = MeanAbsoluteError::new();

    // (0.5 + 0 + 1 + 2) / 4
    assert_abs_diff_eq!(mae.compute_loss(&y_true, &y_pred), 0.875, epsilon = 1e-6);

    let grad = mae.compute_grad(&y_true, &y_pred);
    assert_abs_diff_eq!(grad[[0, 0]], 0.25, epsilon = 1e-6);
    assert_eq!(grad[[0, 1]], 0.0);
    assert_abs_diff_eq!(grad[[1, 0]], -0.25, epsilon = 1e-6);
    assert_abs_diff_eq!(grad[[1, 1]], 0.25, epsilon = 1e-6);
    println!("MAE gradient: {:?}", grad);
}

#[test]
fn test_losses_on_empty_input() {
    let empty: Tensor = Array::zeros(IxDyn(&[0, 3]));
    assert_eq!(MeanSquaredError::new().compute_loss(&empty, &empty), 0.0);
    assert_eq!(MeanAbsoluteError::new().compute_loss(&empty, &empty), 0.0);
    assert_eq!(MeanSquaredError::new().compute_grad(&empty, &empty).len(), 0);
    println!("Empty input gives zero loss");
}

#[test]
fn test_perfect_prediction_has_zero_loss() {
    let y = Array::from_shape_fn(IxDyn(&[3, 2, 4]), |idx| (idx[0] + idx[1] * idx[2]) as f32);
    let mse = MeanSquaredError::new();
    let mae = MeanAbsoluteError::new();
    assert_eq!(mse.compute_loss(&y, &y), 0.0);
    assert_eq!(mae.compute_loss(&y, &y), 0.0);
    assert!(mse.compute_grad(&y, &y).iter().all(|&g| g == 0.0));
    assert!(mae.compute_grad(&y, &y).iter().all(|&g| g == 0.0));
    println!("Perfect predictions give zero loss and gradient");
}
