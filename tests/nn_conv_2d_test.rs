#![cfg(feature = "neural_network")]

use concrete_dropout::neural_network::layer::PaddingType;
use concrete_dropout::neural_network::layer::activation_layer::linear::Linear;
use concrete_dropout::neural_network::layer::activation_layer::relu::ReLU;
use concrete_dropout::neural_network::layer::activation_layer::sigmoid::Sigmoid;
use concrete_dropout::neural_network::layer::convolution_layer::conv_2d::Conv2D;
use concrete_dropout::neural_network::loss_function::mean_squared_error::MeanSquaredError;
use concrete_dropout::neural_network::neural_network_trait::{KernelLayer, Layer};
use concrete_dropout::neural_network::optimizer::adam::Adam;
use concrete_dropout::neural_network::optimizer::rms_prop::RMSprop;
use concrete_dropout::neural_network::sequential::Sequential;
use concrete_dropout::neural_network::{InputLayout, Tensor};
use ndarray::{Array2, Array4};

#[test]
fn conv2d_test() {
    // Batch size=2, 1 input channel, 5x5 pixels
    let x = Array4::ones((2, 1, 5, 5)).into_dyn();

    // 3 filters with output size 3x3
    let y = Array4::ones((2, 3, 3, 3)).into_dyn();

    let mut model = Sequential::new();
    model
        .add(
            Conv2D::new(
                3,                  // Number of filters
                (3, 3),             // Kernel size
                vec![2, 1, 5, 5],   // Input shape
                (1, 1),             // Stride
                PaddingType::Valid, // No padding
                ReLU::new(),        // ReLU activation function
            )
            .unwrap(),
        )
        .compile(
            RMSprop::new(0.001, 0.9, 1e-8).unwrap(),
            MeanSquaredError::new(),
        );

    model.summary();
    model.fit(&x, &y, 3).unwrap();

    let prediction = model.predict(&x).unwrap();
    assert_eq!(prediction.shape(), &[2, 3, 3, 3]);

    // Different padding strategy and stride
    let mut model2 = Sequential::new();
    model2
        .add(
            Conv2D::new(
                2,                 // Number of filters
                (3, 3),            // Kernel size
                vec![2, 1, 5, 5],  // Input shape
                (2, 2),            // Larger stride
                PaddingType::Same, // Same padding
                Sigmoid::new(),    // Sigmoid activation function
            )
            .unwrap(),
        )
        .compile(
            Adam::new(0.001, 0.9, 0.999, 1e-8).unwrap(),
            MeanSquaredError::new(),
        );

    // Same padding with stride (2, 2) gives 3x3
    let y2 = Array4::ones((2, 2, 3, 3)).into_dyn();
    model2.fit(&x, &y2, 3).unwrap();

    let prediction2 = model2.predict(&x).unwrap();
    println!(
        "Convolution layer prediction results (Same padding, stride 2): {:?}",
        prediction2
    );
    assert_eq!(prediction2.shape(), &[2, 2, 3, 3]);
}

#[test]
fn test_conv2d_any_batch_size() {
    let mut conv = Conv2D::new(
        2,
        (3, 3),
        vec![4, 3, 10, 10],
        (1, 1),
        PaddingType::Valid,
        ReLU::new(),
    )
    .unwrap();

    for batch_size in [1, 4, 60] {
        let x = Array4::<f32>::ones((batch_size, 3, 10, 10)).into_dyn();
        let output = conv.forward(&x).unwrap();
        assert_eq!(output.shape(), &[batch_size, 2, 8, 8]);
    }
    println!("Conv2D accepts any batch size");
}

#[test]
fn test_conv2d_gradients_match_finite_differences() {
    let mut conv = Conv2D::new(
        1,
        (2, 2),
        vec![1, 1, 3, 3],
        (1, 1),
        PaddingType::Same,
        Linear::new(),
    )
    .unwrap();
    conv.set_weights(
        Array4::from_shape_vec((1, 1, 2, 2), vec![0.5, -0.25, 0.75, 0.1]).unwrap(),
        Array2::zeros((1, 1)),
    )
    .unwrap();

    let x = Array4::from_shape_fn((1, 1, 3, 3), |(_, _, h, w)| (h * 3 + w) as f32 * 0.1).into_dyn();

    // Loss = sum(output), so the upstream gradient is all ones
    let output = conv.forward(&x).unwrap();
    let grad_input = conv.backward(&Tensor::ones(output.raw_dim())).unwrap();
    assert_eq!(grad_input.shape(), x.shape());

    let h = 1e-2;
    for index in [[0, 0, 0, 0], [0, 0, 1, 1], [0, 0, 2, 1]] {
        let mut plus = x.clone();
        plus[index] += h;
        let mut minus = x.clone();
        minus[index] -= h;
        let numeric = (conv.forward(&plus).unwrap().sum() - conv.forward(&minus).unwrap().sum())
            / (2.0 * h);
        assert!(
            (numeric - grad_input[index]).abs() < 1e-3,
            "numeric {} vs analytic {} at {:?}",
            numeric,
            grad_input[index],
            index
        );
    }
    println!("Conv2D input gradient: {:?}", grad_input);
}

#[test]
fn test_conv2d_kernel_layer_capability() {
    let mut conv = Conv2D::new(
        4,
        (3, 3),
        vec![1, 2, 6, 6],
        (1, 1),
        PaddingType::Valid,
        ReLU::new(),
    )
    .unwrap();
    conv.set_weights(Array4::from_elem((4, 2, 3, 3), 0.5), Array2::zeros((1, 4)))
        .unwrap();

    assert_eq!(conv.kernel().shape(), &[4, 2, 3, 3]);
    assert!((conv.kernel_sum_of_squares() - 72.0 * 0.25).abs() < 1e-4);
    assert_eq!(
        conv.input_layout(),
        InputLayout::Spatial {
            channels: 2,
            spatial_rank: 2
        }
    );

    // Wrong kernel shape is rejected
    assert!(
        conv.set_weights(Array4::zeros((4, 3, 3, 3)), Array2::zeros((1, 4)))
            .is_err()
    );
    println!("Conv2D kernel capability passed");
}
