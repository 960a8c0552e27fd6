#![cfg(feature = "neural_network")]

use concrete_dropout::neural_network::layer::PaddingType;
use concrete_dropout::neural_network::layer::TrainingParameters;
use concrete_dropout::neural_network::layer::activation_layer::relu::ReLU;
use concrete_dropout::neural_network::layer::activation_layer::sigmoid::Sigmoid;
use concrete_dropout::neural_network::layer::convolution_layer::conv_3d::Conv3D;
use concrete_dropout::neural_network::loss_function::mean_squared_error::MeanSquaredError;
use concrete_dropout::neural_network::neural_network_trait::Layer;
use concrete_dropout::neural_network::optimizer::sgd::SGD;
use concrete_dropout::neural_network::sequential::Sequential;
use ndarray::Array5;

#[test]
fn test_conv3d_sequential_with_sgd() {
    // Create a 5D input tensor: [batch_size, channels, depth, height, width]
    let x = Array5::ones((2, 1, 8, 8, 8)).into_dyn();
    // Valid padding gives 6x6x6
    let y = Array5::ones((2, 3, 6, 6, 6)).into_dyn();

    let mut model = Sequential::new();
    model
        .add(
            Conv3D::new(
                3,                   // filters
                (3, 3, 3),           // kernel_size
                vec![2, 1, 8, 8, 8], // input_shape
                (1, 1, 1),           // stride
                PaddingType::Valid,  // padding
                ReLU::new(),         // activation
            )
            .unwrap(),
        )
        .compile(SGD::new(0.01).unwrap(), MeanSquaredError::new());

    model.summary();

    let result = model.fit(&x, &y, 3);
    assert!(result.is_ok());

    let prediction = model.predict(&x).unwrap();
    assert_eq!(prediction.shape(), &[2, 3, 6, 6, 6]);

    for value in prediction.iter() {
        assert!(*value >= 0.0);
    }
    println!("Conv3D prediction shape: {:?}", prediction.shape());
}

#[test]
fn test_conv3d_different_strides() {
    let x = Array5::ones((1, 1, 10, 10, 10)).into_dyn();

    let mut model = Sequential::new();
    model
        .add(
            Conv3D::new(
                1,
                (3, 3, 3),
                vec![1, 1, 10, 10, 10],
                (2, 2, 2), // stride = 2
                PaddingType::Valid,
                ReLU::new(),
            )
            .unwrap(),
        )
        .compile(SGD::new(0.01).unwrap(), MeanSquaredError::new());

    let prediction = model.predict(&x).unwrap();
    assert_eq!(prediction.shape(), &[1, 1, 4, 4, 4]);
    println!("Conv3D strided prediction shape: {:?}", prediction.shape());
}

#[test]
fn test_conv3d_multiple_channels_training() {
    let x = Array5::from_shape_fn((2, 3, 6, 6, 6), |(b, c, d, h, w)| {
        (b + c + d + h + w) as f32 * 0.05
    })
    .into_dyn();
    let y = Array5::from_elem((2, 2, 4, 4, 4), 0.5).into_dyn();

    let conv = Conv3D::new(
        2,
        (3, 3, 3),
        vec![2, 3, 6, 6, 6],
        (1, 1, 1),
        PaddingType::Valid,
        Sigmoid::new(),
    )
    .unwrap();
    // 2 * 3 * 27 weights + 2 biases
    assert_eq!(conv.param_count(), TrainingParameters::Trainable(164));

    let mut model = Sequential::new();
    model
        .add(conv)
        .compile(SGD::new(0.05).unwrap(), MeanSquaredError::new());

    let before = model.evaluate(&x, Some(&y)).unwrap();
    model.fit(&x, &y, 30).unwrap();
    let after = model.evaluate(&x, Some(&y)).unwrap();

    assert!(after < before, "loss went from {} to {}", before, after);
    println!("Conv3D loss {} -> {}", before, after);
}

#[test]
fn test_conv3d_same_padding() {
    let mut conv = Conv3D::new(
        2,
        (3, 3, 3),
        vec![1, 1, 5, 5, 5],
        (1, 1, 1),
        PaddingType::Same,
        ReLU::new(),
    )
    .unwrap();
    let x = Array5::<f32>::ones((1, 1, 5, 5, 5)).into_dyn();
    let output = conv.forward(&x).unwrap();
    assert_eq!(output.shape(), &[1, 2, 5, 5, 5]);
    assert_eq!(conv.output_shape(), "(None, 2, 5, 5, 5)");

    let grad = conv.backward(&output).unwrap();
    assert_eq!(grad.shape(), &[1, 1, 5, 5, 5]);
    println!("Conv3D same padding passed");
}
