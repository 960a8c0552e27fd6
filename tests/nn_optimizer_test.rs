#![cfg(feature = "neural_network")]

use approx::assert_abs_diff_eq;
use concrete_dropout::neural_network::layer::activation_layer::linear::Linear;
use concrete_dropout::neural_network::layer::dense::Dense;
use concrete_dropout::neural_network::layer::regularization_layer::concrete_dropout::ConcreteDropout;
use concrete_dropout::neural_network::loss_function::mean_squared_error::MeanSquaredError;
use concrete_dropout::neural_network::neural_network_trait::Optimizer;
use concrete_dropout::neural_network::optimizer::adam::{Adam, AdamStates};
use concrete_dropout::neural_network::optimizer::rms_prop::{RMSprop, RMSpropCache};
use concrete_dropout::neural_network::optimizer::sgd::SGD;
use concrete_dropout::neural_network::optimizer::{OptimizerCache, ParameterState};
use concrete_dropout::neural_network::sequential::Sequential;
use ndarray::{Array, Ix1, Ix2, array};

#[test]
fn test_adam_new() {
    assert!(Adam::new(0.001, 0.9, 0.999, 1e-8).is_ok());

    // Invalid learning rate
    assert!(Adam::new(-0.001, 0.9, 0.999, 1e-8).is_err());
    assert!(Adam::new(0.0, 0.9, 0.999, 1e-8).is_err());
    assert!(Adam::new(f32::NAN, 0.9, 0.999, 1e-8).is_err());

    // Invalid decay rates
    assert!(Adam::new(0.001, -0.1, 0.999, 1e-8).is_err());
    assert!(Adam::new(0.001, 1.1, 0.999, 1e-8).is_err());
    assert!(Adam::new(0.001, 0.9, -0.999, 1e-8).is_err());
    assert!(Adam::new(0.001, 0.9, 1.5, 1e-8).is_err());

    // Invalid epsilon
    assert!(Adam::new(0.001, 0.9, 0.999, 0.0).is_err());
    assert!(Adam::new(0.001, 0.9, 0.999, -1e-8).is_err());
    println!("Adam constructor validation passed");
}

#[test]
fn test_rmsprop_and_sgd_new() {
    assert!(RMSprop::new(0.001, 0.9, 1e-8).is_ok());
    assert!(RMSprop::new(0.0, 0.9, 1e-8).is_err());
    assert!(RMSprop::new(0.001, 1.5, 1e-8).is_err());
    assert!(RMSprop::new(0.001, 0.9, 0.0).is_err());

    let sgd = SGD::new(0.1).unwrap();
    assert_eq!(sgd.learning_rate(), 0.1);
    assert!(SGD::new(-0.1).is_err());
    assert!(SGD::new(f32::INFINITY).is_err());
    println!("RMSprop and SGD constructor validation passed");
}

#[test]
fn test_sgd_update_parameter() {
    let mut param = array![1.0f32, 2.0, 3.0];
    let grad = array![0.5f32, -1.0, 0.0];
    SGD::update_parameter(&mut param, &grad, 0.1);
    assert_abs_diff_eq!(param[0], 0.95, epsilon = 1e-6);
    assert_abs_diff_eq!(param[1], 2.1, epsilon = 1e-6);
    assert_eq!(param[2], 3.0);

    let mut weights = array![[1.0f32, 1.0]];
    let mut bias = array![[0.0f32]];
    SGD::update_sgd_parameters(
        &mut weights,
        &array![[1.0f32, -1.0]],
        &mut bias,
        &array![[2.0f32]],
        0.5,
    );
    assert_eq!(weights, array![[0.5f32, 1.5]]);
    assert_eq!(bias, array![[-1.0f32]]);
    println!("SGD updates passed");
}

#[test]
fn test_adam_first_step_is_learning_rate() {
    // After bias correction the first step has magnitude lr in the direction of -sign(grad)
    let mut param = array![1.0f32, -2.0, 0.5];
    let grad = array![0.3f32, -4.0, 0.01];
    let mut states = AdamStates::new(param.raw_dim());
    states.update_parameter(&mut param, &grad, 0.9, 0.999, 1e-8, 1, 0.01);

    assert_abs_diff_eq!(param[0], 0.99, epsilon = 1e-5);
    assert_abs_diff_eq!(param[1], -1.99, epsilon = 1e-5);
    assert_abs_diff_eq!(param[2], 0.49, epsilon = 1e-4);
    assert_abs_diff_eq!(states.m[1], -0.4, epsilon = 1e-6);
    assert_abs_diff_eq!(states.v[1], 0.016, epsilon = 1e-6);
    println!("Adam states after one step: m={:?}, v={:?}", states.m, states.v);
}

#[test]
fn test_rmsprop_cache_update() {
    let mut param = array![[1.0f32, 1.0]];
    let grad = array![[2.0f32, 0.0]];
    let mut cache = RMSpropCache::new(param.raw_dim());
    cache.update_parameter(&mut param, &grad, 0.9, 0.01, 1e-8);

    // cache = 0.1 * g^2, step = lr * g / sqrt(cache)
    assert_abs_diff_eq!(cache.cache[[0, 0]], 0.4, epsilon = 1e-6);
    assert_abs_diff_eq!(param[[0, 0]], 1.0 - 0.01 * 2.0 / 0.4f32.sqrt(), epsilon = 1e-5);
    assert_eq!(param[[0, 1]], 1.0);
    println!("RMSprop cache: {:?}", cache.cache);
}

#[test]
fn test_parameter_state_is_lazy() {
    let mut state: ParameterState<Ix1> = ParameterState::new();
    assert!(state.is_empty());

    let mut param = array![1.0f32];
    state.rmsprop_step(&mut param, &array![1.0f32], 0.9, 0.01, 1e-8);
    assert!(!state.is_empty());

    // A parameter of another shape gets fresh state instead of panicking
    let mut bigger = array![1.0f32, 1.0];
    state.adam_step(&mut bigger, &array![1.0f32, 1.0], 0.01, 0.9, 0.999, 1e-8, 1);
    state.rmsprop_step(&mut bigger, &array![1.0f32, 1.0], 0.9, 0.01, 1e-8);

    state.clear();
    assert!(state.is_empty());

    let mut cache: OptimizerCache<Ix2> = OptimizerCache::default();
    let mut weights = Array::ones((2, 2));
    cache
        .weights
        .adam_step(&mut weights, &Array::ones((2, 2)), 0.1, 0.9, 0.999, 1e-8, 1);
    assert!(!cache.weights.is_empty());
    assert!(cache.bias.is_empty());
    cache.clear();
    assert!(cache.weights.is_empty());
    println!("Parameter state passed");
}

#[test]
fn test_adam_timestep_counts_updates() {
    let mut adam = Adam::new(0.001, 0.9, 0.999, 1e-8).unwrap();
    let mut dense = Dense::new(2, 1, Linear::new()).unwrap();
    adam.update(&mut dense);
    adam.update(&mut dense);
    assert_eq!(adam.timestep(), 2);
    println!("Adam timestep: {}", adam.timestep());
}

#[test]
fn test_every_optimizer_updates_p_logit() {
    let x = Array::from_shape_fn((8, 4), |(i, j)| ((i + 2 * j) % 5) as f32 * 0.25).into_dyn();
    let y = Array::ones((8, 1)).into_dyn();

    let train = |model: &mut Sequential| {
        let initial = model.weight_list()[2][[0]];
        model.fit(&x, &y, 5).unwrap();
        let trained = model.weight_list()[2][[0]];
        assert!(trained.is_finite());
        assert_ne!(initial, trained);
    };

    let wrapper = || ConcreteDropout::new(Dense::new(4, 1, Linear::new()).unwrap(), 8).unwrap();

    let mut sgd_model = Sequential::new();
    sgd_model
        .add(wrapper())
        .compile(SGD::new(0.05).unwrap(), MeanSquaredError::new());
    train(&mut sgd_model);

    let mut adam_model = Sequential::new();
    adam_model.add(wrapper()).compile(
        Adam::new(0.01, 0.9, 0.999, 1e-8).unwrap(),
        MeanSquaredError::new(),
    );
    train(&mut adam_model);

    let mut rmsprop_model = Sequential::new();
    rmsprop_model.add(wrapper()).compile(
        RMSprop::new(0.01, 0.9, 1e-8).unwrap(),
        MeanSquaredError::new(),
    );
    train(&mut rmsprop_model);

    println!("SGD, Adam and RMSprop all update p_logit");
}
