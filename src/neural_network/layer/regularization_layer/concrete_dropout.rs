use super::*;
use crate::neural_network::layer::activation_layer::stable_sigmoid;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::{Rng, SeedableRng};

/// Clamp applied to the dropout probability and inside every logarithm.
const EPSILON: f32 = 1e-7;

/// Noise tensors with at least this many elements build their mask in parallel.
const CONCRETE_DROPOUT_PARALLEL_THRESHOLD: usize = 10_000;

/// Relaxed mask of the last training-mode forward pass.
///
/// `z` and `keep` have the noise shape; `input` is the unmasked input, needed for
/// the gradient of the data loss with respect to the dropout probability.
struct MaskCache {
    input: Tensor,
    z: Tensor,
    keep: Tensor,
}

/// Concrete Dropout wrapper around a Dense or convolutional layer.
///
/// The wrapper learns the dropout probability `p = sigmoid(p_logit)` of the input of the layer it
/// wraps. In training mode every input unit is multiplied by a relaxed Bernoulli keep mask
///
/// ```text
/// z    = sigmoid((ln(p) - ln(1 - p) + ln(u) - ln(1 - u)) / temperature),  u ~ U(0, 1)
/// keep = (1 - z) / (1 - p)
/// ```
///
/// which is differentiable in `p`, so `p_logit` is trained by the optimizer together with the
/// wrapped layer's kernel and bias. Dense inputs get one noise value per element. Convolutional
/// inputs get one noise value per `(sample, channel)` that is shared by every spatial position,
/// so whole feature maps are dropped. In inference mode the input is passed through unchanged.
///
/// The wrapper contributes a single regularization loss, independent of the batch:
///
/// ```text
/// weight_regularizer * sum(W^2) / (1 - p) + dropout_regularizer * scale * (p ln p + (1 - p) ln(1 - p))
/// ```
///
/// # Fields
///
/// - `layer` - The wrapped layer
/// - `name` - Type name reported in summaries, e.g. `ConcreteDropout(Dense)`
/// - `config` - Hyperparameters the wrapper was built with
/// - `layout` - Layout of the wrapped layer's input
/// - `entropy_scale` - Resolved multiplier of the entropy term
/// - `p_logit` - The learnable dropout logit, a single-element array
/// - `p_logit_gradient` - Gradient of the total loss with respect to `p_logit`
/// - `p_logit_state` - Optimizer state of `p_logit`
/// - `rng` - Noise generator
/// - `training` - Whether the layer is in training mode
/// - `mask_cache` - Mask of the last training-mode forward pass
///
/// # Example
/// ```rust
/// use concrete_dropout::prelude::*;
/// use ndarray::Array2;
///
/// let dense = Dense::new(20, 1, Linear::new()).unwrap();
/// let config = ConcreteDropoutConfig::from_data_size(20)
///     .unwrap()
///     .with_prob_init(0.1, 0.1);
/// let mut wrapper = ConcreteDropout::with_config(dense, config).unwrap();
///
/// assert!((wrapper.p_logit() - 0.1f32.ln()).abs() < 1e-6);
/// assert_eq!(wrapper.losses().len(), 1);
///
/// let x = Array2::<f32>::ones((4, 20)).into_dyn();
/// let y = wrapper.forward(&x).unwrap();
/// assert_eq!(y.shape(), &[4, 1]);
/// ```
pub struct ConcreteDropout<L: KernelLayer> {
    layer: L,
    name: String,
    config: ConcreteDropoutConfig,
    layout: InputLayout,
    entropy_scale: f32,
    p_logit: Array1<f32>,
    p_logit_gradient: Option<Array1<f32>>,
    p_logit_state: ParameterState<Ix1>,
    rng: StdRng,
    training: bool,
    mask_cache: Option<MaskCache>,
}

impl<L: KernelLayer> ConcreteDropout<L> {
    /// Wraps `layer` with the default hyperparameters for a training set of `n_data` samples.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `n_data` is 0
    pub fn new(layer: L, n_data: usize) -> Result<Self, ModelError> {
        Self::with_config(layer, ConcreteDropoutConfig::from_data_size(n_data)?)
    }

    /// Wraps `layer` with explicit hyperparameters.
    ///
    /// The initial `p_logit` is drawn uniformly between the images of `prob_init.0` and
    /// `prob_init.1` under the configured [`LogitInit`]; equal bounds give a fixed value.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If the configuration is invalid, or the wrapped
    ///   layer's input is neither `[batch, features]` nor channels-first with 1 to 3 spatial axes
    pub fn with_config(layer: L, config: ConcreteDropoutConfig) -> Result<Self, ModelError> {
        config.validate()?;

        let layout = layer.input_layout();
        if let InputLayout::Spatial { spatial_rank, .. } = layout {
            if !(1..=3).contains(&spatial_rank) {
                return Err(ModelError::InputValidationError(format!(
                    "ConcreteDropout supports 1 to 3 spatial dimensions, got {}",
                    spatial_rank
                )));
            }
        }

        let entropy_scale = resolve_entropy_scale(config.entropy_scale, layout);

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let low = config.logit_init.logit(config.prob_init.0);
        let high = config.logit_init.logit(config.prob_init.1);
        let initial_logit = if low < high {
            rng.gen_range(low..high)
        } else {
            low
        };

        let name = format!("ConcreteDropout({})", layer.layer_type());
        log::debug!(
            "{}: p_logit={:.5}, entropy_scale={}, weight_regularizer={:e}, dropout_regularizer={:e}",
            name,
            initial_logit,
            entropy_scale,
            config.weight_regularizer,
            config.dropout_regularizer
        );

        Ok(Self {
            layer,
            name,
            config,
            layout,
            entropy_scale,
            p_logit: Array1::from_elem(1, initial_logit),
            p_logit_gradient: None,
            p_logit_state: ParameterState::new(),
            rng,
            training: true,
            mask_cache: None,
        })
    }

    mode_dependent_layer_set_training!();

    /// Returns the wrapped layer.
    pub fn inner(&self) -> &L {
        &self.layer
    }

    /// Returns the wrapped layer mutably.
    pub fn inner_mut(&mut self) -> &mut L {
        &mut self.layer
    }

    /// Unwraps the layer, discarding the dropout parameters.
    pub fn into_inner(self) -> L {
        self.layer
    }

    pub fn config(&self) -> &ConcreteDropoutConfig {
        &self.config
    }

    /// Replaces the hyperparameters and re-resolves the entropy scale.
    ///
    /// The noise generator keeps running, so the `seed` of `config` is ignored and the
    /// current seed stays on record. `p_logit` is left untouched.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `config` is invalid
    pub fn set_config(&mut self, mut config: ConcreteDropoutConfig) -> Result<(), ModelError> {
        config.validate()?;
        config.seed = self.config.seed;
        self.entropy_scale = resolve_entropy_scale(config.entropy_scale, self.layout);
        self.config = config;
        Ok(())
    }

    /// Multiplier of the entropy term after resolving [`EntropyScale`].
    pub fn entropy_scale(&self) -> f32 {
        self.entropy_scale
    }

    pub fn p_logit(&self) -> f32 {
        self.p_logit[0]
    }

    /// Overwrites the dropout logit. Non-finite values are ignored.
    pub fn set_p_logit(&mut self, value: f32) {
        if value.is_finite() {
            self.p_logit[0] = value;
        } else {
            log::warn!("{}: ignoring non-finite p_logit {}", self.name, value);
        }
    }

    /// Current dropout probability `sigmoid(p_logit)`, clamped to `[1e-7, 1 - 1e-7]`.
    pub fn dropout_probability(&self) -> f32 {
        stable_sigmoid(self.p_logit[0]).clamp(EPSILON, 1.0 - EPSILON)
    }

    /// Keep mask `(1 - z) / (1 - p)` of the last training-mode forward pass, in noise shape.
    pub fn last_mask(&self) -> Option<&Tensor> {
        self.mask_cache.as_ref().map(|cache| &cache.keep)
    }

    /// The regularization loss for the current parameters.
    ///
    /// `weight_regularizer * sum(W^2) / (1 - p) + dropout_regularizer * scale * (p ln p + (1 - p) ln(1 - p))`
    pub fn regularization_loss(&self) -> f32 {
        let p = self.dropout_probability();
        let kernel_term =
            self.config.weight_regularizer * self.layer.kernel_sum_of_squares() / (1.0 - p);
        let entropy = p * p.ln() + (1.0 - p) * (1.0 - p).ln();
        kernel_term + self.config.dropout_regularizer * self.entropy_scale * entropy
    }

    /// Shape of the uniform noise for an input of shape `input_shape`.
    ///
    /// Flat inputs draw one value per element; spatial inputs draw one per `(sample, channel)`.
    fn noise_shape(&self, input_shape: &[usize]) -> Vec<usize> {
        match self.layout {
            InputLayout::Flat { .. } => input_shape.to_vec(),
            InputLayout::Spatial { spatial_rank, .. } => {
                let mut shape = input_shape[..2].to_vec();
                shape.extend(std::iter::repeat_n(1, spatial_rank));
                shape
            }
        }
    }

    /// Samples the relaxed mask: returns `(z, keep)`, both in noise shape.
    fn sample_mask(&mut self, noise_shape: &[usize], p: f32) -> (Tensor, Tensor) {
        let noise = Tensor::random_using(
            IxDyn(noise_shape),
            Uniform::new(0.0f32, 1.0),
            &mut self.rng,
        );
        let temperature = self.config.temperature;
        let p_logit = (p + EPSILON).ln() - (1.0 - p + EPSILON).ln();
        let relax = |u: f32| {
            let u_logit = (u + EPSILON).ln() - (1.0 - u + EPSILON).ln();
            stable_sigmoid((p_logit + u_logit) / temperature)
        };

        let mut z = noise;
        if z.len() >= CONCRETE_DROPOUT_PARALLEL_THRESHOLD {
            z.par_mapv_inplace(relax);
        } else {
            z.mapv_inplace(relax);
        }
        let keep = z.mapv(|z| (1.0 - z) / (1.0 - p));
        (z, keep)
    }

    fn validate_input(&self, input: &Tensor) -> Result<(), ModelError> {
        if input.ndim() != self.layout.ndim() || input.shape()[1] != self.layout.units() {
            let expected = match self.layout {
                InputLayout::Flat { features } => format!("[batch_size, {}]", features),
                InputLayout::Spatial {
                    channels,
                    spatial_rank,
                } => format!("[batch_size, {}, {} spatial dims]", channels, spatial_rank),
            };
            return Err(ModelError::InputValidationError(format!(
                "{} expects input of shape {}, got {:?}",
                self.name,
                expected,
                input.shape()
            )));
        }
        Ok(())
    }

    /// Gradient of the regularization loss with respect to `p`.
    fn regularization_grad_p(&self, p: f32) -> f32 {
        let kernel_term = self.config.weight_regularizer * self.layer.kernel_sum_of_squares()
            / ((1.0 - p) * (1.0 - p));
        let entropy_term =
            self.config.dropout_regularizer * self.entropy_scale * (p.ln() - (1.0 - p).ln());
        kernel_term + entropy_term
    }

    /// Restores `previous` if an optimizer step made `p_logit` non-finite.
    fn guard_p_logit(&mut self, previous: f32) {
        if !self.p_logit[0].is_finite() {
            log::warn!(
                "{}: optimizer produced a non-finite p_logit, keeping {}",
                self.name,
                previous
            );
            self.p_logit[0] = previous;
        }
    }
}

impl<L: KernelLayer> Layer for ConcreteDropout<L> {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        self.validate_input(input)?;

        if !self.training {
            self.mask_cache = None;
            return self.layer.forward(input);
        }

        let p = self.dropout_probability();
        let noise_shape = self.noise_shape(input.shape());
        let (z, keep) = self.sample_mask(&noise_shape, p);
        let dropped = input * &keep;

        self.mask_cache = Some(MaskCache {
            input: input.clone(),
            z,
            keep,
        });

        self.layer.forward(&dropped)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let grad_dropped = self.layer.backward(grad_output)?;

        let p = self.dropout_probability();
        self.layer
            .add_kernel_gradient(2.0 * self.config.weight_regularizer / (1.0 - p));
        let mut grad_p = self.regularization_grad_p(p);

        let grad_input = match &self.mask_cache {
            Some(cache) if self.training => {
                if cache.input.shape() != grad_dropped.shape() {
                    return Err(ModelError::ProcessingError(format!(
                        "Gradient shape {:?} does not match input shape {:?}",
                        grad_dropped.shape(),
                        cache.input.shape()
                    )));
                }

                // d keep / d p for every noise element
                let temperature = self.config.temperature;
                let dlogit_dp = 1.0 / (p + EPSILON) + 1.0 / (1.0 - p + EPSILON);
                let mut dkeep_dp = cache.z.clone();
                Zip::from(&mut dkeep_dp)
                    .and(&cache.keep)
                    .for_each(|d, &keep| {
                        let z = *d;
                        *d = -z * (1.0 - z) / temperature * dlogit_dp / (1.0 - p)
                            + keep / (1.0 - p);
                    });

                let dkeep_dp = dkeep_dp.broadcast(cache.input.raw_dim()).ok_or_else(|| {
                    ModelError::ProcessingError(
                        "Mask cannot be broadcast to the input shape".to_string(),
                    )
                })?;
                grad_p += Zip::from(&grad_dropped)
                    .and(&cache.input)
                    .and(&dkeep_dp)
                    .fold(0.0, |acc, &g, &x, &d| acc + g * x * d);

                grad_dropped * &cache.keep
            }
            _ => grad_dropped,
        };

        self.p_logit_gradient = Some(Array1::from_elem(1, grad_p * p * (1.0 - p)));

        Ok(grad_input)
    }

    fn layer_type(&self) -> &str {
        &self.name
    }

    fn output_shape(&self) -> String {
        self.layer.output_shape()
    }

    fn param_count(&self) -> TrainingParameters {
        TrainingParameters::Trainable(self.layer.param_count().trainable() + self.p_logit.len())
    }

    fn update_parameters_sgd(&mut self, lr: f32) {
        self.layer.update_parameters_sgd(lr);
        if let Some(grad) = &self.p_logit_gradient {
            let previous = self.p_logit[0];
            SGD::update_parameter(&mut self.p_logit, grad, lr);
            self.guard_p_logit(previous);
        }
    }

    fn update_parameters_adam(&mut self, lr: f32, beta1: f32, beta2: f32, epsilon: f32, t: u64) {
        self.layer
            .update_parameters_adam(lr, beta1, beta2, epsilon, t);
        if let Some(grad) = &self.p_logit_gradient {
            let previous = self.p_logit[0];
            self.p_logit_state
                .adam_step(&mut self.p_logit, grad, lr, beta1, beta2, epsilon, t);
            self.guard_p_logit(previous);
        }
    }

    fn update_parameters_rmsprop(&mut self, lr: f32, rho: f32, epsilon: f32) {
        self.layer.update_parameters_rmsprop(lr, rho, epsilon);
        if let Some(grad) = &self.p_logit_gradient {
            let previous = self.p_logit[0];
            self.p_logit_state
                .rmsprop_step(&mut self.p_logit, grad, rho, lr, epsilon);
            self.guard_p_logit(previous);
        }
    }

    fn get_weights(&self) -> LayerWeight<'_> {
        LayerWeight::ConcreteDropout(ConcreteDropoutLayerWeight {
            layer: Box::new(self.layer.get_weights()),
            p_logit: &self.p_logit,
            config: &self.config,
        })
    }

    mode_dependent_layer_trait!();

    fn losses(&self) -> Vec<f32> {
        vec![self.regularization_loss()]
    }

    fn load_weights(&mut self, weights: &SerializableLayerWeight) -> Result<(), IoError> {
        match weights {
            SerializableLayerWeight::ConcreteDropout(dropout) => dropout.apply_to_layer(self),
            _ => Err(IoError::invalid_data(format!(
                "Cannot load {} weights into a {} layer",
                weights.type_name(),
                self.name
            ))),
        }
    }

    fn reset_state(&mut self) {
        self.mask_cache = None;
        self.p_logit_gradient = None;
        self.p_logit_state.clear();
        self.layer.reset_state();
    }
}

/// Multiplier of the entropy term for a wrapped layer with input `layout`.
fn resolve_entropy_scale(entropy_scale: Option<EntropyScale>, layout: InputLayout) -> f32 {
    match entropy_scale {
        Some(EntropyScale::Units) => layout.units() as f32,
        Some(EntropyScale::One) => 1.0,
        Some(EntropyScale::Fixed(scale)) => scale,
        None => match layout {
            InputLayout::Flat { features } => features as f32,
            InputLayout::Spatial { .. } => 1.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural_network::layer::{Dense, Linear};
    use ndarray::Array2;

    fn wrapped_dense(seed: u64) -> ConcreteDropout<Dense<Linear>> {
        let dense = Dense::new(3, 1, Linear::new()).unwrap();
        let config = ConcreteDropoutConfig::from_data_size(10)
            .unwrap()
            .with_prob_init(0.3, 0.3)
            .with_seed(seed);
        ConcreteDropout::with_config(dense, config).unwrap()
    }

    #[test]
    fn same_seed_gives_same_mask() {
        let x = Array2::<f32>::ones((2, 3)).into_dyn();
        let mut a = wrapped_dense(11);
        let mut b = wrapped_dense(11);
        a.forward(&x).unwrap();
        b.forward(&x).unwrap();
        assert_eq!(a.last_mask(), b.last_mask());
    }

    #[test]
    fn regularization_grad_matches_finite_difference() {
        let layer = wrapped_dense(3);
        let p = layer.dropout_probability();
        let h = 1e-3;

        let loss_at = |p: f32| {
            let kernel = layer.config.weight_regularizer * layer.layer.kernel_sum_of_squares()
                / (1.0 - p);
            let entropy = p * p.ln() + (1.0 - p) * (1.0 - p).ln();
            kernel + layer.config.dropout_regularizer * layer.entropy_scale * entropy
        };
        let numeric = (loss_at(p + h) - loss_at(p - h)) / (2.0 * h);
        let analytic = layer.regularization_grad_p(p);
        assert!((numeric - analytic).abs() < 1e-3 * analytic.abs().max(1.0));
    }

    #[test]
    fn mask_grad_matches_finite_difference() {
        let x = Array2::from_shape_fn((2, 3), |(i, j)| 0.5 + (i * 3 + j) as f32 * 0.1).into_dyn();
        let build = |logit: f32| {
            let mut layer = wrapped_dense(5);
            layer
                .inner_mut()
                .set_weights(ndarray::array![[0.2], [-0.1], [0.3]], Array2::zeros((1, 1)))
                .unwrap();
            layer.set_p_logit(logit);
            layer
        };
        let data_loss = |logit: f32| build(logit).forward(&x).unwrap().sum();

        let logit = -0.8;
        let h = 1e-2;
        let numeric = (data_loss(logit + h) - data_loss(logit - h)) / (2.0 * h);

        let mut layer = build(logit);
        let output = layer.forward(&x).unwrap();
        layer.backward(&Tensor::ones(output.raw_dim())).unwrap();
        let p = layer.dropout_probability();
        let analytic = layer.p_logit_gradient.as_ref().unwrap()[0]
            - layer.regularization_grad_p(p) * p * (1.0 - p);

        assert!((numeric - analytic).abs() < 1e-2 * analytic.abs().max(1.0));
    }

    #[test]
    fn noise_shape_follows_flat_input() {
        let layer = wrapped_dense(0);
        assert_eq!(layer.noise_shape(&[4, 3]), vec![4, 3]);
    }
}
