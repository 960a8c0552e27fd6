use super::input_validation_function::*;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Prior length scale used to derive the weight regularizer from the data-set size.
pub const DEFAULT_LENGTH_SCALE: f32 = 5e-5;
/// Prior model precision (inverse observation noise) used to derive both regularizers.
pub const DEFAULT_MODEL_PRECISION: f32 = 1.0;
/// Default range from which the initial dropout probability is drawn.
pub const DEFAULT_PROB_INIT: (f32, f32) = (0.1, 0.5);
/// Default temperature of the Concrete relaxation.
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

/// Multiplier of the dropout-entropy term of the regularization loss.
///
/// # Variants
///
/// - `Units` - Number of units a mask covers per sample: input features of a Dense layer,
///   input channels of a convolutional layer
/// - `One` - A constant 1
/// - `Fixed` - An explicit value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntropyScale {
    Units,
    One,
    Fixed(f32),
}

/// How a probability from `prob_init` is turned into the initial value of `p_logit`.
///
/// # Variants
///
/// - `LogProbability` - `p_logit = ln(p)`
/// - `Logit` - `p_logit = ln(p / (1 - p))`, so that `sigmoid(p_logit) = p` exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogitInit {
    #[default]
    LogProbability,
    Logit,
}

impl LogitInit {
    /// Maps a probability to a logit value.
    pub fn logit(&self, p: f32) -> f32 {
        match self {
            LogitInit::LogProbability => p.ln(),
            LogitInit::Logit => (p / (1.0 - p)).ln(),
        }
    }
}

/// Hyperparameters of a [`ConcreteDropout`](super::ConcreteDropout) wrapper.
///
/// Build one with [`from_data_size`](Self::from_data_size) or [`from_priors`](Self::from_priors)
/// and adjust it with the `with_*` methods. Values are checked when the wrapper is constructed.
///
/// # Fields
///
/// - `n_data` - Number of samples in the training set
/// - `weight_regularizer` - Coefficient of `sum(W^2) / (1 - p)`
/// - `dropout_regularizer` - Coefficient of the negative dropout entropy
/// - `prob_init` - Range `(p_min, p_max)` the initial dropout probability is drawn from
/// - `temperature` - Temperature of the Concrete relaxation, smaller is closer to Bernoulli
/// - `entropy_scale` - Multiplier of the entropy term, `None` picks `Units` for Dense layers
///   and `One` for convolutional layers
/// - `logit_init` - How `prob_init` maps onto `p_logit`
/// - `seed` - Seed of the noise generator, `None` seeds from system entropy
///
/// # Example
/// ```rust
/// use concrete_dropout::prelude::*;
///
/// let config = ConcreteDropoutConfig::from_data_size(1000)
///     .unwrap()
///     .with_prob_init(0.2, 0.2)
///     .with_temperature(0.1)
///     .with_seed(7);
///
/// assert!((config.weight_regularizer - 2.5e-12).abs() < 1e-15);
/// assert!((config.dropout_regularizer - 2e-3).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteDropoutConfig {
    pub n_data: usize,
    pub weight_regularizer: f32,
    pub dropout_regularizer: f32,
    pub prob_init: (f32, f32),
    pub temperature: f32,
    pub entropy_scale: Option<EntropyScale>,
    pub logit_init: LogitInit,
    pub seed: Option<u64>,
}

impl ConcreteDropoutConfig {
    /// Derives the regularizers from the data-set size with the default priors.
    ///
    /// `weight_regularizer = length_scale^2 / (precision * n_data)` and
    /// `dropout_regularizer = 2 / (precision * n_data)`.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `n_data` is 0
    pub fn from_data_size(n_data: usize) -> Result<Self, ModelError> {
        Self::from_priors(n_data, DEFAULT_LENGTH_SCALE, DEFAULT_MODEL_PRECISION)
    }

    /// Derives the regularizers from the data-set size and explicit priors.
    ///
    /// # Parameters
    ///
    /// - `n_data` - Number of training samples
    /// - `length_scale` - Prior length scale of the weights
    /// - `model_precision` - Prior precision of the observation noise
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `n_data` is 0 or a prior is not positive and finite
    pub fn from_priors(
        n_data: usize,
        length_scale: f32,
        model_precision: f32,
    ) -> Result<Self, ModelError> {
        validate_n_data(n_data)?;
        validate_positive_finite(length_scale, "length_scale")?;
        validate_positive_finite(model_precision, "model_precision")?;

        let denominator = model_precision * n_data as f32;
        Ok(Self {
            n_data,
            weight_regularizer: length_scale * length_scale / denominator,
            dropout_regularizer: 2.0 / denominator,
            prob_init: DEFAULT_PROB_INIT,
            temperature: DEFAULT_TEMPERATURE,
            entropy_scale: None,
            logit_init: LogitInit::default(),
            seed: None,
        })
    }

    pub fn with_prob_init(mut self, p_min: f32, p_max: f32) -> Self {
        self.prob_init = (p_min, p_max);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_weight_regularizer(mut self, weight_regularizer: f32) -> Self {
        self.weight_regularizer = weight_regularizer;
        self
    }

    pub fn with_dropout_regularizer(mut self, dropout_regularizer: f32) -> Self {
        self.dropout_regularizer = dropout_regularizer;
        self
    }

    pub fn with_entropy_scale(mut self, entropy_scale: EntropyScale) -> Self {
        self.entropy_scale = Some(entropy_scale);
        self
    }

    pub fn with_logit_init(mut self, logit_init: LogitInit) -> Self {
        self.logit_init = logit_init;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks every hyperparameter.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `n_data` is 0, `prob_init` is not an ordered range
    ///   inside (0, 1), a regularizer is negative or not finite, the temperature is not positive
    ///   and finite, or a fixed entropy scale is negative or not finite
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_n_data(self.n_data)?;
        validate_prob_init(self.prob_init)?;
        validate_non_negative_finite(self.weight_regularizer, "weight_regularizer")?;
        validate_non_negative_finite(self.dropout_regularizer, "dropout_regularizer")?;
        validate_positive_finite(self.temperature, "temperature")?;
        if let Some(EntropyScale::Fixed(scale)) = self.entropy_scale {
            validate_non_negative_finite(scale, "entropy_scale")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regularizers_scale_inversely_with_data_size() {
        let small = ConcreteDropoutConfig::from_data_size(10).unwrap();
        let large = ConcreteDropoutConfig::from_data_size(100).unwrap();
        assert!((small.dropout_regularizer / large.dropout_regularizer - 10.0).abs() < 1e-4);
        assert!((small.weight_regularizer / large.weight_regularizer - 10.0).abs() < 1e-3);
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let base = ConcreteDropoutConfig::from_data_size(20).unwrap();
        assert!(base.validate().is_ok());
        assert!(base.clone().with_prob_init(0.5, 0.1).validate().is_err());
        assert!(base.clone().with_prob_init(0.0, 0.1).validate().is_err());
        assert!(base.clone().with_prob_init(0.1, 1.0).validate().is_err());
        assert!(base.clone().with_temperature(0.0).validate().is_err());
        assert!(base.clone().with_weight_regularizer(-1.0).validate().is_err());
        assert!(
            base.with_entropy_scale(EntropyScale::Fixed(f32::NAN))
                .validate()
                .is_err()
        );
        assert!(ConcreteDropoutConfig::from_data_size(0).is_err());
    }

    #[test]
    fn logit_init_policies() {
        assert!((LogitInit::LogProbability.logit(0.1) - 0.1f32.ln()).abs() < 1e-7);
        assert!(LogitInit::Logit.logit(0.5).abs() < 1e-7);
    }
}
