use super::*;

/// Serializable representation of a Concrete Dropout wrapper.
///
/// # Fields
///
/// - `config` - Hyperparameters the wrapper was built with
/// - `p_logit` - The learned dropout logit
/// - `layer` - Weights of the wrapped layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableConcreteDropoutWeight {
    pub config: ConcreteDropoutConfig,
    pub p_logit: Vec<f32>,
    pub layer: Box<SerializableLayerWeight>,
}

impl<L: KernelLayer> ApplyWeights<ConcreteDropout<L>> for SerializableConcreteDropoutWeight {
    fn apply_to_layer(&self, layer: &mut ConcreteDropout<L>) -> Result<(), IoError> {
        let p_logit = match self.p_logit.as_slice() {
            [value] if value.is_finite() => *value,
            other => {
                return Err(IoError::invalid_data(format!(
                    "ConcreteDropout expects one finite p_logit value, got {:?}",
                    other
                )));
            }
        };

        // validate before touching the wrapped weights
        self.config
            .validate()
            .map_err(|e| IoError::invalid_data(e.to_string()))?;

        layer.inner_mut().load_weights(&self.layer)?;
        if &self.config != layer.config() {
            log::info!(
                "{}: restoring the stored configuration (n_data={}, weight_regularizer={:e}, dropout_regularizer={:e})",
                layer.layer_type(),
                self.config.n_data,
                self.config.weight_regularizer,
                self.config.dropout_regularizer
            );
        }
        layer
            .set_config(self.config.clone())
            .map_err(|e| IoError::invalid_data(e.to_string()))?;
        layer.set_p_logit(p_logit);
        Ok(())
    }
}
