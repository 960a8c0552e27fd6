use super::*;
use crate::error::IoError;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{ArrayViewD, Axis};
use rand::seq::SliceRandom;
use serde_json::{from_reader, to_writer_pretty};
use std::fs::File;
use std::io::{BufWriter, Write};

/// A Sequential neural network model for building and training feedforward networks.
///
/// Layers are stacked in a linear fashion and each layer feeds its output to the next one.
/// Besides the data loss, the model collects the auxiliary losses its layers register through
/// [`Layer::losses`] (for example the regularization loss of a
/// [`ConcreteDropout`](crate::neural_network::layer::regularization_layer::ConcreteDropout)
/// wrapper) and minimizes their sum.
///
/// # Fields
///
/// - `layers` - A vector containing all the layers in the model. Each layer implements
///   the `Layer` trait and is stored as a boxed dynamic trait object.
///
/// - `optimizer` - An optional optimizer used for updating model parameters during training.
///
/// - `loss` - An optional loss function. A model compiled without one trains on the
///   auxiliary losses alone.
///
/// # Example
/// ```rust
/// use concrete_dropout::prelude::*;
/// use ndarray::Array;
///
/// // Create training data
/// let x = Array::ones((16, 8)).into_dyn();
/// let y = Array::ones((16, 1)).into_dyn();
///
/// // Build a network whose first layer learns its input dropout rate
/// let dense = Dense::new(8, 4, ReLU::new()).unwrap();
/// let mut model = Sequential::new();
/// model
///     .add(ConcreteDropout::new(dense, 16).unwrap())
///     .add(Dense::new(4, 1, Linear::new()).unwrap())
///     .compile(Adam::new(0.01, 0.9, 0.999, 1e-8).unwrap(), MeanSquaredError::new());
///
/// model.summary();
/// model.fit(&x, &y, 5).unwrap();
///
/// // One auxiliary loss from the wrapper
/// assert_eq!(model.losses().len(), 1);
///
/// let predictions = model.predict(&x).unwrap();
/// assert_eq!(predictions.shape(), &[16, 1]);
/// ```
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
    optimizer: Option<Box<dyn Optimizer>>,
    loss: Option<Box<dyn LossFunction>>,
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a progress bar, falling back to the default style if the template is rejected.
fn training_progress_bar(len: u64, template: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    let progress_bar = ProgressBar::new(len);
    progress_bar.set_style(style);
    progress_bar
}

impl Sequential {
    /// Creates a new empty Sequential model
    ///
    /// # Returns
    ///
    /// * `Sequential` - an empty Sequential model
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            optimizer: None,
            loss: None,
        }
    }

    /// Adds a layer to the model
    ///
    /// Supports method chaining pattern
    ///
    /// # Parameters
    ///
    /// * `layer` - The layer to add to the model
    ///
    /// # Returns
    ///
    /// * `&mut Sequential` - Mutable reference to self for method chaining
    pub fn add<L: 'static + Layer>(&mut self, layer: L) -> &mut Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Configures the optimizer and loss function for the model
    ///
    /// # Parameters
    ///
    /// - `optimizer` - The optimizer to use for training
    /// - `loss` - The loss function to use for training
    ///
    /// # Returns
    ///
    /// * `&mut Sequential` - Mutable reference to self for method chaining
    pub fn compile<O, LFunc>(&mut self, optimizer: O, loss: LFunc) -> &mut Self
    where
        O: 'static + Optimizer,
        LFunc: 'static + LossFunction,
    {
        self.optimizer = Some(Box::new(optimizer));
        self.loss = Some(Box::new(loss));
        self
    }

    /// Configures an optimizer without a loss function.
    ///
    /// Training then minimizes the sum of the auxiliary losses only, and the targets passed
    /// to [`fit`](Self::fit) are ignored.
    pub fn compile_without_loss<O>(&mut self, optimizer: O) -> &mut Self
    where
        O: 'static + Optimizer,
    {
        self.optimizer = Some(Box::new(optimizer));
        self.loss = None;
        self
    }

    /// Number of layers in the model.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Validates the model state and input data
    ///
    /// # Parameters
    ///
    /// - `x` - Input tensor containing training data
    /// - `y` - Target tensor containing expected outputs
    ///
    /// # Returns
    ///
    /// - `Ok(())` - If validation passes
    /// - `Err(ModelError)` - If validation fails
    fn validate_training_inputs(&self, x: &Tensor, y: &Tensor) -> Result<(), ModelError> {
        if self.optimizer.is_none() {
            return Err(ModelError::InputValidationError(
                "Optimizer not specified".to_string(),
            ));
        }

        if self.layers.is_empty() {
            return Err(ModelError::InputValidationError(
                "Layers not specified".to_string(),
            ));
        }

        if x.is_empty() {
            return Err(ModelError::InputValidationError(
                "Input tensor cannot be empty".to_string(),
            ));
        }

        if self.loss.is_some() {
            if y.is_empty() {
                return Err(ModelError::InputValidationError(
                    "Target tensor cannot be empty".to_string(),
                ));
            }

            // Verify batch size match
            if x.shape()[0] != y.shape()[0] {
                return Err(ModelError::InputValidationError(format!(
                    "Batch size mismatch: input has {} samples, target has {} samples",
                    x.shape()[0],
                    y.shape()[0]
                )));
            }
        }

        Ok(())
    }

    /// Runs `x` through every layer in the given mode.
    fn forward_all(&mut self, x: &Tensor, is_training: bool) -> Result<Tensor, ModelError> {
        let mut output = x.clone();
        for layer in &mut self.layers {
            layer.set_training_if_mode_dependent(is_training);
            output = layer.forward(&output)?;
        }
        Ok(output)
    }

    /// Data loss and its gradient, or zero and a zero gradient without a loss function.
    fn data_loss_and_grad(
        &self,
        y: Option<&Tensor>,
        output: &Tensor,
    ) -> Result<(f32, Tensor), ModelError> {
        match (&self.loss, y) {
            (Some(loss), Some(y)) => {
                if y.shape() != output.shape() {
                    return Err(ModelError::InputValidationError(format!(
                        "Target shape {:?} does not match output shape {:?}",
                        y.shape(),
                        output.shape()
                    )));
                }
                Ok((loss.compute_loss(y, output), loss.compute_grad(y, output)))
            }
            _ => Ok((0.0, Tensor::zeros(output.raw_dim()))),
        }
    }

    /// Performs training on a single batch of data
    ///
    /// # Parameters
    ///
    /// - `x` - Input tensor for the batch
    /// - `y` - Target tensor for the batch
    ///
    /// # Returns
    ///
    /// - `Ok(f32)` - The total loss (data loss plus auxiliary losses) before the update
    /// - `Err(ModelError)` - If training fails
    fn train_batch(&mut self, x: &Tensor, y: &Tensor) -> Result<f32, ModelError> {
        let output = self.forward_all(x, true)?;

        let (data_loss, mut grad) = self.data_loss_and_grad(Some(y), &output)?;
        let auxiliary_loss: f32 = self.losses().iter().sum();

        let optimizer = self.optimizer.as_mut().ok_or(ModelError::NotFitted)?;

        // Backward pass and parameter updates (iterate through layers in reverse)
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
            optimizer.update(&mut **layer);
        }

        Ok(data_loss + auxiliary_loss)
    }

    /// Trains the model on the provided data
    ///
    /// Executes the forward pass, loss calculation, backward pass, and parameter updates
    ///
    /// # Parameters
    ///
    /// - `x` - Input tensor containing training data
    /// - `y` - Target tensor containing expected outputs, ignored without a loss function
    /// - `epochs` - Number of training epochs to perform
    pub fn fit(&mut self, x: &Tensor, y: &Tensor, epochs: u32) -> Result<&mut Self, ModelError> {
        self.validate_training_inputs(x, y)?;

        let n_samples = x.shape()[0];

        let progress_bar = training_progress_bar(
            epochs as u64,
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} | Loss: {msg}",
        );

        for _ in 0..epochs {
            // Train on the entire dataset as one batch
            let loss_value = self.train_batch(x, y)?;

            progress_bar.set_message(format!("{:.6}", loss_value));
            progress_bar.inc(1);
        }

        progress_bar.finish_with_message("Training completed");

        log::info!(
            "Neural network training completed: {} samples, {} epochs",
            n_samples,
            epochs
        );

        Ok(self)
    }

    /// Trains the model using batch processing
    ///
    /// Shuffles the samples at the start of every epoch and splits them into batches of
    /// the specified size. The last batch of an epoch may be smaller.
    ///
    /// # Parameters
    ///
    /// - `x` - Input training data tensor
    /// - `y` - Target output data tensor, ignored without a loss function
    /// - `epochs` - Number of training epochs
    /// - `batch_size` - Size of each training batch
    ///
    /// # Returns
    ///
    /// * `Result<&mut Self, ModelError>` - Mutable reference to trained model or error
    pub fn fit_with_batches(
        &mut self,
        x: &Tensor,
        y: &Tensor,
        epochs: u32,
        batch_size: usize,
    ) -> Result<&mut Self, ModelError> {
        self.validate_training_inputs(x, y)?;

        let n_samples = x.shape()[0];

        if batch_size == 0 {
            return Err(ModelError::InputValidationError(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if batch_size > n_samples {
            return Err(ModelError::InputValidationError(format!(
                "Batch size ({}) cannot be larger than dataset size ({})",
                batch_size, n_samples
            )));
        }

        let has_targets = self.loss.is_some();
        let mut indices: Vec<usize> = (0..n_samples).collect();

        let total_batches = n_samples.div_ceil(batch_size);
        let total_iterations = epochs as u64 * total_batches as u64;

        let progress_bar = training_progress_bar(
            total_iterations,
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} | Epoch {msg}",
        );

        for epoch in 0..epochs {
            indices.shuffle(&mut rand::rng());

            let mut epoch_loss = 0.0;
            let mut batch_count = 0;

            for batch_indices in indices.chunks(batch_size) {
                batch_count += 1;

                let batch_x = x.select(Axis(0), batch_indices);
                let batch_y = if has_targets {
                    y.select(Axis(0), batch_indices)
                } else {
                    y.clone()
                };

                epoch_loss += self.train_batch(&batch_x, &batch_y)?;

                let avg_loss = epoch_loss / batch_count as f32;
                progress_bar.set_message(format!(
                    "{}/{} | Avg Loss: {:.6}",
                    epoch + 1,
                    epochs,
                    avg_loss
                ));
                progress_bar.inc(1);
            }

            log::debug!(
                "Epoch {}/{}: average loss {:.6}",
                epoch + 1,
                epochs,
                epoch_loss / batch_count as f32
            );
        }

        progress_bar.finish_with_message("Training completed");

        log::info!(
            "Neural network batch training completed: {} samples, {} batch size, {} epochs",
            n_samples,
            batch_size,
            epochs
        );

        Ok(self)
    }

    /// Generates predictions for the input data
    ///
    /// Every layer is switched to inference mode, so dropout wrappers pass their input through.
    ///
    /// # Parameters
    ///
    /// * `x` - Input tensor containing data to predict on
    ///
    /// # Returns
    ///
    /// - `Ok(Tensor)` - Tensor containing the model's predictions
    /// - `Err(ModelError)` - If the model has no layers, the input is empty or a layer rejects it
    pub fn predict(&mut self, x: &Tensor) -> Result<Tensor, ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::InputValidationError(
                "Layers not specified".to_string(),
            ));
        }
        if x.is_empty() {
            return Err(ModelError::InputValidationError(
                "Input tensor cannot be empty".to_string(),
            ));
        }

        self.forward_all(x, false)
    }

    /// Scores the model in inference mode.
    ///
    /// The result is the data loss, if both a target and a loss function are available, plus
    /// the sum of all auxiliary losses. Parameters are not changed.
    ///
    /// A target passed to a model without a loss function (never compiled, or compiled with
    /// [`compile_without_loss`](Self::compile_without_loss)) is ignored with a warning.
    ///
    /// # Parameters
    ///
    /// - `x` - Input tensor
    /// - `y` - Optional target tensor
    ///
    /// # Returns
    ///
    /// - `Ok(f32)` - The total loss
    /// - `Err(ModelError)` - If the forward pass fails or the target does not match the output
    pub fn evaluate(&mut self, x: &Tensor, y: Option<&Tensor>) -> Result<f32, ModelError> {
        if y.is_some() && self.loss.is_none() {
            log::warn!("evaluate: model has no loss function, the target is ignored");
        }
        let output = self.predict(x)?;
        let (data_loss, _) = self.data_loss_and_grad(y, &output)?;
        let auxiliary_loss: f32 = self.losses().iter().sum();
        Ok(data_loss + auxiliary_loss)
    }

    /// Returns every auxiliary loss registered by the layers, in layer order.
    ///
    /// The values depend only on the current parameters, never on the last batch.
    pub fn losses(&self) -> Vec<f32> {
        self.layers.iter().flat_map(|layer| layer.losses()).collect()
    }

    /// Prints a summary of the model's structure
    ///
    /// Displays each layer's information and parameter statistics in a tabular format
    pub fn summary(&self) {
        let col1_width = 33;
        let col2_width = 24;
        let col3_width = 15;
        println!("Model: \"sequential\"");
        println!(
            "┏{}┳{}┳{}┓",
            "━".repeat(col1_width),
            "━".repeat(col2_width),
            "━".repeat(col3_width)
        );
        println!(
            "┃ {:<31} ┃ {:<22} ┃ {:>13} ┃",
            "Layer (type)", "Output Shape", "Param #"
        );
        println!(
            "┡{}╇{}╇{}┩",
            "━".repeat(col1_width),
            "━".repeat(col2_width),
            "━".repeat(col3_width)
        );
        let mut total_params: usize = 0;
        let mut trainable_param_count: usize = 0;
        let mut non_trainable_param_count: usize = 0;

        for (i, layer) in self.layers.iter().enumerate() {
            let layer_name = if i == 0 {
                "Layer".to_string()
            } else {
                format!("Layer_{}", i)
            };

            let param_count_num = match layer.param_count() {
                TrainingParameters::Trainable(count) => {
                    trainable_param_count += count;
                    count
                }
                TrainingParameters::NonTrainable(count) => {
                    non_trainable_param_count += count;
                    count
                }
                TrainingParameters::NoTrainable => 0,
            };
            total_params += param_count_num;

            println!(
                "│ {:<31} │ {:<22} │ {:>13} │",
                format!("{} ({})", layer_name, layer.layer_type()),
                layer.output_shape(),
                param_count_num
            );
        }
        println!(
            "└{}┴{}┴{}┘",
            "─".repeat(col1_width),
            "─".repeat(col2_width),
            "─".repeat(col3_width)
        );
        println!(" Total params: {} ({} B)", total_params, total_params * 4); // f32 parameters
        println!(
            " Trainable params: {} ({} B)",
            trainable_param_count,
            trainable_param_count * 4
        );
        println!(
            " Non-trainable params: {} ({} B)",
            non_trainable_param_count,
            non_trainable_param_count * 4
        );
    }

    /// Returns all the weights from each layer in the model.
    ///
    /// # Returns
    ///
    /// * `Vec<LayerWeight>` - One entry per layer:
    ///   - `LayerWeight::Dense` / `Conv1D` / `Conv2D` / `Conv3D` for kernel layers
    ///   - `LayerWeight::ConcreteDropout` for a wrapper, nesting the wrapped layer's weights
    ///   - `LayerWeight::Empty` for layers without parameters
    pub fn get_weights(&self) -> Vec<LayerWeight<'_>> {
        self.layers.iter().map(|layer| layer.get_weights()).collect()
    }

    /// Returns every weight tensor of the model as one flat list.
    ///
    /// Each layer contributes the tensors of [`LayerWeight::tensors`], so a wrapped layer
    /// contributes `[kernel, bias, p_logit]`.
    pub fn weight_list(&self) -> Vec<ArrayViewD<'_, f32>> {
        self.layers
            .iter()
            .flat_map(|layer| layer.get_weights().tensors())
            .collect()
    }

    /// Drops cached activations, gradients and optimizer state of every layer.
    ///
    /// Parameters, the optimizer and the loss function are kept. Call it between independent
    /// runs that reuse the same model.
    pub fn reset_state(&mut self) {
        for layer in &mut self.layers {
            layer.reset_state();
        }
    }

    /// Saves the model architecture and weights to a JSON file at the specified path.
    ///
    /// Layer types, output shapes and all trainable parameters are stored, including the
    /// configuration and dropout logit of Concrete Dropout wrappers. The optimizer and loss
    /// function are not saved and must be reconfigured after loading.
    ///
    /// # Parameters
    ///
    /// * `path` - File path where the model will be saved (e.g., "stored_model.json")
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Model successfully saved to file
    /// - `Err(IoError::StdIoError)` - File creation or write operation failed
    /// - `Err(IoError::JsonError)` - Serialization to JSON failed
    pub fn save_to_path(&self, path: &str) -> Result<(), IoError> {
        let serializable_layers = self
            .layers
            .iter()
            .map(|layer| SerializableLayer {
                info: LayerInfo {
                    layer_type: layer.layer_type().to_string(),
                    output_shape: layer.output_shape(),
                },
                weights: SerializableLayerWeight::from_layer_weight(&layer.get_weights()),
            })
            .collect();

        let serializable_model = SerializableSequential {
            layers: serializable_layers,
        };

        let file = File::create(path).map_err(IoError::StdIoError)?;
        let mut writer = BufWriter::new(file);

        to_writer_pretty(&mut writer, &serializable_model).map_err(IoError::JsonError)?;

        writer.flush().map_err(IoError::StdIoError)?;

        log::info!("Saved {} layers to {}", self.layers.len(), path);

        Ok(())
    }

    /// Loads model weights from a JSON file and applies them to the current model.
    ///
    /// The current model must have the same architecture (same number and types of layers)
    /// as the saved model. Build the model structure first, then call this method, then
    /// `compile()` to train further.
    ///
    /// # Parameters
    ///
    /// * `path` - File path from which to load the weights (e.g., "stored_model.json")
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Successfully loaded weights into the model
    /// - `Err(IoError::StdIoError)` - File not found, or the stored layers do not match the model
    /// - `Err(IoError::JsonError)` - Deserialization from JSON failed
    pub fn load_from_path(&mut self, path: &str) -> Result<(), IoError> {
        let reader = IoError::load_in_buf_reader(path)?;

        let serializable_model: SerializableSequential =
            from_reader(reader).map_err(IoError::JsonError)?;

        if serializable_model.layers.len() != self.layers.len() {
            return Err(IoError::invalid_data(format!(
                "Layer count mismatch: model has {} layers, file has {} layers",
                self.layers.len(),
                serializable_model.layers.len()
            )));
        }

        for (i, (layer, stored)) in self
            .layers
            .iter_mut()
            .zip(&serializable_model.layers)
            .enumerate()
        {
            if layer.layer_type() != stored.info.layer_type {
                return Err(IoError::invalid_data(format!(
                    "Layer {} type mismatch: model has {}, file has {}",
                    i,
                    layer.layer_type(),
                    stored.info.layer_type
                )));
            }
            layer.load_weights(&stored.weights)?;
        }

        log::info!("Loaded {} layers from {}", self.layers.len(), path);

        Ok(())
    }
}
