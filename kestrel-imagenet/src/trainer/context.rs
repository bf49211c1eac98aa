use super::ClassifierTrainerConfig;
use crate::{batch_ranges, preprocess, stack_images, to_tensor, DatasetError, LabeledImages};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{loss::cross_entropy, ModuleT, VarBuilder, VarMap};
use image::DynamicImage;
use kestrel_candle_agent::{
    opt::Optimizer,
    resnet::{ResNet, ResNetConfig},
};
use log::{debug, info};
use std::{collections::HashMap, ops::Range, path::Path};

/// State of a training run: datasets, network parameters and optimizer.
///
/// Built once and passed to [`ClassifierTrainer`](super::ClassifierTrainer).
pub struct TrainingContext {
    train: Box<dyn LabeledImages>,
    test: Box<dyn LabeledImages>,
    device: Device,
    varmap: VarMap,
    model: ResNet,
    opt: Optimizer,
    config: ClassifierTrainerConfig,
}

impl TrainingContext {
    /// Builds the network and the optimizer over the given splits.
    pub fn build(
        config: &ClassifierTrainerConfig,
        train: Box<dyn LabeledImages>,
        test: Box<dyn LabeledImages>,
    ) -> Result<Self> {
        if train.is_empty() {
            return Err(DatasetError::EmptySplit("train".to_string()).into());
        }
        if test.is_empty() {
            return Err(DatasetError::EmptySplit("test".to_string()).into());
        }

        let device = config.device.build()?;
        let varmap = VarMap::new();
        let model = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            ResNet::build(vb, &config.model)?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;
        info!(
            "Training context with {} train and {} test images",
            train.len(),
            test.len()
        );

        Ok(Self {
            train,
            test,
            device,
            varmap,
            model,
            opt,
            config: config.clone(),
        })
    }

    /// Returns the network configuration.
    pub fn model_config(&self) -> &ResNetConfig {
        &self.config.model
    }

    /// Returns the parameters of the network.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Returns the current learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.opt.learning_rate()
    }

    /// Sets the learning rate.
    pub fn set_learning_rate(&mut self, lr: f64) {
        self.opt.set_learning_rate(lr)
    }

    /// Decodes and preprocesses a range of a split into `(images, labels)` tensors.
    fn load_batch(&self, images: &dyn LabeledImages, ixs: Range<usize>) -> Result<(Tensor, Tensor)> {
        let num_classes = self.config.model.num_classes;
        let mut arrays = Vec::with_capacity(ixs.len());
        let mut labels = Vec::with_capacity(ixs.len());
        for i in ixs {
            let (image, label) = images.get(i)?;
            if label as usize >= num_classes {
                return Err(DatasetError::LabelOutOfRange { label, num_classes }.into());
            }
            arrays.push(preprocess(&image, &self.config.preprocess)?);
            labels.push(label);
        }
        let n = labels.len();
        let x = stack_images(&arrays, &self.device)?;
        let y = Tensor::from_vec(labels, (n,), &self.device)?;
        Ok((x, y))
    }

    /// Runs one pass over the training split and returns the mean loss.
    pub fn train_epoch(&mut self) -> Result<f32> {
        let n = self.train.len();
        let mut loss_sum = 0f32;
        for ixs in batch_ranges(n, self.config.batch_size) {
            let b = ixs.len();
            let (x, y) = self.load_batch(self.train.as_ref(), ixs)?;
            let logits = self.model.forward_t(&x, true)?;
            let loss = cross_entropy(&logits, &y)?;
            self.opt.backward_step(&loss)?;

            let loss = loss.to_scalar::<f32>()?;
            debug!("Batch loss {:.4}", loss);
            loss_sum += loss * b as f32;
        }
        Ok(loss_sum / n as f32)
    }

    /// Returns the classification accuracy on the test split.
    pub fn evaluate(&self) -> Result<f32> {
        let n = self.test.len();
        let mut n_correct = 0f32;
        for ixs in batch_ranges(n, self.config.batch_size) {
            let (x, y) = self.load_batch(self.test.as_ref(), ixs)?;
            let pred = self.model.forward_t(&x, false)?.argmax(D::Minus1)?;
            n_correct += pred
                .eq(&y)?
                .to_dtype(DType::F32)?
                .sum_all()?
                .to_scalar::<f32>()?;
        }
        Ok(n_correct / n as f32)
    }

    /// Returns the predicted class of an image.
    pub fn predict(&self, image: &DynamicImage) -> Result<u32> {
        let x = to_tensor(&preprocess(image, &self.config.preprocess)?, &self.device)?;
        let pred = self.model.forward_t(&x, false)?.argmax(D::Minus1)?;
        Ok(pred.flatten_all()?.get(0)?.to_scalar::<u32>()?)
    }

    /// Writes the parameters. `.npz` paths give a numpy archive, other paths safetensors.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if is_npz(path) {
            let data = self
                .varmap
                .data()
                .lock()
                .map_err(|_| anyhow::anyhow!("VarMap lock poisoned"))?;
            let mut ts = data
                .iter()
                .map(|(name, var)| (name.clone(), var.as_tensor().clone()))
                .collect::<Vec<_>>();
            ts.sort_by(|a, b| a.0.cmp(&b.0));
            Tensor::write_npz(&ts, path).with_context(|| format!("Failed to write {:?}", path))?;
        } else {
            self.varmap
                .save(path)
                .with_context(|| format!("Failed to write {:?}", path))?;
        }
        info!("Save model parameters to {:?}", path);
        Ok(())
    }

    /// Reads parameters written by [`TrainingContext::save`].
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if is_npz(path) {
            let mut ts = Tensor::read_npz(path)
                .with_context(|| format!("Failed to read {:?}", path))?
                .into_iter()
                .collect::<HashMap<_, _>>();
            let data = self
                .varmap
                .data()
                .lock()
                .map_err(|_| anyhow::anyhow!("VarMap lock poisoned"))?;

            // Every variable is checked before the first one is overwritten.
            if let Some(name) = ts.keys().find(|name| !data.contains_key(*name)) {
                anyhow::bail!("Unknown variable {} in {:?}", name, path);
            }
            let mut updates = Vec::with_capacity(data.len());
            for (name, var) in data.iter() {
                let t = ts
                    .remove(name)
                    .with_context(|| format!("Variable {} is missing in {:?}", name, path))?;
                if t.dims() != var.dims() {
                    anyhow::bail!(
                        "Variable {} has shape {:?} in {:?}, expected {:?}",
                        name,
                        t.dims(),
                        path,
                        var.dims()
                    );
                }
                updates.push((var, t.to_device(&self.device)?.to_dtype(var.dtype())?));
            }
            for (var, t) in updates {
                var.set(&t)?;
            }
        } else {
            self.varmap.load(path)?;
        }
        info!("Load model parameters from {:?}", path);
        Ok(())
    }
}

fn is_npz(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "npz")
}
