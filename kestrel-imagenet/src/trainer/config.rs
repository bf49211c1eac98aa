//! Configuration of [`ClassifierTrainer`](super::ClassifierTrainer).
use super::PlateauConfig;
use crate::PreprocessConfig;
use anyhow::Result;
use kestrel_candle_agent::{opt::OptimizerConfig, resnet::ResNetConfig, Device};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Configuration of [`ClassifierTrainer`](super::ClassifierTrainer) and
/// [`TrainingContext`](super::TrainingContext).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ClassifierTrainerConfig {
    /// Number of passes over the training split.
    pub epochs: usize,

    /// Number of images per optimization step.
    pub batch_size: usize,

    /// Network architecture.
    pub model: ResNetConfig,

    /// Optimizer.
    pub opt_config: OptimizerConfig,

    /// Learning rate reduction when the test accuracy stops improving.
    pub plateau: Option<PlateauConfig>,

    /// Image preprocessing.
    #[serde(default)]
    pub preprocess: PreprocessConfig,

    /// File the trained parameters are written to. `.npz` files are written as
    /// numpy archives, anything else as safetensors.
    pub checkpoint: PathBuf,

    /// Device on which the network is trained.
    #[serde(default)]
    pub device: Device,
}

impl Default for ClassifierTrainerConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 256,
            model: ResNetConfig::resnet34(),
            opt_config: OptimizerConfig::sgd(1e-1, 9e-1, 1e-4),
            plateau: None,
            preprocess: PreprocessConfig::default(),
            checkpoint: PathBuf::from("resnet34.npz"),
            device: Device::Cpu,
        }
    }
}

impl ClassifierTrainerConfig {
    /// Sets the number of epochs.
    pub fn epochs(mut self, v: usize) -> Self {
        self.epochs = v;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the network configuration.
    pub fn model(mut self, v: ResNetConfig) -> Self {
        self.model = v;
        self
    }

    /// Sets the optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the learning rate schedule.
    pub fn plateau(mut self, v: Option<PlateauConfig>) -> Self {
        self.plateau = v;
        self
    }

    /// Sets the preprocessing configuration.
    pub fn preprocess(mut self, v: PreprocessConfig) -> Self {
        self.preprocess = v;
        self
    }

    /// Sets the checkpoint path.
    pub fn checkpoint(mut self, v: impl Into<PathBuf>) -> Self {
        self.checkpoint = v.into();
        self
    }

    /// Sets the device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = v;
        self
    }

    /// Constructs [`ClassifierTrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ClassifierTrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
