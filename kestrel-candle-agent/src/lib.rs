//! Neural network models implemented with [candle](https://crates.io/crates/candle-core).
//!
//! * [`cnn::Cnn`] - the Q-network of the Atari DQN paper, with [`dqn::DqnModel`] owning
//!   its parameters and optimizer.
//! * [`resnet::ResNet`] - residual networks for image classification.
pub mod cnn;
pub mod dqn;
mod error;
pub mod model;
pub mod opt;
pub mod resnet;
pub mod util;
use anyhow::Result;
pub use error::ModelConfigError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq, Default)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    #[default]
    Cpu,

    /// The GPU device with the given ordinal.
    Cuda(usize),
}

impl Device {
    /// Creates the corresponding [`candle_core::Device`].
    pub fn build(self) -> Result<candle_core::Device> {
        match self {
            Self::Cpu => Ok(candle_core::Device::Cpu),
            Self::Cuda(n) => Ok(candle_core::Device::new_cuda(n)?),
        }
    }
}
