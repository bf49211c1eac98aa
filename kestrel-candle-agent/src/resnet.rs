//! Residual networks for image classification.
//!
//! Every block states its input and output channels explicitly and is checked
//! when the network is built, so a mismatched configuration fails before the
//! first forward pass.
//!
//! ```no_run
//! use candle_core::{DType, Device, Tensor};
//! use candle_nn::{ModuleT, VarBuilder, VarMap};
//! use kestrel_candle_agent::resnet::{ResNet, ResNetConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
//! let resnet = ResNet::build(vb, &ResNetConfig::resnet34())?;
//! let x = Tensor::zeros((1, 3, 224, 224), DType::F32, &Device::Cpu)?;
//! let logits = resnet.forward_t(&x, false)?;
//! assert_eq!(logits.dims(), &[1, 1000]);
//! # Ok(())
//! # }
//! ```
mod base;
mod block;
mod config;
pub use base::ResNet;
pub use block::ResBlock;
pub use config::{DownsampleConfig, ResBlockConfig, ResNetConfig, STAGE_CHANNELS};
