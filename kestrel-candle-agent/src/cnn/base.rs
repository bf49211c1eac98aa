use super::CnnConfig;
use crate::{model::SubModel1, util::conv_out_size, ModelConfigError};
use anyhow::Result;
use candle_core::{DType::F32, Device, Tensor};
use candle_nn::{
    conv::Conv2dConfig,
    conv2d, linear,
    sequential::{seq, Sequential},
    Module, VarBuilder,
};
use log::{debug, trace};

/// Stacked frames expected by the first convolution.
const N_STACK: usize = 4;

/// Channels of the two convolutions.
const C1: usize = 16;
const C2: usize = 32;

/// Input features of the first linear layer.
const FLAT_DIM: usize = 512;
const HIDDEN_DIM: usize = 256;

#[allow(clippy::upper_case_acronyms)]
/// Convolutional neural network with the same architecture as the DQN paper.
///
/// `conv(n_stack→16, 8, stride 4) → relu → conv(16→32, 4, stride 2) → relu →
/// flatten → linear(512→256) → linear(256→out_dim)`.
pub struct Cnn {
    n_stack: usize,
    out_dim: i64,
    device: Device,
    seq: Sequential,
}

impl Cnn {
    fn stride(s: usize) -> Conv2dConfig {
        Conv2dConfig {
            stride: s,
            ..Default::default()
        }
    }

    /// Checks that the input frames flatten to the size the first linear layer expects.
    fn check_in_shape(config: &CnnConfig) -> Result<(), ModelConfigError> {
        let out = |size: usize| {
            conv_out_size(size, 8, 4, 0).and_then(|s| conv_out_size(s, 4, 2, 0))
        };
        match (out(config.in_height), out(config.in_width)) {
            (Some(h), Some(w)) if C2 * h * w == FLAT_DIM => Ok(()),
            (h, w) => Err(ModelConfigError::InputShape(format!(
                "{}x{} frames give {:?}x{:?} feature maps, {} features are required",
                config.in_height, config.in_width, h, w, FLAT_DIM
            ))),
        }
    }

    /// Checks the channel count of the first layer and the number of actions.
    fn check_dims(config: &CnnConfig) -> Result<(), ModelConfigError> {
        if config.n_stack != N_STACK {
            return Err(ModelConfigError::ChannelMismatch {
                layer: "c1".to_string(),
                expected: N_STACK,
                actual: config.n_stack,
            });
        }
        if config.out_dim <= 0 {
            return Err(ModelConfigError::InputShape(format!(
                "out_dim must be positive, got {}",
                config.out_dim
            )));
        }
        Ok(())
    }

    fn create_net(vb: &VarBuilder, n_stack: usize, out_dim: usize) -> Result<Sequential> {
        let seq = seq()
            .add(conv2d(n_stack, C1, 8, Self::stride(4), vb.pp("c1"))?)
            .add_fn(|xs| xs.relu())
            .add(conv2d(C1, C2, 4, Self::stride(2), vb.pp("c2"))?)
            .add_fn(|xs| xs.relu()?.flatten_from(1))
            .add(linear(FLAT_DIM, HIDDEN_DIM, vb.pp("l1"))?)
            .add(linear(HIDDEN_DIM, out_dim, vb.pp("l2"))?);

        Ok(seq)
    }

    /// Number of stacked input frames.
    pub fn n_stack(&self) -> usize {
        self.n_stack
    }

    /// Number of discrete actions.
    pub fn out_dim(&self) -> i64 {
        self.out_dim
    }
}

impl SubModel1 for Cnn {
    type Config = CnnConfig;
    type Input = Tensor;
    type Output = Tensor;

    /// Accepts `(N, n_stack, H, W)` or a single `(n_stack, H, W)` observation.
    fn forward(&self, x: &Self::Input) -> Result<Tensor> {
        let x = x.to_device(&self.device)?.to_dtype(F32)?;
        let x = match x.rank() {
            3 => x.unsqueeze(0)?,
            _ => x,
        };
        match x.dims() {
            [_, c, h, w] if *c == self.n_stack => {
                trace!("Q-network input {}x{}", h, w);
            }
            dims => {
                return Err(ModelConfigError::InputShape(format!(
                    "expected (N, {}, H, W) observations, got {:?}",
                    self.n_stack, dims
                ))
                .into())
            }
        }
        Ok(self.seq.forward(&x)?)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        Self::check_dims(&config)?;
        Self::check_in_shape(&config)?;
        let n_stack = config.n_stack;
        let out_dim = config.out_dim;
        let device = vb.device().clone();
        let seq = Self::create_net(&vb, n_stack, out_dim as usize)?;
        debug!("Built Q-network with {} inputs, {} actions", n_stack, out_dim);

        Ok(Self {
            n_stack,
            out_dim,
            device,
            seq,
        })
    }
}
