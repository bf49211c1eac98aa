use super::ResBlockConfig;
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::{
    batch_norm, conv::Conv2dConfig, conv2d_no_bias, BatchNorm, Conv2d, Module, ModuleT,
    VarBuilder,
};

fn conv_config(stride: usize, padding: usize) -> Conv2dConfig {
    Conv2dConfig {
        stride,
        padding,
        ..Default::default()
    }
}

/// Basic residual block, `relu(bn2(conv2(relu(bn1(conv1(x))))) + shortcut(x))`.
///
/// Both convolutions are 3x3 with padding 1; only the first one is strided.
/// The shortcut is the identity or a 1x1 convolution with batch normalization.
pub struct ResBlock {
    conv1: Conv2d,
    bn1: BatchNorm,
    conv2: Conv2d,
    bn2: BatchNorm,
    downsample: Option<(Conv2d, BatchNorm)>,
    config: ResBlockConfig,
}

impl ResBlock {
    /// Builds a block after validating its configuration.
    ///
    /// Variables are named `conv1`, `bn1`, `conv2`, `bn2`, `downsample.0` and
    /// `downsample.1` under `vb`.
    pub fn build(vb: VarBuilder, config: &ResBlockConfig, bn_eps: f64) -> Result<Self> {
        let prefix = vb.prefix();
        config.validate(if prefix.is_empty() { "block" } else { &prefix })?;
        let (c_in, c_out) = (config.in_channels, config.out_channels);

        let conv1 = conv2d_no_bias(c_in, c_out, 3, conv_config(config.stride, 1), vb.pp("conv1"))?;
        let bn1 = batch_norm(c_out, bn_eps, vb.pp("bn1"))?;
        let conv2 = conv2d_no_bias(c_out, c_out, 3, conv_config(1, 1), vb.pp("conv2"))?;
        let bn2 = batch_norm(c_out, bn_eps, vb.pp("bn2"))?;
        let downsample = match &config.downsample {
            Some(ds) => {
                let vb = vb.pp("downsample");
                let conv = conv2d_no_bias(
                    ds.in_channels,
                    ds.out_channels,
                    1,
                    conv_config(ds.stride, 0),
                    vb.pp("0"),
                )?;
                let bn = batch_norm(ds.out_channels, bn_eps, vb.pp("1"))?;
                Some((conv, bn))
            }
            None => None,
        };

        Ok(Self {
            conv1,
            bn1,
            conv2,
            bn2,
            downsample,
            config: *config,
        })
    }

    /// Returns the configuration the block was built from.
    pub fn config(&self) -> &ResBlockConfig {
        &self.config
    }
}

impl ModuleT for ResBlock {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let ys = self.conv1.forward(xs)?.apply_t(&self.bn1, train)?.relu()?;
        let ys = self.conv2.forward(&ys)?.apply_t(&self.bn2, train)?;
        let shortcut = match &self.downsample {
            Some((conv, bn)) => conv.forward(xs)?.apply_t(bn, train)?,
            None => xs.clone(),
        };
        (ys + shortcut)?.relu()
    }
}
