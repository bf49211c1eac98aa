use super::{ResBlock, ResNetConfig};
use crate::ModelConfigError;
use anyhow::Result;
use candle_core::{Tensor, D};
use candle_nn::{
    batch_norm, conv::Conv2dConfig, conv2d_no_bias, linear, BatchNorm, Conv2d, Linear, Module,
    ModuleT, VarBuilder,
};
use log::info;

/// Residual network.
///
/// Stem: 7x7 stride-2 convolution, batch norm, relu and 3x3 stride-2 max-pool.
/// Four stages of [`ResBlock`]s with 64, 128, 256 and 512 channels follow,
/// then global average pooling and a linear head.
pub struct ResNet {
    conv1: Conv2d,
    bn1: BatchNorm,
    stages: Vec<Vec<ResBlock>>,
    fc: Linear,
    num_classes: usize,
}

impl ResNet {
    /// Builds the network, validating every block first.
    pub fn build(vb: VarBuilder, config: &ResNetConfig) -> Result<Self> {
        let plan = config.block_plan()?;

        // Validate the whole plan before any variable is created.
        let mut c_in = config.stem_channels();
        for (i, stage) in plan.iter().enumerate() {
            for (j, block) in stage.iter().enumerate() {
                let layer = format!("layer{}.{}", i + 1, j);
                if block.in_channels != c_in {
                    return Err(ModelConfigError::ChannelMismatch {
                        layer,
                        expected: c_in,
                        actual: block.in_channels,
                    }
                    .into());
                }
                block.validate(&layer)?;
                c_in = block.out_channels;
            }
        }
        if config.num_classes == 0 {
            return Err(ModelConfigError::InputShape("num_classes must be positive".into()).into());
        }

        let conv1 = conv2d_no_bias(
            config.in_channels,
            config.stem_channels(),
            7,
            Conv2dConfig {
                stride: 2,
                padding: 3,
                ..Default::default()
            },
            vb.pp("conv1"),
        )?;
        let bn1 = batch_norm(config.stem_channels(), config.bn_eps, vb.pp("bn1"))?;

        let stages = plan
            .iter()
            .enumerate()
            .map(|(i, stage)| {
                let vb = vb.pp(format!("layer{}", i + 1));
                stage
                    .iter()
                    .enumerate()
                    .map(|(j, block)| ResBlock::build(vb.pp(j.to_string()), block, config.bn_eps))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let fc = linear(config.head_in_dim(), config.num_classes, vb.pp("fc"))?;
        info!(
            "Built ResNet with {:?} blocks and {} classes",
            config.layers, config.num_classes
        );

        Ok(Self {
            conv1,
            bn1,
            stages,
            fc,
            num_classes: config.num_classes,
        })
    }

    /// Number of output classes.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Number of residual blocks per stage.
    pub fn stage_sizes(&self) -> Vec<usize> {
        self.stages.iter().map(|s| s.len()).collect()
    }
}

/// Keeps the rows `offset, offset + 2, ...` of `xs`, `n` of them.
fn every_other_row(xs: &Tensor, offset: usize, n: usize) -> candle_core::Result<Tensor> {
    let (b, c, _, w) = xs.dims4()?;
    xs.narrow(2, offset, 2 * n)?
        .reshape((b, c, n, 2, w))?
        .narrow(3, 0, 1)?
        .squeeze(3)
}

/// Keeps the columns `offset, offset + 2, ...` of `xs`, `n` of them.
fn every_other_col(xs: &Tensor, offset: usize, n: usize) -> candle_core::Result<Tensor> {
    let (b, c, h, _) = xs.dims4()?;
    xs.narrow(3, offset, 2 * n)?
        .reshape((b, c, h, n, 2))?
        .narrow(4, 0, 1)?
        .squeeze(4)
}

/// 3x3 max-pool with stride 2 and padding 1 over non-negative inputs.
///
/// The window maximum is the element-wise maximum of nine strided views, so the
/// gradient flows through `narrow`, `reshape` and `maximum`. Zero padding stands
/// in for negative infinity because the inputs come out of a relu.
fn max_pool_3x3_s2(xs: &Tensor) -> candle_core::Result<Tensor> {
    let (_, _, h, w) = xs.dims4()?;
    let (oh, ow) = ((h + 1) / 2, (w + 1) / 2);
    // One leading zero for the padding, trailing zeros so that every view has 2 * n rows.
    let xs = xs
        .pad_with_zeros(D::Minus2, 1, 2 * oh + 1 - h)?
        .pad_with_zeros(D::Minus1, 1, 2 * ow + 1 - w)?;

    let mut pooled: Option<Tensor> = None;
    for di in 0..3 {
        let rows = every_other_row(&xs, di, oh)?;
        for dj in 0..3 {
            let view = every_other_col(&rows, dj, ow)?;
            pooled = Some(match pooled {
                Some(p) => p.maximum(&view)?,
                None => view,
            });
        }
    }
    pooled.ok_or_else(|| candle_core::Error::Msg("empty pooling window".to_string()))
}

impl ModuleT for ResNet {
    /// Maps `(N, C, H, W)` images, or a single `(C, H, W)` image, to `(N, num_classes)` logits.
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let xs = match xs.rank() {
            3 => xs.unsqueeze(0)?,
            _ => xs.clone(),
        };
        let xs = self.conv1.forward(&xs)?.apply_t(&self.bn1, train)?.relu()?;
        let mut xs = max_pool_3x3_s2(&xs)?;
        for block in self.stages.iter().flatten() {
            xs = xs.apply_t(block, train)?;
        }
        xs.mean(D::Minus1)?.mean(D::Minus1)?.apply(&self.fc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opt::OptimizerConfig;
    use candle_core::{DType, Device};
    use candle_nn::{loss::cross_entropy, VarMap};

    #[test]
    fn test_resnet18_logits() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let resnet = ResNet::build(vb, &ResNetConfig::resnet18().num_classes(10))?;
        assert_eq!(resnet.stage_sizes(), vec![2, 2, 2, 2]);

        let x = Tensor::randn(0f32, 1f32, (2, 3, 32, 32), &Device::Cpu)?;
        assert_eq!(resnet.forward_t(&x, true)?.dims(), &[2, 10]);
        assert_eq!(resnet.forward_t(&x, false)?.dims(), &[2, 10]);

        let x = Tensor::randn(0f32, 1f32, (3, 32, 32), &Device::Cpu)?;
        assert_eq!(resnet.forward_t(&x, false)?.dims(), &[1, 10]);
        Ok(())
    }

    #[test]
    fn test_max_pool_matches_padded_kernel() -> Result<()> {
        for (h, w) in [(16, 16), (7, 9), (1, 2)] {
            let x = Tensor::randn(0f32, 1f32, (2, 3, h, w), &Device::Cpu)?.relu()?;
            let expected = x
                .pad_with_zeros(D::Minus2, 1, 1)?
                .pad_with_zeros(D::Minus1, 1, 1)?
                .max_pool2d_with_stride(3, 2)?;
            let pooled = max_pool_3x3_s2(&x)?;
            assert_eq!(pooled.dims(), expected.dims());
            let diff = (pooled - expected)?.abs()?.max_all()?.to_scalar::<f32>()?;
            assert_eq!(diff, 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_resnet_backward_step() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let resnet = ResNet::build(vb, &ResNetConfig::resnet18().num_classes(3))?;
        let mut opt = OptimizerConfig::sgd(0.1, 0.9, 1e-4).build(varmap.all_vars())?;

        let weight = |name: &str| -> Result<Tensor> {
            let data = varmap.data().lock().unwrap();
            Ok(data[name].as_tensor().copy()?)
        };
        let (stem0, fc0) = (weight("conv1.weight")?, weight("fc.weight")?);

        let x = Tensor::randn(0f32, 1f32, (4, 3, 32, 32), &Device::Cpu)?;
        let y = Tensor::new(&[0u32, 1, 2, 1], &Device::Cpu)?;
        let loss = cross_entropy(&resnet.forward_t(&x, true)?, &y)?;
        opt.backward_step(&loss)?;

        // Gradients reach both ends of the network.
        for (name, before) in [("conv1.weight", stem0), ("fc.weight", fc0)] {
            let change = (weight(name)? - before)?.abs()?.sum_all()?.to_scalar::<f32>()?;
            assert!(change > 0.0, "{} was not updated", name);
        }
        Ok(())
    }

    #[test]
    fn test_resnet34_variables() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        ResNet::build(vb, &ResNetConfig::resnet34())?;

        let data = varmap.data().lock().unwrap();
        assert!(data.contains_key("layer4.2.conv2.weight"));
        assert!(data.contains_key("layer2.0.downsample.0.weight"));
        assert!(!data.contains_key("layer1.0.downsample.0.weight"));
        assert_eq!(data["fc.weight"].as_tensor().dims(), &[1000, 512]);
        assert_eq!(data["layer3.0.downsample.0.weight"].as_tensor().dims(), &[256, 128, 1, 1]);
        Ok(())
    }
}
