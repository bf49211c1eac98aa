use crate::ModelConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Output channels of the four stages.
pub const STAGE_CHANNELS: [usize; 4] = [64, 128, 256, 512];

/// Channels of the stem convolution.
const STEM_CHANNELS: usize = 64;

/// Projection shortcut: 1x1 convolution followed by batch normalization.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct DownsampleConfig {
    /// Input channels of the projection convolution.
    pub in_channels: usize,

    /// Output channels of the projection convolution.
    pub out_channels: usize,

    /// Stride of the projection convolution.
    pub stride: usize,
}

/// Configuration of [`ResBlock`](super::ResBlock).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct ResBlockConfig {
    /// Channels of the block input.
    pub in_channels: usize,

    /// Channels of both convolutions and of the block output.
    pub out_channels: usize,

    /// Stride of the first convolution.
    pub stride: usize,

    /// Projection shortcut, the identity shortcut is used if `None`.
    pub downsample: Option<DownsampleConfig>,
}

impl ResBlockConfig {
    /// Block whose shortcut is a projection whenever the identity cannot be used.
    pub fn new(in_channels: usize, out_channels: usize, stride: usize) -> Self {
        let downsample = (stride != 1 || in_channels != out_channels).then(|| DownsampleConfig {
            in_channels,
            out_channels,
            stride,
        });
        Self {
            in_channels,
            out_channels,
            stride,
            downsample,
        }
    }

    /// Sets the shortcut explicitly.
    pub fn downsample(mut self, v: Option<DownsampleConfig>) -> Self {
        self.downsample = v;
        self
    }

    /// Checks that the shortcut output can be added to the residual branch.
    pub fn validate(&self, layer: &str) -> Result<(), ModelConfigError> {
        if self.stride == 0 {
            return Err(ModelConfigError::InvalidStride {
                layer: layer.to_string(),
                stride: self.stride,
            });
        }

        match &self.downsample {
            None => {
                if self.in_channels != self.out_channels {
                    return Err(ModelConfigError::ChannelMismatch {
                        layer: format!("{}.shortcut", layer),
                        expected: self.out_channels,
                        actual: self.in_channels,
                    });
                }
                if self.stride != 1 {
                    return Err(ModelConfigError::InvalidStride {
                        layer: format!("{}.shortcut", layer),
                        stride: self.stride,
                    });
                }
            }
            Some(ds) => {
                if ds.in_channels != self.in_channels {
                    return Err(ModelConfigError::ChannelMismatch {
                        layer: format!("{}.downsample", layer),
                        expected: self.in_channels,
                        actual: ds.in_channels,
                    });
                }
                if ds.out_channels != self.out_channels {
                    return Err(ModelConfigError::ChannelMismatch {
                        layer: format!("{}.downsample", layer),
                        expected: self.out_channels,
                        actual: ds.out_channels,
                    });
                }
                if ds.stride != self.stride {
                    return Err(ModelConfigError::InvalidStride {
                        layer: format!("{}.downsample", layer),
                        stride: ds.stride,
                    });
                }
            }
        }
        Ok(())
    }
}

fn default_in_channels() -> usize {
    3
}

fn default_bn_eps() -> f64 {
    1e-5
}

/// Configuration of [`ResNet`](super::ResNet).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ResNetConfig {
    /// Number of blocks in each of the four stages.
    pub layers: Vec<usize>,

    /// Number of classes of the linear head.
    pub num_classes: usize,

    /// Channels of input images.
    #[serde(default = "default_in_channels")]
    pub in_channels: usize,

    /// Epsilon of batch normalization.
    #[serde(default = "default_bn_eps")]
    pub bn_eps: f64,
}

impl Default for ResNetConfig {
    fn default() -> Self {
        Self::resnet34()
    }
}

impl ResNetConfig {
    /// 18-layer network, `[2, 2, 2, 2]` blocks.
    pub fn resnet18() -> Self {
        Self::with_layers(vec![2, 2, 2, 2])
    }

    /// 34-layer network, `[3, 4, 6, 3]` blocks.
    pub fn resnet34() -> Self {
        Self::with_layers(vec![3, 4, 6, 3])
    }

    fn with_layers(layers: Vec<usize>) -> Self {
        Self {
            layers,
            num_classes: 1000,
            in_channels: default_in_channels(),
            bn_eps: default_bn_eps(),
        }
    }

    /// Sets the number of classes.
    pub fn num_classes(mut self, v: usize) -> Self {
        self.num_classes = v;
        self
    }

    /// Sets the channels of input images.
    pub fn in_channels(mut self, v: usize) -> Self {
        self.in_channels = v;
        self
    }

    /// Channels of the stem output, i.e. of the first block input.
    pub fn stem_channels(&self) -> usize {
        STEM_CHANNELS
    }

    /// Channels entering the linear head.
    pub fn head_in_dim(&self) -> usize {
        STAGE_CHANNELS[STAGE_CHANNELS.len() - 1]
    }

    /// Block configurations of each stage.
    ///
    /// The first block of every stage but the first halves the spatial size.
    /// A block gets a projection shortcut if its stride is not 1 or its input
    /// channels differ from its output channels.
    pub fn block_plan(&self) -> Result<Vec<Vec<ResBlockConfig>>, ModelConfigError> {
        if self.layers.len() != STAGE_CHANNELS.len() {
            return Err(ModelConfigError::InputShape(format!(
                "{} stages given, {} required",
                self.layers.len(),
                STAGE_CHANNELS.len()
            )));
        }

        let mut in_channels = STEM_CHANNELS;
        let mut plan = Vec::with_capacity(self.layers.len());
        for (i, (&n_blocks, &out_channels)) in
            self.layers.iter().zip(STAGE_CHANNELS.iter()).enumerate()
        {
            if n_blocks == 0 {
                return Err(ModelConfigError::EmptyStage(i + 1));
            }
            let stride = if i == 0 { 1 } else { 2 };
            let mut stage = vec![ResBlockConfig::new(in_channels, out_channels, stride)];
            in_channels = out_channels;
            stage.extend((1..n_blocks).map(|_| ResBlockConfig::new(in_channels, out_channels, 1)));
            plan.push(stage);
        }
        Ok(plan)
    }

    /// Constructs [`ResNetConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ResNetConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
