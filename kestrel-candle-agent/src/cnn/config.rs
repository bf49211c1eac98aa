use crate::util::OutDim;
use serde::{Deserialize, Serialize};

fn default_n_stack() -> usize {
    4
}

fn default_in_size() -> usize {
    44
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Cnn`](super::Cnn).
pub struct CnnConfig {
    /// Number of stacked frames, i.e. input channels.
    #[serde(default = "default_n_stack")]
    pub n_stack: usize,

    /// Height of an input frame.
    #[serde(default = "default_in_size")]
    pub in_height: usize,

    /// Width of an input frame.
    #[serde(default = "default_in_size")]
    pub in_width: usize,

    /// Number of discrete actions.
    pub out_dim: i64,
}

impl CnnConfig {
    /// Constructs [`CnnConfig`] for 4 stacked 44x44 frames.
    pub fn new(n_stack: usize, out_dim: i64) -> Self {
        Self {
            n_stack,
            in_height: default_in_size(),
            in_width: default_in_size(),
            out_dim,
        }
    }

    /// Sets the spatial size of input frames.
    pub fn in_size(mut self, height: usize, width: usize) -> Self {
        self.in_height = height;
        self.in_width = width;
        self
    }
}

impl OutDim for CnnConfig {
    fn get_out_dim(&self) -> i64 {
        self.out_dim
    }

    fn set_out_dim(&mut self, v: i64) {
        self.out_dim = v;
    }
}
