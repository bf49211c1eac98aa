use thiserror::Error;

/// Errors detected while constructing a model from its configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ModelConfigError {
    /// Two connected layers disagree on the number of channels.
    #[error("Channel mismatch in {layer}: expected {expected}, got {actual}")]
    ChannelMismatch {
        /// Name of the offending layer.
        layer: String,
        /// Channels required by the connection.
        expected: usize,
        /// Channels given in the configuration.
        actual: usize,
    },

    /// A stride must be positive, and the identity shortcut requires a stride of 1.
    #[error("Invalid stride {stride} in {layer}")]
    InvalidStride {
        /// Name of the offending layer.
        layer: String,
        /// Given stride.
        stride: usize,
    },

    /// The input shape does not produce the feature size expected by a layer.
    #[error("Input shape error: {0}")]
    InputShape(String),

    /// A stage of residual blocks has no block.
    #[error("Stage {0} has no blocks")]
    EmptyStage(usize),

    /// A required sub-configuration was not given.
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),
}
