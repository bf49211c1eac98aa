//! Replay buffers, Q-networks and image classifiers on candle.
//!
//! Kestrel consists of the following crates:
//!
//! * `kestrel-core` provides the transition type, the bounded replay buffer
//!   with uniform sampling, and records for logging training metrics.
//! * `kestrel-candle-agent` includes the models based on
//!   [candle](https://crates.io/crates/candle-core): the DQN Q-network, ResNet-18/34
//!   and optimizers.
//! * `kestrel-imagenet` reads labeled image folders, preprocesses images and
//!   trains a ResNet classifier.
//!
//! The binary `train_resnet34` trains a classifier on an image folder.
pub use kestrel_candle_agent as candle_agent;
pub use kestrel_core as core;
pub use kestrel_imagenet as imagenet;
