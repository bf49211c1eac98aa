//! Convolutional Q-network of the Atari DQN paper.
mod base;
mod config;
pub use base::Cnn;
pub use config::CnnConfig;
