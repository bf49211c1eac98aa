//! DQN forward model.
//!
//! [`DqnModel`] owns the parameters of an action-value network and its optimizer.
//! Action selection, environment interaction and target network updates are
//! left to the caller.
mod model;
pub use model::{DqnModel, DqnModelConfig};
