//! Training of image classifiers.
mod base;
mod config;
mod context;
mod scheduler;
pub use base::ClassifierTrainer;
pub use config::ClassifierTrainerConfig;
pub use context::TrainingContext;
pub use scheduler::{PlateauConfig, PlateauScheduler};
