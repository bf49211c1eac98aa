//! Image classification pipeline.
//!
//! Labeled images are read from a [`LabeledImages`] source, normalized by
//! [`preprocess`] and fed to a [`ResNet`](kestrel_candle_agent::resnet::ResNet)
//! owned by a [`TrainingContext`]. [`ClassifierTrainer`] runs the epochs,
//! evaluates on the test split and writes the final checkpoint.
mod batch;
mod dataset;
mod error;
mod preprocess;
mod trainer;
pub use batch::{batch_ranges, stack_images, to_tensor};
pub use dataset::{ImageFolder, ImageFolderConfig, InMemoryImages, LabeledImages};
pub use error::DatasetError;
pub use preprocess::{
    force_three_channels, image_to_array, normalize, preprocess, PreprocessConfig,
};
pub use trainer::{
    ClassifierTrainer, ClassifierTrainerConfig, PlateauConfig, PlateauScheduler, TrainingContext,
};
