use std::path::PathBuf;
use thiserror::Error;

/// Errors of the image pipeline.
#[derive(Error, Debug, PartialEq)]
pub enum DatasetError {
    /// The split directory does not exist.
    #[error("Split not found: {0:?}")]
    SplitNotFound(PathBuf),

    /// The split contains no image.
    #[error("Split has no images: {0}")]
    EmptySplit(String),

    /// An image array has a rank other than 2 or 3.
    #[error("Unsupported image array shape: {0:?}")]
    UnsupportedShape(Vec<usize>),

    /// A label does not index an output of the classifier.
    #[error("Label {label} out of range for {num_classes} classes")]
    LabelOutOfRange {
        /// The label.
        label: u32,
        /// Number of classes of the classifier.
        num_classes: usize,
    },

    /// Images and labels have different lengths.
    #[error("{images} images but {labels} labels")]
    LengthMismatch {
        /// Number of images.
        images: usize,
        /// Number of labels.
        labels: usize,
    },
}
