//! Sources of labeled images.
use crate::DatasetError;
use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// A random-access collection of `(image, label)` pairs.
pub trait LabeledImages {
    /// Number of images.
    fn len(&self) -> usize;

    /// Decodes the `i`-th image and returns it with its label.
    fn get(&self, i: usize) -> Result<(DynamicImage, u32)>;

    /// Returns `true` if there is no image.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Configuration of [`ImageFolder`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ImageFolderConfig {
    /// Root directory containing one directory per split.
    pub root: PathBuf,

    /// Name of the split, e.g. `train` or `test`.
    pub split: String,

    /// Keeps only the first `n` images of the split if given.
    pub sample_size: Option<usize>,
}

impl ImageFolderConfig {
    /// Configuration of the whole split `split` under `root`.
    pub fn new(root: impl Into<PathBuf>, split: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            split: split.into(),
            sample_size: None,
        }
    }

    /// Sets the number of images taken from the head of the split.
    pub fn sample_size(mut self, v: Option<usize>) -> Self {
        self.sample_size = v;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Images stored as `<root>/<split>/<class>/<file>`.
///
/// Class directories sorted by name receive the labels `0, 1, ...`. Within
/// the split, images are ordered by class and then by file name, so
/// `sample_size` selects a deterministic head of the split.
pub struct ImageFolder {
    classes: Vec<String>,
    items: Vec<(PathBuf, u32)>,
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {:?}", dir))?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

impl ImageFolder {
    /// Indexes the split. Images are decoded lazily by [`LabeledImages::get`].
    pub fn open(config: &ImageFolderConfig) -> Result<Self> {
        let dir = config.root.join(&config.split);
        if !dir.is_dir() {
            return Err(DatasetError::SplitNotFound(dir).into());
        }

        let mut classes = Vec::new();
        let mut items = Vec::new();
        for class_dir in sorted_entries(&dir)?.into_iter().filter(|p| p.is_dir()) {
            let label = classes.len() as u32;
            let name = class_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            classes.push(name);
            items.extend(
                sorted_entries(&class_dir)?
                    .into_iter()
                    .filter(|p| p.is_file() && ImageFormat::from_path(p).is_ok())
                    .map(|p| (p, label)),
            );
        }

        if let Some(n) = config.sample_size {
            items.truncate(n);
        }
        if items.is_empty() {
            return Err(DatasetError::EmptySplit(config.split.clone()).into());
        }
        info!(
            "Opened split {:?} with {} images in {} classes",
            config.split,
            items.len(),
            classes.len()
        );

        Ok(Self { classes, items })
    }

    /// Class names indexed by label.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

impl LabeledImages for ImageFolder {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, i: usize) -> Result<(DynamicImage, u32)> {
        let (path, label) = &self.items[i];
        let image = image::open(path).with_context(|| format!("Failed to decode {:?}", path))?;
        Ok((image, *label))
    }
}

/// Decoded images held in memory.
pub struct InMemoryImages {
    images: Vec<DynamicImage>,
    labels: Vec<u32>,
}

impl InMemoryImages {
    /// Pairs images with labels.
    pub fn new(images: Vec<DynamicImage>, labels: Vec<u32>) -> Result<Self, DatasetError> {
        if images.len() != labels.len() {
            return Err(DatasetError::LengthMismatch {
                images: images.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { images, labels })
    }
}

impl LabeledImages for InMemoryImages {
    fn len(&self) -> usize {
        self.images.len()
    }

    fn get(&self, i: usize) -> Result<(DynamicImage, u32)> {
        Ok((self.images[i].clone(), self.labels[i]))
    }
}
