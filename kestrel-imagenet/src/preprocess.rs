//! Conversion of decoded images into normalized arrays.
use crate::DatasetError;
use anyhow::Result;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{concatenate, s, Array, Array3, ArrayD, Axis, Ix3};
use serde::{Deserialize, Serialize};

/// Target size of preprocessed images.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct PreprocessConfig {
    /// Width after resizing.
    pub width: u32,

    /// Height after resizing.
    pub height: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
        }
    }
}

impl PreprocessConfig {
    /// Sets the target size.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

fn from_raw<T: Copy + Into<f32>>(raw: &[T], h: usize, w: usize, c: usize) -> Result<ArrayD<f32>> {
    let data = raw.iter().map(|&v| v.into()).collect::<Vec<f32>>();
    let array = match c {
        1 => Array::from_shape_vec((h, w), data)?.into_dyn(),
        _ => Array::from_shape_vec((h, w, c), data)?.into_dyn(),
    };
    Ok(array)
}

/// Pixel values of an image in its native channel layout.
///
/// Single-channel images give `(H, W)`, others `(H, W, C)`.
pub fn image_to_array(image: &DynamicImage) -> Result<ArrayD<f32>> {
    let (h, w) = (image.height() as usize, image.width() as usize);
    match image {
        DynamicImage::ImageLuma8(b) => from_raw(b.as_raw(), h, w, 1),
        DynamicImage::ImageLumaA8(b) => from_raw(b.as_raw(), h, w, 2),
        DynamicImage::ImageRgb8(b) => from_raw(b.as_raw(), h, w, 3),
        DynamicImage::ImageRgba8(b) => from_raw(b.as_raw(), h, w, 4),
        DynamicImage::ImageLuma16(b) => from_raw(b.as_raw(), h, w, 1),
        DynamicImage::ImageLumaA16(b) => from_raw(b.as_raw(), h, w, 2),
        DynamicImage::ImageRgb16(b) => from_raw(b.as_raw(), h, w, 3),
        DynamicImage::ImageRgba16(b) => from_raw(b.as_raw(), h, w, 4),
        other => from_raw(other.to_rgb8().as_raw(), h, w, 3),
    }
}

/// Brings an `(H, W)` or `(H, W, C)` array to exactly three channels.
///
/// Grayscale is replicated, extra channels are dropped and missing channels
/// are filled with zeros.
pub fn force_three_channels(array: ArrayD<f32>) -> Result<Array3<f32>> {
    let array = match array.ndim() {
        2 => array.insert_axis(Axis(2)),
        3 => array,
        _ => return Err(DatasetError::UnsupportedShape(array.shape().to_vec()).into()),
    };
    let array = array.into_dimensionality::<Ix3>()?;
    let (h, w, c) = array.dim();

    let array = match c {
        3 => array,
        1 => array.broadcast((h, w, 3)).map(|a| a.to_owned()).ok_or_else(|| {
            DatasetError::UnsupportedShape(vec![h, w, c])
        })?,
        c if c > 3 => array.slice(s![.., .., ..3]).to_owned(),
        c => {
            let zeros = Array3::<f32>::zeros((h, w, 3 - c));
            concatenate(Axis(2), &[array.view(), zeros.view()])?
        }
    };
    Ok(array)
}

/// Standardizes the whole image to zero mean and unit (population) standard deviation.
///
/// A constant image has no spread and becomes all zeros.
pub fn normalize(array: Array3<f32>) -> Array3<f32> {
    let n = array.len().max(1) as f64;
    let mean = array.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = array.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();

    if std > 0.0 && std.is_finite() {
        array.mapv(|v| ((v as f64 - mean) / std) as f32)
    } else {
        array.mapv(|v| (v as f64 - mean) as f32)
    }
}

/// Resizes an image and returns a normalized `(height, width, 3)` array.
pub fn preprocess(image: &DynamicImage, config: &PreprocessConfig) -> Result<Array3<f32>> {
    let resized = image.resize_exact(config.width, config.height, FilterType::CatmullRom);
    let array = force_three_channels(image_to_array(&resized)?)?;
    Ok(normalize(array))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, LumaA, Rgba, RgbaImage};
    use ndarray::Array2;

    #[test]
    fn test_grayscale_is_replicated() -> Result<()> {
        let gray = Array2::from_shape_fn((4, 5), |(i, j)| (i * 5 + j) as f32).into_dyn();
        let rgb = force_three_channels(gray.clone())?;
        assert_eq!(rgb.dim(), (4, 5, 3));
        for c in 0..3 {
            assert_eq!(rgb.index_axis(Axis(2), c).into_dyn(), gray);
        }

        let single = gray.insert_axis(Axis(2));
        assert_eq!(force_three_channels(single)?, rgb);
        Ok(())
    }

    #[test]
    fn test_extra_channels_are_dropped() -> Result<()> {
        let rgba = Array::from_shape_fn((2, 2, 4), |(_, _, c)| c as f32).into_dyn();
        let rgb = force_three_channels(rgba)?;
        assert_eq!(rgb.dim(), (2, 2, 3));
        assert!(rgb.iter().all(|&v| v < 3.0));
        Ok(())
    }

    #[test]
    fn test_missing_channels_are_zero() -> Result<()> {
        let la = Array::from_elem((3, 3, 2), 7f32).into_dyn();
        let rgb = force_three_channels(la)?;
        assert_eq!(rgb.dim(), (3, 3, 3));
        assert!(rgb.slice(s![.., .., ..2]).iter().all(|&v| v == 7.0));
        assert!(rgb.slice(s![.., .., 2]).iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn test_unsupported_rank() {
        let err = force_three_channels(ArrayD::zeros(vec![2, 2, 2, 2])).err().unwrap();
        assert_eq!(
            err.downcast_ref::<DatasetError>(),
            Some(&DatasetError::UnsupportedShape(vec![2, 2, 2, 2]))
        );
    }

    #[test]
    fn test_normalize() {
        let a = Array::from_shape_fn((8, 8, 3), |(i, j, c)| (i * 17 + j * 3 + c) as f32);
        let n = normalize(a);
        let len = n.len() as f32;
        let mean = n.sum() / len;
        let std = (n.mapv(|v| (v - mean).powi(2)).sum() / len).sqrt();
        assert!(mean.abs() < 1e-4);
        assert!((std - 1.0).abs() < 1e-4);

        let constant = normalize(Array3::from_elem((2, 2, 3), 9.0));
        assert!(constant.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_preprocess_channel_policies() -> Result<()> {
        let config = PreprocessConfig::default().size(16, 12);

        let gray = DynamicImage::ImageLuma8(GrayImage::from_fn(30, 20, |x, y| {
            image::Luma([((x * 7 + y * 3) % 256) as u8])
        }));
        let out = preprocess(&gray, &config)?;
        assert_eq!(out.dim(), (12, 16, 3));
        assert_eq!(out.index_axis(Axis(2), 0), out.index_axis(Axis(2), 1));
        assert_eq!(out.index_axis(Axis(2), 1), out.index_axis(Axis(2), 2));

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_fn(10, 10, |x, y| {
            Rgba([(x * 20) as u8, (y * 20) as u8, 100, 255])
        }));
        assert_eq!(preprocess(&rgba, &config)?.dim(), (12, 16, 3));

        let la: ImageBuffer<LumaA<u8>, Vec<u8>> =
            ImageBuffer::from_fn(5, 5, |x, _| LumaA([(x * 40) as u8, 255]));
        let out = preprocess(&DynamicImage::ImageLumaA8(la), &config)?;
        assert_eq!(out.dim(), (12, 16, 3));
        Ok(())
    }
}
