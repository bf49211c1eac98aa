//! Minibatch construction.
use anyhow::Result;
use candle_core::{Device, Tensor};
use ndarray::Array3;
use std::ops::Range;

/// Splits `0..n` into consecutive ranges of `batch_size` elements.
///
/// If `n` is not a multiple of `batch_size`, the last range holds the remainder.
pub fn batch_ranges(n: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..n)
        .step_by(batch_size)
        .map(move |start| start..(start + batch_size).min(n))
}

/// Converts an `(H, W, C)` array into a `(C, H, W)` tensor.
pub fn to_tensor(array: &Array3<f32>, device: &Device) -> Result<Tensor> {
    let (h, w, c) = array.dim();
    let data = array.iter().copied().collect::<Vec<_>>();
    let t = Tensor::from_vec(data, (h, w, c), device)?.permute((2, 0, 1))?;
    Ok(t.contiguous()?)
}

/// Stacks `(H, W, C)` arrays into an `(N, C, H, W)` tensor.
pub fn stack_images(arrays: &[Array3<f32>], device: &Device) -> Result<Tensor> {
    let ts = arrays
        .iter()
        .map(|a| to_tensor(a, device))
        .collect::<Result<Vec<_>>>()?;
    Ok(Tensor::stack(&ts, 0)?)
}
