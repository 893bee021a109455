//! Intensity statistics over masked voxels

use ndarray::{ArrayView, Dimension};

/// Mean and population standard deviation of a sample
///
/// Returns `None` for an empty sample.
pub fn mean_std(samples: &[f64]) -> Option<(f64, f64)> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Intensities at the foreground voxels of `mask`
///
/// Both views must share a shape; mismatched inputs yield an empty sample.
pub fn masked_values<D: Dimension>(values: &ArrayView<f32, D>, mask: &ArrayView<bool, D>) -> Vec<f64> {
    if values.shape() != mask.shape() {
        return Vec::new();
    }
    values
        .iter()
        .zip(mask.iter())
        .filter(|(_, &m)| m)
        .map(|(&v, _)| f64::from(v))
        .collect()
}

/// Mean and standard deviation of intensities under a mask
pub fn masked_mean_std<D: Dimension>(
    values: &ArrayView<f32, D>,
    mask: &ArrayView<bool, D>,
) -> Option<(f64, f64)> {
    mean_std(&masked_values(values, mask))
}
