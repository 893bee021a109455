//! Volume access and voxel-grid kernels
//!
//! Intensity volumes and binary masks are read from NIfTI files into
//! `ndarray` grids indexed `[x, y, z]`, with `z` the axial slice index.

pub mod geometry;
mod source;
pub mod stats;

pub use source::{CaseDirectory, MaskSource, MemoryMasks, MASK_EXTENSION};

use crate::error::{HeimdallrError, Result};
use crate::types::{round_to, VoxelSpacing};
use log::debug;
use ndarray::{Array3, ArrayD, ArrayView2, Axis, Ix3};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::path::Path;

/// Reads a NIfTI file into a dynamic-rank array plus its voxel spacing
fn read_nifti(path: &Path) -> Result<(ArrayD<f32>, VoxelSpacing)> {
    let obj = ReaderOptions::new().read_file(path)?;
    let spacing = VoxelSpacing::from_pixdim(&obj.header().pixdim);
    let data = obj.into_volume().into_ndarray::<f32>()?;
    debug!(
        "Loaded {} with shape {:?} ({})",
        path.display(),
        data.shape(),
        spacing
    );
    Ok((data, spacing))
}

/// Drops trailing singleton axes (e.g. a 4-D file with one time point)
fn into_3d<T>(mut data: ArrayD<T>) -> Result<Array3<T>> {
    while data.ndim() > 3 && data.shape()[data.ndim() - 1] == 1 {
        let last = data.ndim() - 1;
        data = data.index_axis_move(Axis(last), 0);
    }
    let shape = data.shape().to_vec();
    data.into_dimensionality::<Ix3>()
        .map_err(|_| HeimdallrError::UnsupportedShape(shape))
}

fn shape_of<T>(data: &Array3<T>) -> [usize; 3] {
    let (x, y, z) = data.dim();
    [x, y, z]
}

/// Intensity volume (HU for CT, arbitrary signal for MR)
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: Array3<f32>,
    spacing: VoxelSpacing,
}

impl Volume {
    pub fn new(data: Array3<f32>, spacing: VoxelSpacing) -> Self {
        Self { data, spacing }
    }

    /// Loads an intensity volume from a `.nii` or `.nii.gz` file
    pub fn from_nifti<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (data, spacing) = read_nifti(path.as_ref())?;
        Ok(Self::new(into_3d(data)?, spacing))
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn spacing(&self) -> VoxelSpacing {
        self.spacing
    }

    pub fn shape(&self) -> [usize; 3] {
        shape_of(&self.data)
    }

    /// Axial slice at index `z`, indexed `[x, y]`
    pub fn axial_slice(&self, z: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(2), z)
    }
}

/// Binary segmentation mask
///
/// A voxel is foreground when its stored value is strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array3<bool>,
    spacing: VoxelSpacing,
}

impl Mask {
    pub fn new(data: Array3<bool>, spacing: VoxelSpacing) -> Self {
        Self { data, spacing }
    }

    /// Loads a mask from a `.nii` or `.nii.gz` file
    pub fn from_nifti<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (data, spacing) = read_nifti(path.as_ref())?;
        let data = into_3d(data)?.mapv(|v| v > 0.0);
        Ok(Self::new(data, spacing))
    }

    pub fn data(&self) -> &Array3<bool> {
        &self.data
    }

    pub fn spacing(&self) -> VoxelSpacing {
        self.spacing
    }

    pub fn shape(&self) -> [usize; 3] {
        shape_of(&self.data)
    }

    /// Number of foreground voxels
    pub fn voxel_count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Foreground volume in cm³, rounded to 3 decimals
    pub fn volume_cm3(&self) -> f64 {
        let mm3 = self.voxel_count() as f64 * self.spacing.voxel_volume_mm3();
        round_to(mm3 / 1000.0, 3)
    }

    /// Sorted axial indices containing at least one foreground voxel
    pub fn axial_indices(&self) -> Vec<usize> {
        self.data
            .axis_iter(Axis(2))
            .enumerate()
            .filter(|(_, slice)| slice.iter().any(|&v| v))
            .map(|(z, _)| z)
            .collect()
    }

    /// Axial slice at index `z`, indexed `[x, y]`
    pub fn axial_slice(&self, z: usize) -> ArrayView2<'_, bool> {
        self.data.index_axis(Axis(2), z)
    }

    /// Checks that this mask shares the voxel grid of `volume`
    pub fn ensure_matches(&self, volume: &Volume) -> Result<()> {
        if self.shape() == volume.shape() {
            Ok(())
        } else {
            Err(HeimdallrError::ShapeMismatch {
                expected: volume.shape(),
                found: self.shape(),
            })
        }
    }
}
