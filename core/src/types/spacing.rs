use std::fmt;

/// Physical voxel spacing in millimeters (x, y, z)
///
/// Axis order follows the NIfTI voxel grid: `x` and `y` span the axial
/// plane and `z` runs along the axial slice index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelSpacing {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl VoxelSpacing {
    /// Creates a new VoxelSpacing
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Builds spacing from a NIfTI `pixdim` field
    ///
    /// `pixdim[0]` holds the qfac orientation flag, the spatial spacing lives
    /// in `pixdim[1..=3]`. Magnitudes are used since some writers store
    /// negative spacing for flipped axes.
    pub fn from_pixdim(pixdim: &[f32; 8]) -> Self {
        Self {
            x: f64::from(pixdim[1]).abs(),
            y: f64::from(pixdim[2]).abs(),
            z: f64::from(pixdim[3]).abs(),
        }
    }

    /// Volume of one voxel in mm³
    pub fn voxel_volume_mm3(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Volume of one voxel in cm³
    pub fn voxel_volume_cm3(&self) -> f64 {
        self.voxel_volume_mm3() / 1000.0
    }

    /// Area of one axial pixel in mm²
    pub fn pixel_area_mm2(&self) -> f64 {
        self.x * self.y
    }

    /// Finest in-plane spacing, used to convert millimeter margins to voxels
    pub fn min_in_plane(&self) -> f64 {
        self.x.min(self.y)
    }
}

impl Default for VoxelSpacing {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

impl fmt::Display for VoxelSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {} x {} mm", self.x, self.y, self.z)
    }
}
