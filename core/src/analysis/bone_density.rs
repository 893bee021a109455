//! Opportunistic bone mineral density at L1
//!
//! The vertebra mask covers the whole bone, including the posterior arch.
//! The trabecular region of interest is found on the central axial slice:
//!
//! 1. erode ~5 mm to strip the cortex and the thin posterior elements
//! 2. keep the largest remaining component (the vertebral body)
//! 3. compare the centroids of the full vertebra and the body to find the
//!    anterior-posterior axis; the body sits anterior to the arch
//! 4. place an ellipse in the anterior half of the body and intersect it with
//!    the eroded body
//!
//! The ellipse constants are empirical and kept fixed for reproducibility.

use super::sarcopenia::middle_index;
use super::{Analyzer, CaseContext};
use crate::error::Result;
use crate::types::catalog::VERTEBRA_L1;
use crate::types::{BmdClassification, MetricsResult, VoxelSpacing};
use crate::volume::geometry::{bounding_box, centroid, ellipse, erode, largest_component};
use crate::volume::stats::masked_mean_std;
use log::{debug, info, warn};
use ndarray::{Array2, ArrayView2, Zip};

/// Border removed by erosion, in mm
pub const EROSION_DEPTH_MM: f64 = 5.0;

/// ROI diameter across the AP axis, as a fraction of the body extent
pub const ROI_WIDTH_FRACTION: f64 = 0.70;

/// ROI diameter along the AP axis, as a fraction of the body extent
pub const ROI_DEPTH_FRACTION: f64 = 0.40;

/// Distance of the ROI center from the anterior edge, as a fraction of the body extent
pub const ANTERIOR_OFFSET_FRACTION: f64 = 0.25;

/// Erosion passes needed to remove [`EROSION_DEPTH_MM`] at this spacing
pub fn erosion_iterations(spacing: VoxelSpacing) -> usize {
    let passes = (EROSION_DEPTH_MM / spacing.min_in_plane()).round();
    if passes.is_finite() && passes >= 1.0 {
        passes as usize
    } else {
        1
    }
}

/// Slice axis running anterior to posterior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApAxis {
    Rows,
    Cols,
}

/// Trabecular ROI of one axial vertebra slice
#[derive(Debug, Clone, PartialEq)]
pub struct TrabecularRoi {
    pub ap_axis: ApAxis,
    /// Eroded vertebral body
    pub body: Array2<bool>,
    /// Ellipse intersected with the body
    pub mask: Array2<bool>,
}

impl TrabecularRoi {
    pub fn voxel_count(&self) -> usize {
        self.mask.iter().filter(|&&v| v).count()
    }
}

/// Places the trabecular ROI inside a vertebra slice
///
/// Returns `None` whenever a stage leaves nothing behind: erosion consumes
/// the vertebra, the body is degenerate, or the ellipse misses the body.
pub fn trabecular_roi(vertebra: &ArrayView2<bool>, iterations: usize) -> Option<TrabecularRoi> {
    let eroded = erode(vertebra, iterations);
    let body = largest_component(&eroded.view());

    let full_com = centroid(vertebra)?;
    let body_com = centroid(&body.view())?;
    let bbox = bounding_box(&body.view())?;

    let row_mid = (bbox.row_min + bbox.row_max) as f64 / 2.0;
    let col_mid = (bbox.col_min + bbox.col_max) as f64 / 2.0;

    let diff_row = (full_com.0 - body_com.0).abs();
    let diff_col = (full_com.1 - body_com.1).abs();

    let (ap_axis, center, radii) = if diff_col > diff_row {
        let ext = bbox.col_extent();
        let center_col = if body_com.1 > full_com.1 {
            bbox.col_max as f64 - ext * ANTERIOR_OFFSET_FRACTION
        } else {
            bbox.col_min as f64 + ext * ANTERIOR_OFFSET_FRACTION
        };
        (
            ApAxis::Cols,
            (row_mid, center_col),
            (
                bbox.row_extent() * ROI_WIDTH_FRACTION / 2.0,
                ext * ROI_DEPTH_FRACTION / 2.0,
            ),
        )
    } else {
        let ext = bbox.row_extent();
        let center_row = if body_com.0 > full_com.0 {
            bbox.row_max as f64 - ext * ANTERIOR_OFFSET_FRACTION
        } else {
            bbox.row_min as f64 + ext * ANTERIOR_OFFSET_FRACTION
        };
        (
            ApAxis::Rows,
            (center_row, col_mid),
            (
                ext * ROI_DEPTH_FRACTION / 2.0,
                bbox.col_extent() * ROI_WIDTH_FRACTION / 2.0,
            ),
        )
    };

    let mut mask = ellipse(body.dim(), center, radii);
    Zip::from(&mut mask).and(&body).for_each(|m, &b| *m &= b);
    if !mask.iter().any(|&v| v) {
        return None;
    }

    Some(TrabecularRoi {
        ap_axis,
        body,
        mask,
    })
}

/// L1 trabecular attenuation and Pickhardt classification (CT only)
///
/// Any empty stage drops the BMD keys for the case without failing it.
pub struct BoneDensityAnalyzer;

impl Analyzer for BoneDensityAnalyzer {
    fn name(&self) -> &'static str {
        "bone_density"
    }

    fn analyze(&self, ctx: &CaseContext<'_>) -> Result<MetricsResult> {
        let mut out = MetricsResult::new();
        if !ctx.is_ct() {
            return Ok(out);
        }

        let Some(l1) = ctx.masks.load(VERTEBRA_L1)? else {
            debug!("[{}] No L1 mask, skipping BMD", ctx.case_id);
            return Ok(out);
        };
        if let Err(e) = l1.ensure_matches(ctx.volume) {
            warn!("[{}] Skipping BMD: {}", ctx.case_id, e);
            return Ok(out);
        }
        let Some(z) = middle_index(&l1.axial_indices()) else {
            warn!("[{}] L1 vertebra found but mask is empty", ctx.case_id);
            return Ok(out);
        };

        let vertebra = l1.axial_slice(z);
        let iterations = erosion_iterations(l1.spacing());
        let Some(roi) = trabecular_roi(&vertebra, iterations) else {
            warn!(
                "[{}] L1 trabecular ROI empty after {} erosion passes on slice {}",
                ctx.case_id, iterations, z
            );
            return Ok(out);
        };

        let intensity = ctx.volume.axial_slice(z);
        let Some((mean, std)) = masked_mean_std(&intensity, &roi.mask.view()) else {
            return Ok(out);
        };
        let classification = BmdClassification::from_hu(mean);

        out.insert_rounded("L1_trabecular_HU_mean", mean, 2);
        out.insert_rounded("L1_trabecular_HU_std", std, 2);
        out.insert("L1_trabecular_voxel_count", roi.voxel_count());
        out.insert("L1_bmd_classification", classification.label());
        info!(
            "[{}] L1 slice {}: {:.1} HU ({}), {} voxels",
            ctx.case_id,
            z,
            mean,
            classification,
            roi.voxel_count()
        );

        if let Some(writer) = ctx.ct_overlays() {
            if let Err(e) = writer.bone_density(&intensity, &roi.mask.view(), &vertebra) {
                warn!("[{}] Error generating BMD overlay: {}", ctx.case_id, e);
            }
        }

        Ok(out)
    }
}
