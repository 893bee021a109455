use super::{Analyzer, CaseContext};
use crate::error::{HeimdallrError, Result};
use crate::types::catalog::{LobeEntry, LUNG_LOBES};
use crate::types::{LungStatus, MaskRef, MetricsResult};
use crate::volume::stats::masked_values;
use crate::volume::Mask;
use log::{debug, info, warn};

/// Density-mask threshold; voxels strictly below count as emphysema
pub const EMPHYSEMA_THRESHOLD_HU: f64 = -950.0;

const STATUS_KEY: &str = "lung_analysis_status";

/// Voxel tally of one lobe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LobeDensity {
    pub total_voxels: usize,
    pub emphysema_voxels: usize,
    pub voxel_volume_cm3: f64,
}

impl LobeDensity {
    pub fn percent(&self) -> f64 {
        percent(self.emphysema_voxels, self.total_voxels)
    }

    pub fn volume_cm3(&self) -> f64 {
        self.total_voxels as f64 * self.voxel_volume_cm3
    }

    pub fn emphysema_volume_cm3(&self) -> f64 {
        self.emphysema_voxels as f64 * self.voxel_volume_cm3
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Counts lobe voxels and those below [`EMPHYSEMA_THRESHOLD_HU`]
///
/// The voxel volume comes from the lobe mask's own spacing.
pub fn lobe_density(ctx: &CaseContext<'_>, lobe: &Mask) -> LobeDensity {
    let values = masked_values(&ctx.volume.data().view(), &lobe.data().view());
    LobeDensity {
        total_voxels: values.len(),
        emphysema_voxels: values
            .iter()
            .filter(|&&hu| hu < EMPHYSEMA_THRESHOLD_HU)
            .count(),
        voxel_volume_cm3: lobe.spacing().voxel_volume_cm3(),
    }
}

/// Loads every lobe and checks its minimum volume
///
/// Returns `None` when any lobe is missing, unreadable or undersized, which
/// is how partial chest coverage (e.g. lung bases on an abdominal CT) shows up.
fn complete_lobes(ctx: &CaseContext<'_>) -> Option<Vec<(&'static LobeEntry, Mask)>> {
    let mut lobes = Vec::with_capacity(LUNG_LOBES.len());
    for entry in LUNG_LOBES.iter() {
        let Some(mask) = ctx.load_lenient(MaskRef::total(entry.name)) else {
            debug!("[{}] Lobe {} missing", ctx.case_id, entry.name);
            return None;
        };
        let volume_cm3 = mask.volume_cm3();
        if volume_cm3 < entry.min_volume_cm3 {
            debug!(
                "[{}] Lobe {} is {:.3} cm³, below {} cm³",
                ctx.case_id, entry.name, volume_cm3, entry.min_volume_cm3
            );
            return None;
        }
        lobes.push((entry, mask));
    }
    Some(lobes)
}

/// Lobar emphysema quantification (CT only, complete lungs only)
pub struct EmphysemaAnalyzer;

impl Analyzer for EmphysemaAnalyzer {
    fn name(&self) -> &'static str {
        "emphysema"
    }

    fn analyze(&self, ctx: &CaseContext<'_>) -> Result<MetricsResult> {
        let mut out = MetricsResult::new();
        let incomplete = |mut out: MetricsResult| {
            out.insert(STATUS_KEY, LungStatus::IncompleteOrNonCt.label());
            out
        };

        if !ctx.is_ct() {
            return Ok(incomplete(out));
        }
        let Some(lobes) = complete_lobes(ctx) else {
            warn!(
                "[{}] Skipping emphysema analysis due to incomplete lung lobe masks",
                ctx.case_id
            );
            return Ok(incomplete(out));
        };

        let (mut total_voxels, mut emphysema_voxels) = (0usize, 0usize);
        let (mut total_cm3, mut emphysema_cm3) = (0.0, 0.0);

        for (entry, mask) in &lobes {
            if let Err(e) = mask.ensure_matches(ctx.volume) {
                warn!("[{}] Skipping lobe {}: {}", ctx.case_id, entry.name, e);
                continue;
            }
            let density = lobe_density(ctx, mask);
            if density.total_voxels == 0 {
                continue;
            }

            out.insert_rounded(format!("{}_emphysema_percent", entry.name), density.percent(), 2);
            out.insert_rounded(format!("{}_vol_cm3", entry.name), density.volume_cm3(), 2);
            out.insert_rounded(
                format!("{}_emphysema_vol_cm3", entry.name),
                density.emphysema_volume_cm3(),
                2,
            );
            out.insert(format!("{}_total_voxels", entry.name), density.total_voxels);

            total_voxels += density.total_voxels;
            emphysema_voxels += density.emphysema_voxels;
            total_cm3 += density.volume_cm3();
            emphysema_cm3 += density.emphysema_volume_cm3();
        }

        if total_voxels == 0 {
            return Err(HeimdallrError::ComputationError(
                "no lung voxels share the CT grid".to_string(),
            ));
        }

        let global = percent(emphysema_voxels, total_voxels);
        out.insert_rounded("total_lung_emphysema_percent", global, 2);
        out.insert_rounded("total_lung_vol_cm3", total_cm3, 2);
        out.insert_rounded("total_lung_emphysema_vol_cm3", emphysema_cm3, 2);
        out.insert(STATUS_KEY, LungStatus::Complete.label());
        info!(
            "[{}] Emphysema {:.2}% of {:.1} cm³ lung",
            ctx.case_id, global, total_cm3
        );

        Ok(out)
    }

    fn failure_entries(&self) -> MetricsResult {
        let mut out = MetricsResult::new();
        out.insert(STATUS_KEY, LungStatus::Error.label());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{boxed_mask, ct, ctx, mr};
    use crate::types::VoxelSpacing;
    use crate::volume::{MemoryMasks, Volume};
    use ndarray::{s, Array3};
    use rstest::rstest;

    const SHAPE: (usize, usize, usize) = (10, 10, 50);

    /// 10x10 voxels per slice at 10x10 mm → 0.1 cm³ per voxel at 1 mm slices
    fn lobe_spacing(z: f64) -> VoxelSpacing {
        VoxelSpacing::new(10.0, 10.0, z)
    }

    fn lobe_slabs() -> [std::ops::Range<usize>; 5] {
        [0..10, 10..20, 20..30, 30..35, 40..50]
    }

    /// All five lobes at exactly their minimum volumes, one with a custom z spacing
    fn lung_masks(override_lobe: Option<(usize, f64)>) -> MemoryMasks {
        let mut masks = MemoryMasks::new();
        for (i, (entry, z)) in LUNG_LOBES.iter().zip(lobe_slabs()).enumerate() {
            let z_spacing = match override_lobe {
                Some((j, dz)) if j == i => dz,
                _ => 1.0,
            };
            masks.insert(
                MaskRef::total(entry.name),
                boxed_mask(SHAPE, 0..10, 0..10, z, lobe_spacing(z_spacing)),
            );
        }
        masks
    }

    /// -850 HU lungs; upper-left lobe 20% emphysematous, middle lobe 100%
    fn lung_ct() -> Volume {
        let mut data = Array3::from_elem(SHAPE, -850.0f32);
        data.slice_mut(s![.., .., 0..2]).fill(-970.0);
        data.slice_mut(s![.., .., 30..35]).fill(-960.0);
        Volume::new(data, VoxelSpacing::default())
    }

    #[test]
    fn test_complete_lungs() {
        let vol = lung_ct();
        let masks = lung_masks(None);
        let meta = ct();

        let out = EmphysemaAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        assert_eq!(out.get_str(STATUS_KEY), Some("Complete"));

        assert_eq!(out.get_f64("lung_upper_lobe_left_emphysema_percent"), Some(20.0));
        assert_eq!(out.get_f64("lung_upper_lobe_left_vol_cm3"), Some(100.0));
        assert_eq!(out.get_f64("lung_upper_lobe_left_emphysema_vol_cm3"), Some(20.0));
        assert_eq!(out.get_f64("lung_upper_lobe_left_total_voxels"), Some(1000.0));
        assert_eq!(out.get_f64("lung_middle_lobe_right_emphysema_percent"), Some(100.0));
        assert_eq!(out.get_f64("lung_lower_lobe_right_emphysema_percent"), Some(0.0));

        // voxel-weighted: 700 of 4500 voxels
        assert_eq!(out.get_f64("total_lung_emphysema_percent"), Some(15.56));
        assert_eq!(out.get_f64("total_lung_vol_cm3"), Some(450.0));
        assert_eq!(out.get_f64("total_lung_emphysema_vol_cm3"), Some(70.0));
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut data = Array3::from_elem(SHAPE, EMPHYSEMA_THRESHOLD_HU as f32);
        data.slice_mut(s![.., .., 0..1]).fill(-950.5);
        let vol = Volume::new(data, VoxelSpacing::default());
        let masks = lung_masks(None);
        let meta = ct();

        let out = EmphysemaAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        assert_eq!(out.get_f64("lung_upper_lobe_left_emphysema_percent"), Some(10.0));
        assert_eq!(out.get_f64("lung_lower_lobe_left_emphysema_percent"), Some(0.0));
    }

    #[rstest]
    // upper-left at 99.99 / 100.00 / 100.01 cm³
    #[case(0, 0.9999, false)]
    #[case(0, 1.0, true)]
    #[case(0, 1.0001, true)]
    // middle-right at 49.995 / 50.005 cm³
    #[case(3, 0.9999, false)]
    #[case(3, 1.0001, true)]
    fn test_minimum_volume_gate(
        #[case] lobe: usize,
        #[case] z_spacing: f64,
        #[case] complete: bool,
    ) {
        let vol = lung_ct();
        let masks = lung_masks(Some((lobe, z_spacing)));
        let meta = ct();

        let out = EmphysemaAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        let expected = if complete {
            "Complete"
        } else {
            "Incomplete or non-CT"
        };
        assert_eq!(out.get_str(STATUS_KEY), Some(expected));
        assert_eq!(out.contains_key("total_lung_emphysema_percent"), complete);
    }

    #[test]
    fn test_missing_lobe_is_incomplete() {
        let vol = lung_ct();
        let mut masks = MemoryMasks::new();
        for (entry, z) in LUNG_LOBES.iter().zip(lobe_slabs()).take(4) {
            masks.insert(
                MaskRef::total(entry.name),
                boxed_mask(SHAPE, 0..10, 0..10, z, lobe_spacing(1.0)),
            );
        }
        let meta = ct();

        let out = EmphysemaAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get_str(STATUS_KEY), Some("Incomplete or non-CT"));
    }

    #[test]
    fn test_unreadable_lobe_is_incomplete() {
        let vol = lung_ct();
        let mut masks = lung_masks(None);
        masks.insert_unreadable(MaskRef::total("lung_lower_lobe_left"));
        let meta = ct();

        let out = EmphysemaAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        assert_eq!(out.get_str(STATUS_KEY), Some("Incomplete or non-CT"));
    }

    #[test]
    fn test_mr_is_incomplete() {
        let vol = lung_ct();
        let masks = lung_masks(None);
        let meta = mr();

        let out = EmphysemaAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get_str(STATUS_KEY), Some("Incomplete or non-CT"));
    }

    #[test]
    fn test_mismatched_lobe_skipped_from_totals() {
        let vol = lung_ct();
        let mut masks = lung_masks(None);
        masks.insert(
            MaskRef::total("lung_upper_lobe_left"),
            boxed_mask((10, 10, 60), 0..10, 0..10, 0..10, lobe_spacing(1.0)),
        );
        let meta = ct();

        let out = EmphysemaAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        assert!(!out.contains_key("lung_upper_lobe_left_emphysema_percent"));
        assert_eq!(out.get_f64("total_lung_vol_cm3"), Some(350.0));
        assert_eq!(out.get_str(STATUS_KEY), Some("Complete"));
    }

    #[test]
    fn test_no_usable_lobe_is_error() {
        let vol = Volume::new(Array3::from_elem((4, 4, 4), -900.0), VoxelSpacing::default());
        let masks = lung_masks(None);
        let meta = ct();

        let result = EmphysemaAnalyzer.analyze(&ctx(&meta, &vol, &masks));
        assert!(result.is_err());
        assert_eq!(
            EmphysemaAnalyzer.failure_entries().get_str(STATUS_KEY),
            Some("Error")
        );
    }
}
