use super::{Analyzer, CaseContext};
use crate::error::Result;
use crate::types::catalog::{ORGANS, PDFF_ORGAN};
use crate::types::{round_to, MaskRef, MetricsResult};
use crate::volume::stats::masked_mean_std;
use crate::volume::{Mask, Volume};
use log::{debug, warn};

/// Minimum liver volume (cm³) for a PDFF estimate
pub const PDFF_MIN_VOLUME_CM3: f64 = 0.1;

/// Estimates liver proton density fat fraction (%) from mean HU
///
/// Linear calibration (Pickhardt, 120 kVp) clamped to 0..=100.
pub fn estimate_pdff(hu_mean: f64) -> f64 {
    (-0.58 * hu_mean + 38.2).clamp(0.0, 100.0)
}

/// Mean/std HU under an organ mask, `None` if unusable
fn organ_density(case_id: &str, organ: &str, mask: &Mask, volume: &Volume) -> Option<(f64, f64)> {
    if let Err(e) = mask.ensure_matches(volume) {
        warn!("[{}] Skipping {} density: {}", case_id, organ, e);
        return None;
    }
    let density = masked_mean_std(&volume.data().view(), &mask.data().view());
    if density.is_none() {
        debug!("[{}] {} mask is empty", case_id, organ);
    }
    density
}

/// Solid organ volumetry and densitometry
///
/// Volumes are reported for every modality (0.0 when the mask is missing).
/// On CT the mean/std HU is reported as a value or `null`; on MR both are
/// always `null`. The liver additionally gets a PDFF estimate on CT.
pub struct OrganAnalyzer;

impl Analyzer for OrganAnalyzer {
    fn name(&self) -> &'static str {
        "organs"
    }

    fn analyze(&self, ctx: &CaseContext<'_>) -> Result<MetricsResult> {
        let mut out = MetricsResult::new();

        for &organ in ORGANS.iter() {
            let mask = ctx.load_lenient(MaskRef::total(organ));
            let volume_cm3 = mask.as_ref().map(Mask::volume_cm3).unwrap_or(0.0);
            out.insert(format!("{}_vol_cm3", organ), volume_cm3);

            if !ctx.is_ct() {
                out.insert_null(format!("{}_hu_mean", organ));
                out.insert_null(format!("{}_hu_std", organ));
                continue;
            }

            let density = mask
                .as_ref()
                .and_then(|m| organ_density(ctx.case_id, organ, m, ctx.volume))
                .map(|(mean, std)| (round_to(mean, 2), round_to(std, 2)));
            out.insert_rounded_or_null(format!("{}_hu_mean", organ), density.map(|d| d.0), 2);
            out.insert_rounded_or_null(format!("{}_hu_std", organ), density.map(|d| d.1), 2);

            if organ == PDFF_ORGAN && volume_cm3 > PDFF_MIN_VOLUME_CM3 {
                if let Some((hu_mean, _)) = density {
                    out.insert_rounded(
                        format!("{}_pdff_percent", organ),
                        estimate_pdff(hu_mean),
                        2,
                    );
                    out.insert(
                        format!("{}_pdff_kvp", organ),
                        ctx.metadata.kvp.raw.clone(),
                    );
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{boxed_mask, ct, ctx, mr, volume};
    use crate::types::VoxelSpacing;
    use crate::volume::MemoryMasks;
    use rstest::rstest;

    #[rstest]
    #[case(-1000.0, 100.0)]
    #[case(1000.0, 0.0)]
    #[case(0.0, 38.2)]
    #[case(50.0, 9.2)]
    #[case(66.0, 0.0)]
    fn test_estimate_pdff(#[case] hu: f64, #[case] expected: f64) {
        assert!((estimate_pdff(hu) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_pdff_always_in_range() {
        for hu in (-3000..=3000).step_by(7) {
            let pdff = estimate_pdff(hu as f64);
            assert!((0.0..=100.0).contains(&pdff));
        }
    }

    #[test]
    fn test_ct_liver_volume_density_and_pdff() {
        let vol = volume((20, 20, 20), 50.0);
        let liver = boxed_mask((20, 20, 20), 0..10, 0..10, 0..10, VoxelSpacing::default());
        let masks = MemoryMasks::new().with(MaskRef::total("liver"), liver);
        let meta = ct();

        let out = OrganAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();

        assert_eq!(out.get_f64("liver_vol_cm3"), Some(1.0));
        assert_eq!(out.get_f64("liver_hu_mean"), Some(50.0));
        assert_eq!(out.get_f64("liver_hu_std"), Some(0.0));
        assert_eq!(out.get_f64("liver_pdff_percent"), Some(9.2));
        assert_eq!(out.get_str("liver_pdff_kvp"), Some("120"));

        // absent organs: zero volume, null densities
        assert_eq!(out.get_f64("spleen_vol_cm3"), Some(0.0));
        assert!(out.is_null("spleen_hu_mean"));
        assert!(out.is_null("kidney_left_hu_std"));
        assert!(!out.contains_key("spleen_pdff_percent"));
    }

    #[test]
    fn test_pdff_requires_liver_above_min_volume() {
        let vol = volume((10, 10, 10), 50.0);
        // 100 voxels of 1 mm³ = 0.1 cm³, not strictly above the minimum
        let liver = boxed_mask((10, 10, 10), 0..10, 0..10, 0..1, VoxelSpacing::default());
        let masks = MemoryMasks::new().with(MaskRef::total("liver"), liver);
        let meta = ct();

        let out = OrganAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        assert_eq!(out.get_f64("liver_vol_cm3"), Some(0.1));
        assert_eq!(out.get_f64("liver_hu_mean"), Some(50.0));
        assert!(!out.contains_key("liver_pdff_percent"));
        assert!(!out.contains_key("liver_pdff_kvp"));
    }

    #[test]
    fn test_shape_mismatch_nulls_density_but_keeps_volume() {
        let vol = volume((10, 10, 10), 50.0);
        let spleen = boxed_mask((12, 10, 10), 0..5, 0..5, 0..5, VoxelSpacing::default());
        let masks = MemoryMasks::new().with(MaskRef::total("spleen"), spleen);
        let meta = ct();

        let out = OrganAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        assert_eq!(out.get_f64("spleen_vol_cm3"), Some(0.125));
        assert!(out.is_null("spleen_hu_mean"));
        assert!(out.is_null("spleen_hu_std"));
    }

    #[test]
    fn test_mr_never_reports_hu_or_pdff() {
        let vol = volume((20, 20, 20), 300.0);
        let liver = boxed_mask((20, 20, 20), 0..10, 0..10, 0..10, VoxelSpacing::default());
        let masks = MemoryMasks::new().with(MaskRef::total("liver"), liver);
        let meta = mr();

        let out = OrganAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        assert_eq!(out.get_f64("liver_vol_cm3"), Some(1.0));
        assert!(out.is_null("liver_hu_mean"));
        assert!(out.is_null("liver_hu_std"));
        assert!(!out.contains_key("liver_pdff_percent"));
    }

    #[test]
    fn test_unreadable_mask_counts_as_absent() {
        let vol = volume((4, 4, 4), 0.0);
        let mut masks = MemoryMasks::new();
        masks.insert_unreadable(MaskRef::total("kidney_right"));
        let meta = ct();

        let out = OrganAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        assert_eq!(out.get_f64("kidney_right_vol_cm3"), Some(0.0));
        assert!(out.is_null("kidney_right_hu_mean"));
    }

    #[test]
    fn test_key_order() {
        let vol = volume((4, 4, 4), 0.0);
        let masks = MemoryMasks::new();
        let meta = ct();
        let out = OrganAnalyzer.analyze(&ctx(&meta, &vol, &masks)).unwrap();
        let keys: Vec<_> = out.keys().take(3).cloned().collect();
        assert_eq!(keys, vec!["liver_vol_cm3", "liver_hu_mean", "liver_hu_std"]);
        assert_eq!(out.len(), 12);
    }
}
