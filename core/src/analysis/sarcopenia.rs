use super::{Analyzer, CaseContext};
use crate::error::Result;
use crate::types::catalog::{SKELETAL_MUSCLE, VERTEBRA_L3};
use crate::types::MetricsResult;
use crate::volume::stats::masked_mean_std;
use crate::volume::Mask;
use log::{debug, info, warn};

/// Middle element of a sorted slice-index set (floor of count / 2)
pub fn middle_index(indices: &[usize]) -> Option<usize> {
    indices.get(indices.len() / 2).copied()
}

/// Skeletal muscle area (cm²) of one axial slice
pub fn muscle_area_cm2(muscle: &Mask, z: usize) -> f64 {
    let pixels = muscle.axial_slice(z).iter().filter(|&&v| v).count();
    pixels as f64 * muscle.spacing().pixel_area_mm2() / 100.0
}

/// Body composition at the L3 landmark
///
/// Reports the L3 mid-slice index, the skeletal muscle area at that slice
/// and, on CT, the muscle attenuation. An empty muscle cross-section on CT
/// reports 0.0 HU rather than `null`; on MR the densities are `null`.
pub struct SarcopeniaAnalyzer;

impl Analyzer for SarcopeniaAnalyzer {
    fn name(&self) -> &'static str {
        "sarcopenia"
    }

    fn analyze(&self, ctx: &CaseContext<'_>) -> Result<MetricsResult> {
        let mut out = MetricsResult::new();

        let Some(l3) = ctx.masks.load(VERTEBRA_L3)? else {
            debug!("[{}] No L3 mask, skipping sarcopenia", ctx.case_id);
            return Ok(out);
        };
        let Some(z) = middle_index(&l3.axial_indices()) else {
            warn!("[{}] L3 vertebra found but mask is empty", ctx.case_id);
            return Ok(out);
        };
        out.insert("slice_L3", z);

        if let Err(e) = l3.ensure_matches(ctx.volume) {
            warn!("[{}] Skipping L3 muscle analysis: {}", ctx.case_id, e);
            return Ok(out);
        }

        let muscle = match ctx.masks.load(SKELETAL_MUSCLE)? {
            Some(m) => match m.ensure_matches(ctx.volume) {
                Ok(()) => Some(m),
                Err(e) => {
                    warn!("[{}] Skipping skeletal muscle: {}", ctx.case_id, e);
                    None
                }
            },
            None => None,
        };

        if let Some(writer) = ctx.ct_overlays() {
            let highlight = muscle.as_ref().unwrap_or(&l3).axial_slice(z);
            if let Err(e) = writer.l3(&ctx.volume.axial_slice(z), &highlight) {
                warn!("[{}] Error generating L3 overlay: {}", ctx.case_id, e);
            }
        }

        let Some(muscle) = muscle else {
            debug!("[{}] No skeletal muscle mask, SMA not computed", ctx.case_id);
            return Ok(out);
        };

        let sma = muscle_area_cm2(&muscle, z);
        out.insert_rounded("SMA_cm2", sma, 3);

        if ctx.is_ct() {
            let (mean, std) = masked_mean_std(&ctx.volume.axial_slice(z), &muscle.axial_slice(z))
                .unwrap_or((0.0, 0.0));
            out.insert_rounded("muscle_HU_mean", mean, 2);
            out.insert_rounded("muscle_HU_std", std, 2);
        } else {
            out.insert_null("muscle_HU_mean");
            out.insert_null("muscle_HU_std");
        }

        info!("[{}] L3 slice {}: SMA {:.1} cm²", ctx.case_id, z, sma);
        Ok(out)
    }
}
