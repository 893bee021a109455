use super::{Analyzer, CaseContext};
use crate::error::Result;
use crate::types::catalog::INTRACEREBRAL_HEMORRHAGE;
use crate::types::MetricsResult;
use log::{debug, info, warn};
use serde_json::{Map, Value};

/// Representative slice labels and their positions within the bleed extent
pub const REPRESENTATIVE_POSITIONS: [(&str, f64); 3] = [
    ("inferior_15", 0.15),
    ("center_50", 0.50),
    ("superior_85", 0.85),
];

/// Picks slices at fixed fractions of the sorted axial index set
///
/// Positions are taken within the index set, not along the z axis, and
/// clamped to its bounds.
pub fn representative_slices(indices: &[usize]) -> Option<Vec<(&'static str, usize)>> {
    if indices.is_empty() {
        return None;
    }
    let n = indices.len();
    Some(
        REPRESENTATIVE_POSITIONS
            .iter()
            .map(|&(label, fraction)| {
                let pos = ((n as f64 * fraction) as usize).min(n - 1);
                (label, indices[pos])
            })
            .collect(),
    )
}

/// Intracranial hemorrhage volume and representative slices
pub struct HemorrhageAnalyzer;

impl Analyzer for HemorrhageAnalyzer {
    fn name(&self) -> &'static str {
        "hemorrhage"
    }

    fn analyze(&self, ctx: &CaseContext<'_>) -> Result<MetricsResult> {
        let mut out = MetricsResult::new();

        let Some(bleed) = ctx.masks.load(INTRACEREBRAL_HEMORRHAGE)? else {
            debug!("[{}] No hemorrhage mask", ctx.case_id);
            return Ok(out);
        };

        let volume_cm3 = bleed.volume_cm3();
        out.insert("hemorrhage_vol_cm3", volume_cm3);
        if volume_cm3 <= 0.0 {
            return Ok(out);
        }

        let Some(slices) = representative_slices(&bleed.axial_indices()) else {
            return Ok(out);
        };
        info!("[{}] Hemorrhage {:.2} cm³", ctx.case_id, volume_cm3);

        let mut labeled = Map::new();
        for &(label, z) in &slices {
            labeled.insert(label.to_string(), Value::from(z));
        }
        out.insert("hemorrhage_analysis_slices", Value::Object(labeled));

        if let Some(writer) = ctx.ct_overlays() {
            match bleed.ensure_matches(ctx.volume) {
                Ok(()) => {
                    for &(label, z) in &slices {
                        if let Err(e) = writer.hemorrhage(
                            label,
                            &ctx.volume.axial_slice(z),
                            &bleed.axial_slice(z),
                        ) {
                            warn!("[{}] Error generating hemorrhage overlay: {}", ctx.case_id, e);
                        }
                    }
                }
                Err(e) => warn!("[{}] Skipping hemorrhage overlays: {}", ctx.case_id, e),
            }
        }

        Ok(out)
    }
}
