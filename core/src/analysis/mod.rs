//! Per-case metric analyzers
//!
//! Each analyzer reads the shared intensity volume and its own masks and
//! returns a partial [`MetricsResult`]. Analyzers never mutate shared state,
//! so a failure in one leaves the others untouched.

pub mod bone_density;
pub mod emphysema;
pub mod hemorrhage;
pub mod organs;
pub mod regions;
pub mod sarcopenia;

pub use bone_density::BoneDensityAnalyzer;
pub use emphysema::EmphysemaAnalyzer;
pub use hemorrhage::HemorrhageAnalyzer;
pub use organs::OrganAnalyzer;
pub use regions::detect_body_regions;
pub use sarcopenia::SarcopeniaAnalyzer;

use crate::error::Result;
use crate::extraction::CaseMetadata;
use crate::overlay::OverlayWriter;
use crate::types::{MaskRef, MetricsResult};
use crate::volume::{Mask, MaskSource, Volume};
use log::warn;

/// Inputs shared by all analyzers for one case
pub struct CaseContext<'a> {
    pub case_id: &'a str,
    pub metadata: &'a CaseMetadata,
    pub volume: &'a Volume,
    pub masks: &'a dyn MaskSource,
    /// Overlay destination, `None` disables rendering
    pub overlays: Option<&'a OverlayWriter>,
}

impl CaseContext<'_> {
    pub fn is_ct(&self) -> bool {
        self.metadata.modality.is_ct()
    }

    /// Loads a mask, treating unreadable files like missing ones
    pub fn load_lenient(&self, mask: MaskRef) -> Option<Mask> {
        match self.masks.load(mask) {
            Ok(m) => m,
            Err(e) => {
                warn!("[{}] Treating {} as absent: {}", self.case_id, mask, e);
                None
            }
        }
    }

    /// Overlay writer, only for CT cases with rendering enabled
    pub fn ct_overlays(&self) -> Option<&OverlayWriter> {
        self.overlays.filter(|_| self.is_ct())
    }
}

/// One stage of the metrics pipeline
pub trait Analyzer {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Computes this analyzer's metrics
    ///
    /// Missing inputs are not errors: the analyzer returns whatever subset of
    /// its keys applies. `Err` means an unexpected failure.
    fn analyze(&self, ctx: &CaseContext<'_>) -> Result<MetricsResult>;

    /// Entries reported in place of the analyzer's output when it fails
    fn failure_entries(&self) -> MetricsResult {
        MetricsResult::new()
    }
}

/// Analyzers in pipeline order
pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(OrganAnalyzer),
        Box::new(SarcopeniaAnalyzer),
        Box::new(HemorrhageAnalyzer),
        Box::new(BoneDensityAnalyzer),
        Box::new(EmphysemaAnalyzer),
    ]
}
