use crate::analysis::{default_analyzers, detect_body_regions, Analyzer, CaseContext};
use crate::error::Result;
use crate::extraction::CaseMetadata;
use crate::overlay::OverlayWriter;
use crate::types::MetricsResult;
use crate::volume::{CaseDirectory, MaskSource, Volume};
use log::{debug, error, info};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Engine settings
///
/// Overlays are rendered into `overlay_dir` when set. For whole-case runs
/// without an explicit directory, the case folder is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    overlay_dir: Option<PathBuf>,
    render_overlays: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overlay_dir: None,
            render_overlays: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Set the overlay output directory
    pub fn with_overlay_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.overlay_dir = Some(dir.into());
        self
    }

    /// Builder: Enable or disable overlay rendering
    pub fn with_render_overlays(mut self, render: bool) -> Self {
        self.render_overlays = render;
        self
    }

    pub fn overlay_dir(&self) -> Option<&Path> {
        self.overlay_dir.as_deref()
    }

    pub fn render_overlays(&self) -> bool {
        self.render_overlays
    }

    fn overlay_writer(&self, fallback: Option<&Path>) -> Option<OverlayWriter> {
        if !self.render_overlays {
            return None;
        }
        self.overlay_dir
            .as_deref()
            .or(fallback)
            .map(OverlayWriter::new)
    }
}

/// Runs every analyzer against one case and assembles the result
///
/// The engine holds no case-spanning state. Each analyzer is isolated: an
/// analyzer that fails is logged, contributes only its failure entries, and
/// never stops the analyzers after it.
///
/// # Example
///
/// ```
/// use heimdallr_core::{
///     CaseMetadata, EngineConfig, Mask, MaskRef, MemoryMasks, MetricsEngine, Modality, Volume,
///     VoxelSpacing,
/// };
/// use ndarray::Array3;
///
/// let spacing = VoxelSpacing::new(1.0, 1.0, 1.0);
/// let volume = Volume::new(Array3::from_elem((10, 10, 10), 50.0), spacing);
/// let liver = Mask::new(Array3::from_elem((10, 10, 10), true), spacing);
/// let masks = MemoryMasks::new().with(MaskRef::total("liver"), liver);
/// let metadata = CaseMetadata::new(Modality::Ct).with_kvp("120");
///
/// let engine = MetricsEngine::new(EngineConfig::default());
/// let result = engine.calculate("CASE1", &metadata, &volume, &masks);
///
/// assert_eq!(result.get_str("modality"), Some("CT"));
/// assert_eq!(result.get_f64("liver_vol_cm3"), Some(1.0));
/// assert_eq!(result.get_f64("liver_hu_mean"), Some(50.0));
/// ```
pub struct MetricsEngine {
    config: EngineConfig,
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl MetricsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            analyzers: default_analyzers(),
        }
    }

    /// Builder: Replace the analyzer pipeline
    pub fn with_analyzers(mut self, analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        self.analyzers = analyzers;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Computes metrics for an already-loaded case
    ///
    /// Overlays go to the configured overlay directory, if any.
    pub fn calculate(
        &self,
        case_id: &str,
        metadata: &CaseMetadata,
        volume: &Volume,
        masks: &dyn MaskSource,
    ) -> MetricsResult {
        let overlays = self.config.overlay_writer(None);
        self.run(case_id, metadata, volume, masks, overlays.as_ref())
    }

    /// Computes metrics for a case folder, reading its `id.json` sidecar
    ///
    /// # Errors
    ///
    /// Returns an error if the intensity volume cannot be loaded.
    pub fn calculate_case(&self, case: &CaseDirectory, volume_path: &Path) -> Result<MetricsResult> {
        let metadata = CaseMetadata::from_sidecar(case.sidecar_path())?;
        self.calculate_case_with(&case.case_id(), &metadata, case, volume_path)
    }

    /// Computes metrics for a case folder with caller-supplied metadata
    pub fn calculate_case_with(
        &self,
        case_id: &str,
        metadata: &CaseMetadata,
        case: &CaseDirectory,
        volume_path: &Path,
    ) -> Result<MetricsResult> {
        info!(
            "[{}] Loading {} volume {}",
            case_id,
            metadata.modality,
            volume_path.display()
        );
        let volume = Volume::from_nifti(volume_path)?;
        debug!("[{}] Volume shape {:?}, spacing {}", case_id, volume.shape(), volume.spacing());

        let overlays = self.config.overlay_writer(Some(case.root()));
        Ok(self.run(case_id, metadata, &volume, case, overlays.as_ref()))
    }

    fn run(
        &self,
        case_id: &str,
        metadata: &CaseMetadata,
        volume: &Volume,
        masks: &dyn MaskSource,
        overlays: Option<&OverlayWriter>,
    ) -> MetricsResult {
        let regions = detect_body_regions(masks);

        let mut result = MetricsResult::new();
        result.insert("case_id", case_id);
        result.insert(
            "body_regions",
            Value::Array(
                regions
                    .iter()
                    .map(|r| Value::from(r.simple_name()))
                    .collect(),
            ),
        );
        result.insert("modality", metadata.modality.code());

        let ctx = CaseContext {
            case_id,
            metadata,
            volume,
            masks,
            overlays,
        };

        for analyzer in &self.analyzers {
            match analyzer.analyze(&ctx) {
                Ok(partial) => {
                    debug!("[{}] {}: {} keys", case_id, analyzer.name(), partial.len());
                    result.merge(partial);
                }
                Err(e) => {
                    error!("[{}] Error in {} analysis: {}", case_id, analyzer.name(), e);
                    result.merge(analyzer.failure_entries());
                }
            }
        }

        info!("[{}] Computed {} metrics", case_id, result.len());
        result
    }
}

/// Computes metrics for a case folder with the default configuration
///
/// Overlays are written into the case folder.
pub fn calculate_all_metrics<P: AsRef<Path>, Q: AsRef<Path>>(
    case_id: &str,
    volume_path: P,
    case_dir: Q,
) -> Result<MetricsResult> {
    let case = CaseDirectory::new(case_dir.as_ref());
    let metadata = CaseMetadata::from_sidecar(case.sidecar_path())?;
    MetricsEngine::new(EngineConfig::default()).calculate_case_with(
        case_id,
        &metadata,
        &case,
        volume_path.as_ref(),
    )
}

/// Writes a result as pretty-printed JSON
pub fn save_results<P: AsRef<Path>>(result: &MetricsResult, path: P) -> Result<()> {
    std::fs::write(path.as_ref(), result.to_json_pretty()?)?;
    Ok(())
}
