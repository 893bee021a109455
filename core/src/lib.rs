pub mod analysis;
pub mod api;
pub mod cli;
pub mod error;
pub mod extraction;
pub mod overlay;
pub mod types;
pub mod volume;

pub use api::{calculate_all_metrics, save_results, EngineConfig, MetricsEngine};
pub use cli::report::TextReport;
pub use error::{HeimdallrError, Result};
pub use extraction::CaseMetadata;
pub use types::*;
pub use volume::{CaseDirectory, Mask, MaskSource, MemoryMasks, Volume};
