//! Core type definitions for the metrics engine
//!
//! This module provides the fundamental types used throughout the heimdallr library:
//! - [`Modality`]: Imaging modality gating HU-based metrics (CT, MR, other)
//! - [`BmdClassification`]: Opportunistic bone density class
//! - [`BodyRegion`]: Anatomical regions detected from segmentation output
//! - [`LungStatus`]: Outcome of the lobar emphysema analysis
//! - [`VoxelSpacing`]: Physical voxel size of a volume
//! - [`Kvp`]: CT tube voltage as recorded in case metadata
//! - [`MetricsResult`]: Open metric-name to value mapping returned per case
//! - [`catalog`]: Static tables of regions, organs and lung lobes

pub mod catalog;
mod enums;
mod kvp;
mod metrics;
mod spacing;

pub use catalog::{MaskGroup, MaskRef};
pub use enums::{BmdClassification, BodyRegion, LungStatus, Modality};
pub use kvp::{Kvp, UNKNOWN_KVP};
pub use metrics::{round_to, MetricsResult};
pub use spacing::VoxelSpacing;
