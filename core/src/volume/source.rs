use super::Mask;
use crate::error::{HeimdallrError, Result};
use crate::types::{MaskGroup, MaskRef};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File extension of segmentation masks on disk
pub const MASK_EXTENSION: &str = ".nii.gz";

/// Provider of segmentation masks for one case
///
/// A missing mask is a valid state and yields `Ok(None)`. `Err` is reserved
/// for masks that exist but cannot be read.
pub trait MaskSource {
    fn load(&self, mask: MaskRef) -> Result<Option<Mask>>;
}

/// Segmentation output folder of one case
///
/// Layout:
/// - `total/<name>.nii.gz`
/// - `tissue_types/<name>.nii.gz`
/// - `bleed/<name>.nii.gz`
/// - `id.json` metadata sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseDirectory {
    root: PathBuf,
}

impl CaseDirectory {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Case identifier derived from the folder name
    pub fn case_id(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Path of a mask file, whether or not it exists
    pub fn mask_path(&self, mask: MaskRef) -> PathBuf {
        self.root
            .join(mask.group.dir_name())
            .join(format!("{}{}", mask.name, MASK_EXTENSION))
    }

    /// Path of the `id.json` metadata sidecar
    pub fn sidecar_path(&self) -> PathBuf {
        self.root.join("id.json")
    }

    /// Path of the results file written by the binaries
    pub fn results_path(&self) -> PathBuf {
        self.root.join("resultados.json")
    }
}

impl MaskSource for CaseDirectory {
    fn load(&self, mask: MaskRef) -> Result<Option<Mask>> {
        let path = self.mask_path(mask);
        if !path.is_file() {
            return Ok(None);
        }
        Mask::from_nifti(&path).map(Some)
    }
}

/// In-memory mask provider
///
/// Useful when masks come from an upstream process rather than disk.
/// Entries registered with [`MemoryMasks::insert_unreadable`] behave like
/// files that exist but fail to load.
#[derive(Debug, Clone, Default)]
pub struct MemoryMasks {
    masks: BTreeMap<(MaskGroup, &'static str), Option<Mask>>,
}

impl MemoryMasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mask_ref: MaskRef, mask: Mask) {
        self.masks.insert((mask_ref.group, mask_ref.name), Some(mask));
    }

    /// Builder variant of [`MemoryMasks::insert`]
    pub fn with(mut self, mask_ref: MaskRef, mask: Mask) -> Self {
        self.insert(mask_ref, mask);
        self
    }

    pub fn insert_unreadable(&mut self, mask_ref: MaskRef) {
        self.masks.insert((mask_ref.group, mask_ref.name), None);
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}

impl MaskSource for MemoryMasks {
    fn load(&self, mask: MaskRef) -> Result<Option<Mask>> {
        match self.masks.get(&(mask.group, mask.name)) {
            None => Ok(None),
            Some(Some(m)) => Ok(Some(m.clone())),
            Some(None) => Err(HeimdallrError::NiftiError(format!(
                "{} could not be decoded",
                mask
            ))),
        }
    }
}
