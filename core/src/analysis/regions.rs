use crate::types::catalog::{RegionEntry, REGION_CATALOG};
use crate::types::{BodyRegion, MaskRef};
use crate::volume::MaskSource;
use log::debug;

/// Checks whether a structure was segmented with at least one voxel
///
/// Unreadable files count as absent.
fn structure_present(masks: &dyn MaskSource, name: &'static str) -> bool {
    match masks.load(MaskRef::total(name)) {
        Ok(Some(mask)) => !mask.is_empty(),
        Ok(None) => false,
        Err(e) => {
            debug!("Skipping unreadable structure {}: {}", name, e);
            false
        }
    }
}

fn region_present(masks: &dyn MaskSource, entry: &RegionEntry) -> bool {
    entry
        .structures
        .iter()
        .any(|&name| structure_present(masks, name))
}

/// Detects which body regions the scan covers
///
/// A region is present when any of its characteristic structures has a
/// non-empty mask. Output follows catalog order.
pub fn detect_body_regions(masks: &dyn MaskSource) -> Vec<BodyRegion> {
    REGION_CATALOG
        .iter()
        .filter(|entry| region_present(masks, entry))
        .map(|entry| entry.region)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::boxed_mask;
    use crate::types::VoxelSpacing;
    use crate::volume::{Mask, MemoryMasks};
    use ndarray::Array3;

    fn present() -> Mask {
        boxed_mask((4, 4, 4), 1..2, 1..2, 1..2, VoxelSpacing::default())
    }

    fn empty() -> Mask {
        Mask::new(Array3::from_elem((4, 4, 4), false), VoxelSpacing::default())
    }

    #[test]
    fn test_no_masks_no_regions() {
        assert!(detect_body_regions(&MemoryMasks::new()).is_empty());
    }

    #[test]
    fn test_liver_only_is_abdomen() {
        let masks = MemoryMasks::new().with(MaskRef::total("liver"), present());
        assert_eq!(detect_body_regions(&masks), vec![BodyRegion::Abdomen]);
    }

    #[test]
    fn test_empty_mask_does_not_count() {
        let masks = MemoryMasks::new().with(MaskRef::total("brain"), empty());
        assert!(detect_body_regions(&masks).is_empty());
    }

    #[test]
    fn test_unreadable_mask_treated_as_absent() {
        let mut masks = MemoryMasks::new().with(MaskRef::total("femur_right"), present());
        masks.insert_unreadable(MaskRef::total("skull"));
        assert_eq!(detect_body_regions(&masks), vec![BodyRegion::Legs]);
    }

    #[test]
    fn test_output_follows_catalog_order() {
        let masks = MemoryMasks::new()
            .with(MaskRef::total("femur_left"), present())
            .with(MaskRef::total("heart"), present())
            .with(MaskRef::total("vertebrae_C4"), present())
            .with(MaskRef::total("skull"), empty())
            .with(MaskRef::total("face"), present());
        assert_eq!(
            detect_body_regions(&masks),
            vec![
                BodyRegion::Head,
                BodyRegion::Neck,
                BodyRegion::Thorax,
                BodyRegion::Legs
            ]
        );
    }

    #[test]
    fn test_structures_outside_catalog_ignored() {
        let masks = MemoryMasks::new()
            .with(MaskRef::total("vertebrae_L3"), present())
            .with(MaskRef::total("lung_lower_lobe_left"), present());
        assert!(detect_body_regions(&masks).is_empty());
    }
}
