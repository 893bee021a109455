//! Static anatomical tables driving the analyzers
//!
//! Every analyzer iterates one of these tables instead of branching per
//! structure, so each entry can be tested on its own.

use super::BodyRegion;
use std::fmt;

/// Segmentation output folder a mask belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaskGroup {
    /// General anatomy (organs, bones, vessels, lung lobes)
    Total,
    /// Body composition tissues (skeletal muscle, fat compartments)
    TissueTypes,
    /// Intracranial bleed segmentation
    Bleed,
}

impl MaskGroup {
    /// Subdirectory name inside a case folder
    pub fn dir_name(&self) -> &'static str {
        match self {
            MaskGroup::Total => "total",
            MaskGroup::TissueTypes => "tissue_types",
            MaskGroup::Bleed => "bleed",
        }
    }
}

/// Reference to a named mask within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskRef {
    pub group: MaskGroup,
    pub name: &'static str,
}

impl MaskRef {
    pub const fn total(name: &'static str) -> Self {
        Self {
            group: MaskGroup::Total,
            name,
        }
    }
}

impl fmt::Display for MaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group.dir_name(), self.name)
    }
}

pub const VERTEBRA_L1: MaskRef = MaskRef::total("vertebrae_L1");
pub const VERTEBRA_L3: MaskRef = MaskRef::total("vertebrae_L3");

pub const SKELETAL_MUSCLE: MaskRef = MaskRef {
    group: MaskGroup::TissueTypes,
    name: "skeletal_muscle",
};

pub const INTRACEREBRAL_HEMORRHAGE: MaskRef = MaskRef {
    group: MaskGroup::Bleed,
    name: "intracerebral_hemorrhage",
};

/// A body region and the structures that betray its presence
#[derive(Debug, Clone, Copy)]
pub struct RegionEntry {
    pub region: BodyRegion,
    pub structures: &'static [&'static str],
}

/// Region catalog, in reporting order
pub static REGION_CATALOG: [RegionEntry; 6] = [
    RegionEntry {
        region: BodyRegion::Head,
        structures: &["skull", "brain", "face"],
    },
    RegionEntry {
        region: BodyRegion::Neck,
        structures: &[
            "vertebrae_C1",
            "vertebrae_C2",
            "vertebrae_C3",
            "vertebrae_C4",
            "vertebrae_C5",
            "vertebrae_C6",
            "vertebrae_C7",
            "trachea",
            "thyroid_gland",
        ],
    },
    RegionEntry {
        region: BodyRegion::Thorax,
        structures: &[
            "lung_upper_lobe_left",
            "lung_upper_lobe_right",
            "heart",
            "esophagus",
            "aorta",
            "pulmonary_vein",
        ],
    },
    RegionEntry {
        region: BodyRegion::Abdomen,
        structures: &[
            "liver",
            "spleen",
            "pancreas",
            "kidney_left",
            "kidney_right",
            "stomach",
            "gallbladder",
            "adrenal_gland_left",
        ],
    },
    RegionEntry {
        region: BodyRegion::Pelvis,
        structures: &[
            "sacrum",
            "urinary_bladder",
            "prostate",
            "hip_left",
            "hip_right",
            "gluteus_maximus_left",
        ],
    },
    RegionEntry {
        region: BodyRegion::Legs,
        structures: &["femur_left", "femur_right"],
    },
];

/// Solid organs measured for volume and density
pub static ORGANS: [&str; 4] = ["liver", "spleen", "kidney_right", "kidney_left"];

/// Organ that receives the PDFF estimate
pub const PDFF_ORGAN: &str = "liver";

/// A pulmonary lobe and its minimum plausible volume
#[derive(Debug, Clone, Copy)]
pub struct LobeEntry {
    pub name: &'static str,
    pub min_volume_cm3: f64,
}

/// Lobes required for a complete chest, with their coverage thresholds
///
/// Abdominal scans often capture the lung bases; lobes below these volumes
/// are treated as partially imaged.
pub static LUNG_LOBES: [LobeEntry; 5] = [
    LobeEntry {
        name: "lung_upper_lobe_left",
        min_volume_cm3: 100.0,
    },
    LobeEntry {
        name: "lung_lower_lobe_left",
        min_volume_cm3: 100.0,
    },
    LobeEntry {
        name: "lung_upper_lobe_right",
        min_volume_cm3: 100.0,
    },
    LobeEntry {
        name: "lung_middle_lobe_right",
        min_volume_cm3: 50.0,
    },
    LobeEntry {
        name: "lung_lower_lobe_right",
        min_volume_cm3: 100.0,
    },
];
