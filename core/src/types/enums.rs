use std::fmt;
use std::str::FromStr;

/// Imaging modality of a case
///
/// Hounsfield-based metrics (densities, PDFF, BMD, emphysema) are only
/// defined for CT. MR signal intensity is not standardized across sequences.
/// Any other modality code is kept as-is and handled like MR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Modality {
    #[default]
    Ct,
    Mr,
    Other(String),
}

impl Modality {
    /// Returns whether intensities are in Hounsfield Units
    pub fn is_ct(&self) -> bool {
        matches!(self, Modality::Ct)
    }

    /// Returns the DICOM code for this modality
    pub fn code(&self) -> &str {
        match self {
            Modality::Ct => "CT",
            Modality::Mr => "MR",
            Modality::Other(code) => code,
        }
    }

    /// Returns whether this is neither CT nor MR
    pub fn is_other(&self) -> bool {
        matches!(self, Modality::Other(_))
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CT" => Ok(Modality::Ct),
            "MR" | "MRI" => Ok(Modality::Mr),
            "" => Err("Empty modality".to_string()),
            other => Ok(Modality::Other(other.to_string())),
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Opportunistic bone density classification
///
/// Derived from the mean trabecular attenuation of L1 using the Pickhardt
/// thresholds: > 160 HU normal, 100..=160 HU osteopenia, < 100 HU osteoporosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BmdClassification {
    Normal,
    Osteopenia,
    Osteoporosis,
}

impl BmdClassification {
    /// Upper bound of the osteopenia band (inclusive)
    pub const NORMAL_ABOVE_HU: f64 = 160.0;

    /// Lower bound of the osteopenia band (inclusive)
    pub const OSTEOPENIA_FROM_HU: f64 = 100.0;

    /// Classifies a mean trabecular HU value
    pub fn from_hu(hu_mean: f64) -> Self {
        if hu_mean > Self::NORMAL_ABOVE_HU {
            BmdClassification::Normal
        } else if hu_mean >= Self::OSTEOPENIA_FROM_HU {
            BmdClassification::Osteopenia
        } else {
            BmdClassification::Osteoporosis
        }
    }

    /// Returns the label stored in the metrics result
    pub fn label(&self) -> &'static str {
        match self {
            BmdClassification::Normal => "Normal",
            BmdClassification::Osteopenia => "Osteopenia",
            BmdClassification::Osteoporosis => "Osteoporosis",
        }
    }
}

impl fmt::Display for BmdClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Anatomical body region detected from segmentation output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyRegion {
    Head,
    Neck,
    Thorax,
    Abdomen,
    Pelvis,
    Legs,
}

impl BodyRegion {
    /// Returns simple name for display and serialization
    pub fn simple_name(&self) -> &'static str {
        match self {
            BodyRegion::Head => "head",
            BodyRegion::Neck => "neck",
            BodyRegion::Thorax => "thorax",
            BodyRegion::Abdomen => "abdomen",
            BodyRegion::Pelvis => "pelvis",
            BodyRegion::Legs => "legs",
        }
    }
}

impl fmt::Display for BodyRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Outcome of the lobar emphysema analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LungStatus {
    /// All five lobes present and large enough, CT modality
    Complete,
    /// Lobes missing, undersized, or modality is not CT
    IncompleteOrNonCt,
    /// The completeness gate passed but quantification failed
    Error,
}

impl LungStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LungStatus::Complete => "Complete",
            LungStatus::IncompleteOrNonCt => "Incomplete or non-CT",
            LungStatus::Error => "Error",
        }
    }
}

impl fmt::Display for LungStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
