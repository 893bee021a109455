use crate::error::{HeimdallrError, Result};
use crate::types::{Kvp, Modality};
use dicom_object::{open_file, InMemDicomObject};
use log::warn;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use super::tags::{get_string_value, KVP, MODALITY, STUDY_INSTANCE_UID};

/// Per-case acquisition metadata
///
/// Modality gates every Hounsfield-based metric; kVp is only recorded
/// alongside the liver fat estimate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaseMetadata {
    /// Imaging modality (CT when unspecified)
    pub modality: Modality,

    /// Tube voltage (CT only)
    pub kvp: Kvp,

    /// Human-readable case name used when archiving volumes
    pub clinical_name: Option<String>,

    /// Study Instance UID
    pub study_instance_uid: Option<String>,
}

/// Raw `id.json` sidecar as written by the ingestion pipeline
#[derive(Debug, Default, Deserialize)]
struct Sidecar {
    #[serde(rename = "Modality")]
    modality: Option<String>,
    #[serde(rename = "KVP")]
    kvp: Option<Value>,
    #[serde(rename = "ClinicalName")]
    clinical_name: Option<String>,
    #[serde(rename = "StudyInstanceUID")]
    study_instance_uid: Option<String>,
}

fn kvp_from_json(value: Option<&Value>) -> Kvp {
    match value {
        None | Some(Value::Null) => Kvp::unknown(),
        Some(Value::String(s)) => Kvp::parse(s),
        Some(other) => Kvp::parse(&other.to_string()),
    }
}

fn parse_modality(raw: Option<&str>) -> Modality {
    match raw.map(str::trim) {
        None | Some("") => Modality::default(),
        Some(m) => {
            let modality = m.parse::<Modality>().unwrap_or_default();
            if modality.is_other() {
                warn!(
                    "Unsupported modality '{}', skipping Hounsfield metrics",
                    modality
                );
            }
            modality
        }
    }
}

impl CaseMetadata {
    /// Creates metadata for a modality with unknown kVp
    pub fn new(modality: Modality) -> Self {
        Self {
            modality,
            ..Self::default()
        }
    }

    /// Builder: Set kVp from its raw tag text
    pub fn with_kvp(mut self, raw: &str) -> Self {
        self.kvp = Kvp::parse(raw);
        self
    }

    /// Parses an `id.json` sidecar document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON.
    pub fn from_sidecar_str(json: &str) -> Result<Self> {
        let sidecar: Sidecar = serde_json::from_str(json)?;
        Ok(Self {
            modality: parse_modality(sidecar.modality.as_deref()),
            kvp: kvp_from_json(sidecar.kvp.as_ref()),
            clinical_name: sidecar
                .clinical_name
                .filter(|n| !n.is_empty() && n != "Unknown"),
            study_instance_uid: sidecar.study_instance_uid,
        })
    }

    /// Reads the sidecar at `path`, falling back to defaults when absent
    ///
    /// A sidecar that exists but cannot be parsed is logged and treated as
    /// absent.
    pub fn from_sidecar<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Ignoring unreadable sidecar {}: {}", path.display(), e);
                return Ok(Self::default());
            }
        };
        match Self::from_sidecar_str(&text) {
            Err(HeimdallrError::JsonError(e)) => {
                warn!("Ignoring malformed sidecar {}: {}", path.display(), e);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Extracts metadata from a DICOM header
    pub fn from_dicom(dcm: &InMemDicomObject) -> Result<Self> {
        let modality = parse_modality(get_string_value(dcm, MODALITY).as_deref());
        let kvp = get_string_value(dcm, KVP)
            .map(|s| Kvp::parse(&s))
            .unwrap_or_default();
        Ok(Self {
            modality,
            kvp,
            clinical_name: None,
            study_instance_uid: get_string_value(dcm, STUDY_INSTANCE_UID),
        })
    }

    /// Reads metadata from a DICOM file
    pub fn from_dicom_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dcm = open_file(path.as_ref())?;
        Self::from_dicom(&dcm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::{DataElement, PrimitiveValue, VR};
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_sidecar_ct_with_numeric_kvp() {
        let meta = CaseMetadata::from_sidecar_str(r#"{"Modality": "CT", "KVP": 120}"#).unwrap();
        assert_eq!(meta.modality, Modality::Ct);
        assert_eq!(meta.kvp.raw, "120");
        assert_eq!(meta.kvp.value, Some(120.0));
    }

    #[test]
    fn test_sidecar_string_kvp() {
        let meta = CaseMetadata::from_sidecar_str(
            r#"{"Modality": "CT", "KVP": "100", "ClinicalName": "DOE_J", "StudyInstanceUID": "1.2.3"}"#,
        )
        .unwrap();
        assert_eq!(meta.kvp.value, Some(100.0));
        assert_eq!(meta.clinical_name.as_deref(), Some("DOE_J"));
        assert_eq!(meta.study_instance_uid.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_sidecar_defaults() {
        let meta = CaseMetadata::from_sidecar_str(r#"{"ClinicalName": "Unknown"}"#).unwrap();
        assert_eq!(meta.modality, Modality::Ct);
        assert_eq!(meta.kvp, Kvp::unknown());
        assert!(meta.clinical_name.is_none());
    }

    #[test]
    fn test_sidecar_mr() {
        let meta = CaseMetadata::from_sidecar_str(r#"{"Modality": "MR", "KVP": null}"#).unwrap();
        assert_eq!(meta.modality, Modality::Mr);
        assert!(!meta.kvp.is_known());
    }

    #[test]
    fn test_sidecar_other_modality_is_kept() {
        let meta = CaseMetadata::from_sidecar_str(r#"{"Modality": "PT"}"#).unwrap();
        assert_eq!(meta.modality, Modality::Other("PT".to_string()));
        assert!(!meta.modality.is_ct());
    }

    #[test]
    fn test_missing_sidecar_file() {
        let temp_dir = TempDir::new().unwrap();
        let meta = CaseMetadata::from_sidecar(temp_dir.path().join("id.json")).unwrap();
        assert_eq!(meta, CaseMetadata::default());
    }

    #[test]
    fn test_malformed_sidecar_file_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("id.json");
        File::create(&path).unwrap().write_all(b"{not json").unwrap();
        let meta = CaseMetadata::from_sidecar(&path).unwrap();
        assert_eq!(meta.modality, Modality::Ct);
    }

    #[test]
    fn test_from_dicom() {
        let mut dcm = InMemDicomObject::new_empty();
        dcm.put(DataElement::new(MODALITY, VR::CS, PrimitiveValue::from("CT")));
        dcm.put(DataElement::new(KVP, VR::DS, PrimitiveValue::from("120")));
        dcm.put(DataElement::new(
            STUDY_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from("1.2.840.1"),
        ));

        let meta = CaseMetadata::from_dicom(&dcm).unwrap();
        assert_eq!(meta.modality, Modality::Ct);
        assert_eq!(meta.kvp.value, Some(120.0));
        assert_eq!(meta.study_instance_uid.as_deref(), Some("1.2.840.1"));
    }

    #[test]
    fn test_from_dicom_mr_without_kvp() {
        let mut dcm = InMemDicomObject::new_empty();
        dcm.put(DataElement::new(MODALITY, VR::CS, PrimitiveValue::from("MR")));
        let meta = CaseMetadata::from_dicom(&dcm).unwrap();
        assert_eq!(meta.modality, Modality::Mr);
        assert_eq!(meta.kvp, Kvp::unknown());
    }
}
