use dicom_core::Tag;
use dicom_object::InMemDicomObject;

// Acquisition Tags
pub const MODALITY: Tag = Tag(0x0008, 0x0060);
pub const KVP: Tag = Tag(0x0018, 0x0060);

// Study/Series Identification Tags
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);

/// Helper to get string value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to string
pub fn get_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim().to_string())
}
