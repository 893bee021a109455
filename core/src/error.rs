use thiserror::Error;

/// Result type for heimdallr operations
pub type Result<T> = std::result::Result<T, HeimdallrError>;

/// Error types for heimdallr operations
#[derive(Error, Debug)]
pub enum HeimdallrError {
    /// NIfTI reading error
    #[error("NIfTI error: {0}")]
    NiftiError(String),

    /// DICOM reading error
    #[error("DICOM error: {0}")]
    DicomError(String),

    /// Mask grid does not match the intensity grid
    #[error("Shape mismatch: mask {found:?} vs volume {expected:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        found: [usize; 3],
    },

    /// Volume is not three-dimensional
    #[error("Unsupported volume shape: {0:?}")]
    UnsupportedShape(Vec<usize>),

    /// Invalid metadata value
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Overlay rendering error
    #[error("Overlay error: {0}")]
    OverlayError(String),

    /// Generic computation error
    #[error("Computation error: {0}")]
    ComputationError(String),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper conversions
impl From<String> for HeimdallrError {
    fn from(s: String) -> Self {
        HeimdallrError::ComputationError(s)
    }
}

impl From<&str> for HeimdallrError {
    fn from(s: &str) -> Self {
        HeimdallrError::ComputationError(s.to_string())
    }
}

impl From<nifti::NiftiError> for HeimdallrError {
    fn from(e: nifti::NiftiError) -> Self {
        HeimdallrError::NiftiError(format!("{}", e))
    }
}

// Convert dicom-object errors
impl From<dicom_object::ReadError> for HeimdallrError {
    fn from(e: dicom_object::ReadError) -> Self {
        HeimdallrError::DicomError(format!("{}", e))
    }
}

impl From<image::ImageError> for HeimdallrError {
    fn from(e: image::ImageError) -> Self {
        HeimdallrError::OverlayError(format!("{}", e))
    }
}

impl From<ndarray::ShapeError> for HeimdallrError {
    fn from(e: ndarray::ShapeError) -> Self {
        HeimdallrError::NiftiError(format!("{}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = HeimdallrError::ShapeMismatch {
            expected: [512, 512, 200],
            found: [256, 256, 100],
        };
        assert_eq!(
            err.to_string(),
            "Shape mismatch: mask [256, 256, 100] vs volume [512, 512, 200]"
        );
    }

    #[test]
    fn test_from_str_is_computation_error() {
        let err: HeimdallrError = "erosion failed".into();
        assert!(matches!(err, HeimdallrError::ComputationError(_)));
    }
}
