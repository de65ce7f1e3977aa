use thiserror::Error;

/// Errors that can occur during recording operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available: {0}")]
    DeviceNotAvailable(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("recorder is not configured")]
    NotConfigured,

    #[error("a recording session is already active")]
    AlreadyRecording,

    #[error("no recording session is active")]
    NotRecording,

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Caller contract violations (start while active, stop while idle, ...).
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::AlreadyRecording | Self::NotRecording)
    }

    /// Failures to open or start the sample source.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::DeviceNotAvailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_are_classified() {
        assert!(CaptureError::AlreadyRecording.is_protocol_error());
        assert!(CaptureError::NotRecording.is_protocol_error());
        assert!(CaptureError::NotConfigured.is_protocol_error());
        assert!(!CaptureError::StorageError("disk full".into()).is_protocol_error());
    }

    #[test]
    fn display_includes_detail() {
        let err = CaptureError::DeviceNotAvailable("busy".into());
        assert_eq!(err.to_string(), "device not available: busy");
        assert!(err.is_device_error());
    }
}
