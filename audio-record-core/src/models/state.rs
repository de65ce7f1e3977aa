use super::error::CaptureError;
use super::recording_result::RecordingResult;

/// Recorder state machine.
///
/// State transitions:
/// ```text
/// idle → ready → capturing → stopping → completed / failed
///          ↑                                  │
///          └──────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Ready,
    Capturing,
    Stopping,
    Completed(Box<RecordingResult>),
    Failed(CaptureError),
}

impl CaptureState {
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }

    /// Whether a new session may be started from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Ready | Self::Completed(_) | Self::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Capturing => "capturing",
            Self::Stopping => "stopping",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }
}
