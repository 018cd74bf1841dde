use thiserror::Error;

/// Failures the overlay can run into. None of these ever reach the hosting
/// page; each one disables the affected layer or drives a state transition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverlayError {
    /// GPU context, canvas compositing or audio API missing from the runtime.
    #[error("unsupported capability: {0}")]
    Unsupported(String),
    /// Shader module or pipeline rejected by the driver.
    #[error("shader compile/link error: {0}")]
    ShaderCompile(String),
    /// Autoplay refused by platform policy. Expected; drives a retry.
    #[error("playback not permitted: {0}")]
    PermissionDenied(String),
    /// Any other audio graph failure.
    #[error("audio graph error: {0}")]
    Audio(String),
}
