use std::time::Duration;

/// Convenience result type used across folio-transcode.
pub type TranscodeResult<T> = Result<T, TranscodeError>;

/// Terminal failure of a transcode, probe, or storage call.
///
/// None of these are retried internally; retry policy belongs to the caller.
#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    /// Metadata probing did not finish within the configured bound.
    #[error("media load timed out after {}ms", .0.as_millis())]
    MediaLoadTimeout(Duration),

    /// Malformed, unreadable, or unsupported input.
    #[error("media load error: {0}")]
    MediaLoad(String),

    /// The source could not begin producing frames.
    #[error("playback start error: {0}")]
    PlaybackStart(String),

    /// The incremental encoder reported an internal fault.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The run completed but produced zero output bytes.
    #[error("empty output: {0}")]
    EmptyOutput(String),

    /// Invalid caller-provided options.
    #[error("validation error: {0}")]
    Validation(String),

    /// The storage collaborator rejected or failed to persist a payload.
    #[error("storage error: {0}")]
    Storage(String),

    /// The caller tripped the cancellation token.
    #[error("transcode cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TranscodeError {
    /// Build a [`TranscodeError::MediaLoad`] value.
    pub fn media_load(msg: impl Into<String>) -> Self {
        Self::MediaLoad(msg.into())
    }

    /// Build a [`TranscodeError::PlaybackStart`] value.
    pub fn playback_start(msg: impl Into<String>) -> Self {
        Self::PlaybackStart(msg.into())
    }

    /// Build a [`TranscodeError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`TranscodeError::EmptyOutput`] value.
    pub fn empty_output(msg: impl Into<String>) -> Self {
        Self::EmptyOutput(msg.into())
    }

    /// Build a [`TranscodeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TranscodeError::Storage`] value.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
