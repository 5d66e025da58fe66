use std::path::Path;
use std::time::Duration;

use crate::foundation::core::Fps;
use crate::foundation::error::{TranscodeError, TranscodeResult};

/// Tunables for one transcode run.
///
/// Deserializes from JSON with every field optional; missing fields take the defaults below.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TranscodeOptions {
    /// Output width cap in pixels.
    pub max_width: u32,
    /// Output height cap in pixels.
    pub max_height: u32,
    /// Target video bitrate in bits per second.
    pub target_bitrate: u32,
    /// Output frame rate.
    pub frame_rate: Fps,
    /// Fixed audio bitrate in bits per second.
    pub audio_bitrate: u32,
    /// Bound on metadata probing.
    pub probe_timeout_ms: u64,
    /// Absolute recording ceiling, regardless of source duration.
    pub max_duration_ms: u64,
    /// Wall-clock wait for trailing encoder chunks after the source ends, before the encoder
    /// is stopped.
    pub end_grace_ms: u64,
    /// Minimum interval between forwarded progress updates.
    pub progress_interval_ms: u64,
    /// Minimum interval between encoder chunks.
    pub timeslice_ms: u64,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            target_bitrate: 2_500_000,
            frame_rate: Fps { num: 30, den: 1 },
            audio_bitrate: 128_000,
            probe_timeout_ms: 30_000,
            max_duration_ms: 5 * 60 * 1000,
            end_grace_ms: 500,
            progress_interval_ms: 250,
            timeslice_ms: 1000,
        }
    }
}

impl TranscodeOptions {
    /// Load options from a JSON file.
    pub fn from_json_file(path: &Path) -> TranscodeResult<Self> {
        use anyhow::Context as _;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read options '{}'", path.display()))?;
        let opts: Self = serde_json::from_str(&text).map_err(|e| {
            TranscodeError::validation(format!("invalid options '{}': {e}", path.display()))
        })?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> TranscodeResult<()> {
        if self.max_width < 2 || self.max_height < 2 {
            return Err(TranscodeError::validation(
                "max_width/max_height must be at least 2",
            ));
        }
        if self.target_bitrate == 0 {
            return Err(TranscodeError::validation("target_bitrate must be non-zero"));
        }
        if self.audio_bitrate == 0 {
            return Err(TranscodeError::validation("audio_bitrate must be non-zero"));
        }
        Fps::new(self.frame_rate.num, self.frame_rate.den)?;
        if self.probe_timeout_ms == 0 {
            return Err(TranscodeError::validation(
                "probe_timeout_ms must be non-zero",
            ));
        }
        if self.max_duration_ms == 0 {
            return Err(TranscodeError::validation("max_duration_ms must be non-zero"));
        }
        Ok(())
    }

    /// [`Self::probe_timeout_ms`] as a `Duration`.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// [`Self::max_duration_ms`] as a `Duration`.
    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }

    /// [`Self::end_grace_ms`] as a `Duration`.
    pub fn end_grace(&self) -> Duration {
        Duration::from_millis(self.end_grace_ms)
    }

    /// [`Self::progress_interval_ms`] as a `Duration`.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// [`Self::timeslice_ms`] as a `Duration`.
    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms)
    }

    /// One output tick.
    pub fn tick(&self) -> Duration {
        let Fps { num, den } = self.frame_rate;
        Duration::from_nanos(u64::from(den) * 1_000_000_000 / u64::from(num.max(1)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/options.rs"]
mod tests;
