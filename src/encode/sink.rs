use std::path::PathBuf;
use std::time::Duration;

use image::RgbaImage;

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::plan::codec::CodecCandidate;

/// Configuration provided to a [`FrameSink`] when recording starts.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels (even).
    pub width: u32,
    /// Output height in pixels (even).
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Selected container/codec pair.
    pub container: CodecCandidate,
    /// Target video bitrate in bits per second.
    pub video_bitrate: u32,
    /// Audio bitrate in bits per second; ignored without audio.
    pub audio_bitrate: u32,
    /// Minimum interval between emitted chunks.
    pub timeslice: Duration,
    /// Optional raw PCM audio input.
    pub audio: Option<AudioInputConfig>,
}

/// Raw PCM audio input for sinks that support audio encoding.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Incremental encoder contract.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order. Chunks
/// are returned in emission order by `take_chunks` and then `end`; concatenating them yields the
/// container bytes.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> TranscodeResult<()>;
    /// Push one output tick.
    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> TranscodeResult<()>;
    /// Chunks emitted since the last call, without blocking.
    fn take_chunks(&mut self) -> TranscodeResult<Vec<Vec<u8>>>;
    /// Stop encoding and wait for every remaining chunk.
    fn end(&mut self) -> TranscodeResult<Vec<Vec<u8>>>;
    /// Tear down after a failed run. No chunks are delivered afterwards.
    fn abort(&mut self) {}
}

/// Sink that keeps raw frames in memory and emits one chunk per pushed frame.
///
/// Useful for tests and debugging; the "container" is just concatenated RGBA8.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<FrameIndex>,
    pending: Vec<Vec<u8>>,
    last_idx: Option<FrameIndex>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Indices of the frames pushed so far.
    pub fn frames(&self) -> &[FrameIndex] {
        &self.frames
    }

    /// Whether `end` has completed.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> TranscodeResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.pending.clear();
        self.last_idx = None;
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> TranscodeResult<()> {
        if self.cfg.is_none() {
            return Err(TranscodeError::encoding("in-memory sink not started"));
        }
        if self.last_idx.is_some_and(|last| idx <= last) {
            return Err(TranscodeError::encoding(
                "in-memory sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);
        self.frames.push(idx);
        self.pending.push(frame.as_raw().clone());
        Ok(())
    }

    fn take_chunks(&mut self) -> TranscodeResult<Vec<Vec<u8>>> {
        Ok(std::mem::take(&mut self.pending))
    }

    fn end(&mut self) -> TranscodeResult<Vec<Vec<u8>>> {
        self.ended = true;
        self.take_chunks()
    }

    fn abort(&mut self) {
        self.pending.clear();
    }
}

/// Validate the geometry/rate part of a sink configuration.
pub fn validate_sink_config(cfg: &SinkConfig) -> TranscodeResult<()> {
    if cfg.fps.num == 0 || cfg.fps.den == 0 {
        return Err(TranscodeError::validation("fps must be non-zero"));
    }
    if cfg.width == 0 || cfg.height == 0 {
        return Err(TranscodeError::validation(
            "sink width/height must be non-zero",
        ));
    }
    if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
        return Err(TranscodeError::validation(
            "sink width/height must be even (required for yuv420p output)",
        ));
    }
    if cfg.video_bitrate == 0 {
        return Err(TranscodeError::validation("video bitrate must be non-zero"));
    }
    if let Some(audio) = cfg.audio.as_ref() {
        if audio.sample_rate == 0 {
            return Err(TranscodeError::validation(
                "audio sample_rate must be non-zero when audio is enabled",
            ));
        }
        if audio.channels == 0 {
            return Err(TranscodeError::validation(
                "audio channels must be non-zero when audio is enabled",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
