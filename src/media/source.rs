use std::path::{Path, PathBuf};

use crate::foundation::cancel::CancelToken;
use crate::foundation::core::Fps;
use crate::foundation::error::TranscodeResult;
use crate::foundation::temp::TempFile;

/// An input file handed to the pipeline: raw bytes plus what the uploader declared about them.
#[derive(Clone, Debug)]
pub struct SourceMedia {
    /// File contents.
    pub bytes: Vec<u8>,
    /// Declared MIME type; empty when unknown.
    pub mime_type: String,
    /// Original filename as uploaded.
    pub filename: String,
}

impl SourceMedia {
    /// Wrap in-memory bytes.
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            filename: filename.into(),
        }
    }

    /// Read `path`, inferring the MIME type from its extension.
    pub fn from_path(path: &Path) -> TranscodeResult<Self> {
        use anyhow::Context as _;
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read media '{}'", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            bytes,
            mime_type: mime_from_extension(path).to_owned(),
            filename,
        })
    }

    /// Whether the declared type is absent or a `video/*` type.
    pub fn is_declared_video(&self) -> bool {
        self.mime_type.is_empty() || self.mime_type.starts_with("video/")
    }
}

/// Best-effort MIME type for common upload extensions; empty when unknown.
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "ogv" => "video/ogg",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "",
    }
}

/// Metadata available before any frame is decoded.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaInfo {
    /// Native width in pixels.
    pub width: u32,
    /// Native height in pixels.
    pub height: u32,
    /// Duration in seconds; `0.0` when the container does not report one.
    pub duration_sec: f64,
    /// Native frame rate, when known.
    pub fps: Option<Fps>,
    /// Whether the source carries an audio stream.
    pub has_audio: bool,
}

/// One decoded frame at native size.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Presentation time in seconds from the start of playback.
    pub pts_sec: f64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Straight-alpha RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
}

/// What a source reports on each pull of the frame pump.
#[derive(Clone, Debug)]
pub enum SourceEvent {
    /// A new frame is available.
    Frame(VideoFrame),
    /// Playback is paused at `position_sec`.
    Paused {
        /// Current playback position in seconds.
        position_sec: f64,
    },
    /// The source is repositioning; no frame this tick.
    Seeking,
    /// Playback reached its natural end.
    Ended,
}

/// Interleaved `f32le` PCM extracted from a source, attached to the encoder as a second input.
///
/// Dropping the track releases its backing file.
#[derive(Debug)]
pub struct AudioTrack {
    file: TempFile,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

impl AudioTrack {
    /// Take ownership of a PCM file; it is deleted when the track is dropped.
    pub fn from_pcm_file(path: impl Into<PathBuf>, sample_rate: u32, channels: u16) -> Self {
        Self::from_temp(TempFile::adopt(path), sample_rate, channels)
    }

    pub(crate) fn from_temp(file: TempFile, sample_rate: u32, channels: u16) -> Self {
        Self {
            file,
            sample_rate,
            channels,
        }
    }

    /// Path to the interleaved `f32le` samples.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Decodes an input into sequential frames at native timing.
///
/// Call order: `probe` once, `extract_audio` at most once, `start` once, then `next_event`
/// until the pipeline stops pulling. Dropping the source releases every handle it holds.
pub trait FrameSource: Send {
    /// Load metadata only. Returns promptly with [`Cancelled`](crate::TranscodeError::Cancelled) once `cancel`
    /// fires, releasing anything the probe started.
    fn probe(&mut self, cancel: &CancelToken) -> TranscodeResult<MediaInfo>;
    /// Extract the audio track, or `None` when absent or not routable.
    fn extract_audio(&mut self) -> Option<AudioTrack>;
    /// Begin playback.
    fn start(&mut self) -> TranscodeResult<()>;
    /// Pull the next playback event.
    fn next_event(&mut self) -> TranscodeResult<SourceEvent>;
}

#[cfg(test)]
#[path = "../../tests/unit/media/source.rs"]
mod tests;
