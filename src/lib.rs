//! folio-transcode turns arbitrary uploaded video into a bounded, web-playable file.
//!
//! A [`Transcoder`] run is one-shot:
//!
//! - Probe the source through a [`FrameSource`] (bounded by a timeout)
//! - Plan output geometry and pick a container from [`CODEC_PREFERENCES`]
//! - Pump decoded frames onto an output [`Surface`] and push one frame per output tick into a
//!   [`FrameSink`]
//! - Hand back an [`OutputArtifact`] whose bytes can be passed to a [`MediaStore`]
//!
//! The bundled [`FfmpegSource`] and [`FfmpegSink`] drive the system `ffmpeg`/`ffprobe` binaries.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod encode;
pub(crate) mod media;
pub(crate) mod pipeline;
pub(crate) mod plan;
pub(crate) mod render;
pub(crate) mod storage;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{Fps, FrameIndex};
pub use crate::foundation::error::{TranscodeError, TranscodeResult};
pub use crate::foundation::temp::TempFile;

pub use crate::encode::ffmpeg::{FfmpegSink, encoder_args};
pub use crate::encode::sink::{
    AudioInputConfig, FrameSink, InMemorySink, SinkConfig, validate_sink_config,
};
pub use crate::media::ffmpeg::{
    AUDIO_CHANNELS, AUDIO_SAMPLE_RATE, FfmpegSource, probe_media,
    probe_media_until,
};
pub use crate::media::source::{
    AudioTrack, FrameSource, MediaInfo, SourceEvent, SourceMedia, VideoFrame, mime_from_extension,
};
pub use crate::pipeline::job::TranscodeJob;
pub use crate::pipeline::options::TranscodeOptions;
pub use crate::pipeline::progress::{MAX_PENDING_PERCENT, ProgressFn, ProgressReporter};
pub use crate::pipeline::transcode::{
    OutputArtifact, TerminationReason, TranscodeStats, Transcoder,
};
pub use crate::plan::codec::{
    CODEC_PREFERENCES, CapabilityProbe, CodecCandidate, EncoderConfig, FALLBACK_CANDIDATE,
    FfmpegCapabilities, select_candidate,
};
pub use crate::plan::geometry::GeometryPlan;
pub use crate::render::surface::Surface;
pub use crate::storage::store::{
    DirMediaStore, MediaMetadata, MediaStore, StoredMedia, publish, sanitize_filename,
};
