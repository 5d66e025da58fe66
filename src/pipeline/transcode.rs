use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::media::source::{FrameSource, MediaInfo, SourceEvent};
use crate::pipeline::options::TranscodeOptions;
use crate::pipeline::progress::{ProgressFn, ProgressReporter};
use crate::plan::codec::{CapabilityProbe, EncoderConfig, select_candidate};
use crate::plan::geometry::GeometryPlan;
use crate::render::surface::Surface;

const PROBE_POLL: Duration = Duration::from_millis(20);
const TICK_EPSILON: f64 = 1e-9;

/// Why the frame pump stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The source reported its natural end.
    Ended,
    /// The source paused after playback had started.
    Paused,
    /// The recording ceiling was reached.
    MaxDuration,
    /// A frame could not be read or drawn; captured output was kept.
    SourceError,
}

/// Counters and decisions from one run.
#[derive(Clone, Debug, serde::Serialize)]
pub struct TranscodeStats {
    /// Probed source metadata.
    pub source: MediaInfo,
    /// Output geometry.
    pub geometry: GeometryPlan,
    /// Encoder settings.
    pub encoder: EncoderConfig,
    /// Frames pulled from the source.
    pub frames_decoded: u64,
    /// Ticks pushed to the encoder.
    pub frames_encoded: u64,
    /// Non-empty chunks received from the encoder.
    pub chunks: u64,
    /// What ended the frame pump.
    pub termination: TerminationReason,
}

/// Finished encoded output. Ownership passes to the caller.
#[derive(Clone, Debug)]
pub struct OutputArtifact {
    /// Container bytes.
    pub bytes: Vec<u8>,
    /// Container MIME type.
    pub mime_type: String,
    /// How the output was produced.
    pub stats: TranscodeStats,
}

impl OutputArtifact {
    /// Byte length of the output.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false` for artifacts returned by [`Transcoder::run`].
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One-shot transcode of a [`FrameSource`] into a [`FrameSink`].
///
/// Pipeline:
/// 1. probe metadata, raced against `probe_timeout`
/// 2. plan geometry and pick the encoder container
/// 3. attach audio when the source can provide it
/// 4. pump frames: resample onto an output-sized [`Surface`] and push one frame per output tick
/// 5. stop the encoder and concatenate its chunks
///
/// `run` consumes the transcoder, so each invocation resolves exactly once.
pub struct Transcoder {
    opts: TranscodeOptions,
    progress: Option<ProgressFn>,
    cancel: CancelToken,
}

impl Transcoder {
    /// Create a transcoder with no progress callback and a fresh cancel token.
    pub fn new(opts: TranscodeOptions) -> Self {
        Self {
            opts,
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    /// Forward progress percentages to `callback`.
    pub fn with_progress(mut self, callback: impl FnMut(f64) + Send + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Honor `token` instead of the internal one.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that cancels this transcoder's run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Options this transcoder runs with.
    pub fn options(&self) -> &TranscodeOptions {
        &self.opts
    }

    /// Run the pipeline to completion.
    ///
    /// The source, surface and any extracted audio are released on every exit path; a sink that
    /// was started is aborted when the run fails.
    #[tracing::instrument(
        skip_all,
        fields(max_width = self.opts.max_width, max_height = self.opts.max_height)
    )]
    pub fn run(
        self,
        source: Box<dyn FrameSource>,
        sink: &mut dyn FrameSink,
        capabilities: &dyn CapabilityProbe,
    ) -> TranscodeResult<OutputArtifact> {
        let Self {
            opts,
            progress,
            cancel,
        } = self;
        opts.validate()?;
        cancel.check()?;

        let (mut source, info) = probe_with_timeout(source, opts.probe_timeout(), &cancel)?;
        tracing::debug!(
            width = info.width,
            height = info.height,
            duration_sec = info.duration_sec,
            has_audio = info.has_audio,
            "probed source"
        );

        let geometry =
            GeometryPlan::compute(info.width, info.height, opts.max_width, opts.max_height)?;
        let container = select_candidate(capabilities);

        let audio = source.extract_audio();
        if info.has_audio && audio.is_none() {
            tracing::warn!("source audio could not be attached, encoding video-only");
        }
        let encoder = EncoderConfig {
            container,
            target_bitrate: opts.target_bitrate,
            audio_bitrate: opts.audio_bitrate,
            frame_rate: opts.frame_rate,
            has_audio: audio.is_some(),
        };
        tracing::info!(
            output_width = geometry.output_width,
            output_height = geometry.output_height,
            mime = container.mime_type,
            has_audio = encoder.has_audio,
            "transcode planned"
        );

        sink.begin(SinkConfig {
            width: geometry.output_width,
            height: geometry.output_height,
            fps: opts.frame_rate,
            container,
            video_bitrate: opts.target_bitrate,
            audio_bitrate: opts.audio_bitrate,
            timeslice: opts.timeslice(),
            audio: audio.as_ref().map(|a| AudioInputConfig {
                path: a.path().to_path_buf(),
                sample_rate: a.sample_rate,
                channels: a.channels,
            }),
        })
        .map_err(as_encoding)?;

        let mut pump = FramePump {
            opts: opts.clone(),
            duration_sec: info.duration_sec,
            source_fps: info.fps,
            sink,
            surface: Surface::new(&geometry),
            progress: ProgressReporter::new(progress, opts.progress_interval()),
            chunks: Vec::new(),
            next_tick: 0,
            frame_pending: false,
            frames_decoded: 0,
            frames_encoded: 0,
        };

        let (termination, bytes) = match pump.record(source.as_mut(), &cancel) {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!(error = %e, "transcode failed");
                pump.sink.abort();
                return Err(e);
            }
        };

        let stats = TranscodeStats {
            source: info,
            geometry,
            encoder,
            frames_decoded: pump.frames_decoded,
            frames_encoded: pump.frames_encoded,
            chunks: pump.chunks_seen(),
            termination,
        };
        tracing::info!(
            bytes = bytes.len(),
            frames_encoded = stats.frames_encoded,
            termination = ?termination,
            "transcode finished"
        );

        drop(pump);
        drop(audio);
        drop(source);

        Ok(OutputArtifact {
            bytes,
            mime_type: container.container_mime.to_owned(),
            stats,
        })
    }
}

struct FramePump<'a> {
    opts: TranscodeOptions,
    duration_sec: f64,
    source_fps: Option<Fps>,
    sink: &'a mut dyn FrameSink,
    surface: Surface,
    progress: ProgressReporter,
    chunks: Vec<Vec<u8>>,
    next_tick: u64,
    /// The last drawn frame has not been pushed on any tick yet.
    frame_pending: bool,
    frames_decoded: u64,
    frames_encoded: u64,
}

impl FramePump<'_> {
    fn record(
        &mut self,
        source: &mut dyn FrameSource,
        cancel: &CancelToken,
    ) -> TranscodeResult<(TerminationReason, Vec<u8>)> {
        source.start().map_err(as_playback_start)?;
        let reason = self.pump(source, cancel)?;
        let bytes = self.finalize(reason)?;
        Ok((reason, bytes))
    }

    fn pump(
        &mut self,
        source: &mut dyn FrameSource,
        cancel: &CancelToken,
    ) -> TranscodeResult<TerminationReason> {
        let started = Instant::now();
        let ceiling = self.opts.max_duration();
        let ceiling_sec = ceiling.as_secs_f64();
        let mut last_pts: Option<f64> = None;

        loop {
            cancel.check()?;
            if started.elapsed() >= ceiling {
                tracing::warn!(
                    max_ms = self.opts.max_duration_ms,
                    "recording ceiling reached (wall clock)"
                );
                self.flush_until(0.0, ceiling_sec)?;
                return Ok(TerminationReason::MaxDuration);
            }
            self.collect_chunks()?;

            let event = match source.next_event() {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "source unreadable mid-stream, keeping captured output");
                    self.flush_until(0.0, ceiling_sec)?;
                    return Ok(TerminationReason::SourceError);
                }
            };

            match event {
                SourceEvent::Frame(frame) => {
                    self.frames_decoded += 1;
                    let pts = frame.pts_sec;
                    if pts >= ceiling_sec {
                        tracing::warn!(
                            max_ms = self.opts.max_duration_ms,
                            "recording ceiling reached, truncating"
                        );
                        self.flush_until(ceiling_sec, ceiling_sec)?;
                        return Ok(TerminationReason::MaxDuration);
                    }
                    self.emit_until(pts)?;
                    if let Err(e) = self.surface.draw(frame) {
                        tracing::warn!(error = %e, "frame draw failed, keeping captured output");
                        self.flush_until(0.0, ceiling_sec)?;
                        return Ok(TerminationReason::SourceError);
                    }
                    self.frame_pending = true;
                    last_pts = Some(pts);
                    self.progress.update(pts, self.duration_sec);
                }
                SourceEvent::Paused { position_sec } if position_sec > 0.0 => {
                    tracing::debug!(position_sec, "source paused after start");
                    self.flush_until(position_sec, ceiling_sec)?;
                    return Ok(TerminationReason::Paused);
                }
                SourceEvent::Paused { .. } | SourceEvent::Seeking => {
                    // Pre-roll pause or seek: wait for the next tick.
                    std::thread::sleep(self.opts.tick());
                }
                SourceEvent::Ended => {
                    if let Some(pts) = last_pts {
                        let limit = self.hold_last_frame_until(pts);
                        self.flush_until(limit, ceiling_sec)?;
                    }
                    return Ok(TerminationReason::Ended);
                }
            }
        }
    }

    /// The last frame is shown for one source frame, but not past a known duration.
    fn hold_last_frame_until(&self, last_pts: f64) -> f64 {
        let frame_secs = self
            .source_fps
            .unwrap_or(self.opts.frame_rate)
            .frame_duration_secs();
        let held = last_pts + frame_secs;
        if self.duration_sec > last_pts {
            held.min(self.duration_sec)
        } else {
            held
        }
    }

    /// Emit ticks before `limit_sec`, then at least one tick for a drawn frame that no tick has
    /// carried yet. Nothing is emitted at or past `ceiling_sec`.
    fn flush_until(&mut self, limit_sec: f64, ceiling_sec: f64) -> TranscodeResult<()> {
        self.emit_until(limit_sec.min(ceiling_sec))?;
        if self.frame_pending {
            let fps = self.opts.frame_rate;
            let tick_sec = fps.frames_to_secs(self.next_tick);
            let limit = (tick_sec + fps.frame_duration_secs() / 2.0).min(ceiling_sec);
            self.emit_until(limit)?;
        }
        Ok(())
    }

    /// Push the surface for every tick strictly before `limit_sec`.
    fn emit_until(&mut self, limit_sec: f64) -> TranscodeResult<()> {
        if !self.surface.has_content() {
            return Ok(());
        }
        let fps = self.opts.frame_rate;
        while fps.frames_to_secs(self.next_tick) < limit_sec - TICK_EPSILON {
            self.sink
                .push_frame(FrameIndex(self.next_tick), self.surface.image())
                .map_err(as_encoding)?;
            self.next_tick += 1;
            self.frames_encoded += 1;
            self.frame_pending = false;
        }
        Ok(())
    }

    fn collect_chunks(&mut self) -> TranscodeResult<()> {
        let ready = self.sink.take_chunks().map_err(as_encoding)?;
        self.keep_chunks(ready);
        Ok(())
    }

    fn keep_chunks(&mut self, chunks: Vec<Vec<u8>>) {
        self.chunks.extend(chunks.into_iter().filter(|c| !c.is_empty()));
    }

    fn chunks_seen(&self) -> u64 {
        self.chunks.len() as u64
    }

    fn finalize(&mut self, reason: TerminationReason) -> TranscodeResult<Vec<u8>> {
        if reason == TerminationReason::Ended {
            self.grace_period()?;
        }
        let tail = self.sink.end().map_err(as_encoding)?;
        self.keep_chunks(tail);

        if self.chunks.is_empty() {
            return Err(TranscodeError::empty_output(format!(
                "encoder produced no data ({} frames pushed, stopped by {reason:?})",
                self.frames_encoded
            )));
        }
        let bytes = self.chunks.concat();
        self.progress.finish();
        Ok(bytes)
    }

    fn grace_period(&mut self) -> TranscodeResult<()> {
        let deadline = Instant::now() + self.opts.end_grace();
        loop {
            self.collect_chunks()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(self.opts.tick()));
        }
    }
}

fn probe_with_timeout(
    mut source: Box<dyn FrameSource>,
    timeout: Duration,
    cancel: &CancelToken,
) -> TranscodeResult<(Box<dyn FrameSource>, MediaInfo)> {
    let (tx, rx) = mpsc::channel();
    let abandon = CancelToken::new();
    let probe_cancel = abandon.clone();
    std::thread::Builder::new()
        .name("folio-probe".into())
        .spawn(move || {
            let result = source.probe(&probe_cancel);
            // A timed-out caller has dropped the receiver; the source is released here.
            let _ = tx.send((source, result));
        })
        .map_err(|e| TranscodeError::media_load(format!("failed to spawn probe thread: {e}")))?;

    let deadline = Instant::now() + timeout;
    loop {
        if cancel.is_cancelled() {
            abandon.cancel();
            return Err(TranscodeError::Cancelled);
        }
        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "media probe timed out");
            abandon.cancel();
            return Err(TranscodeError::MediaLoadTimeout(timeout));
        }
        match rx.recv_timeout((deadline - now).min(PROBE_POLL)) {
            Ok((source, Ok(info))) => return Ok((source, info)),
            Ok((_, Err(e))) => return Err(as_media_load(e)),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(TranscodeError::media_load("probe thread panicked"));
            }
        }
    }
}

fn as_media_load(e: TranscodeError) -> TranscodeError {
    match e {
        TranscodeError::MediaLoad(_)
        | TranscodeError::MediaLoadTimeout(_)
        | TranscodeError::Cancelled => e,
        other => TranscodeError::media_load(other.to_string()),
    }
}

fn as_playback_start(e: TranscodeError) -> TranscodeError {
    match e {
        TranscodeError::PlaybackStart(_) | TranscodeError::Cancelled => e,
        other => TranscodeError::playback_start(other.to_string()),
    }
}

fn as_encoding(e: TranscodeError) -> TranscodeError {
    match e {
        TranscodeError::Encoding(_) | TranscodeError::Cancelled => e,
        other => TranscodeError::encoding(other.to_string()),
    }
}
