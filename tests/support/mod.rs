#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use folio_transcode::{
    AudioTrack, CancelToken, CapabilityProbe, CodecCandidate, Fps, FrameIndex, FrameSink, FrameSource,
    MediaInfo, SinkConfig, SourceEvent, TranscodeError, TranscodeOptions, TranscodeResult,
    VideoFrame,
};

pub const FPS30: Fps = Fps { num: 30, den: 1 };

/// Options tuned for fast tests: no grace wait, unthrottled progress.
pub fn fast_opts() -> TranscodeOptions {
    TranscodeOptions {
        max_width: 32,
        max_height: 32,
        end_grace_ms: 0,
        progress_interval_ms: 0,
        ..TranscodeOptions::default()
    }
}

pub fn solid_frame(pts_sec: f64, width: u32, height: u32, rgba: [u8; 4]) -> VideoFrame {
    let data = rgba
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect();
    VideoFrame {
        pts_sec,
        width,
        height,
        data,
    }
}

/// `count` frames at `fps`, followed by nothing (the caller decides how the script ends).
pub fn frame_events(count: u64, fps: Fps, width: u32, height: u32) -> Vec<TranscodeResult<SourceEvent>> {
    (0..count)
        .map(|i| {
            let shade = (i % 2) as u8 * 255;
            Ok(SourceEvent::Frame(solid_frame(
                fps.frames_to_secs(i),
                width,
                height,
                [shade, 0, 255 - shade, 255],
            )))
        })
        .collect()
}

/// Counts live mock resources so tests can assert everything was released.
#[derive(Clone, Debug, Default)]
pub struct Tracker {
    live: Arc<AtomicUsize>,
}

impl Tracker {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Scripted [`FrameSource`]: replays `events`, then `when_exhausted` forever.
pub struct ScriptedSource {
    pub info: MediaInfo,
    pub events: VecDeque<TranscodeResult<SourceEvent>>,
    pub when_exhausted: SourceEvent,
    /// How long `probe` takes unless cancelled first.
    pub probe_delay: Duration,
    pub probe_error: Option<TranscodeError>,
    pub start_error: Option<TranscodeError>,
    pub audio: Option<PathBuf>,
    tracker: Tracker,
}

impl ScriptedSource {
    pub fn new(info: MediaInfo, events: Vec<TranscodeResult<SourceEvent>>, tracker: &Tracker) -> Self {
        tracker.live.fetch_add(1, Ordering::SeqCst);
        Self {
            info,
            events: events.into(),
            when_exhausted: SourceEvent::Ended,
            probe_delay: Duration::ZERO,
            probe_error: None,
            start_error: None,
            audio: None,
            tracker: tracker.clone(),
        }
    }

    /// A `width x height` clip of `count` frames at 30 fps that ends naturally.
    pub fn clip(width: u32, height: u32, count: u64, tracker: &Tracker) -> Self {
        let info = MediaInfo {
            width,
            height,
            duration_sec: FPS30.frames_to_secs(count),
            fps: Some(FPS30),
            has_audio: false,
        };
        Self::new(info, frame_events(count, FPS30, width, height), tracker)
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.tracker.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FrameSource for ScriptedSource {
    fn probe(&mut self, cancel: &CancelToken) -> TranscodeResult<MediaInfo> {
        let deadline = Instant::now() + self.probe_delay;
        while Instant::now() < deadline {
            cancel.check()?;
            std::thread::sleep(Duration::from_millis(5));
        }
        match self.probe_error.take() {
            Some(e) => Err(e),
            None => Ok(self.info.clone()),
        }
    }

    fn extract_audio(&mut self) -> Option<AudioTrack> {
        let path = self.audio.take()?;
        Some(AudioTrack::from_pcm_file(path, 48_000, 2))
    }

    fn start(&mut self) -> TranscodeResult<()> {
        match self.start_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn next_event(&mut self) -> TranscodeResult<SourceEvent> {
        self.events
            .pop_front()
            .unwrap_or_else(|| Ok(self.when_exhausted.clone()))
    }
}

/// What a [`RecordingSink`] observed.
#[derive(Debug, Default)]
pub struct SinkLog {
    pub config: Option<SinkConfig>,
    pub frames: Vec<u64>,
    pub frame_sizes: Vec<(u32, u32)>,
    pub ended: bool,
    pub aborted: bool,
}

/// [`FrameSink`] that emits one small chunk per frame and records every call.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub log: Arc<Mutex<SinkLog>>,
    /// Accept frames but never produce a chunk.
    pub silent: bool,
    pub fail_begin: bool,
    pub fail_push_at: Option<u64>,
    pub pending: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<u64> {
        self.log.lock().unwrap().frames.clone()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.log.lock().unwrap().config.clone()
    }

    pub fn aborted(&self) -> bool {
        self.log.lock().unwrap().aborted
    }

    pub fn ended(&self) -> bool {
        self.log.lock().unwrap().ended
    }
}

impl FrameSink for RecordingSink {
    fn begin(&mut self, cfg: SinkConfig) -> TranscodeResult<()> {
        if self.fail_begin {
            return Err(TranscodeError::validation("encoder rejected configuration"));
        }
        self.log.lock().unwrap().config = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &image::RgbaImage) -> TranscodeResult<()> {
        if self.fail_push_at == Some(idx.0) {
            return Err(TranscodeError::encoding("encoder fault"));
        }
        let mut log = self.log.lock().unwrap();
        log.frames.push(idx.0);
        log.frame_sizes.push(frame.dimensions());
        if !self.silent {
            self.pending.lock().unwrap().push(idx.0.to_le_bytes().to_vec());
        }
        Ok(())
    }

    fn take_chunks(&mut self) -> TranscodeResult<Vec<Vec<u8>>> {
        Ok(std::mem::take(&mut *self.pending.lock().unwrap()))
    }

    fn end(&mut self) -> TranscodeResult<Vec<Vec<u8>>> {
        self.log.lock().unwrap().ended = true;
        self.take_chunks()
    }

    fn abort(&mut self) {
        self.log.lock().unwrap().aborted = true;
        self.pending.lock().unwrap().clear();
    }
}

/// Capability probe answering the same for every candidate.
#[derive(Clone, Copy, Debug)]
pub struct FixedCaps(pub bool);

impl CapabilityProbe for FixedCaps {
    fn supports(&self, _candidate: &CodecCandidate) -> bool {
        self.0
    }
}

/// Supports only candidates whose muxer is listed.
#[derive(Clone, Debug)]
pub struct MuxerCaps(pub Vec<&'static str>);

impl CapabilityProbe for MuxerCaps {
    fn supports(&self, candidate: &CodecCandidate) -> bool {
        self.0.contains(&candidate.muxer)
    }
}

/// Path for a scratch PCM file that the pipeline will take ownership of.
pub fn scratch_pcm(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!(
        "folio_test_{tag}_{}_{nanos}.f32le",
        std::process::id()
    ));
    std::fs::write(&path, vec![0u8; 4 * 2 * 480]).unwrap();
    path
}
