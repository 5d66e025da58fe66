use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::foundation::cancel::CancelToken;
use crate::foundation::core::Fps;
use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::foundation::temp::TempFile;
use crate::media::source::{
    AudioTrack, FrameSource, MediaInfo, SourceEvent, SourceMedia, VideoFrame,
};

/// Sample rate used for extracted audio.
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;
/// Channel count used for extracted audio.
pub const AUDIO_CHANNELS: u16 = 2;

const FALLBACK_FPS: Fps = Fps { num: 30, den: 1 };
const TOOL_POLL: Duration = Duration::from_millis(10);

type Drain = JoinHandle<std::io::Result<Vec<u8>>>;

/// [`FrameSource`] backed by the system `ffprobe` and `ffmpeg` binaries.
///
/// The input bytes are written to a temp file on [`FfmpegSource::open`]; that file, the decoder
/// process and its stderr drain are all released on drop.
pub struct FfmpegSource {
    input: TempFile,
    info: Option<MediaInfo>,
    decoder: Option<Decoder>,
    frame_len: usize,
    frames_read: u64,
}

struct Decoder {
    child: Child,
    stdout: ChildStdout,
    stderr_drain: Option<Drain>,
}

impl FfmpegSource {
    /// Stage `media` on disk for the ffmpeg tools.
    pub fn open(media: SourceMedia) -> TranscodeResult<Self> {
        if !media.is_declared_video() {
            return Err(TranscodeError::media_load(format!(
                "unsupported media type '{}' for '{}'",
                media.mime_type, media.filename
            )));
        }
        if media.bytes.is_empty() {
            return Err(TranscodeError::media_load(format!(
                "'{}' is empty",
                media.filename
            )));
        }

        let suffix = Path::new(&media.filename)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let input = TempFile::reserve("src", &suffix);
        std::fs::write(input.path(), &media.bytes).map_err(|e| {
            TranscodeError::media_load(format!(
                "failed to stage '{}' at '{}': {e}",
                media.filename,
                input.path().display()
            ))
        })?;

        Ok(Self {
            input,
            info: None,
            decoder: None,
            frame_len: 0,
            frames_read: 0,
        })
    }

    fn source_fps(&self) -> Fps {
        self.info
            .as_ref()
            .and_then(|i| i.fps)
            .unwrap_or(FALLBACK_FPS)
    }

    fn finish_decoder(&mut self) -> TranscodeResult<()> {
        let Some(mut decoder) = self.decoder.take() else {
            return Ok(());
        };
        let status = decoder
            .child
            .wait()
            .map_err(|e| TranscodeError::media_load(format!("failed to wait for decoder: {e}")))?;
        let stderr = decoder.take_stderr();
        if !status.success() {
            return Err(TranscodeError::media_load(format!(
                "decoder exited with status {status}: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Decoder {
    fn take_stderr(&mut self) -> String {
        match self.stderr_drain.take().map(|h| h.join()) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
            _ => String::new(),
        }
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

impl FrameSource for FfmpegSource {
    fn probe(&mut self, cancel: &CancelToken) -> TranscodeResult<MediaInfo> {
        let info = probe_media_until(self.input.path(), cancel)?;
        self.info = Some(info.clone());
        Ok(info)
    }

    fn extract_audio(&mut self) -> Option<AudioTrack> {
        if !self.info.as_ref().is_some_and(|i| i.has_audio) {
            return None;
        }
        match extract_audio_f32le(self.input.path()) {
            Ok(track) => Some(track),
            Err(e) => {
                tracing::warn!(error = %e, "audio extraction failed, continuing video-only");
                None
            }
        }
    }

    fn start(&mut self) -> TranscodeResult<()> {
        let info = self
            .info
            .as_ref()
            .ok_or_else(|| TranscodeError::playback_start("source was not probed"))?;
        if self.decoder.is_some() {
            return Err(TranscodeError::playback_start("source already started"));
        }
        self.frame_len = info.width as usize * info.height as usize * 4;
        // Autorotation runs ahead of this filter; the scale squares non-square pixels so every
        // frame arrives at the probed display size.
        let display = format!("scale={}:{},setsar=1", info.width, info.height);

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(self.input.path())
            .args(["-an", "-vf", display.as_str()])
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TranscodeError::playback_start(format!(
                    "failed to spawn ffmpeg decoder (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            TranscodeError::playback_start("failed to open decoder stdout (unexpected)")
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            TranscodeError::playback_start("failed to open decoder stderr (unexpected)")
        })?;
        let stderr_drain = spawn_drain(stderr);

        self.decoder = Some(Decoder {
            child,
            stdout,
            stderr_drain: Some(stderr_drain),
        });
        self.frames_read = 0;
        Ok(())
    }

    fn next_event(&mut self) -> TranscodeResult<SourceEvent> {
        let (width, height) = match self.info.as_ref() {
            Some(i) => (i.width, i.height),
            None => return Err(TranscodeError::playback_start("source was not probed")),
        };
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(|| TranscodeError::playback_start("source was not started"))?;

        let mut data = vec![0u8; self.frame_len];
        let filled = read_full(&mut decoder.stdout, &mut data)
            .map_err(|e| TranscodeError::media_load(format!("failed to read decoded frame: {e}")))?;

        if filled == 0 {
            self.finish_decoder()?;
            return Ok(SourceEvent::Ended);
        }
        if filled < data.len() {
            let stderr = decoder.take_stderr();
            return Err(TranscodeError::media_load(format!(
                "decoder produced a truncated frame ({filled} of {} bytes): {}",
                data.len(),
                stderr.trim()
            )));
        }

        let pts_sec = self.source_fps().frames_to_secs(self.frames_read);
        self.frames_read += 1;
        Ok(SourceEvent::Frame(VideoFrame {
            pts_sec,
            width,
            height,
            data,
        }))
    }
}

fn read_full(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn spawn_drain(mut pipe: impl Read + Send + 'static) -> Drain {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        pipe.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
}

fn join_drain(drain: Drain) -> Vec<u8> {
    match drain.join() {
        Ok(Ok(bytes)) => bytes,
        _ => Vec::new(),
    }
}

/// Run `cmd` to completion, killing it as soon as `cancel` fires.
fn output_until(mut cmd: Command, cancel: &CancelToken) -> TranscodeResult<Output> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| TranscodeError::media_load(format!("failed to run {cmd:?}: {e}")))?;
    let stdout = child.stdout.take().map(spawn_drain);
    let stderr = child.stderr.take().map(spawn_drain);

    let status = loop {
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TranscodeError::Cancelled);
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => std::thread::sleep(TOOL_POLL),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TranscodeError::media_load(format!(
                    "failed to wait for {cmd:?}: {e}"
                )));
            }
        }
    };

    Ok(Output {
        status,
        stdout: stdout.map(join_drain).unwrap_or_default(),
        stderr: stderr.map(join_drain).unwrap_or_default(),
    })
}

/// Probe `path` with `ffprobe`.
pub fn probe_media(path: &Path) -> TranscodeResult<MediaInfo> {
    probe_media_until(path, &CancelToken::new())
}

/// Probe `path` with `ffprobe`; the child is killed once `cancel` fires.
pub fn probe_media_until(path: &Path, cancel: &CancelToken) -> TranscodeResult<MediaInfo> {
    let mut cmd = Command::new("ffprobe");
    cmd.args([
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_streams",
        "-show_format",
    ])
    .arg(path);
    let out = output_until(cmd, cancel)?;
    if !out.status.success() {
        return Err(TranscodeError::media_load(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe_json(&out.stdout)
}

pub(crate) fn parse_probe_json(json: &[u8]) -> TranscodeResult<MediaInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        avg_frame_rate: Option<String>,
        duration: Option<String>,
        sample_aspect_ratio: Option<String>,
        #[serde(default)]
        side_data_list: Vec<ProbeSideData>,
        tags: Option<ProbeTags>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeSideData {
        rotation: Option<f64>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeTags {
        rotate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| TranscodeError::media_load(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| TranscodeError::media_load("no video stream found"))?;
    let width = video
        .width
        .ok_or_else(|| TranscodeError::media_load("missing video width from ffprobe"))?;
    let height = video
        .height
        .ok_or_else(|| TranscodeError::media_load("missing video height from ffprobe"))?;

    let width = match video.sample_aspect_ratio.as_deref().and_then(parse_sar) {
        Some((num, den)) if num != den => {
            ((f64::from(width) * f64::from(num) / f64::from(den)).round() as u32).max(1)
        }
        _ => width,
    };
    let rotation = video
        .side_data_list
        .iter()
        .find_map(|d| d.rotation)
        .or_else(|| {
            video
                .tags
                .as_ref()
                .and_then(|t| t.rotate.as_deref())
                .and_then(|r| r.trim().parse::<f64>().ok())
        })
        .unwrap_or(0.0);
    let quarter_turns = (rotation / 90.0).round() as i64;
    let (width, height) = if quarter_turns.rem_euclid(2) == 1 {
        (height, width)
    } else {
        (width, height)
    };

    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(Fps::parse_ratio)
        .or_else(|| video.r_frame_rate.as_deref().and_then(Fps::parse_ratio));
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        width,
        height,
        duration_sec,
        fps,
        has_audio,
    })
}

/// `num:den` pixel aspect; `0:1` means unknown.
fn parse_sar(s: &str) -> Option<(u32, u32)> {
    let (num, den) = s.split_once(':')?;
    let num = num.trim().parse::<u32>().ok()?;
    let den = den.trim().parse::<u32>().ok()?;
    (num > 0 && den > 0).then_some((num, den))
}

fn extract_audio_f32le(path: &Path) -> TranscodeResult<AudioTrack> {
    let pcm = TempFile::reserve("audio", ".f32le");
    let channels = AUDIO_CHANNELS.to_string();
    let sample_rate = AUDIO_SAMPLE_RATE.to_string();
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            channels.as_str(),
            "-ar",
            sample_rate.as_str(),
        ])
        .arg(pcm.path())
        .stdin(Stdio::null())
        .output()
        .map_err(|e| TranscodeError::media_load(format!("failed to run ffmpeg for audio: {e}")))?;
    if !out.status.success() {
        return Err(TranscodeError::media_load(format!(
            "ffmpeg audio extraction failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(AudioTrack::from_temp(pcm, AUDIO_SAMPLE_RATE, AUDIO_CHANNELS))
}

#[cfg(test)]
#[path = "../../tests/unit/media/ffmpeg.rs"]
mod tests;
