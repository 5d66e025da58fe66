use std::io::{Read, Write as _};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use image::RgbaImage;

use crate::encode::sink::{FrameSink, SinkConfig, validate_sink_config};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{TranscodeError, TranscodeResult};

const READ_BUF_LEN: usize = 64 * 1024;

/// Sink that spawns the system `ffmpeg`, streams raw RGBA frames to its stdin and collects the
/// encoded container from its stdout.
///
/// A reader thread groups stdout bytes into chunks, emitting one whenever the configured
/// timeslice has elapsed since the previous chunk, and a final one at EOF.
#[derive(Default)]
pub struct FfmpegSink {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    chunks: Option<Receiver<Vec<u8>>>,
    reader: Option<JoinHandle<std::io::Result<()>>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create an idle sink; nothing is spawned until `begin`.
    pub fn new() -> Self {
        Self::default()
    }

    fn take_stderr(&mut self) -> String {
        match self.stderr_drain.take().map(|h| h.join()) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).trim().to_owned(),
            _ => String::new(),
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> TranscodeResult<()> {
        validate_sink_config(&cfg)?;
        if self.child.is_some() {
            return Err(TranscodeError::encoding("ffmpeg sink already started"));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args(encoder_args(&cfg));

        let mut child = cmd.spawn().map_err(|e| {
            TranscodeError::encoding(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TranscodeError::encoding("failed to open ffmpeg stdin (unexpected)"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TranscodeError::encoding("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| TranscodeError::encoding("failed to open ffmpeg stderr (unexpected)"))?;

        let (tx, rx) = mpsc::channel();
        let timeslice = cfg.timeslice;
        let reader = std::thread::spawn(move || read_in_timeslices(stdout, timeslice, &tx));
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(
            width = cfg.width,
            height = cfg.height,
            fps = %cfg.fps,
            muxer = cfg.container.muxer,
            audio = cfg.audio.is_some(),
            "ffmpeg sink started"
        );

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.chunks = Some(rx);
        self.reader = Some(reader);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> TranscodeResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| TranscodeError::encoding("ffmpeg sink not started"))?;
        if self.last_idx.is_some_and(|last| idx <= last) {
            return Err(TranscodeError::encoding(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.dimensions() != (cfg.width, cfg.height) {
            return Err(TranscodeError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                cfg.width,
                cfg.height
            )));
        }
        self.last_idx = Some(idx);

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(TranscodeError::encoding("ffmpeg sink is already finalized"));
        };
        if let Err(e) = stdin.write_all(frame.as_raw()) {
            let stderr = self.take_stderr();
            return Err(TranscodeError::encoding(format!(
                "failed to write frame to ffmpeg stdin: {e}: {stderr}"
            )));
        }
        Ok(())
    }

    fn take_chunks(&mut self) -> TranscodeResult<Vec<Vec<u8>>> {
        let mut out = Vec::new();
        if let Some(rx) = self.chunks.as_ref() {
            loop {
                match rx.try_recv() {
                    Ok(chunk) => out.push(chunk),
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                }
            }
        }
        Ok(out)
    }

    fn end(&mut self) -> TranscodeResult<Vec<Vec<u8>>> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| TranscodeError::encoding("ffmpeg sink not started"))?;

        // The reader exits at EOF, after which every chunk is queued.
        let read_result = match self.reader.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| TranscodeError::encoding("ffmpeg stdout reader thread panicked"))?,
            None => Ok(()),
        };
        let remaining = self.take_chunks()?;
        self.chunks = None;

        let status = child.wait().map_err(|e| {
            TranscodeError::encoding(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr = self.take_stderr();
        self.cfg = None;

        if !status.success() {
            return Err(TranscodeError::encoding(format!(
                "ffmpeg exited with status {status}: {stderr}"
            )));
        }
        read_result
            .map_err(|e| TranscodeError::encoding(format!("failed to read ffmpeg output: {e}")))?;
        Ok(remaining)
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        let _ = self.take_stderr();
        self.chunks = None;
        self.cfg = None;
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

/// Full ffmpeg argument list for `cfg`, output going to stdout.
pub fn encoder_args(cfg: &SinkConfig) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{}x{}", cfg.width, cfg.height),
    ];
    push_input_fps(&mut args, cfg.fps);
    args.extend(["-i".into(), "pipe:0".into()]);

    if let Some(audio) = cfg.audio.as_ref() {
        args.extend([
            "-f".into(),
            "f32le".into(),
            "-ar".into(),
            audio.sample_rate.to_string(),
            "-ac".into(),
            audio.channels.to_string(),
            "-i".into(),
            audio.path.to_string_lossy().into_owned(),
        ]);
    }

    if let Some(codec) = cfg.container.video_codec {
        args.extend(["-c:v".into(), codec.into()]);
    }
    args.extend([
        "-b:v".into(),
        cfg.video_bitrate.to_string(),
        "-pix_fmt".into(),
        "yuv420p".into(),
    ]);

    if cfg.audio.is_some() {
        if let Some(codec) = cfg.container.audio_codec {
            args.extend(["-c:a".into(), codec.into()]);
        }
        args.extend([
            "-b:a".into(),
            cfg.audio_bitrate.to_string(),
            "-shortest".into(),
        ]);
    } else {
        args.push("-an".into());
    }

    if cfg.container.muxer == "mp4" {
        // A pipe cannot be seeked back to write the moov atom.
        args.extend(["-movflags".into(), "frag_keyframe+empty_moov".into()]);
    }
    args.extend(["-f".into(), cfg.container.muxer.into(), "pipe:1".into()]);
    args
}

fn push_input_fps(args: &mut Vec<String>, fps: Fps) {
    // For rawvideo input, `-r` goes before `-i` to set the input framerate.
    args.extend(["-r".into(), fps.to_string()]);
}

fn read_in_timeslices(
    mut stdout: impl Read,
    timeslice: Duration,
    tx: &mpsc::Sender<Vec<u8>>,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; READ_BUF_LEN];
    let mut pending = Vec::new();
    let mut last_emit = Instant::now();
    loop {
        let n = match stdout.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        pending.extend_from_slice(&buf[..n]);
        if last_emit.elapsed() >= timeslice {
            // A dropped receiver only means nobody wants the bytes anymore.
            let _ = tx.send(std::mem::take(&mut pending));
            last_emit = Instant::now();
        }
    }
    if !pending.is_empty() {
        let _ = tx.send(pending);
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
