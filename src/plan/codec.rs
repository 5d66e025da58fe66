use crate::foundation::core::Fps;

/// One `(container, codec)` combination the encoder may be asked to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct CodecCandidate {
    /// Full MIME type including the codecs parameter, used for capability logging.
    pub mime_type: &'static str,
    /// Container MIME type without parameters; tags the output artifact.
    pub container_mime: &'static str,
    /// Muxer name as understood by ffmpeg.
    pub muxer: &'static str,
    /// File extension used when the artifact is persisted.
    pub extension: &'static str,
    /// Video encoder, or `None` to leave the choice to the muxer default.
    pub video_codec: Option<&'static str>,
    /// Audio encoder, or `None` to leave the choice to the muxer default.
    pub audio_codec: Option<&'static str>,
}

/// Preferred candidates, most preferred first.
pub const CODEC_PREFERENCES: &[CodecCandidate] = &[
    CodecCandidate {
        mime_type: "video/webm;codecs=vp9,opus",
        container_mime: "video/webm",
        muxer: "webm",
        extension: "webm",
        video_codec: Some("libvpx-vp9"),
        audio_codec: Some("libopus"),
    },
    CodecCandidate {
        mime_type: "video/webm;codecs=vp8,opus",
        container_mime: "video/webm",
        muxer: "webm",
        extension: "webm",
        video_codec: Some("libvpx"),
        audio_codec: Some("libopus"),
    },
    CodecCandidate {
        mime_type: "video/mp4;codecs=avc1,mp4a",
        container_mime: "video/mp4",
        muxer: "mp4",
        extension: "mp4",
        video_codec: Some("libx264"),
        audio_codec: Some("aac"),
    },
];

/// Untyped last resort: no explicit codecs, so it is never capability-checked.
pub const FALLBACK_CANDIDATE: CodecCandidate = CodecCandidate {
    mime_type: "video/x-matroska",
    container_mime: "video/x-matroska",
    muxer: "matroska",
    extension: "mkv",
    video_codec: None,
    audio_codec: None,
};

/// Runtime query of which candidates the encoder can produce.
pub trait CapabilityProbe {
    /// Whether `candidate` can be encoded on this runtime.
    fn supports(&self, candidate: &CodecCandidate) -> bool;
}

/// Pick the first supported candidate, or [`FALLBACK_CANDIDATE`].
pub fn select_candidate(probe: &dyn CapabilityProbe) -> CodecCandidate {
    for candidate in CODEC_PREFERENCES {
        if probe.supports(candidate) {
            return *candidate;
        }
        tracing::debug!(mime = candidate.mime_type, "codec candidate unsupported");
    }
    tracing::warn!(
        mime = FALLBACK_CANDIDATE.mime_type,
        "no preferred codec supported, using generic container"
    );
    FALLBACK_CANDIDATE
}

/// Encoder settings chosen once at pipeline start.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct EncoderConfig {
    /// Selected container/codec pair.
    pub container: CodecCandidate,
    /// Target video bitrate in bits per second.
    pub target_bitrate: u32,
    /// Fixed audio bitrate in bits per second, independent of the video target.
    pub audio_bitrate: u32,
    /// Output frame rate.
    pub frame_rate: Fps,
    /// Whether an audio track is attached.
    pub has_audio: bool,
}

/// Capabilities reported by the system `ffmpeg` binary.
#[derive(Clone, Debug, Default)]
pub struct FfmpegCapabilities {
    encoders: Vec<String>,
    muxers: Vec<String>,
}

impl FfmpegCapabilities {
    /// Query `ffmpeg -encoders` and `ffmpeg -muxers`.
    ///
    /// When ffmpeg cannot be run, the result supports nothing and selection falls back.
    pub fn detect() -> Self {
        let encoders = run_listing("-encoders");
        let muxers = run_listing("-muxers");
        let caps = Self::from_listings(
            encoders.as_deref().unwrap_or(""),
            muxers.as_deref().unwrap_or(""),
        );
        tracing::debug!(
            encoders = caps.encoders.len(),
            muxers = caps.muxers.len(),
            "probed ffmpeg capabilities"
        );
        caps
    }

    /// Build from raw `-encoders` / `-muxers` listings.
    pub fn from_listings(encoders: &str, muxers: &str) -> Self {
        Self {
            encoders: parse_listing(encoders),
            muxers: parse_listing(muxers),
        }
    }

    fn has_encoder(&self, name: &str) -> bool {
        self.encoders.iter().any(|e| e == name)
    }

    fn has_muxer(&self, name: &str) -> bool {
        self.muxers.iter().any(|m| m == name)
    }
}

impl CapabilityProbe for FfmpegCapabilities {
    fn supports(&self, candidate: &CodecCandidate) -> bool {
        self.has_muxer(candidate.muxer)
            && candidate.video_codec.is_none_or(|c| self.has_encoder(c))
            && candidate.audio_codec.is_none_or(|c| self.has_encoder(c))
    }
}

fn run_listing(flag: &str) -> Option<String> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-hide_banner", flag])
        .stdin(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&out.stdout).into_owned())
}

// Listings print a legend, a `---` separator, then `<flags> <name[,alias]> <description>` rows.
fn parse_listing(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_table = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if !in_table {
            in_table = trimmed.starts_with("--");
            continue;
        }
        let mut cols = trimmed.split_whitespace();
        let (Some(_flags), Some(name)) = (cols.next(), cols.next()) else {
            continue;
        };
        names.extend(name.split(',').map(str::to_owned));
    }
    names
}

#[cfg(test)]
#[path = "../../tests/unit/plan/codec.rs"]
mod tests;
