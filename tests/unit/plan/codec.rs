use super::*;

const ENCODERS: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (codec h264)
 V....D libvpx               libvpx VP8 (codec vp8)
 A....D aac                  AAC (Advanced Audio Coding)
 A....D libopus              libopus Opus (codec opus)
";

const MUXERS: &str = "\
File formats:
 D. = Demuxing supported
 .E = Muxing supported
 --
  E matroska        Matroska
  E mp4             MP4 (MPEG-4 Part 14)
  E webm            WebM
";

struct Nothing;

impl CapabilityProbe for Nothing {
    fn supports(&self, _candidate: &CodecCandidate) -> bool {
        false
    }
}

#[test]
fn listing_parser_skips_legend() {
    let caps = FfmpegCapabilities::from_listings(ENCODERS, MUXERS);
    assert!(caps.has_encoder("libx264"));
    assert!(caps.has_encoder("libopus"));
    assert!(!caps.has_encoder("V....."));
    assert!(caps.has_muxer("webm"));
    assert!(!caps.has_muxer("D."));
}

#[test]
fn selection_walks_down_preferences() {
    // No libvpx-vp9 in the listing, so vp8 wins.
    let caps = FfmpegCapabilities::from_listings(ENCODERS, MUXERS);
    let chosen = select_candidate(&caps);
    assert_eq!(chosen.mime_type, "video/webm;codecs=vp8,opus");
    assert_eq!(chosen.container_mime, "video/webm");
}

#[test]
fn selection_prefers_mp4_when_webm_muxer_missing() {
    let muxers = "--\n  E mp4 MP4\n  E matroska Matroska\n";
    let caps = FfmpegCapabilities::from_listings(ENCODERS, muxers);
    assert_eq!(select_candidate(&caps).muxer, "mp4");
}

#[test]
fn nothing_supported_uses_generic_fallback() {
    assert_eq!(select_candidate(&Nothing), FALLBACK_CANDIDATE);
    let empty = FfmpegCapabilities::from_listings("", "");
    assert_eq!(select_candidate(&empty), FALLBACK_CANDIDATE);
}

#[test]
fn fallback_has_no_explicit_codecs() {
    assert!(FALLBACK_CANDIDATE.video_codec.is_none());
    assert!(FALLBACK_CANDIDATE.audio_codec.is_none());
}
