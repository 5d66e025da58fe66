use super::*;
use crate::encode::sink::AudioInputConfig;
use crate::plan::codec::{CODEC_PREFERENCES, FALLBACK_CANDIDATE};
use std::path::PathBuf;

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 640,
        height: 360,
        fps: Fps::new(30, 1).unwrap(),
        container: CODEC_PREFERENCES[0],
        video_bitrate: 2_500_000,
        audio_bitrate: 128_000,
        timeslice: Duration::from_millis(1000),
        audio: None,
    }
}

fn position(args: &[String], needle: &str) -> Option<usize> {
    args.iter().position(|a| a == needle)
}

#[test]
fn video_only_args_disable_audio_and_target_stdout() {
    let args = encoder_args(&cfg());
    assert!(args.contains(&"-an".to_string()));
    assert!(args.contains(&"640x360".to_string()));
    assert!(args.contains(&"libvpx-vp9".to_string()));
    assert!(args.contains(&"2500000".to_string()));
    assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    // Input rate precedes the first input.
    assert!(position(&args, "-r").unwrap() < position(&args, "-i").unwrap());
}

#[test]
fn audio_args_attach_second_input_and_fixed_bitrate() {
    let mut c = cfg();
    c.audio = Some(AudioInputConfig {
        path: PathBuf::from("/tmp/a.f32le"),
        sample_rate: 48_000,
        channels: 2,
    });
    let args = encoder_args(&c);
    assert!(!args.contains(&"-an".to_string()));
    assert!(args.contains(&"/tmp/a.f32le".to_string()));
    assert!(args.contains(&"libopus".to_string()));
    assert!(args.contains(&"128000".to_string()));
    assert!(args.contains(&"-shortest".to_string()));
}

#[test]
fn mp4_output_is_fragmented_for_pipes() {
    let mut c = cfg();
    c.container = CODEC_PREFERENCES[2];
    let args = encoder_args(&c);
    assert!(args.contains(&"frag_keyframe+empty_moov".to_string()));
}

#[test]
fn fallback_leaves_codecs_to_muxer() {
    let mut c = cfg();
    c.container = FALLBACK_CANDIDATE;
    let args = encoder_args(&c);
    assert!(!args.contains(&"-c:v".to_string()));
    assert!(args.contains(&"matroska".to_string()));
}

#[test]
fn reader_flushes_everything_in_order() {
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let (tx, rx) = mpsc::channel();
    read_in_timeslices(std::io::Cursor::new(data.clone()), Duration::ZERO, &tx).unwrap();
    drop(tx);

    let chunks: Vec<Vec<u8>> = rx.iter().collect();
    assert!(chunks.len() > 1);
    assert_eq!(chunks.concat(), data);
}

#[test]
fn long_timeslice_coalesces_into_one_chunk() {
    let data = vec![7u8; 150_000];
    let (tx, rx) = mpsc::channel();
    read_in_timeslices(std::io::Cursor::new(data), Duration::from_secs(3600), &tx).unwrap();
    drop(tx);
    assert_eq!(rx.iter().count(), 1);
}

#[test]
fn push_before_begin_is_an_encoding_error() {
    let mut sink = FfmpegSink::new();
    assert!(matches!(
        sink.push_frame(FrameIndex(0), &RgbaImage::new(2, 2)),
        Err(TranscodeError::Encoding(_))
    ));
    assert!(sink.take_chunks().unwrap().is_empty());
    assert!(sink.end().is_err());
}
