use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn fps_frame_time_uses_rational_rate() {
    let fps = Fps::new(30000, 1001).unwrap();
    let t = fps.frames_to_secs(30);
    assert!((t - 1.001).abs() < 1e-9);
}

#[test]
fn parse_ratio_handles_ffprobe_forms() {
    assert_eq!(Fps::parse_ratio("25/1"), Some(Fps { num: 25, den: 1 }));
    assert_eq!(
        Fps::parse_ratio("30000/1001"),
        Some(Fps {
            num: 30000,
            den: 1001
        })
    );
    assert_eq!(Fps::parse_ratio("0/0"), None);
    assert_eq!(Fps::parse_ratio("abc"), None);
}

#[test]
fn parse_accepts_integers_and_ratios() {
    assert_eq!(Fps::parse("30").unwrap(), Fps { num: 30, den: 1 });
    assert_eq!(Fps::parse(" 24000/1001 ").unwrap(), Fps { num: 24000, den: 1001 });
    assert!(matches!(Fps::parse("0"), Err(TranscodeError::Validation(_))));
    assert!(matches!(Fps::parse("30fps"), Err(TranscodeError::Validation(_))));
    assert!(matches!(Fps::parse("30/0"), Err(TranscodeError::Validation(_))));
}

#[test]
fn display_is_ffmpeg_ratio() {
    assert_eq!(Fps::new(24, 1).unwrap().to_string(), "24/1");
}
