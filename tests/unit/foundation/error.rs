use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        TranscodeError::media_load("x")
            .to_string()
            .contains("media load error:")
    );
    assert!(
        TranscodeError::playback_start("x")
            .to_string()
            .contains("playback start error:")
    );
    assert!(
        TranscodeError::encoding("x")
            .to_string()
            .contains("encoding error:")
    );
    assert!(
        TranscodeError::empty_output("x")
            .to_string()
            .contains("empty output:")
    );
    assert!(
        TranscodeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        TranscodeError::storage("x")
            .to_string()
            .contains("storage error:")
    );
}

#[test]
fn timeout_reports_bound_in_millis() {
    let err = TranscodeError::MediaLoadTimeout(Duration::from_secs(30));
    assert_eq!(err.to_string(), "media load timed out after 30000ms");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = TranscodeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
