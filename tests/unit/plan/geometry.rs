use super::*;

#[test]
fn uhd_into_full_hd_is_exact() {
    let plan = GeometryPlan::compute(3840, 2160, 1920, 1080).unwrap();
    assert_eq!((plan.output_width, plan.output_height), (1920, 1080));
    assert!(plan.needs_resize());
}

#[test]
fn small_source_is_not_upscaled() {
    let plan = GeometryPlan::compute(640, 480, 1920, 1080).unwrap();
    assert_eq!((plan.output_width, plan.output_height), (640, 480));
    assert!(!plan.needs_resize());
}

#[test]
fn odd_source_is_rounded_down_to_even() {
    let plan = GeometryPlan::compute(641, 481, 1920, 1080).unwrap();
    assert_eq!((plan.output_width, plan.output_height), (640, 480));
}

#[test]
fn portrait_source_is_bounded_by_height() {
    let plan = GeometryPlan::compute(1080, 1920, 1920, 1080).unwrap();
    assert_eq!(plan.output_height, 1080);
    assert_eq!(plan.output_width, 606);
}

#[test]
fn degenerate_inputs_are_rejected() {
    assert!(matches!(
        GeometryPlan::compute(1, 100, 1920, 1080),
        Err(TranscodeError::MediaLoad(_))
    ));
    assert!(matches!(
        GeometryPlan::compute(100, 100, 1, 1080),
        Err(TranscodeError::Validation(_))
    ));
}

#[test]
fn output_respects_bound_aspect_and_parity() {
    let sources = [
        (3840u32, 2160u32),
        (1920, 1080),
        (1080, 1920),
        (1279, 719),
        (4096, 2160),
        (720, 576),
        (65, 64),
        (2000, 100),
        (100, 2000),
        (333, 777),
    ];
    let bounds = [
        (1920u32, 1080u32),
        (1280, 720),
        (640, 640),
        (1919, 1079),
        (64, 64),
    ];

    for &(w, h) in &sources {
        for &(max_w, max_h) in &bounds {
            let plan = GeometryPlan::compute(w, h, max_w, max_h).unwrap();
            let (ow, oh) = (plan.output_width, plan.output_height);
            assert_eq!(ow % 2, 0, "{w}x{h} in {max_w}x{max_h}");
            assert_eq!(oh % 2, 0, "{w}x{h} in {max_w}x{max_h}");
            assert!(ow <= w.min(max_w), "{w}x{h} in {max_w}x{max_h} -> {ow}x{oh}");
            assert!(oh <= h.min(max_h), "{w}x{h} in {max_w}x{max_h} -> {ow}x{oh}");

            // Rounding error is at most 2px per axis; only assert aspect where that is small.
            if ow >= 64 && oh >= 64 {
                let src = f64::from(w) / f64::from(h);
                let out = f64::from(ow) / f64::from(oh);
                assert!(
                    (out - src).abs() / src < 0.05,
                    "{w}x{h} in {max_w}x{max_h} -> {ow}x{oh}"
                );
            }
        }
    }
}

#[test]
fn output_frame_len_is_rgba8() {
    let plan = GeometryPlan::compute(640, 480, 1920, 1080).unwrap();
    assert_eq!(plan.output_frame_len(), 640 * 480 * 4);
}
