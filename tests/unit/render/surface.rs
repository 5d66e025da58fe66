use super::*;

fn solid(width: u32, height: u32, rgba: [u8; 4]) -> VideoFrame {
    VideoFrame {
        pts_sec: 0.0,
        width,
        height,
        data: rgba.repeat((width * height) as usize),
    }
}

#[test]
fn draw_downscales_to_output_size() {
    let plan = GeometryPlan::compute(64, 32, 16, 16).unwrap();
    let mut surface = Surface::new(&plan);
    assert_eq!((surface.width(), surface.height()), (16, 8));
    assert!(!surface.has_content());

    surface.draw(solid(64, 32, [255, 0, 255, 255])).unwrap();
    assert!(surface.has_content());
    assert_eq!(surface.image().dimensions(), (16, 8));
    assert_eq!(surface.image().get_pixel(7, 3).0, [255, 0, 255, 255]);
}

#[test]
fn draw_at_native_size_copies_pixels() {
    let plan = GeometryPlan::compute(4, 4, 1920, 1080).unwrap();
    let mut surface = Surface::new(&plan);
    surface.draw(solid(4, 4, [1, 2, 3, 255])).unwrap();
    assert!(surface.image().pixels().all(|p| p.0 == [1, 2, 3, 255]));
}

#[test]
fn malformed_frame_is_rejected_and_keeps_previous_content() {
    let plan = GeometryPlan::compute(4, 4, 1920, 1080).unwrap();
    let mut surface = Surface::new(&plan);
    surface.draw(solid(4, 4, [9, 9, 9, 255])).unwrap();

    let mut bad = solid(4, 4, [0, 0, 0, 255]);
    bad.data.truncate(10);
    assert!(surface.draw(bad).is_err());
    assert_eq!(surface.image().get_pixel(0, 0).0, [9, 9, 9, 255]);
}
