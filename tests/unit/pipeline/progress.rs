use super::*;
use std::sync::{Arc, Mutex};

fn recording(interval: Duration) -> (ProgressReporter, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let reporter = ProgressReporter::new(
        Some(Box::new(move |p| sink.lock().unwrap().push(p))),
        interval,
    );
    (reporter, seen)
}

#[test]
fn values_are_clamped_until_finish() {
    let (mut p, seen) = recording(Duration::ZERO);
    p.update(5.0, 10.0);
    p.update(10.0, 10.0);
    p.update(20.0, 10.0);
    p.finish();
    assert_eq!(*seen.lock().unwrap(), vec![50.0, 99.0, 100.0]);
}

#[test]
fn values_never_decrease() {
    let (mut p, seen) = recording(Duration::ZERO);
    p.update(6.0, 10.0);
    p.update(3.0, 10.0);
    p.update(7.0, 10.0);
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec![60.0, 70.0]);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn throttle_drops_intermediate_updates_but_not_finish() {
    let (mut p, seen) = recording(Duration::from_secs(3600));
    for i in 1..=9 {
        p.update(f64::from(i), 10.0);
    }
    assert_eq!(p.current(), 90.0);
    p.finish();
    assert_eq!(*seen.lock().unwrap(), vec![10.0, 100.0]);
}

#[test]
fn unknown_duration_reports_nothing() {
    let (mut p, seen) = recording(Duration::ZERO);
    p.update(1.0, 0.0);
    p.update(f64::NAN, 10.0);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn no_callback_is_fine() {
    let mut p = ProgressReporter::new(None, Duration::ZERO);
    p.update(1.0, 2.0);
    p.finish();
    assert_eq!(p.current(), 100.0);
}
