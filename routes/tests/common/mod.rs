//! Helpers to build sample streams shared by the integration tests.

#![allow(dead_code)]

use geom::{Duration, Pt2D, Time};
use routes::{BoundaryPolicy, CurveFitZones, Routes, Sample, SegmentationOptions};

pub fn t(secs: f64) -> Time {
    Time::START_OF_DAY + Duration::seconds(secs)
}

/// Moves along the x axis at 10 m/s, one sample per second, starting at `start` seconds and `x0`
/// meters.
pub fn motion_run(start: f64, x0: f64, num_samples: usize) -> Vec<Sample> {
    (0..num_samples)
        .map(|i| Sample::new(t(start + i as f64), Pt2D::new(x0 + 10.0 * i as f64, 0.0)))
        .collect()
}

/// Two motion runs of 5 samples each, with `gap` seconds between the end of the first and the
/// start of the second.
pub fn two_runs(gap: f64) -> Vec<Sample> {
    let mut samples = motion_run(0.0, 0.0, 5);
    samples.extend(motion_run(4.0 + gap, 40.0, 5));
    samples
}

pub fn segment(samples: Vec<Sample>, threshold_secs: f64) -> Routes {
    Routes::new(
        samples,
        CurveFitZones::disabled(),
        BoundaryPolicy::time_gap(Duration::seconds(threshold_secs)),
        &SegmentationOptions::default(),
    )
    .unwrap()
}
