mod common;

use anyhow::Result;
use geom::{Duration, Pt2D};
use routes::{
    BoundaryPolicy, CurveFitConfig, CurveFitZones, CurveFitter, MinSamples, PlaybackProjector,
    Ransac, Routes, Sample, SegmentationOptions, Styling,
};

use common::{motion_run, segment, t, two_runs};

fn styling() -> Styling {
    Styling {
        icon: "truck".to_string(),
        color: "red".to_string(),
    }
}

struct AlwaysFails;

impl CurveFitter for AlwaysFails {
    fn fit(&self, _: &[Sample], _: &CurveFitConfig) -> Result<Vec<Pt2D>> {
        anyhow::bail!("never converges")
    }
}

fn with_fitting(samples: Vec<Sample>, config: CurveFitConfig) -> Routes {
    Routes::new(
        samples,
        CurveFitZones::everywhere(config),
        BoundaryPolicy::time_gap(Duration::seconds(30.0)),
        &SegmentationOptions::default(),
    )
    .unwrap()
}

#[test]
fn test_raw_playback_without_fitting() {
    let routes = segment(two_runs(45.0), 30.0);
    let projector = PlaybackProjector::new(&routes, Ransac);
    let events: Vec<_> = projector.generate(1, &styling()).unwrap().collect();

    assert_eq!(events.len(), 5);
    for pair in events.windows(2) {
        assert!(pair[0].time < pair[1].time);
    }
    for (ev, sample) in events.iter().zip(routes.route_samples(1).unwrap()) {
        assert_eq!(ev.pos, sample.pos);
        assert_eq!(ev.time, sample.time);
        assert_eq!(ev.route, 1);
        assert_eq!(ev.icon, "truck");
        assert_eq!(ev.color, "red");
        assert!(!ev.fitted);
    }
}

#[test]
fn test_failed_fit_falls_back_to_raw() {
    let routes = with_fitting(motion_run(0.0, 0.0, 8), CurveFitConfig::stable());
    let projector = PlaybackProjector::new(&routes, AlwaysFails);
    let playback = projector.generate(0, &styling()).unwrap();
    assert!(!playback.is_fitted());
    let events: Vec<_> = playback.collect();
    assert_eq!(events.len(), 8);
    assert_eq!(events[3].pos, Pt2D::new(30.0, 0.0));
}

#[test]
fn test_absurd_degree_falls_back_to_raw() {
    let config: CurveFitConfig = serde_json::from_str(
        r#"{"max_trials": 100, "min_samples": 0.4, "residual_threshold": 1.0, "degree": 18446744073709551615}"#,
    )
    .unwrap();
    let routes = with_fitting(motion_run(0.0, 0.0, 8), config);
    let playback = PlaybackProjector::new(&routes, Ransac)
        .generate(0, &styling())
        .unwrap();
    assert!(!playback.is_fitted());
    assert_eq!(playback.count(), 8);
}

#[test]
fn test_sparse_route_falls_back_to_raw() {
    // Not enough samples for a cubic
    let routes = with_fitting(motion_run(0.0, 0.0, 2), CurveFitConfig::spline());
    let events: Vec<_> = routes
        .generate_playback(Some(0), &styling())
        .unwrap()
        .collect();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|ev| !ev.fitted));
}

#[test]
fn test_successful_fit_smooths_outlier() {
    let mut samples = motion_run(0.0, 0.0, 11);
    samples[5].pos = Pt2D::new(50.0, 30.0);
    let config = CurveFitConfig {
        max_trials: 200,
        min_samples: MinSamples::Count(2),
        residual_threshold: 1.0,
        degree: 1,
        seed: 7,
    };
    let routes = with_fitting(samples, config);

    let playback = PlaybackProjector::new(&routes, Ransac)
        .generate(0, &styling())
        .unwrap();
    assert!(playback.is_fitted());
    assert_eq!(playback.len(), 11);
    let events: Vec<_> = playback.collect();
    assert!(events[5].pos.y().abs() < 0.01);
    assert!(events.iter().all(|ev| ev.fitted));
}

#[test]
fn test_out_of_range() {
    let routes = segment(two_runs(45.0), 30.0);
    let projector = PlaybackProjector::new(&routes, Ransac);
    assert!(projector.generate(2, &styling()).is_err());
    assert!(routes.generate_playback(Some(5), &styling()).is_err());

    let empty = segment(Vec::new(), 30.0);
    assert!(PlaybackProjector::new(&empty, Ransac)
        .generate(0, &styling())
        .is_err());
    assert_eq!(
        empty.generate_playback(None, &styling()).unwrap().count(),
        0
    );
}

#[test]
fn test_restartable_and_lazy() {
    let routes = segment(motion_run(0.0, 0.0, 50), 30.0);
    let projector = PlaybackProjector::new(&routes, Ransac);

    let prefix: Vec<_> = projector.generate(0, &styling()).unwrap().take(3).collect();
    assert_eq!(prefix.len(), 3);
    assert_eq!(prefix[2].time, t(2.0));

    let first: Vec<_> = projector.generate(0, &styling()).unwrap().collect();
    let second: Vec<_> = projector.generate(0, &styling()).unwrap().collect();
    assert_eq!(first, second);
    assert_eq!(&first[0..3], &prefix[..]);
}

#[test]
fn test_all_routes() {
    let routes = segment(two_runs(45.0), 30.0);
    let events: Vec<_> = routes.generate_playback(None, &styling()).unwrap().collect();
    assert_eq!(events.len(), 10);
    assert_eq!(events[4].route, 0);
    assert_eq!(events[5].route, 1);
    for pair in events.windows(2) {
        assert!(pair[0].time < pair[1].time);
    }
}

#[test]
fn test_parallel_generation() {
    let routes = with_fitting(two_runs(45.0), CurveFitConfig::stable());
    let projector = PlaybackProjector::new(&routes, Ransac);
    let counts: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let projector = &projector;
                scope.spawn(move || projector.generate(i % 2, &styling()).unwrap().count())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(counts, vec![5, 5, 5, 5]);
}
