use std::ops::AddAssign;

use geom::{Distance, Duration, Speed, Time};
use serde::{Deserialize, Serialize};

use crate::{Sample, ZoneID};

/// One contiguous trip. Only exists once it's closed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    // Inclusive indices into the samples
    pub start: usize,
    pub end: usize,
    pub start_time: Time,
    pub end_time: Time,
    /// The curve fitting zone containing the first sample
    pub zone: Option<ZoneID>,
    pub stats: RouteStats,
}

impl Route {
    pub fn num_samples(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn contains(&self, idx: usize) -> bool {
        idx >= self.start && idx <= self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    pub stop_time: Duration,
    pub moving_time: Duration,
    pub distance: Distance,
    /// Stationary runs with motion before and after them
    pub stops: usize,
}

impl RouteStats {
    pub const ZERO: RouteStats = RouteStats {
        stop_time: Duration::ZERO,
        moving_time: Duration::ZERO,
        distance: Distance::ZERO,
        stops: 0,
    };
}

impl AddAssign for RouteStats {
    fn add_assign(&mut self, other: RouteStats) {
        self.stop_time += other.stop_time;
        self.moving_time += other.moving_time;
        self.distance += other.distance;
        self.stops += other.stops;
    }
}

impl std::iter::Sum for RouteStats {
    fn sum<I: Iterator<Item = RouteStats>>(iter: I) -> RouteStats {
        let mut total = RouteStats::ZERO;
        for stats in iter {
            total += stats;
        }
        total
    }
}

/// Decides whether the time between two samples counts as stopped or moving.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StopDetection {
    /// Moving slower than this between two samples counts as stopped
    pub max_stop_speed: Speed,
}

impl Default for StopDetection {
    fn default() -> Self {
        Self {
            max_stop_speed: Speed::meters_per_second(0.5),
        }
    }
}

impl StopDetection {
    /// None for samples at the same time, since there's no interval to classify
    fn is_stopped(&self, dist: Distance, dt: Duration) -> Option<bool> {
        if dt <= Duration::ZERO {
            return None;
        }
        Some(Speed::from_dist_time(dist, dt) < self.max_stop_speed)
    }
}

/// A route under construction. Never visible outside the segmentation pass.
pub(crate) struct OpenRoute {
    start: usize,
    start_time: Time,
    zone: Option<ZoneID>,
    stats: RouteStats,

    last: usize,
    last_time: Time,
    moved: bool,
    // A stationary run that started after some motion, not yet followed by more motion
    stop_pending: bool,
}

impl OpenRoute {
    pub fn new(idx: usize, sample: &Sample, zone: Option<ZoneID>) -> Self {
        Self {
            start: idx,
            start_time: sample.time,
            zone,
            stats: RouteStats::ZERO,

            last: idx,
            last_time: sample.time,
            moved: false,
            stop_pending: false,
        }
    }

    /// Adds the next sample to this route, accumulating the interval from `prev`, the last sample
    /// already in the route.
    pub fn extend(&mut self, prev: &Sample, sample: &Sample, detection: &StopDetection) {
        self.accumulate(prev, sample, detection);
        self.last += 1;
        self.last_time = sample.time;
    }

    /// Counts the interval between two consecutive samples towards this route's stats, without
    /// changing which samples the route covers. A new route takes the interval leading up to its
    /// first sample this way.
    pub fn accumulate(&mut self, prev: &Sample, sample: &Sample, detection: &StopDetection) {
        let dist = prev.pos.dist_to(sample.pos);
        let dt = sample.time - prev.time;
        self.stats.distance += dist;

        match detection.is_stopped(dist, dt) {
            Some(true) => {
                self.stats.stop_time += dt;
                if self.moved {
                    self.stop_pending = true;
                }
            }
            Some(false) => {
                self.stats.moving_time += dt;
                if self.stop_pending {
                    self.stats.stops += 1;
                    self.stop_pending = false;
                }
                self.moved = true;
            }
            None => {}
        }
    }

    /// A stop still pending here isn't followed by motion, so it doesn't count.
    pub fn close(self) -> Route {
        Route {
            start: self.start,
            end: self.last,
            start_time: self.start_time,
            end_time: self.last_time,
            zone: self.zone,
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use geom::Pt2D;

    use super::*;

    fn build(points: &[(f64, f64)]) -> Route {
        let samples: Vec<Sample> = points
            .iter()
            .map(|(t, x)| Sample::new(Time::START_OF_DAY + Duration::seconds(*t), Pt2D::new(*x, 0.0)))
            .collect();
        let detection = StopDetection::default();
        let mut route = OpenRoute::new(0, &samples[0], None);
        for pair in samples.windows(2) {
            route.extend(&pair[0], &pair[1], &detection);
        }
        route.close()
    }

    #[test]
    fn moving_and_stopped_time() {
        // Move 10m in 1s, sit for 10s, move 10m in 1s
        let route = build(&[(0.0, 0.0), (1.0, 10.0), (11.0, 10.0), (12.0, 20.0)]);
        assert_eq!(route.stats.moving_time, Duration::seconds(2.0));
        assert_eq!(route.stats.stop_time, Duration::seconds(10.0));
        assert_eq!(route.stats.distance, Distance::meters(20.0));
        assert_eq!(route.stats.stops, 1);
        assert_eq!(route.num_samples(), 4);
        assert_eq!(route.duration(), Duration::seconds(12.0));
    }

    #[test]
    fn contiguous_stationary_intervals_are_one_stop() {
        let route = build(&[
            (0.0, 0.0),
            (1.0, 10.0),
            (5.0, 10.0),
            (9.0, 10.0),
            (10.0, 20.0),
            (20.0, 20.0),
            (21.0, 30.0),
        ]);
        assert_eq!(route.stats.stops, 2);
        assert_eq!(route.stats.stop_time, Duration::seconds(18.0));
    }

    #[test]
    fn stops_at_the_edges_dont_count() {
        // Parked at the start and at the end
        let route = build(&[(0.0, 0.0), (10.0, 0.0), (11.0, 10.0), (20.0, 10.0)]);
        assert_eq!(route.stats.stops, 0);
        assert_eq!(route.stats.stop_time, Duration::seconds(19.0));
        assert_eq!(route.stats.moving_time, Duration::seconds(1.0));
    }

    #[test]
    fn duplicate_times_only_add_distance() {
        let route = build(&[(0.0, 0.0), (0.0, 3.0), (1.0, 13.0)]);
        assert_eq!(route.stats.distance, Distance::meters(13.0));
        assert_eq!(route.stats.moving_time, Duration::seconds(1.0));
        assert_eq!(route.stats.stop_time, Duration::ZERO);
    }

    #[test]
    fn leading_gap_doesnt_change_covered_samples() {
        let prev = Sample::new(Time::START_OF_DAY, Pt2D::new(40.0, 0.0));
        let first = Sample::new(
            Time::START_OF_DAY + Duration::seconds(45.0),
            Pt2D::new(140.0, 0.0),
        );
        let mut route = OpenRoute::new(5, &first, None);
        route.accumulate(&prev, &first, &StopDetection::default());
        let route = route.close();
        assert_eq!((route.start, route.end), (5, 5));
        assert_eq!(route.start_time, first.time);
        assert_eq!(route.stats.distance, Distance::meters(100.0));
        assert_eq!(route.stats.moving_time, Duration::seconds(45.0));
    }

    #[test]
    fn sum_of_stats() {
        let a = build(&[(0.0, 0.0), (1.0, 10.0), (11.0, 10.0), (12.0, 20.0)]).stats;
        let total: RouteStats = vec![a, a].into_iter().sum();
        assert_eq!(total.stops, 2);
        assert_eq!(total.distance, Distance::meters(40.0));
        let empty: RouteStats = Vec::new().into_iter().sum();
        assert_eq!(empty, RouteStats::ZERO);
    }
}
