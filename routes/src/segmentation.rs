use anyhow::Result;
use geom::{Distance, Duration};
use serde::{Deserialize, Serialize};

use crate::route::OpenRoute;
use crate::{
    BoundaryPolicy, CurveFitZones, MotionTiming, PolicyKind, Route, RouteStats, Sample,
    StopDetection,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentationOptions {
    /// Samples further apart than this belong to different motion segments
    pub noise_tolerance: Duration,
    pub stop_detection: StopDetection,
}

impl Default for SegmentationOptions {
    fn default() -> Self {
        Self {
            noise_tolerance: Duration::seconds(10.0),
            stop_detection: StopDetection::default(),
        }
    }
}

/// All of the routes found in one batch of samples from one entity.
pub struct Routes {
    samples: Vec<Sample>,
    // Ordered and non-overlapping, covering every sample
    routes: Vec<Route>,
    zones: CurveFitZones,
    totals: RouteStats,
}

impl Routes {
    /// Splits samples into routes in a single pass, with the policy deciding where each route
    /// starts and ends. The samples must be sorted by time.
    pub fn new(
        samples: Vec<Sample>,
        zones: CurveFitZones,
        mut policy: BoundaryPolicy,
        opts: &SegmentationOptions,
    ) -> Result<Self> {
        Sample::check_order(&samples)?;
        let timing = MotionTiming::new(&samples, opts.noise_tolerance);
        if let PolicyKind::TimeGap { threshold } = policy.kind() {
            // Gaps shorter than the noise tolerance never separate motion segments
            if !timing.is_explicit() && *threshold < opts.noise_tolerance {
                bail!(
                    "Time gap threshold {} is below the noise tolerance {}; shorter gaps can't be \
                     detected",
                    threshold,
                    opts.noise_tolerance
                );
            }
        }
        policy.initialize(&samples, &timing)?;

        let mut routes = Vec::new();
        let mut current: Option<OpenRoute> = None;
        for (idx, sample) in samples.iter().enumerate() {
            if policy.is_route_start(sample, idx)? {
                if let Some(route) = current.take() {
                    debug!(
                        "{:?} starts a new route at {idx} without ending the last",
                        policy.kind()
                    );
                    routes.push(route.close());
                }
                let mut route = OpenRoute::new(idx, sample, zones.zone_containing(sample.pos));
                // The gap since the previous route counts towards the new one
                if idx > 0 {
                    route.accumulate(&samples[idx - 1], sample, &opts.stop_detection);
                }
                current = Some(route);
            } else {
                match current {
                    Some(ref mut route) => {
                        route.extend(&samples[idx - 1], sample, &opts.stop_detection);
                    }
                    None => bail!(
                        "Sample {idx} at {} isn't part of any route; {:?} never started one",
                        sample.time,
                        policy.kind()
                    ),
                }
            }

            if policy.is_route_end(sample, idx)? {
                if let Some(route) = current.take() {
                    routes.push(route.close());
                }
            }
        }
        if let Some(route) = current.take() {
            routes.push(route.close());
        }

        let totals = routes.iter().map(|r| r.stats).sum();
        Ok(Self {
            samples,
            routes,
            zones,
            totals,
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, idx: usize) -> Result<&Route> {
        match self.routes.get(idx) {
            Some(route) => Ok(route),
            None => bail!("Route {idx} out of range; there are {} routes", self.routes.len()),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<Route> {
        self.routes.iter()
    }

    pub fn route_samples(&self, idx: usize) -> Result<&[Sample]> {
        let route = self.get(idx)?;
        Ok(&self.samples[route.start..=route.end])
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn zones(&self) -> &CurveFitZones {
        &self.zones
    }

    /// Summed over every route
    pub fn totals(&self) -> RouteStats {
        self.totals
    }

    pub fn number_of_stops(&self) -> usize {
        self.totals.stops
    }

    pub fn sum_stop_time(&self) -> Duration {
        self.totals.stop_time
    }

    pub fn sum_moving_time(&self) -> Duration {
        self.totals.moving_time
    }

    pub fn sum_distance(&self) -> Distance {
        self.totals.distance
    }
}

impl<'a> IntoIterator for &'a Routes {
    type Item = &'a Route;
    type IntoIter = std::slice::Iter<'a, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}
