use anyhow::Result;
use geom::{Pt2D, Time};
use serde::{Deserialize, Serialize};

use crate::{CurveFitter, Ransac, Routes, Sample};

/// How an entity is drawn during playback. Purely cosmetic; carried through to every event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Styling {
    pub icon: String,
    pub color: String,
}

impl Default for Styling {
    fn default() -> Self {
        Self {
            icon: "circle".to_string(),
            color: "blue".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEvent {
    pub route: usize,
    pub time: Time,
    pub pos: Pt2D,
    pub icon: String,
    pub color: String,
    /// False when the raw sample position is used
    pub fitted: bool,
}

/// Turns routes into sequences of events to replay.
pub struct PlaybackProjector<'a, F> {
    routes: &'a Routes,
    fitter: F,
}

impl<'a, F: CurveFitter> PlaybackProjector<'a, F> {
    pub fn new(routes: &'a Routes, fitter: F) -> Self {
        Self { routes, fitter }
    }

    /// Smooths the route with the curve fitting configured for its zone, then lazily produces one
    /// event per sample, in time order. If fitting isn't configured or fails, the raw positions
    /// are used instead.
    pub fn generate(&self, route: usize, styling: &Styling) -> Result<Playback<'a>> {
        let samples = self.routes.route_samples(route)?;
        let zone = self.routes.get(route)?.zone;

        let fitted = match self.routes.zones().config_for(zone) {
            Some(config) => match self.fitter.fit(samples, config) {
                Ok(pts) if pts.len() == samples.len() => Some(pts),
                Ok(pts) => {
                    warn!(
                        "Curve fit for route {route} returned {} points for {} samples; replaying raw samples",
                        pts.len(),
                        samples.len()
                    );
                    None
                }
                Err(err) => {
                    debug!("Curve fit for route {route} failed, replaying raw samples: {err}");
                    None
                }
            },
            None => None,
        };

        Ok(Playback {
            route,
            samples,
            fitted,
            styling: styling.clone(),
            next: 0,
        })
    }

    /// Every route, one after another. Each route is only fit once the previous one is consumed.
    pub fn generate_all(self, styling: &Styling) -> Box<dyn Iterator<Item = PlaybackEvent> + 'a>
    where
        F: 'a,
    {
        let styling = styling.clone();
        let num_routes = self.routes.len();
        Box::new((0..num_routes).flat_map(move |idx| {
            // The index is always in range
            self.generate(idx, &styling).into_iter().flatten()
        }))
    }
}

impl Routes {
    /// Playback for one route, or all of them, using the default RANSAC curve fitting.
    pub fn generate_playback(
        &self,
        route: Option<usize>,
        styling: &Styling,
    ) -> Result<Box<dyn Iterator<Item = PlaybackEvent> + '_>> {
        let projector = PlaybackProjector::new(self, Ransac);
        match route {
            Some(idx) => Ok(Box::new(projector.generate(idx, styling)?)),
            None => Ok(projector.generate_all(styling)),
        }
    }
}

/// A lazy sequence of events for one route. Call `generate` again to restart.
pub struct Playback<'a> {
    route: usize,
    samples: &'a [Sample],
    fitted: Option<Vec<Pt2D>>,
    styling: Styling,
    next: usize,
}

impl Playback<'_> {
    pub fn route(&self) -> usize {
        self.route
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

impl Iterator for Playback<'_> {
    type Item = PlaybackEvent;

    fn next(&mut self) -> Option<PlaybackEvent> {
        let sample = self.samples.get(self.next)?;
        let pos = match self.fitted {
            Some(ref pts) => pts[self.next],
            None => sample.pos,
        };
        self.next += 1;
        Some(PlaybackEvent {
            route: self.route,
            time: sample.time,
            pos,
            icon: self.styling.icon.clone(),
            color: self.styling.color.clone(),
            fitted: self.fitted.is_some(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.samples.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Playback<'_> {}
