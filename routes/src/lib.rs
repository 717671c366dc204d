#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub mod avl;
mod boundary;
mod curve_fit;
mod export;
mod motion;
mod playback;
mod route;
mod sample;
mod segmentation;
pub mod stats;
mod zones;

use serde::{Deserialize, Serialize};

pub use self::boundary::{BoundaryPolicy, PolicyKind, ScanState};
pub use self::curve_fit::{CurveFitConfig, CurveFitter, MinSamples, Ransac};
pub use self::motion::{MotionSegment, MotionTiming};
pub use self::playback::{Playback, PlaybackEvent, PlaybackProjector, Styling};
pub use self::route::{Route, RouteStats, StopDetection};
pub use self::sample::Sample;
pub use self::segmentation::{Routes, SegmentationOptions};
pub use self::stats::{DailySummary, StatsFile};
pub use self::zones::{CurveFitZones, Zone, ZoneID};

/// Identifies the tracked entity (a vehicle, a tag, a carrier) that produced samples.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityName(pub String);

impl EntityName {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
