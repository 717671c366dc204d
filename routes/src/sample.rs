use anyhow::Result;
use geom::{Pt2D, Time};
use serde::{Deserialize, Serialize};

/// One positional measurement of an entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: Time,
    pub pos: Pt2D,
    /// When known upstream, the start and end time of the motion segment this sample belongs to
    pub motion: Option<(Time, Time)>,
}

impl Sample {
    pub fn new(time: Time, pos: Pt2D) -> Self {
        Self {
            time,
            pos,
            motion: None,
        }
    }

    pub fn with_motion(mut self, start: Time, end: Time) -> Self {
        self.motion = Some((start, end));
        self
    }

    /// Samples must arrive sorted by time. Equal times are fine.
    pub fn check_order(samples: &[Sample]) -> Result<()> {
        for (idx, pair) in samples.windows(2).enumerate() {
            if pair[0].time > pair[1].time {
                bail!(
                    "Samples out-of-order at {}: {} then {}",
                    idx + 1,
                    pair[0].time,
                    pair[1].time
                );
            }
        }
        Ok(())
    }
}
