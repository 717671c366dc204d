use anyhow::Result;
use geom::{Distance, Duration};

use crate::{MotionTiming, Sample};

/// The ways a stream of samples can be cut into routes.
#[derive(Clone, Debug, PartialEq)]
pub enum PolicyKind {
    /// A route ends at the last sample of a motion segment when the next segment starts more
    /// than `threshold` later.
    TimeGap { threshold: Duration },
    /// A route ends at a sample when the next sample is more than `threshold` away.
    DistanceJump { threshold: Distance },
    /// Everything is one route.
    WholeInput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    InRoute,
}

/// Decides where routes start and end during one ordered pass over samples. A policy has to be
/// initialized for a set of samples before asking it anything, and then asked about every sample
/// exactly once, in order: first `is_route_start`, then `is_route_end`.
#[derive(Clone, Debug)]
pub struct BoundaryPolicy {
    kind: PolicyKind,
    scan: Option<Scan>,
}

#[derive(Clone, Debug)]
struct Scan {
    state: ScanState,
    // Per sample, does the open route end there?
    ends: Vec<bool>,
    // The index most recently passed to is_route_start
    current: Option<usize>,
}

impl BoundaryPolicy {
    pub fn new(kind: PolicyKind) -> Self {
        Self { kind, scan: None }
    }

    pub fn time_gap(threshold: Duration) -> Self {
        Self::new(PolicyKind::TimeGap { threshold })
    }

    pub fn distance_jump(threshold: Distance) -> Self {
        Self::new(PolicyKind::DistanceJump { threshold })
    }

    pub fn whole_input() -> Self {
        Self::new(PolicyKind::WholeInput)
    }

    pub fn kind(&self) -> &PolicyKind {
        &self.kind
    }

    /// None before initialization
    pub fn state(&self) -> Option<ScanState> {
        self.scan.as_ref().map(|scan| scan.state)
    }

    /// Resets all scan state for a new set of samples.
    pub fn initialize(&mut self, samples: &[Sample], timing: &MotionTiming) -> Result<()> {
        if timing.len() != samples.len() {
            bail!(
                "Motion timing covers {} samples, but there are {}",
                timing.len(),
                samples.len()
            );
        }

        let mut ends = vec![false; samples.len()];
        match self.kind {
            PolicyKind::TimeGap { threshold } => {
                for (idx, end) in ends.iter_mut().enumerate() {
                    *end = timing.gap_after(idx) > threshold;
                }
            }
            PolicyKind::DistanceJump { threshold } => {
                for (idx, pair) in samples.windows(2).enumerate() {
                    ends[idx] = pair[0].pos.dist_to(pair[1].pos) > threshold;
                }
            }
            PolicyKind::WholeInput => {}
        }

        self.scan = Some(Scan {
            state: ScanState::Idle,
            ends,
            current: None,
        });
        Ok(())
    }

    /// True exactly when this sample begins a new route. Only the first sample after
    /// initialization, or the first one after a route ended, does.
    pub fn is_route_start(&mut self, _sample: &Sample, idx: usize) -> Result<bool> {
        let scan = match self.scan {
            Some(ref mut scan) => scan,
            None => bail!("is_route_start({idx}) called before the boundary policy was initialized"),
        };
        if idx >= scan.ends.len() {
            bail!(
                "is_route_start({idx}), but the policy was initialized with {} samples",
                scan.ends.len()
            );
        }
        if let Some(prev) = scan.current {
            if idx <= prev {
                bail!("is_route_start({idx}) after {prev}; samples must be scanned in order");
            }
        }
        scan.current = Some(idx);

        match scan.state {
            ScanState::Idle => {
                scan.state = ScanState::InRoute;
                Ok(true)
            }
            ScanState::InRoute => Ok(false),
        }
    }

    /// True exactly when this sample is the last one of the open route.
    pub fn is_route_end(&mut self, _sample: &Sample, idx: usize) -> Result<bool> {
        let scan = match self.scan {
            Some(ref mut scan) => scan,
            None => bail!("is_route_end({idx}) called before the boundary policy was initialized"),
        };
        if scan.current != Some(idx) {
            bail!(
                "is_route_end({idx}) must directly follow is_route_start({idx}), not {:?}",
                scan.current
            );
        }

        let end = scan.ends[idx];
        scan.state = if end {
            ScanState::Idle
        } else {
            ScanState::InRoute
        };
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use geom::{Pt2D, Time};

    use super::*;

    fn samples(times_and_x: &[(f64, f64)]) -> Vec<Sample> {
        times_and_x
            .iter()
            .map(|(t, x)| Sample::new(Time::START_OF_DAY + Duration::seconds(*t), Pt2D::new(*x, 0.0)))
            .collect()
    }

    // Returns (starts, ends) for every sample
    fn scan(policy: &mut BoundaryPolicy, samples: &[Sample]) -> (Vec<bool>, Vec<bool>) {
        let timing = MotionTiming::new(samples, Duration::seconds(10.0));
        policy.initialize(samples, &timing).unwrap();
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        for (idx, sample) in samples.iter().enumerate() {
            starts.push(policy.is_route_start(sample, idx).unwrap());
            ends.push(policy.is_route_end(sample, idx).unwrap());
        }
        (starts, ends)
    }

    #[test]
    fn predicates_before_initialize_fail() {
        let input = samples(&[(0.0, 0.0)]);
        let mut policy = BoundaryPolicy::time_gap(Duration::seconds(30.0));
        assert_eq!(policy.state(), None);
        assert!(policy.is_route_start(&input[0], 0).is_err());
        assert!(policy.is_route_end(&input[0], 0).is_err());
    }

    #[test]
    fn time_gap_marks_jump_points() {
        // Two motion runs, 45s apart
        let input = samples(&[(0.0, 0.0), (5.0, 1.0), (10.0, 2.0), (55.0, 3.0), (60.0, 4.0)]);
        let mut policy = BoundaryPolicy::time_gap(Duration::seconds(30.0));
        let (starts, ends) = scan(&mut policy, &input);
        assert_eq!(starts, vec![true, false, false, true, false]);
        assert_eq!(ends, vec![false, false, true, false, false]);
        assert_eq!(policy.state(), Some(ScanState::InRoute));
    }

    #[test]
    fn time_gap_below_threshold_is_ignored() {
        // 25s gap splits motion segments, but doesn't reach the 30s threshold
        let input = samples(&[(0.0, 0.0), (5.0, 1.0), (30.0, 2.0), (35.0, 3.0)]);
        let mut policy = BoundaryPolicy::time_gap(Duration::seconds(30.0));
        let (starts, ends) = scan(&mut policy, &input);
        assert_eq!(starts, vec![true, false, false, false]);
        assert_eq!(ends, vec![false; 4]);
    }

    #[test]
    fn distance_jump() {
        let input = samples(&[(0.0, 0.0), (1.0, 1.0), (2.0, 500.0), (3.0, 501.0)]);
        let mut policy = BoundaryPolicy::distance_jump(Distance::meters(100.0));
        let (starts, ends) = scan(&mut policy, &input);
        assert_eq!(starts, vec![true, false, true, false]);
        assert_eq!(ends, vec![false, true, false, false]);
    }

    #[test]
    fn whole_input_never_ends() {
        let input = samples(&[(0.0, 0.0), (100.0, 1.0), (1000.0, 2.0)]);
        let mut policy = BoundaryPolicy::whole_input();
        let (starts, ends) = scan(&mut policy, &input);
        assert_eq!(starts, vec![true, false, false]);
        assert_eq!(ends, vec![false; 3]);
    }

    #[test]
    fn out_of_order_scan_fails() {
        let input = samples(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        let timing = MotionTiming::new(&input, Duration::seconds(10.0));
        let mut policy = BoundaryPolicy::time_gap(Duration::seconds(30.0));
        policy.initialize(&input, &timing).unwrap();

        assert!(policy.is_route_start(&input[1], 1).unwrap());
        assert!(policy.is_route_start(&input[0], 0).is_err());
        // End must be asked about the same sample as the last start
        assert!(policy.is_route_end(&input[2], 2).is_err());
        assert!(policy.is_route_start(&input[2], 5).is_err());
    }

    #[test]
    fn initialize_resets_state() {
        let input = samples(&[(0.0, 0.0), (1.0, 1.0)]);
        let mut policy = BoundaryPolicy::time_gap(Duration::seconds(30.0));
        scan(&mut policy, &input);
        let (starts, _) = scan(&mut policy, &input);
        assert_eq!(starts, vec![true, false]);
    }
}
