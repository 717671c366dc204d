use geom::{Duration, Time};
use serde::{Deserialize, Serialize};

use crate::Sample;

/// A maximal run of samples without any internal time gap over the noise tolerance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionSegment {
    // Inclusive indices into the samples
    pub start_idx: usize,
    pub end_idx: usize,
    pub start_time: Time,
    pub end_time: Time,
}

/// Per-sample motion segment boundaries, precomputed once before a boundary policy scans the
/// samples.
pub struct MotionTiming {
    // Same length as the samples. (start_time, end_time) of the segment containing each sample.
    per_sample: Vec<(Time, Time)>,
    segments: Vec<MotionSegment>,
    explicit: bool,
}

impl MotionTiming {
    /// Uses the motion segments supplied with the samples if every sample has one, and otherwise
    /// derives segments by splitting wherever consecutive samples are more than `noise_tolerance`
    /// apart.
    pub fn new(samples: &[Sample], noise_tolerance: Duration) -> Self {
        let explicit = !samples.is_empty() && samples.iter().all(|s| s.motion.is_some());
        if !explicit && samples.iter().any(|s| s.motion.is_some()) {
            warn!(
                "Only some of {} samples have motion segments; deriving all of them from time gaps",
                samples.len()
            );
        }

        let (segments, per_sample) = if explicit {
            let per_sample: Vec<(Time, Time)> = samples.iter().filter_map(|s| s.motion).collect();
            (group_explicit(&per_sample), per_sample)
        } else {
            let segments = split_by_gaps(samples, noise_tolerance);
            let mut per_sample = Vec::with_capacity(samples.len());
            for seg in &segments {
                for _ in seg.start_idx..=seg.end_idx {
                    per_sample.push((seg.start_time, seg.end_time));
                }
            }
            (segments, per_sample)
        };

        Self {
            per_sample,
            segments,
            explicit,
        }
    }

    /// True when the segments came with the samples, instead of being split by the noise
    /// tolerance
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn segments(&self) -> &Vec<MotionSegment> {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.per_sample.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_sample.is_empty()
    }

    /// Start time of the motion segment containing sample `idx`
    pub fn start(&self, idx: usize) -> Option<Time> {
        self.per_sample.get(idx).map(|(start, _)| *start)
    }

    /// End time of the motion segment containing sample `idx`
    pub fn end(&self, idx: usize) -> Option<Time> {
        self.per_sample.get(idx).map(|(_, end)| *end)
    }

    /// The time between the end of the segment containing `idx` and the start of the segment
    /// containing the next sample. Negative inside a segment, and zero for the last sample.
    pub fn gap_after(&self, idx: usize) -> Duration {
        match (self.start(idx + 1), self.end(idx)) {
            (Some(next_start), Some(end)) => next_start - end,
            _ => Duration::ZERO,
        }
    }
}

fn split_by_gaps(samples: &[Sample], noise_tolerance: Duration) -> Vec<MotionSegment> {
    let mut segments = Vec::new();
    let mut start_idx = 0;
    for idx in 1..=samples.len() {
        let split = idx == samples.len()
            || samples[idx].time - samples[idx - 1].time > noise_tolerance;
        if split && idx > start_idx {
            segments.push(MotionSegment {
                start_idx,
                end_idx: idx - 1,
                start_time: samples[start_idx].time,
                end_time: samples[idx - 1].time,
            });
            start_idx = idx;
        }
    }
    segments
}

fn group_explicit(per_sample: &[(Time, Time)]) -> Vec<MotionSegment> {
    let mut segments: Vec<MotionSegment> = Vec::new();
    for (idx, (start_time, end_time)) in per_sample.iter().enumerate() {
        if let Some(last) = segments.last_mut() {
            if last.start_time == *start_time && last.end_time == *end_time {
                last.end_idx = idx;
                continue;
            }
        }
        segments.push(MotionSegment {
            start_idx: idx,
            end_idx: idx,
            start_time: *start_time,
            end_time: *end_time,
        });
    }
    segments
}
