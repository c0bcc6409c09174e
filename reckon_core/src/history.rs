//! Per-object sample history
//!
//! Samples are keyed by reconstructed timestamp, so iteration is always in
//! time order regardless of arrival order. A second sample with an existing
//! timestamp replaces the first.

use crate::spatial::SpatialSample;
use reckon_env::ObjectId;
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Minimum stored samples (exclusive) before an object counts as evaluable.
pub const SUFFICIENT_SAMPLES: usize = 2;

/// Time-ordered samples of one object.
#[derive(Debug, Clone, Default)]
pub struct SampleHistory {
    samples: BTreeMap<SystemTime, SpatialSample>,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a sample, returning the one it replaced.
    pub fn insert(&mut self, timestamp: SystemTime, sample: SpatialSample) -> Option<SpatialSample> {
        self.samples.insert(timestamp, sample)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_time(&self) -> Option<SystemTime> {
        self.samples.keys().next().copied()
    }

    /// Latest timestamp, the reference for the next time-tag reconstruction.
    pub fn last_time(&self) -> Option<SystemTime> {
        self.samples.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SystemTime, &SpatialSample)> {
        self.samples.iter()
    }

    /// Consecutive `(previous, current)` pairs in ascending time order.
    pub fn pairs(&self) -> impl Iterator<Item = SamplePair<'_>> {
        self.samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|((t0, prev), (t1, curr))| SamplePair {
                previous_time: *t0,
                previous: prev,
                current_time: *t1,
                current: curr,
            })
    }
}

/// Two consecutive samples of one object.
#[derive(Debug, Clone, Copy)]
pub struct SamplePair<'a> {
    pub previous_time: SystemTime,
    pub previous: &'a SpatialSample,
    pub current_time: SystemTime,
    pub current: &'a SpatialSample,
}

impl SamplePair<'_> {
    /// Seconds from the previous sample to the current one.
    pub fn delta_seconds(&self) -> f64 {
        self.current_time
            .duration_since(self.previous_time)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Histories of every tracked object.
#[derive(Debug, Clone, Default)]
pub struct ObjectHistories {
    objects: BTreeMap<ObjectId, SampleHistory>,
}

impl ObjectHistories {
    pub fn new() -> Self {
        Self::default()
    }

    /// History for `object`, created empty on first use.
    pub fn entry(&mut self, object: &ObjectId) -> &mut SampleHistory {
        self.objects.entry(object.clone()).or_default()
    }

    pub fn get(&self, object: &ObjectId) -> Option<&SampleHistory> {
        self.objects.get(object)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &SampleHistory)> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn total_samples(&self) -> usize {
        self.objects.values().map(SampleHistory::len).sum()
    }

    /// True iff at least one object holds more than two samples.
    pub fn has_sufficient_data(&self) -> bool {
        self.objects.values().any(|h| h.len() > SUFFICIENT_SAMPLES)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
