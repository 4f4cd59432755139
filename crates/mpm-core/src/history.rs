//! Rolling history of aggregate CPU and memory usage.
//!
//! One sample is appended per applied snapshot; the buffer keeps the most
//! recent `capacity` samples and evicts the oldest first.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::process::Snapshot;

/// Default number of samples kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Aggregate resource usage at one poll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceSample {
    pub timestamp: DateTime<Utc>,
    pub total_cpu: f64,
    pub total_memory: f64,
}

impl ResourceSample {
    /// Sums cpu and memory over every process in the snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let (total_cpu, total_memory) = snapshot
            .processes()
            .iter()
            .fold((0.0, 0.0), |(cpu, mem), p| (cpu + p.cpu, mem + p.memory));
        Self {
            timestamp: snapshot.captured_at(),
            total_cpu,
            total_memory,
        }
    }
}

/// Fixed-capacity FIFO of resource samples.
#[derive(Debug, Clone)]
pub struct ResourceHistory {
    samples: VecDeque<ResourceSample>,
    capacity: usize,
}

impl ResourceHistory {
    /// Creates an empty history. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records one sample for an applied snapshot.
    ///
    /// The timestamp is clamped so samples never go backwards in time.
    pub fn record(&mut self, snapshot: &Snapshot) -> ResourceSample {
        let mut sample = ResourceSample::from_snapshot(snapshot);
        if let Some(latest) = self.samples.back() {
            if sample.timestamp < latest.timestamp {
                sample.timestamp = latest.timestamp;
            }
        }
        self.push(sample);
        sample
    }

    fn push(&mut self, sample: ResourceSample) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<&ResourceSample> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&ResourceSample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceSample> {
        self.samples.iter()
    }

    /// Total CPU series, oldest first.
    pub fn cpu_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.total_cpu).collect()
    }

    /// Total memory series, oldest first.
    pub fn memory_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.total_memory).collect()
    }
}

impl Default for ResourceHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Process, ProcessId};
    use chrono::Duration;

    fn snapshot_with_cpu(cpu: f64, at: DateTime<Utc>) -> Snapshot {
        Snapshot::new(
            vec![Process {
                id: ProcessId::new(1),
                cpu,
                memory: cpu * 2.0,
                ..Default::default()
            }],
            at,
        )
        .unwrap()
    }

    #[test]
    fn test_scenario_totals() {
        let snapshot = Snapshot::new(
            vec![
                Process {
                    id: ProcessId::new(1),
                    user: "a".to_string(),
                    cpu: 10.0,
                    memory: 5.0,
                    ..Default::default()
                },
                Process {
                    id: ProcessId::new(2),
                    user: "b".to_string(),
                    cpu: 20.0,
                    memory: 15.0,
                    ..Default::default()
                },
            ],
            Utc::now(),
        )
        .unwrap();
        let mut history = ResourceHistory::default();
        let sample = history.record(&snapshot);
        assert!((sample.total_cpu - 30.0).abs() < f64::EPSILON);
        assert!((sample.total_memory - 20.0).abs() < f64::EPSILON);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_eleven_records_keep_samples_two_to_eleven() {
        let start = Utc::now();
        let mut history = ResourceHistory::default();
        for i in 1..=11 {
            history.record(&snapshot_with_cpu(i as f64, start + Duration::seconds(i)));
        }
        assert_eq!(history.len(), 10);
        let cpus = history.cpu_series();
        let expected: Vec<f64> = (2..=11).map(|i| i as f64).collect();
        assert_eq!(cpus, expected);
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let now = Utc::now();
        let mut history = ResourceHistory::default();
        history.record(&snapshot_with_cpu(1.0, now));
        let sample = history.record(&snapshot_with_cpu(2.0, now - Duration::seconds(30)));
        assert_eq!(sample.timestamp, now);
    }

    #[test]
    fn test_empty_snapshot_records_zero() {
        let mut history = ResourceHistory::default();
        let sample = history.record(&Snapshot::empty());
        assert_eq!(sample.total_cpu, 0.0);
        assert_eq!(sample.total_memory, 0.0);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let history = ResourceHistory::new(0);
        assert_eq!(history.capacity(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_length_bounded_and_ordered(records in 0usize..40, capacity in 1usize..15) {
                let start = Utc::now();
                let mut history = ResourceHistory::new(capacity);
                for i in 0..records {
                    history.record(&snapshot_with_cpu(i as f64, start + Duration::seconds(i as i64)));
                    prop_assert!(history.len() <= capacity);
                }
                prop_assert_eq!(history.len(), records.min(capacity));
                let stamps: Vec<_> = history.iter().map(|s| s.timestamp).collect();
                prop_assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }
}
