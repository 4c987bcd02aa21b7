//! Bounded history buffer.
//!
//! An append-only FIFO of samples with a hard capacity. When full, the
//! oldest sample is evicted. Samples are never modified after they are
//! appended, so snapshots handed to charts or exporters stay valid.

use std::collections::VecDeque;

use crate::error::{Result, VoltlabError};
use crate::sample::SimulationSample;

/// Capacity-bounded, chronologically ordered sample store.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<SimulationSample>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer holding at most `capacity` samples (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when over capacity.
    ///
    /// Fails without modifying the buffer if `sample.index` does not follow
    /// the latest index.
    pub fn append(&mut self, sample: SimulationSample) -> Result<()> {
        if let Some(last) = self.samples.back() {
            if sample.index <= last.index {
                return Err(VoltlabError::OutOfOrderSample {
                    last: last.index,
                    got: sample.index,
                });
            }
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        Ok(())
    }

    /// Copy of the samples, oldest first.
    pub fn snapshot(&self) -> Vec<SimulationSample> {
        self.samples.iter().cloned().collect()
    }

    /// The newest sample.
    pub fn latest(&self) -> Option<&SimulationSample> {
        self.samples.back()
    }

    /// The oldest retained sample.
    pub fn oldest(&self) -> Option<&SimulationSample> {
        self.samples.front()
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SimulationSample> {
        self.samples.iter()
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

    /// Change the capacity, evicting the oldest samples if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Drop every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceKind;
    use crate::sample::Auxiliary;

    fn sample(index: u64) -> SimulationSample {
        SimulationSample {
            index,
            device_kind: DeviceKind::Multimeter,
            drive_value: index as f64,
            measured_current: 0.0,
            aux: Auxiliary::Instrument {
                raw: 0.0,
                corrected: 0.0,
                overridden: false,
            },
            timestamp_ms: 0.0,
        }
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let capacity = 240;
        let n = 1000;
        let mut history = HistoryBuffer::new(capacity);
        for i in 1..=n {
            history.append(sample(i)).unwrap();
        }

        assert_eq!(history.len(), capacity);
        assert_eq!(history.oldest().unwrap().index, n - capacity as u64 + 1);
        assert_eq!(history.latest().unwrap().index, n);
        assert!(history.iter().zip(history.iter().skip(1)).all(|(a, b)| b.index == a.index + 1));
    }

    #[test]
    fn test_under_capacity_keeps_everything() {
        let mut history = HistoryBuffer::new(10);
        assert!(history.latest().is_none());
        for i in 1..=4 {
            history.append(sample(i)).unwrap();
        }
        assert_eq!(history.len(), 4);
        assert_eq!(history.oldest().unwrap().index, 1);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut history = HistoryBuffer::new(4);
        history.append(sample(5)).unwrap();
        let err = history.append(sample(5)).unwrap_err();
        assert!(matches!(err, VoltlabError::OutOfOrderSample { last: 5, got: 5 }));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut history = HistoryBuffer::new(3);
        for i in 1..=3 {
            history.append(sample(i)).unwrap();
        }
        let before = history.snapshot();
        history.append(sample(4)).unwrap();

        assert_eq!(before.iter().map(|s| s.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(history.oldest().unwrap().index, 2);
    }

    #[test]
    fn test_shrinking_capacity_evicts_oldest() {
        let mut history = HistoryBuffer::new(8);
        for i in 1..=8 {
            history.append(sample(i)).unwrap();
        }
        history.set_capacity(3);
        assert_eq!(history.len(), 3);
        assert_eq!(history.oldest().unwrap().index, 6);
    }
}
