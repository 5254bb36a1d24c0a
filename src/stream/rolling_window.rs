//! Time-bucketed counter over a trailing window

use crate::error::{MonitorError, Result};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Append-only counter that only remembers the last `window` of appends.
///
/// Appends landing within `resolution` of the newest bucket are folded into
/// it, so memory stays bounded by `window / resolution` buckets.
#[derive(Debug)]
pub struct RollingCounter {
    window: Duration,
    resolution: Duration,
    buckets: VecDeque<(Instant, u64)>,
}

impl RollingCounter {
    pub fn new(window: Duration, resolution: Duration) -> Self {
        Self { window, resolution, buckets: VecDeque::new() }
    }

    pub fn append(&mut self, count: u64) -> Result<()> {
        self.append_at(Instant::now(), count)
    }

    pub fn append_at(&mut self, now: Instant, count: u64) -> Result<()> {
        self.prune(now);

        if let Some((start, total)) = self.buckets.back_mut() {
            if now.saturating_duration_since(*start) < self.resolution {
                *total = total.checked_add(count).ok_or(MonitorError::RateOverflow)?;
                return Ok(());
            }
        }

        self.buckets.push_back((now, count));
        Ok(())
    }

    /// Total of the appends inside the trailing window ending at `now`
    pub fn sum_at(&mut self, now: Instant) -> u64 {
        self.prune(now);
        self.buckets.iter().fold(0u64, |acc, (_, count)| acc.saturating_add(*count))
    }

    /// `sum / window` in units per second
    pub fn rate_at(&mut self, now: Instant) -> f64 {
        let secs = self.window.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.sum_at(now) as f64 / secs
    }

    fn prune(&mut self, now: Instant) {
        while let Some((start, _)) = self.buckets.front() {
            if now.saturating_duration_since(*start) >= self.window {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> RollingCounter {
        RollingCounter::new(Duration::from_secs(60), Duration::from_millis(100))
    }

    #[test]
    fn test_sum_over_window() {
        let mut counter = counter();
        let start = Instant::now();

        counter.append_at(start, 3).unwrap();
        counter.append_at(start + Duration::from_millis(50), 2).unwrap();
        counter.append_at(start + Duration::from_secs(30), 5).unwrap();

        assert_eq!(counter.sum_at(start + Duration::from_secs(31)), 10);
        assert_eq!(counter.buckets.len(), 2);

        // the first bucket falls out of the window
        assert_eq!(counter.sum_at(start + Duration::from_secs(61)), 5);
        assert_eq!(counter.sum_at(start + Duration::from_secs(91)), 0);
    }

    #[test]
    fn test_rate() {
        let mut counter = counter();
        let start = Instant::now();
        counter.append_at(start, 120).unwrap();
        assert!((counter.rate_at(start) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut counter = counter();
        let start = Instant::now();
        counter.append_at(start, u64::MAX).unwrap();

        let err = counter.append_at(start, 1).unwrap_err();
        assert!(matches!(err, MonitorError::RateOverflow));
        assert_eq!(counter.sum_at(start), u64::MAX);
    }
}
