//! Test recording and force-at-travel lookup.

use crate::error::RigError;
use crate::graph::GraphSeries;
use std::time::Instant;

/// How many nearest graph points are averaged by a force-at-travel query.
pub const NEAREST_SAMPLES: usize = 4;

/// One recorded row: seconds since test start, relative travel, relative force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub travel: f64,
    pub force: f64,
}

/// Time-stamped samples captured between start and end of a test.
#[derive(Debug, Clone, Default)]
pub struct TestRecorder {
    active: bool,
    started_at: Option<Instant>,
    time: Vec<f64>,
    force: Vec<f64>,
    travel: Vec<f64>,
}

impl TestRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear previous data and begin recording at `now`.
    pub fn start(&mut self, now: Instant) {
        self.time.clear();
        self.force.clear();
        self.travel.clear();
        self.started_at = Some(now);
        self.active = true;
    }

    /// Stop recording. Data is kept for export.
    pub fn stop(&mut self) -> Result<usize, RigError> {
        if !self.active {
            return Err(RigError::NoData("no test is currently running".into()));
        }
        self.active = false;
        Ok(self.time.len())
    }

    /// Append a sample taken at `now` if a test is active. Returns whether it was recorded.
    pub fn record(&mut self, now: Instant, travel: f64, force: f64) -> bool {
        let Some(t0) = self.started_at.filter(|_| self.active) else {
            return false;
        };
        self.time
            .push(now.saturating_duration_since(t0).as_secs_f64());
        self.travel.push(travel);
        self.force.push(force);
        true
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.time
            .iter()
            .zip(&self.travel)
            .zip(&self.force)
            .map(|((&time, &travel), &force)| Sample {
                time,
                travel,
                force,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForceQuery {
    Force(f64),
    NoData,
    InvalidInput,
}

/// Estimate force at an operator-entered travel from the live graph series.
///
/// The input is parsed before the series is checked, so bad text reports
/// `InvalidInput` even on an empty graph.
pub fn query_force_at_travel(graph: &GraphSeries, target: &str) -> ForceQuery {
    let target = match target.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => return ForceQuery::InvalidInput,
    };
    match nearest_force(graph.travel(), graph.force(), target, NEAREST_SAMPLES) {
        Some(f) => ForceQuery::Force(f),
        None => ForceQuery::NoData,
    }
}

/// Mean force of the `k` points whose travel is closest to `target`.
///
/// Ties keep series order. Fewer than `k` points averages all of them.
pub fn nearest_force(travel: &[f64], force: &[f64], target: f64, k: usize) -> Option<f64> {
    let n = travel.len().min(force.len());
    if n == 0 || k == 0 {
        return None;
    }
    let mut idx: Vec<usize> = (0..n).collect();
    idx.sort_by(|&a, &b| {
        (travel[a] - target)
            .abs()
            .total_cmp(&(travel[b] - target).abs())
    });
    let take = k.min(n);
    let sum: f64 = idx[..take].iter().map(|&i| force[i]).sum();
    Some(sum / take as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn record_only_while_active() {
        let t0 = Instant::now();
        let mut r = TestRecorder::new();
        assert!(!r.record(t0, 1.0, 1.0));
        r.start(t0);
        assert!(r.record(t0 + Duration::from_millis(500), 0.1, 5.0));
        assert_eq!(r.stop().unwrap(), 1);
        assert!(!r.record(t0 + Duration::from_secs(1), 0.2, 6.0));
        let s: Vec<_> = r.samples().collect();
        assert_eq!(s.len(), 1);
        assert!((s[0].time - 0.5).abs() < 1e-9);
    }

    #[test]
    fn stop_without_start_is_no_data() {
        let mut r = TestRecorder::new();
        assert!(matches!(r.stop(), Err(RigError::NoData(_))));
    }

    #[test]
    fn start_clears_previous_recording() {
        let t0 = Instant::now();
        let mut r = TestRecorder::new();
        r.start(t0);
        r.record(t0, 1.0, 1.0);
        r.stop().unwrap();
        r.start(t0);
        assert!(r.is_empty());
    }

    #[test]
    fn nearest_four_average() {
        let travel = [0.0, 1.0, 2.0, 5.0, 9.0];
        let force = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(nearest_force(&travel, &force, 1.5, 4), Some(25.0));
    }

    #[test]
    fn fewer_points_than_k() {
        assert_eq!(nearest_force(&[1.0, 3.0], &[2.0, 4.0], 0.0, 4), Some(3.0));
    }
}
