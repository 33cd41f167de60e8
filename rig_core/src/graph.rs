//! Live force-vs-travel series and axis-bound policy.

use crate::error::RigError;

/// Points shown on the live plot, relative to a travel origin.
#[derive(Debug, Clone, Default)]
pub struct GraphSeries {
    travel: Vec<f64>,
    force: Vec<f64>,
    travel_offset: f64,
    force_offset: f64,
    max_points: usize,
    keep_points: usize,
}

impl GraphSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the series: once it exceeds `max_points`, keep only the newest `keep_points`.
    /// A `max_points` of 0 disables trimming.
    /// A trim keeps at least the newest point.
    pub fn with_cap(max_points: usize, keep_points: usize) -> Self {
        Self {
            max_points,
            keep_points: keep_points.clamp(1, max_points.max(1)),
            ..Self::default()
        }
    }

    /// Clear the points and rebase travel at `current_travel_in`.
    ///
    /// The force origin is reset to 0, not to the current force.
    pub fn reset(&mut self, current_travel_in: f64) {
        self.travel.clear();
        self.force.clear();
        self.travel_offset = current_travel_in;
        self.force_offset = 0.0;
    }

    /// Forget the force origin after a re-zero.
    pub fn clear_force_offset(&mut self) {
        self.force_offset = 0.0;
    }

    pub fn push(&mut self, travel: f64, force: f64) {
        self.travel.push(travel);
        self.force.push(force);
        if self.max_points > 0 && self.travel.len() > self.max_points {
            let drop = self.travel.len() - self.keep_points;
            self.travel.drain(..drop);
            self.force.drain(..drop);
        }
    }

    pub fn travel(&self) -> &[f64] {
        &self.travel
    }

    pub fn force(&self) -> &[f64] {
        &self.force
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.travel.iter().copied().zip(self.force.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.travel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.travel.is_empty()
    }

    pub fn travel_offset(&self) -> f64 {
        self.travel_offset
    }

    pub fn force_offset(&self) -> f64 {
        self.force_offset
    }
}

/// Which axes autoscale. Numbered 1..=4 on the operator surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum AxisMode {
    #[default]
    AutoXY,
    FixedXY,
    AutoXFixedY,
    FixedXAutoY,
}

impl AxisMode {
    pub fn from_index(i: u8) -> Option<Self> {
        match i {
            1 => Some(AxisMode::AutoXY),
            2 => Some(AxisMode::FixedXY),
            3 => Some(AxisMode::AutoXFixedY),
            4 => Some(AxisMode::FixedXAutoY),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            AxisMode::AutoXY => 1,
            AxisMode::FixedXY => 2,
            AxisMode::AutoXFixedY => 3,
            AxisMode::FixedXAutoY => 4,
        }
    }

    pub fn auto_x(self) -> bool {
        matches!(self, AxisMode::AutoXY | AxisMode::AutoXFixedY)
    }

    pub fn auto_y(self) -> bool {
        matches!(self, AxisMode::AutoXY | AxisMode::FixedXAutoY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Default for AxisBounds {
    fn default() -> Self {
        Self {
            xmin: 0.0,
            xmax: 1.0,
            ymin: 0.0,
            ymax: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisPolicy {
    pub mode: AxisMode,
    pub bounds: AxisBounds,
}

/// Concrete plot window after applying an [`AxisPolicy`] to a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBounds {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl AxisPolicy {
    /// Build a policy from operator-entered bound text, in `xmin, xmax, ymin, ymax` order.
    ///
    /// Only the bounds the mode fixes are parsed; the rest keep `previous` values.
    pub fn parse(
        mode: AxisMode,
        text: [&str; 4],
        previous: AxisBounds,
    ) -> Result<Self, RigError> {
        let mut b = previous;
        if !mode.auto_x() {
            b.xmin = parse_bound("xmin", text[0])?;
            b.xmax = parse_bound("xmax", text[1])?;
        }
        if !mode.auto_y() {
            b.ymin = parse_bound("ymin", text[2])?;
            b.ymax = parse_bound("ymax", text[3])?;
        }
        Ok(Self { mode, bounds: b })
    }

    pub fn resolve(&self, series: &GraphSeries) -> ViewBounds {
        let x = if self.mode.auto_x() {
            auto_range(series.travel()).unwrap_or((self.bounds.xmin, self.bounds.xmax))
        } else {
            (self.bounds.xmin, self.bounds.xmax)
        };
        let y = if self.mode.auto_y() {
            auto_range(series.force()).unwrap_or((self.bounds.ymin, self.bounds.ymax))
        } else {
            (self.bounds.ymin, self.bounds.ymax)
        };
        ViewBounds { x, y }
    }
}

fn parse_bound(name: &str, text: &str) -> Result<f64, RigError> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RigError::InvalidInput(format!(
            "{name} must be a number, got '{text}'"
        ))),
    }
}

/// Data range with a 5% margin; a flat series gets a unit-wide window.
fn auto_range(values: &[f64]) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.05 } else { 0.5 };
    Some((lo - pad, hi + pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_rebases_travel_and_zeroes_force_origin() {
        let mut g = GraphSeries::new();
        g.push(1.0, 2.0);
        g.reset(0.75);
        assert!(g.is_empty());
        assert_eq!(g.travel_offset(), 0.75);
        assert_eq!(g.force_offset(), 0.0);
    }

    #[test]
    fn cap_keeps_newest_points() {
        let mut g = GraphSeries::with_cap(4, 2);
        for i in 0..5 {
            g.push(f64::from(i), 0.0);
        }
        assert_eq!(g.travel(), &[3.0, 4.0]);
    }

    #[test]
    fn trim_never_empties_the_series() {
        let mut g = GraphSeries::with_cap(3, 0);
        for i in 0..4 {
            g.push(f64::from(i), 10.0 * f64::from(i));
        }
        assert_eq!(g.travel(), &[3.0]);
        assert_eq!(g.force(), &[30.0]);
    }

    #[test]
    fn fixed_bounds_must_be_numeric() {
        let err = AxisPolicy::parse(
            AxisMode::FixedXY,
            ["0", "abc", "0", "10"],
            AxisBounds::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RigError::InvalidInput(m) if m.contains("xmax")));
    }

    #[test]
    fn auto_axes_ignore_bound_text() {
        let p = AxisPolicy::parse(
            AxisMode::AutoXFixedY,
            ["junk", "junk", "-5", "50"],
            AxisBounds::default(),
        )
        .unwrap();
        assert_eq!(p.bounds.ymin, -5.0);
        assert_eq!(p.bounds.xmax, 1.0);
    }

    #[test]
    fn resolve_mixes_auto_and_fixed() {
        let mut g = GraphSeries::new();
        g.push(0.0, 10.0);
        g.push(2.0, 30.0);
        let p = AxisPolicy {
            mode: AxisMode::FixedXAutoY,
            bounds: AxisBounds {
                xmin: -1.0,
                xmax: 1.0,
                ymin: 0.0,
                ymax: 1.0,
            },
        };
        let v = p.resolve(&g);
        assert_eq!(v.x, (-1.0, 1.0));
        assert!((v.y.0 - 9.0).abs() < 1e-12);
        assert!((v.y.1 - 31.0).abs() < 1e-12);
    }

    #[test]
    fn axis_mode_indices_round_trip() {
        for i in 1..=4 {
            assert_eq!(AxisMode::from_index(i).map(AxisMode::index), Some(i));
        }
        assert_eq!(AxisMode::from_index(0), None);
    }
}
