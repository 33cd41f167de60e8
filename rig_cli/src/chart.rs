//! PNG snapshot of the force-vs-travel graph.
//!
//! Drawn without text so no font backend is needed.

use plotters::prelude::*;
use rig_core::{ChartRenderer, GraphSeries, ViewBounds};
use rig_traits::BoxError;
use std::path::Path;

pub struct PngChart {
    pub width: u32,
    pub height: u32,
}

impl Default for PngChart {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

fn plot_err<E: std::fmt::Display>(e: E) -> BoxError {
    e.to_string().into()
}

/// Ordered, non-empty range.
fn span((a, b): (f64, f64)) -> std::ops::Range<f64> {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if hi - lo > f64::EPSILON { lo..hi } else { (lo - 0.5)..(hi + 0.5) }
}

impl ChartRenderer for PngChart {
    fn render_png(
        &mut self,
        path: &Path,
        graph: &GraphSeries,
        bounds: ViewBounds,
    ) -> Result<(), BoxError> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        let (x, y) = (span(bounds.x), span(bounds.y));
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .x_label_area_size(0)
            .y_label_area_size(0)
            .build_cartesian_2d(x.clone(), y.clone())
            .map_err(plot_err)?;

        if y.contains(&0.0) {
            chart
                .draw_series(LineSeries::new(
                    [(x.start, 0.0), (x.end, 0.0)],
                    ShapeStyle::from(&BLACK).stroke_width(1),
                ))
                .map_err(plot_err)?;
        }
        if x.contains(&0.0) {
            chart
                .draw_series(LineSeries::new(
                    [(0.0, y.start), (0.0, y.end)],
                    ShapeStyle::from(&BLACK).stroke_width(1),
                ))
                .map_err(plot_err)?;
        }
        chart
            .draw_series(LineSeries::new(
                graph.points(),
                ShapeStyle::from(&BLUE).stroke_width(2),
            ))
            .map_err(plot_err)?;
        root.present().map_err(plot_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.png");
        let mut g = GraphSeries::new();
        g.push(0.0, 0.0);
        g.push(0.1, 25.0);
        let bounds = ViewBounds {
            x: (0.0, 0.2),
            y: (-5.0, 30.0),
        };
        PngChart::default().render_png(&path, &g, bounds).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[test]
    fn degenerate_ranges_are_widened() {
        assert_eq!(span((2.0, 2.0)), 1.5..2.5);
        assert_eq!(span((3.0, 1.0)), 1.0..3.0);
    }
}
