//! Export artifacts: CSV content and independent per-artifact outcomes.

use rig_core::export::{self, ChartRenderer, ExportSettings};
use rig_core::graph::{GraphSeries, ViewBounds};
use rig_core::recorder::TestRecorder;
use rig_core::RigError;
use rig_traits::BoxError;
use std::path::Path;
use std::time::{Duration, Instant};

struct FileChart;

impl ChartRenderer for FileChart {
    fn render_png(
        &mut self,
        path: &Path,
        graph: &GraphSeries,
        _bounds: ViewBounds,
    ) -> Result<(), BoxError> {
        std::fs::write(path, format!("{} points", graph.len()))?;
        Ok(())
    }
}

struct BrokenChart;

impl ChartRenderer for BrokenChart {
    fn render_png(&mut self, _: &Path, _: &GraphSeries, _: ViewBounds) -> Result<(), BoxError> {
        Err("no backend".into())
    }
}

fn recording() -> (TestRecorder, GraphSeries) {
    let t0 = Instant::now();
    let mut rec = TestRecorder::new();
    let mut graph = GraphSeries::new();
    rec.start(t0);
    for i in 0..4u32 {
        let travel = f64::from(i) * 0.01;
        let force = f64::from(i) * -2.5;
        rec.record(t0 + Duration::from_millis(u64::from(i) * 100), travel, force);
        graph.push(travel, force);
    }
    rec.stop().unwrap();
    (rec, graph)
}

const BOUNDS: ViewBounds = ViewBounds {
    x: (0.0, 1.0),
    y: (0.0, 1.0),
};

#[test]
fn csv_reads_back_with_header() {
    let dir = tempfile::tempdir().unwrap();
    let (rec, graph) = recording();
    let settings = ExportSettings {
        dir: dir.path().to_path_buf(),
        csv: true,
        png: false,
    };
    let report = export::export_results(&rec, &graph, BOUNDS, &settings, None, 1_700_000_000).unwrap();
    let path = report.csv.unwrap().unwrap();
    assert_eq!(path, dir.path().join("test_data_1700000000.csv"));

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    assert_eq!(
        rdr.headers().unwrap(),
        &csv::StringRecord::from(vec!["time", "travel", "force"])
    );
    let rows: Vec<(f64, f64, f64)> = rdr
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].parse().unwrap(), r[1].parse().unwrap(), r[2].parse().unwrap())
        })
        .collect();
    let expected: Vec<_> = rec.samples().map(|s| (s.time, s.travel, s.force)).collect();
    assert_eq!(rows, expected);
    assert!(report.png.is_none());
}

#[test]
fn chart_failure_does_not_block_csv() {
    let dir = tempfile::tempdir().unwrap();
    let (rec, graph) = recording();
    let settings = ExportSettings {
        dir: dir.path().to_path_buf(),
        csv: true,
        png: true,
    };
    let mut chart = BrokenChart;
    let report = export::export_results(
        &rec,
        &graph,
        BOUNDS,
        &settings,
        Some(&mut chart as &mut dyn ChartRenderer),
        7,
    )
    .unwrap();
    assert!(report.csv.as_ref().unwrap().is_ok());
    assert!(matches!(report.png, Some(Err(RigError::Io(_)))));
    assert_eq!(report.written().len(), 1);
    assert_eq!(report.failures().len(), 1);
}

#[test]
fn unwritable_dir_fails_csv_only() {
    let dir = tempfile::tempdir().unwrap();
    let (rec, graph) = recording();
    let settings = ExportSettings {
        dir: dir.path().join("missing"),
        csv: true,
        png: true,
    };
    std::fs::create_dir(dir.path().join("charts")).unwrap();
    struct ElsewhereChart(std::path::PathBuf);
    impl ChartRenderer for ElsewhereChart {
        fn render_png(&mut self, _: &Path, g: &GraphSeries, b: ViewBounds) -> Result<(), BoxError> {
            FileChart.render_png(&self.0, g, b)
        }
    }
    let mut chart = ElsewhereChart(dir.path().join("charts").join("g.png"));
    let report = export::export_results(
        &rec,
        &graph,
        BOUNDS,
        &settings,
        Some(&mut chart as &mut dyn ChartRenderer),
        7,
    )
    .unwrap();
    assert!(matches!(report.csv, Some(Err(RigError::Io(_)))));
    assert!(report.png.as_ref().unwrap().is_ok());
}

#[test]
fn empty_recording_is_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let settings = ExportSettings {
        dir: dir.path().to_path_buf(),
        ..ExportSettings::default()
    };
    let mut chart = FileChart;
    let err = export::export_results(
        &TestRecorder::new(),
        &GraphSeries::new(),
        BOUNDS,
        &settings,
        Some(&mut chart as &mut dyn ChartRenderer),
        1,
    )
    .unwrap_err();
    assert!(matches!(err, RigError::NoData(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
