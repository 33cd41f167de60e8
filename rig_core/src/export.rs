//! CSV and chart export of a finished test.

use crate::error::RigError;
use crate::graph::{GraphSeries, ViewBounds};
use crate::recorder::TestRecorder;
use rig_traits::BoxError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub dir: PathBuf,
    pub csv: bool,
    pub png: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            csv: true,
            png: true,
        }
    }
}

/// Renders the live graph to an image file.
pub trait ChartRenderer {
    fn render_png(
        &mut self,
        path: &Path,
        graph: &GraphSeries,
        bounds: ViewBounds,
    ) -> Result<(), BoxError>;
}

/// Outcome per artifact. `None` means the artifact was disabled or had no renderer.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub csv: Option<Result<PathBuf, RigError>>,
    pub png: Option<Result<PathBuf, RigError>>,
}

impl ExportReport {
    pub fn written(&self) -> Vec<&Path> {
        [&self.csv, &self.png]
            .into_iter()
            .filter_map(|r| r.as_ref().and_then(|r| r.as_ref().ok()))
            .map(PathBuf::as_path)
            .collect()
    }

    pub fn failures(&self) -> Vec<&RigError> {
        [&self.csv, &self.png]
            .into_iter()
            .filter_map(|r| r.as_ref().and_then(|r| r.as_ref().err()))
            .collect()
    }
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn csv_file_name(ts: u64) -> String {
    format!("test_data_{ts}.csv")
}

pub fn png_file_name(ts: u64) -> String {
    format!("test_graph_{ts}.png")
}

/// Serialize the recording as `time,travel,force` rows.
pub fn csv_bytes(recorder: &TestRecorder) -> Result<Vec<u8>, RigError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    let io = |e: csv::Error| RigError::Io(e.to_string());
    wtr.write_record(["time", "travel", "force"]).map_err(io)?;
    for s in recorder.samples() {
        wtr.write_record([s.time.to_string(), s.travel.to_string(), s.force.to_string()])
            .map_err(io)?;
    }
    wtr.into_inner().map_err(|e| RigError::Io(e.to_string()))
}

/// Write via a sibling temp file and rename, so a failed export never leaves a torn file.
fn write_replace(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("csv.part");
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp);
    })
}

pub fn write_csv(path: &Path, recorder: &TestRecorder) -> Result<(), RigError> {
    let bytes = csv_bytes(recorder)?;
    write_replace(path, &bytes)
        .map_err(|e| RigError::Io(format!("{}: {e}", path.display())))
}

/// Export the recording and the graph. Each artifact succeeds or fails on its own.
///
/// An empty recording exports nothing and returns `NoData`.
pub fn export_results(
    recorder: &TestRecorder,
    graph: &GraphSeries,
    bounds: ViewBounds,
    settings: &ExportSettings,
    renderer: Option<&mut (dyn ChartRenderer + '_)>,
    ts: u64,
) -> Result<ExportReport, RigError> {
    if recorder.is_empty() {
        return Err(RigError::NoData("no test data to export".into()));
    }
    let mut report = ExportReport::default();
    if settings.csv {
        let path = settings.dir.join(csv_file_name(ts));
        let res = write_csv(&path, recorder).map(|()| path);
        match &res {
            Ok(p) => tracing::info!(path = %p.display(), rows = recorder.len(), "csv exported"),
            Err(e) => tracing::error!(error = %e, "csv export failed"),
        }
        report.csv = Some(res);
    }
    if settings.png
        && let Some(r) = renderer
    {
        let path = settings.dir.join(png_file_name(ts));
        let res = r
            .render_png(&path, graph, bounds)
            .map(|()| path)
            .map_err(|e| RigError::Io(e.to_string()));
        match &res {
            Ok(p) => tracing::info!(path = %p.display(), "chart exported"),
            Err(e) => tracing::error!(error = %e, "chart export failed"),
        }
        report.png = Some(res);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn csv_has_header_and_rows() {
        let t0 = Instant::now();
        let mut r = TestRecorder::new();
        r.start(t0);
        r.record(t0 + Duration::from_millis(100), 0.25, -3.5);
        let text = String::from_utf8(csv_bytes(&r).unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("time,travel,force"));
        assert_eq!(lines.next(), Some("0.1,0.25,-3.5"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn file_names_carry_timestamp() {
        assert_eq!(csv_file_name(42), "test_data_42.csv");
        assert_eq!(png_file_name(42), "test_graph_42.png");
    }
}
