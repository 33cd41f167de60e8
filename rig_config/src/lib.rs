#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Config schema and calibration parsing for the test rig.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Calibration CSV loader enforces headers and performs a robust refit
//!   to reduce outlier influence before the slope estimate.
use serde::Deserialize;
use std::path::PathBuf;

/// Calibration CSV schema.
///
/// Expected headers:
/// volts,force
///
/// Example:
/// volts,force
/// 0.0125,0.0
/// 0.5125,100.0
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationRow {
    pub volts: f64,
    pub force: f64,
}

/// Names of the DAQ resources. Informational for the simulated backend.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DaqCfg {
    pub device: String,
    pub ai_channel: String,
    pub step_counter: String,
    pub dir_line: String,
    pub en_line: String,
    /// Analog input range in volts.
    pub ai_min_volts: f64,
    pub ai_max_volts: f64,
    /// Driver enable input is active-low (EN low = driver energized).
    pub enable_active_low: bool,
    /// Pi backend pin assignment.
    pub pins: Option<Pins>,
}

impl Default for DaqCfg {
    fn default() -> Self {
        Self {
            device: "myDAQ1".into(),
            ai_channel: "ai0".into(),
            step_counter: "Ctr0".into(),
            dir_line: "port0/line0".into(),
            en_line: "port0/line7".into(),
            ai_min_volts: -10.0,
            ai_max_volts: 10.0,
            enable_active_low: true,
            pins: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Pins {
    pub motor_dir: u8,
    pub motor_en: u8,
    /// Hardware PWM channel (0 or 1) carrying STEP pulses
    pub pwm_channel: u8,
    /// MCP3208 input channel
    pub adc_channel: u8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ForceCfg {
    /// Amplifier full-scale output (V)
    pub v_full_scale: f64,
    /// Load-cell rating at full scale (lb)
    pub load_full_scale: f64,
    /// Multiplicative calibration factor
    pub cal_factor: f64,
    /// Samples averaged per re-zero
    pub zero_samples: usize,
    /// Pause between re-zero samples (ms); 0 reads back-to-back
    pub zero_spacing_ms: u64,
    /// Moving-average window applied before conversion; 1 disables smoothing
    pub ma_window: usize,
}

impl Default for ForceCfg {
    fn default() -> Self {
        Self {
            v_full_scale: 10.0,
            load_full_scale: 1000.0,
            cal_factor: 2.0,
            zero_samples: 50,
            zero_spacing_ms: 0,
            ma_window: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MechanicsCfg {
    pub motor_full_steps: u32,
    pub microstep: u32,
    pub gear_ratio: f64,
    pub pulley_ratio: f64,
    pub screw_pitch_mm: f64,
}

impl Default for MechanicsCfg {
    fn default() -> Self {
        Self {
            motor_full_steps: 200,
            microstep: 8,
            gear_ratio: 15.0,
            pulley_ratio: 34.0 / 24.0,
            screw_pitch_mm: 5.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct JogCfg {
    pub fast_hz: f64,
    pub slow_hz: f64,
    pub duty_cycle: f64,
}

impl Default for JogCfg {
    fn default() -> Self {
        Self {
            fast_hz: 8000.0,
            slow_hz: 1200.0,
            duty_cycle: 0.5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingCfg {
    /// Nominal tick period (ms)
    pub interval_ms: u64,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self { interval_ms: 100 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AxisModeCfg {
    #[default]
    AutoXy,
    FixedXy,
    AutoXFixedY,
    FixedXAutoY,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GraphCfg {
    pub axis_mode: AxisModeCfg,
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    /// Trim the graph series once it exceeds this many points (0 = never)
    pub max_points: usize,
    /// Points kept after a trim
    pub keep_points: usize,
}

impl Default for GraphCfg {
    fn default() -> Self {
        Self {
            axis_mode: AxisModeCfg::AutoXy,
            xmin: 0.0,
            xmax: 1.0,
            ymin: 0.0,
            ymax: 100.0,
            max_points: 0,
            keep_points: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExportCfg {
    /// Export directory; defaults to the user's desktop
    pub dir: Option<PathBuf>,
    pub csv: bool,
    pub png: bool,
}

impl Default for ExportCfg {
    fn default() -> Self {
        Self {
            dir: None,
            csv: true,
            png: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One thread drains input, ticks, and presents
    #[default]
    Cooperative,
    /// Jog worker thread plus sampling thread
    Threaded,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    pub mode: RunMode,
    /// Bounded wait for the jog worker at shutdown (ms)
    pub join_timeout_ms: u64,
    /// Jog worker input poll period (ms)
    pub jog_poll_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            mode: RunMode::Cooperative,
            join_timeout_ms: 2000,
            jog_poll_ms: 10,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Calibration persisted from a previous `rig calibrate` run.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PersistedCalibration {
    pub cal_factor: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub daq: DaqCfg,
    pub force: ForceCfg,
    pub mechanics: MechanicsCfg,
    pub jog: JogCfg,
    pub sampling: SamplingCfg,
    pub graph: GraphCfg,
    pub export: ExportCfg,
    pub runner: RunnerCfg,
    pub logging: Logging,
    /// Preferred at runtime over `force.cal_factor` when present.
    pub calibration: Option<PersistedCalibration>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Default export directory: `~/Desktop`, else the working directory.
pub fn default_export_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join("Desktop"))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    pub fn effective_cal_factor(&self) -> f64 {
        self.calibration
            .map_or(self.force.cal_factor, |c| c.cal_factor)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export.dir.clone().unwrap_or_else(default_export_dir)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Force channel
        if !(self.force.v_full_scale.is_finite() && self.force.v_full_scale > 0.0) {
            eyre::bail!("force.v_full_scale must be > 0");
        }
        if !(self.force.load_full_scale.is_finite() && self.force.load_full_scale > 0.0) {
            eyre::bail!("force.load_full_scale must be > 0");
        }
        let cal = self.effective_cal_factor();
        if !cal.is_finite() || cal == 0.0 {
            eyre::bail!("calibration factor must be finite and non-zero");
        }
        if self.force.zero_samples == 0 {
            eyre::bail!("force.zero_samples must be >= 1");
        }
        if self.force.zero_samples > 10_000 {
            eyre::bail!("force.zero_samples is unreasonably large (>10000)");
        }
        if self.force.ma_window == 0 {
            eyre::bail!("force.ma_window must be >= 1");
        }

        // Mechanics
        if self.mechanics.motor_full_steps == 0 {
            eyre::bail!("mechanics.motor_full_steps must be > 0");
        }
        if self.mechanics.microstep == 0 {
            eyre::bail!("mechanics.microstep must be > 0");
        }
        for (name, v) in [
            ("mechanics.gear_ratio", self.mechanics.gear_ratio),
            ("mechanics.pulley_ratio", self.mechanics.pulley_ratio),
            ("mechanics.screw_pitch_mm", self.mechanics.screw_pitch_mm),
        ] {
            if !(v.is_finite() && v > 0.0) {
                eyre::bail!("{name} must be > 0");
            }
        }

        // Jog
        if !(self.jog.fast_hz.is_finite() && self.jog.fast_hz > 0.0) {
            eyre::bail!("jog.fast_hz must be > 0");
        }
        if !(self.jog.slow_hz.is_finite() && self.jog.slow_hz > 0.0) {
            eyre::bail!("jog.slow_hz must be > 0");
        }
        if !(self.jog.duty_cycle > 0.0 && self.jog.duty_cycle < 1.0) {
            eyre::bail!("jog.duty_cycle must be in (0.0, 1.0)");
        }

        // Sampling
        if self.sampling.interval_ms == 0 {
            eyre::bail!("sampling.interval_ms must be >= 1");
        }
        if self.sampling.interval_ms > 60_000 {
            eyre::bail!("sampling.interval_ms is unreasonably large (>60s)");
        }

        // Graph
        for (name, v) in [
            ("graph.xmin", self.graph.xmin),
            ("graph.xmax", self.graph.xmax),
            ("graph.ymin", self.graph.ymin),
            ("graph.ymax", self.graph.ymax),
        ] {
            if !v.is_finite() {
                eyre::bail!("{name} must be finite");
            }
        }
        if self.graph.max_points > 0 {
            if self.graph.keep_points == 0 {
                eyre::bail!("graph.keep_points must be >= 1 when graph.max_points is set");
            }
            if self.graph.keep_points >= self.graph.max_points {
                eyre::bail!("graph.keep_points must be < graph.max_points");
            }
        }

        // DAQ
        if self.daq.ai_min_volts >= self.daq.ai_max_volts {
            eyre::bail!("daq.ai_min_volts must be < daq.ai_max_volts");
        }

        // Runner
        if self.runner.join_timeout_ms == 0 {
            eyre::bail!("runner.join_timeout_ms must be >= 1");
        }
        if self.runner.jog_poll_ms == 0 {
            eyre::bail!("runner.jog_poll_ms must be >= 1");
        }

        Ok(())
    }
}

/// Result of fitting a calibration CSV.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    /// Force units per volt
    pub slope: f64,
    /// Volts at zero force
    pub zero_volts: f64,
}

impl Calibration {
    /// Build from calibration rows using ordinary least squares on all points,
    /// then one refit with |residual| > 2σ points rejected.
    pub fn from_rows(rows: &[CalibrationRow]) -> eyre::Result<Self> {
        if rows.len() < 2 {
            eyre::bail!("calibration requires at least two rows, got {}", rows.len());
        }
        if rows.iter().any(|r| !(r.volts.is_finite() && r.force.is_finite())) {
            eyre::bail!("calibration rows must be finite numbers");
        }

        let pts: Vec<(f64, f64)> = rows.iter().map(|r| (r.volts, r.force)).collect();
        let (a0, b0) = fit(&pts)?;
        let sumsq: f64 = pts
            .iter()
            .map(|(x, y)| {
                let r = y - (a0 * x + b0);
                r * r
            })
            .sum();
        let rms = (sumsq / pts.len() as f64).sqrt();

        let (a, b) = robust_refit(&pts, a0, b0, rms, 2.0).unwrap_or((a0, b0));
        let zero_volts = -b / a;
        if !zero_volts.is_finite() {
            eyre::bail!("calibration produced invalid zero point");
        }
        Ok(Self {
            slope: a,
            zero_volts,
        })
    }

    /// Express the slope as the multiplicative factor on the nominal
    /// `(v / v_full_scale) * load_full_scale` conversion.
    pub fn cal_factor(&self, v_full_scale: f64, load_full_scale: f64) -> f64 {
        self.slope * v_full_scale / load_full_scale
    }
}

fn fit(pts: &[(f64, f64)]) -> eyre::Result<(f64, f64)> {
    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let mut sxx = 0.0f64;
    let mut sxy = 0.0f64;
    for (x, y) in pts {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if !sxx.is_finite() || sxx == 0.0 {
        eyre::bail!("calibration cannot determine slope (degenerate volts variance)");
    }
    let a = sxy / sxx;
    if !a.is_finite() || a == 0.0 {
        eyre::bail!("calibration produced zero or non-finite slope");
    }
    Ok((a, mean_y - a * mean_x))
}

/// Single-step robust refit rejecting |residual| > k * rms around the initial
/// line. Returns None when no refit applies (nothing rejected, < 2 inliers,
/// degenerate variance), in which case the caller keeps the original fit.
fn robust_refit(pts: &[(f64, f64)], a0: f64, b0: f64, rms: f64, k: f64) -> Option<(f64, f64)> {
    if !(rms.is_finite() && rms > 0.0) {
        return None;
    }
    let thr = k * rms;
    let inliers: Vec<(f64, f64)> = pts
        .iter()
        .copied()
        .filter(|(x, y)| (y - (a0 * x + b0)).abs() <= thr)
        .collect();
    if inliers.len() < 2 || inliers.len() == pts.len() {
        return None;
    }
    fit(&inliers).ok()
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<Calibration> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["volts", "force"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'volts,force', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }

    Calibration::from_rows(&rows)
}
