//! Hardware assembly and the `run`, `jog`, `self-check`, and `calibrate` commands.

use crate::chart::PngChart;
use crate::console::ConsolePresenter;
use crate::keys::KeyReader;
use crossbeam_channel as xch;
use eyre::WrapErr;
use rig_core::motion::{self, MotionEstimator};
use rig_core::{
    ChartRenderer, ExitReason, JogController, Mechanics, OperatorEvent, Rig, RigError,
    RunMode, RunParams, RunSummary, Signal,
};
use rig_traits::{AnalogInput, MotorLines};
use serde_json::json;
use std::path::PathBuf;

pub type AnalogBox = Box<dyn AnalogInput + Send>;
pub type MotorBox = Box<dyn MotorLines + Send>;

#[derive(Debug, Clone, Default)]
pub struct RunOpts {
    pub threaded: bool,
    pub no_keys: bool,
    pub ticks: Option<u64>,
    pub export_dir: Option<PathBuf>,
    pub record: bool,
}

pub fn backend_name() -> &'static str {
    if cfg!(feature = "hardware") { "hardware" } else { "sim" }
}

/// Open the analog input and motor lines for the compiled-in backend.
#[cfg(not(feature = "hardware"))]
pub fn open_backend(cfg: &rig_config::Config) -> eyre::Result<(AnalogBox, MotorBox)> {
    use rig_hardware::{SimBench, SimOptions};
    let opts = SimOptions {
        enable_active_low: cfg.daq.enable_active_low,
        travel_in_per_pulse: Mechanics::from(&cfg.mechanics).travel_per_pulse_in(),
        ..SimOptions::default()
    };
    let bench = SimBench::new(opts);
    // Test hook: inject a sensor fault after N reads.
    if let Ok(v) = std::env::var("RIG_SIM_FAIL_READS_AFTER") {
        let n: u64 = v
            .parse()
            .wrap_err("RIG_SIM_FAIL_READS_AFTER must be an integer")?;
        bench.fail_reads_after(n);
    }
    let (analog, motor) = bench.split();
    tracing::info!(device = %cfg.daq.device, "using simulated bench");
    Ok((Box::new(analog), Box::new(motor)))
}

#[cfg(feature = "hardware")]
pub fn open_backend(cfg: &rig_config::Config) -> eyre::Result<(AnalogBox, MotorBox)> {
    use rig_hardware::pi::{PiAnalog, PiMotorLines};
    let pins = cfg.daq.pins.as_ref().ok_or_else(|| {
        RigError::Config("[daq.pins] is required for the hardware backend".into())
    })?;
    let analog = PiAnalog::new(pins.adc_channel, cfg.daq.ai_min_volts, cfg.daq.ai_max_volts)
        .wrap_err("open analog input")?;
    let motor = PiMotorLines::new(
        pins.motor_dir,
        pins.motor_en,
        pins.pwm_channel,
        cfg.daq.enable_active_low,
    )
        .wrap_err("open motor lines")?;
    tracing::info!(
        adc_channel = pins.adc_channel,
        motor_dir = pins.motor_dir,
        motor_en = pins.motor_en,
        pwm_channel = pins.pwm_channel,
        "hardware backend ready"
    );
    Ok((Box::new(analog), Box::new(motor)))
}

pub fn run_station(
    cfg: &rig_config::Config,
    opts: &RunOpts,
    json: bool,
    shutdown: Signal,
) -> eyre::Result<RunSummary> {
    let (analog, motor) = open_backend(cfg)?;
    let mut rig: Rig<AnalogBox, MotorBox> = Rig::builder()
        .with_config(cfg)
        .with_analog(analog)
        .with_motor(motor)
        .build()?;
    if let Some(dir) = &opts.export_dir {
        rig.station.set_export_dir(dir.clone());
    }
    let export_dir = &rig.station.export_settings().dir;
    if let Err(e) = std::fs::create_dir_all(export_dir) {
        tracing::warn!(dir = %export_dir.display(), error = %e, "cannot create export directory");
    }
    let zero = rig.startup().wrap_err("startup re-zero")?;
    tracing::info!(zero_offset_volts = zero, "rig ready");

    let mut params = RunParams::from(&cfg.runner);
    if opts.threaded {
        params.mode = RunMode::Threaded;
    }
    params.max_ticks = opts.ticks;

    let (tx, rx) = xch::unbounded();
    if opts.record {
        tx.send(OperatorEvent::StartTest)?;
    }
    let keys = if opts.no_keys {
        drop(tx);
        None
    } else {
        Some(KeyReader::spawn(tx, shutdown.clone())?)
    };

    let mut presenter = ConsolePresenter::new(std::io::stdout(), json, 1);
    let mut chart = PngChart::default();
    let (mut station, jog) = rig.into_parts();
    let summary = rig_core::run(
        &mut station,
        jog,
        rx,
        &mut presenter,
        Some(&mut chart as &mut dyn ChartRenderer),
        shutdown,
        params,
    )?;
    drop(keys);

    if opts.record {
        if let Err(e) = station.end_test() {
            tracing::debug!(error = %e, "recording already ended");
        }
        station.handle_event(
            OperatorEvent::Export,
            &mut presenter,
            Some(&mut chart as &mut dyn ChartRenderer),
        );
    }
    if json {
        println!(
            "{}",
            json!({
                "event": "summary",
                "ticks": summary.ticks,
                "exit": exit_name(&summary.exit),
                "worker_joined": summary.worker_joined,
            })
        );
    } else {
        println!("\r\nstopped after {} ticks ({})\r", summary.ticks, exit_name(&summary.exit));
    }
    if let ExitReason::SensorFailure(msg) = &summary.exit {
        return Err(eyre::Report::new(RigError::Sensor(msg.clone())));
    }
    Ok(summary)
}

fn exit_name(e: &ExitReason) -> &'static str {
    match e {
        ExitReason::Shutdown => "shutdown",
        ExitReason::TickLimit => "tick_limit",
        ExitReason::SensorFailure(_) => "sensor_failure",
    }
}

pub fn run_jog(cfg: &rig_config::Config, shutdown: Signal) -> eyre::Result<()> {
    let (mut analog, motor) = open_backend(cfg)?;
    if let Err(e) = analog.close() {
        tracing::debug!(error = %e, "closing unused analog input");
    }
    let mechanics = Mechanics::from(&cfg.mechanics);
    let mut jog = JogController::new(
        motor,
        motion::shared(MotionEstimator::from_mechanics(&mechanics)),
        (&cfg.jog).into(),
        cfg.daq.enable_active_low,
    );
    jog.enable_driver()?;
    let (tx, rx) = xch::unbounded();
    let keys = KeyReader::spawn(tx, shutdown.clone())?;
    let poll = RunParams::from(&cfg.runner).jog_poll;
    rig_core::run_jog_only(jog, rx, shutdown, poll);
    drop(keys);
    Ok(())
}

pub fn self_check(cfg: &rig_config::Config, json: bool) -> eyre::Result<()> {
    let (mut analog, mut motor) = open_backend(cfg)?;
    let volts = analog
        .read_volts()
        .map_err(|e| eyre::Report::new(rig_core::hw_error::map_sensor_error(&*e)))?;
    let _ = analog.close();
    let _ = motor.close();
    if json {
        println!(
            "{}",
            json!({ "event": "self_check", "status": "ok", "backend": backend_name(), "volts": volts })
        );
    } else {
        println!("self-check ok ({}): {volts:.4} V", backend_name());
    }
    Ok(())
}

pub fn calibrate(cfg: &rig_config::Config, csv: &std::path::Path, json: bool) -> eyre::Result<()> {
    let fit = rig_config::load_calibration_csv(csv)?;
    let factor = fit.cal_factor(cfg.force.v_full_scale, cfg.force.load_full_scale);
    tracing::info!(slope = fit.slope, zero_volts = fit.zero_volts, cal_factor = factor, "calibration fitted");
    if json {
        println!(
            "{}",
            json!({
                "event": "calibration",
                "slope": fit.slope,
                "zero_volts": fit.zero_volts,
                "cal_factor": factor,
            })
        );
    } else {
        println!("slope      = {:.6} lb/V", fit.slope);
        println!("zero_volts = {:.6} V", fit.zero_volts);
        println!();
        println!("[calibration]");
        println!("cal_factor = {factor}");
    }
    Ok(())
}
