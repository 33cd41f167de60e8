use rig_config::{AxisModeCfg, RunMode, load_toml};
use rstest::rstest;

const FULL: &str = r#"
[daq]
device = "myDAQ1"
ai_channel = "ai0"
enable_active_low = true

[force]
v_full_scale = 10.0
load_full_scale = 1000.0
cal_factor = 2.0
zero_samples = 50
ma_window = 5

[mechanics]
motor_full_steps = 200
microstep = 8
gear_ratio = 15
pulley_ratio = 1.4166666666666667
screw_pitch_mm = 5.0

[jog]
fast_hz = 8000
slow_hz = 1200
duty_cycle = 0.5

[sampling]
interval_ms = 50

[graph]
axis_mode = "auto_x_fixed_y"
ymin = -10.0
ymax = 250.0
max_points = 5000
keep_points = 2000

[export]
dir = "/tmp/rig-exports"
csv = true
png = false

[runner]
mode = "threaded"
join_timeout_ms = 2000
"#;

#[test]
fn accepts_full_config() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.runner.mode, RunMode::Threaded);
    assert_eq!(cfg.graph.axis_mode, AxisModeCfg::AutoXFixedY);
    assert_eq!(cfg.force.ma_window, 5);
    assert!(!cfg.export.png);
    assert_eq!(cfg.export_dir(), std::path::PathBuf::from("/tmp/rig-exports"));
}

#[rstest]
#[case("[sampling]\ninterval_ms = 0\n", "sampling.interval_ms must be >= 1")]
#[case("[force]\nzero_samples = 0\n", "force.zero_samples must be >= 1")]
#[case("[force]\nv_full_scale = 0.0\n", "force.v_full_scale must be > 0")]
#[case("[force]\ncal_factor = 0.0\n", "calibration factor must be finite and non-zero")]
#[case("[force]\nma_window = 0\n", "force.ma_window must be >= 1")]
#[case("[mechanics]\nmicrostep = 0\n", "mechanics.microstep must be > 0")]
#[case("[mechanics]\nscrew_pitch_mm = -5.0\n", "mechanics.screw_pitch_mm must be > 0")]
#[case("[jog]\nslow_hz = 0.0\n", "jog.slow_hz must be > 0")]
#[case("[jog]\nduty_cycle = 1.0\n", "jog.duty_cycle must be in (0.0, 1.0)")]
#[case("[graph]\nmax_points = 100\nkeep_points = 100\n", "graph.keep_points must be < graph.max_points")]
#[case("[graph]\nmax_points = 100\nkeep_points = 0\n", "graph.keep_points must be >= 1")]
#[case("[daq]\nai_min_volts = 5.0\nai_max_volts = 5.0\n", "daq.ai_min_volts must be < daq.ai_max_volts")]
#[case("[runner]\njoin_timeout_ms = 0\n", "runner.join_timeout_ms must be >= 1")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] msg: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(format!("{err}").contains(msg), "got: {err}");
}

#[rstest]
#[case("[graph]\naxis_mode = \"sideways\"\n")]
#[case("[runner]\nmode = \"async\"\n")]
#[case("[sampling]\ninterval_ms = \"fast\"\n")]
fn rejects_unknown_enum_values_at_parse(#[case] toml: &str) {
    assert!(load_toml(toml).is_err());
}

#[test]
fn pins_section_is_optional() {
    let cfg = load_toml("[daq.pins]\nmotor_dir = 17\nmotor_en = 27\npwm_channel = 0\nadc_channel = 0\n")
        .expect("parse TOML");
    let pins = cfg.daq.pins.expect("pins present");
    assert_eq!(pins.motor_dir, 17);
    assert!(load_toml("").unwrap().daq.pins.is_none());
}
