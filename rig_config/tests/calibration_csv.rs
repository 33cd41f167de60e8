use std::fs::File;
use std::io::Write;

use rig_config::{Calibration, CalibrationRow, load_calibration_csv};
use rstest::rstest;
use tempfile::tempdir;

fn row(volts: f64, force: f64) -> CalibrationRow {
    CalibrationRow { volts, force }
}

#[rstest]
fn calibration_from_rows_two_points() {
    // Exact two-point fit: 0 lb at 0.01 V, 100 lb at 0.51 V
    let c = Calibration::from_rows(&[row(0.01, 0.0), row(0.51, 100.0)]).unwrap();
    assert!((c.slope - 200.0).abs() < 1e-9);
    assert!((c.zero_volts - 0.01).abs() < 1e-12);
}

#[rstest]
#[case(10.0, 1000.0, 200.0, 2.0)]
#[case(10.0, 500.0, 100.0, 2.0)]
#[case(5.0, 1000.0, 185.0, 0.925)]
fn cal_factor_rescales_slope_onto_nominal_conversion(
    #[case] v_full_scale: f64,
    #[case] load_full_scale: f64,
    #[case] slope: f64,
    #[case] expected: f64,
) {
    let c = Calibration {
        slope,
        zero_volts: 0.0,
    };
    assert!((c.cal_factor(v_full_scale, load_full_scale) - expected).abs() < 1e-12);
}

#[rstest]
fn calibration_rejects_single_row() {
    let err = Calibration::from_rows(&[row(0.1, 10.0)]).expect_err("one row is not a line");
    assert!(format!("{err}").contains("at least two rows"));
}

#[rstest]
fn calibration_rejects_constant_volts() {
    let err = Calibration::from_rows(&[row(0.2, 0.0), row(0.2, 50.0), row(0.2, 100.0)])
        .expect_err("no volts variance");
    assert!(format!("{err}").to_lowercase().contains("degenerate"));
}

#[rstest]
fn calibration_horizontal_line_errors() {
    let err = Calibration::from_rows(&[row(0.1, 50.0), row(0.2, 50.0), row(0.3, 50.0)])
        .expect_err("should fail on zero slope");
    assert!(format!("{err}").to_lowercase().contains("zero or non-finite slope"));
}

#[rstest]
fn csv_with_wrong_headers_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad_headers.csv");

    let mut f = File::create(&path).unwrap();
    writeln!(f, "raw,grams").unwrap();
    writeln!(f, "0.1,0.0").unwrap();
    writeln!(f, "0.2,1.0").unwrap();

    let err = load_calibration_csv(&path).expect_err("should error on bad headers");
    assert!(format!("{err}").contains("headers 'volts,force'"));
}

#[rstest]
fn csv_with_non_numeric_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad_numeric.csv");

    let mut f = File::create(&path).unwrap();
    writeln!(f, "volts,force").unwrap();
    writeln!(f, "abc,xyz").unwrap();

    let err = load_calibration_csv(&path).expect_err("should error on non-numeric");
    assert!(format!("{err}").contains("invalid CSV row 2"));
}

#[rstest]
fn csv_round_trip_with_padded_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.csv");

    let mut f = File::create(&path).unwrap();
    writeln!(f, "volts, force").unwrap();
    writeln!(f, "0.0125, 0").unwrap();
    writeln!(f, "0.2625, 50").unwrap();
    writeln!(f, "0.5125, 100").unwrap();

    let c = load_calibration_csv(&path).unwrap();
    assert!((c.slope - 200.0).abs() < 1e-6);
    assert!((c.zero_volts - 0.0125).abs() < 1e-9);
}

#[rstest]
fn calibration_with_noise_and_outliers_recovers_params() {
    // Ground truth: force = 180 * (volts - 0.02)
    let true_slope = 180.0;
    let true_zero = 0.02;
    let mut rows: Vec<CalibrationRow> = (0..50)
        .map(|i| {
            let volts = 0.02 + f64::from(i) * 0.01;
            let noise = (f64::from(i) * 37.0).sin() * 0.05;
            row(volts, true_slope * (volts - true_zero) + noise)
        })
        .collect();
    rows[15].force = 500.0;
    rows[35].force = -500.0;

    let c = Calibration::from_rows(&rows).unwrap();
    let rel_err = (c.slope - true_slope).abs() / true_slope;
    assert!(rel_err <= 0.01, "slope rel err {rel_err}");
    assert!((c.zero_volts - true_zero).abs() < 0.002, "zero {}", c.zero_volts);
}
