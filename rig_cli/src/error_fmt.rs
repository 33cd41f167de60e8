//! Human-readable error descriptions and structured JSON error formatting.

use rig_core::{BuildError, RigError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingAnalog => {
                "What happened: No analog input was provided to the rig.\nLikely causes: The DAQ failed to initialize or was not wired into the builder.\nHow to fix: Check [daq] in the config and that the device is connected.".to_string()
            }
            BuildError::MissingMotor => {
                "What happened: No motor lines were provided to the rig.\nLikely causes: The motor driver lines failed to initialize.\nHow to fix: Check [daq] dir_line/en_line (or [daq.pins]) and permissions.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/rig_config.toml for a sample."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<RigError>() {
        return match re {
            RigError::Sensor(m) => format!(
                "What happened: The force channel could not be read ({m}).\nLikely causes: DAQ disconnected, wrong channel, or amplifier unpowered.\nHow to fix: Check the load-cell wiring and [daq] ai_channel, then restart."
            ),
            RigError::Hardware(m) => format!(
                "What happened: A motor line command failed ({m}).\nLikely causes: Step counter in use by another program or driver lines misconfigured.\nHow to fix: Close other DAQ programs and check [daq] step_counter/dir_line/en_line."
            ),
            RigError::Config(m) => format!(
                "What happened: Configuration is invalid ({m}).\nHow to fix: Edit the TOML config and try again."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'volts,force'.".to_string();
    }

    if lower.contains("failed to read config") || lower.contains("failed to parse config") {
        return format!(
            "What happened: The config file could not be loaded.\nHow to fix: Pass --config <FILE> pointing at a valid TOML file. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration") || lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid or incomplete ({msg}).\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Configuration problems return 2, sensor failures 3, hardware failures 4, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<RigError>() {
        Some(RigError::Config(_)) => 2,
        Some(RigError::Sensor(_)) => 3,
        Some(RigError::Hardware(_)) => 4,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    match err.downcast_ref::<RigError>() {
        Some(RigError::Sensor(_)) => "Sensor",
        Some(RigError::Hardware(_)) => "Hardware",
        Some(RigError::Config(_)) => "Config",
        Some(RigError::InvalidInput(_)) => "InvalidInput",
        Some(RigError::NoData(_)) => "NoData",
        Some(RigError::Io(_)) => "Io",
        Some(RigError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "event": "error",
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RigError::Sensor("x".into()), 3, "Sensor")]
    #[case(RigError::Hardware("x".into()), 4, "Hardware")]
    #[case(RigError::Config("x".into()), 2, "Config")]
    #[case(RigError::Io("x".into()), 1, "Io")]
    fn typed_errors_map_to_codes(#[case] e: RigError, #[case] code: i32, #[case] reason: &str) {
        let r = eyre::Report::new(e).wrap_err("context");
        assert_eq!(exit_code_for_error(&r), code);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&r)).unwrap();
        assert_eq!(v["reason"], reason);
        assert_eq!(v["exit_code"], code);
    }

    #[test]
    fn build_errors_are_config_errors() {
        let r = eyre::Report::new(BuildError::InvalidConfig("bad"));
        assert_eq!(exit_code_for_error(&r), 2);
        assert!(humanize(&r).contains("bad"));
    }
}
