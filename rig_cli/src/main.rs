mod chart;
mod cli;
mod console;
mod error_fmt;
mod keys;
mod run;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use eyre::WrapErr;
use rig_core::{RigError, Signal};
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn config_error(e: &eyre::Report) -> eyre::Report {
    eyre::Report::new(RigError::Config(format!("{e:#}")))
}

fn load_config(path: &Path) -> eyre::Result<rig_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))
        .map_err(|e| config_error(&e))?;
    let cfg = rig_config::load_toml(&text)
        .map_err(|e| eyre::eyre!("parse config {}: {e}", path.display()))
        .map_err(|e| config_error(&e))?;
    cfg.validate().map_err(|e| config_error(&e))?;
    Ok(cfg)
}

/// `--log-level` wins over `[logging] level`, which wins over `info`.
fn log_level<'a>(cli: Option<&'a str>, cfg: Option<&'a str>) -> &'a str {
    cli.or(cfg).unwrap_or("info")
}

fn init_tracing(cfg: &rig_config::Config, cli_level: Option<&str>, json: bool) -> eyre::Result<()> {
    let level = log_level(cli_level, cfg.logging.level.as_deref());
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    // Console logs go to stderr so stdout stays a clean JSON or status stream.
    let stderr_layer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file_layer = match &cfg.logging.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "rig.log".to_string());
            let appender = match cfg.logging.rotation.as_deref() {
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre::eyre!("install tracing subscriber: {e}"))
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    let mut cfg = load_config(&cli.config)?;
    if let Some(path) = &cli.calibration {
        let fit = rig_config::load_calibration_csv(path)?;
        let factor = fit.cal_factor(cfg.force.v_full_scale, cfg.force.load_full_scale);
        cfg.calibration = Some(rig_config::PersistedCalibration { cal_factor: factor });
    }

    init_tracing(&cfg, cli.log_level.as_deref(), cli.json)?;
    tracing::info!(config = %cli.config.display(), backend = run::backend_name(), "rig starting");

    let shutdown = Signal::new();
    {
        let s = shutdown.clone();
        ctrlc::set_handler(move || s.raise()).wrap_err("install Ctrl-C handler")?;
    }

    match cli.cmd {
        Commands::Run {
            threaded,
            no_keys,
            ticks,
            export_dir,
            record,
        } => {
            let opts = run::RunOpts {
                threaded,
                no_keys,
                ticks,
                export_dir,
                record,
            };
            run::run_station(&cfg, &opts, cli.json, shutdown)?;
        }
        Commands::Jog => run::run_jog(&cfg, shutdown)?,
        Commands::Calibrate { csv } => run::calibrate(&cfg, &csv, cli.json)?,
        Commands::SelfCheck => run::self_check(&cfg, cli.json)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::log_level;
    use rstest::rstest;

    #[rstest]
    #[case(Some("debug"), Some("warn"), "debug")]
    #[case(None, Some("warn"), "warn")]
    #[case(None, None, "info")]
    #[case(Some("trace"), None, "trace")]
    fn flag_beats_config_level(
        #[case] cli: Option<&str>,
        #[case] cfg: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(log_level(cli, cfg), expected);
    }
}
