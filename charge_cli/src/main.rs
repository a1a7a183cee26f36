mod cli;
mod error_fmt;
mod plan;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{TimeDelta, Utc};
use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::plan::{SimOptions, build_rig, run_plan, run_simulation};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Plan { target } => {
            let report = run_plan(&cfg, &target, Utc::now())?;
            if cli.json {
                println!("{}", report.to_json());
            } else {
                let finish = report
                    .estimated_finish
                    .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
                println!(
                    "target {}% by {}: soc {:.1}%, finish at {} ({} A assumed)",
                    report.target_soc,
                    report.target_time.to_rfc3339(),
                    report.soc,
                    finish,
                    report.start_current_a,
                );
                println!(
                    "{}",
                    if report.charge_required {
                        "charging required now"
                    } else {
                        "no charging required yet"
                    }
                );
            }
        }
        Commands::Simulate {
            target,
            max_ticks,
            realtime,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            if realtime {
                let flag = Arc::clone(&shutdown);
                if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                    tracing::warn!(error = %e, "failed to install ctrl-c handler");
                }
            }
            let opts = SimOptions {
                max_ticks,
                realtime,
                json: cli.json,
            };
            let report = run_simulation(&cfg, &target, Utc::now(), &opts, shutdown)?;
            if cli.json {
                println!("{}", report.to_json());
            } else {
                println!(
                    "simulation complete: {} ticks ({} charging, {} failed), soc {:.1}% of {}% target",
                    report.summary.ticks,
                    report.summary.charging_ticks,
                    report.summary.failed_ticks,
                    report.final_soc,
                    report.target_soc,
                );
            }
        }
        Commands::SelfCheck => {
            let now = Utc::now();
            let mut rig = build_rig(&cfg, now)?;
            if !rig.scheduler.supported() {
                eyre::bail!(charge_core::ChargeError::Unsupported);
            }
            let mut req = charge_core::TargetChargeRequest::default();
            rig.scheduler
                .set_target(&mut req, 100, now + TimeDelta::days(1))?;
            rig.scheduler.start_required(&mut req)?;
            tracing::info!(finish = ?req.estimated_finish(), "self-check estimate");
            println!("OK");
        }
        Commands::Health => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "ok",
                        "version": env!("CARGO_PKG_VERSION"),
                        "loadpoint": {
                            "min_current": cfg.loadpoint.min_current,
                            "max_current": cfg.loadpoint.max_current,
                            "phases": cfg.loadpoint.phases,
                        },
                    })
                );
            } else {
                println!("healthy");
            }
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<charge_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = charge_config::load_toml(&text).wrap_err("parse config TOML")?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// `--log-level`, then `logging.level`, then "info".
fn effective_level<'a>(cli_level: Option<&'a str>, cfg_level: Option<&'a str>) -> &'a str {
    cli_level.or(cfg_level).unwrap_or("info")
}

/// Console logs go to stderr; an optional JSON file sink follows `[logging]`.
fn init_tracing(json: bool, cli_level: Option<&str>, logging: &charge_config::Logging) -> Result<()> {
    let level = effective_level(cli_level, logging.level.as_deref());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_target(false).with_writer(std::io::stderr).boxed()
    };

    let file_layer = match &logging.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .map_or_else(|| "charge.log".into(), |n| n.to_string_lossy().into_owned());
            std::fs::create_dir_all(dir).wrap_err_with(|| format!("create log dir {}", dir.display()))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .ok();
    Ok(())
}
