mod cli;
mod cover;
mod error_fmt;

use clap::Parser;
use cli::{Cli, FILE_GUARD, JSON_MODE, json_mode};
use error_fmt::{INVALID_CONFIG, exit_code_for_error, format_error_json, humanize};
use eyre::{Result, WrapErr};
use std::path::Path;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(&cli) {
        if json_mode() {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: &Cli) -> Result<()> {
    let loaded = load_config(&cli.config);
    init_tracing(cli, loaded.as_ref().ok().map(|c| &c.logging))?;
    let cfg = loaded?;

    let Some(cover_id) = cli.cmd.cover() else {
        return cover::check_config(&cfg);
    };
    cfg.validate().wrap_err(INVALID_CONFIG)?;

    let snapshot = cover::run_cover_command(&cfg, cover_id, &cli.cmd)?;
    cover::print_summary(&snapshot);
    Ok(())
}

fn load_config(path: &Path) -> Result<chronoshade_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    chronoshade_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))
        .wrap_err(INVALID_CONFIG)
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console logs go to stderr so stdout stays reserved for cover output.
fn init_tracing(cli: &Cli, logging: Option<&chronoshade_config::Logging>) -> Result<()> {
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.and_then(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if cli.json {
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed(),
        );
    } else {
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    if let Some(file) = logging.and_then(|l| l.file.as_deref()) {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "chronoshade.log".into(), |n| n.to_string_lossy().into_owned());
        let appender = match logging.and_then(|l| l.rotation.as_deref()) {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")
}
