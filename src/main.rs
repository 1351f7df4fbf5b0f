use std::io::{IsTerminal, Write, stdout};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::Result;
use perfsnap::config::{Config, load_config, load_config_from_path};
use perfsnap::logging;
use perfsnap::report::theme::{ColorChoice, Thresholds};
use perfsnap::report::{ReportOptions, render_json, render_text};
use perfsnap::system::{Collector, SystemSource};
use tracing::error;

#[derive(Parser)]
#[command(
    name = "perfsnap",
    version,
    about = "One-shot performance snapshot: CPU, memory, disk and top processes"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// CPU sampling period in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Timeout for each external command in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Filesystem path to report disk usage for
    #[arg(long)]
    path: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long, default_value_t = false)]
    no_color: bool,

    /// Emit the snapshot as JSON instead of a text report
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log source attempts and fallbacks to stderr
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init_tracing(cli.debug, std::io::stderr().is_terminal())?;
    let config = load_config_for_cli(&cli);

    let reader = SystemSource::new(config.command_timeout());
    let collector = Collector::detect(reader, config.collect_options()).await;
    let (snapshot, stats) = collector.collect().await;

    let output = if cli.json {
        let mut json = render_json(&snapshot, &stats)?;
        json.push('\n');
        json
    } else {
        let options = ReportOptions {
            thresholds: Thresholds {
                warn_percent: config.thresholds.warn_percent,
                critical_percent: config.thresholds.critical_percent,
            },
            color: color_enabled(&cli, &config),
        };
        render_text(&snapshot, &stats, &options)
    };

    let mut out = stdout().lock();
    out.write_all(output.as_bytes())?;
    out.flush()?;

    let max_unavailable = config.thresholds.max_unavailable_core_metrics;
    if stats.is_failure(max_unavailable) {
        error!(
            unavailable = stats.unavailable.len(),
            max_unavailable, "too many core metrics unavailable"
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(period) = cli.interval_ms {
        config.sampling.period_ms = period;
    }
    if let Some(timeout) = cli.timeout_ms {
        config.sampling.command_timeout_ms = timeout;
    }
    if let Some(ref path) = cli.path {
        config.disk.path = path.clone();
    }

    config
}

fn color_enabled(cli: &Cli, config: &Config) -> bool {
    let choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::from_config_str(&config.display.color)
    };
    choice.enabled(stdout().is_terminal())
}
