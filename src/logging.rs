use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "warn";
const DEBUG_DIRECTIVE: &str = "perfsnap=debug";

pub fn filter_for(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new(format!("{DEFAULT_DIRECTIVE},{DEBUG_DIRECTIVE}"))
        } else {
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }
    })
}

/// Installs a plain-text subscriber on stderr. The report owns stdout.
pub fn init_tracing(debug: bool, ansi: bool) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter_for(debug))
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(debug)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| eyre!("failed to set tracing subscriber: {e}"))?;
    Ok(())
}
