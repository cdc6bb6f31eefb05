//! Diagnostic logging to stderr
//!
//! Filter precedence: `RUST_LOG`, then `--verbose`/`--quiet`, then the
//! configured `log_level`, then `warn`.

use std::io;

use miette::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::GlobalOpts;
use crate::core::Config;

pub fn init_logging(global: &GlobalOpts, config: &Config) -> Result<()> {
    let env_filter = build_env_filter(global, config)?;

    // A subscriber may already be installed (tests); keep it
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .without_time()
                .with_writer(io::stderr),
        )
        .try_init();

    Ok(())
}

fn build_env_filter(global: &GlobalOpts, config: &Config) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = filter_directive(global, config);
    EnvFilter::try_new(&directive)
        .map_err(|err| miette::miette!("invalid log level '{}': {}", directive, err))
}

fn filter_directive(global: &GlobalOpts, config: &Config) -> String {
    if global.verbose {
        "bestiary=debug".to_string()
    } else if global.quiet {
        "error".to_string()
    } else {
        config
            .log_level
            .clone()
            .unwrap_or_else(|| "warn".to_string())
    }
}
