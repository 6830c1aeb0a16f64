//! Logging setup for the console.
//!
//! Log lines go to stderr so command output on stdout stays scriptable.
//! `RUST_LOG` wins over the configured level; `-v` flags win over both.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Filter directive for the requested verbosity, if it overrides the default.
fn verbosity_directive(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("event_console=debug,domain=debug,info"),
        _ => Some("trace"),
    }
}

fn build_filter(config: &LoggingConfig, verbose: u8) -> EnvFilter {
    if let Some(directive) = verbosity_directive(verbose) {
        return EnvFilter::new(directive);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig, verbose: u8) {
    let registry = tracing_subscriber::registry().with(build_filter(config, verbose));

    let installed = match config.format.as_str() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init(),
        "pretty" => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Logging already initialised");
    }
}
