use tracing_subscriber::{prelude::*, EnvFilter, Registry};

/// Maps the `-v` count to a default filter directive.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Initialize tracing
///
/// `RUST_LOG` takes precedence over the verbosity-derived level. Logs are
/// written to stderr so stdout only carries command results.
pub fn init(verbosity: u8) {
    // Setup tracing layers
    let logger = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let collector = Registry::default().with(logger).with(env_filter);

    // A subscriber may already be installed when embedded in another binary
    if tracing::subscriber::set_global_default(collector).is_err() {
        tracing::debug!("tracing subscriber already initialised");
    }
}
