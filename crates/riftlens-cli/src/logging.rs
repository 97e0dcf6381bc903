use tracing_subscriber::EnvFilter;

use crate::cli::args::LogFormat;

/// Logs go to stderr so command output on stdout stays machine-readable.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    if let Err(e) = installed {
        eprintln!("warning: logging not initialised: {e}");
    }
}
