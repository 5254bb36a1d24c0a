use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// The level filter comes from `RUST_LOG` and defaults to `info`. With `json`
/// set, events are written as flattened JSON objects, otherwise as plain text.
/// Only binaries should call this; calling it twice is a no-op.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if json {
        fmt().with_env_filter(filter).json().flatten_event(true).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(false).try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}
