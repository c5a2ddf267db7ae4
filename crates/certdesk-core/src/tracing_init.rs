//! Logging setup shared by the `serve`, `import` and `stats` commands.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`;
/// `log_json` switches to one JSON object per line.
///
/// A second call is a no-op, so tests may call it freely.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (json, plain) = if log_json {
        (Some(fmt::layer().json()), None)
    } else {
        (None, Some(fmt::layer()))
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(plain)
        .try_init();
}

/// Filter directive enabling `level` for every certdesk crate.
pub fn default_filter(level: &str) -> String {
    format!("certdesk={level},certdesk_core={level},certdesk_server={level},tower_http=warn")
}
