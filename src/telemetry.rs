//! Log output for the binary.
//!
//! Events go to stderr so they never mix with the report on stdout.
//! `RUST_LOG` wins when set; otherwise each `-v` raises the level one step
//! from `warn`. `json` switches to one JSON object per event.

use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbosity: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // A subscriber may already be installed (tests, embedding apps)
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
