use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber.
///
/// `levels` is an env-filter directive such as `influxdb_output=debug`.
/// Logs go to stderr, leaving stdout for the publish summary.
pub fn init(color: bool, json: bool, levels: &str) {
    let filter = EnvFilter::try_new(levels).unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore errors when setting, since tests can initialize this
    // multiple times.
    let _ = if json {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .flatten_event(true)
            .try_init()
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(color)
            .try_init()
    };
}

/// The filter directive for a verbosity offset from `info`.
pub fn levels(verbose: u8, quiet: u8) -> String {
    let level = match i16::from(verbose) - i16::from(quiet) {
        i16::MIN..=-3 => "off",
        -2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        2..=i16::MAX => "trace",
    };
    format!("influxdb_output={level}")
}
