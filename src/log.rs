// Logging setup: a tracing-subscriber fmt layer filtered by level
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::EnvFilter;

pub fn parse_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install the global subscriber. `RUST_LOG`, when set, overrides `level`.
///
/// Returns false when logging is disabled or a subscriber is already
/// installed (tests and embedding servers often install their own).
pub fn init(enabled: bool, level: &str) -> bool {
    if !enabled {
        return false;
    }
    let lvl = parse_level(level).unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from_level(lvl).into()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
