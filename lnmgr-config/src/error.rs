use thiserror::Error;

/// Error taxonomy surfaced by the config compile pipeline (spec.md §7).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("topology: {0}")]
    Topology(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),
}
