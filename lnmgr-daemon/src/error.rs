use thiserror::Error;

/// Top-level failure during startup. Every variant exits the process with
/// code 1 (spec.md §6); once the reactor loop is running, failures are
/// handled locally and never reach `main`.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("missing config path argument")]
    MissingArg,

    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config rejected: {0}")]
    Config(#[from] lnmgr_config::ConfigError),

    #[error("failed to bind control socket at {path}: {source}")]
    Bind {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("kernel adapter init failed: {0}")]
    Kernel(#[from] lnmgr_kernel::KernelError),
}
