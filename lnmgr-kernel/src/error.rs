use thiserror::Error;

/// Errors surfaced by kernel adapter operations. All adapter calls are
/// meant to be idempotent; a `KernelError` means the kernel genuinely
/// refused the request, not that the desired state was already in place.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("netlink request failed: {0}")]
    Netlink(String),

    #[error("link '{0}' not found")]
    LinkNotFound(String),

    #[error("kernel dropped messages (ENOBUFS); resync required")]
    Enobufs,

    #[error("operation not supported by this kernel/platform: {0}")]
    Unsupported(String),
}

impl From<KernelError> for lnmgr_graph::ActionError {
    fn from(err: KernelError) -> Self {
        lnmgr_graph::ActionError(err.to_string())
    }
}
