//! `lnmgrd`: loads a config file, compiles and evaluates the graph once,
//! then serves the control socket until told to stop (spec.md §6).

mod capability;
mod control;
mod error;
mod reactor;
mod subscriber;

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use error::StartupError;
use lnmgr_kernel::LinuxKernelAdapter;
use reactor::Reactor;
use tokio::net::UnixListener;

const SOCKET_PATH: &str = "/run/lnmgr.sock";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "startup failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config_path = std::env::args().nth(1).ok_or(StartupError::MissingArg)?;
    let config_text = std::fs::read_to_string(&config_path).map_err(|source| StartupError::ReadConfig {
        path: config_path.clone(),
        source,
    })?;

    let kernel: Arc<dyn lnmgr_kernel::KernelAdapter> = Arc::new(LinuxKernelAdapter::new()?);
    let probe = capability::RuntimeCapabilityProbe;
    let graph = lnmgr_config::load_str(&config_text, kernel, &probe)?;

    let _ = std::fs::remove_file(SOCKET_PATH);
    let listener = UnixListener::bind(SOCKET_PATH).map_err(|source| StartupError::Bind {
        path: SOCKET_PATH.to_string(),
        source,
    })?;
    let _ = std::fs::set_permissions(SOCKET_PATH, std::fs::Permissions::from_mode(0o666));

    let rtnetlink = lnmgr_kernel::ingest::rtnetlink::RtnetlinkIngester::new().await?;
    let nl80211 = match lnmgr_kernel::ingest::nl80211::Nl80211Ingester::new().await {
        Ok(ingester) => Some(ingester),
        Err(err) => {
            tracing::warn!(error = %err, "nl80211 unavailable, wireless signals disabled");
            None
        }
    };

    tracing::info!(config = %config_path, socket = SOCKET_PATH, "lnmgrd ready");
    let reactor = Reactor::new(graph, listener, rtnetlink, nl80211);
    reactor.run().await;

    let _ = std::fs::remove_file(SOCKET_PATH);
    tracing::info!("lnmgrd stopped");
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).compact())
        .init();
}
