//! CrossDesk node daemon entry point.
//!
//! Wires the configuration, the topology/screen sources, and the request
//! service together, then runs the transport listener until a shutdown signal
//! arrives.
//!
//! ```text
//! main()
//!  └─ load_config()                -- TOML from the platform config dir
//!  └─ ApiService::new(...)         -- topology + screen sources injected
//!  └─ ServerEndpoint::start(...)   -- accept loop on the transport port
//!  └─ ctrl-c  → cancel token       -- linked shutdown for every session
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crossdesk_core::{Message, PacketConsumer};
use crossdesk_node::application::api_service::ApiService;
use crossdesk_node::application::providers::StaticMachineMatrix;
use crossdesk_node::infrastructure::network::ServerEndpoint;
use crossdesk_node::infrastructure::screens::StaticScreenSource;
use crossdesk_node::infrastructure::storage::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so its log level can seed the subscriber;
    // `RUST_LOG` still wins when set.
    let cfg = config::load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cfg.node.log_level.clone())),
        )
        .init();

    info!("CrossDesk node '{}' starting", cfg.node.name);

    let bind_addr: SocketAddr = format!("{}:{}", cfg.network.bind_address, cfg.network.transport_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address in config: {e}"))?;

    let service = Arc::new(ApiService::new(
        Arc::new(StaticMachineMatrix::new(cfg.topology.machines.clone())),
        Arc::new(StaticScreenSource::from_config(&cfg.screens)),
    ));

    // Observe the heartbeat stream for diagnostics.  Any other subsystem
    // wanting the same stream subscribes its own consumer; the fan-out layer
    // gives each one a private copy.
    let heartbeat_log = PacketConsumer::new(|message: Message| async move {
        debug!(
            "heartbeat observed (correlation {})",
            message.correlation_id
        );
    });
    service.event_queue().subscribe(Arc::clone(&heartbeat_log));

    let shutdown = CancellationToken::new();
    heartbeat_log.start(shutdown.child_token());

    let server = ServerEndpoint::new(cfg.node.name.clone(), bind_addr, service)
        .with_max_payload(cfg.network.max_payload_bytes);
    let handle = server.start(&shutdown).await?;
    info!("transport listening on {}", handle.local_addr());

    // Ctrl-C / SIGTERM handler cancels the shutdown token; the endpoint and
    // every session observe it through their linked child tokens.
    let shutdown_on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                shutdown_on_signal.cancel();
            }
            Err(e) => warn!("could not listen for shutdown signal: {e}"),
        }
    });

    handle.stopped().await;
    info!("CrossDesk node stopped");
    Ok(())
}
