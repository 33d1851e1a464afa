//! FleetCmd Control Plane Server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fleetcmd_control_plane::audit::InMemoryAuditLog;
use fleetcmd_control_plane::availability::InMemoryAvailability;
use fleetcmd_control_plane::bus::InMemoryCommandBus;
use fleetcmd_control_plane::store::InMemoryTaskStore;
use fleetcmd_control_plane::{http, AppState, Config};
use fleetcmd_session_client::SessionClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load config
    let config = Config::from_env();
    let addr: SocketAddr = config.bind_addr.parse()?;

    // Wire collaborators
    let store = Arc::new(InMemoryTaskStore::new());
    let availability = Arc::new(InMemoryAvailability::new());
    let sessions = Arc::new(SessionClient::new(&config.session_manager_url));
    let bus = Arc::new(InMemoryCommandBus::new());
    let audit = Arc::new(InMemoryAuditLog::new());

    let state = AppState::new(
        store,
        availability,
        sessions,
        bus,
        audit,
        config.transfer.clone(),
    );

    let router = http::create_router(state);

    info!(
        addr = %addr,
        session_manager = %config.session_manager_url,
        "Starting FleetCmd control plane"
    );

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
