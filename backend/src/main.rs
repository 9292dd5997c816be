use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use landchain_backend::config::AppConfig;
use landchain_backend::fabric::FabricClient;
use landchain_backend::persistence::{self, Persistence};
use landchain_backend::registry::Registry;
use landchain_backend::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = AppConfig::load()?;
    log::info!("Loaded config: {:?}", config);

    let persistence = Arc::new(Persistence::from_config(&config)?);
    let registry = match persistence.load()? {
        Some(data) => {
            log::info!(
                "Loaded {} users, {} properties, {} offers from {}",
                data.users.len(),
                data.properties.len(),
                data.offers.len(),
                persistence.describe()
            );
            Arc::new(Registry::with_data(data))
        }
        None => {
            log::info!("Starting with an empty registry ({})", persistence.describe());
            Arc::new(Registry::new())
        }
    };
    if config.seed_demo_users {
        let seeded = registry.seed_demo_users().await;
        if seeded > 0 {
            log::info!("Seeded {} demo users", seeded);
        }
    }

    let fabric = FabricClient::connect(&config.fabric()).await;
    log::info!("Ledger mode: {}", fabric.mode().as_str());

    let flush_loop = persistence::spawn_flush_loop(
        Arc::clone(&registry),
        Arc::clone(&persistence),
        Duration::from_secs(config.flush_interval_secs.max(1)),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::new(config, Arc::clone(&registry), fabric);
    let app = create_router(state);

    log::info!("Starting server on {}", addr);
    log::info!("Health check: http://{}/api/health", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    flush_loop.abort();
    match persistence::flush(&registry, &persistence).await {
        Ok(true) => log::info!("Final flush written to {}", persistence.describe()),
        Ok(false) => {}
        Err(e) => log::error!("Final flush failed: {}", e),
    }
    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down...");
}
