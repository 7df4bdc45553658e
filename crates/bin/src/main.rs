use std::sync::Arc;

use clap::Parser;
use tessera::SystemClock;
use tessera::conflict::ConflictResolver;
use tessera::events::ChannelBroadcaster;
use tessera::service::ConflictService;
use tessera::store::InMemory;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("tessera=info".parse().unwrap()),
        )
        .init();

    // Load or create the record store
    let store = match InMemory::load_from_file(&cli.db_file) {
        Ok(store) => {
            tracing::info!("Loaded record store from {}", cli.db_file.display());
            store
        }
        Err(e) => {
            tracing::warn!("Failed to load record store: {e:?}. Creating a new one.");
            InMemory::new()
        }
    };
    let store = Arc::new(store);

    // Event fan-out: drain the channel and log each event. A real host
    // would forward these to connected editor sessions.
    let (broadcaster, mut events) = ChannelBroadcaster::new();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::info!(
                kind = ?event.kind,
                container = %event.container_id,
                actor = %event.actor_id,
                "event"
            );
        }
    });

    let resolver = Arc::new(ConflictResolver::new(
        store.clone(),
        Arc::new(broadcaster),
        Arc::new(SystemClock),
    ));

    let mut service = ConflictService::new(resolver);
    let addr = service.start(&format!("{}:{}", cli.host, cli.port)).await?;

    println!("Tessera server starting on http://localhost:{}", addr.port());
    println!();
    println!("Available endpoints:");
    println!("  GET  /conflicts      - List conflicts for a container");
    println!("  POST /conflicts      - Detect and record a conflict");
    println!("  PUT  /conflicts/{{id}} - Resolve a conflict");
    println!();
    println!("Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, saving record store...");
    service.stop()?;

    match store.save_to_file(&cli.db_file) {
        Ok(()) => {
            tracing::info!("Record store saved successfully");
            println!("\nRecord store saved successfully");
        }
        Err(e) => {
            tracing::error!("Failed to save record store: {e:?}");
            eprintln!("Failed to save record store: {e:?}");
        }
    }

    println!("Server shut down");
    Ok(())
}
