use std::path::PathBuf;

use clap::Parser;

use bluemesh_node::{
    AnyBearer, Capabilities, ControllerEvent, MeshNode, NodeConfig, NodeEvent, NullBearer,
    StoreProvider,
};

#[derive(Parser)]
#[command(name = "bluemesh-node", about = "Bluetooth Mesh node daemon")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/bluemesh/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match NodeConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    // Initialize logging
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        bluemesh_node::logging::init_json(&config.logging.level);
    } else {
        bluemesh_node::logging::init(&config.logging.level);
    }

    let provider = StoreProvider::from_config(
        config.node.enable_storage,
        config.node.storage_path.as_deref(),
    );

    let mut node = MeshNode::new(
        config,
        Capabilities::from_features(),
        AnyBearer::Null(NullBearer::new()),
        provider,
    );
    let handle = node.shutdown_handle();

    // Spawn signal handler
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received SIGINT, shutting down");
        handle.shutdown();
    });

    if let Err(e) = node.start() {
        tracing::error!("failed to start node: {e}");
        std::process::exit(1);
    }

    // No controller is attached in this binary; report stack readiness
    // directly so storage resolves and advertising starts.
    let events = node.event_sender();
    let _ = events
        .send(NodeEvent::Controller(ControllerEvent::StackOperational))
        .await;

    if let Err(e) = node.run().await {
        tracing::error!("node exited with error: {e}");
    }
    node.shutdown().await;
}
