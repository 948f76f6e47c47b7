use std::net::SocketAddr;

use anyhow::anyhow;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voicebridge_gateway::{AppState, ServerConfig, routes};

/// Voicebridge gateway - bridges phone calls to an AI voice assistant
#[derive(Parser, Debug)]
#[command(name = "voicebridge-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Override the listen host
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("voicebridge_gateway=info,tower_http=info")),
        )
        .init();

    // Crypto provider for outbound TLS (OpenAI, Supabase, webhooks). Must be
    // installed before any TLS connection is attempted.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let mut config = ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    info!(
        tenant = config.tenant.id,
        model = %config.realtime_model,
        record_store = config.has_record_store(),
        "Starting gateway"
    );

    let address = config.address();
    let app_state = AppState::new(config);

    let app = routes::create_router().with_state(app_state);

    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;
    let listener = TcpListener::bind(&socket_addr).await?;
    info!("Server listening on http://{socket_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
