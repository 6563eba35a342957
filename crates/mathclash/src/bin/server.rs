//! Mathclash server binary.

use clap::Parser;
use mathclash::ServerBuilder;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mathclash-server",
    about = "Real-time multiplayer room server for the Mathclash quiz game"
)]
struct Args {
    /// WebSocket listen address for the realtime gateway.
    #[arg(long, default_value = "0.0.0.0:8090")]
    bind: String,

    /// HTTP listen address for the status and debug endpoints.
    #[arg(long, default_value = "0.0.0.0:8091")]
    http_bind: String,

    /// Run with multiplayer disabled: room commands fail with a
    /// capability error, the status endpoint reports multiplayer off.
    #[arg(long)]
    no_multiplayer: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let server = ServerBuilder::new()
        .bind(&args.bind)
        .http_bind(&args.http_bind)
        .multiplayer(!args.no_multiplayer)
        .build()
        .await?;

    server.run().await?;
    Ok(())
}
