use anyhow::Result;
use clap::Parser;
use env_logger::Builder;
use std::{net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use walkabout::World;
use walkabout_server::{serve, ServerConfig};

// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,

    /// Milliseconds between player snapshots
    #[clap(long, default_value = "50")]
    tick_ms: u64,

    #[clap(long, default_value = "3000")]
    world_width: f64,

    #[clap(long, default_value = "2000")]
    world_height: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut builder = Builder::new();

    #[cfg(debug_assertions)]
    builder.filter_level(log::LevelFilter::Debug);
    #[cfg(not(debug_assertions))]
    builder.filter_level(log::LevelFilter::Info);

    builder.parse_default_env();
    builder.init();

    // Parse command line arguments
    let args = Args::parse();
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    let config = ServerConfig {
        tick: Duration::from_millis(args.tick_ms.max(1)),
        world: World::new(args.world_width.max(1.0), args.world_height.max(1.0)),
    };

    let listener = TcpListener::bind(&addr).await?;
    serve(listener, config).await
}
