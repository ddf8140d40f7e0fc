use anyhow::Result;
use clap::Parser;
use std::panic;
use walkabout::utils::init_logging;
use walkabout::{app, Args, ClientConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(Some(&args.log_file))?;

    // Log panics; the terminal guard restores the screen while unwinding.
    panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic in walkabout: {:?}", panic_info);
    }));

    let config = ClientConfig::from(args);
    log::info!("Starting walkabout with {:?}", config);
    app::run(config).await
}
