use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::game::InputSender;
use crate::types::World;

pub const DEFAULT_WS_URL: &str = "ws://localhost:8080";
/// Largest accepted world width or height.
pub const MAX_WORLD_EXTENT: f64 = 1_000_000.0;

// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Args {
    /// Game server WebSocket URL; an empty value disables networking
    #[clap(long, env = "WS_URL", default_value = DEFAULT_WS_URL)]
    pub ws_url: String,

    /// Run without connecting to a server
    #[clap(long)]
    pub offline: bool,

    /// Name shown to other players
    #[clap(short, long)]
    pub name: Option<String>,

    /// Target frames per second
    #[clap(long, default_value = "60")]
    pub fps: f64,

    #[clap(long, default_value = "3000")]
    pub world_width: f64,

    #[clap(long, default_value = "2000")]
    pub world_height: f64,

    /// How long a key counts as held after its last repeat, for terminals
    /// that do not report key release
    #[clap(long, default_value = "150")]
    pub key_hold_ms: u64,

    /// Where log output goes while the terminal is in use
    #[clap(long, default_value = "walkabout.log")]
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub ws_url: Option<String>,
    pub name: Option<String>,
    pub frame_interval: Duration,
    pub world: World,
    pub key_hold: Duration,
    pub input_interval: Duration,
    pub log_file: PathBuf,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        let ws_url = Some(args.ws_url.trim().to_string()).filter(|url| !args.offline && !url.is_empty());
        let fps = if args.fps.is_finite() { args.fps.clamp(1.0, 1000.0) } else { 60.0 };
        let name = args
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        Self {
            ws_url,
            name,
            frame_interval: Duration::from_secs_f64(1.0 / fps),
            world: World::new(
                args.world_width.clamp(1.0, MAX_WORLD_EXTENT),
                args.world_height.clamp(1.0, MAX_WORLD_EXTENT),
            ),
            key_hold: Duration::from_millis(args.key_hold_ms),
            input_interval: InputSender::DEFAULT_INTERVAL,
            log_file: args.log_file,
        }
    }
}
