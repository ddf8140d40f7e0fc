//! Client for a small 2D multiplayer movement demo.
//!
//! A frame loop reads the keyboard, moves the local player inside the world,
//! folds in whatever the server sent, and draws the scene centered on the
//! player. The server link is optional and reconnects on its own.

pub mod app;
pub mod camera;
pub mod config;
pub mod game;
pub mod input;
pub mod messages;
pub mod network;
pub mod render;
pub mod terminal;
pub mod types;
pub mod utils;

pub use camera::{Camera, Viewport};
pub use config::{Args, ClientConfig};
pub use game::Game;
pub use messages::{ClientMessage, ServerMessage};
pub use network::{LinkStatus, NetworkLink};
pub use types::{Player, RemotePlayer, World};
