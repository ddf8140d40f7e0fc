use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::broadcast,
};
use tokio_tungstenite::{accept_async, tungstenite::protocol::Message};
use uuid::Uuid;
use walkabout::messages::{
    ClientMessage, InputMessage, PlayerEntry, PlayersMessage, PongMessage, ServerMessage,
    WelcomeMessage,
};
use walkabout::utils::now_millis;
use walkabout::World;

/// Target meaning "every connection" on the broadcast channel.
const ALL: &str = "*";
const MAX_NAME_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How often the player snapshot is broadcast.
    pub tick: Duration,
    pub world: World,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            world: World::default(),
        }
    }
}

// Last reported position of a connected player
#[derive(Debug, Clone, PartialEq)]
struct PlayerRecord {
    x: f64,
    y: f64,
    name: Option<String>,
}

// Server state
pub struct ServerState {
    world: World,
    // Map from connection ID to the player's last report, if any
    connections: HashMap<String, Option<PlayerRecord>>,
}

impl ServerState {
    pub fn new(world: World) -> Self {
        Self {
            world,
            connections: HashMap::new(),
        }
    }

    pub fn register_connection(&mut self, id: &str) {
        info!("Registering connection: {}", id);
        self.connections.insert(id.to_string(), None);
    }

    pub fn remove_connection(&mut self, id: &str) {
        self.connections.remove(id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Store a player's reported position, clamped to the world.
    pub fn apply_input(&mut self, connection_id: &str, input: &InputMessage) {
        let Some(record) = self.connections.get_mut(connection_id) else {
            return;
        };
        let (x, y) = self.world.clamp(input.x, input.y, 0.0);
        let name = input
            .name
            .as_deref()
            .map(|name| name.trim().chars().take(MAX_NAME_LEN).collect::<String>())
            .filter(|name| !name.is_empty());
        *record = Some(PlayerRecord { x, y, name });
    }

    /// Every player that has reported a position, ordered by id.
    pub fn snapshot(&self) -> ServerMessage {
        let mut players: Vec<PlayerEntry> = self
            .connections
            .iter()
            .filter_map(|(id, record)| {
                record.as_ref().map(|r| PlayerEntry {
                    id: id.clone(),
                    x: r.x,
                    y: r.y,
                    name: r.name.clone(),
                })
            })
            .collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        ServerMessage::Snapshot(PlayersMessage { players })
    }
}

/// Accept connections on `listener` until it fails.
pub async fn serve(listener: TcpListener, config: ServerConfig) -> Result<()> {
    info!("Listening on: {}", listener.local_addr()?);

    // Create shared server state
    let state = Arc::new(Mutex::new(ServerState::new(config.world)));

    // Create broadcast channel of (target, frame)
    let (tx, _) = broadcast::channel::<(String, String)>(100);

    tokio::spawn(broadcast_snapshots(Arc::clone(&state), tx.clone(), config.tick));

    // Accept connections
    loop {
        let (stream, addr) = listener.accept().await?;
        info!("New connection from: {}", addr);

        let tx = tx.clone();
        let state = Arc::clone(&state);

        // Generate a unique ID for this connection
        let connection_id = Uuid::new_v4().to_string();

        lock(&state).register_connection(&connection_id);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, connection_id.clone(), Arc::clone(&state), tx).await {
                error!("Error handling connection {}: {}", connection_id, e);
            }

            // On disconnect, clean up; the next snapshot drops the player
            lock(&state).remove_connection(&connection_id);
            info!("Connection closed: {}", connection_id);
        });
    }
}

fn lock(state: &Mutex<ServerState>) -> std::sync::MutexGuard<'_, ServerState> {
    // A panicked connection task must not take the whole server down.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn broadcast_snapshots(
    state: Arc<Mutex<ServerState>>,
    tx: broadcast::Sender<(String, String)>,
    tick: Duration,
) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let snapshot = lock(&state).snapshot();
        match snapshot.to_json() {
            // No receivers just means nobody is connected.
            Ok(json) => {
                let _ = tx.send((ALL.to_string(), json));
            }
            Err(e) => error!("Failed to encode snapshot: {}", e),
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    connection_id: String,
    state: Arc<Mutex<ServerState>>,
    tx: broadcast::Sender<(String, String)>,
) -> Result<()> {
    // Accept WebSocket connection
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Send welcome message with connection ID
    let welcome = ServerMessage::Welcome(WelcomeMessage {
        id: Some(connection_id.clone()),
    });
    ws_sender.send(Message::Text(welcome.to_json()?)).await?;

    // Subscribe to broadcast messages
    let mut rx = tx.subscribe();

    // Forward broadcasts meant for everyone or for this connection
    let conn_id = connection_id.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok((target, msg)) => {
                    if target == ALL || target == conn_id {
                        if let Err(e) = ws_sender.send(Message::Text(msg)).await {
                            error!("Failed to forward message: {}", e);
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Connection {} lagged by {} messages", conn_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Process incoming messages
    while let Some(result) = ws_receiver.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                error!("Error receiving message: {}", e);
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        debug!("Received text message from {}: {}", connection_id, text);

        match ClientMessage::parse(&text) {
            Ok(ClientMessage::Ping(ping)) => {
                let pong = ServerMessage::Pong(PongMessage {
                    client_time: Some(ping.client_time),
                    server_time: Some(now_millis()),
                });
                let _ = tx.send((connection_id.clone(), pong.to_json()?));
            }
            Ok(ClientMessage::Input(input)) => {
                lock(&state).apply_input(&connection_id, &input);
            }
            Ok(ClientMessage::Unknown) => {
                debug!("Unknown message type from {}", connection_id);
            }
            Err(e) => {
                error!("Failed to parse message: {} ({})", text, e);
            }
        }
    }

    // Cancel the forward task when the connection closes
    forward_task.abort();

    Ok(())
}
