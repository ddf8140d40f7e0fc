use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::input::InputState;
use crate::messages::{InputMessage, PlayerEntry, ServerMessage};
use crate::types::{Player, RemotePlayer, World};

/// Longest step a single frame may simulate, in seconds.
pub const MAX_FRAME_DT: f64 = 0.05;

/// Seconds to simulate for a frame that took `elapsed`.
pub fn frame_dt(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64().min(MAX_FRAME_DT)
}

/// Everything the frame loop mutates.
#[derive(Debug, Clone)]
pub struct Game {
    pub world: World,
    pub player: Player,
    pub remote_players: BTreeMap<String, RemotePlayer>,
    /// Id the server assigned us in `welcome`, if any.
    pub client_id: Option<String>,
    /// Round trip of the last answered ping, in milliseconds.
    pub rtt_ms: Option<u64>,
}

impl Game {
    pub fn new(world: World) -> Self {
        Self {
            player: Player::spawn(&world),
            world,
            remote_players: BTreeMap::new(),
            client_id: None,
            rtt_ms: None,
        }
    }

    /// Advance the local player by `dt` seconds under `input`.
    pub fn update(&mut self, input: &InputState, dt: f64) {
        let dt = dt.max(0.0);
        let player = &mut self.player;

        let (dx, dy) = input.direction();
        if dx != 0.0 || dy != 0.0 {
            let len = dx.hypot(dy);
            player.vx = dx / len * player.speed;
            player.vy = dy / len * player.speed;
        } else {
            player.vx = 0.0;
            player.vy = 0.0;
        }

        player.x += player.vx * dt;
        player.y += player.vy * dt;

        (player.x, player.y) = self.world.clamp(player.x, player.y, player.radius);
    }

    /// Fold one server frame into local state. `now_ms` is wall-clock epoch
    /// milliseconds, used for the ping round trip.
    pub fn apply_server_message(&mut self, msg: ServerMessage, now_ms: u64) {
        match msg {
            ServerMessage::Welcome(welcome) => {
                if let Some(id) = welcome.id {
                    log::info!("Connected as player ID: {}", id);
                    self.remote_players.remove(&id);
                    self.client_id = Some(id);
                }
            }
            ServerMessage::Pong(pong) => {
                if let Some(sent) = pong.client_time {
                    let rtt = now_ms.saturating_sub(sent);
                    log::debug!("pong: rtt {}ms", rtt);
                    self.rtt_ms = Some(rtt);
                }
            }
            ServerMessage::State(state) => {
                for entry in state.players {
                    self.upsert_remote(entry);
                }
            }
            ServerMessage::Snapshot(snapshot) => {
                let before = self.remote_players.len();
                self.remote_players
                    .retain(|id, _| snapshot.players.iter().any(|p| &p.id == id));
                let removed = before - self.remote_players.len();
                if removed > 0 {
                    log::info!("{} player(s) left", removed);
                }
                for entry in snapshot.players {
                    self.upsert_remote(entry);
                }
            }
            ServerMessage::Unknown => {
                log::debug!("Ignoring unknown server message");
            }
        }
    }

    fn upsert_remote(&mut self, entry: PlayerEntry) {
        if self.client_id.as_deref() == Some(entry.id.as_str()) {
            return;
        }
        self.remote_players
            .insert(entry.id, RemotePlayer::new(entry.x, entry.y, entry.name));
    }
}

/// Decides when to report local input to the server.
///
/// A report goes out whenever the held keys change, and every `interval`
/// while the player keeps moving.
#[derive(Debug, Clone)]
pub struct InputSender {
    name: Option<String>,
    interval: Duration,
    seq: u64,
    last: Option<(InputState, Instant)>,
}

impl InputSender {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(name: Option<String>, interval: Duration) -> Self {
        Self {
            name,
            interval,
            seq: 0,
            last: None,
        }
    }

    /// Forget what was sent, so the next poll reports unconditionally.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn poll(&mut self, game: &Game, input: &InputState, now: Instant) -> Option<InputMessage> {
        let due = match self.last {
            None => true,
            Some((prev, _)) if prev != *input => true,
            Some((_, at)) => game.player.is_moving() && now.saturating_duration_since(at) >= self.interval,
        };
        if !due {
            return None;
        }

        self.seq += 1;
        self.last = Some((*input, now));
        Some(InputMessage {
            seq: self.seq,
            up: input.up,
            down: input.down,
            left: input.left,
            right: input.right,
            x: game.player.x,
            y: game.player.y,
            name: self.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{PlayersMessage, PongMessage, WelcomeMessage};

    fn held(up: bool, down: bool, left: bool, right: bool) -> InputState {
        InputState {
            up,
            down,
            left,
            right,
        }
    }

    fn entry(id: &str, x: f64, y: f64) -> PlayerEntry {
        PlayerEntry {
            id: id.to_string(),
            x,
            y,
            name: None,
        }
    }

    #[test]
    fn frame_dt_is_capped() {
        assert_eq!(frame_dt(Duration::from_millis(16)), 0.016);
        assert_eq!(frame_dt(Duration::from_secs(3)), MAX_FRAME_DT);
    }

    #[test]
    fn idle_input_stops_the_player() {
        let mut game = Game::new(World::default());
        game.update(&held(false, false, false, true), 0.05);
        assert!(game.player.is_moving());

        game.update(&InputState::default(), 0.05);
        assert_eq!((game.player.vx, game.player.vy), (0.0, 0.0));
    }

    #[test]
    fn moves_at_speed_along_one_axis() {
        let mut game = Game::new(World::default());
        game.update(&held(true, false, false, false), 0.05);
        assert_eq!(game.player.vy, -280.0);
        assert_eq!(game.player.y, 1000.0 - 14.0);
        assert_eq!(game.player.x, 1500.0);
    }

    #[test]
    fn diagonal_speed_is_normalized() {
        let mut game = Game::new(World::default());
        game.update(&held(false, true, false, true), 0.01);
        let speed = game.player.vx.hypot(game.player.vy);
        assert!((speed - Player::SPEED).abs() < 1e-9);
        assert!(game.player.vx > 0.0 && game.player.vy > 0.0);
    }

    #[test]
    fn position_never_leaves_the_world() {
        let mut game = Game::new(World::new(200.0, 100.0));
        let inputs = [
            held(true, false, true, false),
            held(false, true, false, true),
            held(true, false, false, true),
            held(false, true, true, false),
        ];
        for input in inputs {
            for _ in 0..100 {
                game.update(&input, MAX_FRAME_DT);
                let p = &game.player;
                assert!(p.x >= p.radius && p.x <= 200.0 - p.radius);
                assert!(p.y >= p.radius && p.y <= 100.0 - p.radius);
            }
        }
        // last input pushed down-left into the corner
        assert_eq!((game.player.x, game.player.y), (14.0, 86.0));
    }

    #[test]
    fn negative_dt_does_not_move() {
        let mut game = Game::new(World::default());
        game.update(&held(false, false, true, false), -1.0);
        assert_eq!(game.player.x, 1500.0);
    }

    #[test]
    fn state_merges_and_snapshot_replaces() {
        let mut game = Game::new(World::default());
        game.apply_server_message(
            ServerMessage::State(PlayersMessage {
                players: vec![entry("a", 1.0, 2.0), entry("b", 3.0, 4.0)],
            }),
            0,
        );
        game.apply_server_message(
            ServerMessage::State(PlayersMessage {
                players: vec![entry("c", 5.0, 6.0)],
            }),
            0,
        );
        assert_eq!(game.remote_players.len(), 3);

        game.apply_server_message(
            ServerMessage::Snapshot(PlayersMessage {
                players: vec![entry("b", 30.0, 40.0)],
            }),
            0,
        );
        assert_eq!(game.remote_players.keys().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(game.remote_players["b"].x, 30.0);
        assert_eq!(game.remote_players["b"].name, "Player");
    }

    #[test]
    fn own_id_is_skipped() {
        let mut game = Game::new(World::default());
        game.apply_server_message(
            ServerMessage::Welcome(WelcomeMessage {
                id: Some("me".to_string()),
            }),
            0,
        );
        game.apply_server_message(
            ServerMessage::Snapshot(PlayersMessage {
                players: vec![entry("me", 1.0, 1.0), entry("you", 2.0, 2.0)],
            }),
            0,
        );
        assert_eq!(game.client_id.as_deref(), Some("me"));
        assert!(!game.remote_players.contains_key("me"));
        assert!(game.remote_players.contains_key("you"));
    }

    #[test]
    fn pong_records_round_trip() {
        let mut game = Game::new(World::default());
        game.apply_server_message(
            ServerMessage::Pong(PongMessage {
                client_time: Some(1_000),
                server_time: None,
            }),
            1_045,
        );
        assert_eq!(game.rtt_ms, Some(45));
    }

    #[test]
    fn sender_reports_changes_and_heartbeats_while_moving() {
        let start = Instant::now();
        let mut game = Game::new(World::default());
        let mut sender = InputSender::new(Some("ann".to_string()), Duration::from_millis(100));

        let idle = InputState::default();
        let first = sender.poll(&game, &idle, start).unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(first.name.as_deref(), Some("ann"));
        assert!(sender.poll(&game, &idle, start + Duration::from_secs(5)).is_none());

        let right = held(false, false, false, true);
        game.update(&right, 0.01);
        let changed = sender.poll(&game, &right, start + Duration::from_millis(10)).unwrap();
        assert_eq!(changed.seq, 2);
        assert!(changed.right);
        assert_eq!(changed.x, game.player.x);

        assert!(sender.poll(&game, &right, start + Duration::from_millis(50)).is_none());
        let beat = sender.poll(&game, &right, start + Duration::from_millis(110)).unwrap();
        assert_eq!(beat.seq, 3);
    }
}
