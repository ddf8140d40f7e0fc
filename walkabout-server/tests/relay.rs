use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use walkabout::messages::{ClientMessage, InputMessage, PingMessage, PlayerEntry};
use walkabout::{Game, NetworkLink, ServerMessage, World};
use walkabout_server::{serve, ServerConfig};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_server(world: World) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        tick: Duration::from_millis(10),
        world,
    };
    tokio::spawn(serve(listener, config));
    addr
}

async fn connect(addr: SocketAddr) -> (Client, String) {
    let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    match next_message(&mut ws).await {
        ServerMessage::Welcome(welcome) => {
            let id = welcome.id.expect("welcome carries an id");
            (ws, id)
        }
        other => panic!("expected welcome first, got {:?}", other),
    }
}

async fn next_message(ws: &mut Client) -> ServerMessage {
    loop {
        let frame = timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
        if let Message::Text(text) = frame {
            return ServerMessage::parse(&text).unwrap();
        }
    }
}

/// Read until a snapshot satisfies `f`, returning its players.
async fn wait_for_snapshot<F>(ws: &mut Client, mut f: F) -> Vec<PlayerEntry>
where
    F: FnMut(&[PlayerEntry]) -> bool,
{
    loop {
        if let ServerMessage::Snapshot(snapshot) = next_message(ws).await {
            if f(&snapshot.players) {
                return snapshot.players;
            }
        }
    }
}

async fn send(ws: &mut Client, msg: ClientMessage) {
    ws.send(Message::Text(msg.to_json().unwrap())).await.unwrap();
}

fn input_at(x: f64, y: f64, name: &str) -> ClientMessage {
    ClientMessage::Input(InputMessage {
        seq: 1,
        up: false,
        down: false,
        left: false,
        right: true,
        x,
        y,
        name: Some(name.to_string()),
    })
}

#[tokio::test]
async fn each_connection_gets_its_own_id() {
    let addr = start_server(World::default()).await;
    let (_a, id_a) = connect(addr).await;
    let (_b, id_b) = connect(addr).await;
    assert_ne!(id_a, id_b);
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let addr = start_server(World::default()).await;
    let (mut ws, _) = connect(addr).await;

    send(&mut ws, ClientMessage::Ping(PingMessage { client_time: 1234 })).await;
    loop {
        if let ServerMessage::Pong(pong) = next_message(&mut ws).await {
            assert_eq!(pong.client_time, Some(1234));
            assert!(pong.server_time.is_some());
            break;
        }
    }
}

#[tokio::test]
async fn reported_positions_reach_other_players() {
    let addr = start_server(World::default()).await;
    let (mut a, id_a) = connect(addr).await;
    let (mut b, _) = connect(addr).await;

    send(&mut a, input_at(100.0, 200.0, "ann")).await;

    let players = wait_for_snapshot(&mut b, |players| players.iter().any(|p| p.id == id_a)).await;
    let ann = players.iter().find(|p| p.id == id_a).unwrap();
    assert_eq!((ann.x, ann.y), (100.0, 200.0));
    assert_eq!(ann.name.as_deref(), Some("ann"));
}

#[tokio::test]
async fn out_of_world_positions_are_clamped() {
    let addr = start_server(World::new(500.0, 400.0)).await;
    let (mut a, id_a) = connect(addr).await;

    send(&mut a, input_at(-50.0, 9000.0, "ann")).await;

    let players = wait_for_snapshot(&mut a, |players| players.iter().any(|p| p.id == id_a)).await;
    assert_eq!((players[0].x, players[0].y), (0.0, 400.0));
}

#[tokio::test]
async fn disconnected_players_drop_out_of_snapshots() {
    let addr = start_server(World::default()).await;
    let (mut a, id_a) = connect(addr).await;
    let (mut b, _) = connect(addr).await;

    send(&mut a, input_at(10.0, 10.0, "ann")).await;
    wait_for_snapshot(&mut b, |players| players.iter().any(|p| p.id == id_a)).await;

    a.close(None).await.unwrap();
    drop(a);

    wait_for_snapshot(&mut b, |players| players.iter().all(|p| p.id != id_a)).await;
}

#[tokio::test]
async fn client_link_and_game_follow_the_server() {
    let addr = start_server(World::default()).await;
    let (mut other, other_id) = connect(addr).await;
    send(&mut other, input_at(1600.0, 1000.0, "bob")).await;

    let mut link = NetworkLink::spawn(&format!("ws://{}", addr), Duration::from_millis(50));
    let mut game = Game::new(World::default());

    timeout(WAIT, async {
        while game.client_id.is_none() || game.rtt_ms.is_none() || !game.remote_players.contains_key(&other_id) {
            let msg = link.recv().await.expect("link stays up");
            game.apply_server_message(msg, walkabout::utils::now_millis());
        }
    })
    .await
    .unwrap();

    let own_id = game.client_id.clone().unwrap();
    assert_ne!(own_id, other_id);
    assert!(!game.remote_players.contains_key(&own_id));
    assert_eq!(game.remote_players[&other_id].name, "bob");
}
