use anyhow::Result;
use serde::{self, Deserialize, Serialize};

/// One player entry inside `state` and `snapshot` messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingMessage {
    pub client_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMessage {
    pub seq: u64,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayersMessage {
    #[serde(default)]
    pub players: Vec<PlayerEntry>,
}

/// Frames sent by the client, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Ping(PingMessage),
    Input(InputMessage),
    #[serde(other)]
    Unknown,
}

/// Frames sent by the server, tagged by `type`.
///
/// `state` merges into the known players, `snapshot` replaces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Welcome(WelcomeMessage),
    Pong(PongMessage),
    State(PlayersMessage),
    Snapshot(PlayersMessage),
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ping_uses_camel_case_client_time() {
        let ping = ClientMessage::Ping(PingMessage { client_time: 42 });
        let value: serde_json::Value = serde_json::from_str(&ping.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({ "type": "ping", "clientTime": 42 }));
    }

    #[test]
    fn input_omits_missing_name() {
        let input = ClientMessage::Input(InputMessage {
            seq: 3,
            up: true,
            down: false,
            left: false,
            right: true,
            x: 10.5,
            y: 20.0,
            name: None,
        });
        let value: serde_json::Value = serde_json::from_str(&input.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "input");
        assert_eq!(value["seq"], 3);
        assert_eq!(value["right"], true);
        assert!(value.get("name").is_none());
    }

    #[test]
    fn parses_state_with_optional_names() {
        let msg = ServerMessage::parse(
            r#"{"type":"state","players":[{"id":"a","x":1,"y":2,"name":"Ann"},{"id":"b","x":3.5,"y":4}]}"#,
        )
        .unwrap();
        let state = match msg {
            ServerMessage::State(state) => state,
            other => panic!("expected state, got {:?}", other),
        };
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.players[0].name.as_deref(), Some("Ann"));
        assert_eq!(state.players[1].name, None);
        assert_eq!(state.players[1].x, 3.5);
    }

    #[test]
    fn welcome_without_id_is_accepted() {
        let msg = ServerMessage::parse(r#"{"type":"welcome"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Welcome(WelcomeMessage { id: None }));
    }

    #[test]
    fn pong_reads_times() {
        let msg = ServerMessage::parse(r#"{"type":"pong","clientTime":5,"serverTime":9}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Pong(PongMessage {
                client_time: Some(5),
                server_time: Some(9),
            })
        );
    }

    #[test]
    fn unknown_types_do_not_fail() {
        let msg = ServerMessage::parse(r#"{"type":"chat","text":"hi"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(ServerMessage::parse("not json").is_err());
        assert!(ServerMessage::parse(r#"{"players":[]}"#).is_err());
    }
}
