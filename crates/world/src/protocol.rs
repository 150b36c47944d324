use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{MobState, PlayerState, ZoneState};

/// Client-to-server message (internally tagged JSON).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join { character_id: String },
    Move { dx: f64, dy: f64 },
    Attack { target_id: String },
}

/// Server-to-client message (internally tagged JSON). Key names are part of
/// the deployed client contract and must not change, including the
/// camel-case `selfId` in the welcome frame and the `attacker`/`target`
/// pair used by combat events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        #[serde(rename = "selfId")]
        self_id: Uuid,
        character: PlayerState,
        zone_id: String,
        world: ZoneState,
    },
    PlayerJoined {
        player: PlayerState,
    },
    PlayerLeft {
        player_id: Uuid,
    },
    PlayerMoved {
        player_id: Uuid,
        x: f64,
        y: f64,
    },
    MobUpdate {
        mobs: Vec<MobState>,
    },
    Combat {
        attacker: String,
        target: String,
        damage: i32,
    },
    MobDied {
        mob_id: String,
    },
    PlayerDied {
        player_id: Uuid,
    },
    PlayerUpdate {
        player: PlayerState,
    },
    Broadcast {
        message: String,
    },
    Error {
        message: String,
    },
}

/// Parse an inbound frame, classifying failures for the error frame sent
/// back: a recognized `type` with a bad payload is an invalid message, any
/// other shape is an unknown message type.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, &'static str> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => Ok(msg),
        Err(_) => {
            let kind = serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_owned));
            match kind.as_deref() {
                Some("join") | Some("move") | Some("attack") => Err("invalid message"),
                _ => Err("unknown message type"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{SpawnPoint, TileKind, TileMap};

    fn sample_player() -> PlayerState {
        PlayerState {
            id: Uuid::nil(),
            name: "Aria".to_string(),
            x: 2.5,
            y: 2.5,
            hp: 100,
            max_hp: 100,
            class: "mage".to_string(),
            level: 1,
            experience: 0,
            gold: 0,
            zone_id: "starter-zone".to_string(),
        }
    }

    #[test]
    fn deserialize_join() {
        let msg = parse_client_message(r#"{"type":"join","character_id":"abc"}"#).unwrap();
        match msg {
            ClientMessage::Join { character_id } => assert_eq!(character_id, "abc"),
            other => panic!("expected Join, got {other:?}"),
        }
    }

    #[test]
    fn deserialize_move() {
        let msg = parse_client_message(r#"{"type":"move","dx":-1,"dy":0.5}"#).unwrap();
        match msg {
            ClientMessage::Move { dx, dy } => {
                assert_eq!(dx, -1.0);
                assert_eq!(dy, 0.5);
            }
            other => panic!("expected Move, got {other:?}"),
        }
    }

    #[test]
    fn deserialize_attack() {
        let msg = parse_client_message(r#"{"type":"attack","target_id":"mob-slime-1"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Attack { target_id } if target_id == "mob-slime-1"));
    }

    #[test]
    fn unknown_type_is_classified() {
        assert_eq!(
            parse_client_message(r#"{"type":"dance"}"#),
            Err("unknown message type")
        );
        assert_eq!(parse_client_message("not json"), Err("unknown message type"));
        assert_eq!(parse_client_message(r#"{"dx":1}"#), Err("unknown message type"));
    }

    #[test]
    fn bad_payload_on_known_type() {
        assert_eq!(
            parse_client_message(r#"{"type":"move","dx":"left"}"#),
            Err("invalid message")
        );
    }

    #[test]
    fn welcome_uses_camel_case_self_id() {
        let player = sample_player();
        let msg = ServerMessage::Welcome {
            self_id: player.id,
            character: player.clone(),
            zone_id: "starter-zone".to_string(),
            world: ZoneState {
                zone_id: "starter-zone".to_string(),
                map: TileMap {
                    width: 1,
                    height: 1,
                    spawn: SpawnPoint { x: 0.5, y: 0.5 },
                    tiles: vec![vec![TileKind::Grass]],
                },
                players: vec![player],
                mobs: vec![],
                npcs: vec![],
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"welcome""#));
        assert!(json.contains(r#""selfId""#));
        assert!(json.contains(r#""world""#));
        assert!(!json.contains("self_id"));
    }

    #[test]
    fn combat_keeps_attacker_target_keys() {
        let msg = ServerMessage::Combat {
            attacker: "mob-slime-1".to_string(),
            target: Uuid::nil().to_string(),
            damage: 8,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"combat""#));
        assert!(json.contains(r#""attacker":"mob-slime-1""#));
        assert!(json.contains(r#""damage":8"#));
    }

    #[test]
    fn movement_and_error_frames() {
        let moved = ServerMessage::PlayerMoved {
            player_id: Uuid::nil(),
            x: 1.5,
            y: 2.0,
        };
        let json = serde_json::to_string(&moved).unwrap();
        assert!(json.contains(r#""type":"player_moved""#));
        assert!(json.contains(r#""player_id""#));

        let err = ServerMessage::Error {
            message: "target out of range".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"type":"error","message":"target out of range"}"#);
    }
}
