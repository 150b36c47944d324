use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tile::TileMap;

/// Runtime state of a connected player, broadcast verbatim on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: Uuid,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub hp: i32,
    pub max_hp: i32,
    pub class: String,
    pub level: i32,
    pub experience: i32,
    pub gold: i32,
    pub zone_id: String,
}

impl PlayerState {
    /// Grant experience and resolve any level-ups. Each level costs
    /// `level * 100` experience and raises max hp by 20 with a full heal.
    pub fn grant_experience(&mut self, amount: i32) {
        self.experience += amount;
        while self.experience >= self.level * 100 {
            self.experience -= self.level * 100;
            self.level += 1;
            self.max_hp += 20;
            self.hp = self.max_hp;
        }
    }
}

/// Wire-visible state of a mob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobState {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub hp: i32,
    pub max_hp: i32,
    pub damage: i32,
    pub patrol_radius: f64,
    pub zone_id: String,
    pub alive: bool,
}

/// A static NPC. Placed by the map loader, never moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub role: String,
    pub x: f64,
    pub y: f64,
    pub zone_id: String,
}

/// Full world snapshot served over the read-only HTTP endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub zone_id: String,
    pub map: TileMap,
    pub players: Vec<PlayerState>,
    pub npcs: Vec<Npc>,
    pub mobs: Vec<MobState>,
}

/// Zone contents carried inside the `welcome` frame.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneState {
    pub zone_id: String,
    pub map: TileMap,
    pub players: Vec<PlayerState>,
    pub mobs: Vec<MobState>,
    pub npcs: Vec<Npc>,
}
