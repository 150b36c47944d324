pub mod character;
pub mod events;
pub mod mapfile;
mod mobs;
pub mod protocol;
pub mod service;
pub mod session;
pub mod state;
pub mod tile;

pub use character::{Character, CharacterError, CharacterStore};
pub use events::{EventPublisher, LogPublisher, NoopPublisher};
pub use mapfile::{fallback_world, load_map, parse_map, LoadedMap, MapError};
pub use protocol::{parse_client_message, ClientMessage, ServerMessage};
pub use service::{WorldConfig, WorldService};
pub use session::{SessionId, OUTBOUND_QUEUE_CAPACITY};
pub use state::{MobState, Npc, PlayerState, WorldSnapshot, ZoneState};
pub use tile::{SpawnPoint, TileKind, TileMap};
