use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::state::{MobState, Npc};
use crate::tile::{SpawnPoint, TileKind, TileMap};

const DEFAULT_MOB_HP: i32 = 60;
const DEFAULT_MOB_DAMAGE: i32 = 8;
const DEFAULT_MOB_PATROL_RADIUS: f64 = 5.0;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("read map file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse map file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid map dimensions {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    #[error("expected {expected} rows, got {got}")]
    RowCount { expected: usize, got: usize },

    #[error("row {row}: expected {expected} tiles, got {got}")]
    RowWidth {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("row {row}: unknown tile character {ch:?}")]
    UnknownTile { row: usize, ch: char },
}

/// On-disk map document. Rows are strings of `.` `~` `#` `^` for grass,
/// water, wall and forest.
#[derive(Debug, Deserialize)]
struct MapFile {
    width: i64,
    height: i64,
    spawn: SpawnPoint,
    rows: Vec<String>,
    #[serde(default)]
    npcs: Vec<NpcEntry>,
    #[serde(default)]
    mobs: Vec<MobEntry>,
}

#[derive(Debug, Deserialize)]
struct NpcEntry {
    id: String,
    name: String,
    role: String,
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct MobEntry {
    id: String,
    name: String,
    x: f64,
    y: f64,
    #[serde(default)]
    hp: i32,
    #[serde(default)]
    damage: i32,
    #[serde(default)]
    patrol_radius: f64,
}

/// A parsed map ready to seed a zone.
#[derive(Debug, Clone)]
pub struct LoadedMap {
    pub map: TileMap,
    pub npcs: Vec<Npc>,
    pub mobs: Vec<MobState>,
}

pub fn load_map(path: &Path, zone_id: &str) -> Result<LoadedMap, MapError> {
    let raw = fs::read_to_string(path)?;
    parse_map(&raw, zone_id)
}

pub fn parse_map(raw: &str, zone_id: &str) -> Result<LoadedMap, MapError> {
    let data: MapFile = serde_json::from_str(raw)?;
    if data.width <= 0 || data.height <= 0 {
        return Err(MapError::InvalidDimensions {
            width: data.width,
            height: data.height,
        });
    }
    let width = data.width as usize;
    let height = data.height as usize;
    if data.rows.len() != height {
        return Err(MapError::RowCount {
            expected: height,
            got: data.rows.len(),
        });
    }

    let mut tiles = Vec::with_capacity(height);
    for (y, row) in data.rows.iter().enumerate() {
        let got = row.chars().count();
        if got != width {
            return Err(MapError::RowWidth {
                row: y,
                expected: width,
                got,
            });
        }
        let mut parsed = Vec::with_capacity(width);
        for ch in row.chars() {
            parsed.push(match ch {
                '.' => TileKind::Grass,
                '~' => TileKind::Water,
                '#' => TileKind::Wall,
                '^' => TileKind::Forest,
                other => return Err(MapError::UnknownTile { row: y, ch: other }),
            });
        }
        tiles.push(parsed);
    }

    let npcs = data
        .npcs
        .into_iter()
        .map(|npc| Npc {
            id: npc.id,
            name: npc.name,
            role: npc.role,
            x: npc.x,
            y: npc.y,
            zone_id: zone_id.to_string(),
        })
        .collect();

    let mobs = data
        .mobs
        .into_iter()
        .filter(|m| !m.id.is_empty())
        .map(|m| {
            let hp = if m.hp > 0 { m.hp } else { DEFAULT_MOB_HP };
            let damage = if m.damage > 0 { m.damage } else { DEFAULT_MOB_DAMAGE };
            let patrol_radius = if m.patrol_radius > 0.0 {
                m.patrol_radius
            } else {
                DEFAULT_MOB_PATROL_RADIUS
            };
            MobState {
                id: m.id,
                name: m.name,
                x: m.x,
                y: m.y,
                hp,
                max_hp: hp,
                damage,
                patrol_radius,
                zone_id: zone_id.to_string(),
                alive: true,
            }
        })
        .collect();

    Ok(LoadedMap {
        map: TileMap {
            width,
            height,
            spawn: data.spawn,
            tiles,
        },
        npcs,
        mobs,
    })
}

/// Deterministic built-in world used when the configured map cannot be
/// loaded: a 50x50 grass field walled at the border, one merchant, one
/// slime. Keeps the service usable with no data files at all.
pub fn fallback_world(zone_id: &str) -> LoadedMap {
    let width = 50;
    let height = 50;
    let tiles = (0..height)
        .map(|y| {
            (0..width)
                .map(|x| {
                    if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                        TileKind::Wall
                    } else {
                        TileKind::Grass
                    }
                })
                .collect()
        })
        .collect();

    LoadedMap {
        map: TileMap {
            width,
            height,
            spawn: SpawnPoint { x: 2.5, y: 2.5 },
            tiles,
        },
        npcs: vec![Npc {
            id: "npc-merchant-1".to_string(),
            name: "Rurik".to_string(),
            role: "merchant".to_string(),
            x: 5.0,
            y: 5.0,
            zone_id: zone_id.to_string(),
        }],
        mobs: vec![MobState {
            id: "mob-slime-1".to_string(),
            name: "Green Slime".to_string(),
            x: 14.0,
            y: 12.0,
            hp: 60,
            max_hp: 60,
            damage: 8,
            patrol_radius: 6.0,
            zone_id: zone_id.to_string(),
            alive: true,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ZONE: &str = "starter-zone";

    fn tiny_map_json() -> String {
        serde_json::json!({
            "width": 4,
            "height": 3,
            "spawn": {"x": 1.5, "y": 1.5},
            "rows": ["####", "#.~#", "####"],
            "npcs": [{"id": "npc-1", "name": "Rurik", "role": "merchant", "x": 1.0, "y": 1.0}],
            "mobs": [{"id": "mob-1", "name": "Slime", "x": 1.0, "y": 1.0}]
        })
        .to_string()
    }

    #[test]
    fn parses_tiles_npcs_and_mobs() {
        let loaded = parse_map(&tiny_map_json(), ZONE).unwrap();
        assert_eq!(loaded.map.width, 4);
        assert_eq!(loaded.map.height, 3);
        assert_eq!(loaded.map.tiles[1][1], TileKind::Grass);
        assert_eq!(loaded.map.tiles[1][2], TileKind::Water);
        assert_eq!(loaded.map.tiles[0][0], TileKind::Wall);

        assert_eq!(loaded.npcs.len(), 1);
        assert_eq!(loaded.npcs[0].zone_id, ZONE);

        assert_eq!(loaded.mobs.len(), 1);
        let mob = &loaded.mobs[0];
        assert!(mob.alive);
        assert_eq!(mob.hp, 60);
        assert_eq!(mob.max_hp, 60);
        assert_eq!(mob.damage, 8);
        assert_eq!(mob.patrol_radius, 5.0);
    }

    #[test]
    fn mob_defaults_only_fill_missing_values() {
        let raw = serde_json::json!({
            "width": 2,
            "height": 1,
            "spawn": {"x": 0.5, "y": 0.5},
            "rows": [".."],
            "mobs": [
                {"id": "mob-1", "name": "Wolf", "x": 1.0, "y": 0.5, "hp": 80, "damage": 12, "patrol_radius": 3.5},
                {"id": "", "name": "nameless", "x": 0.0, "y": 0.0}
            ]
        })
        .to_string();
        let loaded = parse_map(&raw, ZONE).unwrap();
        // The empty-id mob is dropped.
        assert_eq!(loaded.mobs.len(), 1);
        assert_eq!(loaded.mobs[0].hp, 80);
        assert_eq!(loaded.mobs[0].damage, 12);
        assert_eq!(loaded.mobs[0].patrol_radius, 3.5);
    }

    #[test]
    fn rejects_bad_dimensions() {
        let raw = r#"{"width": 0, "height": 3, "spawn": {"x": 1, "y": 1}, "rows": []}"#;
        assert!(matches!(
            parse_map(raw, ZONE),
            Err(MapError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn rejects_row_count_mismatch() {
        let raw = r#"{"width": 2, "height": 3, "spawn": {"x": 1, "y": 1}, "rows": ["..", ".."]}"#;
        assert!(matches!(
            parse_map(raw, ZONE),
            Err(MapError::RowCount { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn rejects_row_width_mismatch() {
        let raw = r#"{"width": 3, "height": 2, "spawn": {"x": 1, "y": 1}, "rows": ["...", ".."]}"#;
        assert!(matches!(
            parse_map(raw, ZONE),
            Err(MapError::RowWidth { row: 1, .. })
        ));
    }

    #[test]
    fn rejects_unknown_tile_character() {
        let raw = r#"{"width": 2, "height": 1, "spawn": {"x": 1, "y": 1}, "rows": [".X"]}"#;
        assert!(matches!(
            parse_map(raw, ZONE),
            Err(MapError::UnknownTile { row: 0, ch: 'X' })
        ));
    }

    #[test]
    fn load_map_reads_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", tiny_map_json()).unwrap();
        let loaded = load_map(file.path(), ZONE).unwrap();
        assert_eq!(loaded.map.width, 4);
    }

    #[test]
    fn load_map_missing_file_fails() {
        let result = load_map(Path::new("/nonexistent/zone.json"), ZONE);
        assert!(matches!(result, Err(MapError::Io(_))));
    }

    #[test]
    fn fallback_world_is_usable() {
        let loaded = fallback_world(ZONE);
        assert_eq!(loaded.map.width, 50);
        assert_eq!(loaded.map.height, 50);
        assert!(loaded.map.walkable(loaded.map.spawn.x, loaded.map.spawn.y));
        // Border is sealed.
        assert_eq!(loaded.map.tile_at(0.5, 25.0), TileKind::Wall);
        assert_eq!(loaded.map.tile_at(49.5, 25.0), TileKind::Wall);
        assert_eq!(loaded.npcs.len(), 1);
        assert_eq!(loaded.mobs.len(), 1);
        let slime = &loaded.mobs[0];
        assert!(loaded.map.walkable(slime.x, slime.y));
        assert!(slime.alive);
    }
}
