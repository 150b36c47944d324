use serde::{Deserialize, Serialize};

/// Tile kinds of the zone grid. Water and walls block movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    Grass,
    Water,
    Wall,
    Forest,
}

impl TileKind {
    pub fn walkable(self) -> bool {
        matches!(self, TileKind::Grass | TileKind::Forest)
    }
}

/// World coordinates where freshly joined players appear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f64,
    pub y: f64,
}

/// The static tile grid of a zone. `tiles` holds `height` rows of `width`
/// tiles each; it is built once by the map loader and never reshaped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileMap {
    pub width: usize,
    pub height: usize,
    pub spawn: SpawnPoint,
    pub tiles: Vec<Vec<TileKind>>,
}

impl TileMap {
    /// Tile under a world coordinate. Anything outside the grid counts as
    /// wall, so entities can never leave the map.
    pub fn tile_at(&self, x: f64, y: f64) -> TileKind {
        if x < 0.0 || y < 0.0 {
            return TileKind::Wall;
        }
        let tx = x.floor() as usize;
        let ty = y.floor() as usize;
        if tx >= self.width || ty >= self.height {
            return TileKind::Wall;
        }
        self.tiles[ty][tx]
    }

    pub fn walkable(&self, x: f64, y: f64) -> bool {
        self.tile_at(x, y).walkable()
    }

    /// Collision probe for an entity with radius `r`: the center plus the
    /// four axis-aligned edge points must all land on walkable tiles.
    pub fn walkable_radius(&self, x: f64, y: f64, r: f64) -> bool {
        let probes = [(x, y), (x - r, y), (x + r, y), (x, y - r), (x, y + r)];
        probes.iter().all(|&(px, py)| self.walkable(px, py))
    }
}
