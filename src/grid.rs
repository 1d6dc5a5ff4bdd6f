use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const GRID_SEED_SALT: u64 = 0x6772_6964_7365_6564;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    #[default]
    Grass,
    Water,
    Forest,
    Hill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Tile map the city is built on. Terrain is stored row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityGrid {
    width: u32,
    height: u32,
    terrain: Vec<Terrain>,
}

impl CityGrid {
    pub fn flat(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            terrain: vec![Terrain::Grass; (width * height) as usize],
        }
    }

    /// Deterministic terrain: one meandering river plus scattered forest and hills.
    pub fn generate(width: u32, height: u32, seed: u64) -> Self {
        let mut grid = Self::flat(width, height);
        if width < 4 || height == 0 {
            return grid;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ GRID_SEED_SALT);

        let mut river_x = (width as i32 * 2) / 3;
        let river_width = if width >= 24 { 2 } else { 1 };
        for y in 0..height as i32 {
            river_x = (river_x + rng.gen_range(-1..=1)).clamp(1, width as i32 - 1 - river_width);
            for offset in 0..river_width {
                grid.set_terrain(Position::new(river_x + offset, y), Terrain::Water);
            }
        }

        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let pos = Position::new(x, y);
                if grid.terrain_at(pos) != Terrain::Grass {
                    continue;
                }
                let roll: f64 = rng.gen();
                if roll < 0.06 {
                    grid.set_terrain(pos, Terrain::Forest);
                } else if roll < 0.09 {
                    grid.set_terrain(pos, Terrain::Hill);
                }
            }
        }
        grid
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    /// Terrain at `pos`, falling back to grass outside the map or for truncated terrain data.
    pub fn terrain_at(&self, pos: Position) -> Terrain {
        self.index(pos)
            .and_then(|idx| self.terrain.get(idx).copied())
            .unwrap_or_default()
    }

    pub fn set_terrain(&mut self, pos: Position, terrain: Terrain) -> bool {
        match self.index(pos).and_then(|idx| self.terrain.get_mut(idx)) {
            Some(slot) => {
                *slot = terrain;
                true
            }
            None => false,
        }
    }

    pub fn is_buildable(&self, pos: Position) -> bool {
        self.contains(pos) && self.terrain_at(pos) != Terrain::Water
    }

    pub fn has_water(&self) -> bool {
        self.terrain.iter().any(|t| *t == Terrain::Water)
    }

    pub fn tiles_of(&self, terrain: Terrain) -> Vec<Position> {
        let mut tiles = Vec::new();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let pos = Position::new(x, y);
                if self.terrain_at(pos) == terrain {
                    tiles.push(pos);
                }
            }
        }
        tiles
    }

    /// In-grid tiles whose distance to `center` is at most `radius`, with that distance.
    pub fn tiles_within(&self, center: Position, radius: f64) -> Vec<(Position, f64)> {
        let reach = radius.max(0.0).ceil() as i32;
        let mut tiles = Vec::new();
        for y in (center.y - reach)..=(center.y + reach) {
            for x in (center.x - reach)..=(center.x + reach) {
                let pos = Position::new(x, y);
                if !self.contains(pos) {
                    continue;
                }
                let distance = center.distance(pos);
                if distance <= radius {
                    tiles.push((pos, distance));
                }
            }
        }
        tiles
    }

    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let a = CityGrid::generate(48, 32, 11);
        let b = CityGrid::generate(48, 32, 11);
        assert_eq!(a.tiles_of(Terrain::Water), b.tiles_of(Terrain::Water));
        assert_eq!(a.tiles_of(Terrain::Forest), b.tiles_of(Terrain::Forest));
    }

    #[test]
    fn generated_river_spans_every_row() {
        let grid = CityGrid::generate(48, 32, 3);
        for y in 0..32 {
            let has_water = (0..48).any(|x| grid.terrain_at(Position::new(x, y)) == Terrain::Water);
            assert!(has_water, "row {y} should contain river tiles");
        }
    }

    #[test]
    fn out_of_range_defaults_to_grass() {
        let mut grid = CityGrid::flat(4, 4);
        grid.set_terrain(Position::new(1, 1), Terrain::Water);
        assert_eq!(grid.terrain_at(Position::new(1, 1)), Terrain::Water);
        assert_eq!(grid.terrain_at(Position::new(-3, 9)), Terrain::Grass);
        assert!(!grid.is_buildable(Position::new(1, 1)));
        assert!(!grid.is_buildable(Position::new(4, 0)));
        assert!(grid.is_buildable(Position::new(0, 0)));
    }

    #[test]
    fn tiles_within_clips_to_grid() {
        let grid = CityGrid::flat(10, 10);
        let tiles = grid.tiles_within(Position::new(0, 0), 1.0);
        assert_eq!(tiles.len(), 3);
        assert!(tiles.iter().all(|(pos, _)| grid.contains(*pos)));
    }
}
