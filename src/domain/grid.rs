/// Grid: the level's tile layer, row-major.
///
/// The grid is the only source of tile-type truth for movement and
/// the only thing effects mutate (a collapsed floor becomes a hole).
/// Every lookup is bounds-safe: positions off the map return `None`
/// and writes off the map are ignored.

use super::entity::Position;
use super::tile::TileType;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    tiles: Vec<TileType>,
    width: usize,
    height: usize,
}

impl Grid {
    /// Build from rows. Short rows are padded with `Empty`.
    pub fn from_rows(rows: Vec<Vec<TileType>>) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut tiles = Vec::with_capacity(width * height);
        for mut row in rows {
            row.resize(width, TileType::Empty);
            tiles.extend(row);
        }
        Grid { tiles, width, height }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn is_in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    #[inline]
    fn offset(&self, pos: Position) -> Option<usize> {
        if self.is_in_bounds(pos) {
            Some(pos.y as usize * self.width + pos.x as usize)
        } else {
            None
        }
    }

    /// Tile at `pos`, or `None` off the map.
    #[inline]
    pub fn get_tile(&self, pos: Position) -> Option<TileType> {
        self.offset(pos).map(|i| self.tiles[i])
    }

    /// Overwrite one cell. Returns false (and does nothing) off the map.
    pub fn set_tile(&mut self, pos: Position, tile: TileType) -> bool {
        match self.offset(pos) {
            Some(i) => {
                self.tiles[i] = tile;
                true
            }
            None => false,
        }
    }

    /// Every cell holding `tile`, in row-major order.
    pub fn find_positions(&self, tile: TileType) -> Vec<Position> {
        self.tiles.iter()
            .enumerate()
            .filter(|(_, t)| **t == tile)
            .map(|(i, _)| Position::new((i % self.width) as i32, (i / self.width) as i32))
            .collect()
    }

    /// Build a grid from a diagram in the level alphabet (test helper).
    #[cfg(test)]
    pub fn from_diagram(rows: &[&str]) -> Self {
        Grid::from_rows(
            rows.iter()
                .map(|r| r.chars().map(|c| TileType::from_symbol(c).unwrap_or_default()).collect())
                .collect(),
        )
    }

    /// Longest straight line across the map; bounds any slide.
    #[cfg(test)]
    pub fn span(&self) -> usize {
        self.width.max(self.height)
    }
}
