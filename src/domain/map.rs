/// The tile grid of a level.
///
/// ## Text encodings
///
///   - **Legacy** (`1`): one character per tile, terrain only.
///   - **Current** (`2`): two characters per tile, terrain + item. The last
///     line of the file carries metadata and is dropped.
///
/// Rows are trimmed before decoding. The grid is stored flat and addressed
/// row-major: `index = y * columns + x`.

use std::path::Path;

use super::grid::Point;
use super::tile::Tile;
use crate::error::{LoadError, Result};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MapFormat {
    Legacy,
    Current,
}

impl MapFormat {
    /// Numeric format id as written in level descriptions.
    pub fn from_id(id: i64) -> Result<MapFormat> {
        match id {
            1 => Ok(MapFormat::Legacy),
            2 => Ok(MapFormat::Current),
            other => Err(LoadError::UnsupportedFormat(other)),
        }
    }

    fn tile_width(self) -> usize {
        match self {
            MapFormat::Legacy => 1,
            MapFormat::Current => 2,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Map {
    tiles: Vec<Tile>,
    columns: usize,
    rows: usize,
}

impl Map {
    /// Read and decode a map file.
    pub fn from_file(path: &Path, format: MapFormat) -> Result<Map> {
        tracing::info!("Loading map from {}", path.display());

        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut map = Map::default();
        map.load(&text, format)
            .map_err(|_| LoadError::EmptyMap(path.display().to_string()))?;
        Ok(map)
    }

    /// Decode `source` and replace the grid. Returns the new `(columns, rows)`.
    /// On failure the previous grid is kept.
    pub fn load(&mut self, source: &str, format: MapFormat) -> Result<(usize, usize)> {
        let mut rows: Vec<&str> = source.trim().split('\n').collect();

        if format == MapFormat::Current {
            rows.pop();
        }

        let rows: Vec<&str> = rows.into_iter().map(str::trim).collect();
        if rows.is_empty() || (rows.len() == 1 && rows[0].is_empty()) {
            return Err(LoadError::EmptyMap(String::from("<text>")));
        }

        let width = format.tile_width();
        let mut tiles = Vec::new();
        for row in &rows {
            let chars: Vec<char> = row.chars().collect();
            for spec in chars.chunks(width) {
                let spec: String = spec.iter().collect();
                tiles.push(Tile::from_spec(&spec));
            }
        }

        let row_count = rows.len();
        let columns = tiles.len() / row_count;
        if columns * row_count != tiles.len() {
            tracing::warn!(
                "map is not rectangular: {} tiles in {} rows, using {} columns",
                tiles.len(), row_count, columns,
            );
        }

        self.tiles = tiles;
        self.rows = row_count;
        self.columns = columns;
        Ok((self.columns, self.rows))
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of addressable tiles (`columns * rows`).
    pub fn len(&self) -> usize {
        self.columns * self.rows
    }

    /// Is `p` inside `[0, columns) x [0, rows)`?
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.columns && (p.y as usize) < self.rows
    }

    pub fn index_of(&self, p: Point) -> usize {
        p.y as usize * self.columns + p.x as usize
    }

    pub fn point_of(&self, index: usize) -> Point {
        if self.columns == 0 {
            return Point::default();
        }
        Point::new((index % self.columns) as i32, (index / self.columns) as i32)
    }

    /// Tile at a flat index, if addressable.
    pub fn tile_at_index(&self, index: usize) -> Option<&Tile> {
        if index < self.len() { self.tiles.get(index) } else { None }
    }

    /// Tile at `(x, y)`. Callers check bounds first; out-of-range is `None`.
    pub fn tile_at(&self, p: Point) -> Option<&Tile> {
        if !self.contains(p) { return None; }
        self.tile_at_index(self.index_of(p))
    }

    pub fn is_walkable(&self, p: Point) -> bool {
        self.tile_at(p).map_or(false, |t| t.is_walkable())
    }

    /// Drop the declared-spawn flag of a tile (validation diagnostics).
    pub fn clear_declared_spawn(&mut self, index: usize) {
        if index < self.len() {
            if let Some(tile) = self.tiles.get_mut(index) {
                tile.declared_spawn = false;
            }
        }
    }

    /// Iterate addressable tiles with their flat index.
    pub fn tiles(&self) -> impl Iterator<Item = (usize, &Tile)> {
        self.tiles.iter().take(self.len()).enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{Item, Terrain};

    fn legacy(text: &str) -> Map {
        let mut map = Map::default();
        map.load(text, MapFormat::Legacy).unwrap();
        map
    }

    #[test]
    fn legacy_row_with_gap_and_deep_water() {
        let mut map = Map::default();
        assert_eq!(map.load("GG WW", MapFormat::Legacy).unwrap(), (5, 1));
        let tile = map.tile_at(Point::new(3, 0)).unwrap();
        assert_eq!(tile.terrain, Terrain::DeepWater);
        assert!(!map.is_walkable(Point::new(3, 0)));
        assert!(map.is_walkable(Point::new(0, 0)));
        assert!(!map.is_walkable(Point::new(2, 0)));
    }

    #[test]
    fn current_format_drops_metadata_row() {
        let mut map = Map::default();
        let dims = map.load("G GPG@\nGCw GL\nmeta: something\n", MapFormat::Current).unwrap();
        assert_eq!(dims, (3, 2));
        assert_eq!(map.tile_at(Point::new(1, 0)).unwrap().item, Some(Item::Player));
        assert_eq!(map.tile_at(Point::new(2, 0)).unwrap().item, Some(Item::Tree));
        assert_eq!(map.tile_at(Point::new(0, 1)).unwrap().item, Some(Item::Chest));
        let water = map.tile_at(Point::new(1, 1)).unwrap();
        assert_eq!(water.terrain, Terrain::Water);
        assert_eq!(water.item, None);
    }

    #[test]
    fn second_char_is_never_terrain() {
        let mut map = Map::default();
        map.load("WwGG\nmeta\n", MapFormat::Current).unwrap();
        let tile = map.tile_at(Point::new(0, 0)).unwrap();
        assert_eq!(tile.terrain, Terrain::DeepWater);
        assert_eq!(tile.item, None);
    }

    #[test]
    fn rows_are_trimmed() {
        let map = legacy("  GGG  \nGMG\n");
        assert_eq!((map.columns(), map.rows()), (3, 2));
        assert!(!map.is_walkable(Point::new(1, 1)));
    }

    #[test]
    fn index_is_row_major() {
        let map = legacy("GGG\nGGG");
        assert_eq!(map.index_of(Point::new(2, 1)), 5);
        assert_eq!(map.point_of(5), Point::new(2, 1));
    }

    #[test]
    fn out_of_range_queries_return_none() {
        let map = legacy("GG\nGG");
        assert!(map.tile_at(Point::new(-1, 0)).is_none());
        assert!(map.tile_at(Point::new(2, 0)).is_none());
        assert!(map.tile_at(Point::new(0, 2)).is_none());
    }

    #[test]
    fn non_rectangular_map_is_accepted() {
        let map = legacy("GGGG\nGG");
        assert_eq!((map.columns(), map.rows()), (3, 2));
        assert_eq!(map.len(), 6);
    }

    #[test]
    fn empty_source_keeps_previous_grid() {
        let mut map = legacy("GG");
        assert!(map.load("  \n ", MapFormat::Legacy).is_err());
        assert_eq!((map.columns(), map.rows()), (2, 1));
    }

    #[test]
    fn unknown_format_id_is_rejected() {
        assert!(MapFormat::from_id(3).is_err());
        assert_eq!(MapFormat::from_id(2).unwrap(), MapFormat::Current);
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = Map::from_file(Path::new("/nonexistent/map.txt"), MapFormat::Legacy).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
