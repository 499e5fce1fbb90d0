//! Test fixtures and helpers.
//!
//! Hand-built maps for scenario tests. Maps are drawn with the same
//! glyphs [`MapGrid::from_ascii`] reads, or stamped onto a blank grid.

use mapgen_core::grid::{Building, MapGrid, Pos, Terrain};
use mapgen_core::placement::place_building;

/// Parse an ASCII map.
///
/// # Panics
///
/// Panics if the rows are ragged or contain an unknown glyph.
#[must_use]
pub fn ascii_map(rows: &[&str]) -> MapGrid {
    MapGrid::from_ascii(rows).unwrap_or_else(|| panic!("bad fixture map: {rows:?}"))
}

/// An all-grass map.
#[must_use]
pub fn grass(width: u32, height: u32) -> MapGrid {
    MapGrid::new(width, height)
}

/// Fill the rectangle `[x0, x1) x [y0, y1)` with `terrain`.
pub fn fill_rect(grid: &mut MapGrid, x0: i32, y0: i32, x1: i32, y1: i32, terrain: Terrain) {
    for y in y0..y1 {
        for x in x0..x1 {
            grid.set_terrain(Pos::new(x, y), terrain);
        }
    }
}

/// Put a city with a `size`-wide footprint at `anchor`.
pub fn add_city(grid: &mut MapGrid, anchor: Pos, size: u32) {
    place_building(grid, Building::City, anchor, size);
}

/// A `width` x `height` grass map cut in two by an unbroken mountain band
/// `thickness` rows deep across the middle, with a 2x2 city above and
/// below it.
///
/// Returns the map and the two city anchors (north city first).
#[must_use]
pub fn mountain_band(width: u32, height: u32, thickness: u32) -> (MapGrid, Pos, Pos) {
    let mut grid = grass(width, height);
    let top = (height - thickness) as i32 / 2;
    fill_rect(
        &mut grid,
        0,
        top,
        width as i32,
        top + thickness as i32,
        Terrain::Mountain,
    );
    let north = Pos::new(width as i32 / 2 - 1, top / 2);
    let south = Pos::new(width as i32 / 4, top + thickness as i32 + (height as i32 - top - thickness as i32) / 2);
    add_city(&mut grid, north, 2);
    add_city(&mut grid, south, 2);
    (grid, north, south)
}

/// A grass map crossed east to west by a two-cell water channel: the
/// shape a bridge can span.
#[must_use]
pub fn strait(width: u32, height: u32) -> MapGrid {
    let mut grid = grass(width, height);
    let row = height as i32 / 2 - 1;
    fill_rect(&mut grid, 0, row, width as i32, row + 2, Terrain::Water);
    grid
}

/// Count cells with `terrain`.
#[must_use]
pub fn count_terrain(grid: &MapGrid, terrain: Terrain) -> usize {
    grid.terrain_grid().count(|t| t == terrain)
}

/// Count cells with `building`.
#[must_use]
pub fn count_building(grid: &MapGrid, building: Building) -> usize {
    grid.building_grid().count(|b| b == building)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mountain_band_splits_map() {
        let (grid, north, south) = mountain_band(20, 20, 4);
        assert_eq!(count_terrain(&grid, Terrain::Mountain), 80);
        assert!(north.y < 8);
        assert!(south.y >= 12);
        assert_eq!(count_building(&grid, Building::City), 8);
    }

    #[test]
    fn test_strait_has_two_rows_of_water() {
        let grid = strait(16, 10);
        assert_eq!(count_terrain(&grid, Terrain::Water), 32);
        assert!(grid.is(Pos::new(0, 4), Terrain::Water));
        assert!(grid.is(Pos::new(0, 5), Terrain::Water));
    }
}
