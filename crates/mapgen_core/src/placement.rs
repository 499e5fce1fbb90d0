//! Phased, spaced placement of cities, ruins, temples and signposts.
//!
//! Candidates are tried on grass first, then on rough land (forest,
//! hills, mountains, swamp), and only then on open water, which turns the
//! site into a small island. Each phase wants the whole footprint on its
//! own terrain, so a block straddling grass and forest fits none of them.
//! A site must keep clear of the map border and of every existing building.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::grid::{Building, MapGrid, Pos, Terrain};
use crate::rng::MapRng;

/// Kinds of object placed by [`place_buildings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Walled city, `city_size` cells square.
    City,
    /// Ruin to explore.
    Ruin,
    /// Temple offering quests.
    Temple,
    /// Single-cell signpost.
    Signpost,
}

impl BuildingKind {
    /// Building tag written to the grid.
    #[must_use]
    pub const fn building(self) -> Building {
        match self {
            Self::City => Building::City,
            Self::Ruin => Building::Ruin,
            Self::Temple => Building::Temple,
            Self::Signpost => Building::Signpost,
        }
    }
}

/// Terrain a footprint may cover in each placement phase.
const PHASES: [&[Terrain]; 3] = [
    &[Terrain::Grass],
    &[
        Terrain::Forest,
        Terrain::Hills,
        Terrain::Mountain,
        Terrain::Swamp,
    ],
    &[Terrain::Water],
];

/// Place up to `count` objects of `kind` with a `footprint`-wide square
/// footprint. `spacing` is the overview scale factor, which widens both
/// the border margin and the gap to other buildings.
///
/// Placement stops short without error when the map runs out of sites.
/// Returns the number placed.
pub fn place_buildings(
    grid: &mut MapGrid,
    rng: &mut MapRng,
    kind: BuildingKind,
    count: u32,
    footprint: u32,
    spacing: u32,
) -> u32 {
    if count == 0 {
        return 0;
    }
    let footprint = footprint.max(1);
    let margin = footprint as i32;
    let mut candidates: Vec<Pos> = grid
        .positions()
        .filter(|&p| grid.is_interior(p, margin) && grid.has(p, Building::None))
        .collect();
    rng.shuffle(&mut candidates);

    let mut placed = 0;
    for (phase, allowed) in PHASES.iter().enumerate() {
        if placed == count {
            break;
        }
        let mut valid: Vec<Pos> = candidates
            .iter()
            .copied()
            .filter(|&p| site_is_valid(grid, p, footprint, spacing, allowed))
            .collect();
        rng.shuffle(&mut valid);

        for anchor in valid {
            if placed == count {
                break;
            }
            // Earlier placements in this phase may have taken the room
            if site_is_valid(grid, anchor, footprint, spacing, allowed) {
                place_building(grid, kind.building(), anchor, footprint);
                placed += 1;
            }
        }
        debug!(?kind, phase, placed, "Placement phase done");
    }

    debug!(?kind, requested = count, placed, footprint, "Placed buildings");
    placed
}

fn site_is_valid(grid: &MapGrid, anchor: Pos, footprint: u32, spacing: u32, allowed: &[Terrain]) -> bool {
    let size = footprint as i32;
    let border = spacing as i32 + 1;
    let far_corner = anchor.offset(size - 1, size - 1);
    if !grid.is_interior(anchor, border) || !grid.is_interior(far_corner, border) {
        return false;
    }
    let block_fits = (0..size).all(|dy| {
        (0..size).all(|dx| {
            grid.terrain(anchor.offset(dx, dy))
                .is_some_and(|t| allowed.contains(&t))
        })
    });
    block_fits && !grid.any_building_within(anchor, size + border)
}

/// Stamp `building` on the `footprint`-wide block at `anchor`.
///
/// The block becomes grass and any mountain touching it is worn down to
/// hills, so no building borders a mountain.
pub fn place_building(grid: &mut MapGrid, building: Building, anchor: Pos, footprint: u32) {
    let size = footprint.max(1) as i32;
    for dy in -1..=size {
        for dx in -1..=size {
            let pos = anchor.offset(dx, dy);
            let inside = (0..size).contains(&dx) && (0..size).contains(&dy);
            if inside {
                grid.set_terrain(pos, Terrain::Grass);
                grid.set_building(pos, building);
            } else if grid.is(pos, Terrain::Mountain) {
                grid.set_terrain(pos, Terrain::Hills);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::MapObjects;

    #[test]
    fn test_five_cities_on_open_grass() {
        let mut grid = MapGrid::new(30, 30);
        let mut rng = MapRng::new(11);
        let spacing = 1;
        let placed = place_buildings(&mut grid, &mut rng, BuildingKind::City, 5, 2, spacing);
        assert_eq!(placed, 5);

        let objects = MapObjects::scan(&grid);
        let cities: Vec<_> = objects.of_kind(Building::City).collect();
        assert_eq!(cities.len(), 5);
        assert_eq!(grid.building_grid().count(|b| b == Building::City), 20);
        for (i, a) in cities.iter().enumerate() {
            assert_eq!(a.size, 2);
            for b in &cities[i + 1..] {
                assert!(a.pos.chebyshev(b.pos) >= 2 * spacing + 3, "{a:?} too close to {b:?}");
            }
        }
    }

    #[test]
    fn test_zero_requested_places_nothing() {
        let mut grid = MapGrid::new(20, 20);
        let mut rng = MapRng::new(12);
        assert_eq!(place_buildings(&mut grid, &mut rng, BuildingKind::Ruin, 0, 1, 1), 0);
        assert_eq!(grid.building_grid().count(|b| b != Building::None), 0);
    }

    #[test]
    fn test_over_request_places_fewer() {
        let mut grid = MapGrid::new(16, 16);
        let mut rng = MapRng::new(13);
        let placed = place_buildings(&mut grid, &mut rng, BuildingKind::Temple, 100, 1, 1);
        assert!(placed > 0);
        assert!(placed < 100);
    }

    #[test]
    fn test_footprint_becomes_grass() {
        let mut grid = MapGrid::from_ascii(&[
            "MMMMMM", "MffffM", "MffffM", "MMMMMM",
        ])
        .unwrap();
        place_building(&mut grid, Building::City, Pos::new(1, 1), 2);
        assert!(grid.is(Pos::new(1, 1), Terrain::Grass));
        assert!(grid.is(Pos::new(2, 2), Terrain::Grass));
        assert!(grid.has(Pos::new(2, 2), Building::City));
        // The halo loses its mountains, cells further out keep them
        assert!(grid.is(Pos::new(0, 0), Terrain::Hills));
        assert!(grid.is(Pos::new(3, 3), Terrain::Hills));
        assert!(grid.is(Pos::new(4, 3), Terrain::Mountain));
        assert!(grid.is(Pos::new(3, 1), Terrain::Forest));
    }

    #[test]
    fn test_falls_back_to_water_islands() {
        let mut grid = MapGrid::new(20, 20);
        for pos in grid.positions().collect::<Vec<_>>() {
            grid.set_terrain(pos, Terrain::Water);
        }
        let mut rng = MapRng::new(14);
        let placed = place_buildings(&mut grid, &mut rng, BuildingKind::Ruin, 2, 1, 1);
        assert_eq!(placed, 2);
        let ruins: Vec<Pos> = grid.positions().filter(|&p| grid.has(p, Building::Ruin)).collect();
        assert!(ruins.iter().all(|&p| grid.is(p, Terrain::Grass)));
    }

    #[test]
    fn test_rough_land_used_when_no_grass_block() {
        let mut grid = MapGrid::new(20, 20);
        for pos in grid.positions().collect::<Vec<_>>() {
            grid.set_terrain(pos, Terrain::Hills);
        }
        let mut rng = MapRng::new(16);
        let placed = place_buildings(&mut grid, &mut rng, BuildingKind::City, 2, 2, 1);
        assert_eq!(placed, 2);
        assert_eq!(grid.building_grid().count(|b| b == Building::City), 8);
    }

    #[test]
    fn test_mixed_footprint_fits_no_phase() {
        // Grass and forest stripes: every 2x2 block holds both
        let mut grid = MapGrid::new(20, 20);
        for pos in grid.positions().collect::<Vec<_>>() {
            if pos.x % 2 == 1 {
                grid.set_terrain(pos, Terrain::Forest);
            }
        }
        let mut rng = MapRng::new(17);
        assert_eq!(place_buildings(&mut grid, &mut rng, BuildingKind::City, 3, 2, 1), 0);
        assert_eq!(grid.building_grid().count(|b| b != Building::None), 0);

        // Single cells still fit on either stripe
        assert!(place_buildings(&mut grid, &mut rng, BuildingKind::Ruin, 3, 1, 1) > 0);
    }

    #[test]
    fn test_prefers_grass() {
        let mut grid = MapGrid::new(24, 24);
        for pos in grid.positions().collect::<Vec<_>>() {
            if pos.x >= 12 {
                grid.set_terrain(pos, Terrain::Forest);
            }
        }
        let mut rng = MapRng::new(15);
        let placed = place_buildings(&mut grid, &mut rng, BuildingKind::Signpost, 2, 1, 1);
        assert_eq!(placed, 2);
        let signs: Vec<Pos> = grid.positions().filter(|&p| grid.has(p, Building::Signpost)).collect();
        assert!(signs.iter().all(|p| p.x < 12));
    }
}
