//! Road network between cities, plus the standing stones that line it.

use tracing::debug;

use crate::grid::{Building, Direction, MapGrid, Pos, Terrain};
use crate::objects::MapObjects;
use crate::pathfinding::{GridPathfinder, Movement};
use crate::rng::MapRng;

/// Cities closer than this (Chebyshev, between anchors) are never joined
/// by a road of their own.
pub const MIN_ROAD_SPAN: u32 = 13;

/// Placement attempts allowed per requested standing stone.
const STONE_ATTEMPTS: u32 = 100;

/// Connect cities with roads.
///
/// Each city, in registry order, is joined to its nearest fellow city more
/// than [`MIN_ROAD_SPAN`] away, unless that city is already served by a
/// road within `city_size + 1` of its walls. Roads never cross water
/// without a bridge. Building stops once more than a third of the city
/// count in roads has been laid.
///
/// Returns the number of roads built.
pub fn connect_cities_with_roads(grid: &mut MapGrid, objects: &MapObjects, city_size: u32) -> u32 {
    let cities: Vec<_> = objects.of_kind(Building::City).copied().collect();
    let budget = cities.len() as u32 / 3;
    let mut built = 0;

    for city in &cities {
        let target = cities
            .iter()
            .filter(|other| other.pos != city.pos && other.pos.chebyshev(city.pos) > MIN_ROAD_SPAN)
            .min_by_key(|other| other.distance_to(city.pos));
        let Some(target) = target else {
            continue;
        };
        let served = grid
            .positions()
            .any(|p| grid.has(p, Building::Road) && target.distance_to(p) <= city_size + 1);
        if served {
            continue;
        }

        // A fresh search per road sees every road laid so far.
        let pathfinder = GridPathfinder::new(grid, city.pos, Movement::RoadBuilding);
        let Some(path) = pathfinder.path_to(target.pos) else {
            debug!(from = ?city.pos, to = ?target.pos, "No road route");
            continue;
        };
        let cells = build_road(grid, &path);
        built += 1;
        debug!(from = ?city.pos, to = ?target.pos, cells, "Built road");

        if built > budget {
            break;
        }
    }

    debug!(cities = cities.len(), built, "Connected cities");
    built
}

/// Lay road on every cell of `path` that has no building yet.
/// Returns the number of cells paved.
pub fn build_road(grid: &mut MapGrid, path: &[Pos]) -> usize {
    let mut paved = 0;
    for &pos in path {
        if grid.has(pos, Building::None) {
            grid.set_building(pos, Building::Road);
            paved += 1;
        }
    }
    paved
}

/// Remove road from water cells. Returns the number removed.
pub fn cleanup_roads(grid: &mut MapGrid) -> usize {
    let flooded: Vec<Pos> = grid
        .positions()
        .filter(|&p| grid.has(p, Building::Road) && grid.is(p, Terrain::Water))
        .collect();
    for &pos in &flooded {
        grid.set_building(pos, Building::None);
    }
    if !flooded.is_empty() {
        debug!(removed = flooded.len(), "Cleaned up flooded roads");
    }
    flooded.len()
}

fn stone_site(grid: &MapGrid, pos: Pos) -> bool {
    grid.has(pos, Building::None)
        && matches!(
            grid.terrain(pos),
            Some(Terrain::Grass | Terrain::Forest | Terrain::Hills | Terrain::Swamp)
        )
}

/// Scatter up to `count` standing stones.
///
/// Each stone goes beside a road with odds of one in `road_chance`, and
/// otherwise on any free cell that is neither water nor mountain. Returns
/// the number placed.
pub fn make_standing_stones(grid: &mut MapGrid, rng: &mut MapRng, count: u32, road_chance: u32) -> u32 {
    let roads: Vec<Pos> = grid
        .positions()
        .filter(|&p| grid.has(p, Building::Road))
        .collect();
    let mut placed = 0;
    let mut attempts = 0;

    while placed < count && attempts < count.saturating_mul(STONE_ATTEMPTS) {
        attempts += 1;
        let pos = if !roads.is_empty() && rng.one_in(road_chance) {
            let road = roads[rng.index(roads.len())];
            road.step(Direction::ALL[rng.index(8)])
        } else {
            Pos::new(
                rng.uniform(grid.width()) as i32,
                rng.uniform(grid.height()) as i32,
            )
        };
        if stone_site(grid, pos) {
            grid.set_building(pos, Building::Stone);
            placed += 1;
        }
    }

    debug!(requested = count, placed, attempts, "Placed standing stones");
    placed
}
