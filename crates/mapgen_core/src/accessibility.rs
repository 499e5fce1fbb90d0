//! Reachability repair between the capital and every other city.
//!
//! The repair is greedy and works one city at a time along the straight
//! flight path from the capital. It can fail; failures are reported, not
//! raised.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::grid::{Building, MapGrid, Pos, Terrain};
use crate::objects::{MapObject, MapObjects};
use crate::pathfinding::{GridPathfinder, Movement};

/// Outcome of [`make_cities_accessible`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityReport {
    /// Anchor of the capital, `None` when the map has no cities.
    pub capital: Option<Pos>,
    /// Cities that were cut off and have been connected.
    pub repaired: Vec<Pos>,
    /// Cities still unreachable from the capital over land.
    pub unreachable: Vec<Pos>,
}

impl AccessibilityReport {
    /// True if every city can be reached from the capital.
    #[must_use]
    pub fn all_reachable(&self) -> bool {
        self.unreachable.is_empty()
    }
}

/// The city whose anchor lies nearest the map centre.
#[must_use]
pub fn find_capital(grid: &MapGrid, objects: &MapObjects) -> Option<MapObject> {
    let centre = Pos::new(grid.width() as i32 / 2, grid.height() as i32 / 2);
    objects
        .of_kind(Building::City)
        .min_by_key(|city| city.pos.distance_squared(centre))
        .copied()
}

/// Make every city reachable over land from the capital, as far as
/// converting mountains and adding ports allows.
pub fn make_cities_accessible(grid: &mut MapGrid) -> AccessibilityReport {
    let objects = MapObjects::scan(grid);
    let Some(capital) = find_capital(grid, &objects) else {
        return AccessibilityReport::default();
    };
    let mut report = AccessibilityReport {
        capital: Some(capital.pos),
        ..AccessibilityReport::default()
    };
    let mut land = GridPathfinder::new(grid, capital.pos, Movement::Land);

    for city in objects.of_kind(Building::City) {
        if city.pos == capital.pos || land.reaches(city.pos) {
            continue;
        }
        if make_accessible(grid, &mut land, city.pos) {
            debug!(city = ?city.pos, "Repaired access");
            report.repaired.push(city.pos);
        } else {
            report.unreachable.push(city.pos);
        }
    }

    if !report.all_reachable() {
        warn!(
            capital = ?capital.pos,
            unreachable = report.unreachable.len(),
            "Cities remain unreachable after repair"
        );
    }
    debug!(repaired = report.repaired.len(), "Made cities accessible");
    report
}

/// Open a land route from `land`'s origin to `target` along the flight
/// path between them.
///
/// Mountains on the path (and in the corners of its diagonal steps) are
/// worn to hills. Where the path crosses between water and land, a port is
/// tried on the land side and kept only if it helps: the target becomes
/// reachable or cheaper, or more of the map becomes reachable. `land` is
/// kept current with the grid throughout.
///
/// Returns true once `target` is reachable.
pub fn make_accessible(grid: &mut MapGrid, land: &mut GridPathfinder, target: Pos) -> bool {
    let flight = GridPathfinder::new(grid, land.origin(), Movement::Flight);
    let Some(path) = flight.path_to(target) else {
        return false;
    };

    let mut worn_down = false;
    for pair in path.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);

        let on_mountain = grid.is(cur, Terrain::Mountain);
        let mut blockers = vec![cur];
        if prev.x != cur.x && prev.y != cur.y {
            blockers.push(Pos::new(cur.x, prev.y));
            blockers.push(Pos::new(prev.x, cur.y));
        }
        for pos in blockers {
            if grid.is(pos, Terrain::Mountain) {
                grid.set_terrain(pos, Terrain::Hills);
                worn_down = true;
            }
        }
        if on_mountain {
            continue;
        }

        if worn_down {
            worn_down = false;
            land.regenerate(grid);
            if land.reaches(target) {
                return true;
            }
        }

        let prev_water = grid.is(prev, Terrain::Water);
        let cur_water = grid.is(cur, Terrain::Water);
        if prev_water != cur_water {
            let shore = if prev_water { cur } else { prev };
            if try_port(grid, land, target, shore) && land.reaches(target) {
                return true;
            }
        }
    }

    if worn_down {
        land.regenerate(grid);
    }
    land.reaches(target)
}

/// Place a port at `shore` and keep it only if it improves reach.
/// Returns true if the port was kept.
fn try_port(grid: &mut MapGrid, land: &mut GridPathfinder, target: Pos, shore: Pos) -> bool {
    if !grid.has(shore, Building::None) {
        return false;
    }
    let cost_before = land.cost_to(target);
    let reach_before = land.reachable_count();

    grid.set_building(shore, Building::Port);
    land.regenerate(grid);

    let cost_after = land.cost_to(target);
    let improved = match (cost_before, cost_after) {
        (None, Some(_)) => true,
        (Some(before), Some(after)) => after < before,
        _ => false,
    } || land.reachable_count() > reach_before;

    if improved {
        debug!(port = ?shore, "Kept port");
    } else {
        grid.set_building(shore, Building::None);
        land.regenerate(grid);
    }
    improved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::place_building;

    #[test]
    fn test_mountain_band_gets_a_corridor() {
        let mut grid = MapGrid::new(20, 20);
        for x in 0..20 {
            for y in 8..12 {
                grid.set_terrain(Pos::new(x, y), Terrain::Mountain);
            }
        }
        place_building(&mut grid, Building::City, Pos::new(9, 3), 2);
        place_building(&mut grid, Building::City, Pos::new(4, 15), 2);

        let report = make_cities_accessible(&mut grid);
        assert!(report.all_reachable(), "{report:?}");
        assert_eq!(report.repaired.len(), 1);

        let capital = report.capital.unwrap();
        let other = if capital == Pos::new(9, 3) { Pos::new(4, 15) } else { Pos::new(9, 3) };
        let pf = GridPathfinder::new(&grid, capital, Movement::Land);
        let path = pf.path_to(other).unwrap();
        assert!(path.iter().all(|&p| !grid.is(p, Terrain::Mountain)));
    }

    #[test]
    fn test_lake_gets_ports() {
        // An island city across open water
        let mut grid = MapGrid::new(24, 12);
        for x in 8..16 {
            for y in 0..12 {
                grid.set_terrain(Pos::new(x, y), Terrain::Water);
            }
        }
        place_building(&mut grid, Building::City, Pos::new(11, 5), 2);
        place_building(&mut grid, Building::City, Pos::new(19, 5), 2);
        // The centre city is an island in the lake
        for y in 4..8 {
            for x in 10..14 {
                if !grid.has(Pos::new(x, y), Building::City) {
                    grid.set_terrain(Pos::new(x, y), Terrain::Grass);
                }
            }
        }

        let report = make_cities_accessible(&mut grid);
        assert_eq!(report.capital, Some(Pos::new(11, 5)));
        assert!(report.all_reachable(), "{report:?}");
        assert!(grid.building_grid().count(|b| b == Building::Port) >= 1);
    }

    #[test]
    fn test_no_cities_no_capital() {
        let mut grid = MapGrid::new(10, 10);
        let report = make_cities_accessible(&mut grid);
        assert_eq!(report, AccessibilityReport::default());
    }

    #[test]
    fn test_reachable_cities_are_left_alone() {
        let mut grid = MapGrid::new(20, 20);
        place_building(&mut grid, Building::City, Pos::new(9, 9), 2);
        place_building(&mut grid, Building::City, Pos::new(2, 2), 2);
        let before = grid.clone();
        let report = make_cities_accessible(&mut grid);
        assert!(report.repaired.is_empty());
        assert!(report.unreachable.is_empty());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_capital_is_nearest_centre() {
        let mut grid = MapGrid::new(30, 30);
        place_building(&mut grid, Building::City, Pos::new(2, 2), 2);
        place_building(&mut grid, Building::City, Pos::new(14, 16), 2);
        place_building(&mut grid, Building::City, Pos::new(25, 25), 2);
        let objects = MapObjects::scan(&grid);
        assert_eq!(find_capital(&grid, &objects).map(|c| c.pos), Some(Pos::new(14, 16)));
    }
}
