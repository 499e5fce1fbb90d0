//! Grid shortest paths over a [`MapGrid`].
//!
//! A [`GridPathfinder`] runs Dijkstra from a single origin over the whole
//! map and then answers cost and path queries for any destination. It is
//! a snapshot: after the grid mutates, call [`GridPathfinder::regenerate`]
//! before trusting further answers.
//!
//! Movement is 8-directional. Diagonal steps cost the same as straight
//! steps but may not cut a corner: both cells orthogonally between the
//! two ends must be enterable from the starting cell.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::grid::{Building, Direction, MapGrid, Pos, Terrain};

/// Cost model used to weigh a step between two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Movement {
    /// Ordinary land units. Mountains block; water is only entered from a
    /// port or city (boarding ships) or when already afloat; bridges and
    /// roads are cheap.
    Land,
    /// Flying units: every cell costs 1.
    Flight,
    /// Road construction: water without a bridge blocks, everything else
    /// costs 1.
    RoadBuilding,
}

/// Cost of entering a road or bridge cell on land movement.
const ROAD_COST: u32 = 1;
/// Cost of sailing one water cell.
const WATER_COST: u32 = 1;

impl Movement {
    /// Cost of a single step from `from` to the adjacent cell `to`.
    /// `None` if the step is impossible.
    #[must_use]
    pub fn step_cost(self, grid: &MapGrid, from: Pos, to: Pos) -> Option<u32> {
        let to_terrain = grid.terrain(to)?;
        let to_building = grid.building(to)?;
        match self {
            Self::Flight => Some(1),
            Self::RoadBuilding => {
                if to_terrain == Terrain::Water && to_building != Building::Bridge {
                    None
                } else {
                    Some(1)
                }
            }
            Self::Land => {
                let from_terrain = grid.terrain(from)?;
                let from_building = grid.building(from)?;
                if to_terrain == Terrain::Water {
                    if to_building == Building::Bridge {
                        return Some(ROAD_COST);
                    }
                    let afloat =
                        from_terrain == Terrain::Water && from_building != Building::Bridge;
                    let harbour = matches!(from_building, Building::Port | Building::City);
                    return (afloat || harbour).then_some(WATER_COST);
                }
                if to_building == Building::Road {
                    return Some(ROAD_COST);
                }
                terrain_cost(to_terrain)
            }
        }
    }
}

/// Land movement cost of a terrain type, `None` if impassable.
#[must_use]
pub const fn terrain_cost(terrain: Terrain) -> Option<u32> {
    match terrain {
        Terrain::Grass => Some(2),
        Terrain::Forest | Terrain::Hills => Some(3),
        Terrain::Swamp => Some(4),
        Terrain::Water | Terrain::Mountain => None,
    }
}

/// A node in the Dijkstra open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct OpenNode {
    index: usize,
    cost: u32,
    /// Tie-breaker for determinism: lower coordinates first.
    tie_breaker: u64,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so reverse the comparison for min-heap behavior.
        match other.cost.cmp(&self.cost) {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Convert coordinates to a tie-breaker value for deterministic ordering.
#[inline]
fn coords_to_tie_breaker(pos: Pos) -> u64 {
    ((pos.y as u64) << 32) | (pos.x as u64)
}

/// Single-origin shortest paths over a map.
#[derive(Debug, Clone)]
pub struct GridPathfinder {
    origin: Pos,
    movement: Movement,
    width: u32,
    costs: Vec<Option<u32>>,
    came_from: Vec<Option<usize>>,
}

impl GridPathfinder {
    /// Compute shortest paths from `origin` under `movement`.
    #[must_use]
    pub fn new(grid: &MapGrid, origin: Pos, movement: Movement) -> Self {
        let mut pathfinder = Self {
            origin,
            movement,
            width: grid.width(),
            costs: Vec::new(),
            came_from: Vec::new(),
        };
        pathfinder.regenerate(grid);
        pathfinder
    }

    /// Origin of every path.
    #[must_use]
    pub const fn origin(&self) -> Pos {
        self.origin
    }

    /// Movement model in use.
    #[must_use]
    pub const fn movement(&self) -> Movement {
        self.movement
    }

    /// Recompute after the grid has changed.
    pub fn regenerate(&mut self, grid: &MapGrid) {
        let area = grid.area();
        self.width = grid.width();
        self.costs = vec![None; area];
        self.came_from = vec![None; area];

        let Some(start) = grid.terrain_grid().index(self.origin) else {
            return;
        };

        let mut open_set = BinaryHeap::new();
        self.costs[start] = Some(0);
        open_set.push(OpenNode {
            index: start,
            cost: 0,
            tie_breaker: coords_to_tie_breaker(self.origin),
        });

        while let Some(current) = open_set.pop() {
            if self.costs[current.index].is_some_and(|c| c < current.cost) {
                continue;
            }
            let pos = grid.terrain_grid().pos_of(current.index);

            for dir in Direction::ALL {
                let next = pos.step(dir);
                let Some(next_index) = grid.terrain_grid().index(next) else {
                    continue;
                };
                let Some(step) = self.movement.step_cost(grid, pos, next) else {
                    continue;
                };
                if dir.is_diagonal() && !self.corner_is_open(grid, pos, dir) {
                    continue;
                }

                let tentative = current.cost + step;
                if self.costs[next_index].map_or(true, |c| tentative < c) {
                    self.costs[next_index] = Some(tentative);
                    self.came_from[next_index] = Some(current.index);
                    open_set.push(OpenNode {
                        index: next_index,
                        cost: tentative,
                        tie_breaker: coords_to_tie_breaker(next),
                    });
                }
            }
        }
    }

    /// Total cost to reach `dest`, `None` if unreachable or off-grid.
    #[must_use]
    pub fn cost_to(&self, dest: Pos) -> Option<u32> {
        self.index(dest).and_then(|i| self.costs[i])
    }

    /// True if `dest` can be reached.
    #[must_use]
    pub fn reaches(&self, dest: Pos) -> bool {
        self.cost_to(dest).is_some()
    }

    /// Cells from origin to `dest`, both inclusive. `None` if unreachable.
    #[must_use]
    pub fn path_to(&self, dest: Pos) -> Option<Vec<Pos>> {
        let mut current = self.index(dest)?;
        self.costs[current]?;

        let mut path = vec![dest];
        while let Some(prev) = self.came_from[current] {
            path.push(self.pos_of(prev));
            current = prev;
        }
        path.reverse();
        Some(path)
    }

    /// Number of cells reachable from the origin (origin included).
    #[must_use]
    pub fn reachable_count(&self) -> usize {
        self.costs.iter().filter(|c| c.is_some()).count()
    }

    fn corner_is_open(&self, grid: &MapGrid, pos: Pos, dir: Direction) -> bool {
        let (dx, dy) = dir.delta();
        let side_a = pos.offset(dx, 0);
        let side_b = pos.offset(0, dy);
        self.movement.step_cost(grid, pos, side_a).is_some()
            && self.movement.step_cost(grid, pos, side_b).is_some()
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        let height = self.costs.len() as u32 / self.width.max(1);
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= height {
            return None;
        }
        Some(pos.y as usize * self.width as usize + pos.x as usize)
    }

    fn pos_of(&self, index: usize) -> Pos {
        let w = self.width as usize;
        Pos::new((index % w) as i32, (index / w) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> MapGrid {
        MapGrid::from_ascii(rows).unwrap()
    }

    #[test]
    fn test_terrain_costs() {
        assert_eq!(terrain_cost(Terrain::Grass), Some(2));
        assert_eq!(terrain_cost(Terrain::Swamp), Some(4));
        assert_eq!(terrain_cost(Terrain::Mountain), None);
        assert_eq!(terrain_cost(Terrain::Water), None);
    }

    #[test]
    fn test_simple_path() {
        let map = MapGrid::new(10, 10);
        let pf = GridPathfinder::new(&map, Pos::new(0, 0), Movement::Land);

        let path = pf.path_to(Pos::new(5, 5)).unwrap();
        assert_eq!(path.first(), Some(&Pos::new(0, 0)));
        assert_eq!(path.last(), Some(&Pos::new(5, 5)));
        // Diagonal moves cost the same as straight ones
        assert_eq!(path.len(), 6);
        assert_eq!(pf.cost_to(Pos::new(5, 5)), Some(10));
    }

    #[test]
    fn test_path_around_mountains() {
        let map = grid(&[
            "..........",
            ".....M....",
            ".....M....",
            ".....M....",
            "..........",
        ]);
        let pf = GridPathfinder::new(&map, Pos::new(2, 2), Movement::Land);
        let path = pf.path_to(Pos::new(8, 2)).unwrap();
        for p in &path {
            assert_ne!(map.terrain(*p), Some(Terrain::Mountain), "path crosses {p:?}");
        }
    }

    #[test]
    fn test_no_path_exists() {
        let map = grid(&["..M..", "..M..", "..M.."]);
        let pf = GridPathfinder::new(&map, Pos::new(0, 1), Movement::Land);
        assert_eq!(pf.cost_to(Pos::new(4, 1)), None);
        assert!(pf.path_to(Pos::new(4, 1)).is_none());
        assert_eq!(pf.reachable_count(), 6);
    }

    #[test]
    fn test_flight_ignores_terrain() {
        let map = grid(&["..M..", "~~M~~", "..M.."]);
        let pf = GridPathfinder::new(&map, Pos::new(0, 1), Movement::Flight);
        assert_eq!(pf.cost_to(Pos::new(4, 1)), Some(4));
        assert_eq!(pf.reachable_count(), 15);
    }

    #[test]
    fn test_water_needs_a_harbour() {
        let blocked = grid(&["..~~..", "..~~..", "..~~.."]);
        let pf = GridPathfinder::new(&blocked, Pos::new(0, 1), Movement::Land);
        assert!(!pf.reaches(Pos::new(5, 1)));

        // Boarding at a port, disembarking anywhere
        let ported = grid(&["..~~..", ".P~~..", "..~~.."]);
        let pf = GridPathfinder::new(&ported, Pos::new(0, 1), Movement::Land);
        assert!(pf.reaches(Pos::new(5, 1)));
    }

    #[test]
    fn test_bridge_carries_land_movement() {
        let map = grid(&["~~~~~", "..BB.", "~~~~~"]);
        let pf = GridPathfinder::new(&map, Pos::new(0, 1), Movement::Land);
        assert_eq!(pf.cost_to(Pos::new(4, 1)), Some(2 + 1 + 1 + 2));
    }

    #[test]
    fn test_road_building_avoids_water() {
        let map = grid(&["..~..", "..~..", "....."]);
        let pf = GridPathfinder::new(&map, Pos::new(0, 0), Movement::RoadBuilding);
        let path = pf.path_to(Pos::new(4, 0)).unwrap();
        assert!(path.iter().all(|p| map.is_land(*p)));
    }

    #[test]
    fn test_no_corner_cutting() {
        // The only link between the halves is a diagonal between two mountains
        let map = grid(&["..M", "M.."]);
        let pf = GridPathfinder::new(&map, Pos::new(0, 0), Movement::Land);
        assert!(pf.reaches(Pos::new(2, 1)));
        let pinched = grid(&[".M", "M."]);
        let pf = GridPathfinder::new(&pinched, Pos::new(0, 0), Movement::Land);
        assert!(!pf.reaches(Pos::new(1, 1)));
    }

    #[test]
    fn test_path_to_origin() {
        let map = MapGrid::new(4, 4);
        let pf = GridPathfinder::new(&map, Pos::new(2, 2), Movement::Land);
        assert_eq!(pf.path_to(Pos::new(2, 2)), Some(vec![Pos::new(2, 2)]));
        assert_eq!(pf.cost_to(Pos::new(2, 2)), Some(0));
    }

    #[test]
    fn test_regenerate_sees_changes() {
        let mut map = grid(&["..M..", "..M..", "..M.."]);
        let mut pf = GridPathfinder::new(&map, Pos::new(0, 1), Movement::Land);
        assert!(!pf.reaches(Pos::new(4, 1)));

        map.set_terrain(Pos::new(2, 1), Terrain::Hills);
        pf.regenerate(&map);
        assert!(pf.reaches(Pos::new(4, 1)));
    }

    #[test]
    fn test_determinism() {
        let mut map = MapGrid::new(20, 20);
        for i in 5..15 {
            map.set_terrain(Pos::new(10, i), Terrain::Mountain);
        }
        let a = GridPathfinder::new(&map, Pos::new(5, 10), Movement::Land);
        let b = GridPathfinder::new(&map, Pos::new(5, 10), Movement::Land);
        assert_eq!(a.path_to(Pos::new(15, 10)), b.path_to(Pos::new(15, 10)));
    }
}
