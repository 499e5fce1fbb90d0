//! Terrain clean-up passes run after painting.
//!
//! [`normalize`] evens out coastlines with neighbour-count rules,
//! [`rescue_lone_tiles`] removes single tiles and thin slivers that the
//! brushes leave behind, and [`surround_mountains`] rings ranges with
//! foothills.

use tracing::debug;

use crate::grid::{Direction, Grid, MapGrid, Pos, Terrain};
use crate::rng::MapRng;

/// Sweeps made by [`rescue_lone_tiles`].
pub const RESCUE_SWEEPS: u32 = 8;

/// Number of the 8 neighbours of `pos` in `snapshot` that are `t`.
fn snapshot_neighbours(snapshot: &Grid<Terrain>, pos: Pos, t: Terrain) -> usize {
    Direction::ALL
        .iter()
        .filter(|&&d| snapshot.get(pos.step(d)) == Some(t))
        .count()
}

/// Smooth water against land in one pass over the interior.
///
/// Neighbour counts come from a copy of the terrain taken before the pass,
/// so a cell's outcome never depends on cells changed earlier in the same
/// pass. Water with few water neighbours dries out; land nearly enclosed
/// by water floods.
///
/// Returns the number of cells changed.
pub fn normalize(grid: &mut MapGrid, rng: &mut MapRng) -> usize {
    let snapshot = grid.terrain_grid().clone();
    let three_threshold = rng.uniform(40);
    let mut changed = 0;

    for pos in snapshot.positions() {
        if !grid.is_interior(pos, 1) {
            continue;
        }
        let Some(terrain) = snapshot.get(pos) else {
            continue;
        };
        let water = snapshot_neighbours(&snapshot, pos, Terrain::Water);

        let replacement = if terrain == Terrain::Water {
            let dries = match water {
                0 => true,
                1 => rng.percent(95),
                2 => rng.percent(70),
                3 => rng.uniform(100) < three_threshold,
                _ => false,
            };
            dries.then_some(Terrain::Grass)
        } else {
            let floods = match water {
                8 => true,
                7 => rng.percent(70),
                6 => rng.percent(40),
                _ => false,
            };
            floods.then_some(Terrain::Water)
        };

        if let Some(t) = replacement {
            grid.set_terrain(pos, t);
            changed += 1;
        }
    }

    debug!(changed, three_threshold, "Normalized coastlines");
    changed
}

/// What to do with a cell matching a [`TilePattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fix {
    /// Centre becomes the fallback terrain.
    Replace,
    /// The centre touches another source tile only across the given
    /// diagonal. Either fill one of the two cells between them or drop
    /// the centre.
    Link(Direction),
}

/// A 3x3 neighbourhood test over the 8 neighbours of a source tile.
///
/// Bit `i` of each mask is the neighbour in direction `Direction::ALL[i]`
/// (North is bit 0, then clockwise).
#[derive(Debug, Clone, Copy)]
struct TilePattern {
    must_set: u8,
    must_clear: u8,
    fix: Fix,
}

impl TilePattern {
    const fn matches(&self, mask: u8) -> bool {
        mask & self.must_set == self.must_set && mask & self.must_clear == 0
    }
}

const N: u8 = 1 << 0;
const NE: u8 = 1 << 1;
const E: u8 = 1 << 2;
const SE: u8 = 1 << 3;
const S: u8 = 1 << 4;
const SW: u8 = 1 << 5;
const W: u8 = 1 << 6;
const NW: u8 = 1 << 7;
const ORTHOGONAL: u8 = N | E | S | W;

const fn replace(must_set: u8, must_clear: u8) -> TilePattern {
    TilePattern {
        must_set,
        must_clear,
        fix: Fix::Replace,
    }
}

const fn link(diagonal: Direction, must_set: u8, must_clear: u8) -> TilePattern {
    TilePattern {
        must_set,
        must_clear,
        fix: Fix::Link(diagonal),
    }
}

/// Checked in order; the first match wins.
const PATTERNS: [TilePattern; 16] = [
    // Isolated tile
    replace(0, 0xFF),
    // Checkerboard: only diagonal contacts, on every corner
    replace(NE | SE | SW | NW, ORTHOGONAL),
    // Peninsula tips, attached by a single orthogonal neighbour
    replace(S, N | NE | E | W | NW),
    replace(W, N | NE | E | SE | S),
    replace(N, E | SE | S | SW | W),
    replace(E, N | S | SW | W | NW),
    // Bumps hanging off an edge by both corners of one side
    replace(NE | NW, ORTHOGONAL | SE | SW),
    replace(NE | SE, ORTHOGONAL | SW | NW),
    replace(SE | SW, ORTHOGONAL | NE | NW),
    replace(SW | NW, ORTHOGONAL | NE | SE),
    // Diagonal-only links
    link(Direction::NorthEast, NE, N | E),
    link(Direction::SouthEast, SE, E | S),
    link(Direction::SouthWest, SW, S | W),
    link(Direction::NorthWest, NW, W | N),
    // One-wide lines
    replace(N | S, E | W),
    replace(E | W, N | S),
];

/// Neighbour mask of `pos`: bit set where the neighbour is `source`.
fn neighbour_mask(grid: &MapGrid, pos: Pos, source: Terrain) -> u8 {
    Direction::ALL
        .iter()
        .filter(|&&d| grid.is(pos.step(d), source))
        .fold(0, |mask, d| mask | (1 << d.index()))
}

/// Fill every non-`source` interior cell that has at least three
/// orthogonal `source` neighbours. Returns the number of cells filled.
fn grow(grid: &mut MapGrid, source: Terrain) -> usize {
    let mut grown = 0;
    let positions: Vec<Pos> = grid.positions().filter(|&p| grid.is_interior(p, 1)).collect();
    for pos in positions {
        if grid.is(pos, source) {
            continue;
        }
        let orthogonal = Direction::CARDINAL
            .iter()
            .filter(|&&d| grid.is(pos.step(d), source))
            .count();
        if orthogonal >= 3 {
            grid.set_terrain(pos, source);
            grown += 1;
        }
    }
    grown
}

/// Remove lone `source` tiles and slivers, turning them into `fallback`.
///
/// Runs [`RESCUE_SWEEPS`] row-major sweeps over interior cells. Each
/// `source` cell is matched against a fixed set of 3x3 patterns: isolated
/// tiles, peninsula tips, bumps, one-wide lines and checkerboards are
/// replaced. A tile joined to another only across a diagonal is either
/// bridged by filling one of the two cells between them (even odds) or
/// dropped. With `grow_first`, gaps almost enclosed by `source` are filled
/// first.
///
/// Returns the number of cells changed.
pub fn rescue_lone_tiles(
    grid: &mut MapGrid,
    rng: &mut MapRng,
    source: Terrain,
    fallback: Terrain,
    grow_first: bool,
) -> usize {
    let mut changed = if grow_first { grow(grid, source) } else { 0 };
    let positions: Vec<Pos> = grid.positions().filter(|&p| grid.is_interior(p, 1)).collect();

    for _ in 0..RESCUE_SWEEPS {
        let before = changed;
        for &pos in &positions {
            if !grid.is(pos, source) {
                continue;
            }
            let mask = neighbour_mask(grid, pos, source);
            let Some(pattern) = PATTERNS.iter().find(|p| p.matches(mask)) else {
                continue;
            };
            match pattern.fix {
                Fix::Replace => {
                    grid.set_terrain(pos, fallback);
                }
                Fix::Link(diagonal) => {
                    if rng.one_in(2) {
                        let side = if rng.one_in(2) { -1 } else { 1 };
                        grid.set_terrain(pos.step(diagonal.rotate(side)), source);
                    } else {
                        grid.set_terrain(pos, fallback);
                    }
                }
            }
            changed += 1;
        }
        if changed == before {
            break;
        }
    }

    debug!(?source, ?fallback, grow_first, changed, "Rescued lone tiles");
    changed
}

/// Turn grass, forest and swamp next to a mountain into hills.
/// Returns the number of cells changed.
pub fn surround_mountains(grid: &mut MapGrid) -> usize {
    let foothills: Vec<Pos> = grid
        .positions()
        .filter(|&p| {
            matches!(
                grid.terrain(p),
                Some(Terrain::Grass | Terrain::Forest | Terrain::Swamp)
            ) && grid.count_neighbours(p, Terrain::Mountain) > 0
        })
        .collect();
    for &pos in &foothills {
        grid.set_terrain(pos, Terrain::Hills);
    }
    foothills.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> MapGrid {
        MapGrid::from_ascii(rows).unwrap()
    }

    #[test]
    fn test_normalize_dries_lone_water() {
        let mut g = grid(&[".....", ".....", "..~..", ".....", "....."]);
        let mut rng = MapRng::new(1);
        normalize(&mut g, &mut rng);
        assert!(g.is(Pos::new(2, 2), Terrain::Grass));
    }

    #[test]
    fn test_normalize_floods_enclosed_land() {
        let mut g = grid(&["~~~~~", "~~~~~", "~~.~~", "~~~~~", "~~~~~"]);
        let mut rng = MapRng::new(2);
        normalize(&mut g, &mut rng);
        assert!(g.is(Pos::new(2, 2), Terrain::Water));
    }

    #[test]
    fn test_normalize_leaves_border_alone() {
        let mut g = grid(&["~....", ".....", ".....", ".....", "....~"]);
        let mut rng = MapRng::new(3);
        assert_eq!(normalize(&mut g, &mut rng), 0);
        assert!(g.is(Pos::new(0, 0), Terrain::Water));
        assert!(g.is(Pos::new(4, 4), Terrain::Water));
    }

    #[test]
    fn test_normalize_does_not_grow_painted_water() {
        for seed in [1, 2, 3, 4, 5] {
            let mut g = MapGrid::new(20, 20);
            let mut rng = MapRng::new(seed);
            crate::carve::paint_terrain(&mut g, &mut rng, Terrain::Water, 25, true);
            let before = g.terrain_grid().count(|t| t == Terrain::Water);
            normalize(&mut g, &mut rng);
            let after = g.terrain_grid().count(|t| t == Terrain::Water);
            assert!(after <= before, "seed {seed}: {before} -> {after}");
        }
    }

    #[test]
    fn test_three_neighbour_threshold_rolled_once_per_pass() {
        // Separate 2x2 ponds: each cell sees exactly three water cells and
        // no grass cell sees enough water to flood.
        let mut g = MapGrid::new(20, 20);
        for by in [2, 5, 8, 11, 14] {
            for bx in [2, 5, 8, 11, 14] {
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    g.set_terrain(Pos::new(bx + dx, by + dy), Terrain::Water);
                }
            }
        }
        let ponds: Vec<Pos> = g.positions().filter(|&p| g.is(p, Terrain::Water)).collect();
        assert_eq!(ponds.len(), 100);

        for seed in [7, 8, 9] {
            let mut cells = g.clone();
            let mut rng = MapRng::new(seed);
            let changed = normalize(&mut cells, &mut rng);

            // One threshold draw, then one roll per pond cell in row order
            let mut replay = MapRng::new(seed);
            let threshold = replay.uniform(40);
            let expected: Vec<bool> = ponds.iter().map(|_| replay.uniform(100) < threshold).collect();
            let dried: Vec<bool> = ponds.iter().map(|&p| cells.is(p, Terrain::Grass)).collect();
            assert_eq!(dried, expected, "seed {seed}");
            assert_eq!(changed, expected.iter().filter(|&&d| d).count());
        }
    }

    #[test]
    fn test_normalize_keeps_open_water() {
        let mut g = MapGrid::new(9, 9);
        for pos in g.positions().collect::<Vec<_>>() {
            g.set_terrain(pos, Terrain::Water);
        }
        let mut rng = MapRng::new(4);
        assert_eq!(normalize(&mut g, &mut rng), 0);
    }

    #[test]
    fn test_rescue_removes_isolated_tile() {
        let mut g = grid(&[".....", ".....", "..M..", ".....", "....."]);
        let mut rng = MapRng::new(5);
        let changed = rescue_lone_tiles(&mut g, &mut rng, Terrain::Mountain, Terrain::Hills, false);
        assert_eq!(changed, 1);
        assert!(g.is(Pos::new(2, 2), Terrain::Hills));
    }

    #[test]
    fn test_rescue_removes_one_wide_line() {
        let mut g = grid(&[
            ".......", ".......", ".MMMMM.", ".......", ".......",
        ]);
        let mut rng = MapRng::new(6);
        rescue_lone_tiles(&mut g, &mut rng, Terrain::Mountain, Terrain::Hills, false);
        assert_eq!(g.terrain_grid().count(|t| t == Terrain::Mountain), 0);
    }

    #[test]
    fn test_rescue_keeps_solid_block() {
        let mut g = grid(&[
            "......", ".MMMM.", ".MMMM.", ".MMMM.", ".MMMM.", "......",
        ]);
        let mut rng = MapRng::new(7);
        assert_eq!(
            rescue_lone_tiles(&mut g, &mut rng, Terrain::Mountain, Terrain::Hills, false),
            0
        );
    }

    #[test]
    fn test_rescue_resolves_diagonal_link() {
        let mut g = grid(&[
            "........", ".MM.....", ".MM.....", "...MM...", "...MM...", "........",
        ]);
        let mut rng = MapRng::new(8);
        rescue_lone_tiles(&mut g, &mut rng, Terrain::Mountain, Terrain::Hills, false);
        // No two mountain tiles may touch only across a corner.
        for pos in g.positions().filter(|&p| g.is(p, Terrain::Mountain)) {
            for d in [Direction::NorthEast, Direction::SouthEast, Direction::SouthWest, Direction::NorthWest] {
                if g.is(pos.step(d), Terrain::Mountain) {
                    let left = pos.step(d.rotate(-1));
                    let right = pos.step(d.rotate(1));
                    assert!(
                        g.is(left, Terrain::Mountain) || g.is(right, Terrain::Mountain),
                        "diagonal-only link at {pos:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_grow_fills_enclosed_gap() {
        let mut g = grid(&["~~~~~", "~~~~~", "~~.~~", "~~~~~", "~~~~~"]);
        let mut rng = MapRng::new(9);
        rescue_lone_tiles(&mut g, &mut rng, Terrain::Water, Terrain::Grass, true);
        assert!(g.is(Pos::new(2, 2), Terrain::Water));
    }

    #[test]
    fn test_surround_mountains_adds_foothills() {
        let mut g = grid(&["~....", ".fM..", "..s..", "....."]);
        let changed = surround_mountains(&mut g);
        assert_eq!(changed, 8);
        assert!(g.is(Pos::new(1, 1), Terrain::Hills));
        assert!(g.is(Pos::new(2, 2), Terrain::Hills));
        assert!(g.is(Pos::new(0, 0), Terrain::Water));
        assert!(g.is(Pos::new(4, 0), Terrain::Grass));
    }
}
