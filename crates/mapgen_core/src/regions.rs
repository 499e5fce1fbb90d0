//! Connected regions of one terrain type, island pruning and rivers.
//!
//! Two same-terrain cells merge when they share an edge and a third cell
//! of that terrain completes a corner triplet with them: an L of three
//! cells inside one 2x2 square. A straight one-wide thread therefore does
//! not join the bodies at its ends, and a purely diagonal contact never
//! joins anything. Regions are the transitive closure of those merges, so
//! a cell in no triplet is a region of its own.

use std::collections::HashMap;

use tracing::debug;

use crate::grid::{Direction, MapGrid, Pos, Terrain};
use crate::rng::MapRng;

/// Regions always kept by [`verify_islands`].
const KEPT_CONTINENTS: usize = 4;
/// [`make_rivers`] stops once water is split into fewer regions than this.
const MIN_WATER_REGIONS: u32 = 4;
/// Passes of [`make_rivers`].
const RIVER_ITERATIONS: u32 = 4;
/// Regions considered when pairing water bodies.
const MAX_RIVER_REGIONS: usize = 40;

/// Labels produced by [`label_regions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMap {
    width: u32,
    height: u32,
    labels: Vec<Option<u32>>,
    count: u32,
}

impl RegionMap {
    /// Number of regions.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Region of a cell, `None` for cells of another terrain or off-grid.
    #[must_use]
    pub fn label(&self, pos: Pos) -> Option<u32> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return None;
        }
        self.labels[pos.y as usize * self.width as usize + pos.x as usize]
    }

    /// Tile count per region, indexed by label.
    #[must_use]
    pub fn areas(&self) -> Vec<usize> {
        let mut areas = vec![0; self.count as usize];
        for label in self.labels.iter().flatten() {
            areas[*label as usize] += 1;
        }
        areas
    }

    /// Cells of one region in row-major order.
    pub fn cells(&self, label: u32) -> impl Iterator<Item = Pos> + '_ {
        let w = self.width as usize;
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, l)| **l == Some(label))
            .map(move |(i, _)| Pos::new((i % w) as i32, (i / w) as i32))
    }

    /// True if both cells are labelled and in the same region.
    #[must_use]
    pub fn same_region(&self, a: Pos, b: Pos) -> bool {
        matches!((self.label(a), self.label(b)), (Some(x), Some(y)) if x == y)
    }
}

/// Label the connected regions of `terrain`.
///
/// Labels are propagated to a fixed point: every cell repeatedly takes the
/// smallest label among itself and the neighbours it merges with, sweeping
/// the grid forward and then backward until a sweep changes nothing.
/// Final labels are numbered `0..count` in row-major order of each
/// region's first cell.
#[must_use]
pub fn label_regions(grid: &MapGrid, terrain: Terrain) -> RegionMap {
    let width = grid.width();
    let height = grid.height();
    let cells = grid.terrain_grid();
    let mut labels: Vec<Option<u32>> = cells
        .cells()
        .iter()
        .enumerate()
        .map(|(i, &t)| (t == terrain).then_some(i as u32))
        .collect();

    let positions: Vec<Pos> = grid.positions().collect();
    loop {
        let forward = sweep(grid, terrain, &mut labels, positions.iter());
        let backward = sweep(grid, terrain, &mut labels, positions.iter().rev());
        if !forward && !backward {
            break;
        }
    }

    let mut remap = HashMap::new();
    let mut count = 0;
    for label in labels.iter_mut().flatten() {
        *label = *remap.entry(*label).or_insert_with(|| {
            count += 1;
            count - 1
        });
    }

    RegionMap {
        width,
        height,
        labels,
        count,
    }
}

/// One propagation sweep. Returns true if any label changed.
fn sweep<'a>(
    grid: &MapGrid,
    terrain: Terrain,
    labels: &mut [Option<u32>],
    order: impl Iterator<Item = &'a Pos>,
) -> bool {
    let cells = grid.terrain_grid();
    let mut changed = false;
    for &pos in order {
        let Some(index) = cells.index(pos) else {
            continue;
        };
        let Some(mut best) = labels[index] else {
            continue;
        };
        for dir in Direction::CARDINAL {
            let next = pos.step(dir);
            if !merges(grid, terrain, pos, dir) {
                continue;
            }
            if let Some(Some(other)) = cells.index(next).map(|i| labels[i]) {
                best = best.min(other);
            }
        }
        if labels[index] != Some(best) {
            labels[index] = Some(best);
            changed = true;
        }
    }
    changed
}

/// Whether `pos` merges with its edge neighbour in `dir`: both share the
/// terrain and one of the four cells beside the pair completes a corner
/// triplet.
fn merges(grid: &MapGrid, terrain: Terrain, pos: Pos, dir: Direction) -> bool {
    let next = pos.step(dir);
    if !grid.is(pos, terrain) || !grid.is(next, terrain) {
        return false;
    }
    [dir.rotate(2), dir.rotate(-2)]
        .into_iter()
        .any(|side| grid.is(pos.step(side), terrain) || grid.is(next.step(side), terrain))
}

/// Keep the largest land masses and a random third of the rest; drown
/// everything else.
///
/// Returns the number of regions converted to water.
pub fn verify_islands(grid: &mut MapGrid, rng: &mut MapRng) -> usize {
    let regions = label_regions(grid, Terrain::Grass);
    let areas = regions.areas();

    let mut by_size: Vec<u32> = (0..regions.count()).collect();
    by_size.sort_by(|a, b| areas[*b as usize].cmp(&areas[*a as usize]).then(a.cmp(b)));

    let mut keep = vec![false; areas.len()];
    for (rank, &label) in by_size.iter().enumerate() {
        keep[label as usize] = rank < KEPT_CONTINENTS || rng.one_in(3);
    }

    let drowned: Vec<Pos> = grid
        .positions()
        .filter(|&p| regions.label(p).is_some_and(|l| !keep[l as usize]))
        .collect();
    for &pos in &drowned {
        grid.set_terrain(pos, Terrain::Water);
    }

    let removed = keep.iter().filter(|k| !**k).count();
    debug!(
        regions = regions.count(),
        removed,
        cells = drowned.len(),
        "Verified islands"
    );
    removed
}

/// A water body considered for river building.
#[derive(Debug, Clone)]
struct WaterBody {
    /// Boundary cells on the sampling stride, plus the centroid.
    samples: Vec<Pos>,
}

/// Join separate lakes with rivers.
///
/// Runs at most a handful of passes. Each pass relabels water and stops
/// early once there are few enough bodies. Bodies are ranked by area;
/// every `river_style`-th body after the two largest is joined to the
/// nearer of the two largest when in reach, else to its closest body.
///
/// Returns the number of rivers dug.
pub fn make_rivers(grid: &mut MapGrid, rng: &mut MapRng, river_style: u32, stride: u32) -> usize {
    let river_style = river_style.max(1) as usize;
    let stride = stride.max(1) as i32;
    let mut dug = 0;

    for iteration in 0..RIVER_ITERATIONS {
        let regions = label_regions(grid, Terrain::Water);
        if regions.count() < MIN_WATER_REGIONS {
            break;
        }
        let areas = regions.areas();
        let mut ranked: Vec<u32> = (0..regions.count()).collect();
        ranked.sort_by(|a, b| areas[*b as usize].cmp(&areas[*a as usize]).then(a.cmp(b)));
        ranked.truncate(MAX_RIVER_REGIONS);

        let bodies: Vec<WaterBody> = ranked
            .iter()
            .map(|&label| WaterBody {
                samples: sample_body(grid, &regions, label, stride),
            })
            .collect();

        let mut dug_this_pass = 0;
        for k in (2..bodies.len()).step_by(river_style) {
            let to_largest = [0, 1]
                .iter()
                .map(|&j| nearest_points(&bodies[k], &bodies[j]))
                .min_by_key(|(d, _, _)| *d);
            let reach = i64::from(river_reach(grid));
            let (_, from, to) = match to_largest {
                Some(link) if link.0 <= reach * reach => link,
                _ => (0..bodies.len())
                    .filter(|&j| j != k)
                    .map(|j| nearest_points(&bodies[k], &bodies[j]))
                    .min_by_key(|(d, _, _)| *d)
                    .unwrap_or((0, bodies[k].samples[0], bodies[k].samples[0])),
            };
            if from != to && connect_with_water(grid, rng, from, to) {
                dug_this_pass += 1;
            }
        }

        debug!(
            iteration,
            bodies = regions.count(),
            rivers = dug_this_pass,
            "River pass"
        );
        dug += dug_this_pass;
        if dug_this_pass == 0 {
            break;
        }
    }
    dug
}

/// Longest river [`connect_with_water`] will dig: 40% of the map width.
fn river_reach(grid: &MapGrid) -> u32 {
    grid.width() * 2 / 5
}

/// Boundary cells of a region on the sampling stride, plus its centroid.
fn sample_body(grid: &MapGrid, regions: &RegionMap, label: u32, stride: i32) -> Vec<Pos> {
    let mut samples: Vec<Pos> = regions
        .cells(label)
        .filter(|p| p.x % stride == 0 && p.y % stride == 0)
        .filter(|&p| {
            Direction::CARDINAL
                .iter()
                .any(|&d| grid.in_bounds(p.step(d)) && regions.label(p.step(d)) != Some(label))
        })
        .collect();
    samples.push(centroid(grid, regions, label));
    samples
}

/// Mean position of a region. If that falls outside the region, the
/// nearest region cell straight north, east, south or west of it is used.
fn centroid(grid: &MapGrid, regions: &RegionMap, label: u32) -> Pos {
    let (mut sx, mut sy, mut n) = (0i64, 0i64, 0i64);
    let mut first = None;
    for p in regions.cells(label) {
        first.get_or_insert(p);
        sx += i64::from(p.x);
        sy += i64::from(p.y);
        n += 1;
    }
    let Some(first) = first else {
        return Pos::default();
    };
    let mean = Pos::new((sx / n) as i32, (sy / n) as i32);
    if regions.label(mean) == Some(label) {
        return mean;
    }
    let reach = grid.width().max(grid.height()) as i32;
    for k in 1..reach {
        for dir in Direction::CARDINAL {
            let (dx, dy) = dir.delta();
            let p = mean.offset(dx * k, dy * k);
            if regions.label(p) == Some(label) {
                return p;
            }
        }
    }
    first
}

/// Closest pair of samples between two bodies: `(distance², from, to)`.
fn nearest_points(a: &WaterBody, b: &WaterBody) -> (i64, Pos, Pos) {
    let mut best = (i64::MAX, a.samples[0], b.samples[0]);
    for &p in &a.samples {
        for &q in &b.samples {
            let d = p.distance_squared(q);
            if d < best.0 {
                best = (d, p, q);
            }
        }
    }
    best
}

/// 2x2 brushes, one per diagonal. Every centre-line step stays inside a
/// corner triplet, so the channel labels as a single water region.
const BRUSHES: [[(i32, i32); 4]; 4] = [
    [(0, 0), (1, 0), (0, 1), (1, 1)],
    [(0, 0), (-1, 0), (0, 1), (-1, 1)],
    [(0, 0), (1, 0), (0, -1), (1, -1)],
    [(0, 0), (-1, 0), (0, -1), (-1, -1)],
];

/// Dig a two-cell-wide channel of water from `from` to `to`.
///
/// The centre line is 4-connected. The brush changes every two to four
/// steps. Endpoints further apart than 40% of the map width are left
/// alone (returns `false`) so no map gets an arrow-straight canal across
/// a continent.
pub fn connect_with_water(grid: &mut MapGrid, rng: &mut MapRng, from: Pos, to: Pos) -> bool {
    if from.chebyshev(to) > river_reach(grid) {
        return false;
    }

    let mut pos = from;
    let mut brush = BRUSHES[rng.index(BRUSHES.len())];
    let mut until_change = 2 + rng.uniform(3);
    let mut last_was_x = false;

    loop {
        for (dx, dy) in brush {
            grid.set_terrain(pos.offset(dx, dy), Terrain::Water);
        }
        if pos == to {
            break;
        }

        let dx = to.x - pos.x;
        let dy = to.y - pos.y;
        let step_x = match dx.abs().cmp(&dy.abs()) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => !last_was_x,
        };
        pos = if step_x {
            pos.offset(dx.signum(), 0)
        } else {
            pos.offset(0, dy.signum())
        };
        last_was_x = step_x;

        until_change -= 1;
        if until_change == 0 {
            brush = BRUSHES[rng.index(BRUSHES.len())];
            until_change = 2 + rng.uniform(3);
        }
    }
    true
}
