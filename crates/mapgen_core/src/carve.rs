//! Region growth: painting terrain onto grass until a coverage target.
//!
//! Two brushes are provided. [`paint_terrain`] grows blobs by random walk
//! and suits lakes, forests and hills. [`paint_streamer`] walks in a
//! slowly turning direction and stamps a band of cells across its path,
//! which yields rivers and mountain chains.
//!
//! Both only ever convert [`Terrain::Grass`]; nothing is reverted.

use tracing::debug;

use crate::grid::{Direction, MapGrid, Pos, Terrain};
use crate::math::percent_of;
use crate::rng::MapRng;

/// Strokes that convert nothing allowed before [`paint_streamer`] gives
/// up on its target. Both brushes stop at once when no grass is left.
pub const SEED_ATTEMPTS: u32 = 30_000;

/// Convert grass to `terrain` by random-walk growth until `percent` of
/// the map has been converted or no grass is left.
///
/// With `allow_restart`, a walk that runs into a dead end re-seeks the
/// nearest grass from where it stopped and carries on, which keeps the
/// painted area contiguous. Without it the walk is abandoned and a new
/// random seed is drawn.
///
/// Returns the number of cells converted.
pub fn paint_terrain(
    grid: &mut MapGrid,
    rng: &mut MapRng,
    terrain: Terrain,
    percent: u32,
    allow_restart: bool,
) -> usize {
    let target = percent_of(grid.area(), percent);
    let mut converted = 0;
    let mut walks = 0;

    // Every walk converts at least its seed, so this ends.
    while converted < target {
        let Some(mut pos) = random_seed(grid, rng) else {
            break;
        };
        walks += 1;

        loop {
            grid.set_terrain(pos, terrain);
            converted += 1;
            if converted >= target {
                break;
            }

            if let Some(next) = random_grass_neighbour(grid, rng, pos) {
                pos = next;
            } else if allow_restart {
                match seek_plain(grid, pos) {
                    Some(next) => pos = next,
                    None => break,
                }
            } else {
                break;
            }
        }
    }

    debug!(?terrain, percent, target, converted, walks, "Painted terrain");
    converted
}

/// Convert grass to `terrain` with elongated strokes `thickness` cells
/// wide until `percent` of the map has been converted, no grass is left,
/// or too many strokes have come to nothing.
///
/// Each stroke keeps its heading and, on every step, turns 45 degrees
/// with even odds (left or right alike). A stroke ends at the map edge or
/// on a cell that is neither grass nor `terrain`.
///
/// Returns the number of cells converted.
pub fn paint_streamer(
    grid: &mut MapGrid,
    rng: &mut MapRng,
    terrain: Terrain,
    percent: u32,
    thickness: u32,
) -> usize {
    let target = percent_of(grid.area(), percent);
    let max_steps = (grid.width() + grid.height()) as usize;
    let mut converted = 0;
    let mut failures = 0;

    while converted < target && failures < SEED_ATTEMPTS {
        // No grass left anywhere: further seeds cannot succeed.
        let Some(mut pos) = random_seed(grid, rng) else {
            break;
        };
        let mut heading = Direction::ALL[rng.index(8)];
        let before = converted;

        for _ in 0..max_steps {
            converted += stamp(grid, pos, heading, terrain, thickness);
            if converted >= target {
                break;
            }

            if rng.one_in(2) {
                heading = if rng.one_in(2) {
                    heading.rotate(-1)
                } else {
                    heading.rotate(1)
                };
            }
            pos = pos.step(heading);
            match grid.terrain(pos) {
                Some(t) if t == Terrain::Grass || t == terrain => {}
                _ => break,
            }
        }

        if converted == before {
            failures += 1;
        }
    }

    debug!(?terrain, percent, thickness, target, converted, failures, "Painted streamers");
    converted
}

/// Nearest grass cell to `from` (Chebyshev rings, `from` itself first).
///
/// Rings are visited outward, each ring's border exactly once, so the
/// search ends at the map edge with `None` when no grass is left.
#[must_use]
pub fn seek_plain(grid: &MapGrid, from: Pos) -> Option<Pos> {
    if grid.is(from, Terrain::Grass) {
        return Some(from);
    }
    let max_radius = grid.width().max(grid.height()) as i32;
    for r in 1..=max_radius {
        // Top and bottom rows of the ring, then the left and right columns
        // without their corners.
        for dx in -r..=r {
            for pos in [from.offset(dx, -r), from.offset(dx, r)] {
                if grid.is(pos, Terrain::Grass) {
                    return Some(pos);
                }
            }
        }
        for dy in (1 - r)..r {
            for pos in [from.offset(-r, dy), from.offset(r, dy)] {
                if grid.is(pos, Terrain::Grass) {
                    return Some(pos);
                }
            }
        }
    }
    None
}

/// Random cell, moved to the nearest grass if it is not grass itself.
fn random_seed(grid: &MapGrid, rng: &mut MapRng) -> Option<Pos> {
    let pos = Pos::new(
        rng.uniform(grid.width()) as i32,
        rng.uniform(grid.height()) as i32,
    );
    seek_plain(grid, pos)
}

/// A grass neighbour of `pos`, trying all 8 directions from a random
/// starting rotation.
fn random_grass_neighbour(grid: &MapGrid, rng: &mut MapRng, pos: Pos) -> Option<Pos> {
    let start = rng.uniform(8) as i32;
    (0..8)
        .map(|i| pos.step(Direction::North.rotate(start + i)))
        .find(|&next| grid.is(next, Terrain::Grass))
}

/// Paint the band perpendicular to `heading` centred on `pos`.
/// Returns the number of grass cells converted.
fn stamp(grid: &mut MapGrid, pos: Pos, heading: Direction, terrain: Terrain, thickness: u32) -> usize {
    let (px, py) = heading.rotate(2).delta();
    let thickness = thickness.max(1) as i32;
    let low = -(thickness - 1) / 2;
    let mut converted = 0;
    for i in low..low + thickness {
        let cell = pos.offset(px * i, py * i);
        if grid.is(cell, Terrain::Grass) {
            grid.set_terrain(cell, terrain);
            converted += 1;
        }
    }
    converted
}
