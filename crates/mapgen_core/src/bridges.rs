//! Bridges across narrow straits.
//!
//! A bridge site is a two-cell water channel with land at both ends and
//! open water along both flanks. Sites are only built when they give two
//! landmarks a route they lack, or a markedly shorter one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MapConfig;
use crate::grid::{Building, Direction, MapGrid, Pos, Terrain};
use crate::math::{euclidean, Fixed};
use crate::objects::{MapObjects, LANDMARKS};
use crate::pathfinding::{GridPathfinder, Movement};
use crate::roads::build_road;
use crate::rng::MapRng;

/// Most bridges built on one map.
pub const MAX_BRIDGES: u32 = 8;

/// Flank cells that must be water on each side of a channel, out of 8.
const MIN_FLANK_WATER: usize = 6;

/// Cells the bridge itself adds to a route.
const BRIDGE_COST: u32 = 2;

/// Axis a bridge spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeOrientation {
    /// Crosses a channel running east to west.
    NorthSouth,
    /// Crosses a channel running north to south.
    EastWest,
}

impl BridgeOrientation {
    /// Unit step from the first end toward the second.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::NorthSouth => Direction::South,
            Self::EastWest => Direction::East,
        }
    }
}

/// Candidate bridge: the land cell at its north or west end plus its axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeSite {
    /// Axis of the bridge.
    pub orientation: BridgeOrientation,
    /// North (or west) landing.
    pub pos: Pos,
}

impl BridgeSite {
    /// The two water cells that become bridge.
    #[must_use]
    pub const fn span(&self) -> [Pos; 2] {
        let (dx, dy) = self.orientation.direction().delta();
        [self.pos.offset(dx, dy), self.pos.offset(2 * dx, 2 * dy)]
    }

    /// The landing cells at both ends.
    #[must_use]
    pub const fn ends(&self) -> (Pos, Pos) {
        let (dx, dy) = self.orientation.direction().delta();
        (self.pos, self.pos.offset(3 * dx, 3 * dy))
    }
}

fn matches_site(grid: &MapGrid, site: &BridgeSite) -> bool {
    let (start, end) = site.ends();
    if !grid.is_land(start) || !grid.is_land(end) {
        return false;
    }
    let span = site.span();
    if !span
        .iter()
        .all(|&p| grid.is(p, Terrain::Water) && grid.has(p, Building::None))
    {
        return false;
    }
    // Flanks run four cells out on each side of both channel cells.
    let (sx, sy) = site.orientation.direction().rotate(2).delta();
    [-1, 1].iter().all(|&side| {
        let water = span
            .iter()
            .flat_map(|&p| (1..=4).map(move |i| p.offset(sx * i * side, sy * i * side)))
            .filter(|&p| grid.is(p, Terrain::Water))
            .count();
        water >= MIN_FLANK_WATER
    })
}

/// Every bridge site on the map, shuffled and thinned so that no two kept
/// sites lie closer than 4.5 cells.
#[must_use]
pub fn find_bridge_places(grid: &MapGrid, rng: &mut MapRng) -> Vec<BridgeSite> {
    let mut found: Vec<BridgeSite> = grid
        .positions()
        .flat_map(|pos| {
            [BridgeOrientation::NorthSouth, BridgeOrientation::EastWest]
                .map(|orientation| BridgeSite { orientation, pos })
        })
        .filter(|site| matches_site(grid, site))
        .collect();
    rng.shuffle(&mut found);

    let min_gap = Fixed::from_num(9) / Fixed::from_num(2);
    let mut kept: Vec<BridgeSite> = Vec::new();
    for site in found {
        let crowded = kept
            .iter()
            .any(|k| euclidean(k.pos.x - site.pos.x, k.pos.y - site.pos.y) < min_gap);
        if !crowded {
            kept.push(site);
        }
    }
    kept
}

/// The pair of landmarks a bridge at `site` would join: the nearest one
/// beyond each end, looking along the bridge axis.
///
/// Rejects pairs closer than a city footprint and, on maps larger than
/// the normal preset, pairs more than a sixth of the map apart on either
/// axis.
#[must_use]
pub fn find_bridge_purpose(objects: &MapObjects, site: &BridgeSite, config: &MapConfig) -> Option<(Pos, Pos)> {
    let (start, end) = site.ends();
    let forward = site.orientation.direction();
    let a = objects.nearest_to(start, Some(forward.rotate(4)), &LANDMARKS)?.pos;
    let b = objects.nearest_to(end, Some(forward), &LANDMARKS)?.pos;

    if a.chebyshev(b) < config.city_size() {
        return None;
    }
    if config.is_larger_than_normal() {
        let dx = a.x.abs_diff(b.x);
        let dy = a.y.abs_diff(b.y);
        if dx > config.width() / 6 || dy > config.height() / 6 {
            return None;
        }
    }
    Some((a, b))
}

/// Whether a route costing `bridged` justifies a bridge over one costing
/// `current` (`None` when there is no route yet).
fn worth_building(rng: &mut MapRng, current: Option<u32>, bridged: u32) -> bool {
    match current {
        None => true,
        Some(cost) if bridged * 3 <= cost => true,
        Some(cost) if bridged * 2 <= cost => rng.one_in(2),
        Some(_) => false,
    }
}

/// Build up to [`MAX_BRIDGES`] bridges where they pay off, paving a road
/// from each end to the landmark it serves.
///
/// Returns the number built.
pub fn make_bridges(grid: &mut MapGrid, rng: &mut MapRng, config: &MapConfig) -> u32 {
    let sites = find_bridge_places(grid, rng);
    let objects = MapObjects::scan(grid);
    let mut built = 0;

    for site in &sites {
        if built >= MAX_BRIDGES {
            break;
        }
        let Some((a, b)) = find_bridge_purpose(&objects, site, config) else {
            continue;
        };
        // An earlier bridge may have cut into this site
        if !matches_site(grid, site) {
            continue;
        }

        let from_a = GridPathfinder::new(grid, a, Movement::Land);
        let from_b = GridPathfinder::new(grid, b, Movement::Land);
        let (start, end) = site.ends();
        let (Some(approach_a), Some(approach_b)) = (from_a.path_to(start), from_b.path_to(end)) else {
            continue;
        };
        let (Some(cost_a), Some(cost_b)) = (from_a.cost_to(start), from_b.cost_to(end)) else {
            continue;
        };
        let current = from_a.cost_to(b);
        let bridged = cost_a + cost_b + BRIDGE_COST;

        if !worth_building(rng, current, bridged) {
            continue;
        }

        for pos in site.span() {
            grid.set_building(pos, Building::Bridge);
        }
        build_road(grid, &approach_a);
        build_road(grid, &approach_b);
        built += 1;
        debug!(?site, ?current, bridged, "Built bridge");
    }

    debug!(candidates = sites.len(), built, "Made bridges");
    built
}
