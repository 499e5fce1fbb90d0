//! The map generation pipeline.
//!
//! [`MapGenerator`] owns the map for the whole run and drives every pass in
//! a fixed order: water, mountains and the other terrain first, then
//! smoothing, buildings, roads, bridges, the reachability repair and the
//! final decorations. The seed in [`MapConfig`] fully determines the
//! result.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::accessibility::{make_cities_accessible, AccessibilityReport};
use crate::bridges::make_bridges;
use crate::carve::{paint_streamer, paint_terrain};
use crate::config::MapConfig;
use crate::error::Result;
use crate::grid::{Building, Direction, MapGrid, Pos, Terrain};
use crate::math::{fixed_serde, fraction, Fixed};
use crate::objects::MapObjects;
use crate::placement::{place_buildings, BuildingKind};
use crate::regions::{make_rivers, verify_islands};
use crate::rng::MapRng;
use crate::roads::{cleanup_roads, connect_cities_with_roads, make_standing_stones};
use crate::smoothing::{normalize, rescue_lone_tiles, surround_mountains};

/// Pipeline stage just finished when progress is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Lakes, rivers and islands.
    Water,
    /// Mountain chains.
    MountainChains,
    /// Mountain massifs and their foothills.
    Mountains,
    /// Hills.
    Hills,
    /// Forest.
    Forest,
    /// Swamp.
    Swamp,
    /// Coastline smoothing.
    Smoothing,
    /// Cities.
    Cities,
    /// Ruins.
    Ruins,
    /// Temples.
    Temples,
    /// Roads between cities.
    Roads,
    /// Bridges.
    Bridges,
    /// Reachability repair.
    Accessibility,
    /// Signposts and standing stones.
    Decoration,
    /// Final clean-up; the map is complete.
    Done,
}

impl Stage {
    /// Share of the pipeline complete once this stage ends, in percent.
    #[must_use]
    pub const fn milestone(self) -> u32 {
        match self {
            Self::Water => 7,
            Self::MountainChains => 14,
            Self::Mountains => 21,
            Self::Hills => 28,
            Self::Forest => 35,
            Self::Swamp => 42,
            Self::Smoothing => 49,
            Self::Cities => 56,
            Self::Ruins => 63,
            Self::Temples => 70,
            Self::Roads => 77,
            Self::Bridges => 84,
            Self::Accessibility => 91,
            Self::Decoration => 98,
            Self::Done => 100,
        }
    }
}

/// Progress event passed to the caller's callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Stage just completed.
    pub stage: Stage,
    /// Fraction of the pipeline complete, in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub fraction: Fixed,
}

impl Progress {
    fn at(stage: Stage) -> Self {
        Self {
            stage,
            fraction: fraction(stage.milestone(), 100),
        }
    }
}

/// Terrain of a finished map, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainSnapshot {
    /// Cells, `y * width + x`.
    pub cells: Vec<Terrain>,
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
}

/// Buildings of a finished map, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingSnapshot {
    /// Cells, `y * width + x`.
    pub cells: Vec<Building>,
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
}

/// Random map generator.
///
/// # Example
///
/// ```
/// use mapgen_core::prelude::*;
///
/// let mut generator = MapGenerator::new(MapConfig::small().with_seed(7)).unwrap();
/// generator.generate(|_| {});
/// let terrain = generator.terrain();
/// assert_eq!(terrain.cells.len(), 50 * 50);
/// ```
#[derive(Debug, Clone)]
pub struct MapGenerator {
    config: MapConfig,
    grid: MapGrid,
    report: AccessibilityReport,
}

impl MapGenerator {
    /// Create a generator for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MapGenError::InvalidConfig`] if the
    /// configuration fails validation.
    pub fn new(config: MapConfig) -> Result<Self> {
        config.validate()?;
        let grid = MapGrid::new(config.width(), config.height());
        Ok(Self {
            config,
            grid,
            report: AccessibilityReport::default(),
        })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Run the whole pipeline, replacing any previous map.
    ///
    /// `progress` is called synchronously after each stage.
    pub fn generate(&mut self, mut progress: impl FnMut(Progress)) {
        let config = &self.config;
        let grid = &mut self.grid;
        let mut rng = MapRng::new(config.seed());
        let spacing = config.tiles_per_overview_tile();
        info!(
            width = config.width(),
            height = config.height(),
            seed = config.seed(),
            "Generating map"
        );

        grid.reset();
        let mut report = |stage: Stage| {
            debug!(?stage, "Stage complete");
            progress(Progress::at(stage));
        };

        let water = config.percentage(Terrain::Water);
        let lakes = water * 2 / 3;
        paint_terrain(grid, &mut rng, Terrain::Water, lakes, false);
        paint_streamer(grid, &mut rng, Terrain::Water, water - lakes, 3);
        make_rivers(grid, &mut rng, config.river_style(), spacing);
        verify_islands(grid, &mut rng);
        report(Stage::Water);

        let mountains = config.percentage(Terrain::Mountain);
        let chains = mountains / 2;
        paint_streamer(grid, &mut rng, Terrain::Mountain, chains, 1);
        report(Stage::MountainChains);
        paint_terrain(grid, &mut rng, Terrain::Mountain, mountains - chains, true);
        rescue_lone_tiles(grid, &mut rng, Terrain::Mountain, Terrain::Hills, false);
        surround_mountains(grid);
        report(Stage::Mountains);

        for (terrain, stage) in [
            (Terrain::Hills, Stage::Hills),
            (Terrain::Forest, Stage::Forest),
            (Terrain::Swamp, Stage::Swamp),
        ] {
            paint_terrain(grid, &mut rng, terrain, config.percentage(terrain), false);
            report(stage);
        }

        normalize(grid, &mut rng);
        rescue_lone_tiles(grid, &mut rng, Terrain::Water, Terrain::Grass, true);
        report(Stage::Smoothing);

        for (kind, count, footprint, stage) in [
            (BuildingKind::City, config.cities(), config.city_size(), Stage::Cities),
            (BuildingKind::Ruin, config.ruins(), 1, Stage::Ruins),
            (BuildingKind::Temple, config.temples(), 1, Stage::Temples),
        ] {
            place_buildings(grid, &mut rng, kind, count, footprint, spacing);
            report(stage);
        }

        if config.build_roads() {
            let objects = MapObjects::scan(grid);
            connect_cities_with_roads(grid, &objects, config.city_size());
            report(Stage::Roads);
            make_bridges(grid, &mut rng, config);
            report(Stage::Bridges);
        }

        let accessibility = make_cities_accessible(grid);
        report(Stage::Accessibility);

        place_buildings(grid, &mut rng, BuildingKind::Signpost, config.signposts(), 1, spacing);
        make_standing_stones(grid, &mut rng, config.stones(), config.stone_road_chance());
        report(Stage::Decoration);

        cleanup_roads(grid);

        #[cfg(feature = "debug-validation")]
        if let Err(problem) = validate_map(grid) {
            tracing::error!(%problem, "Generated map breaks an invariant");
        }

        #[cfg(debug_assertions)]
        {
            let hash = map_hash(grid);
            debug!(map_hash = hash, "Generated map hash");
        }

        report(Stage::Done);
        info!(
            cities = grid.building_grid().count(|b| b == Building::City),
            unreachable = accessibility.unreachable.len(),
            "Map generated"
        );
        self.report = accessibility;
    }

    /// Terrain of the current map.
    #[must_use]
    pub fn terrain(&self) -> TerrainSnapshot {
        TerrainSnapshot {
            cells: self.grid.terrain_grid().cells().to_vec(),
            width: self.grid.width(),
            height: self.grid.height(),
        }
    }

    /// Buildings of the current map.
    #[must_use]
    pub fn buildings(&self) -> BuildingSnapshot {
        BuildingSnapshot {
            cells: self.grid.building_grid().cells().to_vec(),
            width: self.grid.width(),
            height: self.grid.height(),
        }
    }

    /// Every object on the current map, anchors in row-major order.
    #[must_use]
    pub fn objects(&self) -> MapObjects {
        MapObjects::scan(&self.grid)
    }

    /// Reachability of cities on the current map.
    #[must_use]
    pub const fn accessibility(&self) -> &AccessibilityReport {
        &self.report
    }

    /// The current map.
    #[must_use]
    pub const fn grid(&self) -> &MapGrid {
        &self.grid
    }

    /// Hash of the current map, for determinism checks.
    #[must_use]
    pub fn map_hash(&self) -> u64 {
        map_hash(&self.grid)
    }
}

fn map_hash(grid: &MapGrid) -> u64 {
    let mut hasher = DefaultHasher::new();
    grid.hash(&mut hasher);
    hasher.finish()
}

/// Check the structural invariants of a finished map.
///
/// Every bridge run must end on land at both ends, along one axis.
///
/// # Errors
///
/// Returns a description of the first broken invariant.
pub fn validate_map(grid: &MapGrid) -> std::result::Result<(), String> {
    for pos in grid.positions() {
        let building = grid.building(pos).unwrap_or_default();
        let terrain = grid.terrain(pos).unwrap_or_default();
        match building {
            Building::Road if terrain == Terrain::Water => {
                return Err(format!("road on water at {pos:?}"));
            }
            Building::Bridge if terrain != Terrain::Water => {
                return Err(format!("bridge on land at {pos:?}"));
            }
            Building::City | Building::Ruin | Building::Temple if terrain != Terrain::Grass => {
                return Err(format!("{building:?} on {terrain:?} at {pos:?}"));
            }
            _ => {}
        }
    }
    for pos in grid.positions().filter(|&p| grid.has(p, Building::Bridge)) {
        let landed = [Direction::East, Direction::South]
            .into_iter()
            .any(|dir| bridge_end(grid, pos, dir.rotate(4)) && bridge_end(grid, pos, dir));
        if !landed {
            return Err(format!("bridge at {pos:?} has no landing"));
        }
    }
    for object in MapObjects::scan(grid).all() {
        let size = object.size as i32;
        for dy in 0..size {
            for dx in 0..size {
                let cell = object.pos.offset(dx, dy);
                if !grid.has(cell, object.kind) {
                    return Err(format!("{:?} at {:?} has a ragged footprint", object.kind, object.pos));
                }
            }
        }
    }
    Ok(())
}

/// Whether the bridge run through `pos` reaches land going `dir`.
fn bridge_end(grid: &MapGrid, pos: Pos, dir: Direction) -> bool {
    let mut cell = pos.step(dir);
    while grid.has(cell, Building::Bridge) {
        cell = cell.step(dir);
    }
    grid.is_land(cell)
}
