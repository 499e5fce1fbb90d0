//! Generator configuration.
//!
//! Constrained fields are only reachable through setters that validate
//! their input. A rejected value leaves the previous value in place, so a
//! configuration is never partially applied.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, MapGenError, Result};
use crate::grid::Terrain;

/// Smallest accepted map edge.
pub const MIN_DIMENSION: u32 = 8;

/// Largest accepted map edge.
pub const MAX_DIMENSION: u32 = 1024;

/// Width of the "normal" preset. Bridges on larger maps must stay local.
pub const NORMAL_WIDTH: u32 = 112;

/// Height of the "normal" preset.
pub const NORMAL_HEIGHT: u32 = 156;

/// Map configuration for procedural generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    width: u32,
    height: u32,
    water: u32,
    forest: u32,
    hills: u32,
    mountains: u32,
    swamp: u32,
    cities: u32,
    ruins: u32,
    temples: u32,
    signposts: u32,
    stones: u32,
    stone_road_chance: u32,
    build_roads: bool,
    river_style: u32,
    city_size: u32,
    tiles_per_overview_tile: u32,
    seed: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::normal()
    }
}

impl MapConfig {
    /// Create a small map (50x50).
    #[must_use]
    pub fn small() -> Self {
        Self {
            width: 50,
            height: 50,
            cities: 6,
            ruins: 5,
            temples: 2,
            signposts: 4,
            stones: 5,
            ..Self::normal()
        }
    }

    /// Create a normal-sized map (112x156).
    #[must_use]
    pub fn normal() -> Self {
        Self {
            width: NORMAL_WIDTH,
            height: NORMAL_HEIGHT,
            water: 25,
            forest: 10,
            hills: 5,
            mountains: 5,
            swamp: 2,
            cities: 20,
            ruins: 20,
            temples: 4,
            signposts: 20,
            stones: 20,
            stone_road_chance: 4,
            build_roads: true,
            river_style: 1,
            city_size: 2,
            tiles_per_overview_tile: 1,
            seed: 12345,
        }
    }

    /// Create a large map (224x312).
    #[must_use]
    pub fn large() -> Self {
        Self {
            width: NORMAL_WIDTH * 2,
            height: NORMAL_HEIGHT * 2,
            cities: 60,
            ruins: 50,
            temples: 10,
            signposts: 50,
            stones: 60,
            tiles_per_overview_tile: 2,
            ..Self::normal()
        }
    }

    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of cities to attempt.
    #[must_use]
    pub const fn with_cities(mut self, count: u32) -> Self {
        self.cities = count;
        self
    }

    /// Set the number of ruins to attempt.
    #[must_use]
    pub const fn with_ruins(mut self, count: u32) -> Self {
        self.ruins = count;
        self
    }

    /// Set the number of temples to attempt.
    #[must_use]
    pub const fn with_temples(mut self, count: u32) -> Self {
        self.temples = count;
        self
    }

    /// Set the number of signposts to attempt.
    #[must_use]
    pub const fn with_signposts(mut self, count: u32) -> Self {
        self.signposts = count;
        self
    }

    /// Set the number of standing stones to attempt.
    #[must_use]
    pub const fn with_stones(mut self, count: u32) -> Self {
        self.stones = count;
        self
    }

    /// Enable or disable the road and bridge network.
    #[must_use]
    pub const fn with_roads(mut self, build_roads: bool) -> Self {
        self.build_roads = build_roads;
        self
    }

    /// Map with every terrain percentage at zero (all grass).
    #[must_use]
    pub const fn without_terrain(mut self) -> Self {
        self.water = 0;
        self.forest = 0;
        self.hills = 0;
        self.mountains = 0;
        self.swamp = 0;
        self
    }

    /// Parse and validate a RON document. Missing fields take the
    /// [`MapConfig::normal`] values.
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(source).map_err(|e| MapGenError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| MapGenError::ConfigParse(e.to_string()))
    }

    /// Check every constraint at once.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        check_dimensions(self.width, self.height)?;
        let total = self.terrain_total();
        if total > 100 {
            return Err(ConfigError::PercentageOverflow {
                total: clamp_total(total),
            });
        }
        check_positive("stone_road_chance", self.stone_road_chance)?;
        check_range("river_style", self.river_style, 1, 3)?;
        check_range("city_size", self.city_size, 1, 4)?;
        check_range("tiles_per_overview_tile", self.tiles_per_overview_tile, 1, 8)?;
        Ok(())
    }

    /// Set map dimensions.
    pub fn set_size(&mut self, width: u32, height: u32) -> std::result::Result<(), ConfigError> {
        check_dimensions(width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Set the share of the map painted with `terrain`.
    ///
    /// Grass is whatever remains and cannot be set directly.
    pub fn set_percentage(
        &mut self,
        terrain: Terrain,
        percent: u32,
    ) -> std::result::Result<(), ConfigError> {
        let current = self.percentage_field(terrain);
        let Some(current) = current else {
            return Err(ConfigError::OutOfRange {
                field: "grass",
                value: percent,
                min: 0,
                max: 0,
            });
        };
        check_range(terrain_field(terrain), percent, 0, 100)?;
        let total = self.terrain_total() - u64::from(current) + u64::from(percent);
        if total > 100 {
            return Err(ConfigError::PercentageOverflow {
                total: clamp_total(total),
            });
        }
        match terrain {
            Terrain::Water => self.water = percent,
            Terrain::Forest => self.forest = percent,
            Terrain::Hills => self.hills = percent,
            Terrain::Mountain => self.mountains = percent,
            Terrain::Swamp => self.swamp = percent,
            Terrain::Grass => {}
        }
        Ok(())
    }

    /// Set the odds (1 in `chance`) that a standing stone is placed by a road.
    pub fn set_stone_road_chance(&mut self, chance: u32) -> std::result::Result<(), ConfigError> {
        check_positive("stone_road_chance", chance)?;
        self.stone_road_chance = chance;
        Ok(())
    }

    /// Set river style: 1 joins every water body, 3 joins every third.
    pub fn set_river_style(&mut self, style: u32) -> std::result::Result<(), ConfigError> {
        check_range("river_style", style, 1, 3)?;
        self.river_style = style;
        Ok(())
    }

    /// Set the city footprint edge length.
    pub fn set_city_size(&mut self, size: u32) -> std::result::Result<(), ConfigError> {
        check_range("city_size", size, 1, 4)?;
        self.city_size = size;
        Ok(())
    }

    /// Set the overview-map scale factor used for spacing and sampling.
    pub fn set_tiles_per_overview_tile(
        &mut self,
        tiles: u32,
    ) -> std::result::Result<(), ConfigError> {
        check_range("tiles_per_overview_tile", tiles, 1, 8)?;
        self.tiles_per_overview_tile = tiles;
        Ok(())
    }

    /// Map width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Share of the map (in percent) assigned to `terrain`.
    #[must_use]
    pub fn percentage(&self, terrain: Terrain) -> u32 {
        self.percentage_field(terrain)
            .unwrap_or_else(|| 100u32.saturating_sub(clamp_total(self.terrain_total())))
    }

    /// Number of cities to attempt.
    #[must_use]
    pub const fn cities(&self) -> u32 {
        self.cities
    }

    /// Number of ruins to attempt.
    #[must_use]
    pub const fn ruins(&self) -> u32 {
        self.ruins
    }

    /// Number of temples to attempt.
    #[must_use]
    pub const fn temples(&self) -> u32 {
        self.temples
    }

    /// Number of signposts to attempt.
    #[must_use]
    pub const fn signposts(&self) -> u32 {
        self.signposts
    }

    /// Number of standing stones to attempt.
    #[must_use]
    pub const fn stones(&self) -> u32 {
        self.stones
    }

    /// Odds (1 in n) that a standing stone goes beside a road.
    #[must_use]
    pub const fn stone_road_chance(&self) -> u32 {
        self.stone_road_chance
    }

    /// Whether roads and bridges are built.
    #[must_use]
    pub const fn build_roads(&self) -> bool {
        self.build_roads
    }

    /// River style (1..=3).
    #[must_use]
    pub const fn river_style(&self) -> u32 {
        self.river_style
    }

    /// City footprint edge length.
    #[must_use]
    pub const fn city_size(&self) -> u32 {
        self.city_size
    }

    /// Overview-map scale factor.
    #[must_use]
    pub const fn tiles_per_overview_tile(&self) -> u32 {
        self.tiles_per_overview_tile
    }

    /// Random seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// True if the map is bigger than the normal preset.
    #[must_use]
    pub const fn is_larger_than_normal(&self) -> bool {
        self.width as u64 * self.height as u64 > NORMAL_WIDTH as u64 * NORMAL_HEIGHT as u64
    }

    fn percentage_field(&self, terrain: Terrain) -> Option<u32> {
        match terrain {
            Terrain::Water => Some(self.water),
            Terrain::Forest => Some(self.forest),
            Terrain::Hills => Some(self.hills),
            Terrain::Mountain => Some(self.mountains),
            Terrain::Swamp => Some(self.swamp),
            Terrain::Grass => None,
        }
    }

    /// Sum of the painted shares. Widened so out-of-range values read from
    /// a document cannot overflow.
    fn terrain_total(&self) -> u64 {
        [self.water, self.forest, self.hills, self.mountains, self.swamp]
            .into_iter()
            .map(u64::from)
            .sum()
    }
}

fn clamp_total(total: u64) -> u32 {
    u32::try_from(total).unwrap_or(u32::MAX)
}

const fn terrain_field(terrain: Terrain) -> &'static str {
    match terrain {
        Terrain::Grass => "grass",
        Terrain::Water => "water",
        Terrain::Forest => "forest",
        Terrain::Hills => "hills",
        Terrain::Mountain => "mountains",
        Terrain::Swamp => "swamp",
    }
}

fn check_dimensions(width: u32, height: u32) -> std::result::Result<(), ConfigError> {
    let valid = MIN_DIMENSION..=MAX_DIMENSION;
    if !valid.contains(&width) || !valid.contains(&height) {
        return Err(ConfigError::Dimensions {
            width,
            height,
            min: MIN_DIMENSION,
            max: MAX_DIMENSION,
        });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: u32) -> std::result::Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NotPositive { field });
    }
    Ok(())
}

fn check_range(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> std::result::Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
