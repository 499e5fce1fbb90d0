//! # Mapgen Core
//!
//! Deterministic random map generator for a turn-based strategy game.
//!
//! This crate contains **only** generation logic:
//! - No rendering
//! - No IO
//! - No system randomness (every draw comes from a seeded [`rng::MapRng`])
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Reproducible maps from a seed
//! - Batch validation of many seeds in parallel
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`generator`] - The generation pipeline and its output snapshots
//! - [`grid`] - Terrain and building layers
//! - [`carve`] - Terrain painting brushes
//! - [`regions`] - Connected regions, islands and rivers
//! - [`smoothing`] - Coastline and lone-tile clean-up
//! - [`placement`] - Cities, ruins, temples and signposts
//! - [`roads`], [`bridges`] - Transport network
//! - [`accessibility`] - Reachability repair
//! - [`pathfinding`] - Grid shortest paths
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod accessibility;
pub mod bridges;
pub mod carve;
pub mod config;
pub mod error;
pub mod generator;
pub mod grid;
pub mod math;
pub mod objects;
pub mod pathfinding;
pub mod placement;
pub mod regions;
pub mod rng;
pub mod roads;
pub mod smoothing;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::accessibility::AccessibilityReport;
    pub use crate::config::MapConfig;
    pub use crate::error::{ConfigError, MapGenError, Result};
    pub use crate::generator::{
        validate_map, BuildingSnapshot, MapGenerator, Progress, Stage, TerrainSnapshot,
    };
    pub use crate::grid::{Building, Direction, MapGrid, Pos, Terrain};
    pub use crate::math::Fixed;
    pub use crate::objects::{MapObject, MapObjects};
    pub use crate::pathfinding::{GridPathfinder, Movement};
    pub use crate::rng::MapRng;
}
