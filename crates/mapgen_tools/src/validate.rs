//! Batch validation of generated maps.
//!
//! Generates one map per seed in parallel using rayon and checks each for
//! broken invariants, unreachable cities and missing buildings.

use std::path::Path;
use std::time::Instant;

use mapgen_core::config::MapConfig;
use mapgen_core::generator::{validate_map, MapGenerator};
use mapgen_core::grid::Building;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::Result;

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Base map configuration; its seed is replaced per map.
    pub map: MapConfig,
    /// Number of maps to generate.
    pub map_count: u32,
    /// First seed; map `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Treat unreachable cities as failures.
    pub require_reachable: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            map: MapConfig::default(),
            map_count: 100,
            seed_start: 0,
            require_reachable: false,
        }
    }
}

impl BatchConfig {
    /// Create a batch over `map_count` seeds of `map`.
    #[must_use]
    pub fn new(map: MapConfig, map_count: u32) -> Self {
        Self {
            map,
            map_count,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }
}

/// Statistics for one generated map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapReport {
    /// Seed used.
    pub seed: u64,
    /// Hash of the finished map.
    pub map_hash: u64,
    /// Cities placed.
    pub cities: u32,
    /// Ruins placed.
    pub ruins: u32,
    /// Temples placed.
    pub temples: u32,
    /// Bridges built.
    pub bridges: u32,
    /// Ports opened.
    pub ports: u32,
    /// Cities repaired by the accessibility pass.
    pub repaired: u32,
    /// Cities still unreachable from the capital.
    pub unreachable: u32,
}

/// A map that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Seed used.
    pub seed: u64,
    /// What was wrong.
    pub message: String,
}

/// Aggregate numbers over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Maps generated.
    pub maps: u32,
    /// Maps that failed validation.
    pub failures: u32,
    /// Mean cities per map.
    pub mean_cities: f64,
    /// Maps with at least one unreachable city.
    pub maps_with_unreachable: u32,
}

impl BatchSummary {
    fn from_reports(reports: &[MapReport], failures: usize) -> Self {
        let maps = reports.len() as u32;
        let cities: u32 = reports.iter().map(|r| r.cities).sum();
        Self {
            maps,
            failures: failures as u32,
            mean_cities: f64::from(cities) / f64::from(maps.max(1)),
            maps_with_unreachable: reports.iter().filter(|r| r.unreachable > 0).count() as u32,
        }
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-map statistics, in seed order.
    pub maps: Vec<MapReport>,
    /// Maps that failed.
    pub failures: Vec<BatchFailure>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// True if no map failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Save results to JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Generate and check one map.
///
/// # Errors
///
/// Returns a description of the problem if the map breaks an invariant,
/// or leaves a city unreachable when `require_reachable` is set.
pub fn check_map(config: &MapConfig, require_reachable: bool) -> Result<std::result::Result<MapReport, String>> {
    let mut generator = MapGenerator::new(config.clone())?;
    generator.generate(|_| {});

    if let Err(problem) = validate_map(generator.grid()) {
        return Ok(Err(problem));
    }
    let report = generator.accessibility();
    if require_reachable && !report.all_reachable() {
        return Ok(Err(format!(
            "{} cities unreachable from capital at {:?}",
            report.unreachable.len(),
            report.capital
        )));
    }

    let objects = generator.objects();
    let count = |kind: Building| objects.of_kind(kind).count() as u32;
    Ok(Ok(MapReport {
        seed: config.seed(),
        map_hash: generator.map_hash(),
        cities: count(Building::City),
        ruins: count(Building::Ruin),
        temples: count(Building::Temple),
        bridges: count(Building::Bridge) / 2,
        ports: count(Building::Port),
        repaired: report.repaired.len() as u32,
        unreachable: report.unreachable.len() as u32,
    }))
}

/// Run a batch of map generations.
///
/// # Errors
///
/// Returns an error if the base configuration is invalid. Individual map
/// failures are collected in [`BatchResults::failures`].
pub fn run_batch(config: BatchConfig) -> Result<BatchResults> {
    config.map.validate().map_err(mapgen_core::error::MapGenError::from)?;
    let start = Instant::now();
    info!(
        maps = config.map_count,
        seed_start = config.seed_start,
        width = config.map.width(),
        height = config.map.height(),
        "Starting batch validation"
    );

    let outcomes: Vec<(u64, Result<std::result::Result<MapReport, String>>)> = (0..config.map_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            let map = config.map.clone().with_seed(seed);
            let outcome = check_map(&map, config.require_reachable);
            debug!(seed, ok = matches!(outcome, Ok(Ok(_))), "Checked map");
            (seed, outcome)
        })
        .collect();

    let mut maps = Vec::new();
    let mut failures = Vec::new();
    for (seed, outcome) in outcomes {
        match outcome? {
            Ok(report) => maps.push(report),
            Err(message) => {
                warn!(seed, %message, "Map failed validation");
                failures.push(BatchFailure { seed, message });
            }
        }
    }

    let summary = BatchSummary::from_reports(&maps, failures.len());
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        maps = summary.maps,
        failures = summary.failures,
        duration_seconds,
        "Batch complete"
    );

    Ok(BatchResults {
        config,
        maps,
        failures,
        summary,
        duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_batch(count: u32) -> BatchConfig {
        BatchConfig::new(MapConfig::small(), count).with_seed(100)
    }

    #[test]
    fn test_batch_generates_every_seed() {
        let results = run_batch(small_batch(4)).unwrap();
        assert!(results.passed(), "{:?}", results.failures);
        let seeds: Vec<u64> = results.maps.iter().map(|m| m.seed).collect();
        assert_eq!(seeds, vec![100, 101, 102, 103]);
        assert_eq!(results.summary.maps, 4);
        assert!(results.summary.mean_cities > 0.0);
    }

    #[test]
    fn test_batch_is_deterministic() {
        let a = run_batch(small_batch(3)).unwrap();
        let b = run_batch(small_batch(3)).unwrap();
        let hashes = |r: &BatchResults| r.maps.iter().map(|m| m.map_hash).collect::<Vec<_>>();
        assert_eq!(hashes(&a), hashes(&b));
    }

    #[test]
    fn test_check_map_counts_buildings() {
        let report = check_map(&MapConfig::small().without_terrain().with_seed(5), true)
            .unwrap()
            .unwrap();
        assert!(report.cities > 0);
        assert_eq!(report.bridges, 0);
        assert_eq!(report.unreachable, 0);
    }

    #[test]
    fn test_empty_batch() {
        let results = run_batch(small_batch(0)).unwrap();
        assert!(results.maps.is_empty());
        assert_eq!(results.summary, BatchSummary::default());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("batch.json");
        let results = run_batch(small_batch(2)).unwrap();

        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();

        assert_eq!(loaded.maps, results.maps);
        assert_eq!(loaded.config.map, results.config.map);
    }
}
