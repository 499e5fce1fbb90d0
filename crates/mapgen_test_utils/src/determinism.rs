//! Determinism testing utilities.
//!
//! Provides a harness for verifying that map generation produces
//! identical maps given identical inputs.
//!
//! # Testing Strategy
//!
//! A seed must reproduce the same map on every machine and every run.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`mapgen_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The generator only iterates vectors in row-major or registry order.
//!
//! - **System randomness**: Every draw comes from the seeded
//!   [`mapgen_core::rng::MapRng`].
//!
//! - **Shared state**: Scratch registries live for one phase of one run, so
//!   generators on different threads cannot see each other.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual passes (painting, labeling, placement)
//! 2. **Property tests**: Random configurations must still generate deterministically
//! 3. **Parallel tests**: Running N generators in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use mapgen_core::config::MapConfig;
use mapgen_core::generator::MapGenerator;
use mapgen_core::grid::Pos;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Seed every run used.
    pub seed: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic generation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that generation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Map generation is non-deterministic!\n\
                 Runs: {}\n\
                 Seed: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.seed,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a generation several times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `setup` - Function to create the initial state
/// * `run` - Function that generates into the state
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Run, HashFn>(
    runs: usize,
    setup: Setup,
    run: Run,
    hash: HashFn,
) -> Vec<u64>
where
    Setup: Fn() -> S,
    Run: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    (0..runs)
        .map(|_| {
            let mut state = setup();
            run(&mut state);
            hash(&state)
        })
        .collect()
}

/// Generate a map `runs` times from one configuration and compare hashes.
///
/// # Panics
///
/// Panics if the configuration is invalid.
///
/// # Example
///
/// ```
/// use mapgen_core::config::MapConfig;
/// use mapgen_test_utils::determinism::verify_generation_determinism;
///
/// let result = verify_generation_determinism(&MapConfig::small().with_seed(3), 2);
/// result.assert_deterministic();
/// ```
#[must_use]
pub fn verify_generation_determinism(config: &MapConfig, runs: usize) -> DeterminismResult {
    let hashes = verify_determinism(
        runs,
        || generator(config),
        |g| g.generate(|_| {}),
        MapGenerator::map_hash,
    );
    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        seed: config.seed(),
    }
}

/// Generate the same map on `threads` scoped threads at once.
///
/// # Panics
///
/// Panics if the configuration is invalid or a thread panics.
#[must_use]
pub fn run_parallel_generations(config: &MapConfig, threads: usize) -> DeterminismResult {
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    let mut g = generator(config);
                    g.generate(|_| {});
                    g.map_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<u64>>()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        seed: config.seed(),
    }
}

/// First cell, in row-major order, where two generated maps differ in
/// terrain or building. `None` if the maps match.
#[must_use]
pub fn find_first_divergence(a: &MapGenerator, b: &MapGenerator) -> Option<Pos> {
    let (ta, tb) = (a.terrain(), b.terrain());
    let (ba, bb) = (a.buildings(), b.buildings());
    let width = ta.width.max(1) as usize;
    (0..ta.cells.len().max(tb.cells.len()))
        .find(|&i| ta.cells.get(i) != tb.cells.get(i) || ba.cells.get(i) != bb.cells.get(i))
        .map(|i| Pos::new((i % width) as i32, (i / width) as i32))
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn generator(config: &MapConfig) -> MapGenerator {
    MapGenerator::new(config.clone()).unwrap_or_else(|e| panic!("invalid test config: {e}"))
}

/// Proptest strategies for generator testing.
pub mod strategies {
    use mapgen_core::config::MapConfig;
    use mapgen_core::grid::Terrain;
    use proptest::prelude::*;

    /// Any seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Terrain percentages (water, forest, hills, mountains, swamp) that
    /// sum to at most 100.
    pub fn arb_terrain_mix() -> impl Strategy<Value = [u32; 5]> {
        (0u32..=40, 0u32..=15, 0u32..=15, 0u32..=15, 0u32..=10)
            .prop_map(|(w, f, h, m, s)| [w, f, h, m, s])
    }

    /// A small, valid configuration with random size, terrain mix,
    /// building counts and seed.
    pub fn arb_config() -> impl Strategy<Value = MapConfig> {
        (
            24u32..=48,
            24u32..=48,
            arb_terrain_mix(),
            0u32..=8,
            0u32..=6,
            any::<bool>(),
            1u32..=3,
            arb_seed(),
        )
            .prop_map(|(width, height, mix, cities, ruins, roads, river_style, seed)| {
                let mut config = MapConfig::small()
                    .without_terrain()
                    .with_cities(cities)
                    .with_ruins(ruins)
                    .with_temples(ruins / 2)
                    .with_signposts(ruins)
                    .with_stones(cities)
                    .with_roads(roads)
                    .with_seed(seed);
                // Values are drawn in range, so none of these can fail.
                let _ = config.set_size(width, height);
                let _ = config.set_river_style(river_style);
                for (terrain, percent) in [
                    Terrain::Water,
                    Terrain::Forest,
                    Terrain::Hills,
                    Terrain::Mountain,
                    Terrain::Swamp,
                ]
                .into_iter()
                .zip(mix)
                {
                    let _ = config.set_percentage(terrain, percent);
                }
                config
            })
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::arb_config;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_small_map_is_deterministic() {
        verify_generation_determinism(&MapConfig::small().with_seed(42), 3).assert_deterministic();
    }

    #[test]
    fn test_parallel_generations_match() {
        let result = run_parallel_generations(&MapConfig::small().with_seed(7), 4);
        result.assert_deterministic();
        assert_eq!(result.hashes.len(), 4);
    }

    #[test]
    fn test_divergence_found_between_seeds() {
        let mut a = generator(&MapConfig::small().with_seed(1));
        let mut b = generator(&MapConfig::small().with_seed(2));
        a.generate(|_| {});
        b.generate(|_| {});
        assert!(find_first_divergence(&a, &b).is_some());
        assert_eq!(find_first_divergence(&a, &a), None);
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1u32, 2u32)), compute_hash(&(1u32, 2u32)));
    }

    #[test]
    #[should_panic(expected = "non-deterministic")]
    fn test_assert_reports_divergence() {
        DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2],
            seed: 0,
        }
        .assert_deterministic();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Any valid configuration generates the same map twice.
        #[test]
        fn prop_any_config_is_deterministic(config in arb_config()) {
            let result = verify_generation_determinism(&config, 2);
            prop_assert!(result.is_deterministic);
        }

        /// Generated configurations always validate.
        #[test]
        fn prop_arb_config_is_valid(config in arb_config()) {
            prop_assert!(config.validate().is_ok());
        }
    }
}
