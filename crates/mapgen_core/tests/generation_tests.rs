//! End-to-end generation tests.
//!
//! These drive whole pipelines and hand-built scenarios through the public
//! API, using the fixtures in `mapgen_test_utils`.

use mapgen_core::accessibility::make_cities_accessible;
use mapgen_core::bridges::make_bridges;
use mapgen_core::prelude::*;
use mapgen_core::roads::connect_cities_with_roads;
use mapgen_test_utils::determinism::strategies::arb_config;
use mapgen_test_utils::determinism::verify_generation_determinism;
use mapgen_test_utils::fixtures::{add_city, count_building, count_terrain, mountain_band, strait};
use proptest::prelude::*;

fn generate(config: MapConfig) -> MapGenerator {
    let mut generator = MapGenerator::new(config).unwrap();
    generator.generate(|_| {});
    generator
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_mountain_band_is_breached() {
    let (mut grid, north, south) = mountain_band(20, 20, 4);
    let mountains_before = count_terrain(&grid, Terrain::Mountain);

    let report = make_cities_accessible(&mut grid);

    assert_eq!(report.capital, Some(north));
    assert_eq!(report.repaired, vec![south]);
    assert!(report.all_reachable());
    assert!(count_terrain(&grid, Terrain::Mountain) < mountains_before);

    let land = GridPathfinder::new(&grid, north, Movement::Land);
    let path = land.path_to(south).unwrap();
    assert!(path.iter().all(|&p| !grid.is(p, Terrain::Mountain)));
}

#[test]
fn test_strait_gets_a_bridge() {
    let mut grid = strait(30, 30);
    let north = Pos::new(14, 5);
    let south = Pos::new(14, 24);
    add_city(&mut grid, north, 2);
    add_city(&mut grid, south, 2);

    // No road can cross open water
    let objects = MapObjects::scan(&grid);
    assert_eq!(connect_cities_with_roads(&mut grid, &objects, 2), 0);
    assert!(!GridPathfinder::new(&grid, north, Movement::Land).reaches(south));

    let mut rng = MapRng::new(77);
    let built = make_bridges(&mut grid, &mut rng, &MapConfig::small());

    assert!(built >= 1);
    assert_eq!(count_building(&grid, Building::Bridge), 2 * built as usize);
    assert!(GridPathfinder::new(&grid, north, Movement::Land).reaches(south));
    assert_eq!(validate_map(&grid), Ok(()));
}

// =============================================================================
// Whole pipeline
// =============================================================================

#[test]
fn test_small_preset_pipeline() {
    let generator = generate(MapConfig::small().with_seed(2024));
    let objects = generator.objects();

    assert_eq!(validate_map(generator.grid()), Ok(()));
    assert!(objects.of_kind(Building::City).count() > 0);
    assert!(objects.of_kind(Building::City).all(|c| c.size == 2));

    let report = generator.accessibility();
    let capital = report.capital.unwrap();
    assert!(objects.object_at(capital).is_some());
    for city in &report.repaired {
        assert!(!report.unreachable.contains(city));
    }
}

#[test]
fn test_terrain_shares_are_roughly_honoured() {
    let mut config = MapConfig::small().with_seed(31);
    config.set_size(64, 64).unwrap();
    let generator = generate(config);
    let terrain = generator.terrain();
    let water = terrain.cells.iter().filter(|&&t| t == Terrain::Water).count();
    let share = water * 100 / terrain.cells.len();
    // Smoothing, rivers and building footprints all move the coastline.
    assert!((5..=50).contains(&share), "water share {share}%");
}

#[test]
fn test_ron_config_round_trip_generates_same_map() {
    let config = MapConfig::small().with_seed(55);
    let parsed = MapConfig::from_ron(&config.to_ron().unwrap()).unwrap();
    assert_eq!(parsed, config);
    assert_eq!(generate(parsed).map_hash(), generate(config).map_hash());
}

#[test]
fn test_large_city_footprint() {
    let mut config = MapConfig::small().with_seed(13);
    config.set_city_size(3).unwrap();
    let generator = generate(config);
    for city in generator.objects().of_kind(Building::City) {
        assert_eq!(city.size, 3);
    }
    assert_eq!(validate_map(generator.grid()), Ok(()));
}

#[test]
fn test_seeds_are_deterministic() {
    for seed in [0, 1, u64::MAX] {
        verify_generation_determinism(&MapConfig::small().with_seed(seed), 2)
            .assert_deterministic();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Every valid configuration yields a map that keeps its invariants.
    #[test]
    fn prop_generated_maps_are_valid(config in arb_config()) {
        let mut generator = MapGenerator::new(config).unwrap();
        let mut last = None;
        generator.generate(|p| last = Some(p));

        prop_assert_eq!(last.map(|p| p.stage), Some(Stage::Done));
        prop_assert_eq!(validate_map(generator.grid()), Ok(()));
        prop_assert!(generator
            .buildings()
            .cells
            .iter()
            .zip(&generator.terrain().cells)
            .all(|(&b, &t)| b != Building::Road || t != Terrain::Water));
    }
}
