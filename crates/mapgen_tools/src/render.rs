//! Map output: ASCII rendering for the terminal and JSON export.

use std::io::Write;
use std::path::Path;

use clap::ValueEnum;
use mapgen_core::accessibility::AccessibilityReport;
use mapgen_core::config::MapConfig;
use mapgen_core::generator::{BuildingSnapshot, MapGenerator, TerrainSnapshot};
use mapgen_core::grid::MapGrid;
use mapgen_core::objects::MapObject;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Output format for a generated map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One glyph per cell, buildings drawn over terrain.
    #[default]
    Ascii,
    /// Full map export as pretty JSON.
    Json,
}

/// Glyph legend printed under ASCII maps.
pub const LEGEND: &str = "Legend: . grass  ~ water  f forest  h hills  M mountain  s swamp  \
                          C city  R ruin  T temple  S signpost  = road  B bridge  P port  o stone";

/// Everything a consumer needs to rebuild a generated map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapExport {
    /// Configuration the map was generated from.
    pub config: MapConfig,
    /// Terrain layer.
    pub terrain: TerrainSnapshot,
    /// Building layer.
    pub buildings: BuildingSnapshot,
    /// Placed objects, anchors in row-major order.
    pub objects: Vec<MapObject>,
    /// City reachability.
    pub accessibility: AccessibilityReport,
}

impl MapExport {
    /// Capture the current map of `generator`.
    #[must_use]
    pub fn from_generator(generator: &MapGenerator) -> Self {
        Self {
            config: generator.config().clone(),
            terrain: generator.terrain(),
            buildings: generator.buildings(),
            objects: generator.objects().all().to_vec(),
            accessibility: generator.accessibility().clone(),
        }
    }
}

/// Render a map as rows of glyphs joined by newlines.
#[must_use]
pub fn render_ascii(grid: &MapGrid) -> String {
    let mut out = grid.to_ascii().join("\n");
    out.push('\n');
    out
}

/// Render the current map of `generator` in `format`.
pub fn render(generator: &MapGenerator, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Ascii => Ok(render_ascii(generator.grid())),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&MapExport::from_generator(generator))?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Write the rendered map to `output`, or to stdout when `None`.
pub fn write_map(generator: &MapGenerator, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let rendered = render(generator, format)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, rendered)?;
            tracing::info!(path = %path.display(), ?format, "Wrote map");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            if format == OutputFormat::Ascii {
                writeln!(stdout, "{LEGEND}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapgen_test_utils::fixtures::ascii_map;

    fn small_map(seed: u64) -> MapGenerator {
        let mut generator = MapGenerator::new(MapConfig::small().with_seed(seed)).unwrap();
        generator.generate(|_| {});
        generator
    }

    #[test]
    fn test_render_ascii_rows() {
        let grid = ascii_map(&["..~", "fhM"]);
        assert_eq!(render_ascii(&grid), "..~\nfhM\n");
    }

    #[test]
    fn test_ascii_has_one_line_per_row() {
        let generator = small_map(1);
        let text = render(&generator, OutputFormat::Ascii).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 50);
        assert!(lines.iter().all(|l| l.chars().count() == 50));
    }

    #[test]
    fn test_json_export_reads_back() {
        let generator = small_map(2);
        let json = render(&generator, OutputFormat::Json).unwrap();
        let export: MapExport = serde_json::from_str(&json).unwrap();
        assert_eq!(export, MapExport::from_generator(&generator));
        assert_eq!(export.terrain.cells.len(), 2500);
    }

    #[test]
    fn test_write_map_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps").join("seed3.txt");
        let generator = small_map(3);

        write_map(&generator, OutputFormat::Ascii, Some(&path)).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_ascii(generator.grid()));
    }
}
