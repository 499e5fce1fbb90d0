//! Map Generator - Command-line tools

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use mapgen_core::config::MapConfig;
use mapgen_core::error::MapGenError;
use mapgen_core::generator::MapGenerator;
use mapgen_tools::render::{write_map, OutputFormat};
use mapgen_tools::validate::{run_batch, BatchConfig};
use mapgen_tools::{Result, ToolError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mapgen-tools")]
#[command(about = "Generate and validate random strategy-game maps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a single map and print or save it
    Generate {
        /// RON configuration file (defaults to the normal preset)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Random seed (defaults to the current time)
        #[arg(short, long)]
        seed: Option<u64>,
        /// Map width, overriding the configuration
        #[arg(long, requires = "height")]
        width: Option<u32>,
        /// Map height, overriding the configuration
        #[arg(long, requires = "width")]
        height: Option<u32>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Ascii)]
        format: OutputFormat,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate many maps in parallel and check each one
    Validate {
        /// RON configuration file (defaults to the normal preset)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of maps
        #[arg(short = 'n', long, default_value_t = 100)]
        count: u32,
        /// First seed
        #[arg(long, default_value_t = 0)]
        seed_start: u64,
        /// Fail maps that leave a city unreachable
        #[arg(long)]
        strict: bool,
        /// Write results as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<MapConfig> {
    let Some(path) = path else {
        return Ok(MapConfig::default());
    };
    let source = std::fs::read_to_string(path).map_err(|source| ToolError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(MapConfig::from_ron(&source)?)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Generate {
            config,
            seed,
            width,
            height,
            format,
            output,
        } => {
            let mut map = load_config(config.as_deref())?;
            if let (Some(width), Some(height)) = (width, height) {
                map.set_size(width, height).map_err(MapGenError::from)?;
            }
            let seed = seed.unwrap_or_else(clock_seed);
            tracing::info!(seed, "Generating map");

            let mut generator = MapGenerator::new(map.with_seed(seed))?;
            generator.generate(|p| tracing::debug!(stage = ?p.stage, fraction = %p.fraction, "Progress"));
            write_map(&generator, format, output.as_deref())?;

            let report = generator.accessibility();
            if !report.all_reachable() {
                tracing::warn!(unreachable = report.unreachable.len(), "Some cities are unreachable");
            }
            Ok(true)
        }
        Commands::Validate {
            config,
            count,
            seed_start,
            strict,
            output,
        } => {
            let mut batch = BatchConfig::new(load_config(config.as_deref())?, count).with_seed(seed_start);
            batch.require_reachable = strict;
            let results = run_batch(batch)?;
            if let Some(path) = output {
                results.save(&path)?;
                tracing::info!(path = %path.display(), "Saved results");
            }
            for failure in &results.failures {
                tracing::error!(seed = failure.seed, "{}", failure.message);
            }
            Ok(results.passed())
        }
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => {
            tracing::error!("Validation failed");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}
