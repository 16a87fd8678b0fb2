//! Nebula CLI - render token-holder constellations from holder lists.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use nebula::config::NebulaConfig;
use nebula::graph::pulse::PulseClock;
use nebula::graph::ProximityGraph;
use nebula::holders::{self, Category, Record};
use nebula::layout::{LayoutGenerator, LayoutParams};
use nebula::render::SvgRenderer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nebula")]
#[command(about = "Render token-holder constellations with proximity graphs and pulses")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, default_value = "nebula.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Generate a single constellation snapshot
    Generate {
        /// Primary holder list (CSV with Account/Quantity columns)
        #[arg(long)]
        primary: Option<PathBuf>,

        /// Secondary holder list
        #[arg(long)]
        secondary: Option<PathBuf>,

        /// Synthesize this many sample holders instead of loading CSVs
        #[arg(long, default_value = "500")]
        sample: usize,

        /// Layout shape
        #[arg(short = 'p', long, value_enum, default_value = "sphere")]
        preset: PresetArg,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seed for generation (defaults to a dataset-derived seed)
        #[arg(short = 'S', long)]
        seed: Option<u64>,

        /// Width of the output
        #[arg(long)]
        width: Option<u32>,

        /// Height of the output
        #[arg(long)]
        height: Option<u32>,

        /// Also save graph statistics as JSON
        #[arg(long)]
        save_stats: bool,
    },

    /// Run the pulse animation loop and write periodic frames
    Animate {
        /// Primary holder list
        #[arg(long)]
        primary: Option<PathBuf>,

        /// Secondary holder list
        #[arg(long)]
        secondary: Option<PathBuf>,

        /// Synthesize this many sample holders instead of loading CSVs
        #[arg(long, default_value = "500")]
        sample: usize,

        /// Number of frames to simulate
        #[arg(short, long, default_value = "300")]
        frames: u32,

        /// Simulated frames per second
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Write every Nth frame as an SVG
        #[arg(short, long, default_value = "30")]
        every: u32,

        /// Seed for generation
        #[arg(short = 'S', long)]
        seed: Option<u64>,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Render sphere and disc presets at several sizes for comparison
    Showcase {
        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Seed for consistent results
        #[arg(short = 'S', long, default_value = "42")]
        seed: u64,

        /// Synthesize this many sample holders
        #[arg(long, default_value = "400")]
        sample: usize,
    },
}

#[derive(Clone, ValueEnum, Debug)]
enum PresetArg {
    /// Concentric spherical shells
    Sphere,
    /// Expanded, z-flattened spiral disc
    Disc,
}

impl PresetArg {
    fn apply(&self, params: LayoutParams) -> LayoutParams {
        match self {
            PresetArg::Sphere => params,
            PresetArg::Disc => LayoutParams {
                expansion_factor: LayoutParams::disc().expansion_factor,
                flattening_factor: LayoutParams::disc().flattening_factor,
                ..params
            },
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PresetArg::Sphere => "sphere",
            PresetArg::Disc => "disc",
        }
    }
}

/// Load holder lists, or fall back to a synthetic sample.
fn load_records(
    primary: Option<&Path>,
    secondary: Option<&Path>,
    sample: usize,
    seed: Option<u64>,
) -> Result<(Vec<Record>, u64)> {
    match (primary, secondary) {
        (None, None) => {
            let seed = seed.unwrap_or_else(rand::random);
            Ok((holders::sample(seed, sample), seed))
        }
        _ => {
            let primary_records = match primary {
                Some(path) => holders::load_csv(path, Category::Primary)
                    .with_context(|| format!("loading primary holders from {}", path.display()))?,
                None => Vec::new(),
            };
            let secondary_records = match secondary {
                Some(path) => holders::load_csv(path, Category::Secondary)
                    .with_context(|| format!("loading secondary holders from {}", path.display()))?,
                None => Vec::new(),
            };
            let records = holders::merge_holders(primary_records, secondary_records);
            let seed = seed.unwrap_or_else(|| holders::dataset_seed(&records));
            Ok((records, seed))
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nebula=info".parse().expect("static directive parses")),
        )
        .init();

    let cli = Cli::parse();
    let config = NebulaConfig::load(Path::new(&cli.config))?;

    match cli.command {
        Commands::Generate {
            primary,
            secondary,
            sample,
            preset,
            output,
            seed,
            width,
            height,
            save_stats,
        } => {
            let width = width.unwrap_or(config.output.width);
            let height = height.unwrap_or(config.output.height);
            let save_stats = save_stats || config.output.save_stats;

            let (records, seed) =
                load_records(primary.as_deref(), secondary.as_deref(), sample, seed)?;
            let mut rng = StdRng::seed_from_u64(seed);

            let generator = LayoutGenerator::new(preset.apply(config.layout_params()))?;
            let points = generator.place_all(&records, &mut rng)?;
            let graph = ProximityGraph::build(&points, &config.graph_params(), &mut rng)?;

            println!(
                "Placed {} holders ({} preset) with seed {}...",
                points.len(),
                preset.name(),
                seed
            );
            let stats = graph.stats();
            println!(
                "  {} edges, {:.2} per node, distances {:.1}..{:.1} (avg {:.1})",
                stats.total_edges,
                stats.avg_edges_per_node,
                stats.min_distance,
                stats.max_distance,
                stats.avg_distance
            );
            for (category, count) in &stats.edges_by_category {
                println!("  {category}: {count} edges");
            }

            let svg = SvgRenderer::new(width, height).render(&points, &graph, &[]);

            let output_dir = PathBuf::from(&config.output.directory);
            fs::create_dir_all(&output_dir)?;
            let output_path =
                output.unwrap_or_else(|| output_dir.join(format!("nebula_{}.svg", seed)));
            fs::write(&output_path, &svg)?;
            println!("Saved to {}", output_path.display());

            if save_stats {
                let stats_path = output_path.with_extension("json");
                let stats_json = serde_json::to_string_pretty(stats)?;
                fs::write(&stats_path, stats_json)?;
                println!("Saved stats to {}", stats_path.display());
            }
        }

        Commands::Animate {
            primary,
            secondary,
            sample,
            frames,
            fps,
            every,
            seed,
            output_dir,
        } => {
            anyhow::ensure!(fps > 0, "fps must be positive");
            anyhow::ensure!(every > 0, "frame stride must be positive");

            let (records, seed) =
                load_records(primary.as_deref(), secondary.as_deref(), sample, seed)?;
            let mut rng = StdRng::seed_from_u64(seed);

            let generator = LayoutGenerator::new(config.layout_params())?;
            let points = generator.place_all(&records, &mut rng)?;
            let mut graph = ProximityGraph::build(&points, &config.graph_params(), &mut rng)?;

            let pulse_params = config.pulse_params();
            let duration = pulse_params.duration;
            let mut clock = PulseClock::new(pulse_params);
            let renderer = SvgRenderer::new(config.output.width, config.output.height);

            let output_dir = output_dir
                .unwrap_or_else(|| PathBuf::from(&config.output.directory).join("frames"));
            fs::create_dir_all(&output_dir)?;

            println!(
                "Animating {} holders for {} frames at {} fps (seed {})...",
                points.len(),
                frames,
                fps,
                seed
            );

            let mut triggered = 0u32;
            let mut written = 0u32;
            for frame in 0..frames {
                let now = frame as f64 / fps as f64;
                if clock.tick(&mut graph, now, &mut rng).is_some() {
                    triggered += 1;
                }
                let pulses = graph.advance(now, duration);

                if frame % every == 0 {
                    let svg = renderer.render(&points, &graph, &pulses);
                    let path = output_dir.join(format!("nebula_frame_{frame:05}.svg"));
                    fs::write(&path, &svg)?;
                    written += 1;
                }
            }

            println!(
                "Done: {} pulses fired, {} frames written to {}",
                triggered,
                written,
                output_dir.display()
            );
        }

        Commands::Showcase {
            output_dir,
            seed,
            sample,
        } => {
            let output_dir = output_dir
                .unwrap_or_else(|| PathBuf::from(&config.output.directory).join("showcase"));
            fs::create_dir_all(&output_dir)?;

            let records = holders::sample(seed, sample);
            println!("Generating showcase with seed {}...", seed);

            let sizes: [(u32, &str); 3] = [(512, "512"), (1024, "1k"), (2048, "2k")];

            for preset in [PresetArg::Sphere, PresetArg::Disc] {
                for (size, label) in &sizes {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let generator = LayoutGenerator::new(preset.apply(config.layout_params()))?;
                    let points = generator.place_all(&records, &mut rng)?;
                    let graph = ProximityGraph::build(&points, &config.graph_params(), &mut rng)?;
                    let svg = SvgRenderer::new(*size, *size).render(&points, &graph, &[]);

                    let filename = format!("{}_{}.svg", preset.name(), label);
                    fs::write(output_dir.join(&filename), &svg)?;
                    println!("  Created {}", filename);
                }
            }

            println!("Done! Showcase saved to {}", output_dir.display());
        }
    }

    Ok(())
}
