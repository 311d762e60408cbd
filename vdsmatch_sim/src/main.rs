//! VDSMatch CLI
//!
//! Match sensors to roads, inspect a network, or run the synthetic
//! cross-check scenarios.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vdsmatch_core::{
    matcher_for, CellSizing, GridMatcher, GridStats, MatchConfig, NetworkStats, Strategy,
};
use vdsmatch_io::{load_network, write_adjacency, write_assignments, CsvFiles, InMemorySource, NetworkSource};
use vdsmatch_sim::scenarios::ScenarioId;
use vdsmatch_sim::{ScenarioReport, ScenarioRunner};

#[derive(Parser, Debug)]
#[command(name = "vdsmatch")]
#[command(about = "Match vehicle detection stations to the roads of a network", long_about = None)]
struct Cli {
    /// Verbose output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assign every sensor to the road of its nearest link
    Match(MatchArgs),

    /// Print network (and optionally grid) statistics
    Info(InfoArgs),

    /// Write the before/after link adjacency listing
    Adjacency(AdjacencyArgs),

    /// Run synthetic scenarios that cross-check both strategies
    Scenario(ScenarioArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Network CSV (linkID,startNodeID,startLon,startLat,endNodeID,endLon,endLat)
    #[arg(short, long)]
    network: PathBuf,

    /// Sensor CSV (sensorID,lat,lon)
    #[arg(short, long)]
    sensors: PathBuf,
}

#[derive(Args, Debug)]
struct SizingArgs {
    /// Fixed cell edge length in degrees
    #[arg(long, conflicts_with = "divide_by")]
    cell_size: Option<f64>,

    /// Cell edge length = longest link / N
    #[arg(long)]
    divide_by: Option<f64>,
}

impl SizingArgs {
    fn sizing(&self) -> Option<CellSizing> {
        self.cell_size
            .map(CellSizing::Fixed)
            .or(self.divide_by.map(CellSizing::DivideMaxLinkLength))
    }
}

#[derive(Args, Debug)]
struct MatchArgs {
    #[command(flatten)]
    inputs: InputArgs,

    #[command(flatten)]
    sizing: SizingArgs,

    /// Matching strategy (exhaustive, grid)
    #[arg(short = 'S', long)]
    strategy: Option<Strategy>,

    /// Worker threads for the grid strategy
    #[arg(short, long)]
    workers: Option<usize>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file for sensorID,roadID lines (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON summary for CI parsing
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct InfoArgs {
    #[command(flatten)]
    inputs: InputArgs,

    #[command(flatten)]
    sizing: SizingArgs,

    /// JSON output
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct AdjacencyArgs {
    /// Network CSV
    #[arg(short, long)]
    network: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScenarioArgs {
    /// Scenario to run (unit_square, lattice, random_segments, edge_cases, all)
    #[arg(short = 'S', long, default_value = "all")]
    name: String,

    /// Master seed for determinism (0 = random from time)
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Worker threads for the grid strategy (default: available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export all results to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging; results go to stdout, logs to stderr
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    let outcome = match cli.command {
        Command::Match(args) => run_match(args).map(|_| true),
        Command::Info(args) => run_info(args).map(|_| true),
        Command::Adjacency(args) => run_adjacency(args).map(|_| true),
        Command::Scenario(args) => run_scenarios(args),
    };

    // Exit with proper code for CI
    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn default_workers() -> usize {
    MatchConfig::default().workers
}

/// Opens `path` for writing, or stdout when none is given.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("creating {}", p.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    })
}

fn resolve_config(args: &MatchArgs) -> Result<MatchConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            MatchConfig::from_json_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => MatchConfig::default(),
    };

    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(sizing) = args.sizing.sizing() {
        config.cell_sizing = sizing;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.validate()?;
    Ok(config)
}

fn run_match(args: MatchArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let source = CsvFiles::new(&args.inputs.network, &args.inputs.sensors);
    let network = load_network(&source).context("loading network")?;

    info!("Map-matching VDS to links ({})", config.strategy);
    let matcher = matcher_for(&config, &network)?;
    let result = matcher.match_sensors(&network)?;

    let elapsed = result.elapsed.as_secs_f64();
    info!("Elapsed time: {:.3}s ({:.3}min)", elapsed, elapsed / 60.0);

    if args.json {
        let counts = result.unmatched_counts();
        let mut summary = serde_json::json!({
            "strategy": result.strategy.name(),
            "sensors": result.outcomes.len(),
            "matched": result.matched_count(),
            "unmatched": counts,
            "elapsed_ms": elapsed * 1000.0,
        });
        match &args.output {
            Some(path) => {
                let mut out = open_output(Some(path.as_path()))?;
                write_assignments(&mut out, &result)?;
                summary["output"] = serde_json::json!(path.display().to_string());
            }
            None => {
                summary["assignments"] = result
                    .assignments()
                    .map(|(sensor, road)| serde_json::json!([sensor.0, road.0]))
                    .collect();
            }
        }
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let mut out = open_output(args.output.as_deref())?;
        let written = write_assignments(&mut out, &result)?;
        info!("Matched! {} assignments written", written);
    }

    if result.unmatched_count() > 0 {
        warn!("{} sensors left unmatched", result.unmatched_count());
    }
    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let source = CsvFiles::new(&args.inputs.network, &args.inputs.sensors);
    let network = load_network(&source).context("loading network")?;
    let stats = NetworkStats::compute(&network);

    let grid_stats = match args.sizing.sizing() {
        Some(sizing) => {
            let matcher = GridMatcher::new(sizing.resolve(&network)?, 1)?;
            let (grid, _) = matcher.build_grid(&network)?;
            Some(GridStats::compute(&grid))
        }
        None => None,
    };

    if args.json {
        let summary = serde_json::json!({ "network": stats, "grid": grid_stats });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Network info:");
    if let (Some(min), Some(max)) = (stats.min_pos, stats.max_pos) {
        println!("minLat: {}", min.lat);
        println!("minLon: {}", min.lon);
        println!("maxLat: {}", max.lat);
        println!("maxLon: {}", max.lon);
    }
    if let (Some(lat_size), Some(lon_size)) = (stats.lat_size(), stats.lon_size()) {
        println!("latSize: {}", lat_size);
        println!("lonSize: {}", lon_size);
    }
    println!("Nodes: {}", stats.nodes);
    println!("Links: {}", stats.links);
    println!("Roads: {}", stats.roads);
    if let Some(mean) = stats.mean_links_per_road {
        println!("Mean num of links per road: {}", mean);
    }
    println!("VDS: {}", stats.sensors);
    if let Some(l) = stats.link_length {
        println!("Min link length: {}", l.min);
        println!("Max link length: {}", l.max);
        println!("Mean link length: {}", l.mean);
    }
    if let Some(r) = stats.road_length {
        println!("Min road length: {}", r.min);
        println!("Max road length: {}", r.max);
        println!("Mean road length: {}", r.mean);
    }
    if let Some(g) = grid_stats {
        println!("Grid: {} x {} cells of {}", g.num_cells_x, g.num_cells_y, g.dimension);
        println!("Occupied cells: {} ({:.1}% empty)", g.occupied_cells, g.empty_ratio() * 100.0);
        println!("Cell entries: {}", g.cell_entries);
        println!("Max links per cell: {}", g.max_links_per_cell);
        println!("Mean links per occupied cell: {}", g.mean_links_per_occupied_cell);
    }
    Ok(())
}

fn run_adjacency(args: AdjacencyArgs) -> Result<()> {
    // The listing needs no sensors; only the network file is read.
    let files = CsvFiles::new(&args.network, PathBuf::new());
    let links = files.load_links().context("loading network")?;
    let network = load_network(&InMemorySource::new(links, Vec::new()))?;

    let mut out = open_output(args.output.as_deref())?;
    let written = write_adjacency(&mut out, &network)?;
    info!("Wrote adjacency for {} links", written);
    Ok(())
}

fn run_scenarios(args: ScenarioArgs) -> Result<bool> {
    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.name == "all" {
        ScenarioId::all()
    } else {
        match args.name.parse() {
            Ok(id) => vec![id],
            Err(e) => bail!(
                "{} (available: unit_square, lattice, random_segments, edge_cases, all)",
                e
            ),
        }
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };
    let workers = args.workers.unwrap_or_else(default_workers);

    if !args.json {
        info!("VDSMatch scenario harness v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let mut report = ScenarioReport::new(base_seed, workers);
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed, workers);

        for scenario in &scenarios {
            // Fixed scenarios give the same answer for every seed
            if seed_offset > 0 && !scenario.is_randomized() {
                continue;
            }
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED  recall={:.3} agreement={:.3}",
                        scenario.name(),
                        seed,
                        result.recall,
                        result.agreement
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
            report.add(result);
        }
    }

    if let Some(path) = &args.export {
        report
            .write_to_file(path)
            .with_context(|| format!("writing export {}", path))?;
        info!("Exported {} results to {}", report.total, path);
    }

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if report.failed == 0 {
            info!("✅ All {} scenario runs passed!", report.total);
        } else {
            error!("❌ {}/{} scenario runs failed!", report.failed, report.total);
            for result in report.failures() {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    Ok(report.failed == 0)
}
