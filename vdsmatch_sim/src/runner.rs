//! Scenario runner - cross-checks the grid strategy against the exhaustive one.
//!
//! The exhaustive scan is the oracle. For every sensor the runner checks:
//! - the grid never reports a link closer than the exhaustive optimum
//! - when the optimum link is stored in the sensor's own cell, the grid
//!   picks exactly that link (same tie-break, same road)
//!
//! Scenario-specific expectations are checked on top.

use crate::error::SimError;
use crate::scenarios::ScenarioId;
use crate::synthetic::{
    self, LatticeParams, NetworkGenerator, RandomParams, EDGE_LOOP_LINK, EDGE_SENSOR_EMPTY_CELL,
    EDGE_SENSOR_NEAR_LOOP, EDGE_SENSOR_ON_NODE, EDGE_SENSOR_OUTSIDE,
};

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use vdsmatch_core::{
    CellSizing, ExhaustiveMatcher, GridMatcher, LinkId, MatchResult, Matcher, Network,
    SensorId, SensorOutcome, SpatialGrid, Unmatched,
};
use vdsmatch_io::{load_network, InMemorySource};

/// Slack for comparing distances computed from the same inputs.
const DISTANCE_EPS: f64 = 1e-12;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Sensors in the generated network
    pub sensors: usize,

    /// Sensors the grid strategy assigned a road to
    pub matched: usize,

    /// Fraction of sensors with the same outcome road (or lack of one) under both strategies
    pub agreement: f64,

    /// Fraction of exhaustively matched sensors the grid assigns to the same road
    pub recall: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Wall-clock timings
    pub timings: ScenarioTimings,
}

/// Wall-clock timings of one scenario run, in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioTimings {
    pub exhaustive_ms: f64,
    pub grid_build_ms: f64,
    pub grid_match_ms: f64,
}

/// Per-sensor comparison of the two strategies.
#[derive(Debug, Clone, Default)]
struct CrossCheck {
    agreeing: usize,
    exhaustive_matched: usize,
    recalled: usize,
    in_cell_optimum: usize,
    violations: Vec<String>,
}

/// Runs synthetic scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Worker threads for the grid strategy
    workers: usize,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, workers: usize) -> Self {
        Self {
            seed,
            workers: workers.max(1),
        }
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        match self.try_run(scenario) {
            Ok(result) => result,
            Err(e) => {
                warn!("Scenario {} aborted: {}", scenario.name(), e);
                ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    sensors: 0,
                    matched: 0,
                    agreement: 0.0,
                    recall: 0.0,
                    failure_reason: Some(e.to_string()),
                    timings: ScenarioTimings::default(),
                }
            }
        }
    }

    fn setup(&self, scenario: ScenarioId) -> Result<(InMemorySource, CellSizing), SimError> {
        let generator_seed = self.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let mut generator = NetworkGenerator::new(generator_seed);

        Ok(match scenario {
            // One cell per quadrant: the center cell holds links 1 and 4
            ScenarioId::UnitSquare => (synthetic::unit_square(), CellSizing::Fixed(1.0)),
            ScenarioId::Lattice => (
                generator.lattice(&LatticeParams::default())?,
                CellSizing::DivideMaxLinkLength(10.0),
            ),
            ScenarioId::RandomSegments => (
                generator.random_segments(&RandomParams::default()),
                CellSizing::DivideMaxLinkLength(10.0),
            ),
            ScenarioId::EdgeCases => (synthetic::edge_cases(), CellSizing::Fixed(0.1)),
        })
    }

    fn try_run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        let (source, sizing) = self.setup(scenario)?;
        let network = load_network(&source)?;

        let exhaustive = ExhaustiveMatcher.match_sensors(&network)?;

        let matcher = GridMatcher::new(sizing.resolve(&network)?, self.workers)?;
        let build_start = Instant::now();
        let (grid, stats) = matcher.build_grid(&network)?;
        let grid_build = build_start.elapsed();
        debug!(?stats, "Grid populated");
        let gridded = matcher.match_with_grid(&grid, &network)?;

        let check = cross_check(&network, &grid, &exhaustive, &gridded);
        let mut failures = check.violations.clone();
        failures.extend(match scenario {
            ScenarioId::UnitSquare => check_unit_square(&network, &exhaustive, &gridded),
            ScenarioId::Lattice => check_lattice(&check),
            ScenarioId::RandomSegments => Vec::new(),
            ScenarioId::EdgeCases => check_edge_cases(&exhaustive, &gridded),
        });

        let sensors = network.sensors().len();
        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failures.is_empty(),
            sensors,
            matched: gridded.matched_count(),
            agreement: ratio(check.agreeing, sensors),
            recall: ratio(check.recalled, check.exhaustive_matched),
            failure_reason: (!failures.is_empty()).then(|| failures.join("; ")),
            timings: ScenarioTimings {
                exhaustive_ms: millis(exhaustive.elapsed),
                grid_build_ms: millis(grid_build),
                grid_match_ms: millis(gridded.elapsed),
            },
        };

        debug!(
            in_cell = check.in_cell_optimum,
            agreement = result.agreement,
            recall = result.recall,
            "Cross-check complete"
        );
        Ok(result)
    }
}

fn cross_check(
    network: &Network,
    grid: &SpatialGrid,
    exhaustive: &MatchResult,
    gridded: &MatchResult,
) -> CrossCheck {
    let mut check = CrossCheck::default();

    for vds in network.sensors() {
        let (Some(ex), Some(gr)) = (exhaustive.outcome(vds.id), gridded.outcome(vds.id)) else {
            check
                .violations
                .push(format!("sensor {} missing from a result", vds.id));
            continue;
        };

        if ex.road() == gr.road() {
            check.agreeing += 1;
        }
        if let Some(road) = ex.road() {
            check.exhaustive_matched += 1;
            if gr.road() == Some(road) {
                check.recalled += 1;
            }
        }

        let Some((best_link, best_distance)) = ex.nearest_link() else {
            continue;
        };

        if let Some((_, grid_distance)) = gr.nearest_link() {
            if grid_distance < best_distance - DISTANCE_EPS {
                check.violations.push(format!(
                    "sensor {}: grid distance {} below exhaustive optimum {}",
                    vds.id, grid_distance, best_distance
                ));
            }
        }

        let in_cell = network.link_index(best_link).is_some_and(|idx| {
            grid.locate(vds.position)
                .is_some_and(|cell| cell.links().contains(&idx))
        });
        if in_cell {
            check.in_cell_optimum += 1;
            if gr.nearest_link().map(|(link, _)| link) != Some(best_link) {
                check.violations.push(format!(
                    "sensor {}: optimum link {} is in its cell but grid chose {:?}",
                    vds.id, best_link, gr
                ));
            }
        }
    }

    check
}

fn check_unit_square(network: &Network, exhaustive: &MatchResult, gridded: &MatchResult) -> Vec<String> {
    let expected = network
        .link_index(LinkId(1))
        .and_then(|idx| network.road_of_link(idx))
        .map(|road| road.id);

    let sensor = SensorId(100);
    let mut failures = Vec::new();
    if expected.is_none() {
        failures.push("link 1 has no road".to_string());
    }
    for result in [exhaustive, gridded] {
        if result.road_of(sensor) != expected {
            failures.push(format!(
                "{}: center sensor matched {:?}, expected {:?}",
                result.strategy,
                result.road_of(sensor),
                expected
            ));
        }
    }
    failures
}

fn check_lattice(check: &CrossCheck) -> Vec<String> {
    if check.in_cell_optimum == 0 {
        vec!["no sensor had its optimum link in its own cell".to_string()]
    } else {
        Vec::new()
    }
}

fn check_edge_cases(exhaustive: &MatchResult, gridded: &MatchResult) -> Vec<String> {
    let mut failures = Vec::new();
    let mut require = |what: &str, ok: bool| {
        if !ok {
            failures.push(what.to_string());
        }
    };

    for result in [exhaustive, gridded] {
        let on_node = result.outcome(EDGE_SENSOR_ON_NODE);
        require(
            "sensor on a node must match link 1 at distance 0",
            matches!(
                on_node,
                Some(SensorOutcome::Matched { link, distance, .. })
                    if *link == LinkId(1) && *distance == 0.0
            ),
        );

        let near_loop = result.outcome(EDGE_SENSOR_NEAR_LOOP);
        require(
            "sensor near the loop must report its unowned link",
            matches!(
                near_loop,
                Some(SensorOutcome::Unmatched(Unmatched::UnownedLink { link, .. }))
                    if *link == EDGE_LOOP_LINK
            ),
        );
    }

    require(
        "grid must report an empty cell",
        gridded.outcome(EDGE_SENSOR_EMPTY_CELL)
            == Some(&SensorOutcome::Unmatched(Unmatched::EmptyCell)),
    );
    require(
        "grid must report out of bounds",
        gridded.outcome(EDGE_SENSOR_OUTSIDE)
            == Some(&SensorOutcome::Unmatched(Unmatched::OutOfBounds)),
    );
    require(
        "exhaustive must still match the outside sensor",
        exhaustive.road_of(EDGE_SENSOR_OUTSIDE).is_some(),
    );

    failures
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        1.0
    } else {
        num as f64 / den as f64
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
