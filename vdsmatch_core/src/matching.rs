//! The matching engines - sensor to nearest link to owning road.
//!
//! Two interchangeable strategies implement [`Matcher`]:
//! 1. [`ExhaustiveMatcher`]: every sensor scans every link (sequential,
//!    O(sensors x links)); the correctness baseline.
//! 2. [`GridMatcher`]: every sensor scans only the links of its own grid
//!    cell, one task per sensor on a fixed-size worker pool.
//!
//! The grid strategy never looks outside the containing cell. A sensor near
//! a cell edge whose true nearest link lies in a neighbouring cell can be
//! matched to a different road than the exhaustive scan would pick; that
//! recall loss is the price of the speed-up.
//!
//! Ties on distance keep the first candidate in enumeration order: ascending
//! link ID for the exhaustive scan, cell-list order (also ascending link ID)
//! for the grid scan.

use crate::config::{MatchConfig, Strategy};
use crate::error::MatchError;
use crate::geo::GeoPosition;
use crate::geometry::point_to_segment_distance;
use crate::grid::{AssignmentStats, SpatialGrid};
use crate::network::{LinkId, LinkIndex, Network, RoadId, SensorId, Vds};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

// ============================================================================
// OUTCOMES
// ============================================================================

/// Why a sensor received no road. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Unmatched {
    /// Sensor lies outside the padded grid bounding box
    OutOfBounds,
    /// Sensor's cell has no links assigned
    EmptyCell,
    /// Network has no links at all
    NoLinks,
    /// Nearest link is not part of any road
    UnownedLink { link: LinkId, distance: f64 },
}

/// Result of matching a single sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SensorOutcome {
    Matched {
        road: RoadId,
        link: LinkId,
        distance: f64,
    },
    Unmatched(Unmatched),
}

impl SensorOutcome {
    pub fn road(&self) -> Option<RoadId> {
        match self {
            SensorOutcome::Matched { road, .. } => Some(*road),
            SensorOutcome::Unmatched(_) => None,
        }
    }

    /// Nearest link found, whether or not it had a road.
    pub fn nearest_link(&self) -> Option<(LinkId, f64)> {
        match *self {
            SensorOutcome::Matched { link, distance, .. } => Some((link, distance)),
            SensorOutcome::Unmatched(Unmatched::UnownedLink { link, distance }) => {
                Some((link, distance))
            }
            SensorOutcome::Unmatched(_) => None,
        }
    }
}

/// Per-reason unmatched counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedCounts {
    pub out_of_bounds: usize,
    pub empty_cell: usize,
    pub no_links: usize,
    pub unowned_link: usize,
}

/// Outcome of a full matching run, keyed (and therefore ordered) by sensor ID.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub strategy: Strategy,
    pub outcomes: BTreeMap<SensorId, SensorOutcome>,
    pub elapsed: Duration,
}

impl MatchResult {
    /// `(sensor, road)` pairs for matched sensors, ascending sensor ID.
    pub fn assignments(&self) -> impl Iterator<Item = (SensorId, RoadId)> + '_ {
        self.outcomes
            .iter()
            .filter_map(|(sensor, outcome)| outcome.road().map(|road| (*sensor, road)))
    }

    pub fn road_of(&self, sensor: SensorId) -> Option<RoadId> {
        self.outcomes.get(&sensor).and_then(SensorOutcome::road)
    }

    pub fn outcome(&self, sensor: SensorId) -> Option<&SensorOutcome> {
        self.outcomes.get(&sensor)
    }

    pub fn matched_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.road().is_some()).count()
    }

    pub fn unmatched_count(&self) -> usize {
        self.outcomes.len() - self.matched_count()
    }

    pub fn unmatched_counts(&self) -> UnmatchedCounts {
        let mut counts = UnmatchedCounts::default();
        for outcome in self.outcomes.values() {
            if let SensorOutcome::Unmatched(reason) = outcome {
                match reason {
                    Unmatched::OutOfBounds => counts.out_of_bounds += 1,
                    Unmatched::EmptyCell => counts.empty_cell += 1,
                    Unmatched::NoLinks => counts.no_links += 1,
                    Unmatched::UnownedLink { .. } => counts.unowned_link += 1,
                }
            }
        }
        counts
    }

    fn log_summary(&self) {
        let counts = self.unmatched_counts();
        info!(
            strategy = %self.strategy,
            sensors = self.outcomes.len(),
            matched = self.matched_count(),
            out_of_bounds = counts.out_of_bounds,
            empty_cell = counts.empty_cell,
            unowned_link = counts.unowned_link,
            elapsed_ms = self.elapsed.as_secs_f64() * 1000.0,
            "Matching complete"
        );
    }
}

// ============================================================================
// SHARED SCAN
// ============================================================================

/// Closest candidate link to a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    pub link: LinkIndex,
    pub distance: f64,
}

/// Scans candidate links and returns the closest; the first of equally
/// distant candidates wins.
pub fn nearest_link<I>(network: &Network, point: GeoPosition, candidates: I) -> Option<Nearest>
where
    I: IntoIterator<Item = LinkIndex>,
{
    let mut best: Option<Nearest> = None;
    for link in candidates {
        let (start, end) = network.link_endpoints(link);
        let distance = point_to_segment_distance(point, start, end);
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(Nearest { link, distance });
        }
    }
    best
}

/// Turns the nearest link into an outcome via its owning road.
fn resolve_road(network: &Network, nearest: Nearest) -> SensorOutcome {
    let link = network.link(nearest.link);
    match network.road_of_link(nearest.link) {
        Some(road) => SensorOutcome::Matched {
            road: road.id,
            link: link.id,
            distance: nearest.distance,
        },
        None => SensorOutcome::Unmatched(Unmatched::UnownedLink {
            link: link.id,
            distance: nearest.distance,
        }),
    }
}

// ============================================================================
// STRATEGIES
// ============================================================================

/// A sensor-to-road matching strategy.
pub trait Matcher {
    fn strategy(&self) -> Strategy;

    /// Matches every sensor of the network.
    fn match_sensors(&self, network: &Network) -> Result<MatchResult, MatchError>;
}

/// Sequential scan over every link for every sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustiveMatcher;

impl ExhaustiveMatcher {
    /// A sensor with a NaN or infinite coordinate is reported out of bounds,
    /// as the grid strategy does, instead of matching against NaN distances.
    pub fn match_sensor(&self, network: &Network, vds: &Vds) -> SensorOutcome {
        if !vds.position.is_finite() {
            return SensorOutcome::Unmatched(Unmatched::OutOfBounds);
        }
        match nearest_link(network, vds.position, 0..network.links().len()) {
            Some(nearest) => resolve_road(network, nearest),
            None => SensorOutcome::Unmatched(Unmatched::NoLinks),
        }
    }
}

impl Matcher for ExhaustiveMatcher {
    fn strategy(&self) -> Strategy {
        Strategy::Exhaustive
    }

    fn match_sensors(&self, network: &Network) -> Result<MatchResult, MatchError> {
        info!(
            sensors = network.sensors().len(),
            links = network.links().len(),
            "Exhaustive matching"
        );
        let start = Instant::now();

        let outcomes = network
            .sensors()
            .iter()
            .map(|vds| (vds.id, self.match_sensor(network, vds)))
            .collect();

        let result = MatchResult {
            strategy: Strategy::Exhaustive,
            outcomes,
            elapsed: start.elapsed(),
        };
        result.log_summary();
        Ok(result)
    }
}

/// Grid-accelerated parallel scan.
///
/// Each run builds a fresh [`SpatialGrid`] from the network, so a change to
/// the network or to the dimension is always picked up.
#[derive(Debug, Clone)]
pub struct GridMatcher {
    dimension: f64,
    workers: usize,
}

impl GridMatcher {
    /// Creates a matcher with a cell edge length and worker count.
    pub fn new(dimension: f64, workers: usize) -> Result<Self, MatchError> {
        if !(dimension.is_finite() && dimension > 0.0) {
            return Err(MatchError::config(format!(
                "cell dimension must be positive, got {}",
                dimension
            )));
        }
        if workers == 0 {
            return Err(MatchError::config("workers must be at least 1"));
        }
        Ok(Self { dimension, workers })
    }

    /// Creates a matcher from a configuration resolved against a network.
    pub fn from_config(config: &MatchConfig, network: &Network) -> Result<Self, MatchError> {
        config.validate()?;
        Self::new(config.cell_sizing.resolve(network)?, config.workers)
    }

    pub fn dimension(&self) -> f64 {
        self.dimension
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Builds the grid over the network's nodes and rasterizes its links.
    pub fn build_grid(&self, network: &Network) -> Result<(SpatialGrid, AssignmentStats), MatchError> {
        let mut grid = SpatialGrid::build(network.node_positions(), self.dimension)?;
        let stats = grid.assign_links(network.segments());
        Ok((grid, stats))
    }

    /// Matches one sensor against the links of its own cell.
    pub fn match_sensor(&self, grid: &SpatialGrid, network: &Network, vds: &Vds) -> SensorOutcome {
        let Some(cell) = grid.locate(vds.position) else {
            return SensorOutcome::Unmatched(Unmatched::OutOfBounds);
        };
        match nearest_link(network, vds.position, cell.links().iter().copied()) {
            Some(nearest) => resolve_road(network, nearest),
            None => SensorOutcome::Unmatched(Unmatched::EmptyCell),
        }
    }

    /// Runs the parallel phase over an already populated grid.
    ///
    /// The grid and network are read-only here. Each worker accumulates its
    /// own partial list of outcomes; the partials are merged sequentially
    /// after the pool joins, so no lock is taken during matching.
    pub fn match_with_grid(
        &self,
        grid: &SpatialGrid,
        network: &Network,
    ) -> Result<MatchResult, MatchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("vdsmatch-worker-{}", i))
            .build()
            .map_err(|e| MatchError::WorkerPool(e.to_string()))?;

        let start = Instant::now();
        let partials: Vec<Vec<(SensorId, SensorOutcome)>> = pool.install(|| {
            network
                .sensors()
                .par_iter()
                .fold(Vec::new, |mut acc, vds| {
                    acc.push((vds.id, self.match_sensor(grid, network, vds)));
                    acc
                })
                .collect()
        });

        debug!(partials = partials.len(), "Merging worker results");
        let mut outcomes = BTreeMap::new();
        for partial in partials {
            outcomes.extend(partial);
        }

        Ok(MatchResult {
            strategy: Strategy::Grid,
            outcomes,
            elapsed: start.elapsed(),
        })
    }
}

impl Matcher for GridMatcher {
    fn strategy(&self) -> Strategy {
        Strategy::Grid
    }

    fn match_sensors(&self, network: &Network) -> Result<MatchResult, MatchError> {
        info!(
            sensors = network.sensors().len(),
            links = network.links().len(),
            dimension = self.dimension,
            workers = self.workers,
            "Grid matching"
        );
        let (grid, stats) = self.build_grid(network)?;
        debug!(?stats, "Grid populated");

        let result = self.match_with_grid(&grid, network)?;
        result.log_summary();
        Ok(result)
    }
}

/// Builds the matcher selected by a configuration.
pub fn matcher_for(config: &MatchConfig, network: &Network) -> Result<Box<dyn Matcher>, MatchError> {
    config.validate()?;
    Ok(match config.strategy {
        Strategy::Exhaustive => Box::new(ExhaustiveMatcher),
        Strategy::Grid => Box::new(GridMatcher::from_config(config, network)?),
    })
}
