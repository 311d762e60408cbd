//! VDSMatch Core - Sensor-to-Road Matching over a Planar Road Network
//!
//! Assigns every vehicle detector station (VDS) to the road whose nearest
//! link lies closest to it. Two strategies share one contract:
//! 1. **Exhaustive**: every sensor scans every link
//! 2. **Grid**: links are rasterized into a uniform lat/lon grid and each
//!    sensor only scans its own cell, with sensors spread over a worker pool
//!
//! Positions are treated as planar coordinates (x = longitude, y = latitude);
//! no geodesic correction is applied.

pub mod config;
pub mod error;
pub mod geo;
pub mod geometry;
pub mod grid;
pub mod matching;
pub mod metrics;
pub mod network;

// Re-export key types for convenience
pub use config::{CellSizing, MatchConfig, Strategy};
pub use error::{GridError, MatchError, NetworkError};
pub use geo::GeoPosition;
pub use grid::{AssignmentStats, Cell, CellCoord, SpatialGrid};
pub use matching::{
    matcher_for, ExhaustiveMatcher, GridMatcher, MatchResult, Matcher, SensorOutcome, Unmatched,
};
pub use metrics::{GridStats, NetworkStats};
pub use network::{LinkAdjacency, LinkId, Network, NetworkBuilder, NodeId, RoadId, SensorId, Vds};
