//! Error types for grid construction, network queries and matching.

use thiserror::Error;

/// Errors raised while building the spatial grid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// No node positions to derive a bounding box from
    #[error("Cannot build grid: network has no nodes")]
    EmptyNetwork,

    /// Cell edge length is zero, negative or not finite
    #[error("Invalid cell dimension: {0} (must be a positive finite number)")]
    InvalidDimension(f64),

    /// The cell dimension is so small the cell count does not fit in memory indices
    #[error("Too many cells: {lon_range} x {lat_range} degrees at dimension {dimension}")]
    TooManyCells {
        lon_range: f64,
        lat_range: f64,
        dimension: f64,
    },

    /// A node position is NaN or infinite
    #[error("Non-finite node position: lat={lat}, lon={lon}")]
    NonFinitePosition { lat: f64, lon: f64 },
}

/// Errors raised while assembling or querying the road network.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// A link references a node that was never registered
    #[error("Link {link} references unknown node {node}")]
    UnknownNode { link: u64, node: u64 },

    /// Statistic requested on a network without links or roads
    #[error("Network has no {0}")]
    Empty(&'static str),
}

/// Errors raised by the matching strategies.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Configuration rejected by validation
    #[error("Invalid match configuration: {0}")]
    InvalidConfig(String),

    /// The worker pool could not be created
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    /// Grid construction failed
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Network query failed (e.g. no links to derive a cell size from)
    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl MatchError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
