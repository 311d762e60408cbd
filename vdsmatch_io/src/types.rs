//! Raw input records, one per data row.

use serde::{Deserialize, Serialize};
use vdsmatch_core::{GeoPosition, LinkId, NodeId, SensorId};

/// One row of the network file: a directed link with both endpoint nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub link: LinkId,
    pub start_node: NodeId,
    pub start: GeoPosition,
    pub end_node: NodeId,
    pub end: GeoPosition,
}

/// One row of the sensor file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub sensor: SensorId,
    pub position: GeoPosition,
}
