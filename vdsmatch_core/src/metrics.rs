//! VDSMatch Metrics Module
//! =======================
//!
//! Descriptive statistics for the road network and the populated grid:
//! - **Network**: element counts, raw bounding box, link/road length spread
//! - **Grid**: cell occupancy and link fan-out per cell
//!
//! The longest link drives the default cell size, and grid occupancy shows
//! whether that size is sensible (too many empty cells, or too many links per
//! cell, both hurt).

use crate::geo::GeoPosition;
use crate::grid::SpatialGrid;
use crate::network::Network;
use serde::{Deserialize, Serialize};

/// Minimum, maximum and mean of a set of lengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl LengthStats {
    /// Returns `None` for an empty input.
    pub fn from_lengths<I: IntoIterator<Item = f64>>(lengths: I) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for len in lengths {
            count += 1;
            sum += len;
            min = min.min(len);
            max = max.max(len);
        }

        (count > 0).then(|| Self {
            min,
            max,
            mean: sum / count as f64,
        })
    }
}

// =============================================================================
// NETWORK STATISTICS
// =============================================================================

/// Summary of a road network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub nodes: usize,
    pub links: usize,
    pub roads: usize,
    pub sensors: usize,

    /// Unpadded south-west corner of the node bounding box
    pub min_pos: Option<GeoPosition>,
    /// Unpadded north-east corner of the node bounding box
    pub max_pos: Option<GeoPosition>,

    pub link_length: Option<LengthStats>,
    pub road_length: Option<LengthStats>,
    pub mean_links_per_road: Option<f64>,
}

impl NetworkStats {
    pub fn compute(network: &Network) -> Self {
        let bbox = network.node_positions().fold(None, |acc: Option<(GeoPosition, GeoPosition)>, p| {
            Some(match acc {
                None => (p, p),
                Some((lo, hi)) => (
                    GeoPosition::new(lo.lat.min(p.lat), lo.lon.min(p.lon)),
                    GeoPosition::new(hi.lat.max(p.lat), hi.lon.max(p.lon)),
                ),
            })
        });

        let roads = network.roads();
        let mean_links_per_road = (!roads.is_empty()).then(|| {
            roads.iter().map(|r| r.links.len()).sum::<usize>() as f64 / roads.len() as f64
        });

        Self {
            nodes: network.nodes().len(),
            links: network.links().len(),
            roads: roads.len(),
            sensors: network.sensors().len(),
            min_pos: bbox.map(|(lo, _)| lo),
            max_pos: bbox.map(|(_, hi)| hi),
            link_length: LengthStats::from_lengths(network.links().iter().map(|l| l.length)),
            road_length: LengthStats::from_lengths(roads.iter().map(|r| r.length)),
            mean_links_per_road,
        }
    }

    /// Latitude extent of the unpadded bounding box.
    pub fn lat_size(&self) -> Option<f64> {
        Some(self.max_pos?.lat - self.min_pos?.lat)
    }

    /// Longitude extent of the unpadded bounding box.
    pub fn lon_size(&self) -> Option<f64> {
        Some(self.max_pos?.lon - self.min_pos?.lon)
    }
}

// =============================================================================
// GRID STATISTICS
// =============================================================================

/// Occupancy of a populated grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    pub dimension: f64,
    pub num_cells_x: usize,
    pub num_cells_y: usize,
    pub total_cells: usize,
    /// Cells holding at least one link
    pub occupied_cells: usize,
    /// Sum of link-list lengths over all cells
    pub cell_entries: usize,
    pub max_links_per_cell: usize,
    /// Mean over occupied cells only
    pub mean_links_per_occupied_cell: f64,
}

impl GridStats {
    pub fn compute(grid: &SpatialGrid) -> Self {
        let mut occupied = 0;
        let mut entries = 0;
        let mut max = 0;
        for cell in grid.cells() {
            let n = cell.links().len();
            if n > 0 {
                occupied += 1;
                entries += n;
                max = max.max(n);
            }
        }

        Self {
            dimension: grid.dimension(),
            num_cells_x: grid.num_cells_x(),
            num_cells_y: grid.num_cells_y(),
            total_cells: grid.cells().len(),
            occupied_cells: occupied,
            cell_entries: entries,
            max_links_per_cell: max,
            mean_links_per_occupied_cell: if occupied > 0 {
                entries as f64 / occupied as f64
            } else {
                0.0
            },
        }
    }

    /// Fraction of cells holding no link, in [0, 1].
    pub fn empty_ratio(&self) -> f64 {
        if self.total_cells == 0 {
            return 0.0;
        }
        1.0 - self.occupied_cells as f64 / self.total_cells as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{LinkId, NetworkBuilder, NodeId, SensorId};
    use approx::assert_relative_eq;

    fn small_network() -> Network {
        let mut b = NetworkBuilder::new();
        b.add_link_with_nodes(
            LinkId(1),
            (NodeId(1), GeoPosition::new(0.0, 0.0)),
            (NodeId(2), GeoPosition::new(0.0, 1.0)),
        );
        b.add_link_with_nodes(
            LinkId(2),
            (NodeId(2), GeoPosition::new(0.0, 1.0)),
            (NodeId(3), GeoPosition::new(0.0, 4.0)),
        );
        b.add_sensor(SensorId(1), GeoPosition::new(0.5, 0.5));
        b.build().unwrap()
    }

    #[test]
    fn test_length_stats_empty() {
        assert!(LengthStats::from_lengths(std::iter::empty()).is_none());
    }

    #[test]
    fn test_network_stats() {
        let stats = NetworkStats::compute(&small_network());

        assert_eq!(stats.nodes, 3);
        assert_eq!(stats.links, 2);
        // Node 2 is pass-through: both links form one road
        assert_eq!(stats.roads, 1);
        assert_eq!(stats.sensors, 1);

        let links = stats.link_length.unwrap();
        assert_relative_eq!(links.min, 1.0, epsilon = 1e-12);
        assert_relative_eq!(links.max, 3.0, epsilon = 1e-12);
        assert_relative_eq!(links.mean, 2.0, epsilon = 1e-12);

        assert_relative_eq!(stats.road_length.unwrap().max, 4.0, epsilon = 1e-12);
        assert_relative_eq!(stats.mean_links_per_road.unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(stats.lon_size().unwrap(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(stats.lat_size().unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_network_stats() {
        let stats = NetworkStats::compute(&NetworkBuilder::new().build().unwrap());
        assert_eq!(stats.nodes, 0);
        assert!(stats.min_pos.is_none());
        assert!(stats.link_length.is_none());
        assert!(stats.mean_links_per_road.is_none());
        assert!(stats.lat_size().is_none());
    }

    #[test]
    fn test_grid_stats() {
        let net = small_network();
        let mut grid = SpatialGrid::build(net.node_positions(), 1.0).unwrap();
        grid.assign_links(net.segments());
        let stats = GridStats::compute(&grid);

        // Padded box is 4.002 x 0.002 degrees
        assert_eq!(stats.num_cells_x, 5);
        assert_eq!(stats.num_cells_y, 1);
        // Link 1 spans columns 0-1, link 2 spans columns 1-4
        assert_eq!(stats.occupied_cells, 5);
        assert_eq!(stats.cell_entries, 6);
        assert_eq!(stats.max_links_per_cell, 2);
        assert_relative_eq!(stats.empty_ratio(), 0.0, epsilon = 1e-12);
    }
}
