//! Seeded synthetic road networks.
//!
//! The generator plays the part of ground truth for the scenario harness:
//! - Street lattices with two-way links
//! - Scattered one-link roads
//! - Sensors placed near links (Gaussian jitter) or uniformly at random
//!
//! Everything it produces flows through the same record types as the CSV
//! reader, so scenarios exercise the real network loading path.

use crate::error::SimError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use vdsmatch_core::{GeoPosition, LinkId, NodeId, SensorId};
use vdsmatch_io::{InMemorySource, LinkRecord, SensorRecord};

/// Shape of a street lattice.
#[derive(Debug, Clone, Copy)]
pub struct LatticeParams {
    /// South-west node
    pub origin: GeoPosition,

    /// Node rows (latitude direction); at least 3 so border nodes are junctions
    pub rows: usize,

    /// Node columns (longitude direction)
    pub cols: usize,

    /// Block edge length in degrees
    pub spacing: f64,

    /// Standard deviation of sensor jitter around each street midpoint
    pub jitter_sigma: f64,
}

impl Default for LatticeParams {
    fn default() -> Self {
        Self {
            origin: GeoPosition::new(37.90, 23.70),
            rows: 6,
            cols: 8,
            spacing: 0.01,
            jitter_sigma: 0.0005,
        }
    }
}

/// Shape of a random-segments network.
#[derive(Debug, Clone, Copy)]
pub struct RandomParams {
    pub origin: GeoPosition,

    /// Side of the square area links start in, in degrees
    pub extent: f64,

    pub num_links: usize,
    pub num_sensors: usize,

    /// Link length range in degrees
    pub min_length: f64,
    pub max_length: f64,
}

impl Default for RandomParams {
    fn default() -> Self {
        Self {
            origin: GeoPosition::new(40.0, -3.7),
            extent: 0.2,
            num_links: 150,
            num_sensors: 400,
            min_length: 0.002,
            max_length: 0.03,
        }
    }
}

/// Seeded network generator.
pub struct NetworkGenerator {
    rng: ChaCha8Rng,
}

impl NetworkGenerator {
    /// Creates a generator with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Two-way street lattice with one jittered sensor per street.
    ///
    /// Node IDs are `row * cols + col + 1`. Each street gets two opposite
    /// links with consecutive IDs.
    pub fn lattice(&mut self, params: &LatticeParams) -> Result<InMemorySource, SimError> {
        let jitter = Normal::new(0.0, params.jitter_sigma).map_err(SimError::distribution)?;

        let node = |r: usize, c: usize| {
            (
                NodeId((r * params.cols + c + 1) as u64),
                GeoPosition::new(
                    params.origin.lat + r as f64 * params.spacing,
                    params.origin.lon + c as f64 * params.spacing,
                ),
            )
        };

        let mut streets = Vec::new();
        for r in 0..params.rows {
            for c in 0..params.cols {
                if c + 1 < params.cols {
                    streets.push((node(r, c), node(r, c + 1)));
                }
                if r + 1 < params.rows {
                    streets.push((node(r, c), node(r + 1, c)));
                }
            }
        }

        let mut links = Vec::with_capacity(streets.len() * 2);
        let mut sensors = Vec::with_capacity(streets.len());
        for (a, b) in streets {
            let id = links.len() as u64 + 1;
            links.push(record(id, a, b));
            links.push(record(id + 1, b, a));

            let mid = GeoPosition::new((a.1.lat + b.1.lat) / 2.0, (a.1.lon + b.1.lon) / 2.0);
            let position = GeoPosition::new(
                mid.lat + jitter.sample(&mut self.rng),
                mid.lon + jitter.sample(&mut self.rng),
            );
            sensors.push(SensorRecord {
                sensor: SensorId(sensors.len() as u64 + 1),
                position,
            });
        }

        tracing::debug!(links = links.len(), sensors = sensors.len(), "Generated lattice");
        Ok(InMemorySource::new(links, sensors))
    }

    /// Disconnected random links and uniform sensors over the same area.
    ///
    /// Every link has its own two nodes, so every link is its own road.
    pub fn random_segments(&mut self, params: &RandomParams) -> InMemorySource {
        let mut links = Vec::with_capacity(params.num_links);
        for i in 0..params.num_links as u64 {
            let start = self.uniform_position(params.origin, params.extent);
            let angle = self.rng.gen_range(0.0..std::f64::consts::TAU);
            let length = self.rng.gen_range(params.min_length..=params.max_length);
            let end = GeoPosition::new(
                start.lat + length * angle.sin(),
                start.lon + length * angle.cos(),
            );
            links.push(record(
                i + 1,
                (NodeId(2 * i + 1), start),
                (NodeId(2 * i + 2), end),
            ));
        }

        let sensors = (0..params.num_sensors as u64)
            .map(|i| SensorRecord {
                sensor: SensorId(i + 1),
                position: self.uniform_position(params.origin, params.extent),
            })
            .collect();

        InMemorySource::new(links, sensors)
    }

    fn uniform_position(&mut self, origin: GeoPosition, extent: f64) -> GeoPosition {
        GeoPosition::new(
            origin.lat + self.rng.gen_range(0.0..extent),
            origin.lon + self.rng.gen_range(0.0..extent),
        )
    }
}

/// Unit square with links 1-4 around its edges and a sensor at the center.
///
/// ```text
///  (1,0) --3--> (1,1)
///    ^            |
///    4            2
///    |            v
///  (0,0) --1--> (0,1)
/// ```
pub fn unit_square() -> InMemorySource {
    let n1 = (NodeId(1), GeoPosition::new(0.0, 0.0));
    let n2 = (NodeId(2), GeoPosition::new(0.0, 1.0));
    let n3 = (NodeId(3), GeoPosition::new(1.0, 1.0));
    let n4 = (NodeId(4), GeoPosition::new(1.0, 0.0));

    InMemorySource::new(
        vec![
            record(1, n1, n2),
            record(2, n3, n2),
            record(3, n4, n3),
            record(4, n1, n4),
        ],
        vec![SensorRecord {
            sensor: SensorId(100),
            position: GeoPosition::new(0.5, 0.5),
        }],
    )
}

pub const EDGE_SENSOR_ON_NODE: SensorId = SensorId(1);
pub const EDGE_SENSOR_EMPTY_CELL: SensorId = SensorId(2);
pub const EDGE_SENSOR_OUTSIDE: SensorId = SensorId(3);
pub const EDGE_SENSOR_NEAR_LOOP: SensorId = SensorId(4);
pub const EDGE_LOOP_LINK: LinkId = LinkId(101);

/// The unit square plus a one-way triangular loop far to the north-east.
///
/// Every loop node has one incoming and one outgoing link, so no road ever
/// starts on the loop and its links stay unowned.
pub fn edge_cases() -> InMemorySource {
    let mut source = unit_square();
    source.sensors.clear();

    let l1 = (NodeId(11), GeoPosition::new(10.0, 10.0));
    let l2 = (NodeId(12), GeoPosition::new(10.0, 11.0));
    let l3 = (NodeId(13), GeoPosition::new(11.0, 10.0));
    source.links.push(record(EDGE_LOOP_LINK.0, l1, l2));
    source.links.push(record(102, l2, l3));
    source.links.push(record(103, l3, l1));

    let sensor = |id: SensorId, lat, lon| SensorRecord {
        sensor: id,
        position: GeoPosition::new(lat, lon),
    };
    source.sensors = vec![
        sensor(EDGE_SENSOR_ON_NODE, 0.0, 1.0),
        sensor(EDGE_SENSOR_EMPTY_CELL, 5.0, 5.0),
        sensor(EDGE_SENSOR_OUTSIDE, -5.0, -5.0),
        sensor(EDGE_SENSOR_NEAR_LOOP, 10.02, 10.5),
    ];
    source
}

fn record(id: u64, start: (NodeId, GeoPosition), end: (NodeId, GeoPosition)) -> LinkRecord {
    LinkRecord {
        link: LinkId(id),
        start_node: start.0,
        start: start.1,
        end_node: end.0,
        end: end.1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdsmatch_io::load_network;

    #[test]
    fn test_lattice_is_deterministic() {
        let params = LatticeParams::default();
        let a = NetworkGenerator::new(7).lattice(&params).unwrap();
        let b = NetworkGenerator::new(7).lattice(&params).unwrap();
        assert_eq!(a.sensors, b.sensors);

        let c = NetworkGenerator::new(8).lattice(&params).unwrap();
        assert_ne!(a.sensors, c.sensors);
    }

    #[test]
    fn test_lattice_every_link_owned() {
        let source = NetworkGenerator::new(1).lattice(&LatticeParams::default()).unwrap();
        let net = load_network(&source).unwrap();

        // 6 x 8 nodes: 6 * 7 + 5 * 8 streets, two links each
        assert_eq!(net.links().len(), 2 * (6 * 7 + 5 * 8));
        assert!(net.links().iter().all(|l| l.road.is_some()));
    }

    #[test]
    fn test_random_segments_one_road_per_link() {
        let params = RandomParams {
            num_links: 20,
            num_sensors: 5,
            ..Default::default()
        };
        let net = load_network(&NetworkGenerator::new(3).random_segments(&params)).unwrap();
        assert_eq!(net.roads().len(), 20);
        assert_eq!(net.sensors().len(), 5);
    }

    #[test]
    fn test_edge_case_loop_is_unowned() {
        let net = load_network(&edge_cases()).unwrap();
        let idx = net.link_index(EDGE_LOOP_LINK).unwrap();
        assert!(net.link(idx).road.is_none());
        // Square links still form roads
        assert!(net.link(net.link_index(LinkId(1)).unwrap()).road.is_some());
    }

    proptest::proptest! {
        #[test]
        fn prop_random_link_lengths_in_range(seed in proptest::num::u64::ANY, n in 1usize..40) {
            let params = RandomParams { num_links: n, num_sensors: 0, ..Default::default() };
            let source = NetworkGenerator::new(seed).random_segments(&params);
            proptest::prop_assert_eq!(source.links.len(), n);
            for link in &source.links {
                let len = vdsmatch_core::geometry::distance(link.start, link.end);
                proptest::prop_assert!(len >= params.min_length - 1e-12);
                proptest::prop_assert!(len <= params.max_length + 1e-12);
            }
        }
    }

    #[test]
    fn test_invalid_jitter_rejected() {
        let params = LatticeParams {
            jitter_sigma: -1.0,
            ..Default::default()
        };
        assert!(NetworkGenerator::new(0).lattice(&params).is_err());
    }
}
